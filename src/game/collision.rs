//! Projectile/fish hit detection and kill resolution
//!
//! Detection and damage are separate passes. Every hit landed this tick is
//! applied before any fish is declared dead, so two shots that only kill
//! together still produce a kill, and a fish never dies twice.

use std::collections::BTreeMap;

use super::credits::Credits;
use super::fish::{Fish, FishManager};
use super::player::PlayerId;
use super::projectile::ProjectileManager;

/// One projectile striking one fish
#[derive(Debug, Clone, PartialEq)]
pub struct Hit {
    pub projectile_id: u32,
    pub fish_id: u32,
    pub owner_id: PlayerId,
    pub owner_slot: u8,
    pub damage: f32,
    pub wager: Credits,
}

/// A fish killed this tick, credited to the owner of the killing shot
#[derive(Debug, Clone, PartialEq)]
pub struct KillEvent {
    pub fish_id: u32,
    pub type_id: u16,
    pub killer_id: PlayerId,
    pub killer_slot: u8,
    pub projectile_id: u32,
    /// Wager of the killing shot
    pub wager: Credits,
}

/// Find the first fish each live projectile overlaps and mark it spent
pub fn detect_hits(projectiles: &mut ProjectileManager, fish: &FishManager) -> Vec<Hit> {
    let padding = projectiles.config().hit_padding;
    let mut hits = Vec::new();

    for projectile in projectiles.iter_mut().filter(|p| !p.spent) {
        let target = fish
            .iter()
            .find(|f| f.hp > 0.0 && projectile.check_hit(f.position, f.hit_radius(padding)));
        if let Some(target) = target {
            projectile.spent = true;
            hits.push(Hit {
                projectile_id: projectile.id,
                fish_id: target.id,
                owner_id: projectile.owner_id,
                owner_slot: projectile.owner_slot,
                damage: projectile.damage,
                wager: projectile.wager,
            });
        }
    }

    hits
}

/// Apply all hits, then emit one kill per fish whose health reached zero.
///
/// `boss_roll` is consulted for every hit on a boss until one succeeds; a
/// successful roll kills the boss regardless of remaining health. Hits on
/// fish that no longer exist are ignored.
pub fn resolve_hits(
    hits: &[Hit],
    fish: &mut FishManager,
    mut boss_roll: impl FnMut(&Fish, &Hit) -> bool,
) -> Vec<KillEvent> {
    let mut by_fish: BTreeMap<u32, Vec<&Hit>> = BTreeMap::new();
    for hit in hits {
        by_fish.entry(hit.fish_id).or_default().push(hit);
    }

    let mut kills = Vec::new();
    for (fish_id, fish_hits) in by_fish {
        let Some(target) = fish.get_mut(fish_id) else {
            continue;
        };
        if target.hp <= 0.0 {
            continue;
        }

        let mut killing_hit: Option<&Hit> = None;
        for hit in fish_hits {
            target.hp -= hit.damage;
            if killing_hit.is_none() {
                let rolled = target.is_boss() && boss_roll(target, hit);
                if rolled || target.hp <= 0.0 {
                    killing_hit = Some(hit);
                }
            }
        }

        if let Some(hit) = killing_hit {
            target.hp = 0.0;
            kills.push(KillEvent {
                fish_id,
                type_id: target.type_id(),
                killer_id: hit.owner_id,
                killer_slot: hit.owner_slot,
                projectile_id: hit.projectile_id,
                wager: hit.wager,
            });
        }
    }

    kills
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::catalog;
    use crate::game::fish::FishSpawnConfig;
    use crate::game::path::SpawnEdge;
    use crate::game::projectile::{ProjectileConfig, ShotSpec, WeaponStats};
    use uuid::Uuid;

    fn fish_manager_with(type_id: u16) -> (FishManager, u32) {
        let mut fish = FishManager::new(FishSpawnConfig::default(), 1800.0, 900.0);
        let id = fish.spawn(catalog::lookup(type_id).unwrap(), 0, Some(SpawnEdge::Left), None);
        fish.get_mut(id).unwrap().position = [500.0, 400.0];
        (fish, id)
    }

    fn hit(fish_id: u32, projectile_id: u32, owner: PlayerId, damage: f32) -> Hit {
        Hit {
            projectile_id,
            fish_id,
            owner_id: owner,
            owner_slot: 0,
            damage,
            wager: Credits::whole(10),
        }
    }

    #[test]
    fn detects_overlap_and_spends_projectile() {
        let (fish, fish_id) = fish_manager_with(0);
        let mut projectiles = ProjectileManager::new(ProjectileConfig::default());
        let spec = |origin| ShotSpec {
            owner_id: Uuid::nil(),
            owner_slot: 2,
            origin,
            direction: [1.0, 0.0],
            weapon: WeaponStats::for_level(1),
            wager: Credits::whole(10),
            target_fish_id: None,
            client_nonce: None,
        };
        projectiles.spawn(spec([510.0, 400.0]));
        projectiles.spawn(spec([100.0, 100.0]));

        let hits = detect_hits(&mut projectiles, &fish);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].fish_id, fish_id);
        assert_eq!(hits[0].owner_slot, 2);
        assert_eq!(projectiles.remove_spent(), 1);

        // Spent shots do not hit twice
        assert!(detect_hits(&mut projectiles, &fish).is_empty());
    }

    #[test]
    fn simultaneous_hits_kill_exactly_once() {
        let (mut fish, fish_id) = fish_manager_with(0);
        fish.get_mut(fish_id).unwrap().hp = 15.0;
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let hits = vec![hit(fish_id, 1, a, 10.0), hit(fish_id, 2, b, 10.0)];

        let kills = resolve_hits(&hits, &mut fish, |_, _| false);
        assert_eq!(kills.len(), 1);
        assert_eq!(kills[0].fish_id, fish_id);
        assert_eq!(kills[0].killer_id, b);
        assert_eq!(kills[0].projectile_id, 2);
    }

    #[test]
    fn overkill_credits_first_lethal_hit() {
        let (mut fish, fish_id) = fish_manager_with(0);
        let a = Uuid::new_v4();
        let hits = vec![
            hit(fish_id, 1, a, 50.0),
            hit(fish_id, 2, Uuid::new_v4(), 50.0),
            hit(fish_id, 3, Uuid::new_v4(), 50.0),
        ];
        let kills = resolve_hits(&hits, &mut fish, |_, _| false);
        assert_eq!(kills.len(), 1);
        assert_eq!(kills[0].killer_id, a);
    }

    #[test]
    fn surviving_fish_keeps_accumulated_damage() {
        let (mut fish, fish_id) = fish_manager_with(12);
        let hits = vec![hit(fish_id, 1, Uuid::nil(), 10.0), hit(fish_id, 2, Uuid::nil(), 10.0)];
        assert!(resolve_hits(&hits, &mut fish, |_, _| false).is_empty());
        let f = fish.get(fish_id).unwrap();
        assert_eq!(f.hp, f.kind.max_hp - 20.0);
    }

    #[test]
    fn missing_fish_is_ignored() {
        let (mut fish, fish_id) = fish_manager_with(0);
        fish.remove(fish_id);
        let hits = vec![hit(fish_id, 1, Uuid::nil(), 100.0)];
        assert!(resolve_hits(&hits, &mut fish, |_, _| true).is_empty());
    }

    #[test]
    fn boss_dies_on_successful_roll() {
        let (mut fish, boss_id) = fish_manager_with(100);
        let hits = vec![
            hit(boss_id, 1, Uuid::nil(), 10.0),
            hit(boss_id, 2, Uuid::nil(), 10.0),
            hit(boss_id, 3, Uuid::nil(), 10.0),
        ];
        let mut rolls = 0;
        let kills = resolve_hits(&hits, &mut fish, |_, _| {
            rolls += 1;
            rolls == 2
        });
        assert_eq!(rolls, 2);
        assert_eq!(kills.len(), 1);
        assert_eq!(kills[0].projectile_id, 2);
    }

    #[test]
    fn regular_fish_never_roll() {
        let (mut fish, fish_id) = fish_manager_with(0);
        let hits = vec![hit(fish_id, 1, Uuid::nil(), 1.0)];
        let kills = resolve_hits(&hits, &mut fish, |_, _| panic!("rolled for a regular fish"));
        assert!(kills.is_empty());
    }
}
