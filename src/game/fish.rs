//! Fish entities and spawn policy

use std::collections::BTreeMap;

use rand::Rng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info};

use super::catalog::{self, FishCategory, FishKind, BONUS_FISH_TYPE};
use super::path::{FishPath, GroupSpec, PathData, PathGenerator, PathRequest, Point, SpawnEdge};
use super::rng::weighted_pick;
use crate::util::time::secs_to_ticks;

/// Spawn policy tuning
#[derive(Debug, Clone)]
pub struct FishSpawnConfig {
    pub min_fish: usize,
    pub max_fish: usize,
    /// Ticks between school rolls
    pub school_interval_ticks: u64,
    pub school_chance: f64,
    pub school_size_min: u32,
    pub school_size_max: u32,
    pub max_large: usize,
    pub bonus_interval_ticks: u64,
    /// Ticks between boss rolls
    pub boss_interval_ticks: u64,
    /// Boss chance per roll before the table-state multiplier
    pub boss_chance: f64,
    pub max_bosses: usize,
}

impl Default for FishSpawnConfig {
    fn default() -> Self {
        Self {
            min_fish: 5,
            max_fish: 15,
            school_interval_ticks: 5,
            school_chance: 0.4,
            school_size_min: 3,
            school_size_max: 6,
            max_large: 3,
            bonus_interval_ticks: 180,
            boss_interval_ticks: 240,
            boss_chance: 0.35,
            max_bosses: 1,
        }
    }
}

/// Live fish
#[derive(Debug, Clone)]
pub struct Fish {
    pub id: u32,
    pub kind: &'static FishKind,
    pub hp: f32,
    pub path: FishPath,
    pub path_data: PathData,
    pub position: Point,
    /// Tick at which the fish leaves play
    pub despawn_tick: Option<u64>,
    pub group_id: Option<u64>,
}

impl Fish {
    pub fn type_id(&self) -> u16 {
        self.kind.type_id
    }

    pub fn is_boss(&self) -> bool {
        self.kind.is_boss()
    }

    pub fn hit_radius(&self, padding: f32) -> f32 {
        self.kind.hitbox_radius + padding
    }
}

/// Fish of one match plus the spawn bookkeeping
#[derive(Debug)]
pub struct FishManager {
    fish: BTreeMap<u32, Fish>,
    generator: PathGenerator,
    config: FishSpawnConfig,
    next_fish_id: u32,
    next_group_id: u64,
    last_school_roll: u64,
    last_bonus_spawn: u64,
    last_boss_roll: u64,
}

impl FishManager {
    pub fn new(config: FishSpawnConfig, width: f32, height: f32) -> Self {
        Self {
            fish: BTreeMap::new(),
            generator: PathGenerator::new(width, height),
            config,
            next_fish_id: 1,
            next_group_id: 1,
            last_school_roll: 0,
            last_bonus_spawn: 0,
            last_boss_roll: 0,
        }
    }

    pub fn get(&self, id: u32) -> Option<&Fish> {
        self.fish.get(&id)
    }

    pub fn get_mut(&mut self, id: u32) -> Option<&mut Fish> {
        self.fish.get_mut(&id)
    }

    pub fn remove(&mut self, id: u32) -> Option<Fish> {
        self.fish.remove(&id)
    }

    /// Fish in id order
    pub fn iter(&self) -> impl Iterator<Item = &Fish> {
        self.fish.values()
    }

    pub fn len(&self) -> usize {
        self.fish.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fish.is_empty()
    }

    pub fn position_of(&self, id: u32) -> Option<Point> {
        self.fish.get(&id).map(|f| f.position)
    }

    pub fn count_category(&self, category: FishCategory) -> usize {
        self.fish
            .values()
            .filter(|f| f.kind.category == category)
            .count()
    }

    pub fn contains_type(&self, type_id: u16) -> bool {
        self.fish.values().any(|f| f.type_id() == type_id)
    }

    /// Move every fish to its path position at `tick` and drop the ones whose
    /// path or lifetime has run out. Returns the removed ids.
    pub fn update(&mut self, tick: u64) -> Vec<u32> {
        let mut expired = Vec::new();
        for fish in self.fish.values_mut() {
            if let Some(t) = fish.path_data.progress_at_tick(tick) {
                fish.position = fish.path.position(t);
            }
            if fish.despawn_tick.is_some_and(|end| tick >= end) {
                expired.push(fish.id);
            }
        }
        for id in &expired {
            self.fish.remove(id);
        }
        expired
    }

    /// Spawn one fish of `kind` on a deterministic path
    pub fn spawn(
        &mut self,
        kind: &'static FishKind,
        tick: u64,
        edge: Option<SpawnEdge>,
        group: Option<GroupSpec>,
    ) -> u32 {
        let id = self.next_fish_id;
        self.next_fish_id = self.next_fish_id.wrapping_add(1).max(1);

        let generated = self.generator.generate(&PathRequest {
            fish_id: id,
            category: kind.category,
            speed: kind.speed,
            tick,
            edge,
            group,
        });
        let path_data = generated.to_path_data();
        // Move on exactly the points peers rebuild from the descriptor
        let path = FishPath::from_path_data(&path_data).unwrap_or(generated);
        let despawn_tick = match (path_data.lifetime_ticks(), kind.max_lifetime_secs) {
            (Some(ticks), _) => Some(tick + ticks),
            (None, Some(secs)) => Some(tick + secs_to_ticks(secs as f64)),
            (None, None) => None,
        };
        let position = path.position(0.0);

        self.fish.insert(
            id,
            Fish {
                id,
                kind,
                hp: kind.max_hp,
                path,
                path_data,
                position,
                despawn_tick,
                group_id: group.map(|g| g.group_id),
            },
        );
        id
    }

    /// Spawn a school (or a lone large/special fish) picked from the catalog
    pub fn spawn_school(&mut self, tick: u64, rng: &mut ChaCha8Rng) -> Vec<u32> {
        let table = catalog::school_spawn_table();
        let Some(type_id) = weighted_pick(&table, |total| rng.gen_range(0..total)) else {
            return Vec::new();
        };
        let Some(kind) = catalog::lookup(type_id) else {
            return Vec::new();
        };
        let edge = SpawnEdge::ALL[rng.gen_range(0..SpawnEdge::ALL.len())];

        match kind.category {
            FishCategory::Large if self.count_category(FishCategory::Large) >= self.config.max_large => {
                Vec::new()
            }
            FishCategory::Small | FishCategory::Medium => {
                let room = self.config.max_fish.saturating_sub(self.fish.len()).max(1) as u32;
                let size = rng
                    .gen_range(self.config.school_size_min..=self.config.school_size_max)
                    .min(room);
                let group_id = self.next_group_id;
                self.next_group_id += 1;
                (0..size)
                    .map(|index| {
                        self.spawn(kind, tick, Some(edge), Some(GroupSpec { group_id, index }))
                    })
                    .collect()
            }
            _ => vec![self.spawn(kind, tick, Some(edge), None)],
        }
    }

    /// Run one tick of the spawn policy. `boss_spawn_multiplier` comes from
    /// the table state; `bosses` are the type ids the current round allows.
    pub fn run_spawn_policy(
        &mut self,
        tick: u64,
        rng: &mut ChaCha8Rng,
        boss_spawn_multiplier: f64,
        bosses: &[u16],
    ) -> Vec<u32> {
        let mut spawned = Vec::new();

        let mut attempts = 0;
        while self.fish.len() < self.config.min_fish && attempts < self.config.min_fish {
            spawned.extend(self.spawn_school(tick, rng));
            attempts += 1;
        }

        if tick.saturating_sub(self.last_school_roll) >= self.config.school_interval_ticks {
            self.last_school_roll = tick;
            if self.fish.len() < self.config.max_fish && rng.gen_bool(self.config.school_chance) {
                spawned.extend(self.spawn_school(tick, rng));
            }
        }

        if tick.saturating_sub(self.last_bonus_spawn) >= self.config.bonus_interval_ticks {
            self.last_bonus_spawn = tick;
            if let Some(kind) = catalog::lookup(BONUS_FISH_TYPE) {
                if !self.contains_type(BONUS_FISH_TYPE) {
                    spawned.push(self.spawn(kind, tick, None, None));
                }
            }
        }

        if tick.saturating_sub(self.last_boss_roll) >= self.config.boss_interval_ticks {
            self.last_boss_roll = tick;
            let chance = (self.config.boss_chance * boss_spawn_multiplier).clamp(0.0, 1.0);
            if !bosses.is_empty()
                && self.count_category(FishCategory::Boss) < self.config.max_bosses
                && rng.gen_bool(chance)
            {
                if let Some(id) = self.spawn_boss(tick, rng, bosses) {
                    spawned.push(id);
                }
            }
        }

        if !spawned.is_empty() {
            debug!(tick, count = spawned.len(), total = self.fish.len(), "Fish spawned");
        }
        spawned
    }

    fn spawn_boss(&mut self, tick: u64, rng: &mut ChaCha8Rng, bosses: &[u16]) -> Option<u32> {
        let table = catalog::boss_spawn_table(bosses);
        let type_id = weighted_pick(&table, |total| rng.gen_range(0..total))?;
        let kind = catalog::lookup(type_id)?;
        let id = self.spawn(kind, tick, None, None);
        info!(tick, fish_id = id, boss = kind.name, "Boss spawned");
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    const ROUND_BOSSES: &[u16] = &[100, 101, 109, 110];

    fn manager() -> FishManager {
        FishManager::new(FishSpawnConfig::default(), 1800.0, 900.0)
    }

    #[test]
    fn spawn_assigns_unique_ids_and_paths() {
        let mut fish = manager();
        let kind = catalog::lookup(0).unwrap();
        let a = fish.spawn(kind, 10, Some(SpawnEdge::Left), None);
        let b = fish.spawn(kind, 10, Some(SpawnEdge::Left), None);
        assert_ne!(a, b);
        assert_eq!(fish.get(a).unwrap().path_data.fish_id, a);
        assert_eq!(fish.get(a).unwrap().hp, kind.max_hp);
        assert_eq!(fish.get(a).unwrap().path_data.start_tick, 10);
    }

    #[test]
    fn fish_follow_their_path_and_expire() {
        let mut fish = manager();
        let kind = catalog::lookup(12).unwrap();
        let id = fish.spawn(kind, 0, Some(SpawnEdge::Left), None);
        let end_tick = fish.get(id).unwrap().despawn_tick.unwrap();

        fish.update(end_tick / 2);
        let f = fish.get(id).unwrap();
        let expected = f.path_data.position_at_tick(end_tick / 2).unwrap().unwrap();
        assert_eq!(f.position, expected);

        assert_eq!(fish.update(end_tick), vec![id]);
        assert!(fish.get(id).is_none());
    }

    #[test]
    fn looping_fish_use_catalog_lifetime() {
        let mut fish = manager();
        let jelly = catalog::lookup(24).unwrap();
        let id = fish.spawn(jelly, 100, None, None);
        let f = fish.get(id).unwrap();
        assert!(f.path_data.looping);
        assert_eq!(f.despawn_tick, Some(100 + 600));
    }

    #[test]
    fn policy_tops_up_to_minimum() {
        let mut fish = manager();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        fish.run_spawn_policy(1, &mut rng, 1.0, ROUND_BOSSES);
        assert!(fish.len() >= 5);
    }

    #[test]
    fn population_never_exceeds_cap_from_schools() {
        let mut fish = manager();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        for tick in 1..2_000 {
            fish.run_spawn_policy(tick, &mut rng, 1.0, ROUND_BOSSES);
            fish.update(tick);
            // Bonus fish and bosses can ride above the school cap by one each
            assert!(fish.len() <= 15 + 2 + 6, "tick {tick}: {}", fish.len());
            assert!(fish.count_category(FishCategory::Large) <= 3);
            assert!(fish.count_category(FishCategory::Boss) <= 1);
        }
    }

    #[test]
    fn boss_spawns_when_chance_is_certain() {
        let config = FishSpawnConfig {
            boss_chance: 1.0,
            ..FishSpawnConfig::default()
        };
        let mut fish = FishManager::new(config, 1800.0, 900.0);
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        fish.run_spawn_policy(240, &mut rng, 1.0, ROUND_BOSSES);
        assert_eq!(fish.count_category(FishCategory::Boss), 1);
        fish.run_spawn_policy(480, &mut rng, 1.0, ROUND_BOSSES);
        assert_eq!(fish.count_category(FishCategory::Boss), 1);
    }

    #[test]
    fn zero_multiplier_suppresses_bosses() {
        let config = FishSpawnConfig {
            boss_chance: 1.0,
            ..FishSpawnConfig::default()
        };
        let mut fish = FishManager::new(config, 1800.0, 900.0);
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        fish.run_spawn_policy(240, &mut rng, 0.0, ROUND_BOSSES);
        assert_eq!(fish.count_category(FishCategory::Boss), 0);
    }

    #[test]
    fn bosses_come_only_from_the_round_list() {
        let config = FishSpawnConfig {
            boss_chance: 1.0,
            ..FishSpawnConfig::default()
        };
        let mut fish = FishManager::new(config, 1800.0, 900.0);
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        fish.run_spawn_policy(240, &mut rng, 1.0, &[]);
        assert_eq!(fish.count_category(FishCategory::Boss), 0);
        assert!(fish.len() >= 5);

        fish.run_spawn_policy(480, &mut rng, 1.0, &[104]);
        let boss = fish.iter().find(|f| f.is_boss()).unwrap();
        assert_eq!(boss.type_id(), 104);
    }

    #[test]
    fn positions_follow_the_wire_descriptor() {
        let mut fish = manager();
        let kind = catalog::lookup(2).unwrap();
        let id = fish.spawn(kind, 0, Some(SpawnEdge::Top), None);
        for tick in [1, 10, 20] {
            fish.update(tick);
            let f = fish.get(id).unwrap();
            assert_eq!(Some(f.position), f.path_data.position_at_tick(tick).unwrap());
        }
    }

    #[test]
    fn schools_share_a_group_id() {
        let mut fish = manager();
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let mut school = Vec::new();
        for _ in 0..20 {
            school = fish.spawn_school(1, &mut rng);
            if school.len() > 1 {
                break;
            }
        }
        assert!(school.len() > 1);
        let group = fish.get(school[0]).unwrap().group_id;
        assert!(group.is_some());
        assert!(school.iter().all(|id| fish.get(*id).unwrap().group_id == group));
    }
}
