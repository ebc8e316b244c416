//! Static fish and boss catalog
//!
//! Read-only lookup keyed by type id. Regular fish pay `base_value` times
//! the wager of the killing shot; bosses pay `base_value` credits flat.

use serde::{Deserialize, Serialize};

/// Fish category, drives path style and spawn caps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FishCategory {
    Small,
    Medium,
    Large,
    Bonus,
    Special,
    Boss,
}

/// Post-kill decision a boss hands to the killer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionKind {
    /// Pick one of three hidden multipliers
    ChestChoice,
    /// Strike five targets before the timer runs out
    ToothStrike,
}

/// Sweep a boss runs over the other fish when it dies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeathEffect {
    ScreenWipe,
    SectorBlast,
    VortexPull,
    LineClear,
    ChainLightning,
    /// Pays out with no sweep
    LootDrop,
    ExplosionRing,
    TimeFreeze,
}

/// Boss rarity, decides which rotation pool a boss belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BossTier {
    RareMid,
    UltraRare,
}

/// One catalog entry
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FishKind {
    pub type_id: u16,
    pub name: &'static str,
    pub category: FishCategory,
    pub hitbox_radius: f32,
    /// Pixels per second
    pub speed: f32,
    pub max_hp: f32,
    pub base_value: f64,
    pub spawn_weight: u32,
    /// Cap for looping paths that never leave the arena
    pub max_lifetime_secs: Option<f32>,
    pub interaction: Option<InteractionKind>,
    pub death_effect: Option<DeathEffect>,
    pub boss_tier: Option<BossTier>,
}

impl FishKind {
    pub fn is_boss(&self) -> bool {
        self.category == FishCategory::Boss
    }
}

const fn fish(
    type_id: u16,
    name: &'static str,
    category: FishCategory,
    hitbox_radius: f32,
    speed: f32,
    max_hp: f32,
    base_value: f64,
    spawn_weight: u32,
) -> FishKind {
    FishKind {
        type_id,
        name,
        category,
        hitbox_radius,
        speed,
        max_hp,
        base_value,
        spawn_weight,
        max_lifetime_secs: None,
        interaction: None,
        death_effect: None,
        boss_tier: None,
    }
}

#[allow(clippy::too_many_arguments)]
const fn boss(
    type_id: u16,
    name: &'static str,
    tier: BossTier,
    hitbox_radius: f32,
    speed: f32,
    base_value: f64,
    death_effect: DeathEffect,
    interaction: Option<InteractionKind>,
) -> FishKind {
    FishKind {
        type_id,
        name,
        category: FishCategory::Boss,
        hitbox_radius,
        speed,
        max_hp: BOSS_HP,
        base_value,
        spawn_weight: match tier {
            BossTier::RareMid => RARE_MID_WEIGHT,
            BossTier::UltraRare => ULTRA_RARE_WEIGHT,
        },
        max_lifetime_secs: None,
        interaction,
        death_effect: Some(death_effect),
        boss_tier: Some(tier),
    }
}

const RARE_MID_WEIGHT: u32 = 16;
const ULTRA_RARE_WEIGHT: u32 = 4;

/// Bosses are effectively killed by the probability curve, not by HP
pub const BOSS_HP: f32 = 50_000.0;

/// Type id reserved for the periodic bonus fish
pub const BONUS_FISH_TYPE: u16 = 21;

pub static FISH_KINDS: &[FishKind] = &[
    fish(0, "Clownfish", FishCategory::Small, 22.0, 120.0, 20.0, 1.0, 25),
    fish(1, "Neon Tetra", FishCategory::Small, 16.0, 115.0, 20.0, 1.0, 25),
    fish(2, "Butterflyfish", FishCategory::Small, 30.0, 110.0, 30.0, 1.5, 20),
    fish(6, "Lionfish", FishCategory::Medium, 70.0, 62.5, 60.0, 3.0, 10),
    fish(9, "Triggerfish", FishCategory::Medium, 50.0, 60.0, 80.0, 4.0, 10),
    fish(12, "Hammerhead", FishCategory::Large, 120.0, 100.0, 200.0, 9.5, 5),
    fish(14, "Giant Manta", FishCategory::Large, 135.0, 81.25, 280.0, 13.0, 5),
    fish(BONUS_FISH_TYPE, "Wave Rider", FishCategory::Bonus, 60.0, 125.0, 100.0, 6.0, 0),
    FishKind {
        max_lifetime_secs: Some(20.0),
        ..fish(24, "Moon Jelly", FishCategory::Special, 45.0, 70.0, 120.0, 5.5, 4)
    },
    boss(100, "Giant Tuna", BossTier::RareMid, 110.0, 80.0, 70.0, DeathEffect::ExplosionRing, None),
    boss(101, "Dragon Turtle", BossTier::RareMid, 150.0, 60.0, 700.0, DeathEffect::SectorBlast, None),
    boss(102, "Bomb Crab", BossTier::RareMid, 120.0, 65.0, 280.0, DeathEffect::ExplosionRing, None),
    boss(103, "Lightning Eel", BossTier::RareMid, 115.0, 85.0, 210.0, DeathEffect::ChainLightning, None),
    boss(104, "Vortex Starfish", BossTier::RareMid, 125.0, 60.0, 420.0, DeathEffect::VortexPull, None),
    boss(
        109,
        "Kaiju Megalodon",
        BossTier::UltraRare,
        170.0,
        70.0,
        7_500.0,
        DeathEffect::ScreenWipe,
        Some(InteractionKind::ToothStrike),
    ),
    boss(
        110,
        "Emperor Kraken",
        BossTier::UltraRare,
        180.0,
        55.0,
        12_000.0,
        DeathEffect::VortexPull,
        Some(InteractionKind::ChestChoice),
    ),
    boss(111, "Cosmic Leviathan", BossTier::UltraRare, 210.0, 60.0, 15_000.0, DeathEffect::ScreenWipe, None),
    boss(112, "Samurai Swordfish", BossTier::UltraRare, 155.0, 120.0, 9_000.0, DeathEffect::LineClear, None),
    boss(113, "Carnival King Crab", BossTier::UltraRare, 180.0, 45.0, 10_500.0, DeathEffect::LootDrop, None),
    boss(114, "Wizard Octopus", BossTier::UltraRare, 175.0, 55.0, 13_500.0, DeathEffect::TimeFreeze, None),
    boss(115, "Rocket Hammerhead", BossTier::UltraRare, 140.0, 150.0, 8_250.0, DeathEffect::LineClear, None),
    boss(116, "Pirate Captain Whale", BossTier::UltraRare, 225.0, 40.0, 18_000.0, DeathEffect::LootDrop, None),
    boss(117, "Nuclear Submarine", BossTier::UltraRare, 200.0, 65.0, 22_500.0, DeathEffect::SectorBlast, None),
    boss(118, "Phoenix Firebird", BossTier::UltraRare, 160.0, 140.0, 12_750.0, DeathEffect::ExplosionRing, None),
    boss(119, "Alien Mothership", BossTier::UltraRare, 240.0, 35.0, 30_000.0, DeathEffect::ScreenWipe, None),
];

/// Look up a catalog entry
pub fn lookup(type_id: u16) -> Option<&'static FishKind> {
    FISH_KINDS.iter().find(|k| k.type_id == type_id)
}

/// Weighted table of regular fish for school spawns
pub fn school_spawn_table() -> Vec<(u16, u32)> {
    FISH_KINDS
        .iter()
        .filter(|k| !k.is_boss() && k.category != FishCategory::Bonus)
        .map(|k| (k.type_id, k.spawn_weight))
        .collect()
}

/// Weighted table of the bosses in `eligible`
pub fn boss_spawn_table(eligible: &[u16]) -> Vec<(u16, u32)> {
    FISH_KINDS
        .iter()
        .filter(|k| k.is_boss() && eligible.contains(&k.type_id))
        .map(|k| (k.type_id, k.spawn_weight))
        .collect()
}

/// Type ids of every boss in `tier`, in catalog order
pub fn bosses_in_tier(tier: BossTier) -> Vec<u16> {
    FISH_KINDS
        .iter()
        .filter(|k| k.boss_tier == Some(tier))
        .map(|k| k.type_id)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn type_ids_are_unique() {
        let ids: HashSet<u16> = FISH_KINDS.iter().map(|k| k.type_id).collect();
        assert_eq!(ids.len(), FISH_KINDS.len());
    }

    #[test]
    fn lookup_finds_entries() {
        let clown = lookup(0).unwrap();
        assert_eq!(clown.name, "Clownfish");
        assert_eq!(clown.category, FishCategory::Small);
        assert!(lookup(999).is_none());
        assert_eq!(lookup(BONUS_FISH_TYPE).unwrap().category, FishCategory::Bonus);
    }

    #[test]
    fn spawn_tables_split_bosses() {
        assert!(school_spawn_table()
            .iter()
            .all(|(id, _)| !lookup(*id).unwrap().is_boss()));
        let all: Vec<u16> = FISH_KINDS.iter().map(|k| k.type_id).collect();
        assert!(boss_spawn_table(&all)
            .iter()
            .all(|(id, _)| lookup(*id).unwrap().is_boss()));
        assert_eq!(boss_spawn_table(&[101, 0]), vec![(101, RARE_MID_WEIGHT)]);
        assert!(!school_spawn_table().iter().any(|(id, _)| *id == BONUS_FISH_TYPE));
    }

    #[test]
    fn every_boss_has_a_tier_and_death_effect() {
        for kind in FISH_KINDS.iter() {
            assert_eq!(kind.is_boss(), kind.boss_tier.is_some(), "{}", kind.name);
            assert_eq!(kind.is_boss(), kind.death_effect.is_some(), "{}", kind.name);
        }
        assert_eq!(bosses_in_tier(BossTier::RareMid), vec![100, 101, 102, 103, 104]);
        assert_eq!(bosses_in_tier(BossTier::UltraRare).len(), 11);
    }

    #[test]
    fn looping_kinds_have_a_lifetime_cap() {
        for kind in FISH_KINDS.iter().filter(|k| k.category == FishCategory::Special) {
            assert!(kind.max_lifetime_secs.is_some(), "{} never despawns", kind.name);
        }
    }
}
