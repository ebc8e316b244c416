//! Cannons and projectiles

use std::f32::consts::PI;

use super::credits::Credits;
use super::path::Point;
use super::player::PlayerId;
use crate::util::time::tick_delta;

pub const MAX_CANNON_LEVEL: u8 = 3;

/// Weapon stats per cannon level
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeaponStats {
    pub level: u8,
    /// Damage per hit
    pub damage: f32,
    /// Multiplier on the bet charged per shot
    pub cost_factor: u32,
    /// Pixels per second
    pub projectile_speed: f32,
    /// Homing shots steer toward a chosen fish
    pub homing: bool,
}

impl WeaponStats {
    pub fn for_level(level: u8) -> Self {
        match level.clamp(1, MAX_CANNON_LEVEL) {
            1 => Self {
                level: 1,
                damage: 10.0,
                cost_factor: 1,
                projectile_speed: 420.0,
                homing: false,
            },
            2 => Self {
                level: 2,
                damage: 20.0,
                cost_factor: 2,
                projectile_speed: 460.0,
                homing: false,
            },
            _ => Self {
                level: 3,
                damage: 30.0,
                cost_factor: 3,
                projectile_speed: 500.0,
                homing: true,
            },
        }
    }
}

/// Projectile tuning
#[derive(Debug, Clone)]
pub struct ProjectileConfig {
    /// Ticks before a bouncing shot expires
    pub max_lifetime_ticks: u32,
    /// Added to the fish hitbox for hit tests
    pub hit_padding: f32,
    /// Max heading change for homing shots, radians per second
    pub homing_turn_rate: f32,
}

impl Default for ProjectileConfig {
    fn default() -> Self {
        Self {
            max_lifetime_ticks: 900,
            hit_padding: 5.0,
            homing_turn_rate: 4.0,
        }
    }
}

/// Active projectile
#[derive(Debug, Clone)]
pub struct Projectile {
    pub id: u32,
    pub owner_id: PlayerId,
    pub owner_slot: u8,
    pub x: f32,
    pub y: f32,
    pub dir_x: f32,
    pub dir_y: f32,
    pub speed: f32,
    pub damage: f32,
    /// Credits paid for this shot
    pub wager: Credits,
    pub target_fish_id: Option<u32>,
    pub client_nonce: Option<u32>,
    pub ticks_alive: u32,
    /// Set once the projectile hits something
    pub spent: bool,
}

impl Projectile {
    /// Move one tick, bouncing off the arena walls
    fn advance(&mut self, width: f32, height: f32) {
        let dt = tick_delta();
        self.x += self.dir_x * self.speed * dt;
        self.y += self.dir_y * self.speed * dt;

        if self.x < 0.0 {
            self.x = -self.x;
            self.dir_x = self.dir_x.abs();
        } else if self.x > width {
            self.x = 2.0 * width - self.x;
            self.dir_x = -self.dir_x.abs();
        }
        if self.y < 0.0 {
            self.y = -self.y;
            self.dir_y = self.dir_y.abs();
        } else if self.y > height {
            self.y = 2.0 * height - self.y;
            self.dir_y = -self.dir_y.abs();
        }
        self.ticks_alive += 1;
    }

    /// Rotate the heading toward `target`, at most `max_turn` radians
    fn steer_toward(&mut self, target: Point, max_turn: f32) {
        let dx = target[0] - self.x;
        let dy = target[1] - self.y;
        if dx * dx + dy * dy <= f32::EPSILON {
            return;
        }
        let current = self.dir_y.atan2(self.dir_x);
        let desired = dy.atan2(dx);
        let mut diff = desired - current;
        while diff > PI {
            diff -= 2.0 * PI;
        }
        while diff < -PI {
            diff += 2.0 * PI;
        }
        let heading = current + diff.clamp(-max_turn, max_turn);
        self.dir_x = heading.cos();
        self.dir_y = heading.sin();
    }

    pub fn check_hit(&self, target: Point, radius: f32) -> bool {
        let dx = self.x - target[0];
        let dy = self.y - target[1];
        dx * dx + dy * dy <= radius * radius
    }
}

/// Everything needed to launch a shot
#[derive(Debug, Clone)]
pub struct ShotSpec {
    pub owner_id: PlayerId,
    pub owner_slot: u8,
    pub origin: Point,
    /// Unit heading
    pub direction: Point,
    pub weapon: WeaponStats,
    pub wager: Credits,
    pub target_fish_id: Option<u32>,
    pub client_nonce: Option<u32>,
}

/// Live projectiles of one match
#[derive(Debug)]
pub struct ProjectileManager {
    projectiles: Vec<Projectile>,
    next_id: u32,
    config: ProjectileConfig,
}

impl ProjectileManager {
    pub fn new(config: ProjectileConfig) -> Self {
        Self {
            projectiles: Vec::new(),
            next_id: 1,
            config,
        }
    }

    pub fn config(&self) -> &ProjectileConfig {
        &self.config
    }

    pub fn spawn(&mut self, shot: ShotSpec) -> u32 {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1).max(1);
        let target_fish_id = if shot.weapon.homing {
            shot.target_fish_id
        } else {
            None
        };
        self.projectiles.push(Projectile {
            id,
            owner_id: shot.owner_id,
            owner_slot: shot.owner_slot,
            x: shot.origin[0],
            y: shot.origin[1],
            dir_x: shot.direction[0],
            dir_y: shot.direction[1],
            speed: shot.weapon.projectile_speed,
            damage: shot.weapon.damage,
            wager: shot.wager,
            target_fish_id,
            client_nonce: shot.client_nonce,
            ticks_alive: 0,
            spent: false,
        });
        id
    }

    /// Advance every projectile one tick. `locate` resolves a fish id to its
    /// current position; a homing shot whose target is gone flies straight.
    pub fn update(&mut self, width: f32, height: f32, locate: impl Fn(u32) -> Option<Point>) {
        let max_turn = self.config.homing_turn_rate * tick_delta();
        for projectile in &mut self.projectiles {
            if let Some(target_id) = projectile.target_fish_id {
                match locate(target_id) {
                    Some(target) => projectile.steer_toward(target, max_turn),
                    None => projectile.target_fish_id = None,
                }
            }
            projectile.advance(width, height);
        }

        let max_life = self.config.max_lifetime_ticks;
        self.projectiles
            .retain(|p| !p.spent && p.ticks_alive < max_life);
    }

    /// Drop projectiles that hit something this tick
    pub fn remove_spent(&mut self) -> usize {
        let before = self.projectiles.len();
        self.projectiles.retain(|p| !p.spent);
        before - self.projectiles.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Projectile> {
        self.projectiles.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Projectile> {
        self.projectiles.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.projectiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.projectiles.is_empty()
    }

    /// Discard every shot fired by `owner`
    pub fn remove_owned_by(&mut self, owner: &PlayerId) {
        self.projectiles.retain(|p| &p.owner_id != owner);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn shot(origin: Point, direction: Point, level: u8, target: Option<u32>) -> ShotSpec {
        ShotSpec {
            owner_id: Uuid::nil(),
            owner_slot: 0,
            origin,
            direction,
            weapon: WeaponStats::for_level(level),
            wager: Credits::whole(10),
            target_fish_id: target,
            client_nonce: Some(7),
        }
    }

    #[test]
    fn straight_flight_covers_speed_per_second() {
        let mut manager = ProjectileManager::new(ProjectileConfig::default());
        manager.spawn(shot([100.0, 100.0], [1.0, 0.0], 1, None));
        for _ in 0..30 {
            manager.update(1800.0, 900.0, |_| None);
        }
        let p = manager.iter().next().unwrap();
        assert!((p.x - 520.0).abs() < 0.5);
        assert!((p.y - 100.0).abs() < 1e-3);
    }

    #[test]
    fn bounces_off_walls() {
        let mut manager = ProjectileManager::new(ProjectileConfig::default());
        manager.spawn(shot([1795.0, 450.0], [1.0, 0.0], 1, None));
        manager.update(1800.0, 900.0, |_| None);
        let p = manager.iter().next().unwrap();
        assert!(p.x <= 1800.0);
        assert!(p.dir_x < 0.0);
    }

    #[test]
    fn expires_after_lifetime() {
        let config = ProjectileConfig {
            max_lifetime_ticks: 3,
            ..ProjectileConfig::default()
        };
        let mut manager = ProjectileManager::new(config);
        manager.spawn(shot([100.0, 100.0], [0.0, 1.0], 1, None));
        manager.update(1800.0, 900.0, |_| None);
        manager.update(1800.0, 900.0, |_| None);
        assert_eq!(manager.len(), 1);
        manager.update(1800.0, 900.0, |_| None);
        assert!(manager.is_empty());
    }

    #[test]
    fn homing_turns_at_bounded_rate() {
        let mut manager = ProjectileManager::new(ProjectileConfig::default());
        manager.spawn(shot([100.0, 450.0], [1.0, 0.0], 3, Some(5)));
        manager.update(1800.0, 900.0, |_| Some([100.0, 900.0]));
        let p = manager.iter().next().unwrap();
        let turned = p.dir_y.atan2(p.dir_x);
        let max_turn = 4.0 * tick_delta();
        assert!(turned > 0.0);
        assert!(turned <= max_turn + 1e-4);
    }

    #[test]
    fn homing_reverts_to_straight_when_target_gone() {
        let mut manager = ProjectileManager::new(ProjectileConfig::default());
        manager.spawn(shot([100.0, 450.0], [1.0, 0.0], 3, Some(5)));
        manager.update(1800.0, 900.0, |_| None);
        let p = manager.iter().next().unwrap();
        assert_eq!(p.target_fish_id, None);
        assert_eq!(p.dir_x, 1.0);
        assert_eq!(p.dir_y, 0.0);
    }

    #[test]
    fn non_homing_cannon_ignores_target() {
        let mut manager = ProjectileManager::new(ProjectileConfig::default());
        manager.spawn(shot([100.0, 450.0], [1.0, 0.0], 1, Some(5)));
        assert_eq!(manager.iter().next().unwrap().target_fish_id, None);
    }

    #[test]
    fn spent_projectiles_are_removed() {
        let mut manager = ProjectileManager::new(ProjectileConfig::default());
        manager.spawn(shot([100.0, 450.0], [1.0, 0.0], 1, None));
        manager.spawn(shot([200.0, 450.0], [1.0, 0.0], 1, None));
        manager.iter_mut().next().unwrap().spent = true;
        assert_eq!(manager.remove_spent(), 1);
        assert_eq!(manager.len(), 1);
    }
}
