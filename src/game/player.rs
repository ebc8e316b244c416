//! Players and seat allocation

use std::collections::HashMap;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;

use uuid::Uuid;

use super::credits::Credits;
use super::projectile::{WeaponStats, MAX_CANNON_LEVEL};

pub type PlayerId = Uuid;

/// Seats around the table
pub const MAX_SLOTS: usize = 6;

/// Why a join was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum JoinError {
    #[error("match is full")]
    MatchFull,

    #[error("match is closed")]
    MatchClosed,

    #[error("slot {0} is taken")]
    SlotTaken(u8),

    #[error("player already seated in slot {0}")]
    AlreadySeated(u8),
}

/// Authoritative player state, owned by the tick thread
#[derive(Debug, Clone)]
pub struct Player {
    pub id: PlayerId,
    pub display_name: String,
    pub connection_id: Uuid,
    pub slot: u8,
    pub credits: Credits,
    pub cannon_level: u8,
    pub bet_value: Credits,
    pub last_fire_at: Option<Duration>,
    pub total_spent: Credits,
    pub total_earned: Credits,
    pub kills: u32,
    pub shots_fired: u32,
}

impl Player {
    pub fn new(
        id: PlayerId,
        display_name: String,
        connection_id: Uuid,
        slot: u8,
        credits: Credits,
        bet_value: Credits,
    ) -> Self {
        Self {
            id,
            display_name,
            connection_id,
            slot,
            credits,
            cannon_level: 1,
            bet_value,
            last_fire_at: None,
            total_spent: Credits::ZERO,
            total_earned: Credits::ZERO,
            kills: 0,
            shots_fired: 0,
        }
    }

    pub fn weapon(&self) -> WeaponStats {
        WeaponStats::for_level(self.cannon_level)
    }

    /// Credits deducted for one shot at the current bet and cannon
    pub fn fire_cost(&self) -> Credits {
        self.bet_value.times(self.weapon().cost_factor)
    }

    pub fn can_fire(&self, now: Duration, min_interval: Duration) -> bool {
        match self.last_fire_at {
            Some(last) => now.saturating_sub(last) >= min_interval,
            None => true,
        }
    }

    pub fn set_cannon_level(&mut self, level: u8) {
        self.cannon_level = level.clamp(1, MAX_CANNON_LEVEL);
    }

    pub fn credit(&mut self, amount: Credits) {
        self.credits += amount;
        self.total_earned += amount;
    }
}

/// Players of one match, keyed by id
#[derive(Debug, Default)]
pub struct PlayerManager {
    players: HashMap<PlayerId, Player>,
}

impl PlayerManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seat a player. An id that is already present keeps its seat.
    pub fn insert(&mut self, player: Player) -> Result<&Player, JoinError> {
        if let Some(existing) = self.players.get(&player.id) {
            return Err(JoinError::AlreadySeated(existing.slot));
        }
        if self.players.len() >= MAX_SLOTS {
            return Err(JoinError::MatchFull);
        }
        if self.players.values().any(|p| p.slot == player.slot) {
            return Err(JoinError::SlotTaken(player.slot));
        }
        let id = player.id;
        Ok(self.players.entry(id).or_insert(player))
    }

    /// Remove a player; absent ids are a no-op
    pub fn remove(&mut self, id: &PlayerId) -> Option<Player> {
        self.players.remove(id)
    }

    pub fn get(&self, id: &PlayerId) -> Option<&Player> {
        self.players.get(id)
    }

    pub fn get_mut(&mut self, id: &PlayerId) -> Option<&mut Player> {
        self.players.get_mut(id)
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// Players ordered by slot
    pub fn by_slot(&self) -> Vec<&Player> {
        let mut players: Vec<&Player> = self.players.values().collect();
        players.sort_by_key(|p| p.slot);
        players
    }

    pub fn available_slots(&self) -> Vec<u8> {
        (0..MAX_SLOTS as u8)
            .filter(|slot| !self.players.values().any(|p| p.slot == *slot))
            .collect()
    }
}

const CLOSED_BIT: u8 = 1 << 7;
const SLOT_MASK: u8 = (1 << MAX_SLOTS) - 1;

/// Lock-free seat reservation shared between joiners and the tick thread.
///
/// Bits 0..6 mark taken slots, bit 7 marks a closed table. A claim only
/// succeeds while the table is open and below capacity, so concurrent joins
/// can never seat more players than there are slots.
#[derive(Debug)]
pub struct SeatTable {
    bits: AtomicU8,
    capacity: usize,
}

impl SeatTable {
    pub fn new(capacity: usize) -> Self {
        Self {
            bits: AtomicU8::new(0),
            capacity: capacity.clamp(1, MAX_SLOTS),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn occupied(&self) -> usize {
        (self.bits.load(Ordering::Acquire) & SLOT_MASK).count_ones() as usize
    }

    pub fn is_closed(&self) -> bool {
        self.bits.load(Ordering::Acquire) & CLOSED_BIT != 0
    }

    pub fn has_free_slot(&self) -> bool {
        !self.is_closed() && self.occupied() < self.capacity
    }

    /// Claim the preferred slot, or the lowest free one
    pub fn claim(&self, preferred: Option<u8>) -> Result<u8, JoinError> {
        let mut current = self.bits.load(Ordering::Acquire);
        loop {
            if current & CLOSED_BIT != 0 {
                return Err(JoinError::MatchClosed);
            }
            let taken = current & SLOT_MASK;
            if taken.count_ones() as usize >= self.capacity {
                return Err(JoinError::MatchFull);
            }

            let slot = match preferred {
                Some(slot) if (slot as usize) < self.capacity => {
                    if taken & (1 << slot) != 0 {
                        return Err(JoinError::SlotTaken(slot));
                    }
                    slot
                }
                _ => match (0..self.capacity as u8).find(|s| taken & (1 << s) == 0) {
                    Some(slot) => slot,
                    None => return Err(JoinError::MatchFull),
                },
            };

            match self.bits.compare_exchange_weak(
                current,
                current | (1 << slot),
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return Ok(slot),
                Err(actual) => current = actual,
            }
        }
    }

    pub fn release(&self, slot: u8) {
        if (slot as usize) < MAX_SLOTS {
            self.bits.fetch_and(!(1 << slot), Ordering::AcqRel);
        }
    }

    /// Close only if nobody is seated. Returns whether the table is now closed.
    pub fn close_if_empty(&self) -> bool {
        match self
            .bits
            .compare_exchange(0, CLOSED_BIT, Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) => true,
            Err(actual) => actual & CLOSED_BIT != 0,
        }
    }

    pub fn close(&self) {
        self.bits.fetch_or(CLOSED_BIT, Ordering::AcqRel);
    }
}
