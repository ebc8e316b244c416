//! Match manager - places players into matches and reaps empty ones

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::GameConfig;
use crate::game::player::{JoinError, PlayerId};
use crate::game::ticker::{Clock, MonotonicClock};
use crate::game::{GameMatch, MatchHandle};
use crate::ws::protocol::ServerMsg;

/// How long a match thread gets to exit on removal
pub const STOP_TIMEOUT: Duration = Duration::from_secs(1);

/// Joins retried after losing a race for the last seat
const JOIN_ATTEMPTS: usize = 8;

/// A reserved seat and the delta stream of its match
#[derive(Debug)]
pub struct Seat {
    pub handle: MatchHandle,
    pub slot: u8,
    /// Subscribed before the join was queued, so the first delta with the
    /// player in it is never missed
    pub deltas: broadcast::Receiver<ServerMsg>,
}

/// Registry of running matches
pub struct MatchManager {
    config: Arc<GameConfig>,
    clock: Arc<dyn Clock>,
    matches: DashMap<String, MatchHandle>,
    next_match: AtomicU64,
    /// Serializes match creation so concurrent joiners share a new match
    create_lock: Mutex<()>,
    teardown_tx: mpsc::UnboundedSender<String>,
    teardown_rx: Mutex<Option<mpsc::UnboundedReceiver<String>>>,
}

impl MatchManager {
    pub fn new(config: Arc<GameConfig>) -> Self {
        Self::with_clock(config, Arc::new(MonotonicClock::new()))
    }

    pub fn with_clock(config: Arc<GameConfig>, clock: Arc<dyn Clock>) -> Self {
        let (teardown_tx, teardown_rx) = mpsc::unbounded_channel();
        Self {
            config,
            clock,
            matches: DashMap::new(),
            next_match: AtomicU64::new(1),
            create_lock: Mutex::new(()),
            teardown_tx,
            teardown_rx: Mutex::new(Some(teardown_rx)),
        }
    }

    pub fn get(&self, id: &str) -> Option<MatchHandle> {
        self.matches.get(id).map(|m| m.value().clone())
    }

    pub fn active_matches(&self) -> usize {
        self.matches.len()
    }

    pub fn total_players(&self) -> usize {
        self.matches
            .iter()
            .map(|m| m.value().player_count())
            .sum()
    }

    /// Find a match with a free seat, or start a new one
    pub fn find_or_create_match(&self) -> Result<MatchHandle, JoinError> {
        if let Some(handle) = self.find_available() {
            return Ok(handle);
        }

        let _guard = self.create_lock.lock();
        // Another joiner may have created one while we waited
        if let Some(handle) = self.find_available() {
            return Ok(handle);
        }
        self.create_match()
    }

    fn find_available(&self) -> Option<MatchHandle> {
        self.matches
            .iter()
            .find(|entry| entry.value().can_join())
            .map(|entry| entry.value().clone())
    }

    fn create_match(&self) -> Result<MatchHandle, JoinError> {
        let id = format!("match-{}", self.next_match.fetch_add(1, Ordering::Relaxed));
        let seed = rand::random::<u64>();

        let (game_match, handle) = GameMatch::new(
            id.clone(),
            seed,
            self.config.clone(),
            self.clock.clone(),
            Some(self.teardown_tx.clone()),
        );
        let handle = self.launch(game_match, handle)?;

        info!(match_id = %id, seed, active_matches = self.matches.len(), "Created new match");
        Ok(handle)
    }

    /// Start the tick thread and register the match. A match whose thread
    /// did not start is never registered.
    fn launch(&self, game_match: GameMatch, handle: MatchHandle) -> Result<MatchHandle, JoinError> {
        if !handle.start(game_match) {
            error!(match_id = %handle.id(), "Match loop failed to start");
            return Err(JoinError::MatchClosed);
        }
        self.matches.insert(handle.id().to_string(), handle.clone());
        Ok(handle)
    }

    /// Seat a player in any match with room
    pub fn join(
        &self,
        player_id: PlayerId,
        display_name: &str,
        connection_id: Uuid,
    ) -> Result<Seat, JoinError> {
        for _ in 0..JOIN_ATTEMPTS {
            let handle = self.find_or_create_match()?;
            let deltas = handle.subscribe();
            match handle.add_player(player_id, display_name.to_string(), connection_id, None) {
                Ok(slot) => {
                    return Ok(Seat {
                        handle,
                        slot,
                        deltas,
                    })
                }
                Err(JoinError::MatchFull | JoinError::MatchClosed) => {
                    debug!(match_id = %handle.id(), player_id = %player_id, "Lost seat race, retrying");
                }
                Err(e) => return Err(e),
            }
        }
        Err(JoinError::MatchFull)
    }

    /// Close, stop and forget a match. Returns whether it existed.
    pub fn remove_match(&self, id: &str) -> bool {
        let Some((_, handle)) = self.matches.remove(id) else {
            return false;
        };
        handle.close();
        if !handle.stop(STOP_TIMEOUT) {
            warn!(match_id = %id, "Match thread still running after removal");
        }
        info!(match_id = %id, active_matches = self.matches.len(), "Match removed");
        true
    }

    /// Tear down matches that asked to be reaped, unless someone joined
    /// since. Returns the number removed.
    pub fn process_teardown_requests(&self, ids: impl IntoIterator<Item = String>) -> usize {
        let mut removed = 0;
        for id in ids {
            let Some(handle) = self.get(&id) else {
                continue;
            };
            if handle.close_if_empty() {
                if self.remove_match(&id) {
                    removed += 1;
                }
            } else {
                debug!(match_id = %id, players = handle.player_count(), "Teardown skipped, match repopulated");
            }
        }
        removed
    }

    /// Reap matches as their teardown requests arrive. Stopping a match
    /// joins its thread, so removal runs on the blocking pool.
    pub async fn run(self: Arc<Self>) {
        let Some(mut teardown_rx) = self.teardown_rx.lock().take() else {
            warn!("Match manager reaper already running");
            return;
        };

        while let Some(id) = teardown_rx.recv().await {
            let mut ids = vec![id];
            while let Ok(more) = teardown_rx.try_recv() {
                ids.push(more);
            }
            let manager = self.clone();
            let reaped =
                tokio::task::spawn_blocking(move || manager.process_teardown_requests(ids)).await;
            match reaped {
                Ok(removed) if removed > 0 => debug!(removed, "Reaped empty matches"),
                Ok(_) => {}
                Err(e) => error!(error = %e, "Teardown task failed"),
            }
        }
    }

    /// Stop every match. Returns the number stopped.
    pub fn shutdown_all(&self) -> usize {
        let ids: Vec<String> = self.matches.iter().map(|m| m.key().clone()).collect();
        let stopped = ids.iter().filter(|id| self.remove_match(id)).count();
        info!(stopped, "All matches stopped");
        stopped
    }
}

impl Drop for MatchManager {
    fn drop(&mut self) {
        if !self.matches.is_empty() {
            self.shutdown_all();
        }
    }
}
