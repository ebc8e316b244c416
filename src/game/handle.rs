//! Shared handle to a running match
//!
//! The handle is what the rest of the server holds: it reserves seats,
//! forwards inputs to the tick thread and owns that thread's lifecycle.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};
use std::time::{Duration, Instant};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::sync::{broadcast, mpsc};
use tracing::{info, warn};
use uuid::Uuid;

use crate::ws::protocol::ServerMsg;

use super::player::{JoinError, PlayerId, SeatTable};
use super::r#match::GameMatch;
use super::{GameCommand, MatchInput};

/// Lifecycle of the tick thread
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Running,
    Stopped,
}

impl LoopState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => LoopState::Idle,
            1 => LoopState::Running,
            _ => LoopState::Stopped,
        }
    }
}

struct Shared {
    id: String,
    input_tx: mpsc::UnboundedSender<MatchInput>,
    delta_tx: broadcast::Sender<ServerMsg>,
    seats: SeatTable,
    /// Seated players and their slots
    members: DashMap<PlayerId, u8>,
    state: AtomicU8,
    stop: Arc<AtomicBool>,
    thread: Mutex<Option<JoinHandle<()>>>,
    thread_id: Mutex<Option<ThreadId>>,
}

/// Cloneable handle to one match
#[derive(Clone)]
pub struct MatchHandle {
    inner: Arc<Shared>,
}

impl MatchHandle {
    pub(crate) fn new(
        id: String,
        max_players: usize,
        input_tx: mpsc::UnboundedSender<MatchInput>,
        delta_tx: broadcast::Sender<ServerMsg>,
    ) -> Self {
        Self {
            inner: Arc::new(Shared {
                id,
                input_tx,
                delta_tx,
                seats: SeatTable::new(max_players),
                members: DashMap::new(),
                state: AtomicU8::new(LoopState::Idle as u8),
                stop: Arc::new(AtomicBool::new(false)),
                thread: Mutex::new(None),
                thread_id: Mutex::new(None),
            }),
        }
    }

    pub fn id(&self) -> &str {
        &self.inner.id
    }

    pub fn state(&self) -> LoopState {
        LoopState::from_u8(self.inner.state.load(Ordering::Acquire))
    }

    pub fn is_running(&self) -> bool {
        self.state() == LoopState::Running
    }

    /// Spawn the tick thread for `game`. Only the first call starts anything.
    pub fn start(&self, game: GameMatch) -> bool {
        if self
            .inner
            .state
            .compare_exchange(
                LoopState::Idle as u8,
                LoopState::Running as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_err()
        {
            return false;
        }

        let stop = self.inner.stop.clone();
        let spawned = thread::Builder::new()
            .name(format!("match-{}", self.inner.id))
            .spawn(move || game.run(stop));

        match spawned {
            Ok(join) => {
                *self.inner.thread_id.lock() = Some(join.thread().id());
                *self.inner.thread.lock() = Some(join);
                true
            }
            Err(e) => {
                warn!(match_id = %self.inner.id, error = %e, "Failed to spawn match thread");
                self.inner
                    .state
                    .store(LoopState::Stopped as u8, Ordering::Release);
                false
            }
        }
    }

    /// Signal the tick thread and wait up to `timeout` for it to exit.
    /// Returns whether the thread is known to have finished.
    pub fn stop(&self, timeout: Duration) -> bool {
        self.inner.stop.store(true, Ordering::Release);
        self.inner
            .state
            .store(LoopState::Stopped as u8, Ordering::Release);

        // The loop cannot join itself
        if *self.inner.thread_id.lock() == Some(thread::current().id()) {
            return false;
        }

        let Some(join) = self.inner.thread.lock().take() else {
            return true;
        };

        let deadline = Instant::now() + timeout;
        while !join.is_finished() {
            if Instant::now() >= deadline {
                warn!(match_id = %self.inner.id, "Match thread did not stop in time, detaching");
                return false;
            }
            thread::sleep(Duration::from_millis(1));
        }
        let _ = join.join();
        true
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ServerMsg> {
        self.inner.delta_tx.subscribe()
    }

    pub fn player_count(&self) -> usize {
        self.inner.seats.occupied()
    }

    pub fn can_join(&self) -> bool {
        self.state() != LoopState::Stopped && self.inner.seats.has_free_slot()
    }

    /// Reserve a seat and queue the join for the next tick
    pub fn add_player(
        &self,
        player_id: PlayerId,
        display_name: String,
        connection_id: Uuid,
        preferred_slot: Option<u8>,
    ) -> Result<u8, JoinError> {
        let slot = match self.inner.members.entry(player_id) {
            Entry::Occupied(seated) => return Err(JoinError::AlreadySeated(*seated.get())),
            Entry::Vacant(vacant) => {
                let slot = self.inner.seats.claim(preferred_slot)?;
                vacant.insert(slot);
                slot
            }
        };

        let queued = self.inner.input_tx.send(MatchInput::Join {
            player_id,
            display_name,
            connection_id,
            slot,
        });
        if queued.is_err() {
            self.inner.members.remove(&player_id);
            self.inner.seats.release(slot);
            return Err(JoinError::MatchClosed);
        }
        Ok(slot)
    }

    /// Queue a leave and free the seat. Returns whether the player was seated.
    pub fn remove_player(&self, player_id: &PlayerId) -> bool {
        let Some((_, slot)) = self.inner.members.remove(player_id) else {
            return false;
        };
        // Leave must be queued before the seat can be claimed again
        let _ = self.inner.input_tx.send(MatchInput::Leave {
            player_id: *player_id,
        });
        self.inner.seats.release(slot);
        true
    }

    /// Queue a gameplay command. Commands from unseated players are dropped.
    pub fn enqueue(&self, player_id: PlayerId, command: GameCommand) -> bool {
        if !self.inner.members.contains_key(&player_id) {
            return false;
        }
        self.inner
            .input_tx
            .send(MatchInput::Command { player_id, command })
            .is_ok()
    }

    /// Refuse new joins if nobody is seated. Returns whether the match is closed.
    pub fn close_if_empty(&self) -> bool {
        let closed = self.inner.seats.close_if_empty();
        if closed {
            info!(match_id = %self.inner.id, "Match closed to new players");
        }
        closed
    }

    pub fn close(&self) {
        self.inner.seats.close();
    }
}

impl std::fmt::Debug for MatchHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MatchHandle")
            .field("id", &self.inner.id)
            .field("state", &self.state())
            .field("players", &self.player_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::game::ticker::{MonotonicClock, VirtualClock};

    fn new_match(max_players: usize) -> (GameMatch, MatchHandle) {
        GameMatch::new(
            "m-handle".to_string(),
            1,
            Arc::new(GameConfig {
                max_players,
                ..GameConfig::default()
            }),
            Arc::new(VirtualClock::new()),
            None,
        )
    }

    fn join(handle: &MatchHandle) -> Result<u8, JoinError> {
        handle.add_player(Uuid::new_v4(), "p".into(), Uuid::new_v4(), None)
    }

    #[test]
    fn capacity_is_enforced() {
        let (_game, handle) = new_match(2);
        assert_eq!(join(&handle), Ok(0));
        assert_eq!(join(&handle), Ok(1));
        assert_eq!(join(&handle), Err(JoinError::MatchFull));
        assert!(!handle.can_join());
        assert_eq!(handle.player_count(), 2);
    }

    #[test]
    fn duplicate_join_keeps_first_seat() {
        let (_game, handle) = new_match(6);
        let id = Uuid::new_v4();
        assert_eq!(handle.add_player(id, "a".into(), Uuid::new_v4(), Some(3)), Ok(3));
        assert_eq!(
            handle.add_player(id, "a".into(), Uuid::new_v4(), None),
            Err(JoinError::AlreadySeated(3))
        );
        assert_eq!(handle.player_count(), 1);
    }

    #[test]
    fn remove_frees_the_seat() {
        let (_game, handle) = new_match(1);
        let id = Uuid::new_v4();
        handle.add_player(id, "a".into(), Uuid::new_v4(), None).unwrap();
        assert!(handle.remove_player(&id));
        assert!(!handle.remove_player(&id));
        assert!(handle.can_join());
        assert_eq!(join(&handle), Ok(0));
    }

    #[test]
    fn commands_need_a_seat() {
        let (_game, handle) = new_match(6);
        let id = Uuid::new_v4();
        let command = GameCommand::ChangeWeapon { cannon_level: 2 };
        assert!(!handle.enqueue(id, command.clone()));
        handle.add_player(id, "a".into(), Uuid::new_v4(), None).unwrap();
        assert!(handle.enqueue(id, command));
    }

    #[test]
    fn dropped_match_refuses_joins() {
        let (game, handle) = new_match(6);
        drop(game);
        assert_eq!(join(&handle), Err(JoinError::MatchClosed));
        assert_eq!(handle.player_count(), 0);
    }

    #[test]
    fn close_if_empty_only_closes_empty_tables() {
        let (_game, handle) = new_match(6);
        let id = Uuid::new_v4();
        handle.add_player(id, "a".into(), Uuid::new_v4(), None).unwrap();
        assert!(!handle.close_if_empty());
        handle.remove_player(&id);
        assert!(handle.close_if_empty());
        assert_eq!(join(&handle), Err(JoinError::MatchClosed));
    }

    #[test]
    fn start_runs_once_and_stop_joins() {
        let (game, handle) = GameMatch::new(
            "m-live".to_string(),
            2,
            Arc::new(GameConfig::default()),
            Arc::new(MonotonicClock::new()),
            None,
        );
        let mut deltas = handle.subscribe();
        assert_eq!(handle.state(), LoopState::Idle);
        assert!(handle.start(game));
        assert!(handle.is_running());

        let (second, _) = new_match(6);
        assert!(!handle.start(second));

        thread::sleep(Duration::from_millis(120));
        assert!(handle.stop(Duration::from_secs(2)));
        assert_eq!(handle.state(), LoopState::Stopped);
        assert!(!handle.can_join());
        assert!(matches!(deltas.try_recv(), Ok(ServerMsg::StateDelta(_))));
    }

    #[test]
    fn stop_before_start_is_harmless() {
        let (_game, handle) = new_match(6);
        assert!(handle.stop(Duration::from_millis(10)));
        assert_eq!(handle.state(), LoopState::Stopped);
    }
}
