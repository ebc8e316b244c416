//! Match state and authoritative tick loop

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::GameConfig;
use crate::util::time::{tick_interval, SIMULATION_TPS};
use crate::ws::protocol::{InteractionOutcome, PayoutEvent, ServerMsg};

use super::catalog::FishCategory;
use super::collision::{detect_hits, resolve_hits, KillEvent};
use super::credits::Credits;
use super::fish::FishManager;
use super::handle::MatchHandle;
use super::interaction::{HeldPayout, InteractionAnswer, InteractionError, InteractionManager, InteractionResult};
use super::kill_sequence::{CompletedSequence, KillSequences, SequenceStart};
use super::odds::{BossKillCurve, HotColdCycle, HotSeat, OddsControllers, Transition};
use super::payout::{PayoutEngine, PayoutModifiers};
use super::player::{Player, PlayerId, PlayerManager};
use super::projectile::{ProjectileManager, ShotSpec};
use super::round::{RoundCycle, RoundEvent};
use super::snapshot::{DeltaSource, SnapshotBuilder};
use super::ticker::{Clock, TickPoll, Ticker};
use super::{GameCommand, MatchInput};

/// Why a Fire command was dropped
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum FireRejection {
    #[error("unknown player")]
    UnknownPlayer,

    #[error("firing faster than allowed")]
    RateLimited,

    #[error("insufficient credits: need {cost}, have {balance}")]
    InsufficientCredits { cost: Credits, balance: Credits },

    #[error("shot origin outside the arena")]
    OutOfBounds,

    #[error("direction is zero or not finite")]
    InvalidDirection,
}

/// Why any command was dropped
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CommandRejection {
    #[error("unknown player")]
    UnknownPlayer,

    #[error(transparent)]
    Fire(#[from] FireRejection),

    #[error(transparent)]
    Interaction(#[from] InteractionError),
}

/// Match state (owned by the tick thread)
pub struct MatchState {
    pub id: String,
    pub seed: u64,
    pub tick: u64,
    pub players: PlayerManager,
    pub fish: FishManager,
    pub projectiles: ProjectileManager,
    pub interactions: InteractionManager,
    /// Boss death sweeps still running
    pub sequences: KillSequences,
    pub round: RoundCycle,
    pub odds: OddsControllers,
    pub payout: PayoutEngine,
    pub rng: ChaCha8Rng,
    /// When the room last became empty
    pub empty_since: Option<Duration>,
    pub teardown_requested: bool,
}

impl MatchState {
    pub fn new(id: String, seed: u64, config: &GameConfig) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let payout = PayoutEngine::new(config.payout.clone());
        let odds = OddsControllers::new(
            BossKillCurve::new(config.boss_curve.clone(), payout.average_multiplier()),
            HotColdCycle::new(config.hot_cold.clone(), 0, &mut rng),
            HotSeat::new(config.hot_seat.clone()),
        );
        let round = RoundCycle::new(config.round.clone(), 0, &mut rng);

        Self {
            id,
            seed,
            tick: 0,
            players: PlayerManager::new(),
            fish: FishManager::new(config.fish.clone(), config.arena_width, config.arena_height),
            projectiles: ProjectileManager::new(config.projectile.clone()),
            interactions: InteractionManager::new(
                config.interaction_timeout_ticks,
                config.arena_width,
                config.arena_height,
            ),
            sequences: KillSequences::new(config.arena_width, config.arena_height),
            round,
            odds,
            payout,
            rng,
            empty_since: None,
            teardown_requested: false,
        }
    }
}

/// The authoritative game match
pub struct GameMatch {
    state: MatchState,
    config: Arc<GameConfig>,
    clock: Arc<dyn Clock>,
    input_rx: mpsc::UnboundedReceiver<MatchInput>,
    delta_tx: broadcast::Sender<ServerMsg>,
    teardown_tx: Option<mpsc::UnboundedSender<String>>,
    snapshot: SnapshotBuilder,
    /// Tick that panics, for exercising the loop's fault handling
    #[cfg(test)]
    fault_tick: Option<u64>,
}

impl GameMatch {
    /// Create a new match. `teardown_tx` receives the match id once the
    /// room has been empty for the configured timeout.
    pub fn new(
        id: String,
        seed: u64,
        config: Arc<GameConfig>,
        clock: Arc<dyn Clock>,
        teardown_tx: Option<mpsc::UnboundedSender<String>>,
    ) -> (Self, MatchHandle) {
        let (input_tx, input_rx) = mpsc::unbounded_channel();
        let (delta_tx, _) = broadcast::channel(64);

        let mut state = MatchState::new(id.clone(), seed, &config);
        state.empty_since = Some(clock.now());

        let handle = MatchHandle::new(id, config.max_players, input_tx, delta_tx.clone());
        let game_match = Self {
            state,
            config,
            clock,
            input_rx,
            delta_tx,
            teardown_tx,
            snapshot: SnapshotBuilder::new(),
            #[cfg(test)]
            fault_tick: None,
        };

        (game_match, handle)
    }

    pub fn state(&self) -> &MatchState {
        &self.state
    }

    /// Run the tick loop until `stop` is raised
    pub fn run(mut self, stop: Arc<AtomicBool>) {
        info!(
            match_id = %self.state.id,
            seed = self.state.seed,
            bosses = ?self.state.round.eligible(),
            "Match started"
        );

        let mut ticker = Ticker::new(tick_interval(), self.clock.now());
        while !stop.load(Ordering::Acquire) {
            match ticker.poll(self.clock.now()) {
                TickPoll::Due => {
                    let result = panic::catch_unwind(AssertUnwindSafe(|| self.tick()));
                    if result.is_err() {
                        error!(match_id = %self.state.id, tick = self.state.tick, "Tick panicked, continuing");
                    }
                }
                TickPoll::Wait(pause) => std::thread::sleep(pause),
            }
        }

        info!(
            match_id = %self.state.id,
            ticks = self.state.tick,
            rounds = self.state.round.number(),
            resyncs = ticker.resyncs(),
            "Match stopped"
        );
    }

    /// Run one simulation tick
    pub fn tick(&mut self) {
        self.state.tick += 1;
        let tick = self.state.tick;
        let now = self.clock.now();

        #[cfg(test)]
        if self.fault_tick == Some(tick) {
            panic!("injected fault at tick {tick}");
        }

        // 1. Commands
        self.drain_inputs(now);

        // 2. Fish
        self.state.fish.update(tick);

        // 3. Projectiles
        let (width, height) = (self.config.arena_width, self.config.arena_height);
        let fish = &self.state.fish;
        self.state
            .projectiles
            .update(width, height, |id| fish.position_of(id));

        // 4. Collisions
        let kills = self.resolve_collisions(tick);

        // 5. Kills and interactions
        for kill in kills {
            self.apply_kill(kill);
        }
        for result in self.state.interactions.expire(tick) {
            debug!(match_id = %self.state.id, interaction_id = result.interaction_id, "Interaction timed out");
            self.settle_interaction(result);
        }
        self.advance_sequences(tick);
        self.update_odds(tick);

        // 6. Round and spawns
        self.update_round(tick);
        let MatchState {
            fish,
            odds,
            round,
            rng,
            ..
        } = &mut self.state;
        let spawned = fish.run_spawn_policy(
            tick,
            rng,
            odds.hot_cold.boss_spawn_multiplier(),
            round.spawnable_bosses(tick),
        );
        self.snapshot.fish_spawned(&spawned);

        // 7. Empty room
        self.check_empty_room(now);

        // 8. Delta
        let delta = self.snapshot.build(DeltaSource {
            tick,
            players: &self.state.players,
            fish: &self.state.fish,
            projectiles: &self.state.projectiles,
            interactions: &self.state.interactions,
            odds: &self.state.odds,
            round: self.state.round.view(tick),
        });
        let _ = self.delta_tx.send(ServerMsg::StateDelta(delta));
    }

    /// Process all pending inputs
    fn drain_inputs(&mut self, now: Duration) {
        while let Ok(input) = self.input_rx.try_recv() {
            match input {
                MatchInput::Join {
                    player_id,
                    display_name,
                    connection_id,
                    slot,
                } => self.handle_join(player_id, display_name, connection_id, slot),
                MatchInput::Leave { player_id } => self.handle_leave(player_id),
                MatchInput::Command { player_id, command } => {
                    if let Err(reason) = self.apply_command(player_id, command, now) {
                        debug!(
                            match_id = %self.state.id,
                            player_id = %player_id,
                            reason = %reason,
                            "Command rejected"
                        );
                    }
                }
            }
        }
    }

    fn handle_join(&mut self, player_id: PlayerId, display_name: String, connection_id: Uuid, slot: u8) {
        let player = Player::new(
            player_id,
            display_name,
            connection_id,
            slot,
            self.config.starting_credits,
            self.config.default_bet,
        );
        match self.state.players.insert(player) {
            Ok(_) => {
                info!(
                    match_id = %self.state.id,
                    player_id = %player_id,
                    slot,
                    player_count = self.state.players.len(),
                    "Player joined match"
                );
                self.snapshot.player_joined();
                self.state.empty_since = None;
                self.state.teardown_requested = false;
            }
            Err(e) => {
                warn!(match_id = %self.state.id, player_id = %player_id, error = %e, "Join refused by match");
            }
        }
    }

    fn handle_leave(&mut self, player_id: PlayerId) {
        let Some(player) = self.state.players.remove(&player_id) else {
            return;
        };
        self.state.projectiles.remove_owned_by(&player_id);
        let forfeited = self.state.interactions.discard_owned_by(&player_id);
        let sweeps_dropped = self.state.sequences.discard_owned_by(&player_id);
        info!(
            match_id = %self.state.id,
            player_id = %player_id,
            slot = player.slot,
            credits = %player.credits,
            forfeited,
            sweeps_dropped,
            "Player left match"
        );
    }

    /// Apply one command for `player_id`. Rejections leave state untouched.
    pub fn apply_command(
        &mut self,
        player_id: PlayerId,
        command: GameCommand,
        now: Duration,
    ) -> Result<(), CommandRejection> {
        match command {
            GameCommand::Fire {
                x,
                y,
                dir_x,
                dir_y,
                target_fish_id,
                client_nonce,
            } => {
                self.handle_fire(player_id, now, [x, y], [dir_x, dir_y], target_fish_id, client_nonce)?;
            }
            GameCommand::ChangeWeapon { cannon_level } => {
                let player = self
                    .state
                    .players
                    .get_mut(&player_id)
                    .ok_or(CommandRejection::UnknownPlayer)?;
                player.set_cannon_level(cannon_level);
            }
            GameCommand::SetBetValue { bet_value } => {
                let (min, max) = (self.config.min_bet, self.config.max_bet);
                let player = self
                    .state
                    .players
                    .get_mut(&player_id)
                    .ok_or(CommandRejection::UnknownPlayer)?;
                player.bet_value = Credits::whole(bet_value).clamp(min, max);
            }
            GameCommand::SubmitInteraction {
                interaction_id,
                answer,
            } => {
                self.handle_submission(player_id, interaction_id, &answer)?;
            }
        }
        Ok(())
    }

    fn handle_fire(
        &mut self,
        player_id: PlayerId,
        now: Duration,
        origin: [f32; 2],
        direction: [f32; 2],
        target_fish_id: Option<u32>,
        client_nonce: Option<u32>,
    ) -> Result<u32, FireRejection> {
        let (width, height) = (self.config.arena_width, self.config.arena_height);
        let player = self
            .state
            .players
            .get_mut(&player_id)
            .ok_or(FireRejection::UnknownPlayer)?;

        if !player.can_fire(now, self.config.min_fire_interval) {
            return Err(FireRejection::RateLimited);
        }
        let [x, y] = origin;
        if !(x.is_finite() && y.is_finite() && (0.0..=width).contains(&x) && (0.0..=height).contains(&y)) {
            return Err(FireRejection::OutOfBounds);
        }
        let length = direction[0].hypot(direction[1]);
        if !length.is_finite() || length <= f32::EPSILON {
            return Err(FireRejection::InvalidDirection);
        }

        let cost = player.fire_cost();
        let balance = player
            .credits
            .checked_debit(cost)
            .ok_or(FireRejection::InsufficientCredits {
                cost,
                balance: player.credits,
            })?;

        player.credits = balance;
        player.total_spent += cost;
        player.shots_fired += 1;
        player.last_fire_at = Some(now);

        let shot = ShotSpec {
            owner_id: player.id,
            owner_slot: player.slot,
            origin,
            direction: [direction[0] / length, direction[1] / length],
            weapon: player.weapon(),
            wager: cost,
            target_fish_id,
            client_nonce,
        };
        self.state.odds.hot_cold.record_wager(cost);
        Ok(self.state.projectiles.spawn(shot))
    }

    fn handle_submission(
        &mut self,
        player_id: PlayerId,
        interaction_id: u32,
        answer: &InteractionAnswer,
    ) -> Result<(), CommandRejection> {
        if self.state.players.get(&player_id).is_none() {
            return Err(CommandRejection::UnknownPlayer);
        }
        let result = self
            .state
            .interactions
            .submit(interaction_id, player_id, answer)?;
        info!(
            match_id = %self.state.id,
            player_id = %player_id,
            interaction_id,
            score = result.score,
            modifier = result.modifier,
            "Interaction resolved"
        );
        self.settle_interaction(result);
        Ok(())
    }

    fn resolve_collisions(&mut self, tick: u64) -> Vec<KillEvent> {
        let MatchState {
            fish,
            projectiles,
            odds,
            rng,
            ..
        } = &mut self.state;

        let hits = detect_hits(projectiles, fish);
        projectiles.remove_spent();
        if hits.is_empty() {
            return Vec::new();
        }

        let odds_multiplier = odds.hot_cold.boss_odds_multiplier();
        let curve = &mut odds.boss_curve;
        resolve_hits(&hits, fish, |target, hit| {
            curve.roll_hit(target.kind, hit.wager, tick, odds_multiplier, rng)
        })
    }

    fn apply_kill(&mut self, kill: KillEvent) {
        let Some(fish) = self.state.fish.remove(kill.fish_id) else {
            return;
        };
        let kind = fish.kind;
        let Some(player) = self.state.players.get_mut(&kill.killer_id) else {
            debug!(match_id = %self.state.id, fish_id = kill.fish_id, "Killer already left");
            return;
        };

        let multiplier = self.state.payout.roll_multiplier(&mut self.state.rng);
        let modifiers = PayoutModifiers {
            table: self.state.odds.hot_cold.payout_boost(),
            hot_seat: self.state.odds.hot_seat.multiplier_for(player.slot),
            interaction: 1.0,
        };
        let amount = self.state.payout.compute(kind, multiplier, kill.wager, modifiers);
        player.kills += 1;
        let (player_id, slot) = (player.id, player.slot);

        let Some(effect) = kind.death_effect else {
            player.credit(amount);
            self.state.odds.hot_cold.record_payout(amount);
            self.snapshot.record_payout(PayoutEvent {
                fish_id: kill.fish_id,
                type_id: kind.type_id,
                killer_slot: slot,
                multiplier,
                payout: amount,
                interaction_id: None,
            });
            return;
        };

        // Bosses pay when their death sweep completes
        let interaction_id = match kind.interaction {
            Some(interaction_kind) => {
                let held = HeldPayout {
                    fish_id: kill.fish_id,
                    type_id: kind.type_id,
                    player_id,
                    slot,
                    multiplier,
                    amount,
                };
                let interaction = self.state.interactions.open(
                    interaction_kind,
                    held,
                    self.state.tick,
                    &mut self.state.rng,
                );
                Some(interaction.id)
            }
            None => None,
        };

        let opening = self.state.sequences.start(
            SequenceStart {
                fish_id: kill.fish_id,
                type_id: kind.type_id,
                effect,
                killer_id: player_id,
                killer_slot: slot,
                multiplier,
                base_payout: amount,
                wager: kill.wager,
                interaction_id,
            },
            self.state.tick,
        );
        info!(
            match_id = %self.state.id,
            player_id = %player_id,
            boss = kind.name,
            ?effect,
            sequence_id = opening.sequence_id,
            ?interaction_id,
            base_payout = %amount,
            "Boss killed, death sweep started"
        );
        self.snapshot.record_sequence_step(opening);
    }

    /// Credit an interaction. A boss whose sweep waits on it is credited
    /// when the sweep completes instead.
    fn settle_interaction(&mut self, result: InteractionResult) {
        let held = &result.payout;
        let released = self
            .state
            .sequences
            .release(result.interaction_id, result.modifier, self.state.tick);
        if !released {
            if let Some(player) = self.state.players.get_mut(&held.player_id) {
                player.credit(result.final_amount);
                self.state.odds.hot_cold.record_payout(result.final_amount);
            }
        }
        self.snapshot.record_interaction(InteractionOutcome {
            interaction_id: result.interaction_id,
            player_slot: held.slot,
            score: result.score,
            modifier: result.modifier,
            payout: result.final_amount,
            timed_out: result.timed_out,
        });
    }

    fn advance_sequences(&mut self, tick: u64) {
        let MatchState {
            fish,
            sequences,
            rng,
            ..
        } = &mut self.state;
        let advance = sequences.advance(tick, fish, rng);
        for step in advance.steps {
            self.snapshot.record_sequence_step(step);
        }
        for done in advance.completed {
            self.complete_sequence(done);
        }
    }

    fn complete_sequence(&mut self, done: CompletedSequence) {
        let start = &done.start;
        if let Some(player) = self.state.players.get_mut(&start.killer_id) {
            player.credit(done.total);
            self.state.odds.hot_cold.record_payout(done.total);
        }
        info!(
            match_id = %self.state.id,
            player_id = %start.killer_id,
            sequence_id = done.sequence_id,
            modifier = done.modifier,
            payout = %done.total,
            "Boss death sweep paid out"
        );
        self.snapshot.record_payout(PayoutEvent {
            fish_id: start.fish_id,
            type_id: start.type_id,
            killer_slot: start.killer_slot,
            multiplier: start.multiplier,
            payout: done.total,
            interaction_id: start.interaction_id,
        });
    }

    fn update_round(&mut self, tick: u64) {
        let bosses_active =
            self.state.fish.count_category(FishCategory::Boss) > 0 || !self.state.sequences.is_empty();
        match self.state.round.update(tick, bosses_active, &mut self.state.rng) {
            Some(RoundEvent::Ended { number }) => {
                info!(match_id = %self.state.id, round = number, "Round ended, transition started");
            }
            Some(RoundEvent::Started { number }) => {
                info!(
                    match_id = %self.state.id,
                    round = number,
                    bosses = ?self.state.round.eligible(),
                    "Round started"
                );
            }
            None => {}
        }
    }

    fn update_odds(&mut self, tick: u64) {
        let update = self.state.odds.update(tick, &mut self.state.rng);
        match update.table {
            Some(Transition::Natural(state)) => {
                info!(match_id = %self.state.id, ?state, "Table state changed");
            }
            Some(Transition::Forced(state)) => {
                info!(
                    match_id = %self.state.id,
                    ?state,
                    rtp = self.state.odds.hot_cold.rtp(),
                    "Table state forced by RTP correction"
                );
            }
            None => {}
        }
        if let Some(seat) = update.hot_seat {
            info!(
                match_id = %self.state.id,
                slot = seat.slot,
                multiplier = seat.multiplier,
                expires_at_tick = seat.expires_at_tick,
                "Hot seat activated"
            );
        }

        if tick % SIMULATION_TPS as u64 == 0 {
            let fish = &self.state.fish;
            let evicted = self
                .state
                .odds
                .boss_curve
                .evict_stale(tick, |type_id| fish.contains_type(type_id));
            if evicted > 0 {
                debug!(match_id = %self.state.id, evicted, "Evicted stale boss records");
            }
        }
    }

    fn check_empty_room(&mut self, now: Duration) {
        if !self.state.players.is_empty() {
            self.state.empty_since = None;
            self.state.teardown_requested = false;
            return;
        }

        let since = *self.state.empty_since.get_or_insert(now);
        if self.state.teardown_requested || now.saturating_sub(since) < self.config.empty_room_timeout {
            return;
        }

        self.state.teardown_requested = true;
        info!(match_id = %self.state.id, "Match empty past timeout, requesting teardown");
        if let Some(tx) = &self.teardown_tx {
            let _ = tx.send(self.state.id.clone());
        }
    }
}
