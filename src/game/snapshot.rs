//! State delta building

use std::collections::HashSet;

use crate::ws::protocol::{
    FishView, InteractionOutcome, InteractionView, PayoutEvent, PlayerView, ProjectileView,
    StateDelta,
};

use super::fish::FishManager;
use super::interaction::InteractionManager;
use super::kill_sequence::SequenceStep;
use super::odds::OddsControllers;
use super::player::PlayerManager;
use super::projectile::ProjectileManager;
use super::round::RoundView;

/// Borrowed view of everything a delta is built from
pub struct DeltaSource<'a> {
    pub tick: u64,
    pub players: &'a PlayerManager,
    pub fish: &'a FishManager,
    pub projectiles: &'a ProjectileManager,
    pub interactions: &'a InteractionManager,
    pub odds: &'a OddsControllers,
    pub round: RoundView,
}

/// Builds the per-tick delta and tracks which paths still need sending
#[derive(Debug, Default)]
pub struct SnapshotBuilder {
    /// Fish spawned since the last delta
    new_fish: HashSet<u32>,
    /// Someone joined; resend every path once
    resend_paths: bool,
    payouts: Vec<PayoutEvent>,
    interaction_results: Vec<InteractionOutcome>,
    sequence_steps: Vec<SequenceStep>,
}

impl SnapshotBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fish_spawned(&mut self, ids: &[u32]) {
        self.new_fish.extend(ids.iter().copied());
    }

    /// Late joiners need every live path
    pub fn player_joined(&mut self) {
        self.resend_paths = true;
    }

    pub fn record_payout(&mut self, event: PayoutEvent) {
        self.payouts.push(event);
    }

    pub fn record_interaction(&mut self, outcome: InteractionOutcome) {
        self.interaction_results.push(outcome);
    }

    pub fn record_sequence_step(&mut self, step: SequenceStep) {
        self.sequence_steps.push(step);
    }

    /// Build the delta and reset the per-tick buffers
    pub fn build(&mut self, source: DeltaSource<'_>) -> StateDelta {
        let players = source
            .players
            .by_slot()
            .into_iter()
            .map(|p| PlayerView {
                player_id: p.id,
                display_name: p.display_name.clone(),
                slot: p.slot,
                credits: p.credits,
                cannon_level: p.cannon_level,
                bet_value: p.bet_value,
                kills: p.kills,
            })
            .collect();

        let fish = source
            .fish
            .iter()
            .map(|f| FishView {
                id: f.id,
                type_id: f.type_id(),
                x: f.position[0],
                y: f.position[1],
                hp: f.hp,
                max_hp: f.kind.max_hp,
                group_id: f.group_id,
                path: (self.resend_paths || self.new_fish.contains(&f.id))
                    .then(|| f.path_data.clone()),
            })
            .collect();

        let projectiles = source
            .projectiles
            .iter()
            .map(|p| ProjectileView {
                id: p.id,
                owner_slot: p.owner_slot,
                x: p.x,
                y: p.y,
                dir_x: p.dir_x,
                dir_y: p.dir_y,
                client_nonce: p.client_nonce,
            })
            .collect();

        let interactions = source
            .interactions
            .iter()
            .map(|i| InteractionView {
                id: i.id,
                player_slot: i.payout.slot,
                type_id: i.payout.type_id,
                prompt: i.prompt.clone(),
                started_tick: i.started_tick,
                timeout_tick: i.timeout_tick,
            })
            .collect();

        self.new_fish.clear();
        self.resend_paths = false;

        StateDelta {
            tick: source.tick,
            table_state: source.odds.table_state(),
            hot_seat: source.odds.hot_seat.active(),
            round: source.round,
            players,
            fish,
            projectiles,
            payouts: std::mem::take(&mut self.payouts),
            interactions,
            interaction_results: std::mem::take(&mut self.interaction_results),
            boss_sequences: std::mem::take(&mut self.sequence_steps),
        }
    }
}
