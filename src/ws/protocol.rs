//! WebSocket protocol message definitions
//!
//! Server messages go out as MessagePack binary frames with structs encoded
//! as arrays, so field order below is the wire order. Clients may send JSON
//! text or MessagePack binary.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::game::credits::Credits;
use crate::game::interaction::{InteractionAnswer, InteractionPrompt};
use crate::game::kill_sequence::SequenceStep;
use crate::game::odds::{ActiveHotSeat, TableState};
use crate::game::path::PathData;
use crate::game::round::RoundView;

#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("invalid JSON message: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid MessagePack message: {0}")]
    Decode(#[from] rmp_serde::decode::Error),

    #[error("failed to encode message: {0}")]
    Encode(#[from] rmp_serde::encode::Error),
}

/// Messages sent from client to server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMsg {
    /// Launch a shot from `(x, y)` along `(dir_x, dir_y)`
    Fire {
        x: f32,
        y: f32,
        dir_x: f32,
        dir_y: f32,
        /// Homing target, honoured for homing cannons only
        #[serde(default)]
        target_fish_id: Option<u32>,
        /// Echoed back on the projectile
        #[serde(default)]
        client_nonce: Option<u32>,
    },

    /// Bet per shot in whole credits
    SetBetValue { bet_value: i64 },

    ChangeWeapon { cannon_level: u8 },

    SubmitInteraction {
        interaction_id: u32,
        answer: InteractionAnswer,
    },

    /// Ping for latency measurement
    Ping {
        /// Client timestamp
        t: u64,
    },

    /// Leave the match but keep the socket
    Leave,
}

impl ClientMsg {
    pub fn from_text(text: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_binary(bytes: &[u8]) -> Result<Self, ProtocolError> {
        Ok(rmp_serde::from_slice(bytes)?)
    }
}

/// Messages sent from server to client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServerMsg {
    /// Welcome message after connection
    Welcome { player_id: Uuid, server_time: u64 },

    /// Seat confirmed
    MatchJoined {
        match_id: String,
        player_id: Uuid,
        slot: u8,
        tick_rate: u32,
        arena_width: f32,
        arena_height: f32,
    },

    JoinFailed { reason: String },

    /// One per tick per match
    StateDelta(StateDelta),

    /// Error message
    Error { code: String, message: String },

    /// Pong response
    Pong {
        /// Echo back client timestamp
        t: u64,
    },
}

impl ServerMsg {
    pub fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        Ok(rmp_serde::to_vec(self)?)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        Ok(rmp_serde::from_slice(bytes)?)
    }
}

/// Per-tick match state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateDelta {
    pub tick: u64,
    pub table_state: TableState,
    pub hot_seat: Option<ActiveHotSeat>,
    pub round: RoundView,
    pub players: Vec<PlayerView>,
    pub fish: Vec<FishView>,
    pub projectiles: Vec<ProjectileView>,
    /// Kills since the previous delta
    pub payouts: Vec<PayoutEvent>,
    /// Interactions still waiting on their owner
    pub interactions: Vec<InteractionView>,
    /// Interactions resolved since the previous delta
    pub interaction_results: Vec<InteractionOutcome>,
    /// Boss death sweep steps run this tick
    pub boss_sequences: Vec<SequenceStep>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerView {
    pub player_id: Uuid,
    pub display_name: String,
    pub slot: u8,
    pub credits: Credits,
    pub cannon_level: u8,
    pub bet_value: Credits,
    pub kills: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FishView {
    pub id: u32,
    pub type_id: u16,
    pub x: f32,
    pub y: f32,
    pub hp: f32,
    pub max_hp: f32,
    /// School the fish swims with
    pub group_id: Option<u64>,
    /// Present on the spawn tick and after a join
    pub path: Option<PathData>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectileView {
    pub id: u32,
    pub owner_slot: u8,
    pub x: f32,
    pub y: f32,
    pub dir_x: f32,
    pub dir_y: f32,
    pub client_nonce: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayoutEvent {
    pub fish_id: u32,
    pub type_id: u16,
    pub killer_slot: u8,
    pub multiplier: u32,
    pub payout: Credits,
    /// Set when the payout is held for a boss interaction
    pub interaction_id: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionView {
    pub id: u32,
    pub player_slot: u8,
    pub type_id: u16,
    pub prompt: InteractionPrompt,
    pub started_tick: u64,
    pub timeout_tick: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionOutcome {
    pub interaction_id: u32,
    pub player_slot: u8,
    pub score: u32,
    pub modifier: f64,
    pub payout: Credits,
    pub timed_out: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::catalog::DeathEffect;

    #[test]
    fn parses_json_fire() {
        let msg = ClientMsg::from_text(
            r#"{"type":"fire","x":900,"y":850,"dir_x":0,"dir_y":-1,"client_nonce":12}"#,
        )
        .unwrap();
        assert_eq!(
            msg,
            ClientMsg::Fire {
                x: 900.0,
                y: 850.0,
                dir_x: 0.0,
                dir_y: -1.0,
                target_fish_id: None,
                client_nonce: Some(12),
            }
        );
    }

    #[test]
    fn parses_json_interaction() {
        let msg = ClientMsg::from_text(
            r#"{"type":"submit_interaction","interaction_id":3,"answer":{"kind":"chest_choice","choice":2}}"#,
        )
        .unwrap();
        assert_eq!(
            msg,
            ClientMsg::SubmitInteraction {
                interaction_id: 3,
                answer: InteractionAnswer::ChestChoice { choice: 2 },
            }
        );
    }

    #[test]
    fn parses_msgpack_map() {
        let bytes = rmp_serde::to_vec_named(&ClientMsg::SetBetValue { bet_value: 50 }).unwrap();
        assert_eq!(
            ClientMsg::from_binary(&bytes).unwrap(),
            ClientMsg::SetBetValue { bet_value: 50 }
        );
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(
            ClientMsg::from_text("{\"type\":\"teleport\"}"),
            Err(ProtocolError::Json(_))
        ));
        assert!(ClientMsg::from_binary(&[0xc1]).is_err());
    }

    #[test]
    fn state_delta_keeps_cents_exact() {
        let delta = StateDelta {
            tick: 42,
            table_state: TableState::Hot,
            hot_seat: None,
            round: RoundView {
                number: 3,
                ticks_remaining: 1_200,
                transitioning: false,
            },
            players: vec![PlayerView {
                player_id: Uuid::nil(),
                display_name: "ann".into(),
                slot: 3,
                credits: Credits::from_cents(123_456_789_012),
                cannon_level: 2,
                bet_value: Credits::whole(10),
                kills: 1,
            }],
            fish: vec![],
            projectiles: vec![],
            payouts: vec![],
            interactions: vec![],
            interaction_results: vec![],
            boss_sequences: vec![SequenceStep {
                sequence_id: 1,
                fish_id: 77,
                type_id: 111,
                killer_slot: 3,
                effect: DeathEffect::ScreenWipe,
                step: 2,
                destroyed: vec![4, 5],
                payout: Some(Credits::from_cents(1_500_001)),
            }],
        };
        let bytes = ServerMsg::StateDelta(delta.clone()).encode().unwrap();
        assert_eq!(ServerMsg::decode(&bytes).unwrap(), ServerMsg::StateDelta(delta));
    }
}
