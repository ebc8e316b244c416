//! Game simulation modules

pub mod catalog;
pub mod collision;
pub mod credits;
pub mod fish;
pub mod handle;
pub mod interaction;
pub mod kill_sequence;
pub mod r#match;
pub mod odds;
pub mod path;
pub mod payout;
pub mod player;
pub mod projectile;
pub mod rng;
pub mod round;
pub mod snapshot;
pub mod ticker;

pub use handle::MatchHandle;
pub use r#match::GameMatch;

use uuid::Uuid;

use crate::ws::protocol::ClientMsg;
use interaction::InteractionAnswer;
use player::PlayerId;

/// A gameplay command, always applied on the tick thread
#[derive(Debug, Clone, PartialEq)]
pub enum GameCommand {
    Fire {
        x: f32,
        y: f32,
        dir_x: f32,
        dir_y: f32,
        target_fish_id: Option<u32>,
        client_nonce: Option<u32>,
    },
    ChangeWeapon {
        cannon_level: u8,
    },
    /// Whole credits
    SetBetValue {
        bet_value: i64,
    },
    SubmitInteraction {
        interaction_id: u32,
        answer: InteractionAnswer,
    },
}

impl GameCommand {
    /// Gameplay commands carried by a client message; session messages map to `None`
    pub fn from_client(msg: ClientMsg) -> Option<Self> {
        match msg {
            ClientMsg::Fire {
                x,
                y,
                dir_x,
                dir_y,
                target_fish_id,
                client_nonce,
            } => Some(GameCommand::Fire {
                x,
                y,
                dir_x,
                dir_y,
                target_fish_id,
                client_nonce,
            }),
            ClientMsg::SetBetValue { bet_value } => Some(GameCommand::SetBetValue { bet_value }),
            ClientMsg::ChangeWeapon { cannon_level } => {
                Some(GameCommand::ChangeWeapon { cannon_level })
            }
            ClientMsg::SubmitInteraction {
                interaction_id,
                answer,
            } => Some(GameCommand::SubmitInteraction {
                interaction_id,
                answer,
            }),
            ClientMsg::Ping { .. } | ClientMsg::Leave => None,
        }
    }
}

/// Everything the tick thread consumes from its queue
#[derive(Debug, Clone, PartialEq)]
pub enum MatchInput {
    /// Seat already reserved by the handle
    Join {
        player_id: PlayerId,
        display_name: String,
        connection_id: Uuid,
        slot: u8,
    },
    Leave {
        player_id: PlayerId,
    },
    Command {
        player_id: PlayerId,
        command: GameCommand,
    },
}
