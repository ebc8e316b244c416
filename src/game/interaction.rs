//! Boss kill interactions
//!
//! Some bosses hold their payout until the killer plays a short decision
//! round. The result scales the held payout; running out the timer applies
//! a penalty modifier.

use std::collections::BTreeMap;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::catalog::InteractionKind;
use super::credits::Credits;
use super::path::Point;
use super::player::PlayerId;

pub const DEFAULT_TIMEOUT_TICKS: u64 = 300;
pub const TIMEOUT_MODIFIER: f64 = 0.7;
pub const CHEST_MODIFIERS: [f64; 3] = [0.7, 1.0, 1.3];
pub const TOOTH_TARGETS: usize = 5;
pub const TOOTH_RADIUS: f32 = 40.0;

/// Modifier by tooth hits, index = hits
const TOOTH_MODIFIERS: [f64; TOOTH_TARGETS + 1] = [0.7, 0.9, 1.0, 1.1, 1.2, 1.3];

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum InteractionError {
    /// Never opened, already resolved, or expired
    #[error("unknown interaction {0}")]
    Unknown(u32),

    #[error("interaction belongs to another player")]
    WrongPlayer,

    #[error("answer does not fit the interaction")]
    WrongAnswerKind,
}

/// What the killer is shown
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionPrompt {
    /// Pick one of `chests`; contents stay hidden
    ChestChoice { chests: u8 },
    ToothStrike { targets: Vec<Point>, radius: f32 },
}

/// The killer's submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InteractionAnswer {
    ChestChoice { choice: u32 },
    ToothStrike { clicks: Vec<Point> },
}

/// Payout held back until the interaction resolves
#[derive(Debug, Clone, PartialEq)]
pub struct HeldPayout {
    pub fish_id: u32,
    pub type_id: u16,
    pub player_id: PlayerId,
    pub slot: u8,
    pub multiplier: u32,
    pub amount: Credits,
}

#[derive(Debug, Clone)]
pub struct Interaction {
    pub id: u32,
    pub prompt: InteractionPrompt,
    pub started_tick: u64,
    pub timeout_tick: u64,
    pub payout: HeldPayout,
    chests: Vec<f64>,
}

impl Interaction {
    pub fn player_id(&self) -> PlayerId {
        self.payout.player_id
    }

    /// Score and modifier for an answer
    fn evaluate(&self, answer: &InteractionAnswer) -> Result<(u32, f64), InteractionError> {
        match (&self.prompt, answer) {
            (InteractionPrompt::ChestChoice { .. }, InteractionAnswer::ChestChoice { choice }) => {
                match self.chests.get(*choice as usize) {
                    Some(modifier) => Ok((*choice, *modifier)),
                    None => Ok((0, 0.0)),
                }
            }
            (
                InteractionPrompt::ToothStrike { targets, radius },
                InteractionAnswer::ToothStrike { clicks },
            ) => {
                let hits = targets
                    .iter()
                    .filter(|t| clicks.iter().any(|c| within(*c, **t, *radius)))
                    .count();
                Ok((hits as u32, TOOTH_MODIFIERS[hits.min(TOOTH_TARGETS)]))
            }
            _ => Err(InteractionError::WrongAnswerKind),
        }
    }
}

fn within(a: Point, b: Point, radius: f32) -> bool {
    let dx = a[0] - b[0];
    let dy = a[1] - b[1];
    dx * dx + dy * dy <= radius * radius
}

/// A resolved interaction, ready to credit
#[derive(Debug, Clone, PartialEq)]
pub struct InteractionResult {
    pub interaction_id: u32,
    pub score: u32,
    pub modifier: f64,
    pub timed_out: bool,
    pub payout: HeldPayout,
    /// `payout.amount` scaled by the modifier
    pub final_amount: Credits,
}

/// Pending interactions of one match
#[derive(Debug)]
pub struct InteractionManager {
    pending: BTreeMap<u32, Interaction>,
    next_id: u32,
    timeout_ticks: u64,
    width: f32,
    height: f32,
}

impl InteractionManager {
    pub fn new(timeout_ticks: u64, width: f32, height: f32) -> Self {
        Self {
            pending: BTreeMap::new(),
            next_id: 1,
            timeout_ticks,
            width,
            height,
        }
    }

    pub fn open(
        &mut self,
        kind: InteractionKind,
        payout: HeldPayout,
        tick: u64,
        rng: &mut impl Rng,
    ) -> &Interaction {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1).max(1);

        let mut chests = Vec::new();
        let prompt = match kind {
            InteractionKind::ChestChoice => {
                chests = CHEST_MODIFIERS.to_vec();
                chests.shuffle(rng);
                InteractionPrompt::ChestChoice {
                    chests: chests.len() as u8,
                }
            }
            InteractionKind::ToothStrike => {
                let (w, h) = (self.width, self.height);
                let targets = (0..TOOTH_TARGETS)
                    .map(|_| [rng.gen_range(w * 0.25..w * 0.75), rng.gen_range(h * 0.25..h * 0.75)])
                    .collect();
                InteractionPrompt::ToothStrike {
                    targets,
                    radius: TOOTH_RADIUS,
                }
            }
        };

        self.pending.entry(id).or_insert(Interaction {
            id,
            prompt,
            started_tick: tick,
            timeout_tick: tick + self.timeout_ticks,
            payout,
            chests,
        })
    }

    /// Resolve an interaction with the owner's answer
    pub fn submit(
        &mut self,
        id: u32,
        player_id: PlayerId,
        answer: &InteractionAnswer,
    ) -> Result<InteractionResult, InteractionError> {
        let interaction = self.pending.get(&id).ok_or(InteractionError::Unknown(id))?;
        if interaction.player_id() != player_id {
            return Err(InteractionError::WrongPlayer);
        }
        let (score, modifier) = interaction.evaluate(answer)?;

        let interaction = self.pending.remove(&id).ok_or(InteractionError::Unknown(id))?;
        Ok(resolve(interaction, score, modifier, false))
    }

    /// Resolve every interaction whose timer ran out
    pub fn expire(&mut self, tick: u64) -> Vec<InteractionResult> {
        let expired: Vec<u32> = self
            .pending
            .values()
            .filter(|i| tick >= i.timeout_tick)
            .map(|i| i.id)
            .collect();
        expired
            .into_iter()
            .filter_map(|id| self.pending.remove(&id))
            .map(|i| resolve(i, 0, TIMEOUT_MODIFIER, true))
            .collect()
    }

    /// Drop a departed player's interactions; their held payouts are forfeit
    pub fn discard_owned_by(&mut self, player_id: &PlayerId) -> usize {
        let before = self.pending.len();
        self.pending.retain(|_, i| &i.player_id() != player_id);
        before - self.pending.len()
    }

    pub fn get(&self, id: u32) -> Option<&Interaction> {
        self.pending.get(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Interaction> {
        self.pending.values()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

fn resolve(interaction: Interaction, score: u32, modifier: f64, timed_out: bool) -> InteractionResult {
    let final_amount = interaction.payout.amount.scale(modifier);
    InteractionResult {
        interaction_id: interaction.id,
        score,
        modifier,
        timed_out,
        payout: interaction.payout,
        final_amount,
    }
}
