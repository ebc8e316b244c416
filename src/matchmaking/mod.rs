//! Match placement and lifecycle

pub mod service;

pub use service::{MatchManager, Seat};
