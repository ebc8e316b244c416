//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use crate::game::credits::Credits;
use crate::game::fish::FishSpawnConfig;
use crate::game::interaction::DEFAULT_TIMEOUT_TICKS;
use crate::game::odds::{BossCurveConfig, HotColdConfig, HotSeatConfig};
use crate::game::payout::PayoutConfig;
use crate::game::player::MAX_SLOTS;
use crate::game::projectile::ProjectileConfig;
use crate::game::round::RoundConfig;
use crate::util::time::secs_to_ticks;

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Emit JSON lines instead of human-readable logs
    pub log_json: bool,
    /// Allowed client origin for CORS, `*` for any
    pub client_origin: String,
    pub game: GameConfig,
}

/// Tunables for every match
#[derive(Clone, Debug)]
pub struct GameConfig {
    pub arena_width: f32,
    pub arena_height: f32,
    pub max_players: usize,
    /// How long a match may sit empty before it is torn down
    pub empty_room_timeout: Duration,
    pub starting_credits: Credits,
    pub default_bet: Credits,
    pub min_bet: Credits,
    pub max_bet: Credits,
    pub min_fire_interval: Duration,
    pub interaction_timeout_ticks: u64,
    pub fish: FishSpawnConfig,
    pub projectile: ProjectileConfig,
    pub payout: PayoutConfig,
    pub boss_curve: BossCurveConfig,
    pub hot_cold: HotColdConfig,
    pub hot_seat: HotSeatConfig,
    pub round: RoundConfig,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            arena_width: 1800.0,
            arena_height: 900.0,
            max_players: MAX_SLOTS,
            empty_room_timeout: Duration::from_secs(60),
            starting_credits: Credits::whole(1_000),
            default_bet: Credits::whole(10),
            min_bet: Credits::whole(10),
            max_bet: Credits::whole(200),
            min_fire_interval: Duration::from_millis(100),
            interaction_timeout_ticks: DEFAULT_TIMEOUT_TICKS,
            fish: FishSpawnConfig::default(),
            projectile: ProjectileConfig::default(),
            payout: PayoutConfig::default(),
            boss_curve: BossCurveConfig::default(),
            hot_cold: HotColdConfig::default(),
            hot_seat: HotSeatConfig::default(),
            round: RoundConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        // Render provides PORT env var, fall back to SERVER_ADDR or default
        let server_addr = match lookup("PORT") {
            Some(port) => format!("0.0.0.0:{}", port),
            None => lookup("SERVER_ADDR").unwrap_or_else(|| "0.0.0.0:8080".to_string()),
        };

        let mut game = GameConfig::default();
        game.max_players = parse_or(&lookup, "MAX_PLAYERS_PER_MATCH", MAX_SLOTS)?.clamp(1, MAX_SLOTS);
        game.empty_room_timeout =
            Duration::from_secs(parse_or(&lookup, "EMPTY_ROOM_TIMEOUT_SECS", 60u64)?);
        game.starting_credits = Credits::whole(parse_or(&lookup, "STARTING_CREDITS", 1_000i64)?);
        game.min_fire_interval =
            Duration::from_millis(parse_or(&lookup, "MIN_FIRE_INTERVAL_MS", 100u64)?);
        game.boss_curve.target_rtp = parse_or(&lookup, "TARGET_RTP", 1.05f64)?;
        let round_secs = parse_or(&lookup, "ROUND_DURATION_SECS", 600u64)?;
        if round_secs == 0 {
            return Err(ConfigError::Invalid("ROUND_DURATION_SECS"));
        }
        game.round.duration_ticks = secs_to_ticks(round_secs as f64);

        if game.starting_credits.is_negative() {
            return Err(ConfigError::Invalid("STARTING_CREDITS"));
        }
        if !(game.boss_curve.target_rtp.is_finite() && game.boss_curve.target_rtp > 0.0) {
            return Err(ConfigError::Invalid("TARGET_RTP"));
        }

        Ok(Self {
            server_addr: server_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress)?,
            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            log_json: lookup("LOG_FORMAT").is_some_and(|f| f.eq_ignore_ascii_case("json")),
            client_origin: lookup("CLIENT_ORIGIN").unwrap_or_else(|| "*".to_string()),
            game,
        })
    }
}

fn parse_or<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(name) {
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid(name)),
        None => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),

    #[error("Invalid server address format")]
    InvalidAddress,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = load(&[]).unwrap();
        assert_eq!(config.server_addr, "0.0.0.0:8080".parse().unwrap());
        assert_eq!(config.log_level, "info");
        assert!(!config.log_json);
        assert_eq!(config.client_origin, "*");
        assert_eq!(config.game.max_players, 6);
        assert_eq!(config.game.empty_room_timeout, Duration::from_secs(60));
        assert_eq!(config.game.starting_credits, Credits::whole(1_000));
        assert_eq!(config.game.boss_curve.target_rtp, 1.05);
        assert_eq!(config.game.round.duration_ticks, 18_000);
    }

    #[test]
    fn json_logs_are_opt_in() {
        assert!(load(&[("LOG_FORMAT", "JSON")]).unwrap().log_json);
        assert!(!load(&[("LOG_FORMAT", "pretty")]).unwrap().log_json);
    }

    #[test]
    fn port_wins_over_server_addr() {
        let config = load(&[("PORT", "9000"), ("SERVER_ADDR", "127.0.0.1:1")]).unwrap();
        assert_eq!(config.server_addr.port(), 9000);
    }

    #[test]
    fn overrides_are_parsed_and_clamped() {
        let config = load(&[
            ("MAX_PLAYERS_PER_MATCH", "12"),
            ("EMPTY_ROOM_TIMEOUT_SECS", "5"),
            ("MIN_FIRE_INTERVAL_MS", "250"),
            ("TARGET_RTP", "0.96"),
            ("ROUND_DURATION_SECS", "60"),
        ])
        .unwrap();
        assert_eq!(config.game.max_players, 6);
        assert_eq!(config.game.empty_room_timeout, Duration::from_secs(5));
        assert_eq!(config.game.min_fire_interval, Duration::from_millis(250));
        assert_eq!(config.game.boss_curve.target_rtp, 0.96);
        assert_eq!(config.game.round.duration_ticks, 1_800);
    }

    #[test]
    fn invalid_values_are_reported() {
        assert!(matches!(
            load(&[("STARTING_CREDITS", "lots")]),
            Err(ConfigError::Invalid("STARTING_CREDITS"))
        ));
        assert!(matches!(
            load(&[("TARGET_RTP", "0")]),
            Err(ConfigError::Invalid("TARGET_RTP"))
        ));
        assert!(matches!(
            load(&[("ROUND_DURATION_SECS", "0")]),
            Err(ConfigError::Invalid("ROUND_DURATION_SECS"))
        ));
        assert!(matches!(
            load(&[("SERVER_ADDR", "not an address")]),
            Err(ConfigError::InvalidAddress)
        ));
    }
}
