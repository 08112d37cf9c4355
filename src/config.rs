use anyhow::{Context, Result};
use std::time::Duration;

use crate::audio::{SessionOptions, MAX_VOLUME};

#[derive(Debug, Clone)]
pub struct Config {
    // Discord
    pub discord_token: String,
    pub bot_prefix: String,

    // Spotify
    pub spotify_client_id: String,
    pub spotify_client_secret: String,

    // Reproducción
    pub max_queue_size: usize,
    pub loop_requeues_on_skip: bool,
    pub youtube_fallback: bool,
    pub default_volume: u8,

    // Límites
    pub command_cooldown: Duration,
    pub http_timeout: Duration,
}

impl Config {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            // Discord
            discord_token: std::env::var("DISCORD_TOKEN").context("DISCORD_TOKEN no definido")?,
            bot_prefix: std::env::var("BOT_PREFIX").unwrap_or_else(|_| "!".to_string()),

            // Spotify
            spotify_client_id: std::env::var("SPOTIFY_CLIENT_ID")
                .context("SPOTIFY_CLIENT_ID no definido")?,
            spotify_client_secret: std::env::var("SPOTIFY_CLIENT_SECRET")
                .context("SPOTIFY_CLIENT_SECRET no definido")?,

            // Reproducción
            max_queue_size: std::env::var("MAX_QUEUE_SIZE")
                .unwrap_or_else(|_| "1000".to_string())
                .parse()
                .context("MAX_QUEUE_SIZE inválido")?,
            loop_requeues_on_skip: std::env::var("LOOP_REQUEUES_ON_SKIP")
                .unwrap_or_else(|_| "false".to_string())
                .parse()
                .context("LOOP_REQUEUES_ON_SKIP inválido")?,
            youtube_fallback: std::env::var("YOUTUBE_FALLBACK")
                .unwrap_or_else(|_| "true".to_string())
                .parse()
                .context("YOUTUBE_FALLBACK inválido")?,
            default_volume: std::env::var("DEFAULT_VOLUME")
                .unwrap_or_else(|_| "50".to_string())
                .parse()
                .context("DEFAULT_VOLUME inválido")?,

            // Límites
            command_cooldown: parse_duration_var("COMMAND_COOLDOWN", "0s")?,
            http_timeout: parse_duration_var("HTTP_TIMEOUT", "10s")?,
        };

        config.validate()?;

        Ok(config)
    }

    /// Validates configuration values for correctness.
    ///
    /// # Validation Rules
    ///
    /// - Discord token and command prefix must not be empty
    /// - Max queue size must be greater than 0
    /// - Default volume must be between 0 and 100
    /// - HTTP timeout must be greater than 0
    pub fn validate(&self) -> Result<()> {
        if self.discord_token.trim().is_empty() {
            anyhow::bail!("DISCORD_TOKEN must not be empty");
        }

        if self.bot_prefix.trim().is_empty() {
            anyhow::bail!("BOT_PREFIX must not be empty");
        }

        if self.max_queue_size == 0 {
            anyhow::bail!("Max queue size must be greater than 0");
        }

        if self.default_volume > MAX_VOLUME {
            anyhow::bail!("Default volume must be between 0 and {}", MAX_VOLUME);
        }

        if self.http_timeout.is_zero() {
            anyhow::bail!("HTTP timeout must be greater than 0");
        }

        Ok(())
    }

    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            max_queue_size: self.max_queue_size,
            requeue_skipped_on_loop: self.loop_requeues_on_skip,
            default_volume: self.default_volume,
        }
    }

    /// Returns a summary of the current configuration for logging.
    ///
    /// Tokens and secrets are left out.
    pub fn summary(&self) -> String {
        format!(
            "Config Summary:\n  \
            Discord: prefix '{}'\n  \
            Playback: {} max queue, loop re-queues on skip={}, YouTube fallback={}, volume {}%\n  \
            Limits: {} command cooldown, {} HTTP timeout",
            self.bot_prefix,
            self.max_queue_size,
            self.loop_requeues_on_skip,
            self.youtube_fallback,
            self.default_volume,
            humantime::format_duration(self.command_cooldown),
            humantime::format_duration(self.http_timeout),
        )
    }
}

fn parse_duration_var(name: &str, default: &str) -> Result<Duration> {
    let raw = std::env::var(name).unwrap_or_else(|_| default.to_string());
    humantime::parse_duration(raw.trim()).with_context(|| format!("{name} inválido: {raw}"))
}

/// Default configuration values.
///
/// Used as fallbacks when environment variables are not provided.
impl Default for Config {
    fn default() -> Self {
        Self {
            // Discord (token must be provided)
            discord_token: String::new(),
            bot_prefix: "!".to_string(),

            spotify_client_id: String::new(),
            spotify_client_secret: String::new(),

            max_queue_size: 1000,
            loop_requeues_on_skip: false,
            youtube_fallback: true,
            default_volume: 50,

            command_cooldown: Duration::ZERO,
            http_timeout: Duration::from_secs(10),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> Config {
        Config {
            discord_token: "token".to_string(),
            ..Config::default()
        }
    }

    #[test]
    fn test_defaults_validate_once_token_is_set() {
        assert!(Config::default().validate().is_err());
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn test_rejects_zero_queue_size_and_blank_prefix() {
        let config = Config {
            max_queue_size: 0,
            ..valid()
        };
        assert!(config.validate().is_err());

        let config = Config {
            bot_prefix: "  ".to_string(),
            ..valid()
        };
        assert!(config.validate().is_err());

        let config = Config {
            default_volume: 101,
            ..valid()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_summary_hides_secrets() {
        let config = Config {
            spotify_client_secret: "super-secret".to_string(),
            ..valid()
        };
        let summary = config.summary();
        assert!(!summary.contains("token"));
        assert!(!summary.contains("super-secret"));
        assert!(summary.contains("1000 max queue"));
    }

    #[test]
    fn test_session_options_follow_config() {
        let config = Config {
            max_queue_size: 5,
            loop_requeues_on_skip: true,
            default_volume: 30,
            ..valid()
        };
        let options = config.session_options();
        assert_eq!(options.max_queue_size, 5);
        assert!(options.requeue_skipped_on_loop);
        assert_eq!(options.default_volume, 30);
    }
}
