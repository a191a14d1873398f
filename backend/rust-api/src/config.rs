use serde::Deserialize;
use std::env;
use std::str::FromStr;
use std::time::Duration;
use validator::Validate;

use crate::services::quiz_session::GameRules;

pub const DEFAULT_QUIZ_SOURCE_URL: &str = "https://api.jsonserve.com/Uw5CrX";
pub const DEFAULT_RESULTS_KEY: &str = "lastQuizResults";

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct Config {
    pub bind_addr: String,
    #[validate(url(message = "quiz.source_url must be an absolute URL"))]
    pub quiz_source_url: String,
    pub embedded_fallback: bool,
    #[validate(range(min = 1, max = 3600))]
    pub question_seconds: u32,
    #[validate(range(max = 3600))]
    pub extra_time_seconds: u32,
    #[validate(range(min = 10, max = 60000))]
    pub tick_interval_ms: u64,
    #[validate(range(min = 1))]
    pub session_ttl_seconds: u64,
    #[validate(length(min = 1))]
    pub results_key: String,
    pub redis_uri: Option<String>,
    /// `user:password` guarding `/metrics`.
    pub metrics_auth: String,
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        // Root .env first (two levels up), then the local one.
        let skip_root_env = env::var("SKIP_ROOT_ENV").is_ok();
        if skip_root_env {
            dotenvy::dotenv().ok();
        } else if dotenvy::from_path("../../.env").is_err() {
            dotenvy::dotenv().ok();
        }

        let env = env::var("APP_ENV").unwrap_or_else(|_| "dev".to_string());

        // config/{env}.toml, then APP__SECTION__KEY overrides
        let settings = config::Config::builder()
            .add_source(config::File::with_name(&format!("config/{}", env)).required(false))
            .add_source(config::Environment::with_prefix("APP").separator("__"))
            .build()?;

        let config = Config {
            bind_addr: read(&settings, "server.bind_addr", "BIND_ADDR")
                .unwrap_or_else(|| "0.0.0.0:8081".to_string()),
            quiz_source_url: read(&settings, "quiz.source_url", "QUIZ_SOURCE_URL")
                .unwrap_or_else(|| DEFAULT_QUIZ_SOURCE_URL.to_string()),
            embedded_fallback: parse(
                &settings,
                "quiz.embedded_fallback",
                "QUIZ_EMBEDDED_FALLBACK",
                false,
            )?,
            question_seconds: parse(
                &settings,
                "quiz.question_seconds",
                "QUIZ_QUESTION_SECONDS",
                30,
            )?,
            extra_time_seconds: parse(
                &settings,
                "quiz.extra_time_seconds",
                "QUIZ_EXTRA_TIME_SECONDS",
                15,
            )?,
            tick_interval_ms: parse(
                &settings,
                "quiz.tick_interval_ms",
                "QUIZ_TICK_INTERVAL_MS",
                1000,
            )?,
            session_ttl_seconds: parse(
                &settings,
                "sessions.ttl_seconds",
                "SESSION_TTL_SECONDS",
                3600,
            )?,
            results_key: read(&settings, "results.key", "RESULTS_KEY")
                .unwrap_or_else(|| DEFAULT_RESULTS_KEY.to_string()),
            redis_uri: read(&settings, "redis.uri", "REDIS_URI"),
            metrics_auth: read(&settings, "metrics.auth", "METRICS_AUTH").unwrap_or_else(|| {
                if env == "prod" {
                    eprintln!("WARNING: METRICS_AUTH not set, /metrics uses default credentials");
                }
                "admin:changeme".to_string()
            }),
        };

        config
            .validate()
            .map_err(|e| config::ConfigError::Message(format!("Invalid configuration: {}", e)))?;

        Ok(config)
    }

    pub fn game_rules(&self) -> GameRules {
        GameRules {
            question_seconds: self.question_seconds,
            extra_time_seconds: self.extra_time_seconds,
            ..GameRules::default()
        }
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_seconds)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8081".to_string(),
            quiz_source_url: DEFAULT_QUIZ_SOURCE_URL.to_string(),
            embedded_fallback: false,
            question_seconds: 30,
            extra_time_seconds: 15,
            tick_interval_ms: 1000,
            session_ttl_seconds: 3600,
            results_key: DEFAULT_RESULTS_KEY.to_string(),
            redis_uri: None,
            metrics_auth: "admin:changeme".to_string(),
        }
    }
}

/// Layered setting first, bare environment variable second. Blank values count
/// as unset.
fn read(settings: &config::Config, key: &str, env_key: &str) -> Option<String> {
    settings
        .get_string(key)
        .ok()
        .or_else(|| env::var(env_key).ok())
        .filter(|v| !v.trim().is_empty())
}

fn parse<T: FromStr>(
    settings: &config::Config,
    key: &str,
    env_key: &str,
    default: T,
) -> Result<T, config::ConfigError> {
    match read(settings, key, env_key) {
        Some(raw) => raw.trim().parse::<T>().map_err(|_| {
            config::ConfigError::Message(format!("{} has an invalid value: {:?}", key, raw))
        }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VARS: [&str; 5] = [
        "QUIZ_SOURCE_URL",
        "QUIZ_QUESTION_SECONDS",
        "QUIZ_EMBEDDED_FALLBACK",
        "REDIS_URI",
        "SKIP_ROOT_ENV",
    ];

    fn clear_env() {
        for var in VARS {
            env::remove_var(var);
        }
        env::set_var("SKIP_ROOT_ENV", "1");
    }

    #[test]
    #[serial_test::serial]
    fn defaults_apply_without_overrides() {
        clear_env();
        let config = Config::load().unwrap();

        assert_eq!(config.quiz_source_url, DEFAULT_QUIZ_SOURCE_URL);
        assert_eq!(config.question_seconds, 30);
        assert!(!config.embedded_fallback);
        assert!(config.redis_uri.is_none());
        assert_eq!(config.game_rules(), GameRules::default());
        assert_eq!(config.tick_interval(), Duration::from_secs(1));
    }

    #[test]
    #[serial_test::serial]
    fn environment_fallbacks_are_read() {
        clear_env();
        env::set_var("QUIZ_QUESTION_SECONDS", "45");
        env::set_var("QUIZ_EMBEDDED_FALLBACK", "true");
        env::set_var("REDIS_URI", "redis://127.0.0.1:6379/0");

        let config = Config::load().unwrap();
        clear_env();

        assert_eq!(config.question_seconds, 45);
        assert!(config.embedded_fallback);
        assert_eq!(config.redis_uri.as_deref(), Some("redis://127.0.0.1:6379/0"));
        assert_eq!(config.game_rules().question_seconds, 45);
    }

    #[test]
    #[serial_test::serial]
    fn invalid_values_are_rejected() {
        clear_env();
        env::set_var("QUIZ_QUESTION_SECONDS", "soon");
        assert!(Config::load().is_err());

        env::set_var("QUIZ_QUESTION_SECONDS", "0");
        assert!(Config::load().is_err());

        clear_env();
        env::set_var("QUIZ_SOURCE_URL", "not a url");
        assert!(Config::load().is_err());
        clear_env();
    }
}
