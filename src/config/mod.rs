use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::session::SessionConfig;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CookieSameSite {
    Lax,
    Strict,
    None,
}

impl FromStr for CookieSameSite {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lax" => Ok(Self::Lax),
            "strict" => Ok(Self::Strict),
            "none" => Ok(Self::None),
            _ => Err(()),
        }
    }
}

/// `<requests>/<period>`, e.g. `5/minute`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimit {
    pub requests: u32,
    pub window_secs: u64,
}

impl RateLimit {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

impl FromStr for RateLimit {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (requests, period) = s.split_once('/').ok_or(())?;
        let requests = requests.trim().parse::<u32>().map_err(|_| ())?;
        let window_secs = match period.trim().to_ascii_lowercase().as_str() {
            "second" | "s" => 1,
            "minute" | "m" => 60,
            "hour" | "h" => 3600,
            "day" | "d" => 86400,
            _ => return Err(()),
        };
        if requests == 0 {
            return Err(());
        }
        Ok(Self {
            requests,
            window_secs,
        })
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub passphrase_auth: bool,
    pub passphrase: String,
    pub session_timeout_secs: u64,
    pub session_cookie_name: String,
    pub session_cookie_secure: bool,
    pub session_cookie_samesite: CookieSameSite,
    pub proactive_session_cleanup: bool,
    /// 0 sweeps without a bound.
    pub session_sweep_limit: usize,
    /// 0 disables the background purge.
    pub session_purge_interval_secs: u64,
    pub auth_rate_limit: RateLimit,
    /// Key the auth limiter on `x-real-ip`/`x-forwarded-for`. Only safe behind a proxy
    /// that sets them.
    pub trust_forwarded_headers: bool,
    pub stackstorm_connections_config: PathBuf,
    pub stackstorm_verify_tls: bool,
    pub server_host: String,
    pub server_port: u16,
    pub cors_allowed_origins: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            passphrase_auth: true,
            passphrase: "Ch@ngeMe".to_string(),
            session_timeout_secs: 4 * 3600,
            session_cookie_name: "session_id".to_string(),
            session_cookie_secure: false,
            session_cookie_samesite: CookieSameSite::Lax,
            proactive_session_cleanup: true,
            session_sweep_limit: 128,
            session_purge_interval_secs: 300,
            auth_rate_limit: RateLimit {
                requests: 5,
                window_secs: 60,
            },
            trust_forwarded_headers: false,
            stackstorm_connections_config: PathBuf::from("./config/stackstorm-connections.json"),
            stackstorm_verify_tls: true,
            server_host: "0.0.0.0".to_string(),
            server_port: 8000,
            cors_allowed_origins: vec![
                "http://localhost:5173".to_string(),
                "http://localhost".to_string(),
                "http://localhost:80".to_string(),
            ],
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup, falling back to defaults
    /// for missing keys.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();

        let session_timeout_hours = match lookup("SESSION_TIMEOUT_HOURS") {
            Some(value) => value
                .trim()
                .trim_end_matches('h')
                .parse::<u64>()
                .ok()
                .filter(|hours| *hours > 0)
                .ok_or(ConfigError::Invalid {
                    key: "SESSION_TIMEOUT_HOURS",
                    value,
                })?,
            None => defaults.session_timeout_secs / 3600,
        };

        let cors_allowed_origins = match lookup("CORS_ALLOWED_ORIGINS") {
            Some(value) => value
                .split(',')
                .map(str::trim)
                .filter(|origin| !origin.is_empty())
                .map(String::from)
                .collect(),
            None => defaults.cors_allowed_origins,
        };

        Ok(Config {
            passphrase_auth: flag(&lookup, "PASSPHRASE_AUTH", defaults.passphrase_auth),
            passphrase: lookup("PASSPHRASE").unwrap_or(defaults.passphrase),
            session_timeout_secs: session_timeout_hours * 3600,
            session_cookie_name: lookup("SESSION_COOKIE_NAME")
                .unwrap_or(defaults.session_cookie_name),
            session_cookie_secure: flag(
                &lookup,
                "SESSION_COOKIE_SECURE",
                defaults.session_cookie_secure,
            ),
            session_cookie_samesite: parsed(
                &lookup,
                "SESSION_COOKIE_SAMESITE",
                defaults.session_cookie_samesite,
            )?,
            proactive_session_cleanup: flag(
                &lookup,
                "PROACTIVE_SESSION_CLEANUP",
                defaults.proactive_session_cleanup,
            ),
            session_sweep_limit: parsed(
                &lookup,
                "SESSION_SWEEP_LIMIT",
                defaults.session_sweep_limit,
            )?,
            session_purge_interval_secs: parsed(
                &lookup,
                "SESSION_PURGE_INTERVAL_SECS",
                defaults.session_purge_interval_secs,
            )?,
            auth_rate_limit: parsed(&lookup, "AUTH_RATE_LIMIT", defaults.auth_rate_limit)?,
            trust_forwarded_headers: flag(
                &lookup,
                "TRUST_FORWARDED_HEADERS",
                defaults.trust_forwarded_headers,
            ),
            stackstorm_connections_config: lookup("STACKSTORM_CONNECTIONS_CONFIG")
                .map(PathBuf::from)
                .unwrap_or(defaults.stackstorm_connections_config),
            stackstorm_verify_tls: flag(
                &lookup,
                "STACKSTORM_VERIFY_TLS",
                defaults.stackstorm_verify_tls,
            ),
            server_host: lookup("SERVER_HOST").unwrap_or(defaults.server_host),
            server_port: parsed(&lookup, "SERVER_PORT", defaults.server_port)?,
            cors_allowed_origins,
        })
    }

    pub fn session_timeout(&self) -> Duration {
        Duration::from_secs(self.session_timeout_secs)
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            timeout: chrono::Duration::seconds(self.session_timeout_secs as i64),
            proactive_cleanup: self.proactive_session_cleanup,
            sweep_limit: (self.session_sweep_limit > 0).then_some(self.session_sweep_limit),
        }
    }

    pub fn session_purge_interval(&self) -> Option<Duration> {
        (self.session_purge_interval_secs > 0)
            .then(|| Duration::from_secs(self.session_purge_interval_secs))
    }
}

fn flag<F>(lookup: &F, key: &'static str, default: bool) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|value| value.trim().eq_ignore_ascii_case("true"))
        .unwrap_or(default)
}

fn parsed<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = config_from(&[]).unwrap();
        assert!(config.passphrase_auth);
        assert_eq!(config.session_timeout(), Duration::from_secs(4 * 3600));
        assert_eq!(config.session_cookie_name, "session_id");
        assert_eq!(config.session_cookie_samesite, CookieSameSite::Lax);
        assert_eq!(config.auth_rate_limit.requests, 5);
        assert_eq!(config.auth_rate_limit.window(), Duration::from_secs(60));
        assert_eq!(config.session_config().sweep_limit, Some(128));
        assert!(!config.trust_forwarded_headers);
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("PASSPHRASE_AUTH", "False"),
            ("SESSION_TIMEOUT_HOURS", "2h"),
            ("SESSION_COOKIE_SAMESITE", "Strict"),
            ("SESSION_SWEEP_LIMIT", "0"),
            ("SESSION_PURGE_INTERVAL_SECS", "0"),
            ("AUTH_RATE_LIMIT", "10/hour"),
            ("TRUST_FORWARDED_HEADERS", "true"),
            ("CORS_ALLOWED_ORIGINS", "https://a.example, https://b.example,"),
        ])
        .unwrap();

        assert!(!config.passphrase_auth);
        assert_eq!(config.session_timeout_secs, 7200);
        assert_eq!(config.session_cookie_samesite, CookieSameSite::Strict);
        assert_eq!(config.session_config().sweep_limit, None);
        assert_eq!(config.session_purge_interval(), None);
        assert!(config.trust_forwarded_headers);
        assert_eq!(
            config.auth_rate_limit,
            RateLimit {
                requests: 10,
                window_secs: 3600
            }
        );
        assert_eq!(
            config.cors_allowed_origins,
            vec!["https://a.example", "https://b.example"]
        );
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert_eq!(
            config_from(&[("AUTH_RATE_LIMIT", "lots")]).unwrap_err(),
            ConfigError::Invalid {
                key: "AUTH_RATE_LIMIT",
                value: "lots".to_string()
            }
        );
        assert!(config_from(&[("SESSION_TIMEOUT_HOURS", "0")]).is_err());
        assert!(config_from(&[("SERVER_PORT", "http")]).is_err());
        assert!(config_from(&[("SESSION_COOKIE_SAMESITE", "sometimes")]).is_err());
    }
}
