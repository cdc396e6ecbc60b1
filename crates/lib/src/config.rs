//! Configuration types and loading.
//!
//! Config is loaded from a JSON file (e.g. `~/.parrot/config.json`) and environment.
//! Platform credentials may live entirely in the environment; the file is optional.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Top-level application config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// HTTP listener settings.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// VK API credentials and callback handshake values.
    #[serde(default)]
    pub platform: PlatformConfig,

    /// Outbound send retry and timeout settings.
    #[serde(default)]
    pub delivery: DeliveryConfig,
}

/// Gateway bind and port.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayConfig {
    /// Port for the callback endpoint (default 8080).
    #[serde(default = "default_gateway_port")]
    pub port: u16,

    /// Bind address (default "127.0.0.1").
    #[serde(default = "default_gateway_bind")]
    pub bind: String,
}

fn default_gateway_port() -> u16 {
    8080
}

fn default_gateway_bind() -> String {
    "127.0.0.1".to_string()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_gateway_port(),
            bind: default_gateway_bind(),
        }
    }
}

/// VK platform settings. Every field can be overridden by its env var.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformConfig {
    /// Community access token. Overridden by VK_ACCESS_TOKEN.
    pub access_token: Option<String>,
    /// API version sent as `v` (e.g. "5.131"). Overridden by VK_API_VERSION.
    pub api_version: Option<String>,
    /// Method endpoint base (e.g. "https://api.vk.com/method"). Overridden by VK_ENDPOINT.
    pub endpoint: Option<String>,
    /// String returned for `confirmation` events. Overridden by VK_CONFIRMATION.
    pub confirmation: Option<String>,
    /// Optional callback secret; when set, events with a different `secret` are rejected. Overridden by VK_SECRET.
    pub secret: Option<String>,
}

impl std::fmt::Debug for PlatformConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlatformConfig")
            .field("access_token", &self.access_token.as_ref().map(|_| REDACTED))
            .field("api_version", &self.api_version)
            .field("endpoint", &self.endpoint)
            .field("confirmation", &self.confirmation)
            .field("secret", &self.secret.as_ref().map(|_| REDACTED))
            .finish()
    }
}

/// Retry policy and transport timeout for messages.send.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryConfig {
    /// Total attempts per reply, including the first (default 5).
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Fixed pause between attempts in milliseconds (default 1000).
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Per-request timeout. Unset means the HTTP client default, which never times out.
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

fn default_max_attempts() -> u32 {
    5
}

fn default_retry_delay_ms() -> u64 {
    1000
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
            request_timeout_secs: None,
        }
    }
}

impl DeliveryConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

/// Resolved, non-empty platform values needed to answer callbacks.
#[derive(Clone, PartialEq, Eq)]
pub struct PlatformCredentials {
    pub access_token: String,
    pub api_version: String,
    pub endpoint: String,
    pub confirmation: String,
    pub secret: Option<String>,
}

/// Printed in place of the access token and callback secret.
const REDACTED: &str = "<redacted>";

impl std::fmt::Debug for PlatformCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlatformCredentials")
            .field("access_token", &REDACTED)
            .field("api_version", &self.api_version)
            .field("endpoint", &self.endpoint)
            .field("confirmation", &self.confirmation)
            .field("secret", &self.secret.as_ref().map(|_| REDACTED))
            .finish()
    }
}

/// Env value if set and non-blank, otherwise the trimmed config value if non-blank.
fn env_or_config(var: &str, configured: Option<&String>) -> Option<String> {
    std::env::var(var)
        .ok()
        .and_then(|s| {
            let t = s.trim();
            if t.is_empty() {
                None
            } else {
                Some(t.to_string())
            }
        })
        .or_else(|| {
            configured
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        })
}

/// Resolve platform settings: env overrides config. Fails if any required value is missing.
pub fn resolve_platform(config: &Config) -> Result<PlatformCredentials> {
    let p = &config.platform;
    let required = |var: &str, value: Option<&String>, key: &str| {
        env_or_config(var, value)
            .with_context(|| format!("missing platform.{} (or {} env)", key, var))
    };
    Ok(PlatformCredentials {
        access_token: required("VK_ACCESS_TOKEN", p.access_token.as_ref(), "accessToken")?,
        api_version: required("VK_API_VERSION", p.api_version.as_ref(), "apiVersion")?,
        endpoint: required("VK_ENDPOINT", p.endpoint.as_ref(), "endpoint")?,
        confirmation: required("VK_CONFIRMATION", p.confirmation.as_ref(), "confirmation")?,
        secret: env_or_config("VK_SECRET", p.secret.as_ref()),
    })
}

/// Resolve config path from env or default.
pub fn default_config_path() -> PathBuf {
    std::env::var("PARROT_CONFIG_PATH").map(PathBuf::from).unwrap_or_else(|_| {
        dirs::home_dir()
            .map(|h| h.join(".parrot").join("config.json"))
            .unwrap_or_else(|| PathBuf::from("config.json"))
    })
}

/// Load config from the given path, PARROT_CONFIG_PATH, or the default. Missing file => default config.
/// Returns the config and the path that was used.
pub fn load_config(path: Option<PathBuf>) -> Result<(Config, PathBuf)> {
    let path = path.unwrap_or_else(default_config_path);
    let config = if !path.exists() {
        log::debug!("config file not found, using defaults: {}", path.display());
        Config::default()
    } else {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        serde_json::from_str(&s)
            .with_context(|| format!("parsing config from {}", path.display()))?
    };
    Ok((config, path))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_platform() -> PlatformConfig {
        PlatformConfig {
            access_token: Some(" token ".to_string()),
            api_version: Some("5.131".to_string()),
            endpoint: Some("https://api.vk.com/method".to_string()),
            confirmation: Some("abc123".to_string()),
            secret: Some("   ".to_string()),
        }
    }

    #[test]
    fn default_gateway_port_and_bind() {
        let g = GatewayConfig::default();
        assert_eq!(g.port, 8080);
        assert_eq!(g.bind, "127.0.0.1");
    }

    #[test]
    fn delivery_defaults_match_fixed_policy() {
        let d = DeliveryConfig::default();
        assert_eq!(d.max_attempts, 5);
        assert_eq!(d.retry_delay(), Duration::from_millis(1000));
        assert_eq!(d.request_timeout(), None);
    }

    #[test]
    fn parses_camel_case_sections() {
        let json = r#"{
            "gateway": { "port": 9000 },
            "platform": { "accessToken": "t", "apiVersion": "5.131", "endpoint": "http://x", "confirmation": "c" },
            "delivery": { "retryDelayMs": 10, "requestTimeoutSecs": 3 }
        }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.gateway.port, 9000);
        assert_eq!(config.gateway.bind, "127.0.0.1");
        assert_eq!(config.platform.api_version.as_deref(), Some("5.131"));
        assert_eq!(config.delivery.max_attempts, 5);
        assert_eq!(config.delivery.retry_delay_ms, 10);
        assert_eq!(config.delivery.request_timeout(), Some(Duration::from_secs(3)));
    }

    #[test]
    fn env_or_config_trims_and_drops_blank_values() {
        let blank = "  ".to_string();
        let set = " v ".to_string();
        assert_eq!(env_or_config("PARROT_TEST_UNSET_VAR", Some(&blank)), None);
        assert_eq!(
            env_or_config("PARROT_TEST_UNSET_VAR", Some(&set)),
            Some("v".to_string())
        );
        assert_eq!(env_or_config("PARROT_TEST_UNSET_VAR", None), None);
    }

    #[test]
    fn resolve_platform_requires_presence() {
        let mut config = Config::default();
        config.platform = full_platform();
        // Skip when the developer's shell already exports VK_* overrides.
        if std::env::var("VK_ACCESS_TOKEN").is_ok() {
            return;
        }
        let creds = resolve_platform(&config).unwrap();
        assert_eq!(creds.access_token, "token");
        assert_eq!(creds.confirmation, "abc123");
        assert_eq!(creds.secret, None);

        config.platform.confirmation = None;
        if std::env::var("VK_CONFIRMATION").is_err() {
            let err = resolve_platform(&config).unwrap_err();
            assert!(err.to_string().contains("platform.confirmation"));
        }
    }

    #[test]
    fn debug_output_hides_token_and_secret() {
        let creds = PlatformCredentials {
            access_token: "SUPER_SECRET_TOKEN".to_string(),
            api_version: "5.131".to_string(),
            endpoint: "https://api.vk.com/method".to_string(),
            confirmation: "abc123".to_string(),
            secret: Some("s3cret".to_string()),
        };
        let printed = format!("{:?}", creds);
        assert!(!printed.contains("SUPER_SECRET_TOKEN"));
        assert!(!printed.contains("s3cret"));
        assert!(printed.contains("5.131"));

        let mut config = Config::default();
        config.platform.access_token = Some("SUPER_SECRET_TOKEN".to_string());
        config.platform.secret = Some("s3cret".to_string());
        let printed = format!("{:?}", config);
        assert!(!printed.contains("SUPER_SECRET_TOKEN"));
        assert!(!printed.contains("s3cret"));
    }

    #[test]
    fn load_config_missing_file_uses_defaults() {
        let path = std::env::temp_dir().join(format!("parrot-missing-{}.json", uuid::Uuid::new_v4()));
        let (config, used) = load_config(Some(path.clone())).unwrap();
        assert_eq!(used, path);
        assert_eq!(config.gateway.port, 8080);
        assert!(config.platform.endpoint.is_none());
    }
}
