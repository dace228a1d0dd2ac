use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// Pause between retry rounds (optional section in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Base delay in seconds before the second round (doubles per round).
    pub base_delay_secs: f64,
    /// Maximum delay in seconds between rounds.
    pub max_delay_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            base_delay_secs: 2.0,
            max_delay_secs: 30,
        }
    }
}

/// Global configuration loaded from `~/.config/mgc/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MgcConfig {
    /// Number of clone workers running at once.
    pub max_concurrency: usize,
    /// Per-repository timeout for one clone or update, in seconds.
    pub clone_timeout_secs: u64,
    /// Maximum number of clone rounds (including the first).
    pub retry_attempts: u32,
    /// Base directory; repositories land in `<base_dir>/<account>/<name>`.
    pub base_dir: PathBuf,
    /// Timeout for one repository API request, in seconds.
    pub api_timeout_secs: u64,
    /// Base URL of the repository API.
    pub api_base_url: String,
    /// Page size used when listing repositories.
    pub per_page: u32,
    /// Optional pause between rounds; if missing, built-in defaults are used.
    #[serde(default)]
    pub retry: Option<RetryConfig>,
    /// API token from `GITHUB_TOKEN`. Never written to the config file.
    #[serde(skip)]
    pub token: Option<String>,
}

impl Default for MgcConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 5,
            clone_timeout_secs: 600,
            retry_attempts: 3,
            base_dir: PathBuf::from("."),
            api_timeout_secs: 30,
            api_base_url: "https://api.github.com".to_string(),
            per_page: 100,
            retry: None,
            token: None,
        }
    }
}

impl MgcConfig {
    pub fn clone_timeout(&self) -> Duration {
        Duration::from_secs(self.clone_timeout_secs)
    }

    pub fn api_timeout(&self) -> Duration {
        Duration::from_secs(self.api_timeout_secs)
    }

    /// Apply `MAX_CONCURRENCY`, `CLONE_TIMEOUT`, `BASE_DIR` and `GITHUB_TOKEN`
    /// from `lookup`. Unparseable values are logged and ignored.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(token) = lookup("GITHUB_TOKEN").filter(|t| !t.is_empty()) {
            self.token = Some(token);
        }

        if let Some(raw) = lookup("MAX_CONCURRENCY").filter(|v| !v.is_empty()) {
            match raw.trim().parse::<usize>() {
                Ok(n) if n > 0 => self.max_concurrency = n,
                _ => tracing::warn!(value = %raw, "ignoring invalid MAX_CONCURRENCY"),
            }
        }

        if let Some(raw) = lookup("CLONE_TIMEOUT").filter(|v| !v.is_empty()) {
            match parse_duration(&raw) {
                Some(d) => self.clone_timeout_secs = d.as_secs().max(1),
                None => tracing::warn!(value = %raw, "ignoring invalid CLONE_TIMEOUT"),
            }
        }

        if let Some(dir) = lookup("BASE_DIR").filter(|v| !v.is_empty()) {
            self.base_dir = PathBuf::from(dir);
        }
    }

    /// Reject values the scheduler cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.max_concurrency == 0 {
            anyhow::bail!("max_concurrency must be greater than 0");
        }
        if self.retry_attempts == 0 {
            anyhow::bail!("retry_attempts must be at least 1");
        }
        if self.clone_timeout_secs == 0 {
            anyhow::bail!("clone_timeout_secs must be greater than 0");
        }
        if self.per_page == 0 {
            anyhow::bail!("per_page must be greater than 0");
        }
        if let Some(retry) = &self.retry {
            if Duration::try_from_secs_f64(retry.base_delay_secs).is_err() {
                anyhow::bail!("retry.base_delay_secs must be a finite, non-negative number");
            }
        }
        Ok(())
    }
}

/// Parse a duration such as `90s`, `10m`, `1h30m` or `500ms`. A bare number is seconds.
pub fn parse_duration(input: &str) -> Option<Duration> {
    let s = input.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(secs) = s.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }

    let mut total = Duration::ZERO;
    let mut rest = s;
    while !rest.is_empty() {
        let digits = rest.find(|c: char| !c.is_ascii_digit() && c != '.')?;
        if digits == 0 {
            return None;
        }
        let value: f64 = rest[..digits].parse().ok()?;
        rest = &rest[digits..];
        let unit_len = rest
            .find(|c: char| c.is_ascii_digit())
            .unwrap_or(rest.len());
        let unit = &rest[..unit_len];
        rest = &rest[unit_len..];
        let secs = match unit {
            "ms" => value / 1000.0,
            "s" => value,
            "m" => value * 60.0,
            "h" => value * 3600.0,
            _ => return None,
        };
        let part = Duration::try_from_secs_f64(secs).ok()?;
        total = total.checked_add(part)?;
    }
    Some(total)
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("mgc")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists,
/// then apply environment overrides.
pub fn load_or_init() -> Result<MgcConfig> {
    let path = config_path()?;
    let mut cfg = if !path.exists() {
        let default_cfg = MgcConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        default_cfg
    } else {
        let data = fs::read_to_string(&path)?;
        toml::from_str(&data)?
    };

    cfg.apply_env(|key| std::env::var(key).ok());
    cfg.validate()?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn default_config_values() {
        let cfg = MgcConfig::default();
        assert_eq!(cfg.max_concurrency, 5);
        assert_eq!(cfg.clone_timeout(), Duration::from_secs(600));
        assert_eq!(cfg.retry_attempts, 3);
        assert_eq!(cfg.base_dir, PathBuf::from("."));
        assert_eq!(cfg.api_timeout(), Duration::from_secs(30));
        assert_eq!(cfg.per_page, 100);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn config_toml_roundtrip_skips_token() {
        let mut cfg = MgcConfig::default();
        cfg.token = Some("secret".to_string());
        let toml = toml::to_string_pretty(&cfg).unwrap();
        assert!(!toml.contains("secret"));
        let parsed: MgcConfig = toml::from_str(&toml).unwrap();
        assert_eq!(parsed.max_concurrency, cfg.max_concurrency);
        assert_eq!(parsed.api_base_url, cfg.api_base_url);
        assert!(parsed.token.is_none());
    }

    #[test]
    fn config_toml_custom_values() {
        let toml = r#"
            max_concurrency = 8
            clone_timeout_secs = 120
            retry_attempts = 1
            base_dir = "/srv/mirror"
            api_timeout_secs = 10
            api_base_url = "http://127.0.0.1:9000"
            per_page = 50

            [retry]
            base_delay_secs = 0.5
            max_delay_secs = 5
        "#;
        let cfg: MgcConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.max_concurrency, 8);
        assert_eq!(cfg.clone_timeout_secs, 120);
        assert_eq!(cfg.retry_attempts, 1);
        assert_eq!(cfg.base_dir, PathBuf::from("/srv/mirror"));
        assert_eq!(cfg.per_page, 50);
        let retry = cfg.retry.as_ref().unwrap();
        assert!((retry.base_delay_secs - 0.5).abs() < 1e-9);
        assert_eq!(retry.max_delay_secs, 5);
    }

    #[test]
    fn env_overrides_apply() {
        let env: HashMap<&str, &str> = [
            ("MAX_CONCURRENCY", "12"),
            ("CLONE_TIMEOUT", "2m30s"),
            ("BASE_DIR", "/tmp/repos"),
            ("GITHUB_TOKEN", "abc"),
        ]
        .into_iter()
        .collect();
        let mut cfg = MgcConfig::default();
        cfg.apply_env(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(cfg.max_concurrency, 12);
        assert_eq!(cfg.clone_timeout_secs, 150);
        assert_eq!(cfg.base_dir, PathBuf::from("/tmp/repos"));
        assert_eq!(cfg.token.as_deref(), Some("abc"));
    }

    #[test]
    fn invalid_env_values_are_ignored() {
        let env: HashMap<&str, &str> = [("MAX_CONCURRENCY", "0"), ("CLONE_TIMEOUT", "soon")]
            .into_iter()
            .collect();
        let mut cfg = MgcConfig::default();
        cfg.apply_env(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(cfg.max_concurrency, 5);
        assert_eq!(cfg.clone_timeout_secs, 600);
    }

    #[test]
    fn validate_rejects_zero_values() {
        let mut cfg = MgcConfig::default();
        cfg.max_concurrency = 0;
        assert!(cfg.validate().is_err());
        let mut cfg = MgcConfig::default();
        cfg.retry_attempts = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn parse_duration_forms() {
        assert_eq!(parse_duration("45"), Some(Duration::from_secs(45)));
        assert_eq!(parse_duration("90s"), Some(Duration::from_secs(90)));
        assert_eq!(parse_duration("10m"), Some(Duration::from_secs(600)));
        assert_eq!(parse_duration("1h30m"), Some(Duration::from_secs(5400)));
        assert_eq!(parse_duration("250ms"), Some(Duration::from_millis(250)));
        assert_eq!(parse_duration("1.5m"), Some(Duration::from_secs(90)));
        assert_eq!(parse_duration(""), None);
        assert_eq!(parse_duration("m"), None);
        assert_eq!(parse_duration("10x"), None);
    }

    #[test]
    fn parse_duration_rejects_overflow() {
        assert_eq!(parse_duration("99999999999999999999999h"), None);
        assert_eq!(parse_duration("18446744073709551615s1s"), None);
        assert_eq!(parse_duration("1e400s"), None);
    }

    #[test]
    fn validate_rejects_unusable_retry_delay() {
        for bad in [f64::INFINITY, f64::NAN, -1.0] {
            let cfg = MgcConfig {
                retry: Some(RetryConfig {
                    base_delay_secs: bad,
                    max_delay_secs: 30,
                }),
                ..MgcConfig::default()
            };
            assert!(cfg.validate().is_err(), "{bad}");
        }
    }
}
