//! Runtime settings.
//!
//! Settings are layered, later sources winning:
//!
//! 1. built-in defaults
//! 2. an optional TOML file (`--config`)
//! 3. `MUFWATCH_*` environment variables (e.g. `MUFWATCH_INTERVAL=2m`)
//! 4. command-line flags
//!
//! Durations are strings such as `"5m"` or `"500ms"`; see
//! [`parse_duration`](crate::duration::parse_duration).

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use mufwatch_core::{StoreConfig, WindowPolicy};
use mufwatch_sources::kc2g::DEFAULT_ENDPOINT;
use mufwatch_types::StationId;
use serde::Deserialize;

use crate::duration::parse_duration;

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "MUFWATCH";

/// Settings as written in files and the environment.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Address the JSON API binds to.
    pub listen: String,
    /// Time between scheduled refreshes.
    pub interval: String,
    /// Age at which a reading turns stale.
    pub stale_threshold: String,
    /// Age at which a reading is dropped.
    pub retention: String,
    /// Bound on one station fetch.
    pub fetch_timeout: String,
    /// KC2G feed URL.
    pub endpoint: String,
    /// Stations to monitor.
    pub stations: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:8000".to_string(),
            interval: "5m".to_string(),
            stale_threshold: "10m".to_string(),
            retention: "60m".to_string(),
            fetch_timeout: "5s".to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            stations: vec![
                StationId::ROQUETES.to_string(),
                StationId::ARENOSILLO.to_string(),
            ],
        }
    }
}

/// Settings with every value parsed and checked.
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeConfig {
    pub listen: SocketAddr,
    pub store: StoreConfig,
    pub interval: Duration,
    pub fetch_timeout: Duration,
    pub endpoint: String,
}

impl Settings {
    /// Load settings from an optional file and the environment, then apply
    /// `overrides` (key, value) on top. `None` overrides are ignored.
    pub fn load<'a>(
        path: Option<&Path>,
        overrides: impl IntoIterator<Item = (&'a str, Option<String>)>,
    ) -> Result<Self> {
        let mut builder = Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("stations"),
        );

        for (key, value) in overrides {
            builder = builder.set_override_option(key, value)?;
        }

        let config = builder.build().context("Failed to load configuration")?;
        let settings = config
            .try_deserialize()
            .context("Invalid configuration")?;
        Ok(settings)
    }

    /// Parse every value.
    ///
    /// Threshold ordering and station uniqueness are left to the store, which
    /// reports them as [`ConfigError`](mufwatch_core::ConfigError)s.
    pub fn resolve(&self) -> Result<RuntimeConfig> {
        let listen = self
            .listen
            .parse()
            .with_context(|| format!("Invalid listen address '{}'", self.listen))?;

        let policy = WindowPolicy::new(
            duration_setting("stale_threshold", &self.stale_threshold)?,
            duration_setting("retention", &self.retention)?,
        );

        let stations = self
            .stations
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(StationId::new)
            .collect();

        Ok(RuntimeConfig {
            listen,
            store: StoreConfig { stations, policy },
            interval: duration_setting("interval", &self.interval)?,
            fetch_timeout: duration_setting("fetch_timeout", &self.fetch_timeout)?,
            endpoint: self.endpoint.clone(),
        })
    }
}

fn duration_setting(key: &str, value: &str) -> Result<Duration> {
    parse_duration(value).with_context(|| format!("Invalid duration for '{}': '{}'", key, value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn none() -> Vec<(&'static str, Option<String>)> {
        Vec::new()
    }

    #[test]
    fn defaults_resolve() {
        let resolved = Settings::default().resolve().unwrap();

        assert_eq!(resolved.listen, "0.0.0.0:8000".parse().unwrap());
        assert_eq!(resolved.interval, Duration::from_secs(300));
        assert_eq!(resolved.fetch_timeout, Duration::from_secs(5));
        assert_eq!(resolved.store, StoreConfig::default());
        assert_eq!(resolved.endpoint, DEFAULT_ENDPOINT);
    }

    #[test]
    fn file_values_override_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
listen = "127.0.0.1:9000"
interval = "2m"
stale_threshold = "15m"
stations = ["roquetes"]
"#
        )
        .unwrap();

        let settings = Settings::load(Some(file.path()), none()).unwrap();
        let resolved = settings.resolve().unwrap();

        assert_eq!(resolved.listen, "127.0.0.1:9000".parse().unwrap());
        assert_eq!(resolved.interval, Duration::from_secs(120));
        assert_eq!(resolved.store.policy.stale_threshold, Duration::from_secs(900));
        // Unset keys keep their defaults
        assert_eq!(resolved.store.policy.retention_window, Duration::from_secs(3600));
        assert_eq!(resolved.store.stations, vec![StationId::roquetes()]);
    }

    #[test]
    fn overrides_win_over_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, r#"interval = "2m""#).unwrap();

        let settings = Settings::load(
            Some(file.path()),
            [
                ("interval", Some("30s".to_string())),
                ("retention", None),
            ],
        )
        .unwrap();

        assert_eq!(settings.interval, "30s");
        assert_eq!(settings.retention, "60m");
    }

    #[test]
    fn missing_file_is_an_error() {
        let result = Settings::load(Some(Path::new("/nonexistent/mufwatch.toml")), none());
        assert!(result.is_err());
    }

    #[test]
    fn bad_duration_names_the_key() {
        let settings = Settings {
            interval: "soon".to_string(),
            ..Settings::default()
        };

        let err = settings.resolve().unwrap_err();
        assert!(format!("{:#}", err).contains("interval"));
    }

    #[test]
    fn bad_listen_address_is_rejected() {
        let settings = Settings {
            listen: "localhost".to_string(),
            ..Settings::default()
        };
        assert!(settings.resolve().is_err());
    }

    #[test]
    fn station_names_are_normalised() {
        let settings = Settings {
            stations: vec![" Roquetes ".to_string(), "".to_string(), "DOURBES".to_string()],
            ..Settings::default()
        };

        let resolved = settings.resolve().unwrap();
        assert_eq!(
            resolved.store.stations,
            vec![StationId::roquetes(), StationId::new("dourbes")]
        );
    }
}
