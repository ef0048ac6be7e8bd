//! Connection settings, layered from defaults, a TOML file, the environment
//! and command-line flags (later sources win).

use std::fmt;
use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use tswatch_coordinator::{DEFAULT_INTERVAL, MIN_INTERVAL};
use tswatch_webquery::{ConnectionDescriptor, DEFAULT_PORT, DEFAULT_SERVER_ID};

/// Environment variable prefix, e.g. `TSWATCH_HOST`.
pub const ENV_PREFIX: &str = "TSWATCH";

/// Values given on the command line. Unset flags leave lower layers alone.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct Overrides {
    /// TeamSpeak server host name or address
    #[arg(long, global = true)]
    pub host: Option<String>,

    /// WebQuery HTTP port
    #[arg(long, global = true)]
    pub port: Option<u16>,

    /// Virtual server id
    #[arg(long, global = true)]
    pub server_id: Option<u32>,

    /// WebQuery API key
    #[arg(long, global = true)]
    pub api_key: Option<String>,

    /// Seconds between refreshes (minimum 5)
    #[arg(long, global = true)]
    pub scan_interval: Option<u64>,
}

/// Resolved settings for one server.
#[derive(Clone, Deserialize)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    pub server_id: u32,
    pub api_key: String,
    /// Seconds between scheduled refreshes.
    pub scan_interval: u64,
}

impl Settings {
    /// Load settings from an optional file, `TSWATCH_*` variables and overrides.
    pub fn load(file: Option<&Path>, overrides: &Overrides) -> Result<Self> {
        let mut builder = Config::builder()
            .set_default("port", i64::from(DEFAULT_PORT))?
            .set_default("server_id", i64::from(DEFAULT_SERVER_ID))?
            .set_default("scan_interval", DEFAULT_INTERVAL.as_secs() as i64)?;

        if let Some(path) = file {
            builder = builder.add_source(File::from(path));
        }

        builder = builder
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .set_override_option("host", overrides.host.clone())?
            .set_override_option("port", overrides.port.map(i64::from))?
            .set_override_option("server_id", overrides.server_id.map(i64::from))?
            .set_override_option("api_key", overrides.api_key.clone())?
            .set_override_option("scan_interval", overrides.scan_interval.map(|s| s as i64))?;

        let settings: Settings = builder
            .build()
            .context("Failed to read configuration")?
            .try_deserialize()
            .context("Invalid configuration")?;

        settings.validate()?;
        Ok(settings)
    }

    /// Reject values the server or the scheduler cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            bail!("host must not be empty");
        }
        if self.api_key.is_empty() {
            bail!("api_key must not be empty");
        }
        if self.scan_interval < MIN_INTERVAL.as_secs() {
            bail!(
                "scan_interval must be at least {} seconds (got {})",
                MIN_INTERVAL.as_secs(),
                self.scan_interval
            );
        }
        Ok(())
    }

    pub fn descriptor(&self) -> ConnectionDescriptor {
        ConnectionDescriptor::new(self.host.clone(), self.port, self.server_id, self.api_key.clone())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.scan_interval)
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("server_id", &self.server_id)
            .field("api_key", &"<redacted>")
            .field("scan_interval", &self.scan_interval)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn toml_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn file_with_defaults() {
        let file = toml_file("host = \"ts.example.com\"\napi_key = \"abc\"\n");
        let settings = Settings::load(Some(file.path()), &Overrides::default()).unwrap();

        assert_eq!(settings.host, "ts.example.com");
        assert_eq!(settings.port, 10080);
        assert_eq!(settings.server_id, 1);
        assert_eq!(settings.api_key, "abc");
        assert_eq!(settings.interval(), Duration::from_secs(60));
        assert_eq!(settings.descriptor().base_url(), "http://ts.example.com:10080/1");
    }

    #[test]
    fn flags_override_file() {
        let file = toml_file("host = \"ts.example.com\"\napi_key = \"abc\"\nport = 10443\n");
        let overrides = Overrides {
            host: Some("voice.example.org".to_string()),
            server_id: Some(7),
            scan_interval: Some(30),
            ..Overrides::default()
        };
        let settings = Settings::load(Some(file.path()), &overrides).unwrap();

        assert_eq!(settings.host, "voice.example.org");
        assert_eq!(settings.port, 10443);
        assert_eq!(settings.server_id, 7);
        assert_eq!(settings.scan_interval, 30);
    }

    #[test]
    fn flags_alone_are_enough() {
        let overrides = Overrides {
            host: Some("ts.example.com".to_string()),
            api_key: Some("abc".to_string()),
            ..Overrides::default()
        };
        let settings = Settings::load(None, &overrides).unwrap();
        assert_eq!(settings.port, 10080);
    }

    #[test]
    fn interval_below_minimum_is_rejected() {
        let overrides = Overrides {
            host: Some("ts.example.com".to_string()),
            api_key: Some("abc".to_string()),
            scan_interval: Some(2),
            ..Overrides::default()
        };
        let err = Settings::load(None, &overrides).unwrap_err();
        assert!(err.to_string().contains("scan_interval"), "{}", err);
    }

    #[test]
    fn missing_api_key_is_rejected() {
        let file = toml_file("host = \"ts.example.com\"\n");
        assert!(Settings::load(Some(file.path()), &Overrides::default()).is_err());
    }

    #[test]
    fn debug_hides_api_key() {
        let file = toml_file("host = \"ts.example.com\"\napi_key = \"super-secret\"\n");
        let settings = Settings::load(Some(file.path()), &Overrides::default()).unwrap();
        assert!(!format!("{:?}", settings).contains("super-secret"));
    }
}
