//! Setup-time validation and the registry of configured servers.
//!
//! Before a server is polled, its settings are checked with a single
//! `serverinfo` call. The operator only ever sees one of a few generic
//! categories; details go to the log.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{error, info};
use tswatch_types::fields;
use tswatch_webquery::{QueryError, ServerQuery, WebQueryClient};

use crate::settings::Settings;

/// Title used when the server does not report a name.
pub const DEFAULT_TITLE: &str = "TeamSpeak Server";

/// What the operator is told when validation fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupError {
    CannotConnect,
    InvalidAuth,
    AlreadyConfigured,
    Unknown,
}

impl SetupError {
    pub fn as_str(&self) -> &'static str {
        match self {
            SetupError::CannotConnect => "cannot_connect",
            SetupError::InvalidAuth => "invalid_auth",
            SetupError::AlreadyConfigured => "already_configured",
            SetupError::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for SetupError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::error::Error for SetupError {}

impl From<QueryError> for SetupError {
    fn from(err: QueryError) -> Self {
        match err {
            QueryError::Auth(_) => SetupError::InvalidAuth,
            QueryError::Connect(_) => SetupError::CannotConnect,
        }
    }
}

/// How a validated server identifies itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerIdentity {
    pub title: String,
    pub unique_id: Option<String>,
}

/// Query server info and derive the server's identity.
pub async fn identify<Q: ServerQuery>(query: &Q) -> Result<ServerIdentity, SetupError> {
    let info = query.server_info().await.map_err(|err| {
        info!("Validation failed: {}", err);
        SetupError::from(err)
    })?;

    Ok(ServerIdentity {
        title: fields::text(&info, fields::SERVER_NAME)
            .unwrap_or(DEFAULT_TITLE)
            .to_string(),
        unique_id: fields::text(&info, fields::SERVER_UNIQUE_ID).map(str::to_string),
    })
}

/// A server that passed validation, with the key it is registered under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validated {
    pub identity: ServerIdentity,
    pub key: String,
}

impl Validated {
    /// One-line summary for the operator: title and unique identifier.
    pub fn describe(&self) -> String {
        format!("{} ({})", self.identity.title, self.key)
    }
}

/// Identify the server behind `query` and, given a registry, record it there.
pub async fn validate_server<Q: ServerQuery>(
    query: &Q,
    settings: &Settings,
    registry: Option<&mut Registry>,
) -> Result<Validated, SetupError> {
    let identity = identify(query).await?;
    let key = registry_key(&identity, settings);

    if let Some(registry) = registry {
        let entry = RegistryEntry {
            title: identity.title.clone(),
            host: settings.host.clone(),
            port: settings.port,
            server_id: settings.server_id,
            scan_interval: settings.scan_interval,
        };
        registry.register(&key, entry)?;
        info!("Registered {} in {}", key, registry.path().display());
    }

    Ok(Validated { identity, key })
}

/// Validate settings against the live server.
pub async fn validate_input(
    settings: &Settings,
    registry: Option<&mut Registry>,
) -> Result<Validated, SetupError> {
    let client = WebQueryClient::new(settings.descriptor()).map_err(|err| {
        error!("Unexpected error building client: {}", err);
        SetupError::Unknown
    })?;
    validate_server(&client, settings, registry).await
}

/// One configured server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryEntry {
    pub title: String,
    pub host: String,
    pub port: u16,
    pub server_id: u32,
    pub scan_interval: u64,
}

/// JSON file of configured servers keyed by the server's unique identifier,
/// so the same physical server cannot be set up twice.
#[derive(Debug)]
pub struct Registry {
    path: PathBuf,
    servers: BTreeMap<String, RegistryEntry>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct RegistryFile {
    #[serde(default)]
    servers: BTreeMap<String, RegistryEntry>,
}

impl Registry {
    /// Open a registry file. A missing file is an empty registry.
    pub fn open(path: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let path = path.into();
        let servers = if path.exists() {
            let content = fs::read_to_string(&path)?;
            serde_json::from_str::<RegistryFile>(&content)?.servers
        } else {
            BTreeMap::new()
        };
        Ok(Self { path, servers })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.servers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.servers.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&RegistryEntry> {
        self.servers.get(key)
    }

    /// Add a server and persist the file.
    pub fn register(&mut self, key: &str, entry: RegistryEntry) -> Result<(), SetupError> {
        if self.contains(key) {
            return Err(SetupError::AlreadyConfigured);
        }
        self.servers.insert(key.to_string(), entry);
        self.save().map_err(|err| {
            error!("Failed to write registry {}: {}", self.path.display(), err);
            SetupError::Unknown
        })
    }

    fn save(&self) -> anyhow::Result<()> {
        let file = RegistryFile {
            servers: self.servers.clone(),
        };
        fs::write(&self.path, serde_json::to_string_pretty(&file)?)?;
        Ok(())
    }
}

/// Registry key for a validated server.
///
/// Servers that do not report a unique identifier fall back to their address.
pub fn registry_key(identity: &ServerIdentity, settings: &Settings) -> String {
    identity
        .unique_id
        .clone()
        .unwrap_or_else(|| settings.descriptor().base_url())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use tswatch_types::Record;

    struct FixedInfo(Result<Record, QueryError>);

    #[async_trait]
    impl ServerQuery for FixedInfo {
        async fn server_info(&self) -> Result<Record, QueryError> {
            self.0.clone()
        }

        async fn client_list(&self) -> Result<Vec<Record>, QueryError> {
            Ok(Vec::new())
        }

        async fn channel_list(&self) -> Result<Vec<Record>, QueryError> {
            Ok(Vec::new())
        }
    }

    fn settings() -> Settings {
        Settings {
            host: "ts.example.com".to_string(),
            port: 10080,
            server_id: 1,
            api_key: "abc".to_string(),
            scan_interval: 60,
        }
    }

    fn entry() -> RegistryEntry {
        RegistryEntry {
            title: "Lobby".to_string(),
            host: "ts.example.com".to_string(),
            port: 10080,
            server_id: 1,
            scan_interval: 60,
        }
    }

    #[test]
    fn identify_reads_name_and_unique_id() {
        let info = serde_json::from_value(json!({
            "virtualserver_name": "Lobby",
            "virtualserver_unique_identifier": "uid-123="
        }))
        .unwrap();
        let identity = tokio_test::block_on(identify(&FixedInfo(Ok(info)))).unwrap();

        assert_eq!(identity.title, "Lobby");
        assert_eq!(identity.unique_id.as_deref(), Some("uid-123="));
    }

    #[test]
    fn identify_defaults_title() {
        let identity = tokio_test::block_on(identify(&FixedInfo(Ok(Record::new())))).unwrap();
        assert_eq!(identity.title, DEFAULT_TITLE);
        assert_eq!(identity.unique_id, None);
        assert_eq!(registry_key(&identity, &settings()), "http://ts.example.com:10080/1");
    }

    #[test]
    fn identify_maps_errors() {
        let auth = FixedInfo(Err(QueryError::Auth("invalid apikey".to_string())));
        assert_eq!(tokio_test::block_on(identify(&auth)), Err(SetupError::InvalidAuth));

        let down = FixedInfo(Err(QueryError::Connect("refused".to_string())));
        assert_eq!(tokio_test::block_on(identify(&down)), Err(SetupError::CannotConnect));
    }

    #[test]
    fn error_categories_render_as_keys() {
        assert_eq!(SetupError::CannotConnect.to_string(), "cannot_connect");
        assert_eq!(SetupError::InvalidAuth.to_string(), "invalid_auth");
        assert_eq!(SetupError::Unknown.to_string(), "unknown");
    }

    fn lobby() -> FixedInfo {
        FixedInfo(Ok(serde_json::from_value(json!({
            "virtualserver_name": "Lobby",
            "virtualserver_unique_identifier": "uid-123="
        }))
        .unwrap()))
    }

    #[test]
    fn validate_server_reports_title_and_unique_id() {
        let validated = tokio_test::block_on(validate_server(&lobby(), &settings(), None)).unwrap();

        assert_eq!(validated.key, "uid-123=");
        assert_eq!(validated.describe(), "Lobby (uid-123=)");
    }

    #[test]
    fn validate_server_registers_once() {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = Registry::open(dir.path().join("servers.json")).unwrap();

        let validated =
            tokio_test::block_on(validate_server(&lobby(), &settings(), Some(&mut registry)))
                .unwrap();
        assert_eq!(registry.get(&validated.key), Some(&entry()));

        let again = tokio_test::block_on(validate_server(&lobby(), &settings(), Some(&mut registry)));
        assert_eq!(again, Err(SetupError::AlreadyConfigured));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn validate_server_rejected_key_registers_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = Registry::open(dir.path().join("servers.json")).unwrap();
        let rejected = FixedInfo(Err(QueryError::Auth("invalid apikey".to_string())));

        let result =
            tokio_test::block_on(validate_server(&rejected, &settings(), Some(&mut registry)));

        assert_eq!(result, Err(SetupError::InvalidAuth));
        assert!(registry.is_empty());
    }

    #[test]
    fn registry_refuses_duplicates_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("servers.json");

        let mut registry = Registry::open(&path).unwrap();
        assert!(registry.is_empty());
        registry.register("uid-123=", entry()).unwrap();
        assert_eq!(
            registry.register("uid-123=", entry()),
            Err(SetupError::AlreadyConfigured)
        );

        let reopened = Registry::open(&path).unwrap();
        assert_eq!(reopened.len(), 1);
        assert_eq!(reopened.get("uid-123="), Some(&entry()));
    }
}
