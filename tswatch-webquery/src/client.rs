//! WebQuery client over a single long-lived HTTP session.
//!
//! The TeamSpeak WebQuery server misbehaves when it sees a fresh connection
//! per request, so a client owns exactly one [`reqwest::Client`] for its whole
//! lifetime and every clone shares it.
//!
//! ## Example
//!
//! ```rust,no_run
//! use tswatch_webquery::{ServerQuery, WebQueryClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = WebQueryClient::builder()
//!         .host("ts.example.com")
//!         .port(10080)
//!         .server_id(1)
//!         .api_key("BAD1f...")
//!         .build()?;
//!
//!     let info = client.test_connection().await?;
//!     println!("{:?}", info.get("virtualserver_name"));
//!
//!     let clients = client.client_list().await?;
//!     println!("{} clients", clients.len());
//!     Ok(())
//! }
//! ```

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use tswatch_types::Record;

use crate::envelope::{first_record, validate_envelope, Envelope};
use crate::{QueryError, ServerQuery};

/// Default WebQuery HTTP port.
pub const DEFAULT_PORT: u16 = 10080;

/// Default virtual server id.
pub const DEFAULT_SERVER_ID: u32 = 1;

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Endpoint names used by the client.
pub mod endpoint {
    pub const SERVER_INFO: &str = "serverinfo";
    pub const CLIENT_LIST: &str = "clientlist";
    pub const CHANNEL_LIST: &str = "channellist";
}

/// Where and how to reach one virtual server. Immutable once built.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionDescriptor {
    pub host: String,
    pub port: u16,
    pub server_id: u32,
    pub api_key: String,
}

impl ConnectionDescriptor {
    pub fn new(host: impl Into<String>, port: u16, server_id: u32, api_key: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port,
            server_id,
            api_key: api_key.into(),
        }
    }

    /// `http://{host}:{port}/{server_id}`
    pub fn base_url(&self) -> String {
        format!("http://{}:{}/{}", self.host, self.port, self.server_id)
    }

    /// `http://{host}:{port}/{server_id}/{endpoint}`
    pub fn endpoint_url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url(), endpoint)
    }
}

// The API key stays out of logs.
impl fmt::Debug for ConnectionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionDescriptor")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("server_id", &self.server_id)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

/// Client for the TeamSpeak WebQuery HTTP API.
#[derive(Debug, Clone)]
pub struct WebQueryClient {
    session: Client,
    descriptor: ConnectionDescriptor,
}

impl WebQueryClient {
    /// Create a new builder for configuring the client.
    pub fn builder() -> WebQueryClientBuilder {
        WebQueryClientBuilder::default()
    }

    /// Create a client for a descriptor with the default timeout.
    pub fn new(descriptor: ConnectionDescriptor) -> Result<Self, QueryError> {
        Self::with_timeout(descriptor, DEFAULT_TIMEOUT)
    }

    fn with_timeout(descriptor: ConnectionDescriptor, timeout: Duration) -> Result<Self, QueryError> {
        let session = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| QueryError::Connect(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            session,
            descriptor,
        })
    }

    /// The connection descriptor this client was built from.
    pub fn descriptor(&self) -> &ConnectionDescriptor {
        &self.descriptor
    }

    /// Issue one request and return the validated body list.
    pub async fn request(&self, endpoint: &str) -> Result<Vec<Record>, QueryError> {
        let url = self.descriptor.endpoint_url(endpoint);
        debug!(endpoint, host = %self.descriptor.host, "WebQuery request");

        let envelope: Envelope = self
            .session
            .post(&url)
            .query(&[("api-key", self.descriptor.api_key.as_str())])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        validate_envelope(envelope)
    }

    /// Fetch server info without publishing anything.
    ///
    /// Used to validate a descriptor before polling starts.
    pub async fn test_connection(&self) -> Result<Record, QueryError> {
        self.server_info().await
    }
}

#[async_trait]
impl ServerQuery for WebQueryClient {
    async fn server_info(&self) -> Result<Record, QueryError> {
        let body = self.request(endpoint::SERVER_INFO).await?;
        first_record(body, "server info")
    }

    async fn client_list(&self) -> Result<Vec<Record>, QueryError> {
        self.request(endpoint::CLIENT_LIST).await
    }

    async fn channel_list(&self) -> Result<Vec<Record>, QueryError> {
        self.request(endpoint::CHANNEL_LIST).await
    }
}

/// Builder for WebQueryClient.
#[derive(Debug, Default)]
pub struct WebQueryClientBuilder {
    host: Option<String>,
    port: Option<u16>,
    server_id: Option<u32>,
    api_key: Option<String>,
    timeout: Option<Duration>,
}

impl WebQueryClientBuilder {
    /// Set the server host name or address (default: "localhost").
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Set the WebQuery HTTP port (default: 10080).
    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Set the virtual server id (default: 1).
    pub fn server_id(mut self, server_id: u32) -> Self {
        self.server_id = Some(server_id);
        self
    }

    /// Set the API key sent as the `api-key` query parameter.
    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Set the per-request timeout (default: 10 seconds).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Build the client and its session.
    pub fn build(self) -> Result<WebQueryClient, QueryError> {
        let descriptor = ConnectionDescriptor {
            host: self.host.unwrap_or_else(|| "localhost".to_string()),
            port: self.port.unwrap_or(DEFAULT_PORT),
            server_id: self.server_id.unwrap_or(DEFAULT_SERVER_ID),
            api_key: self.api_key.unwrap_or_default(),
        };
        WebQueryClient::with_timeout(descriptor, self.timeout.unwrap_or(DEFAULT_TIMEOUT))
    }
}
