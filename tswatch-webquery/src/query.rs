//! The query seam between the coordinator and the protocol client.

use std::sync::Arc;

use async_trait::async_trait;

use tswatch_types::Record;

use crate::QueryError;

/// The three logical queries a refresh cycle needs.
///
/// [`crate::WebQueryClient`] is the production implementation. Each call
/// issues exactly one request; callers are expected to await one call before
/// starting the next.
#[async_trait]
pub trait ServerQuery: Send + Sync {
    /// First record of `serverinfo`. An empty body is a connectivity failure.
    async fn server_info(&self) -> Result<Record, QueryError>;

    /// Body of `clientlist`. An empty list is valid.
    async fn client_list(&self) -> Result<Vec<Record>, QueryError>;

    /// Body of `channellist`. An empty list is valid.
    async fn channel_list(&self) -> Result<Vec<Record>, QueryError>;
}

#[async_trait]
impl<T: ServerQuery + ?Sized> ServerQuery for Arc<T> {
    async fn server_info(&self) -> Result<Record, QueryError> {
        (**self).server_info().await
    }

    async fn client_list(&self) -> Result<Vec<Record>, QueryError> {
        (**self).client_list().await
    }

    async fn channel_list(&self) -> Result<Vec<Record>, QueryError> {
        (**self).channel_list().await
    }
}
