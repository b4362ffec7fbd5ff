//! Entities bound to the client they were fetched through.

use std::ops::Deref;

use secrecy::SecretString;
use tokio_util::sync::CancellationToken;

use crate::client::SafeguardClient;
use crate::client::access_requests::WaitOptions;
use crate::error::Result;
use crate::models::AccessRequest;

/// An entity paired with the client handle it came from.
///
/// Derefs to the entity, so fields read as usual.
#[derive(Debug, Clone)]
pub struct Bound<'c, T> {
    client: &'c SafeguardClient,
    entity: T,
}

impl<'c, T> Bound<'c, T> {
    pub fn new(client: &'c SafeguardClient, entity: T) -> Self {
        Self { client, entity }
    }

    pub fn client(&self) -> &'c SafeguardClient {
        self.client
    }

    pub fn into_inner(self) -> T {
        self.entity
    }
}

impl<T> Deref for Bound<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.entity
    }
}

impl<'c> Bound<'c, AccessRequest> {
    /// Check out this request's password through the bound client.
    pub async fn check_out_password(
        &self,
        options: &WaitOptions,
        cancel: &CancellationToken,
    ) -> Result<SecretString> {
        self.client
            .check_out_password(&self.entity, options, cancel)
            .await
    }

    /// Fetch the current state of this request.
    pub async fn refresh(&self) -> Result<Bound<'c, AccessRequest>> {
        self.client.get_access_request(&self.entity.id).await
    }
}
