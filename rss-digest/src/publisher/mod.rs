//! Publishing the rendered digest to a document platform.
//!
//! [`Publisher`] drives the `Unauthenticated → Authenticated → DocumentCreated →
//! ContentWritten` state machine over any [`DocumentPlatform`]; each failure is
//! terminal and remembers the state it happened in.

pub mod blocks;
pub mod feishu;

pub use feishu::{FeishuClient, FeishuConfig};

use crate::types::{DigestError, Result};
use async_trait::async_trait;
use std::fmt;
use tracing::{error, info};

/// Short-lived platform access token. Kept out of logs.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(***)")
    }
}

/// The three calls a document platform has to support.
#[async_trait]
pub trait DocumentPlatform: Send + Sync {
    fn platform_name(&self) -> String;

    async fn authenticate(&self) -> Result<AccessToken>;

    /// Returns the new document's identifier.
    async fn create_document(&self, token: &AccessToken, title: &str) -> Result<String>;

    async fn write_content(&self, token: &AccessToken, document_id: &str, markdown: &str) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishState {
    Unauthenticated,
    Authenticated,
    DocumentCreated { document_id: String },
    ContentWritten { document_id: String },
    AuthFailed,
    CreationFailed,
    WriteFailed { document_id: String },
}

impl PublishState {
    pub fn is_terminal(&self) -> bool {
        !matches!(
            self,
            PublishState::Unauthenticated | PublishState::Authenticated | PublishState::DocumentCreated { .. }
        )
    }
}

pub struct Publisher<P: DocumentPlatform> {
    platform: P,
    state: PublishState,
}

impl<P: DocumentPlatform> Publisher<P> {
    pub fn new(platform: P) -> Self {
        Self {
            platform,
            state: PublishState::Unauthenticated,
        }
    }

    pub fn state(&self) -> &PublishState {
        &self.state
    }

    /// Authenticate, create the document, write the content. Returns the document id.
    ///
    /// A publisher runs once; calling this again after a terminal state is an error.
    pub async fn publish(&mut self, title: &str, markdown: &str) -> Result<String> {
        if self.state != PublishState::Unauthenticated {
            return Err(DigestError::PublisherReused(format!("{:?}", self.state)));
        }

        let platform = self.platform.platform_name();
        info!("Publishing \"{}\" to {}", title, platform);

        let token = match self.platform.authenticate().await {
            Ok(token) => token,
            Err(e) => return Err(self.fail(PublishState::AuthFailed, e)),
        };
        self.state = PublishState::Authenticated;
        info!("Obtained {} access token", platform);

        let document_id = match self.platform.create_document(&token, title).await {
            Ok(id) => id,
            Err(e) => return Err(self.fail(PublishState::CreationFailed, e)),
        };
        self.state = PublishState::DocumentCreated {
            document_id: document_id.clone(),
        };
        info!("Created document {}", document_id);

        if let Err(e) = self.platform.write_content(&token, &document_id, markdown).await {
            let failed = PublishState::WriteFailed {
                document_id: document_id.clone(),
            };
            return Err(self.fail(failed, e));
        }
        self.state = PublishState::ContentWritten {
            document_id: document_id.clone(),
        };
        info!("Wrote digest content to document {}", document_id);

        Ok(document_id)
    }

    fn fail(&mut self, state: PublishState, e: DigestError) -> DigestError {
        error!("Publishing failed in state {:?}: {}", self.state, e);
        self.state = state;
        e
    }
}
