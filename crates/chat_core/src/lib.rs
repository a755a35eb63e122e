use std::sync::Arc;

use anyhow::Result;
use shared::{
    domain::ConversationSid,
    protocol::{DesiredConversation, SessionGrant},
};
use tokio::sync::broadcast;
use tracing::{error, info};

pub mod attachments;
pub mod auth;
pub mod authors;
pub mod config;
pub mod date_bucket;
pub mod join_policy;
pub mod paging;
pub mod phone;
pub mod reconcile;
pub mod service;
pub mod view;

pub use attachments::{AttachmentDownloadError, AttachmentKey, AttachmentMaterializationCache};
pub use auth::{TokenExchangeClient, TokenExchangeError};
pub use authors::{AuthorResolutionCache, UserResolutionError};
pub use config::{load_settings, ReconcilerSettings};
pub use join_policy::{JoinAction, JoinError, JoinOutcome, JoinPolicyEngine};
pub use paging::RemoteListingError;
pub use reconcile::{ConversationReconciler, ReconciliationReport};
pub use service::{ConversationHandle, ConversationService, HandleMode};
pub use view::ConversationView;

/// Explicit per-login session state. Created from a grant at login,
/// dropped at logout; nothing in the engine reads ambient credential
/// storage.
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub identity: String,
    pub token: String,
}

impl SessionContext {
    pub fn new(identity: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            token: token.into(),
        }
    }

    pub fn from_grant(grant: &SessionGrant) -> Self {
        Self::new(grant.identity.clone(), grant.token.clone())
    }
}

#[derive(Debug, Clone)]
pub enum ClientEvent {
    ReconciliationCompleted {
        subscribed: usize,
        joined: usize,
        failed: usize,
    },
    ReconciliationFailed {
        error: String,
    },
    AuthorResolved {
        identity: String,
        friendly_name: String,
    },
}

/// Session-scoped facade over the engine: one instance per successful
/// login, torn down with the session. Owns the process-wide caches and the
/// event channel the rendering layer subscribes to.
pub struct ConversationClient {
    session: SessionContext,
    service: Arc<dyn ConversationService>,
    settings: ReconcilerSettings,
    authors: Arc<AuthorResolutionCache>,
    attachments: AttachmentMaterializationCache,
    events: broadcast::Sender<ClientEvent>,
}

impl ConversationClient {
    pub fn new(session: SessionContext, service: Arc<dyn ConversationService>) -> Arc<Self> {
        Self::new_with_settings(session, service, ReconcilerSettings::default())
    }

    pub fn new_with_settings(
        session: SessionContext,
        service: Arc<dyn ConversationService>,
        settings: ReconcilerSettings,
    ) -> Arc<Self> {
        let (events, _) = broadcast::channel(1024);
        let authors = AuthorResolutionCache::new(Arc::clone(&service), events.clone());
        let attachments = AttachmentMaterializationCache::new(Arc::clone(&service));
        Arc::new(Self {
            session,
            service,
            settings,
            authors,
            attachments,
            events,
        })
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    /// The startup membership pass: drain the subscription listing, diff,
    /// join what is missing. Runs once per login; a listing failure means
    /// no join was attempted and the remote membership is untouched.
    pub async fn reconcile_on_login(
        &self,
        desired: &[DesiredConversation],
    ) -> Result<ReconciliationReport, RemoteListingError> {
        info!(identity = %self.session.identity, "reconcile: starting membership pass");
        let reconciler =
            ConversationReconciler::new(Arc::clone(&self.service), self.settings.clone());
        match reconciler.run(desired).await {
            Ok(report) => {
                info!(
                    subscribed = report.subscribed,
                    joined = report.joined(),
                    failed = report.failed(),
                    "reconcile: membership pass complete"
                );
                let _ = self.events.send(ClientEvent::ReconciliationCompleted {
                    subscribed: report.subscribed,
                    joined: report.joined(),
                    failed: report.failed(),
                });
                Ok(report)
            }
            Err(err) => {
                error!(error = %err, "reconcile: membership pass aborted");
                let _ = self.events.send(ClientEvent::ReconciliationFailed {
                    error: err.to_string(),
                });
                Err(err)
            }
        }
    }

    /// Opens a conversation view session. The view owns its derived state
    /// and is dropped when the user navigates away.
    pub async fn open_conversation(&self, sid: &ConversationSid) -> Result<ConversationView> {
        let handle = self.service.conversation(sid, HandleMode::Subscribe).await?;
        Ok(ConversationView::new(handle, Arc::clone(&self.authors)))
    }

    /// Releases per-conversation derived state once the user navigates
    /// away. The author cache stays put; identities are not scoped to a
    /// conversation.
    pub async fn close_conversation(&self, sid: &ConversationSid) {
        self.attachments.release_conversation(sid).await;
    }

    pub fn authors(&self) -> &Arc<AuthorResolutionCache> {
        &self.authors
    }

    pub fn attachments(&self) -> &AttachmentMaterializationCache {
        &self.attachments
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ClientEvent> {
        self.events.subscribe()
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
