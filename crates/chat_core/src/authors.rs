use std::{collections::HashMap, sync::Arc};

use shared::protocol::{MessageRecord, ParticipantRecord, UserRecord};
use thiserror::Error;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, warn};

use crate::{service::ConversationService, ClientEvent};

#[derive(Debug, Error)]
#[error("user lookup failed for {identity}: {source}")]
pub struct UserResolutionError {
    pub identity: String,
    #[source]
    pub source: anyhow::Error,
}

enum AuthorEntry {
    /// A fetch for this identity is outstanding; further triggers must not
    /// start another one.
    InFlight,
    Resolved(UserRecord),
}

/// Process-wide identity-to-friendly-name cache. An identity's friendly
/// name does not vary by conversation, so one instance is shared across
/// every conversation view for the session's lifetime.
pub struct AuthorResolutionCache {
    service: Arc<dyn ConversationService>,
    entries: Mutex<HashMap<String, AuthorEntry>>,
    events: broadcast::Sender<ClientEvent>,
}

impl AuthorResolutionCache {
    pub fn new(
        service: Arc<dyn ConversationService>,
        events: broadcast::Sender<ClientEvent>,
    ) -> Arc<Self> {
        Arc::new(Self {
            service,
            entries: Mutex::new(HashMap::new()),
            events,
        })
    }

    /// Called on every message-list change. Schedules exactly one fetch per
    /// distinct unresolved identity; triggers racing an outstanding fetch
    /// find the in-flight marker and schedule nothing.
    pub async fn observe_messages(
        self: &Arc<Self>,
        messages: &[MessageRecord],
        participants: &[ParticipantRecord],
    ) {
        let by_sid: HashMap<_, _> = participants
            .iter()
            .map(|participant| (&participant.sid, participant))
            .collect();

        let mut to_fetch = Vec::new();
        {
            let mut entries = self.entries.lock().await;
            for message in messages {
                let Some(participant_sid) = &message.participant_sid else {
                    continue;
                };
                let Some(identity) = by_sid
                    .get(participant_sid)
                    .and_then(|participant| participant.identity.as_deref())
                else {
                    continue;
                };
                if !entries.contains_key(identity) {
                    entries.insert(identity.to_string(), AuthorEntry::InFlight);
                    to_fetch.push(identity.to_string());
                }
            }
        }

        for identity in to_fetch {
            let cache = Arc::clone(self);
            tokio::spawn(async move {
                cache.resolve(identity).await;
            });
        }
    }

    async fn resolve(&self, identity: String) {
        match self.fetch(&identity).await {
            Ok(user) => {
                let friendly_name = user.friendly_name.clone();
                {
                    let mut entries = self.entries.lock().await;
                    entries.insert(identity.clone(), AuthorEntry::Resolved(user));
                }
                debug!(identity = %identity, "authors: identity resolved");
                let _ = self.events.send(ClientEvent::AuthorResolved {
                    identity,
                    friendly_name,
                });
            }
            Err(err) => {
                // Drop the in-flight marker so a later message-list change
                // retries the lookup.
                warn!(identity = %err.identity, error = %err, "authors: resolution failed");
                let mut entries = self.entries.lock().await;
                entries.remove(&err.identity);
            }
        }
    }

    async fn fetch(&self, identity: &str) -> Result<UserRecord, UserResolutionError> {
        self.service
            .user(identity)
            .await
            .map_err(|source| UserResolutionError {
                identity: identity.to_string(),
                source,
            })
    }

    pub async fn resolved(&self, identity: &str) -> Option<UserRecord> {
        let entries = self.entries.lock().await;
        match entries.get(identity) {
            Some(AuthorEntry::Resolved(user)) => Some(user.clone()),
            _ => None,
        }
    }

    /// Display name for a message author: the resolved friendly name when
    /// the cache has one, otherwise the raw author identifier.
    pub async fn friendly_name(
        &self,
        message: &MessageRecord,
        participants: &[ParticipantRecord],
    ) -> String {
        let Some(participant_sid) = &message.participant_sid else {
            return message.author.clone();
        };
        let Some(identity) = participants
            .iter()
            .find(|participant| &participant.sid == participant_sid)
            .and_then(|participant| participant.identity.as_deref())
        else {
            return message.author.clone();
        };

        match self.resolved(identity).await {
            Some(user) if !user.friendly_name.is_empty() => user.friendly_name,
            _ => message.author.clone(),
        }
    }
}

#[cfg(test)]
#[path = "tests/authors_tests.rs"]
mod tests;
