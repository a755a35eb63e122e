use std::{collections::HashMap, sync::Arc};

use shared::domain::{ConversationSid, MediaSid, MessageSid};
use thiserror::Error;
use tokio::sync::{Mutex, OnceCell};
use tracing::debug;

use crate::service::ConversationService;

/// Media identities are not guaranteed globally unique, so cache keys are
/// scoped to their conversation and message.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AttachmentKey {
    pub conversation: ConversationSid,
    pub message: MessageSid,
    pub media: MediaSid,
}

#[derive(Debug, Error)]
#[error("media download failed for {}/{}/{}: {}", .key.conversation, .key.message, .key.media, .source)]
pub struct AttachmentDownloadError {
    pub key: AttachmentKey,
    #[source]
    pub source: anyhow::Error,
}

type Blob = Arc<Vec<u8>>;

/// On-demand blob cache for message attachments. Each key downloads at
/// most once; concurrent requests for the same key share the single
/// in-flight download while distinct keys proceed independently. A failed
/// download leaves the slot empty so the next user action retries.
pub struct AttachmentMaterializationCache {
    service: Arc<dyn ConversationService>,
    entries: Mutex<HashMap<AttachmentKey, Arc<OnceCell<Blob>>>>,
}

impl AttachmentMaterializationCache {
    pub fn new(service: Arc<dyn ConversationService>) -> Self {
        Self {
            service,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub async fn materialize(&self, key: AttachmentKey) -> Result<Blob, AttachmentDownloadError> {
        let cell = {
            let mut entries = self.entries.lock().await;
            Arc::clone(entries.entry(key.clone()).or_default())
        };

        let blob = cell
            .get_or_try_init(|| async {
                let bytes = self
                    .service
                    .download_media(&key.conversation, &key.message, &key.media)
                    .await
                    .map_err(|source| AttachmentDownloadError {
                        key: key.clone(),
                        source,
                    })?;
                debug!(
                    conversation = %key.conversation,
                    message = %key.message,
                    media = %key.media,
                    bytes = bytes.len(),
                    "media: attachment materialized"
                );
                Ok(Arc::new(bytes))
            })
            .await?;

        Ok(Arc::clone(blob))
    }

    /// Drops every entry scoped to the conversation. Called when its view
    /// closes; a later re-open downloads on demand again.
    pub async fn release_conversation(&self, conversation: &ConversationSid) {
        let mut entries = self.entries.lock().await;
        entries.retain(|key, _| &key.conversation != conversation);
    }

    /// Synchronous-style read over already-materialized state.
    pub async fn cached(&self, key: &AttachmentKey) -> Option<Blob> {
        let entries = self.entries.lock().await;
        entries.get(key).and_then(|cell| cell.get().cloned())
    }
}

#[cfg(test)]
#[path = "tests/attachments_tests.rs"]
mod tests;
