use std::{collections::HashSet, sync::Arc};

use anyhow::Result;
use shared::{
    domain::{ConversationSid, MessageSid},
    protocol::{MessageRecord, ParticipantRecord, PENDING_MESSAGE_INDEX},
};
use tracing::debug;

use crate::{authors::AuthorResolutionCache, date_bucket, service::ConversationHandle};

/// Per-open session over one conversation. Owns the derived state the
/// message view reads: the unread horizon memo and the date-bucket set.
/// Dropped when the user navigates away; a re-open builds a fresh view, so
/// every in-flight computation tied to this view dies with it.
pub struct ConversationView {
    handle: Arc<dyn ConversationHandle>,
    authors: Arc<AuthorResolutionCache>,
    messages: Vec<MessageRecord>,
    participants: Vec<ParticipantRecord>,
    day_boundaries: HashSet<MessageSid>,
    horizon: Option<u64>,
}

impl std::fmt::Debug for ConversationView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversationView")
            .field("messages", &self.messages)
            .field("participants", &self.participants)
            .field("day_boundaries", &self.day_boundaries)
            .field("horizon", &self.horizon)
            .finish_non_exhaustive()
    }
}

impl ConversationView {
    pub(crate) fn new(
        handle: Arc<dyn ConversationHandle>,
        authors: Arc<AuthorResolutionCache>,
    ) -> Self {
        Self {
            handle,
            authors,
            messages: Vec::new(),
            participants: Vec::new(),
            day_boundaries: HashSet::new(),
            horizon: None,
        }
    }

    pub fn sid(&self) -> &ConversationSid {
        self.handle.sid()
    }

    /// Unread-message count relative to the last-read position. The remote
    /// query runs at most once per view lifetime; repeated renders and
    /// unrelated message-list updates read the memo. No prior read position
    /// means a horizon of zero with no remote call at all.
    pub async fn unread_horizon(&mut self, last_read_index: i64) -> Result<u64> {
        if last_read_index == PENDING_MESSAGE_INDEX {
            return Ok(0);
        }
        if let Some(count) = self.horizon {
            return Ok(count);
        }
        let count = self.handle.unread_message_count().await?;
        debug!(sid = %self.handle.sid(), count, "view: unread horizon computed");
        self.horizon = Some(count);
        Ok(count)
    }

    /// Replaces the loaded message window. Recomputes the date buckets and
    /// lets the shared author cache schedule fetches for any authors it has
    /// not resolved yet.
    pub async fn set_messages(
        &mut self,
        messages: Vec<MessageRecord>,
        participants: Vec<ParticipantRecord>,
    ) {
        self.day_boundaries = date_bucket::first_message_per_day(&messages);
        self.messages = messages;
        self.participants = participants;
        self.authors
            .observe_messages(&self.messages, &self.participants)
            .await;
    }

    pub fn messages(&self) -> &[MessageRecord] {
        &self.messages
    }

    pub fn participants(&self) -> &[ParticipantRecord] {
        &self.participants
    }

    /// Whether this message should render a date separator above it.
    pub fn is_day_boundary(&self, sid: &MessageSid) -> bool {
        self.day_boundaries.contains(sid)
    }

    pub async fn author_display_name(&self, message: &MessageRecord) -> String {
        self.authors.friendly_name(message, &self.participants).await
    }
}

#[cfg(test)]
#[path = "tests/view_tests.rs"]
mod tests;
