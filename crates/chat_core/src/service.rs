use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use shared::{
    domain::{ConversationSid, JoinState, MediaSid, MessageSid},
    protocol::{ConversationSummary, MessageRecord, UserRecord},
};

use crate::paging::ListingPage;

/// How a conversation handle is acquired. `Peek` is read-only and never
/// changes membership; `Subscribe` registers for delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleMode {
    Peek,
    Subscribe,
}

/// Capability contract over the hosted messaging service. The concrete
/// wire protocol belongs to that collaborator; the engine only depends on
/// these seams.
#[async_trait]
pub trait ConversationService: Send + Sync {
    async fn list_subscribed_conversations(
        &self,
    ) -> Result<Box<dyn ListingPage<Item = ConversationSummary>>>;

    async fn conversation(
        &self,
        sid: &ConversationSid,
        mode: HandleMode,
    ) -> Result<Arc<dyn ConversationHandle>>;

    async fn user(&self, identity: &str) -> Result<UserRecord>;

    async fn download_media(
        &self,
        conversation: &ConversationSid,
        message: &MessageSid,
        media: &MediaSid,
    ) -> Result<Vec<u8>>;
}

#[async_trait]
pub trait ConversationHandle: Send + Sync {
    fn sid(&self) -> &ConversationSid;
    fn join_state(&self) -> JoinState;
    async fn join(&self) -> Result<()>;
    async fn set_display_name(&self, name: &str) -> Result<()>;
    async fn message_count(&self) -> Result<u64>;
    async fn unread_message_count(&self) -> Result<u64>;
    async fn messages(&self) -> Result<Vec<MessageRecord>>;
}
