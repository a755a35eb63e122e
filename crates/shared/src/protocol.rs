use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{ConversationSid, JoinState, MediaSid, MessageSid, ParticipantSid};

/// Immutable snapshot of a remote conversation as reported by the
/// subscription listing at fetch time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub sid: ConversationSid,
    #[serde(default)]
    pub attributes: String,
    pub join_state: JoinState,
}

/// One entry of the desired-membership set handed out at session start.
/// The attribute is an opaque hint; some deployments carry a numeric
/// value used by the join gating policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DesiredConversation {
    pub sid: ConversationSid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
}

/// A message index of -1 marks a locally pending send that the remote
/// service has not yet confirmed.
pub const PENDING_MESSAGE_INDEX: i64 = -1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageRecord {
    pub sid: MessageSid,
    pub index: i64,
    pub author: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub participant_sid: Option<ParticipantSid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_created: Option<DateTime<Utc>>,
    #[serde(default)]
    pub attached_media: Vec<MediaAttachment>,
}

impl MessageRecord {
    pub fn is_pending(&self) -> bool {
        self.index == PENDING_MESSAGE_INDEX
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaAttachment {
    pub sid: MediaSid,
    pub content_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticipantRecord {
    pub sid: ParticipantSid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub identity: String,
    pub friendly_name: String,
}

/// Response body of the credential exchange endpoint: an access token for
/// the messaging service plus the conversations this identity should be a
/// member of.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionGrant {
    pub token: String,
    pub identity: String,
    #[serde(default)]
    pub conversations: Vec<DesiredConversation>,
}
