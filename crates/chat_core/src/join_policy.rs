use std::sync::Arc;

use shared::{domain::ConversationSid, protocol::DesiredConversation};
use thiserror::Error;
use tracing::{info, warn};

use crate::{
    config::ReconcilerSettings,
    phone,
    service::{ConversationHandle, ConversationService, HandleMode},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinAction {
    SkipAlreadyJoined,
    SkipGated,
    Joined,
    JoinedWithRename,
    JoinFailed { reason: String },
}

/// Terminal record of one conversation's pass through the join flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinOutcome {
    pub sid: ConversationSid,
    pub action: JoinAction,
}

#[derive(Debug, Error)]
pub enum JoinError {
    #[error("conversation lookup failed: {0}")]
    Lookup(#[source] anyhow::Error),
    #[error("message count query failed: {0}")]
    MessageCount(#[source] anyhow::Error),
    #[error("join call failed: {0}")]
    Join(#[source] anyhow::Error),
}

/// Decides whether and how to join one missing conversation, then executes
/// the join. Failures never escape: each conversation ends in a terminal
/// action and the caller moves on to the next worklist entry.
pub struct JoinPolicyEngine {
    service: Arc<dyn ConversationService>,
    settings: ReconcilerSettings,
}

impl JoinPolicyEngine {
    pub fn new(service: Arc<dyn ConversationService>, settings: ReconcilerSettings) -> Self {
        Self { service, settings }
    }

    pub async fn decide_and_join(&self, desired: &DesiredConversation) -> JoinOutcome {
        let action = match self.try_join(desired).await {
            Ok(action) => action,
            Err(err) => {
                warn!(sid = %desired.sid, error = %err, "reconcile: join attempt failed");
                JoinAction::JoinFailed {
                    reason: err.to_string(),
                }
            }
        };
        JoinOutcome {
            sid: desired.sid.clone(),
            action,
        }
    }

    async fn try_join(&self, desired: &DesiredConversation) -> Result<JoinAction, JoinError> {
        let handle = self
            .service
            .conversation(&desired.sid, HandleMode::Peek)
            .await
            .map_err(JoinError::Lookup)?;

        if handle.join_state().is_joined() {
            info!(sid = %desired.sid, "reconcile: already joined, skipping");
            return Ok(JoinAction::SkipAlreadyJoined);
        }

        if self.settings.gate_on_message_count {
            if let Some(hint) = numeric_hint(desired) {
                let count = handle.message_count().await.map_err(JoinError::MessageCount)?;
                if count == hint {
                    info!(
                        sid = %desired.sid,
                        hint,
                        "reconcile: message count matches attribute hint, gated skip"
                    );
                    return Ok(JoinAction::SkipGated);
                }
            }
        }

        let renamed = if self.settings.rename_from_author_number {
            self.apply_author_display_name(handle.as_ref()).await
        } else {
            false
        };

        handle.join().await.map_err(JoinError::Join)?;
        info!(sid = %desired.sid, renamed, "reconcile: joined conversation");

        Ok(if renamed {
            JoinAction::JoinedWithRename
        } else {
            JoinAction::Joined
        })
    }

    /// Best-effort naming enrichment: a failure here only means the
    /// conversation keeps its sid for display, so it never blocks the join.
    async fn apply_author_display_name(&self, handle: &dyn ConversationHandle) -> bool {
        let messages = match handle.messages().await {
            Ok(messages) => messages,
            Err(err) => {
                warn!(sid = %handle.sid(), error = %err, "reconcile: message fetch for naming failed");
                return false;
            }
        };
        let Some(first) = messages.first() else {
            return false;
        };
        let Some(formatted) = phone::format_author(&first.author) else {
            return false;
        };

        let name = format!("{} ({})", formatted.national, formatted.region);
        match handle.set_display_name(&name).await {
            Ok(()) => {
                info!(sid = %handle.sid(), name = %name, "reconcile: display name derived from author");
                true
            }
            Err(err) => {
                warn!(sid = %handle.sid(), error = %err, "reconcile: display name update failed");
                false
            }
        }
    }
}

fn numeric_hint(desired: &DesiredConversation) -> Option<u64> {
    desired.attribute.as_deref()?.trim().parse().ok()
}

#[cfg(test)]
#[path = "tests/join_policy_tests.rs"]
mod tests;
