use std::{collections::HashSet, sync::Arc};

use shared::{
    domain::ConversationSid,
    protocol::{ConversationSummary, DesiredConversation},
};
use tracing::info;

use crate::{
    config::ReconcilerSettings,
    join_policy::{JoinAction, JoinOutcome, JoinPolicyEngine},
    paging::{collect_all_pages, RemoteListingError},
    service::ConversationService,
};

/// Set difference between the desired membership and the subscribed set,
/// by sid identity only. Output preserves the desired-input order.
pub fn missing_conversations(
    subscribed: &[ConversationSummary],
    desired: &[DesiredConversation],
) -> Vec<DesiredConversation> {
    let subscribed_sids: HashSet<&ConversationSid> =
        subscribed.iter().map(|summary| &summary.sid).collect();
    desired
        .iter()
        .filter(|conversation| !subscribed_sids.contains(&conversation.sid))
        .cloned()
        .collect()
}

#[derive(Debug, Clone)]
pub struct ReconciliationReport {
    /// Size of the fully drained subscription listing the diff ran against.
    pub subscribed: usize,
    pub outcomes: Vec<JoinOutcome>,
}

impl ReconciliationReport {
    pub fn joined(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| {
                matches!(
                    outcome.action,
                    JoinAction::Joined | JoinAction::JoinedWithRename
                )
            })
            .count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| matches!(outcome.action, JoinAction::JoinFailed { .. }))
            .count()
    }
}

/// Runs once per session start: drain the subscription listing completely,
/// diff it against the desired set, then work through the join worklist
/// sequentially. The listing must finish before any diff or join happens;
/// diffing a partial page set re-joins conversations the identity is
/// already in.
pub struct ConversationReconciler {
    service: Arc<dyn ConversationService>,
    policy: JoinPolicyEngine,
}

impl ConversationReconciler {
    pub fn new(service: Arc<dyn ConversationService>, settings: ReconcilerSettings) -> Self {
        let policy = JoinPolicyEngine::new(Arc::clone(&service), settings);
        Self { service, policy }
    }

    pub async fn run(
        &self,
        desired: &[DesiredConversation],
    ) -> Result<ReconciliationReport, RemoteListingError> {
        let first_page = self.service.list_subscribed_conversations().await?;
        let subscribed = collect_all_pages(first_page).await?;

        let worklist = missing_conversations(&subscribed, desired);
        info!(
            subscribed = subscribed.len(),
            desired = desired.len(),
            missing = worklist.len(),
            "reconcile: membership diff computed"
        );

        // Joins are sequential on purpose; the join endpoint is
        // rate-sensitive and error attribution stays per conversation.
        let mut outcomes = Vec::with_capacity(worklist.len());
        for conversation in &worklist {
            outcomes.push(self.policy.decide_and_join(conversation).await);
        }

        Ok(ReconciliationReport {
            subscribed: subscribed.len(),
            outcomes,
        })
    }
}

#[cfg(test)]
#[path = "tests/reconcile_tests.rs"]
mod tests;
