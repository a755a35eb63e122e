use std::{
    collections::HashMap,
    sync::{Arc, Mutex as StdMutex},
};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::Utc;
use shared::{
    domain::{ConversationSid, JoinState, MediaSid, MessageSid},
    protocol::{ConversationSummary, DesiredConversation, MessageRecord, UserRecord},
};

use super::*;
use crate::paging::ListingPage;

struct FakeHandle {
    sid: ConversationSid,
    state: StdMutex<JoinState>,
    message_count: u64,
    messages: Vec<MessageRecord>,
    join_calls: Arc<StdMutex<u32>>,
    display_name: Arc<StdMutex<Option<String>>>,
    fail_join: bool,
}

impl FakeHandle {
    fn not_joined(sid: &str) -> Self {
        Self {
            sid: ConversationSid::from(sid),
            state: StdMutex::new(JoinState::NotJoined),
            message_count: 0,
            messages: Vec::new(),
            join_calls: Arc::new(StdMutex::new(0)),
            display_name: Arc::new(StdMutex::new(None)),
            fail_join: false,
        }
    }

    fn with_message_count(mut self, count: u64) -> Self {
        self.message_count = count;
        self
    }

    fn with_first_author(mut self, author: &str) -> Self {
        self.messages = vec![MessageRecord {
            sid: MessageSid::from("IM1"),
            index: 0,
            author: author.to_string(),
            participant_sid: None,
            date_created: Some(Utc::now()),
            attached_media: Vec::new(),
        }];
        self
    }

    fn failing_join(mut self) -> Self {
        self.fail_join = true;
        self
    }
}

#[async_trait]
impl ConversationHandle for FakeHandle {
    fn sid(&self) -> &ConversationSid {
        &self.sid
    }

    fn join_state(&self) -> JoinState {
        *self.state.lock().unwrap()
    }

    async fn join(&self) -> Result<()> {
        *self.join_calls.lock().unwrap() += 1;
        if self.fail_join {
            return Err(anyhow!("join rejected by remote service"));
        }
        *self.state.lock().unwrap() = JoinState::Joined;
        Ok(())
    }

    async fn set_display_name(&self, name: &str) -> Result<()> {
        *self.display_name.lock().unwrap() = Some(name.to_string());
        Ok(())
    }

    async fn message_count(&self) -> Result<u64> {
        Ok(self.message_count)
    }

    async fn unread_message_count(&self) -> Result<u64> {
        Ok(0)
    }

    async fn messages(&self) -> Result<Vec<MessageRecord>> {
        Ok(self.messages.clone())
    }
}

#[derive(Default)]
struct FakeService {
    handles: HashMap<ConversationSid, Arc<FakeHandle>>,
}

impl FakeService {
    fn with_handle(mut self, handle: FakeHandle) -> Self {
        self.handles.insert(handle.sid.clone(), Arc::new(handle));
        self
    }

    fn handle(&self, sid: &str) -> &Arc<FakeHandle> {
        self.handles
            .get(&ConversationSid::from(sid))
            .expect("handle registered")
    }
}

#[async_trait]
impl ConversationService for FakeService {
    async fn list_subscribed_conversations(
        &self,
    ) -> Result<Box<dyn ListingPage<Item = ConversationSummary>>> {
        Err(anyhow!("not used by join policy tests"))
    }

    async fn conversation(
        &self,
        sid: &ConversationSid,
        _mode: HandleMode,
    ) -> Result<Arc<dyn ConversationHandle>> {
        self.handles
            .get(sid)
            .map(|handle| Arc::clone(handle) as Arc<dyn ConversationHandle>)
            .ok_or_else(|| anyhow!("unknown conversation {sid}"))
    }

    async fn user(&self, identity: &str) -> Result<UserRecord> {
        Err(anyhow!("no user {identity}"))
    }

    async fn download_media(
        &self,
        _conversation: &ConversationSid,
        _message: &MessageSid,
        _media: &MediaSid,
    ) -> Result<Vec<u8>> {
        Err(anyhow!("not used by join policy tests"))
    }
}

fn desired(sid: &str, attribute: Option<&str>) -> DesiredConversation {
    DesiredConversation {
        sid: ConversationSid::from(sid),
        attribute: attribute.map(str::to_string),
    }
}

fn engine(service: &Arc<FakeService>, settings: ReconcilerSettings) -> JoinPolicyEngine {
    JoinPolicyEngine::new(Arc::clone(service) as Arc<dyn ConversationService>, settings)
}

#[tokio::test]
async fn joins_missing_conversation() {
    let service = Arc::new(FakeService::default().with_handle(FakeHandle::not_joined("CH1")));
    let engine = engine(&service, ReconcilerSettings::default());

    let outcome = engine.decide_and_join(&desired("CH1", None)).await;
    assert_eq!(outcome.action, JoinAction::Joined);
    assert_eq!(*service.handle("CH1").join_calls.lock().unwrap(), 1);
}

#[tokio::test]
async fn second_pass_is_idempotent() {
    let service = Arc::new(FakeService::default().with_handle(FakeHandle::not_joined("CH1")));
    let engine = engine(&service, ReconcilerSettings::default());
    let conversation = desired("CH1", None);

    let first = engine.decide_and_join(&conversation).await;
    assert_eq!(first.action, JoinAction::Joined);

    let second = engine.decide_and_join(&conversation).await;
    assert_eq!(second.action, JoinAction::SkipAlreadyJoined);
    assert_eq!(*service.handle("CH1").join_calls.lock().unwrap(), 1);
}

#[tokio::test]
async fn matching_message_count_gates_the_join() {
    let service = Arc::new(
        FakeService::default().with_handle(FakeHandle::not_joined("CH1").with_message_count(5)),
    );
    let settings = ReconcilerSettings {
        gate_on_message_count: true,
        ..ReconcilerSettings::default()
    };
    let engine = engine(&service, settings);

    let outcome = engine.decide_and_join(&desired("CH1", Some("5"))).await;
    assert_eq!(outcome.action, JoinAction::SkipGated);
    assert_eq!(*service.handle("CH1").join_calls.lock().unwrap(), 0);
}

#[tokio::test]
async fn differing_message_count_proceeds_to_join() {
    let service = Arc::new(
        FakeService::default().with_handle(FakeHandle::not_joined("CH1").with_message_count(3)),
    );
    let settings = ReconcilerSettings {
        gate_on_message_count: true,
        ..ReconcilerSettings::default()
    };
    let engine = engine(&service, settings);

    let outcome = engine.decide_and_join(&desired("CH1", Some("5"))).await;
    assert_eq!(outcome.action, JoinAction::Joined);
    assert_eq!(*service.handle("CH1").join_calls.lock().unwrap(), 1);
}

#[tokio::test]
async fn unparsable_attribute_disables_the_gate() {
    let service = Arc::new(
        FakeService::default().with_handle(FakeHandle::not_joined("CH1").with_message_count(5)),
    );
    let settings = ReconcilerSettings {
        gate_on_message_count: true,
        ..ReconcilerSettings::default()
    };
    let engine = engine(&service, settings);

    let outcome = engine
        .decide_and_join(&desired("CH1", Some("not-a-number")))
        .await;
    assert_eq!(outcome.action, JoinAction::Joined);
}

#[tokio::test]
async fn gate_is_off_unless_configured() {
    let service = Arc::new(
        FakeService::default().with_handle(FakeHandle::not_joined("CH1").with_message_count(5)),
    );
    let engine = engine(&service, ReconcilerSettings::default());

    let outcome = engine.decide_and_join(&desired("CH1", Some("5"))).await;
    assert_eq!(outcome.action, JoinAction::Joined);
}

#[tokio::test]
async fn phone_shaped_author_renames_before_join() {
    let service = Arc::new(
        FakeService::default()
            .with_handle(FakeHandle::not_joined("CH1").with_first_author("+821012345678")),
    );
    let settings = ReconcilerSettings {
        rename_from_author_number: true,
        ..ReconcilerSettings::default()
    };
    let engine = engine(&service, settings);

    let outcome = engine.decide_and_join(&desired("CH1", None)).await;
    assert_eq!(outcome.action, JoinAction::JoinedWithRename);
    assert_eq!(
        service.handle("CH1").display_name.lock().unwrap().as_deref(),
        Some("010-1234-5678 (KR)")
    );
}

#[tokio::test]
async fn unparsable_author_leaves_name_unset() {
    let service = Arc::new(
        FakeService::default()
            .with_handle(FakeHandle::not_joined("CH1").with_first_author("system-bot")),
    );
    let settings = ReconcilerSettings {
        rename_from_author_number: true,
        ..ReconcilerSettings::default()
    };
    let engine = engine(&service, settings);

    let outcome = engine.decide_and_join(&desired("CH1", None)).await;
    assert_eq!(outcome.action, JoinAction::Joined);
    assert!(service.handle("CH1").display_name.lock().unwrap().is_none());
}

#[tokio::test]
async fn join_failure_is_a_terminal_outcome() {
    let service =
        Arc::new(FakeService::default().with_handle(FakeHandle::not_joined("CH1").failing_join()));
    let engine = engine(&service, ReconcilerSettings::default());

    let outcome = engine.decide_and_join(&desired("CH1", None)).await;
    assert!(matches!(outcome.action, JoinAction::JoinFailed { .. }));
}

#[tokio::test]
async fn unknown_conversation_lookup_is_a_terminal_outcome() {
    let service = Arc::new(FakeService::default());
    let engine = engine(&service, ReconcilerSettings::default());

    let outcome = engine.decide_and_join(&desired("CH404", None)).await;
    assert!(matches!(outcome.action, JoinAction::JoinFailed { .. }));
}
