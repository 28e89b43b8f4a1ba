//! Metered streaming turn orchestration.
//!
//! One turn walks a fixed sequence: validate, persist the user turn, relay
//! the generation stream, persist the assistant turn, settle the charge.
//! Side effects happen in that order so a crash at any point leaves a
//! consistent transcript: a user turn with no reply means generation never
//! finished, and a reply with no debit means settlement is still owed.

use std::sync::Arc;

use futures_util::StreamExt;
use qcommon::{ConversationId, TurnId, UserId};
use qgateway::{
    CompletionEvent, CompletionGateway, CompletionRequest, CompletionSummary, GatewayError,
    PromptMessage, Role,
};
use qledger::CreditLedger;
use qstore::{Author, Conversation, ConversationStore, NewConversation, Turn};
use tokio::sync::mpsc::{self, Sender};

use crate::locks::ConversationLocks;
use crate::{
    BillingPolicy, ConversationRequest, NoopSessionHooks, SessionError, SessionEvent,
    SessionEventStream, SessionHooks, SessionPhase, TurnReceipt, TurnRequest,
};

/// Relay channel depth. The gateway is drained only as fast as the caller
/// reads, plus this small cushion.
const EVENT_CHANNEL_CAPACITY: usize = 16;

#[derive(Clone)]
pub struct SessionOrchestrator {
    gateway: Arc<dyn CompletionGateway>,
    store: Arc<dyn ConversationStore>,
    ledger: Arc<dyn CreditLedger>,
    billing: BillingPolicy,
    hooks: Arc<dyn SessionHooks>,
    locks: Arc<ConversationLocks>,
}

impl SessionOrchestrator {
    pub fn new(
        gateway: Arc<dyn CompletionGateway>,
        store: Arc<dyn ConversationStore>,
        ledger: Arc<dyn CreditLedger>,
    ) -> Self {
        Self {
            gateway,
            store,
            ledger,
            billing: BillingPolicy::default(),
            hooks: Arc::new(NoopSessionHooks),
            locks: Arc::new(ConversationLocks::new()),
        }
    }

    pub fn with_billing_policy(mut self, billing: BillingPolicy) -> Self {
        self.billing = billing;
        self
    }

    pub fn with_hooks(mut self, hooks: Arc<dyn SessionHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    /// Opens a conversation for a user that already holds a credit account.
    pub async fn start_conversation(
        &self,
        request: NewConversation,
    ) -> Result<Conversation, SessionError> {
        self.ledger.balance(&request.owner).await?;
        let conversation = self.store.create_conversation(request).await?;
        Ok(conversation)
    }

    /// Opens a conversation and streams its first reply in one call.
    pub async fn begin_conversation(
        &self,
        request: ConversationRequest,
    ) -> Result<(Conversation, SessionEventStream), SessionError> {
        let mut new_conversation = NewConversation::new(request.user.clone(), request.title);
        new_conversation.metadata = request.metadata;

        let conversation = self.start_conversation(new_conversation).await?;
        let stream = self
            .send_turn(TurnRequest::new(
                request.user,
                conversation.id.clone(),
                request.user_input,
                request.options,
            ))
            .await?;

        Ok((conversation, stream))
    }

    /// Runs one metered turn and returns its event stream.
    ///
    /// Validation failures surface here, before anything is persisted.
    /// Once this returns `Ok`, the user turn is durable and the generation
    /// runs to completion (or interruption) even if the returned stream is
    /// dropped.
    pub async fn send_turn(&self, request: TurnRequest) -> Result<SessionEventStream, SessionError> {
        if request.user_input.trim().is_empty() {
            return Err(SessionError::invalid_request("user_input must not be empty"));
        }

        let guard = self.locks.acquire(&request.conversation_id).await?;

        self.hooks
            .on_phase_change(&request.conversation_id, SessionPhase::Validating);

        let conversation = self.store.get_conversation(&request.conversation_id).await?;
        if conversation.owner != request.user {
            return Err(SessionError::not_found(format!(
                "conversation '{}' not found for user '{}'",
                request.conversation_id, request.user
            )));
        }

        let balance = self.ledger.balance(&request.user).await?;
        if balance == 0 {
            return Err(SessionError::insufficient_balance(format!(
                "user '{}' has no credits remaining",
                request.user
            )));
        }

        // The user turn becomes durable before any generation work starts.
        let user_turn = self
            .store
            .append_turn(&request.conversation_id, Author::User, request.user_input)
            .await?;

        let prior = self.store.list_turns(&request.conversation_id).await?;
        let mut completion = CompletionRequest::new(request.options.model, prompt_from_turns(&prior))
            .with_metadata("conversation_id", request.conversation_id.as_str());
        if let Some(temperature) = request.options.temperature {
            completion = completion.with_temperature(temperature);
        }

        if let Some(max_tokens) = request.options.max_tokens {
            completion = completion.with_max_tokens(max_tokens);
        }

        let (sender, receiver) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let turn = TurnDriver {
            gateway: Arc::clone(&self.gateway),
            store: Arc::clone(&self.store),
            ledger: Arc::clone(&self.ledger),
            billing: self.billing,
            hooks: Arc::clone(&self.hooks),
            conversation_id: request.conversation_id,
            user: request.user,
            user_turn_id: user_turn.id,
        };

        tokio::spawn(async move {
            turn.run(completion, sender).await;
            drop(guard);
        });

        Ok(SessionEventStream::new(receiver))
    }
}

/// Everything one in-flight turn needs after validation. Owned by the
/// spawned task so the turn outlives the caller's stream handle.
struct TurnDriver {
    gateway: Arc<dyn CompletionGateway>,
    store: Arc<dyn ConversationStore>,
    ledger: Arc<dyn CreditLedger>,
    billing: BillingPolicy,
    hooks: Arc<dyn SessionHooks>,
    conversation_id: ConversationId,
    user: UserId,
    user_turn_id: TurnId,
}

impl TurnDriver {
    async fn run(self, completion: CompletionRequest, sender: Sender<Result<SessionEvent, SessionError>>) {
        self.hooks
            .on_phase_change(&self.conversation_id, SessionPhase::Streaming);

        let mut stream = match self.gateway.stream_completion(completion).await {
            Ok(stream) => stream,
            Err(error) => {
                self.fail(&sender, error.into()).await;
                return;
            }
        };

        let mut assistant_text = String::new();
        let mut summary: Option<CompletionSummary> = None;
        let mut interruption: Option<GatewayError> = None;
        let mut caller_gone = false;

        while let Some(item) = stream.next().await {
            match item {
                Ok(CompletionEvent::Fragment(delta)) => {
                    assistant_text.push_str(&delta);
                    self.hooks
                        .on_fragment_relayed(&self.conversation_id, delta.len());
                    if !caller_gone
                        && sender.send(Ok(SessionEvent::Fragment(delta))).await.is_err()
                    {
                        // Caller disconnected; keep draining so the turn
                        // still persists and settles.
                        caller_gone = true;
                    }
                }
                Ok(CompletionEvent::Completed(value)) => {
                    summary = Some(value);
                }
                Err(error) => {
                    if assistant_text.is_empty() && summary.is_none() {
                        // Nothing reached the caller, so the turn unwinds
                        // cleanly: no assistant turn, no charge.
                        self.fail(&sender, error.into()).await;
                        return;
                    }

                    interruption = Some(error);
                    break;
                }
            }
        }

        drop(stream);

        if let Some(error) = &interruption {
            self.hooks.on_interruption(&self.conversation_id, &error.message);
            if !caller_gone {
                let _ = sender
                    .send(Ok(SessionEvent::Interrupted(error.message.clone())))
                    .await;
            }
        }

        self.hooks
            .on_phase_change(&self.conversation_id, SessionPhase::Settling);

        let assistant_turn_id = if assistant_text.is_empty() {
            None
        } else {
            match self
                .store
                .append_turn(&self.conversation_id, Author::Assistant, assistant_text)
                .await
            {
                Ok(turn) => Some(turn.id),
                Err(error) => {
                    self.fail(&sender, error.into()).await;
                    return;
                }
            }
        };

        // A summary without usage metadata bills the configured fallback.
        // No summary at all means the generation never reported usage and
        // nothing is charged.
        let usage_units = match &summary {
            Some(value) => value
                .usage
                .map(|usage| usage.units)
                .unwrap_or(self.billing.fallback_usage_units),
            None => 0,
        };

        let (credits_charged, balance_remaining) = if usage_units == 0 {
            match self.ledger.balance(&self.user).await {
                Ok(balance) => (0, balance),
                Err(error) => {
                    self.fail(&sender, error.into()).await;
                    return;
                }
            }
        } else {
            match self.ledger.settle(&self.user, usage_units).await {
                Ok(settled) => (settled.charged, settled.remaining),
                Err(error) => {
                    self.fail(&sender, error.into()).await;
                    return;
                }
            }
        };

        let receipt = TurnReceipt {
            conversation_id: self.conversation_id.clone(),
            user_turn_id: self.user_turn_id.clone(),
            assistant_turn_id,
            stop: summary.map(|value| value.stop),
            usage_units,
            credits_charged,
            balance_remaining,
            interrupted: interruption.is_some(),
        };

        self.hooks.on_turn_settled(&receipt);
        let _ = sender.send(Ok(SessionEvent::TurnComplete(receipt))).await;
    }

    async fn fail(&self, sender: &Sender<Result<SessionEvent, SessionError>>, error: SessionError) {
        self.hooks.on_turn_failed(&self.conversation_id, &error);
        let _ = sender.send(Err(error)).await;
    }
}

fn prompt_from_turns(turns: &[Turn]) -> Vec<PromptMessage> {
    turns
        .iter()
        .map(|turn| {
            let role = match turn.author {
                Author::User => Role::User,
                Author::Assistant => Role::Assistant,
            };
            PromptMessage::new(role, turn.text.clone())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use qgateway::{GatewayFuture, GatewayId, StopCause, VecFragmentStream};
    use qledger::InMemoryCreditLedger;
    use qstore::InMemoryConversationStore;

    use super::*;
    use crate::{GenerationOptions, SessionErrorKind};

    struct FakeGateway {
        requests: Mutex<Vec<CompletionRequest>>,
        events: Mutex<Vec<Result<CompletionEvent, GatewayError>>>,
    }

    impl FakeGateway {
        fn scripted(events: Vec<Result<CompletionEvent, GatewayError>>) -> Self {
            Self {
                requests: Mutex::new(Vec::new()),
                events: Mutex::new(events),
            }
        }

        fn request_count(&self) -> usize {
            self.requests.lock().expect("requests lock").len()
        }
    }

    impl CompletionGateway for FakeGateway {
        fn id(&self) -> GatewayId {
            GatewayId::Scripted
        }

        fn stream_completion<'a>(
            &'a self,
            request: CompletionRequest,
        ) -> GatewayFuture<'a, Result<qgateway::BoxedFragmentStream<'a>, GatewayError>> {
            Box::pin(async move {
                self.requests
                    .lock()
                    .expect("requests lock")
                    .push(request);

                let events = self.events.lock().expect("events lock").clone();
                Ok(Box::pin(VecFragmentStream::new(events)) as qgateway::BoxedFragmentStream<'a>)
            })
        }
    }

    struct BrokenGateway;

    impl CompletionGateway for BrokenGateway {
        fn id(&self) -> GatewayId {
            GatewayId::Scripted
        }

        fn stream_completion<'a>(
            &'a self,
            _request: CompletionRequest,
        ) -> GatewayFuture<'a, Result<qgateway::BoxedFragmentStream<'a>, GatewayError>> {
            Box::pin(async move { Err(GatewayError::unavailable("provider offline")) })
        }
    }

    struct Fixture {
        orchestrator: SessionOrchestrator,
        store: Arc<InMemoryConversationStore>,
        ledger: Arc<InMemoryCreditLedger>,
        user: UserId,
        conversation_id: ConversationId,
    }

    async fn fixture(gateway: Arc<dyn CompletionGateway>, initial_credits: u64) -> Fixture {
        let store = Arc::new(InMemoryConversationStore::new());
        let ledger = Arc::new(InMemoryCreditLedger::new());
        let user = UserId::from("user-1");
        ledger
            .open_account(&user, initial_credits)
            .await
            .expect("open account");

        let orchestrator = SessionOrchestrator::new(gateway, store.clone(), ledger.clone());
        let conversation = orchestrator
            .start_conversation(NewConversation::new(user.clone(), "contract review"))
            .await
            .expect("conversation should open");

        Fixture {
            orchestrator,
            store,
            ledger,
            user,
            conversation_id: conversation.id,
        }
    }

    fn turn_request(fixture: &Fixture, user_input: &str) -> TurnRequest {
        TurnRequest::new(
            fixture.user.clone(),
            fixture.conversation_id.clone(),
            user_input,
            GenerationOptions::new("quill-large"),
        )
    }

    async fn collect(mut stream: SessionEventStream) -> Vec<Result<SessionEvent, SessionError>> {
        let mut events = Vec::new();
        while let Some(event) = stream.next().await {
            events.push(event);
        }
        events
    }

    fn receipt_of(events: &[Result<SessionEvent, SessionError>]) -> TurnReceipt {
        match events.last() {
            Some(Ok(SessionEvent::TurnComplete(receipt))) => receipt.clone(),
            other => panic!("expected terminal receipt, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn happy_path_relays_fragments_persists_and_debits() {
        let gateway = Arc::new(FakeGateway::scripted(vec![
            Ok(CompletionEvent::Fragment("hello".into())),
            Ok(CompletionEvent::Fragment(" world".into())),
            Ok(CompletionEvent::Completed(CompletionSummary::with_units(30))),
        ]));
        let fixture = fixture(gateway.clone(), 50).await;

        let stream = fixture
            .orchestrator
            .send_turn(turn_request(&fixture, "summarize the lease"))
            .await
            .expect("turn should start");
        let events = collect(stream).await;

        assert_eq!(events.len(), 3);
        assert_eq!(
            events[0],
            Ok(SessionEvent::Fragment("hello".into()))
        );
        assert_eq!(
            events[1],
            Ok(SessionEvent::Fragment(" world".into()))
        );

        let receipt = receipt_of(&events);
        assert_eq!(receipt.usage_units, 30);
        assert_eq!(receipt.credits_charged, 30);
        assert_eq!(receipt.balance_remaining, 20);
        assert_eq!(receipt.stop, Some(StopCause::EndTurn));
        assert!(!receipt.interrupted);
        assert!(receipt.assistant_turn_id.is_some());

        let turns = fixture
            .store
            .list_turns(&fixture.conversation_id)
            .await
            .expect("turns");
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].author, Author::User);
        assert_eq!(turns[0].text, "summarize the lease");
        assert_eq!(turns[1].author, Author::Assistant);
        assert_eq!(turns[1].text, "hello world");

        assert_eq!(
            fixture.ledger.balance(&fixture.user).await.expect("balance"),
            20
        );
        assert_eq!(gateway.request_count(), 1);
    }

    #[tokio::test]
    async fn prompt_includes_prior_turns_in_order() {
        let gateway = Arc::new(FakeGateway::scripted(vec![
            Ok(CompletionEvent::Fragment("reply".into())),
            Ok(CompletionEvent::Completed(CompletionSummary::with_units(1))),
        ]));
        let fixture = fixture(gateway.clone(), 50).await;

        let first = fixture
            .orchestrator
            .send_turn(turn_request(&fixture, "first question"))
            .await
            .expect("first turn");
        collect(first).await;

        let second = fixture
            .orchestrator
            .send_turn(turn_request(&fixture, "second question"))
            .await
            .expect("second turn");
        collect(second).await;

        let requests = gateway.requests.lock().expect("requests lock");
        assert_eq!(requests.len(), 2);
        let sent = &requests[1];
        assert_eq!(sent.messages.len(), 3);
        assert_eq!(sent.messages[0], PromptMessage::new(Role::User, "first question"));
        assert_eq!(sent.messages[1], PromptMessage::new(Role::Assistant, "reply"));
        assert_eq!(sent.messages[2], PromptMessage::new(Role::User, "second question"));
    }

    #[tokio::test]
    async fn rejects_empty_user_input() {
        let gateway = Arc::new(FakeGateway::scripted(Vec::new()));
        let fixture = fixture(gateway.clone(), 50).await;

        let error = fixture
            .orchestrator
            .send_turn(turn_request(&fixture, "   "))
            .await
            .expect_err("turn should fail");
        assert_eq!(error.kind, SessionErrorKind::InvalidRequest);
        assert_eq!(gateway.request_count(), 0);
    }

    #[tokio::test]
    async fn zero_balance_rejects_before_anything_persists() {
        let gateway = Arc::new(FakeGateway::scripted(Vec::new()));
        let fixture = fixture(gateway.clone(), 0).await;

        let error = fixture
            .orchestrator
            .send_turn(turn_request(&fixture, "hello"))
            .await
            .expect_err("turn should fail");
        assert_eq!(error.kind, SessionErrorKind::InsufficientBalance);

        let turns = fixture
            .store
            .list_turns(&fixture.conversation_id)
            .await
            .expect("turns");
        assert!(turns.is_empty());
        assert_eq!(gateway.request_count(), 0);
    }

    #[tokio::test]
    async fn other_users_conversation_is_not_found() {
        let gateway = Arc::new(FakeGateway::scripted(Vec::new()));
        let fixture = fixture(gateway, 50).await;

        let intruder = UserId::from("user-2");
        fixture
            .ledger
            .open_account(&intruder, 10)
            .await
            .expect("open intruder account");

        let request = TurnRequest::new(
            intruder,
            fixture.conversation_id.clone(),
            "hello",
            GenerationOptions::new("quill-large"),
        );
        let error = fixture
            .orchestrator
            .send_turn(request)
            .await
            .expect_err("turn should fail");
        assert_eq!(error.kind, SessionErrorKind::NotFound);
    }

    #[tokio::test]
    async fn interruption_persists_partial_output_without_charging() {
        let gateway = Arc::new(FakeGateway::scripted(vec![
            Ok(CompletionEvent::Fragment("par".into())),
            Ok(CompletionEvent::Fragment("tial".into())),
            Err(GatewayError::interrupted("connection reset")),
        ]));
        let fixture = fixture(gateway, 50).await;

        let stream = fixture
            .orchestrator
            .send_turn(turn_request(&fixture, "hello"))
            .await
            .expect("turn should start");
        let events = collect(stream).await;

        assert_eq!(events.len(), 4);
        assert!(matches!(events[2], Ok(SessionEvent::Interrupted(_))));

        let receipt = receipt_of(&events);
        assert!(receipt.interrupted);
        assert_eq!(receipt.usage_units, 0);
        assert_eq!(receipt.credits_charged, 0);
        assert_eq!(receipt.balance_remaining, 50);
        assert_eq!(receipt.stop, None);

        let turns = fixture
            .store
            .list_turns(&fixture.conversation_id)
            .await
            .expect("turns");
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[1].text, "partial");
    }

    #[tokio::test]
    async fn interruption_after_the_summary_still_bills_reported_usage() {
        let gateway = Arc::new(FakeGateway::scripted(vec![
            Ok(CompletionEvent::Fragment("full reply".into())),
            Ok(CompletionEvent::Completed(CompletionSummary::with_units(7))),
            Err(GatewayError::interrupted("connection reset after summary")),
        ]));
        let fixture = fixture(gateway, 50).await;

        let stream = fixture
            .orchestrator
            .send_turn(turn_request(&fixture, "hello"))
            .await
            .expect("turn should start");
        let receipt = receipt_of(&collect(stream).await);

        // The provider reported usage before the break, so the receipt is
        // interrupted but billed in full.
        assert!(receipt.interrupted);
        assert_eq!(receipt.usage_units, 7);
        assert_eq!(receipt.credits_charged, 7);
        assert_eq!(receipt.balance_remaining, 43);
    }

    #[tokio::test]
    async fn failure_before_first_fragment_leaves_only_the_user_turn() {
        let fixture = fixture(Arc::new(BrokenGateway), 50).await;

        let stream = fixture
            .orchestrator
            .send_turn(turn_request(&fixture, "hello"))
            .await
            .expect("turn should start");
        let events = collect(stream).await;

        assert_eq!(events.len(), 1);
        let error = events[0].clone().expect_err("event should be an error");
        assert_eq!(error.kind, SessionErrorKind::Gateway);

        let turns = fixture
            .store
            .list_turns(&fixture.conversation_id)
            .await
            .expect("turns");
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].author, Author::User);
        assert_eq!(
            fixture.ledger.balance(&fixture.user).await.expect("balance"),
            50
        );
    }

    #[tokio::test]
    async fn missing_usage_metadata_bills_the_fallback() {
        let gateway = Arc::new(FakeGateway::scripted(vec![
            Ok(CompletionEvent::Fragment("short".into())),
            Ok(CompletionEvent::Completed(CompletionSummary::new(
                None,
                StopCause::EndTurn,
            ))),
        ]));
        let fixture = fixture(gateway, 50).await;
        let orchestrator = fixture
            .orchestrator
            .clone()
            .with_billing_policy(BillingPolicy {
                fallback_usage_units: 5,
            });

        let stream = orchestrator
            .send_turn(turn_request(&fixture, "hello"))
            .await
            .expect("turn should start");
        let receipt = receipt_of(&collect(stream).await);

        assert_eq!(receipt.usage_units, 5);
        assert_eq!(receipt.credits_charged, 5);
        assert_eq!(receipt.balance_remaining, 45);
    }

    #[tokio::test]
    async fn settlement_clamps_at_zero_and_the_next_turn_is_rejected() {
        let gateway = Arc::new(FakeGateway::scripted(vec![
            Ok(CompletionEvent::Fragment("reply".into())),
            Ok(CompletionEvent::Completed(CompletionSummary::with_units(30))),
        ]));
        let fixture = fixture(gateway.clone(), 50).await;

        let first = fixture
            .orchestrator
            .send_turn(turn_request(&fixture, "first"))
            .await
            .expect("first turn");
        let receipt = receipt_of(&collect(first).await);
        assert_eq!(receipt.credits_charged, 30);
        assert_eq!(receipt.balance_remaining, 20);

        // The advisory check passes on 20 credits; the 25-unit charge then
        // clamps at zero instead of failing the delivered completion.
        *gateway.events.lock().expect("events lock") = vec![
            Ok(CompletionEvent::Fragment("reply".into())),
            Ok(CompletionEvent::Completed(CompletionSummary::with_units(25))),
        ];
        let second = fixture
            .orchestrator
            .send_turn(turn_request(&fixture, "second"))
            .await
            .expect("second turn");
        let receipt = receipt_of(&collect(second).await);
        assert_eq!(receipt.usage_units, 25);
        assert_eq!(receipt.credits_charged, 20);
        assert_eq!(receipt.balance_remaining, 0);

        let error = fixture
            .orchestrator
            .send_turn(turn_request(&fixture, "third"))
            .await
            .expect_err("third turn should fail");
        assert_eq!(error.kind, SessionErrorKind::InsufficientBalance);

        let turns = fixture
            .store
            .list_turns(&fixture.conversation_id)
            .await
            .expect("turns");
        assert_eq!(turns.len(), 4);
    }

    #[tokio::test]
    async fn dropping_the_stream_still_persists_and_settles_the_turn() {
        let gateway = Arc::new(FakeGateway::scripted(vec![
            Ok(CompletionEvent::Fragment("slow".into())),
            Ok(CompletionEvent::Fragment(" reply".into())),
            Ok(CompletionEvent::Completed(CompletionSummary::with_units(10))),
        ]));
        let fixture = fixture(gateway, 50).await;

        let stream = fixture
            .orchestrator
            .send_turn(turn_request(&fixture, "hello"))
            .await
            .expect("turn should start");
        drop(stream);

        // The spawned turn keeps running; poll until settlement lands.
        let mut settled = false;
        for _ in 0..100 {
            if fixture.ledger.balance(&fixture.user).await.expect("balance") == 40 {
                settled = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert!(settled, "turn should settle after the caller disconnects");

        let turns = fixture
            .store
            .list_turns(&fixture.conversation_id)
            .await
            .expect("turns");
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[1].text, "slow reply");
    }

    #[tokio::test]
    async fn begin_conversation_streams_the_first_reply() {
        let gateway = Arc::new(FakeGateway::scripted(vec![
            Ok(CompletionEvent::Fragment("welcome".into())),
            Ok(CompletionEvent::Completed(CompletionSummary::with_units(2))),
        ]));
        let fixture = fixture(gateway, 50).await;

        let request = ConversationRequest::new(
            fixture.user.clone(),
            "intake",
            "I need help with a sublease",
            GenerationOptions::new("quill-large"),
        )
        .with_metadata("jurisdiction", "ny");

        let (conversation, stream) = fixture
            .orchestrator
            .begin_conversation(request)
            .await
            .expect("conversation should start");
        assert_eq!(conversation.title, "intake");
        assert_eq!(
            conversation.metadata.get("jurisdiction"),
            Some(&"ny".to_string())
        );

        let receipt = receipt_of(&collect(stream).await);
        assert_eq!(receipt.conversation_id, conversation.id);
        assert_eq!(receipt.credits_charged, 2);

        let turns = fixture
            .store
            .list_turns(&conversation.id)
            .await
            .expect("turns");
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].text, "I need help with a sublease");
        assert_eq!(turns[1].text, "welcome");
    }

    #[tokio::test]
    async fn start_conversation_requires_a_credit_account() {
        let gateway = Arc::new(FakeGateway::scripted(Vec::new()));
        let store = Arc::new(InMemoryConversationStore::new());
        let ledger = Arc::new(InMemoryCreditLedger::new());
        let orchestrator = SessionOrchestrator::new(gateway, store, ledger);

        let error = orchestrator
            .start_conversation(NewConversation::new(UserId::from("ghost"), "untitled"))
            .await
            .expect_err("conversation should not open");
        assert_eq!(error.kind, SessionErrorKind::NotFound);
    }
}
