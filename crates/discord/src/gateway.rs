use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::embeds::{self, MessageTemplate};
use crate::events::{
    DispatchError, EventContext, EventDispatcher, GatewayEnvelope, GatewayEvent, HandlerResult,
};

pub const UNEXPECTED_ERROR_REPLY: &str = "Ha ocurrido un error inesperado.";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("transport failed to connect: {0}")]
    Connect(String),
    #[error("transport read failed: {0}")]
    Receive(String),
    #[error("transport ack failed: {0}")]
    Acknowledge(String),
    #[error("transport reply failed: {0}")]
    Respond(String),
    #[error("transport disconnect failed: {0}")]
    Disconnect(String),
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self { max_retries: 5, base_delay_ms: 250, max_delay_ms: 5_000 }
    }
}

impl ReconnectPolicy {
    fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.min(16);
        let multiplier = 1_u64 << exponent;
        let delay_ms = self.base_delay_ms.saturating_mul(multiplier).min(self.max_delay_ms);
        Duration::from_millis(delay_ms)
    }
}

#[async_trait]
pub trait GatewayTransport: Send + Sync {
    async fn connect(&self) -> Result<(), TransportError>;
    async fn next_envelope(&self) -> Result<Option<GatewayEnvelope>, TransportError>;
    async fn acknowledge(&self, event_id: &str) -> Result<(), TransportError>;
    async fn respond(&self, event_id: &str, message: &MessageTemplate)
        -> Result<(), TransportError>;
    async fn disconnect(&self) -> Result<(), TransportError>;
}

#[derive(Default)]
pub struct NoopGatewayTransport;

#[async_trait]
impl GatewayTransport for NoopGatewayTransport {
    async fn connect(&self) -> Result<(), TransportError> {
        Ok(())
    }

    async fn next_envelope(&self) -> Result<Option<GatewayEnvelope>, TransportError> {
        Ok(None)
    }

    async fn acknowledge(&self, _event_id: &str) -> Result<(), TransportError> {
        Ok(())
    }

    async fn respond(
        &self,
        _event_id: &str,
        _message: &MessageTemplate,
    ) -> Result<(), TransportError> {
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GatewayOutcome {
    /// The transport closed its event stream.
    Closed,
    RetriesExhausted,
}

pub struct GatewayRunner {
    transport: Arc<dyn GatewayTransport>,
    dispatcher: EventDispatcher,
    reconnect_policy: ReconnectPolicy,
}

impl GatewayRunner {
    pub fn new(
        transport: Arc<dyn GatewayTransport>,
        dispatcher: EventDispatcher,
        reconnect_policy: ReconnectPolicy,
    ) -> Self {
        Self { transport, dispatcher, reconnect_policy }
    }

    /// Never fails: exhausting the reconnect budget is reported as an outcome
    /// so the process keeps serving health checks.
    pub async fn start(&self) -> GatewayOutcome {
        for attempt in 0..=self.reconnect_policy.max_retries {
            match self.connect_and_pump(attempt).await {
                Ok(()) => return GatewayOutcome::Closed,
                Err(transport_error) => {
                    warn!(
                        event_name = "gateway.transport.failed",
                        attempt,
                        max_retries = self.reconnect_policy.max_retries,
                        error = %transport_error,
                        "gateway transport failed"
                    );

                    if attempt >= self.reconnect_policy.max_retries {
                        warn!(
                            event_name = "gateway.transport.retries_exhausted",
                            max_retries = self.reconnect_policy.max_retries,
                            "gateway retries exhausted; continuing process without crash"
                        );
                        return GatewayOutcome::RetriesExhausted;
                    }

                    let delay = self.reconnect_policy.backoff(attempt);
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        GatewayOutcome::RetriesExhausted
    }

    async fn connect_and_pump(&self, attempt: u32) -> Result<(), TransportError> {
        info!(attempt, "opening gateway transport connection");
        self.transport.connect().await?;
        info!(attempt, "gateway transport connected");

        loop {
            let Some(envelope) = self.transport.next_envelope().await? else {
                info!(attempt, "gateway transport stream closed");
                self.transport.disconnect().await?;
                return Ok(());
            };
            let command = command_name(&envelope);

            info!(
                event_name = "ingress.discord.event_received",
                event_id = %envelope.event_id,
                event_type = ?envelope.event.event_type(),
                correlation_id = %envelope.event_id,
                command = command.unwrap_or("none"),
                "received gateway event"
            );

            if let Err(error) = self.transport.acknowledge(&envelope.event_id).await {
                warn!(
                    event_name = "ingress.discord.ack_sent",
                    event_id = %envelope.event_id,
                    correlation_id = %envelope.event_id,
                    error = %error,
                    "failed to acknowledge gateway event"
                );
            } else {
                debug!(
                    event_name = "ingress.discord.ack_sent",
                    event_id = %envelope.event_id,
                    correlation_id = %envelope.event_id,
                    "acknowledged gateway event"
                );
            }

            if let Err(error) = self.handle_envelope(&envelope).await {
                warn!(
                    event_name = "ingress.discord.handling_failed",
                    event_id = %envelope.event_id,
                    correlation_id = %envelope.event_id,
                    command = command.unwrap_or("none"),
                    error = %error,
                    "event handling failed; continuing gateway loop"
                );
            }
        }
    }

    async fn handle_envelope(&self, envelope: &GatewayEnvelope) -> Result<(), GatewayError> {
        let context = EventContext { correlation_id: envelope.event_id.clone() };
        match self.dispatcher.dispatch(envelope, &context).await {
            Ok(HandlerResult::Responded(message)) => {
                self.transport.respond(&envelope.event_id, &message).await?;
                Ok(())
            }
            Ok(HandlerResult::Processed | HandlerResult::Ignored) => Ok(()),
            Err(error) => {
                // The user still gets an answer before the failure is reported.
                if matches!(envelope.event, GatewayEvent::SlashCommand(_)) {
                    self.transport
                        .respond(&envelope.event_id, &embeds::error_message(UNEXPECTED_ERROR_REPLY))
                        .await?;
                }
                Err(error.into())
            }
        }
    }
}

fn command_name(envelope: &GatewayEnvelope) -> Option<&str> {
    match &envelope.event {
        GatewayEvent::SlashCommand(payload) => Some(payload.command.as_str()),
        GatewayEvent::Ready(_) | GatewayEvent::Unsupported { .. } => None,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, VecDeque};
    use std::sync::Arc;

    use async_trait::async_trait;
    use platano_store::{InMemoryStore, MeetupRegistry};
    use tokio::sync::Mutex;

    use super::{
        GatewayOutcome, GatewayRunner, GatewayTransport, ReconnectPolicy, TransportError,
        UNEXPECTED_ERROR_REPLY,
    };
    use crate::commands::{RegistryCommandService, SlashCommandPayload};
    use crate::embeds::{MessageTemplate, NO_MEETUPS_TEXT};
    use crate::events::{bot_dispatcher, EventDispatcher, GatewayEnvelope, GatewayEvent};
    use crate::gif::NoopGifProvider;

    #[derive(Default)]
    struct ScriptedTransport {
        state: Mutex<ScriptedState>,
    }

    #[derive(Default)]
    struct ScriptedState {
        connect_results: VecDeque<Result<(), TransportError>>,
        envelopes: VecDeque<Result<Option<GatewayEnvelope>, TransportError>>,
        connect_attempts: usize,
        acknowledgements: Vec<String>,
        responses: Vec<(String, MessageTemplate)>,
        disconnect_calls: usize,
    }

    impl ScriptedTransport {
        fn with_script(
            connect_results: Vec<Result<(), TransportError>>,
            envelopes: Vec<Result<Option<GatewayEnvelope>, TransportError>>,
        ) -> Self {
            Self {
                state: Mutex::new(ScriptedState {
                    connect_results: connect_results.into(),
                    envelopes: envelopes.into(),
                    ..ScriptedState::default()
                }),
            }
        }

        async fn connect_attempts(&self) -> usize {
            self.state.lock().await.connect_attempts
        }

        async fn acknowledgements(&self) -> Vec<String> {
            self.state.lock().await.acknowledgements.clone()
        }

        async fn responses(&self) -> Vec<(String, MessageTemplate)> {
            self.state.lock().await.responses.clone()
        }

        async fn disconnect_calls(&self) -> usize {
            self.state.lock().await.disconnect_calls
        }
    }

    #[async_trait]
    impl GatewayTransport for ScriptedTransport {
        async fn connect(&self) -> Result<(), TransportError> {
            let mut state = self.state.lock().await;
            state.connect_attempts += 1;
            state.connect_results.pop_front().unwrap_or(Ok(()))
        }

        async fn next_envelope(&self) -> Result<Option<GatewayEnvelope>, TransportError> {
            let mut state = self.state.lock().await;
            state.envelopes.pop_front().unwrap_or(Ok(None))
        }

        async fn acknowledge(&self, event_id: &str) -> Result<(), TransportError> {
            let mut state = self.state.lock().await;
            state.acknowledgements.push(event_id.to_owned());
            Ok(())
        }

        async fn respond(
            &self,
            event_id: &str,
            message: &MessageTemplate,
        ) -> Result<(), TransportError> {
            let mut state = self.state.lock().await;
            state.responses.push((event_id.to_owned(), message.clone()));
            Ok(())
        }

        async fn disconnect(&self) -> Result<(), TransportError> {
            let mut state = self.state.lock().await;
            state.disconnect_calls += 1;
            Ok(())
        }
    }

    fn slash(event_id: &str, command: &str) -> GatewayEnvelope {
        GatewayEnvelope {
            event_id: event_id.to_owned(),
            event: GatewayEvent::SlashCommand(SlashCommandPayload {
                command: command.to_owned(),
                options: BTreeMap::new(),
                user_id: "100".to_owned(),
                user_mention: "<@100>".to_owned(),
                can_manage_messages: false,
                request_id: event_id.to_owned(),
            }),
        }
    }

    fn no_delay(max_retries: u32) -> ReconnectPolicy {
        ReconnectPolicy { max_retries, base_delay_ms: 0, max_delay_ms: 0 }
    }

    #[tokio::test]
    async fn reconnects_after_initial_connect_failure() {
        let transport = Arc::new(ScriptedTransport::with_script(
            vec![Err(TransportError::Connect("network down".to_owned())), Ok(())],
            vec![
                Ok(Some(GatewayEnvelope {
                    event_id: "evt-1".to_owned(),
                    event: GatewayEvent::Unsupported { event_type: "TYPING_START".to_owned() },
                })),
                Ok(None),
            ],
        ));

        let runner = GatewayRunner::new(transport.clone(), EventDispatcher::default(), no_delay(2));

        assert_eq!(runner.start().await, GatewayOutcome::Closed);
        assert_eq!(transport.connect_attempts().await, 2);
        assert_eq!(transport.acknowledgements().await, vec!["evt-1"]);
        assert_eq!(transport.disconnect_calls().await, 1);
    }

    #[tokio::test]
    async fn exhausts_retries_without_crashing() {
        let transport = Arc::new(ScriptedTransport::with_script(
            vec![
                Err(TransportError::Connect("fail-1".to_owned())),
                Err(TransportError::Connect("fail-2".to_owned())),
                Err(TransportError::Connect("fail-3".to_owned())),
            ],
            vec![],
        ));

        let runner = GatewayRunner::new(transport.clone(), EventDispatcher::default(), no_delay(2));

        assert_eq!(runner.start().await, GatewayOutcome::RetriesExhausted);
        assert_eq!(transport.connect_attempts().await, 3);
    }

    #[tokio::test]
    async fn read_failure_mid_stream_reconnects() {
        let transport = Arc::new(ScriptedTransport::with_script(
            vec![Ok(()), Ok(())],
            vec![Err(TransportError::Receive("socket reset".to_owned())), Ok(None)],
        ));

        let runner = GatewayRunner::new(transport.clone(), EventDispatcher::default(), no_delay(3));

        assert_eq!(runner.start().await, GatewayOutcome::Closed);
        assert_eq!(transport.connect_attempts().await, 2);
    }

    #[tokio::test]
    async fn slash_command_responses_are_sent_back() {
        let registry = Arc::new(MeetupRegistry::new(InMemoryStore::default()));
        let dispatcher = bot_dispatcher(
            RegistryCommandService::new(registry, Arc::new(NoopGifProvider)),
            "Platanotorrino",
        );
        let transport = Arc::new(ScriptedTransport::with_script(
            vec![Ok(())],
            vec![Ok(Some(slash("evt-7", "/quedadas"))), Ok(None)],
        ));

        let runner = GatewayRunner::new(transport.clone(), dispatcher, no_delay(0));
        runner.start().await;

        let responses = transport.responses().await;
        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0].0, "evt-7");
        assert_eq!(responses[0].1.content.as_deref(), Some(NO_MEETUPS_TEXT));
    }

    #[tokio::test]
    async fn corrupt_store_gets_an_ephemeral_reply_and_loop_continues() {
        let registry =
            Arc::new(MeetupRegistry::new(InMemoryStore::with_contents("{\"meetups\": 3}")));
        let dispatcher = bot_dispatcher(
            RegistryCommandService::new(registry, Arc::new(NoopGifProvider)),
            "Platanotorrino",
        );
        let transport = Arc::new(ScriptedTransport::with_script(
            vec![Ok(())],
            vec![
                Ok(Some(slash("evt-1", "/quedadas"))),
                Ok(Some(slash("evt-2", "/help"))),
                Ok(None),
            ],
        ));

        let runner = GatewayRunner::new(transport.clone(), dispatcher, no_delay(0));
        runner.start().await;

        let responses = transport.responses().await;
        assert_eq!(responses.len(), 2);
        assert!(responses[0].1.ephemeral);
        assert_eq!(responses[0].1.content.as_deref(), Some(UNEXPECTED_ERROR_REPLY));
        assert_eq!(responses[1].1.embeds[0].title, "Comandos Disponibles");
    }

    #[test]
    fn backoff_grows_exponentially_and_is_capped() {
        let policy = ReconnectPolicy::default();
        assert_eq!(policy.backoff(0).as_millis(), 250);
        assert_eq!(policy.backoff(2).as_millis(), 1_000);
        assert_eq!(policy.backoff(10).as_millis(), 5_000);
    }
}
