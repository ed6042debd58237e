use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

use crate::{
    commands::{
        parse_bot_command, BotCommandService, CommandRouteError, CommandRouter,
        SlashCommandPayload,
    },
    embeds::{self, MessageTemplate},
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GatewayEnvelope {
    pub event_id: String,
    pub event: GatewayEvent,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GatewayEvent {
    Ready(ReadyEvent),
    SlashCommand(SlashCommandPayload),
    Unsupported { event_type: String },
}

impl GatewayEvent {
    pub fn event_type(&self) -> GatewayEventType {
        match self {
            Self::Ready(_) => GatewayEventType::Ready,
            Self::SlashCommand(_) => GatewayEventType::SlashCommand,
            Self::Unsupported { .. } => GatewayEventType::Unsupported,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum GatewayEventType {
    Ready,
    SlashCommand,
    Unsupported,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReadyEvent {
    pub bot_name: String,
    pub bot_id: String,
    pub registered_commands: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventContext {
    pub correlation_id: String,
}

impl Default for EventContext {
    fn default() -> Self {
        Self { correlation_id: "unknown-correlation-id".to_owned() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HandlerResult {
    Responded(MessageTemplate),
    Processed,
    Ignored,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EventHandlerError {
    #[error(transparent)]
    Route(#[from] CommandRouteError),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error(transparent)]
    Handler(#[from] EventHandlerError),
}

#[async_trait]
pub trait EventHandler: Send + Sync {
    fn event_type(&self) -> GatewayEventType;
    async fn handle(
        &self,
        envelope: &GatewayEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError>;
}

#[derive(Default)]
pub struct EventDispatcher {
    handlers: HashMap<GatewayEventType, Arc<dyn EventHandler>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<H>(&mut self, handler: H)
    where
        H: EventHandler + 'static,
    {
        self.handlers.insert(handler.event_type(), Arc::new(handler));
    }

    pub async fn dispatch(
        &self,
        envelope: &GatewayEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, DispatchError> {
        let Some(handler) = self.handlers.get(&envelope.event.event_type()) else {
            return Ok(HandlerResult::Ignored);
        };

        handler.handle(envelope, ctx).await.map_err(DispatchError::from)
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }
}

/// Dispatcher with the ready and slash-command handlers registered.
pub fn bot_dispatcher<S>(service: S, bot_name: impl Into<String>) -> EventDispatcher
where
    S: BotCommandService + 'static,
{
    let mut dispatcher = EventDispatcher::new();
    dispatcher.register(ReadyHandler);
    dispatcher.register(SlashCommandHandler::new(service, bot_name));
    dispatcher
}

pub struct SlashCommandHandler<S> {
    router: CommandRouter<S>,
}

impl<S> SlashCommandHandler<S>
where
    S: BotCommandService,
{
    pub fn new(service: S, bot_name: impl Into<String>) -> Self {
        Self { router: CommandRouter::new(service, bot_name) }
    }
}

#[async_trait]
impl<S> EventHandler for SlashCommandHandler<S>
where
    S: BotCommandService + 'static,
{
    fn event_type(&self) -> GatewayEventType {
        GatewayEventType::SlashCommand
    }

    async fn handle(
        &self,
        envelope: &GatewayEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let GatewayEvent::SlashCommand(payload) = &envelope.event else {
            return Ok(HandlerResult::Ignored);
        };

        let command = match parse_bot_command(payload) {
            Ok(command) => command,
            Err(error) => {
                info!(
                    event_name = "bot.command.unparsed",
                    command = %payload.command,
                    correlation_id = %ctx.correlation_id,
                    error = %error,
                    "slash command options rejected"
                );
                return Ok(HandlerResult::Responded(embeds::error_message(&error.user_message())));
            }
        };

        let message = self.router.route(command, payload).await?;
        Ok(HandlerResult::Responded(message))
    }
}

pub struct ReadyHandler;

#[async_trait]
impl EventHandler for ReadyHandler {
    fn event_type(&self) -> GatewayEventType {
        GatewayEventType::Ready
    }

    async fn handle(
        &self,
        envelope: &GatewayEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let GatewayEvent::Ready(ready) = &envelope.event else {
            return Ok(HandlerResult::Ignored);
        };

        info!(
            event_name = "gateway.session.ready",
            bot_name = %ready.bot_name,
            bot_id = %ready.bot_id,
            registered_commands = ready.registered_commands,
            correlation_id = %ctx.correlation_id,
            "logged in to gateway"
        );
        Ok(HandlerResult::Processed)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Arc;

    use platano_core::{MeetupDraft, MeetupId};
    use platano_store::{InMemoryStore, MeetupRegistry};

    use super::{
        bot_dispatcher, EventContext, EventDispatcher, GatewayEnvelope, GatewayEvent,
        HandlerResult, ReadyEvent,
    };
    use crate::commands::{
        BotCommandService, CommandRouteError, RegistryCommandService, SlashCommandPayload,
    };
    use crate::embeds::MessageTemplate;
    use crate::gif::{InteractionKind, NoopGifProvider};

    fn registry_dispatcher() -> EventDispatcher {
        let registry = Arc::new(MeetupRegistry::new(InMemoryStore::default()));
        bot_dispatcher(
            RegistryCommandService::new(registry, Arc::new(NoopGifProvider)),
            "Platanotorrino",
        )
    }

    fn slash(command: &str, options: &[(&str, &str)]) -> GatewayEnvelope {
        GatewayEnvelope {
            event_id: "evt-1".to_owned(),
            event: GatewayEvent::SlashCommand(SlashCommandPayload {
                command: command.to_owned(),
                options: options
                    .iter()
                    .map(|(name, value)| ((*name).to_owned(), (*value).to_owned()))
                    .collect::<BTreeMap<_, _>>(),
                user_id: "100".to_owned(),
                user_mention: "<@100>".to_owned(),
                can_manage_messages: false,
                request_id: "req-1".to_owned(),
            }),
        }
    }

    #[tokio::test]
    async fn dispatcher_routes_slash_commands() {
        let dispatcher = registry_dispatcher();

        let result = dispatcher
            .dispatch(&slash("/quedadas", &[]), &EventContext::default())
            .await
            .expect("dispatch");

        assert!(matches!(result, HandlerResult::Responded(_)));
    }

    #[tokio::test]
    async fn missing_options_are_answered_ephemerally() {
        let dispatcher = registry_dispatcher();

        let result = dispatcher
            .dispatch(&slash("/hug", &[]), &EventContext::default())
            .await
            .expect("dispatch");

        let message = match result {
            HandlerResult::Responded(message) => message,
            other => panic!("expected a response, got {other:?}"),
        };
        assert!(message.ephemeral);
        assert!(message.content.as_deref().is_some_and(|text| text.contains("usuario")));
    }

    #[tokio::test]
    async fn ready_event_is_processed_without_reply() {
        let dispatcher = registry_dispatcher();
        let envelope = GatewayEnvelope {
            event_id: "evt-ready".to_owned(),
            event: GatewayEvent::Ready(ReadyEvent {
                bot_name: "Platanotorrino".to_owned(),
                bot_id: "1".to_owned(),
                registered_commands: 12,
            }),
        };

        let result = dispatcher.dispatch(&envelope, &EventContext::default()).await.expect("dispatch");

        assert_eq!(result, HandlerResult::Processed);
    }

    #[tokio::test]
    async fn dispatcher_returns_ignored_when_no_handler_registered() {
        let dispatcher = EventDispatcher::new();

        let result = dispatcher
            .dispatch(&slash("/quedadas", &[]), &EventContext::default())
            .await
            .expect("dispatch");

        assert_eq!(result, HandlerResult::Ignored);
    }

    #[tokio::test]
    async fn unsupported_events_are_ignored() {
        let dispatcher = registry_dispatcher();
        let envelope = GatewayEnvelope {
            event_id: "evt-2".to_owned(),
            event: GatewayEvent::Unsupported { event_type: "MESSAGE_REACTION_ADD".to_owned() },
        };

        let result = dispatcher.dispatch(&envelope, &EventContext::default()).await.expect("dispatch");

        assert_eq!(result, HandlerResult::Ignored);
        assert_eq!(dispatcher.handler_count(), 2);
    }

    #[tokio::test]
    async fn service_failures_surface_as_dispatch_errors() {
        struct FailingService;

        #[async_trait::async_trait]
        impl BotCommandService for FailingService {
            async fn list_meetups(
                &self,
                _payload: &SlashCommandPayload,
            ) -> Result<MessageTemplate, CommandRouteError> {
                Err(CommandRouteError::Service("registry offline".to_owned()))
            }

            async fn create_meetup(
                &self,
                _draft: MeetupDraft,
                _payload: &SlashCommandPayload,
            ) -> Result<MessageTemplate, CommandRouteError> {
                Err(CommandRouteError::Service("registry offline".to_owned()))
            }

            async fn delete_meetup(
                &self,
                _id: MeetupId,
                _payload: &SlashCommandPayload,
            ) -> Result<MessageTemplate, CommandRouteError> {
                Err(CommandRouteError::Service("registry offline".to_owned()))
            }

            async fn interaction(
                &self,
                _kind: InteractionKind,
                _target: &str,
                _payload: &SlashCommandPayload,
            ) -> Result<MessageTemplate, CommandRouteError> {
                Err(CommandRouteError::Service("registry offline".to_owned()))
            }
        }

        let dispatcher = bot_dispatcher(FailingService, "Platanotorrino");
        let error = dispatcher
            .dispatch(&slash("/quedadas", &[]), &EventContext::default())
            .await
            .expect_err("service failure");

        assert!(error.to_string().contains("registry offline"));
    }
}
