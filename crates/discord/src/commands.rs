use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use platano_core::{ApplicationError, DomainError, InterfaceError, MeetupDraft, MeetupId};
use platano_store::{MeetupRegistry, MeetupStore};
use thiserror::Error;
use tracing::{info, warn};

use crate::embeds::{self, HelpCategory, MessageTemplate};
use crate::gif::{resolve_gif, GifProvider, InteractionKind};

pub const DATE_FORMAT_HINT: &str = "El formato de fecha debe ser YYYY-MM-DD (por ejemplo, 2023-12-31)";
pub const TIME_FORMAT_HINT: &str = "El formato de hora debe ser HH:MM (por ejemplo, 18:30)";
pub const INVALID_DATE_TIME: &str = "La fecha y hora proporcionadas no son válidas";
pub const CREATE_FAILED: &str = "Ha ocurrido un error al crear la quedada";
pub const DELETE_FAILED: &str = "Ha ocurrido un error al eliminar la quedada";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlashCommandPayload {
    pub command: String,
    pub options: BTreeMap<String, String>,
    pub user_id: String,
    pub user_mention: String,
    pub can_manage_messages: bool,
    pub request_id: String,
}

impl SlashCommandPayload {
    fn option(&self, name: &str) -> Option<&str> {
        self.options.get(name).map(String::as_str)
    }

    fn required(&self, name: &'static str) -> Result<String, CommandParseError> {
        self.option(name).map(str::to_owned).ok_or_else(|| CommandParseError::MissingOption {
            command: self.command.clone(),
            option: name,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CreateMeetupArgs {
    pub title: String,
    pub description: String,
    pub date: String,
    pub time: String,
    pub location: String,
    pub status: String,
}

impl CreateMeetupArgs {
    /// Shape check of the raw `fecha`/`hora` options; calendar validity is
    /// left to the registry.
    pub fn format_error(&self) -> Option<&'static str> {
        if !matches_shape(&self.date, "dddd-dd-dd") {
            return Some(DATE_FORMAT_HINT);
        }
        if !matches_shape(&self.time, "dd:dd") {
            return Some(TIME_FORMAT_HINT);
        }
        None
    }

    pub fn into_draft(self) -> MeetupDraft {
        MeetupDraft {
            title: self.title,
            description: self.description,
            date: format!("{}T{}", self.date, self.time),
            location: self.location,
            status: self.status,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BotCommand {
    ListMeetups,
    CreateMeetup(CreateMeetupArgs),
    DeleteMeetup { id: MeetupId },
    Interaction { kind: InteractionKind, target: String },
    Help { category: HelpCategory },
    BotInfo,
    Unknown { name: String },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandParseError {
    #[error("command `{command}` is missing required option `{option}`")]
    MissingOption { command: String, option: &'static str },
    #[error("option `{option}` has invalid value `{value}`")]
    InvalidOption { option: &'static str, value: String },
}

impl CommandParseError {
    pub fn user_message(&self) -> String {
        match self {
            Self::MissingOption { option, .. } => {
                format!("Falta el parámetro obligatorio `{option}`.")
            }
            Self::InvalidOption { option, value } => {
                format!("El valor `{value}` no es válido para `{option}`.")
            }
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandRouteError {
    #[error("command service failed: {0}")]
    Service(String),
}

pub fn parse_bot_command(payload: &SlashCommandPayload) -> Result<BotCommand, CommandParseError> {
    let name = payload.command.trim().trim_start_matches('/').to_ascii_lowercase();

    let command = match name.as_str() {
        "quedadas" => BotCommand::ListMeetups,
        "crear-quedada" => BotCommand::CreateMeetup(CreateMeetupArgs {
            title: payload.required("titulo")?,
            description: payload.required("descripcion")?,
            date: payload.required("fecha")?,
            time: payload.required("hora")?,
            location: payload.required("lugar")?,
            status: payload.required("estado")?,
        }),
        "eliminar-quedada" => {
            let raw = payload.required("id_quedada")?;
            let id = raw
                .trim()
                .parse::<MeetupId>()
                .map_err(|_| CommandParseError::InvalidOption { option: "id_quedada", value: raw })?;
            BotCommand::DeleteMeetup { id }
        }
        "help" => BotCommand::Help { category: HelpCategory::parse(payload.option("categoria")) },
        "botinfo" => BotCommand::BotInfo,
        other => match InteractionKind::from_command(other) {
            Some(kind) => {
                BotCommand::Interaction { kind, target: mention(&payload.required("usuario")?) }
            }
            None => BotCommand::Unknown { name: other.to_owned() },
        },
    };
    Ok(command)
}

pub struct CommandRouter<S> {
    service: S,
    bot_name: String,
}

impl<S> CommandRouter<S>
where
    S: BotCommandService,
{
    pub fn new(service: S, bot_name: impl Into<String>) -> Self {
        Self { service, bot_name: bot_name.into() }
    }

    pub async fn route(
        &self,
        command: BotCommand,
        payload: &SlashCommandPayload,
    ) -> Result<MessageTemplate, CommandRouteError> {
        match command {
            BotCommand::ListMeetups => self.service.list_meetups(payload).await,
            BotCommand::CreateMeetup(args) => {
                if let Some(hint) = args.format_error() {
                    return Ok(embeds::error_message(hint));
                }
                self.service.create_meetup(args.into_draft(), payload).await
            }
            BotCommand::DeleteMeetup { id } => self.service.delete_meetup(id, payload).await,
            BotCommand::Interaction { kind, target } => {
                self.service.interaction(kind, &target, payload).await
            }
            BotCommand::Help { category } => Ok(embeds::help_message(category, Utc::now())),
            BotCommand::BotInfo => Ok(embeds::botinfo_message(&self.bot_name, Utc::now())),
            BotCommand::Unknown { name } => Ok(embeds::error_message(&format!(
                "Comando desconocido `/{name}`. Usa /help para ver los comandos disponibles."
            ))),
        }
    }
}

#[async_trait]
pub trait BotCommandService: Send + Sync {
    async fn list_meetups(
        &self,
        payload: &SlashCommandPayload,
    ) -> Result<MessageTemplate, CommandRouteError>;

    async fn create_meetup(
        &self,
        draft: MeetupDraft,
        payload: &SlashCommandPayload,
    ) -> Result<MessageTemplate, CommandRouteError>;

    async fn delete_meetup(
        &self,
        id: MeetupId,
        payload: &SlashCommandPayload,
    ) -> Result<MessageTemplate, CommandRouteError>;

    async fn interaction(
        &self,
        kind: InteractionKind,
        target: &str,
        payload: &SlashCommandPayload,
    ) -> Result<MessageTemplate, CommandRouteError>;
}

/// Command service backed by the meetup registry and a GIF provider.
pub struct RegistryCommandService<S> {
    registry: Arc<MeetupRegistry<S>>,
    gifs: Arc<dyn GifProvider>,
}

impl<S> RegistryCommandService<S>
where
    S: MeetupStore,
{
    pub fn new(registry: Arc<MeetupRegistry<S>>, gifs: Arc<dyn GifProvider>) -> Self {
        Self { registry, gifs }
    }
}

#[async_trait]
impl<S> BotCommandService for RegistryCommandService<S>
where
    S: MeetupStore + 'static,
{
    async fn list_meetups(
        &self,
        payload: &SlashCommandPayload,
    ) -> Result<MessageTemplate, CommandRouteError> {
        match self.registry.list().await {
            Ok(meetups) => Ok(embeds::meetup_list_message(&meetups, Utc::now())),
            Err(error) => failure_message("quedadas", error, payload, None),
        }
    }

    async fn create_meetup(
        &self,
        draft: MeetupDraft,
        payload: &SlashCommandPayload,
    ) -> Result<MessageTemplate, CommandRouteError> {
        match self.registry.create(draft).await {
            Ok(meetup) => Ok(embeds::meetup_created_message(&meetup, Utc::now())),
            Err(ApplicationError::Domain(DomainError::Validation { field: "date", .. })) => {
                Ok(embeds::error_message(INVALID_DATE_TIME))
            }
            Err(error) => failure_message("crear-quedada", error, payload, Some(CREATE_FAILED)),
        }
    }

    async fn delete_meetup(
        &self,
        id: MeetupId,
        payload: &SlashCommandPayload,
    ) -> Result<MessageTemplate, CommandRouteError> {
        match self.registry.delete(id, payload.can_manage_messages).await {
            Ok(removed) => Ok(embeds::meetup_deleted_message(&removed, Utc::now())),
            Err(error) => {
                failure_message("eliminar-quedada", error, payload, Some(DELETE_FAILED))
            }
        }
    }

    async fn interaction(
        &self,
        kind: InteractionKind,
        target: &str,
        payload: &SlashCommandPayload,
    ) -> Result<MessageTemplate, CommandRouteError> {
        let gif_url = resolve_gif(self.gifs.as_ref(), kind).await;
        Ok(embeds::interaction_message(kind, &payload.user_mention, target, &gif_url, Utc::now()))
    }
}

/// Ephemeral reply for a failed registry operation. `storage_message`
/// replaces the generic text when the save itself failed. Internal faults
/// (corrupt store, broken invariants) are returned as errors so the gateway
/// answers with its generic reply and reports them.
fn failure_message(
    command: &'static str,
    error: ApplicationError,
    payload: &SlashCommandPayload,
    storage_message: Option<&'static str>,
) -> Result<MessageTemplate, CommandRouteError> {
    let storage_failure = matches!(error, ApplicationError::Storage(_));
    let interface = error.into_interface(payload.request_id.clone());

    if matches!(interface, InterfaceError::Internal { .. }) {
        return Err(CommandRouteError::Service(format!("/{command}: {interface}")));
    }

    if storage_failure {
        warn!(
            event_name = "bot.command.failed",
            command,
            correlation_id = %payload.request_id,
            error = ?interface,
            "meetup command failed"
        );
    } else {
        info!(
            event_name = "bot.command.rejected",
            command,
            correlation_id = %payload.request_id,
            error = ?interface,
            "meetup command rejected"
        );
    }

    match storage_message {
        Some(message) if storage_failure => Ok(embeds::error_message(message)),
        _ => Ok(embeds::error_message(&interface.user_message())),
    }
}

/// Raw user ids become mentions; anything else is used as given.
fn mention(raw: &str) -> String {
    let trimmed = raw.trim();
    if !trimmed.is_empty() && trimmed.bytes().all(|byte| byte.is_ascii_digit()) {
        format!("<@{trimmed}>")
    } else {
        trimmed.to_owned()
    }
}

/// `d` matches an ASCII digit, any other byte must match literally.
fn matches_shape(value: &str, shape: &str) -> bool {
    value.len() == shape.len()
        && value.bytes().zip(shape.bytes()).all(|(actual, expected)| match expected {
            b'd' => actual.is_ascii_digit(),
            literal => actual == literal,
        })
}
