use chrono::{DateTime, Datelike, Utc};
use platano_core::Meetup;
use serde::Serialize;

use crate::gif::InteractionKind;

pub const FOOTER_TEXT: &str = "Platanotorrino Discord Bot";
pub const BRAND_COLOR: u32 = 0xffdd9e;
pub const DELETED_COLOR: u32 = 0xff6961;
pub const HELP_COLOR: u32 = 0x3498db;
pub const JOIN_BUTTON_LABEL: &str = "Unirse a esta quedada";
pub const NO_MEETUPS_TEXT: &str = "No hay ninguna quedada pendiente actualmente.";

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Embed {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub color: u32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<EmbedField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ButtonStyle {
    Primary,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Button {
    pub custom_id: String,
    pub label: String,
    pub style: ButtonStyle,
}

impl Button {
    pub fn new(custom_id: impl Into<String>, label: impl Into<String>) -> Self {
        Self { custom_id: custom_id.into(), label: label.into(), style: ButtonStyle::Primary }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct MessageTemplate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub embeds: Vec<Embed>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub buttons: Vec<Button>,
    pub ephemeral: bool,
}

#[derive(Default)]
pub struct MessageBuilder {
    template: MessageTemplate,
}

impl MessageBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.template.content = Some(content.into());
        self
    }

    pub fn embed<F>(mut self, title: impl Into<String>, build: F) -> Self
    where
        F: FnOnce(&mut EmbedBuilder),
    {
        let mut builder = EmbedBuilder::new(title);
        build(&mut builder);
        self.template.embeds.push(builder.build());
        self
    }

    pub fn button(mut self, button: Button) -> Self {
        self.template.buttons.push(button);
        self
    }

    pub fn ephemeral(mut self) -> Self {
        self.template.ephemeral = true;
        self
    }

    pub fn build(self) -> MessageTemplate {
        self.template
    }
}

pub struct EmbedBuilder {
    embed: Embed,
}

impl EmbedBuilder {
    fn new(title: impl Into<String>) -> Self {
        Self {
            embed: Embed {
                title: title.into(),
                description: None,
                color: BRAND_COLOR,
                fields: Vec::new(),
                image_url: None,
                footer: None,
                timestamp: None,
            },
        }
    }

    pub fn description(&mut self, description: impl Into<String>) -> &mut Self {
        self.embed.description = Some(description.into());
        self
    }

    pub fn color(&mut self, color: u32) -> &mut Self {
        self.embed.color = color;
        self
    }

    pub fn field(
        &mut self,
        name: impl Into<String>,
        value: impl Into<String>,
        inline: bool,
    ) -> &mut Self {
        self.embed.fields.push(EmbedField { name: name.into(), value: value.into(), inline });
        self
    }

    pub fn image(&mut self, url: impl Into<String>) -> &mut Self {
        self.embed.image_url = Some(url.into());
        self
    }

    pub fn footer(&mut self, text: impl Into<String>) -> &mut Self {
        self.embed.footer = Some(text.into());
        self
    }

    pub fn timestamp(&mut self, now: DateTime<Utc>) -> &mut Self {
        self.embed.timestamp = Some(now);
        self
    }

    /// Standard footer plus timestamp carried by every bot embed.
    pub fn signed(&mut self, now: DateTime<Utc>) -> &mut Self {
        self.footer(FOOTER_TEXT).timestamp(now)
    }

    fn build(self) -> Embed {
        self.embed
    }
}

pub fn join_button(meetup: &Meetup) -> Button {
    Button::new(format!("join_meetup_{}", meetup.id), JOIN_BUTTON_LABEL)
}

const WEEKDAYS: [&str; 7] = ["lunes", "martes", "miércoles", "jueves", "viernes", "sábado", "domingo"];
const MONTHS: [&str; 12] = [
    "enero",
    "febrero",
    "marzo",
    "abril",
    "mayo",
    "junio",
    "julio",
    "agosto",
    "septiembre",
    "octubre",
    "noviembre",
    "diciembre",
];

/// `sábado, 01 de junio de 2024, 18:00`
pub fn format_meetup_date(date: &DateTime<Utc>) -> String {
    let weekday = WEEKDAYS[date.weekday().num_days_from_monday() as usize];
    let month = MONTHS[date.month0() as usize];
    format!(
        "{weekday}, {day:02} de {month} de {year}, {time}",
        day = date.day(),
        year = date.year(),
        time = date.format("%H:%M")
    )
}

pub fn meetup_list_message(meetups: &[Meetup], now: DateTime<Utc>) -> MessageTemplate {
    if meetups.is_empty() {
        return MessageBuilder::new().content(NO_MEETUPS_TEXT).build();
    }

    let mut builder = MessageBuilder::new().embed("Quedadas", |embed| {
        embed.description("Lista de quedadas activas y pendientes").signed(now);
        for meetup in meetups {
            let participants = if meetup.participants.is_empty() {
                "Ninguno".to_owned()
            } else {
                meetup.participants.join(", ")
            };
            embed.field(
                format!("{} {}", meetup.status.emoji(), meetup.title),
                format!(
                    "**Descripción:** {}\n**Fecha:** {}\n**Lugar:** {}\n**Estado:** {}\n**Participantes:** {}",
                    meetup.description,
                    format_meetup_date(&meetup.date),
                    meetup.location,
                    meetup.status,
                    participants
                ),
                false,
            );
        }
    });
    for meetup in meetups {
        builder = builder.button(join_button(meetup));
    }
    builder.build()
}

pub fn meetup_created_message(meetup: &Meetup, now: DateTime<Utc>) -> MessageTemplate {
    MessageBuilder::new()
        .embed("Nueva Quedada Creada", |embed| {
            embed
                .description(format!(
                    "La quedada \"{}\" ha sido creada correctamente.",
                    meetup.title
                ))
                .field("Descripción", meetup.description.clone(), false)
                .field("Fecha y Hora", format_meetup_date(&meetup.date), false)
                .field("Lugar", meetup.location.clone(), true)
                .field("Estado", meetup.status.as_str(), true)
                .field("ID", meetup.id.to_string(), true)
                .signed(now);
        })
        .button(join_button(meetup))
        .build()
}

pub fn meetup_deleted_message(meetup: &Meetup, now: DateTime<Utc>) -> MessageTemplate {
    MessageBuilder::new()
        .embed("Quedada Eliminada", |embed| {
            embed
                .description(format!(
                    "La quedada \"{}\" ha sido eliminada correctamente.",
                    meetup.title
                ))
                .color(DELETED_COLOR)
                .field("ID", meetup.id.to_string(), true)
                .field("Estado", meetup.status.as_str(), true)
                .signed(now);
        })
        .build()
}

pub fn error_message(text: &str) -> MessageTemplate {
    MessageBuilder::new().content(text).ephemeral().build()
}

pub fn interaction_message(
    kind: InteractionKind,
    author: &str,
    target: &str,
    gif_url: &str,
    now: DateTime<Utc>,
) -> MessageTemplate {
    MessageBuilder::new()
        .embed(kind.title(), |embed| {
            embed
                .description(kind.phrase(author, target))
                .color(kind.color())
                .image(gif_url)
                .signed(now);
        })
        .build()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HelpCategory {
    Admin,
    Meetups,
    Interaction,
    Utilities,
    All,
}

impl HelpCategory {
    const LISTED: [HelpCategory; 4] = [Self::Admin, Self::Meetups, Self::Interaction, Self::Utilities];

    /// Unknown or missing values show every category.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(|value| value.trim().to_ascii_lowercase()).as_deref() {
            Some("admin") => Self::Admin,
            Some("quedadas") => Self::Meetups,
            Some("interaccion") => Self::Interaction,
            Some("utilidades") => Self::Utilities,
            _ => Self::All,
        }
    }

    fn heading(self) -> &'static str {
        match self {
            Self::Admin => "🛠️ Administración",
            Self::Meetups => "📅 Quedadas",
            Self::Interaction => "👋 Interacción",
            Self::Utilities => "🔧 Utilidades",
            Self::All => "Todos",
        }
    }

    fn summary(self) -> &'static str {
        match self {
            Self::Admin => "Comandos para administrar el bot y el servidor",
            Self::Meetups => "Comandos para gestionar quedadas",
            Self::Interaction => "Comandos para interactuar con otros usuarios",
            Self::Utilities => "Comandos de utilidad general",
            Self::All => "Aquí tienes una lista de los comandos disponibles",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CommandInfo {
    pub name: &'static str,
    pub parameters: &'static [&'static str],
    pub description: &'static str,
}

impl CommandInfo {
    fn usage(&self) -> String {
        let mut usage = format!("/{}", self.name);
        for parameter in self.parameters {
            usage.push_str(&format!(" <{parameter}>"));
        }
        usage
    }
}

/// Commands of a category, sorted by name.
pub fn commands_in(category: HelpCategory) -> Vec<CommandInfo> {
    let mut commands = match category {
        HelpCategory::Admin => vec![CommandInfo {
            name: "botinfo",
            parameters: &[],
            description: "Muestra información sobre el bot",
        }],
        HelpCategory::Meetups => vec![
            CommandInfo {
                name: "quedadas",
                parameters: &[],
                description: "Muestra las quedadas activas y pendientes",
            },
            CommandInfo {
                name: "crear-quedada",
                parameters: &["titulo", "descripcion", "fecha", "hora", "lugar", "estado"],
                description: "Crea una nueva quedada",
            },
            CommandInfo {
                name: "eliminar-quedada",
                parameters: &["id_quedada"],
                description: "Elimina una quedada existente",
            },
        ],
        HelpCategory::Interaction => InteractionKind::ALL
            .into_iter()
            .map(|kind| CommandInfo {
                name: kind.command_name(),
                parameters: &["usuario"],
                description: kind.description(),
            })
            .collect(),
        HelpCategory::Utilities => vec![CommandInfo {
            name: "help",
            parameters: &["categoria"],
            description: "Muestra todos los comandos disponibles",
        }],
        HelpCategory::All => {
            HelpCategory::LISTED.into_iter().flat_map(commands_in).collect::<Vec<_>>()
        }
    };
    commands.sort_by_key(|command| command.name);
    commands
}

pub fn help_message(category: HelpCategory, now: DateTime<Utc>) -> MessageTemplate {
    let title = match category {
        HelpCategory::All => "Comandos Disponibles".to_owned(),
        other => format!("Comandos de {}", other.heading()),
    };

    MessageBuilder::new()
        .embed(title, |embed| {
            embed.description(category.summary()).color(HELP_COLOR);
            if category == HelpCategory::All {
                for listed in HelpCategory::LISTED {
                    embed.field(listed.heading(), listed.summary(), false);
                    for command in commands_in(listed) {
                        embed.field(
                            format!("  {}", command.usage()),
                            format!("  {}", command.description),
                            false,
                        );
                    }
                }
            } else {
                for command in commands_in(category) {
                    embed.field(command.usage(), command.description, false);
                }
            }
            embed.footer("Usa /help <categoria> para ver comandos específicos").timestamp(now);
        })
        .build()
}

pub fn botinfo_message(bot_name: &str, now: DateTime<Utc>) -> MessageTemplate {
    MessageBuilder::new()
        .embed(format!("Información de {bot_name}"), |embed| {
            embed
                .description("A Discord bot for managing and displaying meetups")
                .field("🤖 Nombre", bot_name, true)
                .field("🔢 Versión", env!("CARGO_PKG_VERSION"), true)
                .field("👨‍💻 Autor", "Platanotorrino Team", true)
                .field("🔧 Tecnologías", "Rust, Tokio", true)
                .signed(now);
        })
        .build()
}
