use std::time::Duration;

use async_trait::async_trait;
use platano_core::config::GifConfig;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum InteractionKind {
    Hug,
    Pat,
    Highfive,
    Poke,
    Slap,
    Kiss,
    Dance,
}

impl InteractionKind {
    pub const ALL: [InteractionKind; 7] =
        [Self::Hug, Self::Pat, Self::Highfive, Self::Poke, Self::Slap, Self::Kiss, Self::Dance];

    pub fn from_command(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.command_name() == name)
    }

    /// Slash command name, also the path segment of the GIF endpoint.
    pub fn command_name(self) -> &'static str {
        match self {
            Self::Hug => "hug",
            Self::Pat => "pat",
            Self::Highfive => "highfive",
            Self::Poke => "poke",
            Self::Slap => "slap",
            Self::Kiss => "kiss",
            Self::Dance => "dance",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::Hug => "Da un abrazo a otro usuario",
            Self::Pat => "Da una palmadita a otro usuario",
            Self::Highfive => "Choca los cinco con otro usuario",
            Self::Poke => "Toca a otro usuario para llamar su atención",
            Self::Slap => "Da una bofetada a otro usuario",
            Self::Kiss => "Da un beso a otro usuario",
            Self::Dance => "Baila con otro usuario",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Self::Hug => "¡Abrazo!",
            Self::Pat => "¡Palmadita!",
            Self::Highfive => "¡Choca esos cinco!",
            Self::Poke => "¡Toque!",
            Self::Slap => "¡Bofetada!",
            Self::Kiss => "¡Beso!",
            Self::Dance => "¡A bailar!",
        }
    }

    pub fn phrase(self, author: &str, target: &str) -> String {
        match self {
            Self::Hug => format!("{author} le ha dado un cálido abrazo a {target} 🤗"),
            Self::Pat => format!("{author} le ha dado una suave palmadita a {target} 👋"),
            Self::Highfive => format!("{author} ha chocado los cinco con {target} ✋"),
            Self::Poke => format!("{author} ha tocado a {target} para llamar su atención 👉"),
            Self::Slap => format!("{author} le ha dado una bofetada a {target} 👋💥"),
            Self::Kiss => format!("{author} le ha dado un dulce beso a {target} 💋"),
            Self::Dance => format!("{author} está bailando con {target} 💃🕺"),
        }
    }

    pub fn color(self) -> u32 {
        match self {
            Self::Hug => 0xffafc9,
            Self::Pat => 0xb8e986,
            Self::Highfive => 0xffd700,
            Self::Poke => 0x87ceeb,
            Self::Slap => 0xff6347,
            Self::Kiss => 0xff69b4,
            Self::Dance => 0x9370db,
        }
    }

    pub fn fallback_url(self) -> &'static str {
        match self {
            Self::Hug => "https://media.giphy.com/media/u9BxQbM5bxvwY/giphy.gif",
            Self::Pat => "https://media.giphy.com/media/ARSp9T4wwxNcs/giphy.gif",
            Self::Highfive => "https://media.giphy.com/media/3oEjHV0z8S7WM4MwnK/giphy.gif",
            Self::Poke => "https://media.giphy.com/media/pWd3gD577gOqs/giphy.gif",
            Self::Slap => "https://media.giphy.com/media/Zau0yrl17uzdK/giphy.gif",
            Self::Kiss => "https://media.giphy.com/media/G3va31oEEnIkM/giphy.gif",
            Self::Dance => "https://media.giphy.com/media/l3q2Cy90VMhfoA8HC/giphy.gif",
        }
    }
}

#[async_trait]
pub trait GifProvider: Send + Sync {
    /// `None` when no GIF could be obtained; callers fall back to
    /// [`InteractionKind::fallback_url`].
    async fn fetch(&self, kind: InteractionKind) -> Option<String>;
}

pub async fn resolve_gif(provider: &dyn GifProvider, kind: InteractionKind) -> String {
    provider.fetch(kind).await.unwrap_or_else(|| kind.fallback_url().to_owned())
}

/// Used when GIF lookups are disabled.
#[derive(Default)]
pub struct NoopGifProvider;

#[async_trait]
impl GifProvider for NoopGifProvider {
    async fn fetch(&self, _kind: InteractionKind) -> Option<String> {
        None
    }
}

#[derive(Debug, Error)]
pub enum GifError {
    #[error("failed to build GIF http client: {0}")]
    Client(String),
    #[error("GIF request failed: {0}")]
    Request(String),
    #[error("GIF endpoint answered with status {0}")]
    Status(StatusCode),
    #[error("GIF response body is invalid: {0}")]
    Body(String),
}

#[derive(Deserialize)]
struct GifResponse {
    url: String,
}

#[derive(Clone, Debug)]
pub struct NekotinaClient {
    client: Client,
    base_url: String,
}

impl NekotinaClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, GifError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| GifError::Client(error.to_string()))?;
        Ok(Self { client, base_url: base_url.into().trim_end_matches('/').to_owned() })
    }

    pub fn from_config(config: &GifConfig) -> Result<Self, GifError> {
        Self::new(config.base_url.clone(), Duration::from_secs(config.timeout_secs))
    }

    pub fn endpoint(&self, kind: InteractionKind) -> String {
        format!("{}/{}", self.base_url, kind.command_name())
    }

    async fn request(&self, kind: InteractionKind) -> Result<String, GifError> {
        let response = self
            .client
            .get(self.endpoint(kind))
            .send()
            .await
            .map_err(|error| GifError::Request(error.to_string()))?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(GifError::Status(status));
        }

        let body: GifResponse =
            response.json().await.map_err(|error| GifError::Body(error.to_string()))?;
        if body.url.trim().is_empty() {
            return Err(GifError::Body("empty url".to_owned()));
        }
        Ok(body.url)
    }
}

#[async_trait]
impl GifProvider for NekotinaClient {
    async fn fetch(&self, kind: InteractionKind) -> Option<String> {
        match self.request(kind).await {
            Ok(url) => {
                debug!(event_name = "gif.lookup.succeeded", kind = kind.command_name(), "gif resolved");
                Some(url)
            }
            Err(error) => {
                warn!(
                    event_name = "gif.lookup.failed",
                    kind = kind.command_name(),
                    error = %error,
                    "gif lookup failed; using fallback"
                );
                None
            }
        }
    }
}
