use std::sync::Arc;

use platano_core::config::AppConfig;
use platano_discord::commands::RegistryCommandService;
use platano_discord::events::bot_dispatcher;
use platano_discord::gateway::{GatewayRunner, NoopGatewayTransport, ReconnectPolicy};
use platano_discord::gif::{GifError, GifProvider, NekotinaClient, NoopGifProvider};
use platano_store::{JsonFileStore, MeetupRegistry};
use thiserror::Error;
use tracing::{info, warn};

pub const BOT_NAME: &str = "Platanotorrino";

pub struct Application {
    pub config: AppConfig,
    pub registry: Arc<MeetupRegistry<JsonFileStore>>,
    pub gateway_runner: GatewayRunner,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("gif client setup failed: {0}")]
    Gif(#[from] GifError),
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        storage_path = %config.storage.path.display(),
        "starting application bootstrap"
    );

    let registry = Arc::new(MeetupRegistry::new(JsonFileStore::new(&config.storage.path)));
    // A broken store is reported but not fatal; /health shows it as degraded.
    match registry.list().await {
        Ok(meetups) => info!(
            event_name = "system.bootstrap.store_loaded",
            correlation_id = "bootstrap",
            meetups = meetups.len(),
            "meetup store loaded"
        ),
        Err(error) => warn!(
            event_name = "system.bootstrap.store_unreadable",
            correlation_id = "bootstrap",
            error = %error,
            "meetup store could not be loaded; meetup commands will fail until it is repaired"
        ),
    }

    let gifs: Arc<dyn GifProvider> = if config.gif.enabled {
        Arc::new(NekotinaClient::from_config(&config.gif)?)
    } else {
        info!(
            event_name = "system.bootstrap.gif_disabled",
            correlation_id = "bootstrap",
            "gif lookups disabled; interaction commands use fallback gifs"
        );
        Arc::new(NoopGifProvider)
    };

    let dispatcher =
        bot_dispatcher(RegistryCommandService::new(Arc::clone(&registry), gifs), BOT_NAME);
    let gateway_runner = GatewayRunner::new(
        Arc::new(NoopGatewayTransport),
        dispatcher,
        ReconnectPolicy::default(),
    );

    Ok(Application { config, registry, gateway_runner })
}
