use platano_core::config::{AppConfig, LoadOptions};
use platano_core::{ApplicationError, DomainError, MeetupDraft, MeetupId};
use platano_store::{JsonFileStore, MeetupRegistry};
use serde_json::json;

use crate::commands::CommandResult;

#[derive(Clone, Debug, Default)]
pub struct CreateArgs {
    pub title: String,
    pub description: String,
    pub date: String,
    pub time: Option<String>,
    pub location: String,
    pub status: String,
}

impl CreateArgs {
    fn into_draft(self) -> MeetupDraft {
        let date = match self.time {
            Some(time) => format!("{}T{}", self.date.trim(), time.trim()),
            None => self.date,
        };
        MeetupDraft {
            title: self.title,
            description: self.description,
            date,
            location: self.location,
            status: self.status,
        }
    }
}

type Failure = (&'static str, String, u8);

pub fn list() -> CommandResult {
    execute("meetups.list", |registry| async move {
        let meetups = registry.list().await.map_err(classify)?;
        let data = serde_json::to_value(&meetups)
            .map_err(|error| ("serialization", error.to_string(), 4u8))?;
        Ok(CommandResult::success_with_data(
            "meetups.list",
            format!("{} meetup(s) stored", meetups.len()),
            Some(data),
        ))
    })
}

pub fn create(args: CreateArgs) -> CommandResult {
    execute("meetups.create", |registry| async move {
        let meetup = registry.create(args.into_draft()).await.map_err(classify)?;
        let data = serde_json::to_value(&meetup)
            .map_err(|error| ("serialization", error.to_string(), 4u8))?;
        Ok(CommandResult::success_with_data(
            "meetups.create",
            format!("created meetup {} ({})", meetup.id, meetup.title),
            Some(data),
        ))
    })
}

/// The operator owns the store, so deletes from the CLI are always authorized.
pub fn delete(id: u64) -> CommandResult {
    execute("meetups.delete", |registry| async move {
        let removed = registry.delete(MeetupId(id), true).await.map_err(classify)?;
        Ok(CommandResult::success_with_data(
            "meetups.delete",
            format!("deleted meetup {} ({})", removed.id, removed.title),
            Some(json!({ "id": removed.id, "status": removed.status })),
        ))
    })
}

fn execute<F, Fut>(command: &str, action: F) -> CommandResult
where
    F: FnOnce(MeetupRegistry<JsonFileStore>) -> Fut,
    Fut: std::future::Future<Output = Result<CommandResult, Failure>>,
{
    let storage = match AppConfig::load_storage(LoadOptions::default()) {
        Ok(storage) => storage,
        Err(error) => {
            return CommandResult::failure(
                command,
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                command,
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                4,
            );
        }
    };

    let registry = MeetupRegistry::new(JsonFileStore::new(&storage.path));
    match runtime.block_on(action(registry)) {
        Ok(result) => result,
        Err((error_class, message, exit_code)) => {
            CommandResult::failure(command, error_class, message, exit_code)
        }
    }
}

fn classify(error: ApplicationError) -> Failure {
    let message = error.to_string();
    match error {
        ApplicationError::Domain(DomainError::Validation { .. }) => ("validation", message, 3),
        ApplicationError::NotFound(_) => ("not_found", message, 3),
        ApplicationError::PermissionDenied => ("permission_denied", message, 3),
        ApplicationError::Configuration(_) => ("config_validation", message, 2),
        ApplicationError::CorruptStore(_)
        | ApplicationError::Domain(DomainError::InvariantViolation(_)) => {
            ("corrupt_store", message, 4)
        }
        ApplicationError::Storage(_) => ("storage", message, 4),
    }
}
