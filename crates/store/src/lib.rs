//! Durable storage for the meetup registry.
//!
//! - **`MeetupStore`** - load/save the whole [`RegistrySnapshot`]
//! - **`JsonFileStore`** - pretty-printed JSON document, replaced atomically on save
//! - **`InMemoryStore`** - byte buffer with the same codec, for tests
//! - **`MeetupRegistry`** - list/create/delete/find, serialized read-modify-write

pub mod codec;
pub mod file;
pub mod memory;
pub mod registry;

use std::path::PathBuf;

use async_trait::async_trait;
use platano_core::{ApplicationError, RegistrySnapshot};
use thiserror::Error;

pub use file::JsonFileStore;
pub use memory::InMemoryStore;
pub use registry::MeetupRegistry;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store i/o failed for `{path}`: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("store contents are corrupt: {0}")]
    Corrupt(String),
    #[error("could not serialize registry: {0}")]
    Serialize(String),
}

impl From<StoreError> for ApplicationError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Corrupt(message) => Self::CorruptStore(message),
            other @ (StoreError::Io { .. } | StoreError::Serialize(_)) => {
                Self::Storage(other.to_string())
            }
        }
    }
}

/// Every `load` reads the durable medium again; implementations keep no
/// cache between calls.
#[async_trait]
pub trait MeetupStore: Send + Sync {
    async fn load(&self) -> Result<RegistrySnapshot, StoreError>;
    async fn save(&self, snapshot: &RegistrySnapshot) -> Result<(), StoreError>;
}
