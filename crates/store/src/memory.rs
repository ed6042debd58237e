use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use platano_core::RegistrySnapshot;
use tokio::sync::RwLock;

use crate::{codec, MeetupStore, StoreError};

/// Holds the encoded document in memory, going through the same codec as the
/// file store so byte-level behaviour can be asserted without touching disk.
#[derive(Default)]
pub struct InMemoryStore {
    contents: RwLock<Option<Vec<u8>>>,
    fail_saves: AtomicBool,
}

impl InMemoryStore {
    pub fn with_contents(contents: impl Into<Vec<u8>>) -> Self {
        Self { contents: RwLock::new(Some(contents.into())), fail_saves: AtomicBool::new(false) }
    }

    pub async fn contents(&self) -> Option<Vec<u8>> {
        self.contents.read().await.clone()
    }

    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl MeetupStore for InMemoryStore {
    async fn load(&self) -> Result<RegistrySnapshot, StoreError> {
        match self.contents.read().await.as_deref() {
            Some(bytes) => codec::decode(bytes),
            None => Ok(RegistrySnapshot::default()),
        }
    }

    async fn save(&self, snapshot: &RegistrySnapshot) -> Result<(), StoreError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(StoreError::Io {
                path: "memory".into(),
                source: std::io::Error::new(std::io::ErrorKind::Other, "injected save failure"),
            });
        }

        let encoded = codec::encode(snapshot)?;
        *self.contents.write().await = Some(encoded);
        Ok(())
    }
}
