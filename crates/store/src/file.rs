use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use platano_core::RegistrySnapshot;
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::{codec, MeetupStore, StoreError};

/// Registry persisted as one JSON document. Saves go to a temporary file in
/// the same directory which is synced and then renamed over the target, so a
/// concurrent `load` sees either the old or the new document.
#[derive(Clone, Debug)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl MeetupStore for JsonFileStore {
    async fn load(&self) -> Result<RegistrySnapshot, StoreError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(error) if error.kind() == io::ErrorKind::NotFound => {
                debug!(
                    event_name = "store.file.missing",
                    path = %self.path.display(),
                    "meetup store does not exist yet; starting empty"
                );
                return Ok(RegistrySnapshot::default());
            }
            Err(source) => {
                warn!(
                    event_name = "store.file.read_failed",
                    path = %self.path.display(),
                    error = %source,
                    "failed to read meetup store"
                );
                return Err(StoreError::Io { path: self.path.clone(), source });
            }
        };

        let snapshot = codec::decode(&bytes).map_err(|error| {
            warn!(
                event_name = "store.file.corrupt",
                path = %self.path.display(),
                error = %error,
                "meetup store could not be parsed; leaving it untouched"
            );
            error
        })?;
        debug!(
            event_name = "store.file.loaded",
            path = %self.path.display(),
            meetups = snapshot.len(),
            "meetup store loaded"
        );
        Ok(snapshot)
    }

    async fn save(&self, snapshot: &RegistrySnapshot) -> Result<(), StoreError> {
        let payload = codec::encode(snapshot)?;
        let path = self.path.clone();

        let result = tokio::task::spawn_blocking(move || write_atomic(&path, &payload))
            .await
            .map_err(|join_error| StoreError::Io {
                path: self.path.clone(),
                source: io::Error::new(io::ErrorKind::Other, join_error),
            })
            .and_then(|written| written);

        match &result {
            Ok(()) => debug!(
                event_name = "store.file.saved",
                path = %self.path.display(),
                meetups = snapshot.len(),
                "meetup store saved"
            ),
            Err(error) => warn!(
                event_name = "store.file.save_failed",
                path = %self.path.display(),
                error = %error,
                "failed to save meetup store; previous contents kept"
            ),
        }
        result
    }
}

fn write_atomic(path: &Path, payload: &[u8]) -> Result<(), StoreError> {
    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let io_error = |source: io::Error| StoreError::Io { path: path.to_path_buf(), source };

    fs::create_dir_all(directory).map_err(io_error)?;

    let mut temporary = NamedTempFile::new_in(directory).map_err(io_error)?;
    temporary.write_all(payload).map_err(io_error)?;
    temporary.as_file().sync_all().map_err(io_error)?;
    temporary.persist(path).map_err(|error| io_error(error.error))?;

    sync_directory(directory).map_err(io_error)
}

#[cfg(unix)]
fn sync_directory(directory: &Path) -> io::Result<()> {
    fs::File::open(directory)?.sync_all()
}

#[cfg(not(unix))]
fn sync_directory(_directory: &Path) -> io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use chrono::{TimeZone, Utc};
    use platano_core::{Meetup, MeetupId, MeetupStatus, RegistrySnapshot};
    use tempfile::TempDir;

    use super::JsonFileStore;
    use crate::{MeetupStore, StoreError};

    fn snapshot() -> RegistrySnapshot {
        RegistrySnapshot::new(vec![Meetup {
            id: MeetupId(1),
            title: "Picnic".to_owned(),
            description: "Bring food".to_owned(),
            date: Utc.with_ymd_and_hms(2024, 6, 1, 18, 0, 0).unwrap(),
            location: "Park".to_owned(),
            status: MeetupStatus::Active,
            participants: Vec::new(),
        }])
    }

    #[tokio::test]
    async fn missing_file_loads_as_empty_registry() {
        let dir = TempDir::new().expect("tempdir");
        let store = JsonFileStore::new(dir.path().join("meetups.json"));

        let loaded = store.load().await.expect("load missing store");
        assert!(loaded.is_empty());
        assert!(!store.path().exists(), "load must not create the store");
    }

    #[tokio::test]
    async fn save_creates_parent_directories_and_leaves_no_temporary_files() {
        let dir = TempDir::new().expect("tempdir");
        let data_dir = dir.path().join("data");
        let store = JsonFileStore::new(data_dir.join("meetups.json"));

        store.save(&snapshot()).await.expect("save");
        assert_eq!(store.load().await.expect("reload"), snapshot());

        let entries: Vec<_> = fs::read_dir(&data_dir)
            .expect("read data dir")
            .map(|entry| entry.expect("entry").file_name())
            .collect();
        assert_eq!(entries, vec!["meetups.json"]);
    }

    #[tokio::test]
    async fn corrupt_file_is_reported_and_preserved() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("meetups.json");
        fs::write(&path, "{ \"meetups\": [ {").expect("write corrupt store");
        let store = JsonFileStore::new(&path);

        let error = store.load().await.expect_err("corrupt store must fail");
        assert!(matches!(error, StoreError::Corrupt(_)));
        assert_eq!(fs::read_to_string(&path).expect("read"), "{ \"meetups\": [ {");
    }

    #[tokio::test]
    async fn unreadable_path_is_an_io_error_not_corruption() {
        let dir = TempDir::new().expect("tempdir");
        let store = JsonFileStore::new(dir.path());

        let error = store.load().await.expect_err("directory is not a store file");
        assert!(matches!(error, StoreError::Io { .. }));
    }

    #[tokio::test]
    async fn save_into_a_file_parent_fails_without_panicking() {
        let dir = TempDir::new().expect("tempdir");
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "not a directory").expect("write blocker");
        let store = JsonFileStore::new(blocker.join("meetups.json"));

        let error = store.save(&snapshot()).await.expect_err("save must fail");
        assert!(matches!(error, StoreError::Io { .. }));
    }
}
