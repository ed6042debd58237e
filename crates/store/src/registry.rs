use platano_core::{ApplicationError, Meetup, MeetupDraft, MeetupId, RegistrySnapshot};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::MeetupStore;

/// Meetup operations over a [`MeetupStore`].
///
/// Every operation re-loads the store. Create and delete hold `gate` for the
/// whole load-modify-save sequence, which makes them linearizable and keeps
/// the `max + 1` id allocation free of duplicates. Reads take the same gate so
/// they observe completed operations only.
pub struct MeetupRegistry<S> {
    store: S,
    gate: Mutex<()>,
}

impl<S> MeetupRegistry<S>
where
    S: MeetupStore,
{
    pub fn new(store: S) -> Self {
        Self { store, gate: Mutex::new(()) }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub async fn list(&self) -> Result<Vec<Meetup>, ApplicationError> {
        let _guard = self.gate.lock().await;
        Ok(self.store.load().await?.meetups)
    }

    pub async fn find(&self, id: MeetupId) -> Result<Option<Meetup>, ApplicationError> {
        let _guard = self.gate.lock().await;
        let snapshot = self.store.load().await?;
        Ok(snapshot.find(id).cloned())
    }

    pub async fn create(&self, draft: MeetupDraft) -> Result<Meetup, ApplicationError> {
        let validated = draft.validate().map_err(|error| {
            info!(
                event_name = "registry.meetup.create_rejected",
                error = %error,
                "meetup draft failed validation"
            );
            ApplicationError::from(error)
        })?;

        let _guard = self.gate.lock().await;
        let mut snapshot = self.store.load().await?;
        let meetup = validated.into_meetup(snapshot.next_id()?);
        snapshot.push(meetup.clone());
        self.persist(&snapshot, "create", meetup.id).await?;

        info!(
            event_name = "registry.meetup.created",
            meetup_id = %meetup.id,
            status = %meetup.status,
            "meetup created"
        );
        Ok(meetup)
    }

    /// Authorization is decided by the caller and passed in as a flag.
    pub async fn delete(&self, id: MeetupId, is_authorized: bool) -> Result<Meetup, ApplicationError> {
        if !is_authorized {
            info!(
                event_name = "registry.meetup.delete_forbidden",
                meetup_id = %id,
                "meetup delete refused for unauthorized caller"
            );
            return Err(ApplicationError::PermissionDenied);
        }

        let _guard = self.gate.lock().await;
        let mut snapshot = self.store.load().await?;
        let removed = snapshot.remove(id).ok_or(ApplicationError::NotFound(id))?;
        self.persist(&snapshot, "delete", id).await?;

        info!(
            event_name = "registry.meetup.deleted",
            meetup_id = %id,
            title = %removed.title,
            "meetup deleted"
        );
        Ok(removed)
    }

    async fn persist(
        &self,
        snapshot: &RegistrySnapshot,
        operation: &'static str,
        meetup_id: MeetupId,
    ) -> Result<(), ApplicationError> {
        self.store.save(snapshot).await.map_err(|error| {
            warn!(
                event_name = "registry.meetup.save_failed",
                operation,
                meetup_id = %meetup_id,
                error = %error,
                "meetup registry save failed; operation not applied"
            );
            ApplicationError::from(error)
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::sync::Arc;

    use platano_core::{ApplicationError, DomainError, MeetupDraft, MeetupId, MeetupStatus};

    use super::MeetupRegistry;
    use crate::InMemoryStore;

    fn draft(title: &str) -> MeetupDraft {
        MeetupDraft {
            title: title.to_owned(),
            description: "Bring food".to_owned(),
            date: "2024-06-01T18:00:00Z".to_owned(),
            location: "Park".to_owned(),
            status: "activo".to_owned(),
        }
    }

    #[tokio::test]
    async fn picnic_scenario_allocates_lists_and_deletes() {
        let registry = MeetupRegistry::new(InMemoryStore::default());

        let picnic = registry.create(draft("Picnic")).await.expect("create picnic");
        assert_eq!(picnic.id, MeetupId(1));
        assert!(picnic.participants.is_empty());
        assert_eq!(picnic.status, MeetupStatus::Active);

        let second = registry.create(draft("Cine")).await.expect("create second");
        assert_eq!(second.id, MeetupId(2));

        let removed = registry.delete(MeetupId(1), true).await.expect("delete picnic");
        assert_eq!(removed.title, "Picnic");

        let remaining = registry.list().await.expect("list");
        assert_eq!(remaining.iter().map(|meetup| meetup.id).collect::<Vec<_>>(), vec![MeetupId(2)]);

        let again = registry.delete(MeetupId(1), true).await;
        assert_eq!(again, Err(ApplicationError::NotFound(MeetupId(1))));
    }

    #[tokio::test]
    async fn sequential_creates_yield_strictly_increasing_ids() {
        let registry = MeetupRegistry::new(InMemoryStore::default());
        let mut previous = 0;

        for index in 0..10 {
            let meetup = registry.create(draft(&format!("Quedada {index}"))).await.expect("create");
            assert!(meetup.id.0 > previous, "ids must increase");
            previous = meetup.id.0;
        }
        assert_eq!(previous, 10);
    }

    #[tokio::test]
    async fn missing_id_leaves_store_bytes_unchanged() {
        let registry = MeetupRegistry::new(InMemoryStore::default());
        registry.create(draft("Picnic")).await.expect("create");
        let before = registry.store().contents().await;

        let result = registry.delete(MeetupId(99), true).await;

        assert_eq!(result, Err(ApplicationError::NotFound(MeetupId(99))));
        assert_eq!(registry.store().contents().await, before);
    }

    #[tokio::test]
    async fn unauthorized_delete_is_refused_without_mutation() {
        let registry = MeetupRegistry::new(InMemoryStore::default());
        let picnic = registry.create(draft("Picnic")).await.expect("create");
        let before = registry.store().contents().await;

        let result = registry.delete(picnic.id, false).await;

        assert_eq!(result, Err(ApplicationError::PermissionDenied));
        assert_eq!(registry.store().contents().await, before);
        assert_eq!(registry.find(picnic.id).await.expect("find"), Some(picnic));
    }

    #[tokio::test]
    async fn invalid_status_is_rejected_and_store_is_untouched() {
        let registry = MeetupRegistry::new(InMemoryStore::default());
        let mut invalid = draft("Picnic");
        invalid.status = "cancelado".to_owned();

        let result = registry.create(invalid).await;

        assert!(matches!(
            result,
            Err(ApplicationError::Domain(DomainError::Validation { field: "status", .. }))
        ));
        assert_eq!(registry.store().contents().await, None);
        assert!(registry.list().await.expect("list").is_empty());
    }

    #[tokio::test]
    async fn invalid_dates_are_validation_errors() {
        let registry = MeetupRegistry::new(InMemoryStore::default());

        for date in ["2023-02-30T10:00", "2023-13-01T10:00", "2023-06-01T25:00"] {
            let mut invalid = draft("Picnic");
            invalid.date = date.to_owned();
            let result = registry.create(invalid).await;
            assert!(
                matches!(
                    result,
                    Err(ApplicationError::Domain(DomainError::Validation { field: "date", .. }))
                ),
                "expected {date} to be rejected"
            );
        }
        assert!(registry.list().await.expect("list").is_empty());
    }

    #[tokio::test]
    async fn failed_save_reports_storage_error_and_creates_nothing() {
        let registry = MeetupRegistry::new(InMemoryStore::default());
        registry.create(draft("Picnic")).await.expect("create");
        registry.store().fail_saves(true);

        let created = registry.create(draft("Cine")).await;
        assert!(matches!(created, Err(ApplicationError::Storage(_))));

        let deleted = registry.delete(MeetupId(1), true).await;
        assert!(matches!(deleted, Err(ApplicationError::Storage(_))));

        registry.store().fail_saves(false);
        let listed = registry.list().await.expect("list");
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].title, "Picnic");
    }

    #[tokio::test]
    async fn corrupt_store_is_surfaced_and_never_overwritten() {
        let registry = MeetupRegistry::new(InMemoryStore::with_contents("not json"));

        assert!(matches!(registry.list().await, Err(ApplicationError::CorruptStore(_))));
        assert!(matches!(
            registry.create(draft("Picnic")).await,
            Err(ApplicationError::CorruptStore(_))
        ));
        assert_eq!(registry.store().contents().await, Some(b"not json".to_vec()));
    }

    #[tokio::test]
    async fn create_on_exhausted_id_space_fails_without_saving() {
        let stored = r#"{
  "meetups": [
    {
      "id": 18446744073709551615,
      "title": "Última",
      "description": "x",
      "date": "2024-06-01T18:00:00+00:00",
      "location": "",
      "status": "activo",
      "participants": []
    }
  ]
}"#
        .to_owned();
        let registry = MeetupRegistry::new(InMemoryStore::with_contents(stored.clone()));
        assert_eq!(registry.list().await.expect("list").len(), 1);

        let result = registry.create(draft("Picnic")).await;

        assert!(matches!(
            result,
            Err(ApplicationError::Domain(DomainError::InvariantViolation(_)))
        ));
        assert_eq!(registry.store().contents().await, Some(stored.into_bytes()));
        assert_eq!(registry.list().await.expect("list after failed create").len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_creates_get_distinct_contiguous_ids() {
        let registry = Arc::new(MeetupRegistry::new(InMemoryStore::default()));
        registry.create(draft("Existente")).await.expect("seed");

        let handles: Vec<_> = (0..24)
            .map(|index| {
                let registry = Arc::clone(&registry);
                tokio::spawn(async move { registry.create(draft(&format!("Paralela {index}"))).await })
            })
            .collect();

        let mut ids = BTreeSet::new();
        for handle in handles {
            let meetup = handle.await.expect("join").expect("create");
            assert!(ids.insert(meetup.id.0), "duplicate id {}", meetup.id);
        }

        assert_eq!(ids, (2..=25).collect::<BTreeSet<u64>>());
        assert_eq!(registry.list().await.expect("list").len(), 25);
    }
}
