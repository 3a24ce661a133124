//! Record reconciliation: diff a candidate against the stored record and
//! persist the decision.

use std::sync::Arc;

use tracing::debug;

use crate::domain::{ContentRecord, Decision, RecordFields};
use crate::error::StoreError;
use crate::library::store::{ContentStore, FieldValue, ListWrites};

/// Decide what to do with `candidate` given the stored record (if any)
pub fn reconcile(candidate: &RecordFields, existing: Option<&ContentRecord>) -> Decision {
    match existing {
        None => Decision::Create,
        Some(record) => {
            let changed = candidate.changed_fields(&record.fields);
            if changed.is_empty() {
                Decision::NoOp
            } else {
                Decision::Update { changed }
            }
        }
    }
}

/// Applies decisions to a store
pub struct Reconciler {
    store: Arc<dyn ContentStore>,
}

impl Reconciler {
    pub fn new(store: Arc<dyn ContentStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn ContentStore> {
        &self.store
    }

    /// Look up the stored record and decide
    pub async fn decide(
        &self,
        filename: &str,
        candidate: &RecordFields,
    ) -> Result<Decision, StoreError> {
        let existing = self.store.find_by_key(filename).await?;
        let decision = reconcile(candidate, existing.as_ref());

        if let (Decision::Update { changed }, Some(record)) = (&decision, &existing) {
            for field in changed {
                debug!(filename, %field, "Field changed");
            }
            debug!(filename, revision = record.revision, "Stored record is stale");
        }

        Ok(decision)
    }

    /// Persist a decision.
    ///
    /// Updates overwrite every tracked field. For stores that merge list
    /// writes, contributors are cleared in their own write first.
    pub async fn apply(
        &self,
        filename: &str,
        decision: &Decision,
        candidate: &RecordFields,
    ) -> Result<(), StoreError> {
        match decision {
            Decision::NoOp => Ok(()),
            Decision::Create => self.store.create(filename, candidate).await,
            Decision::Update { .. } => {
                if self.store.list_writes() == ListWrites::Merge {
                    self.store
                        .replace_fields(filename, &[FieldValue::Contributors(Vec::new())])
                        .await?;
                }
                self.store
                    .replace_fields(filename, &FieldValue::all_of(candidate))
                    .await
            }
        }
    }

    /// Delete every record whose key is not in `manifest_keys`
    pub async fn sweep_orphans(&self, manifest_keys: &[String]) -> Result<Vec<String>, StoreError> {
        self.store.delete_where_key_not_in(manifest_keys).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ContentType, ContributorStat, TrackedField};
    use crate::library::store::SqliteStore;
    use chrono::Utc;

    fn fields() -> RecordFields {
        RecordFields {
            title: "Intro".to_string(),
            content_type: ContentType::Link,
            tags: vec!["a".to_string(), "b".to_string()],
            image: None,
            image_text: None,
            url: Some("http://x".to_string()),
            body_content: None,
            stripped_content: None,
            author_name: "Ava Lee".to_string(),
            author_email: "ava@x.com".to_string(),
            author_avatar: "https://avatars.example/ava".to_string(),
            contributors: vec![ContributorStat {
                name: "Ava Lee".to_string(),
                email: "ava@x.com".to_string(),
                contributions: 3,
                avatar: "https://avatars.example/ava".to_string(),
            }],
        }
    }

    fn stored(fields: RecordFields) -> ContentRecord {
        ContentRecord {
            filename: "post1.md".to_string(),
            fields,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            revision: 7,
        }
    }

    #[test]
    fn test_reconcile_absent_is_create() {
        assert_eq!(reconcile(&fields(), None), Decision::Create);
    }

    #[test]
    fn test_reconcile_reordered_tags_is_noop() {
        let mut existing = fields();
        existing.tags = vec!["b".to_string(), "a".to_string()];
        assert_eq!(reconcile(&fields(), Some(&stored(existing))), Decision::NoOp);
    }

    #[test]
    fn test_reconcile_ignores_storage_metadata() {
        let record = stored(fields());
        assert_eq!(record.revision, 7);
        assert_eq!(reconcile(&fields(), Some(&record)), Decision::NoOp);
    }

    #[test]
    fn test_reconcile_reports_changed_fields() {
        let mut candidate = fields();
        candidate.title = "Intro v2".to_string();
        candidate.body_content = Some("*x*".to_string());
        candidate.stripped_content = Some("x".to_string());

        assert_eq!(
            reconcile(&candidate, Some(&stored(fields()))),
            Decision::Update {
                changed: vec![
                    TrackedField::Title,
                    TrackedField::BodyContent,
                    TrackedField::StrippedContent
                ]
            }
        );
    }

    #[tokio::test]
    async fn test_apply_update_overwrites_all_fields() {
        let store: Arc<dyn ContentStore> = Arc::new(SqliteStore::open_in_memory().unwrap());
        let reconciler = Reconciler::new(store.clone());

        let mut original = fields();
        original.image = Some("old.png".to_string());
        reconciler
            .apply("post1.md", &Decision::Create, &original)
            .await
            .unwrap();

        let candidate = fields();
        let decision = reconciler.decide("post1.md", &candidate).await.unwrap();
        assert!(matches!(decision, Decision::Update { .. }));
        reconciler.apply("post1.md", &decision, &candidate).await.unwrap();

        let record = store.find_by_key("post1.md").await.unwrap().unwrap();
        assert_eq!(record.fields, candidate);
        assert_eq!(
            reconciler.decide("post1.md", &candidate).await.unwrap(),
            Decision::NoOp
        );
    }
}
