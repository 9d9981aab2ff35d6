use super::image::{image_content_id, strip_query};
use crate::events::MetadataField;
use crate::fetcher::RawMetadata;
use crate::snapshot_store::MetadataRecord;
use chrono::{DateTime, Utc};
use std::time::Duration;
use tracing::{debug, info};

/// Minimum age of the last image check before an unconfirmed image change is trusted.
pub const DEFAULT_IMAGE_DEBOUNCE: Duration = Duration::from_secs(24 * 60 * 60);

/// A single differing metadata field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataChange {
    pub field: MetadataField,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
}

/// Result of comparing stored metadata against a fresh fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataDetection {
    /// Accepted changes, in name, description, image order.
    pub changes: Vec<MetadataChange>,
    pub image_changed: bool,
    /// An image id difference was seen but not trusted this pass.
    pub image_change_suppressed: bool,
    /// No record was stored before; `record` is the new baseline.
    pub first_sighting: bool,
    /// Record to persist, built from the fetched values.
    pub record: MetadataRecord,
}

impl MetadataDetection {
    pub fn changed(&self) -> bool {
        !self.changes.is_empty()
    }
}

/// Compares stored and fetched playlist metadata.
#[derive(Debug, Clone)]
pub struct MetadataChangeDetector {
    image_debounce: chrono::Duration,
}

impl Default for MetadataChangeDetector {
    fn default() -> Self {
        Self::new(DEFAULT_IMAGE_DEBOUNCE)
    }
}

impl MetadataChangeDetector {
    pub fn new(image_debounce: Duration) -> Self {
        Self {
            image_debounce: chrono::Duration::from_std(image_debounce)
                .unwrap_or(chrono::Duration::MAX),
        }
    }

    /// Build the record that replaces whatever is stored.
    fn record_from(fetched: &RawMetadata, now: DateTime<Utc>) -> MetadataRecord {
        let image_base_url = fetched
            .image_url
            .as_deref()
            .map(|url| strip_query(url).to_string());
        let image_content_id = image_base_url.as_deref().map(image_content_id);

        MetadataRecord {
            id: fetched.id.clone(),
            name: fetched.name.clone(),
            description: fetched.description.clone(),
            image_base_url,
            image_content_id,
            image_last_checked_at: now,
            snapshot_token: fetched.snapshot_token.clone(),
        }
    }

    /// Compare `stored` with `fetched` as of `now`.
    ///
    /// A first sighting never reports changes. The returned record always
    /// carries the fetched values, whether or not anything was reported.
    pub fn detect(
        &self,
        stored: Option<&MetadataRecord>,
        fetched: &RawMetadata,
        now: DateTime<Utc>,
    ) -> MetadataDetection {
        let record = Self::record_from(fetched, now);

        let Some(stored) = stored else {
            info!("Initial metadata stored for playlist: {}", fetched.name);
            return MetadataDetection {
                changes: Vec::new(),
                image_changed: false,
                image_change_suppressed: false,
                first_sighting: true,
                record,
            };
        };

        let mut changes = Vec::new();

        if stored.name != record.name {
            changes.push(MetadataChange {
                field: MetadataField::Name,
                old_value: Some(stored.name.clone()),
                new_value: Some(record.name.clone()),
            });
        }

        if stored.description != record.description {
            changes.push(MetadataChange {
                field: MetadataField::Description,
                old_value: Some(stored.description.clone()),
                new_value: Some(record.description.clone()),
            });
        }

        let mut image_changed = false;
        let mut image_change_suppressed = false;
        if stored.image_content_id != record.image_content_id {
            let token_changed = stored.snapshot_token != record.snapshot_token;
            let since_last_check = now - stored.image_last_checked_at;
            let window_elapsed = since_last_check > self.image_debounce;

            if token_changed || window_elapsed {
                debug!(
                    "Image change accepted for {} (token changed: {}, window elapsed: {})",
                    fetched.id, token_changed, window_elapsed
                );
                image_changed = true;
                changes.push(MetadataChange {
                    field: MetadataField::Image,
                    old_value: stored.image_base_url.clone(),
                    new_value: record.image_base_url.clone(),
                });
            } else {
                info!(
                    "Ignoring possible false-positive image change for {}: {:?} -> {:?}, last checked {}s ago",
                    fetched.id,
                    stored.image_content_id,
                    record.image_content_id,
                    since_last_check.num_seconds()
                );
                image_change_suppressed = true;
            }
        }

        if !changes.is_empty() {
            info!("Detected metadata changes for playlist: {}", record.name);
        }

        MetadataDetection {
            changes,
            image_changed,
            image_change_suppressed,
            first_sighting: false,
            record,
        }
    }
}
