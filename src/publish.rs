//! Three-phase snapshot publication: invalidate the previous snapshot,
//! publish the new records, and (for the upsert variant) reconcile away
//! documents that dropped out of the feed.
//!
//! There is no rollback across phases. An invalidate failure aborts the
//! run before anything is published; a per-record publish failure is
//! logged with enough context to diagnose and the run continues.

use crate::error::{Result, SaverError};
use crate::store::{ScanCollection, ScanDocument};
use chrono::{DateTime, Utc};
use tracing::{info, warn};

/// How new records enter the collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishStrategy {
    /// Insert unconditionally, tagging `latest: true`; prior snapshots
    /// stay as history with `latest: false`.
    InsertLatest,
    /// Upsert keyed by domain; reruns are idempotent. Requires the
    /// reconcile phase to drop domains absent from this run.
    UpsertByDomain,
}

/// Whether an individual record made it into the collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    Published,
    /// The write was not acknowledged; the record was skipped and the run
    /// continues.
    Unacknowledged,
}

pub struct SnapshotPublisher<'a> {
    collection: &'a dyn ScanCollection,
    strategy: PublishStrategy,
    /// Shared by every record published this run; the reconcile phase
    /// keys off it.
    scan_date: DateTime<Utc>,
}

impl<'a> SnapshotPublisher<'a> {
    pub fn new(
        collection: &'a dyn ScanCollection,
        strategy: PublishStrategy,
        scan_date: DateTime<Utc>,
    ) -> Self {
        Self {
            collection,
            strategy,
            scan_date,
        }
    }

    pub fn scan_date(&self) -> DateTime<Utc> {
        self.scan_date
    }

    pub fn location(&self) -> &crate::store::CollectionLocation {
        self.collection.location()
    }

    /// Phase one: flip `latest` off on every prior document. Fatal when
    /// unacknowledged; proceeding would leave an ambiguous dual-latest
    /// state.
    pub async fn invalidate_previous(&self) -> Result<()> {
        let ack = self.collection.mark_all_stale().await?;
        if !ack.acknowledged {
            return Err(SaverError::InvalidateUnacknowledged(
                self.collection.location().to_string(),
            ));
        }
        info!(collection = %self.collection.location().collection, "invalidated previous snapshot");
        Ok(())
    }

    /// Phase two: write one record. The document's `scan_date` and
    /// `latest` flag are stamped here so every record in the run shares
    /// the same instant.
    pub async fn publish(&self, mut doc: ScanDocument) -> Result<PublishOutcome> {
        doc.scan_date = self.scan_date;
        doc.latest = true;

        let domain = doc.domain.clone();
        let ack = match self.strategy {
            PublishStrategy::InsertLatest => self.collection.insert(doc).await?,
            PublishStrategy::UpsertByDomain => self.collection.upsert_by_domain(doc).await?,
        };

        if ack.acknowledged {
            Ok(PublishOutcome::Published)
        } else {
            warn!(
                domain = %domain,
                location = %self.collection.location(),
                "write was not acknowledged; skipping record"
            );
            Ok(PublishOutcome::Unacknowledged)
        }
    }

    /// Phase three (upsert variant only): delete every document whose
    /// `scan_date` is not this run's, removing domains that dropped out
    /// of the feed. Failure is reported, not retried; stale documents
    /// stay until the next successful run.
    pub async fn reconcile(&self) -> Result<Option<u64>> {
        if self.strategy != PublishStrategy::UpsertByDomain {
            return Ok(None);
        }

        let ack = self
            .collection
            .delete_where_scan_date_not(self.scan_date)
            .await?;
        if !ack.acknowledged {
            warn!(
                location = %self.collection.location(),
                "stale-document delete was not acknowledged"
            );
            return Err(SaverError::Store(format!(
                "unable to delete stale records in {}",
                self.collection.location()
            )));
        }

        info!(
            deleted = ack.deleted_count,
            collection = %self.collection.location().collection,
            "reconciled stale documents"
        );
        Ok(Some(ack.deleted_count))
    }
}
