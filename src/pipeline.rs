//! Single-pass feed driver: stream the scan-result CSV, join each row
//! against the ownership index and agency resolver, coerce field types,
//! and hand records to the snapshot publisher.

use crate::agency::AgencyResolver;
use crate::coerce::RawRow;
use crate::error::{Result, SaverError};
use crate::feeds::Feed;
use crate::ownership::DomainOwnershipIndex;
use crate::publish::{PublishOutcome, SnapshotPublisher};
use crate::store::{AgencyRef, CollectionLocation, ScanCollection, ScanDocument};
use chrono::Utc;
use csv::Reader;
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info, instrument};

/// What happened to one feed row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum RecordOutcome {
    Published,
    Skipped { reason: String },
    Failed { reason: String },
}

/// Aggregated result of a complete run, returned by the driver; printing
/// is layered on top by the caller.
#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub job: String,
    #[serde(skip)]
    pub location: CollectionLocation,
    /// Documents successfully published
    pub processed: usize,
    /// Rows excluded by the row-skip rule
    pub skipped: usize,
    /// Per-record failures, with context
    pub failures: Vec<String>,
    /// Stale documents removed by the reconcile phase, when it ran
    pub deleted: Option<u64>,
}

pub struct PipelineDriver<'a> {
    feed: &'static Feed,
    ownership: &'a DomainOwnershipIndex,
    resolver: &'a AgencyResolver,
}

impl<'a> PipelineDriver<'a> {
    pub fn new(
        feed: &'static Feed,
        ownership: &'a DomainOwnershipIndex,
        resolver: &'a AgencyResolver,
    ) -> Self {
        Self {
            feed,
            ownership,
            resolver,
        }
    }

    /// Run the feed end to end against the given collection.
    #[instrument(skip(self, collection), fields(feed = %self.feed.name))]
    pub async fn run(
        &self,
        results_path: &Path,
        collection: &dyn ScanCollection,
    ) -> Result<RunSummary> {
        let rows = self.read_feed(results_path)?;
        info!(rows = rows.len(), "loaded feed rows");

        // One instant shared by every record this run, truncated to the
        // civil day: the feeds are daily snapshots.
        let scan_date = Utc::now()
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| SaverError::Store("could not construct run timestamp".to_string()))?
            .and_utc();
        let publisher = SnapshotPublisher::new(collection, self.feed.strategy, scan_date);

        publisher.invalidate_previous().await?;

        println!(
            "Importing to \"{}\" database on {}...",
            collection.location().database,
            collection.location().host
        );

        let mut summary = RunSummary {
            job: self.feed.name.to_string(),
            location: collection.location().clone(),
            processed: 0,
            skipped: 0,
            failures: Vec::new(),
            deleted: None,
        };

        for row in &rows {
            match self.process_row(row, &publisher).await? {
                RecordOutcome::Published => summary.processed += 1,
                RecordOutcome::Skipped { reason } => {
                    debug!(reason = %reason, "skipping row");
                    summary.skipped += 1;
                }
                RecordOutcome::Failed { reason } => summary.failures.push(reason),
            }
        }

        summary.deleted = publisher.reconcile().await?;

        info!(
            processed = summary.processed,
            skipped = summary.skipped,
            failures = summary.failures.len(),
            "feed run complete"
        );
        Ok(summary)
    }

    /// Read and sort the feed. The header is validated against the feed
    /// schema before any row is consumed; a missing column fails the run
    /// instead of silently misreading.
    fn read_feed(&self, results_path: &Path) -> Result<Vec<RawRow>> {
        let mut reader = Reader::from_path(results_path)?;

        let headers = reader.headers()?.clone();
        for column in self.feed.required_columns() {
            if !headers.iter().any(|header| header == column) {
                return Err(SaverError::MissingColumn(column.to_string()));
            }
        }

        let mut rows = Vec::new();
        for row in reader.deserialize::<HashMap<String, String>>() {
            rows.push(RawRow::new(row?));
        }

        // Sorted by domain so output is deterministic and a domain's
        // records stay grouped for review.
        rows.sort_by(|a, b| {
            let a_domain = a.get("Domain").unwrap_or_default();
            let b_domain = b.get("Domain").unwrap_or_default();
            a_domain.cmp(b_domain)
        });
        Ok(rows)
    }

    /// Coerce and join one row, then publish it.
    async fn process_row(
        &self,
        row: &RawRow,
        publisher: &SnapshotPublisher<'_>,
    ) -> Result<RecordOutcome> {
        if let Some(column) = self.feed.required_scan_column {
            if row.get(column)?.is_empty() {
                return Ok(RecordOutcome::Skipped {
                    reason: format!("'{}' is empty; domain was not scanned", column),
                });
            }
        }

        let domain = row.get("Domain")?.to_string();
        let base_domain = row.get("Base Domain")?.to_string();

        // Malformed field values are fatal for the run: the upstream feed
        // is expected to satisfy the data-quality contract.
        let fields = self.feed.coerce_fields(row)?;

        let agency_name = self.ownership.owner_of(&base_domain);
        let resolution = self.resolver.resolve(agency_name).await;

        let doc = ScanDocument {
            is_base_domain: domain == base_domain,
            domain: domain.clone(),
            base_domain,
            agency: AgencyRef {
                id: resolution.id,
                name: resolution.name,
            },
            cyhy_stakeholder: None,
            fields,
            // Stamped by the publisher
            scan_date: publisher.scan_date(),
            latest: false,
        };

        match publisher.publish(doc).await? {
            PublishOutcome::Published => Ok(RecordOutcome::Published),
            PublishOutcome::Unacknowledged => Ok(RecordOutcome::Failed {
                reason: format!(
                    "write for {} not acknowledged by {}",
                    domain,
                    publisher.location()
                ),
            }),
        }
    }
}

impl RunSummary {
    /// Operator-facing summary lines, printed by the binary.
    pub fn print(&self) {
        println!(
            "Successfully imported {} documents to \"{}\" database on {}",
            self.processed, self.location.database, self.location.host
        );
        if self.skipped > 0 {
            println!("Skipped {} unscanned rows", self.skipped);
        }
        if let Some(deleted) = self.deleted {
            println!(
                "Deleted {} old records from \"{}\" database on {}",
                deleted, self.location.database, self.location.host
            );
        }
        if !self.failures.is_empty() {
            println!("{} records failed to publish:", self.failures.len());
            for failure in &self.failures {
                println!("  - {}", failure);
            }
        }
    }
}
