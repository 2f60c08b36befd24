//! The SLD-mapping job: one document per current-federal second-level
//! domain, carrying the owning agency and stakeholder status. Uses the
//! upsert-plus-reconcile publish variant, so reruns with unchanged input
//! are idempotent.

use crate::agency::AgencyResolver;
use crate::error::Result;
use crate::ownership::DomainOwnershipIndex;
use crate::pipeline::RunSummary;
use crate::publish::{PublishOutcome, PublishStrategy, SnapshotPublisher};
use crate::store::{AgencyRef, ScanCollection, ScanDocument};
use chrono::Utc;
use std::collections::BTreeMap;
use tracing::{info, instrument};

pub const COLLECTION: &str = "domains";

/// Build and publish the domain → agency mapping collection.
#[instrument(skip_all)]
pub async fn run(
    ownership: &DomainOwnershipIndex,
    resolver: &AgencyResolver,
    collection: &dyn ScanCollection,
) -> Result<RunSummary> {
    // The reconcile phase matches on this exact instant, so it is not
    // truncated to the day like the feed snapshots.
    let scan_date = Utc::now();
    let publisher =
        SnapshotPublisher::new(collection, PublishStrategy::UpsertByDomain, scan_date);

    publisher.invalidate_previous().await?;

    println!(
        "Importing to \"{}\" database on {}...",
        collection.location().database,
        collection.location().host
    );

    let mut summary = RunSummary {
        job: "sld-mapping".to_string(),
        location: collection.location().clone(),
        processed: 0,
        skipped: 0,
        failures: Vec::new(),
        deleted: None,
    };

    for entry in ownership.entries() {
        let resolution = resolver.resolve(&entry.agency_name).await;
        let doc = ScanDocument {
            domain: entry.domain.clone(),
            base_domain: entry.domain.clone(),
            is_base_domain: true,
            agency: AgencyRef {
                id: resolution.id,
                name: resolution.name,
            },
            cyhy_stakeholder: Some(resolution.is_stakeholder),
            fields: BTreeMap::new(),
            scan_date,
            latest: false,
        };

        match publisher.publish(doc).await? {
            PublishOutcome::Published => summary.processed += 1,
            PublishOutcome::Unacknowledged => summary.failures.push(format!(
                "write for {} not acknowledged by {}",
                entry.domain,
                collection.location()
            )),
        }
    }

    summary.deleted = publisher.reconcile().await?;

    info!(
        processed = summary.processed,
        deleted = summary.deleted.unwrap_or(0),
        "SLD mapping run complete"
    );
    Ok(summary)
}
