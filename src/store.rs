//! The document-store seam. The real scan database is an external
//! collaborator; jobs talk to it through [`ScanCollection`] and tests and
//! development runs use [`InMemoryCollection`].

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Agency reference embedded in every scan document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgencyRef {
    pub id: String,
    pub name: String,
}

/// One normalized scan result as stored in a feed collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanDocument {
    pub domain: String,
    pub base_domain: String,
    pub is_base_domain: bool,
    pub agency: AgencyRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cyhy_stakeholder: Option<bool>,
    /// Feed-specific typed fields, keyed by document field name
    #[serde(flatten)]
    pub fields: BTreeMap<String, Value>,
    pub scan_date: DateTime<Utc>,
    /// Marks the most recent scan result for this domain in the
    /// collection
    pub latest: bool,
}

/// Acknowledgment of a single write or bulk update.
#[derive(Debug, Clone, Copy)]
pub struct WriteAck {
    pub acknowledged: bool,
}

/// Acknowledgment of a bulk delete, with the number of removed documents.
#[derive(Debug, Clone, Copy)]
pub struct DeleteAck {
    pub acknowledged: bool,
    pub deleted_count: u64,
}

/// Where a collection lives, for operator-facing messages and write
/// failure context.
#[derive(Debug, Clone)]
pub struct CollectionLocation {
    pub collection: String,
    pub database: String,
    pub host: String,
}

impl fmt::Display for CollectionLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "collection \"{}\" in \"{}\" database on {}",
            self.collection, self.database, self.host
        )
    }
}

/// Primitive operations the publish protocol needs from the document
/// store. Every operation reports an acknowledgment; deletes also report
/// a count.
#[async_trait]
pub trait ScanCollection: Send + Sync {
    fn location(&self) -> &CollectionLocation;

    /// Bulk-flip `latest: true` to `false` on every document.
    async fn mark_all_stale(&self) -> Result<WriteAck>;

    /// Insert a new document unconditionally.
    async fn insert(&self, doc: ScanDocument) -> Result<WriteAck>;

    /// Upsert keyed by domain with set semantics: replace the existing
    /// document for the domain or insert a new one.
    async fn upsert_by_domain(&self, doc: ScanDocument) -> Result<WriteAck>;

    /// Bulk-delete every document whose `scan_date` differs from the
    /// given run timestamp.
    async fn delete_where_scan_date_not(&self, scan_date: DateTime<Utc>)
        -> Result<DeleteAck>;
}

/// In-memory collection implementation for development/testing.
pub struct InMemoryCollection {
    location: CollectionLocation,
    documents: Arc<Mutex<Vec<ScanDocument>>>,
    acknowledge_writes: AtomicBool,
}

impl InMemoryCollection {
    pub fn new(collection: &str, database: &str, host: &str) -> Self {
        Self {
            location: CollectionLocation {
                collection: collection.to_string(),
                database: database.to_string(),
                host: host.to_string(),
            },
            documents: Arc::new(Mutex::new(Vec::new())),
            acknowledge_writes: AtomicBool::new(true),
        }
    }

    /// Snapshot of the stored documents, in insertion order.
    pub fn documents(&self) -> Vec<ScanDocument> {
        self.documents.lock().unwrap().clone()
    }

    /// Make subsequent writes report as unacknowledged, to exercise the
    /// failure paths.
    pub fn set_acknowledge_writes(&self, acknowledge: bool) {
        self.acknowledge_writes.store(acknowledge, Ordering::SeqCst);
    }

    fn acknowledged(&self) -> bool {
        self.acknowledge_writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ScanCollection for InMemoryCollection {
    fn location(&self) -> &CollectionLocation {
        &self.location
    }

    async fn mark_all_stale(&self) -> Result<WriteAck> {
        if !self.acknowledged() {
            return Ok(WriteAck { acknowledged: false });
        }

        let mut documents = self.documents.lock().unwrap();
        let mut flipped = 0;
        for doc in documents.iter_mut().filter(|doc| doc.latest) {
            doc.latest = false;
            flipped += 1;
        }

        debug!(collection = %self.location.collection, flipped, "marked documents stale");
        Ok(WriteAck { acknowledged: true })
    }

    async fn insert(&self, doc: ScanDocument) -> Result<WriteAck> {
        if !self.acknowledged() {
            return Ok(WriteAck { acknowledged: false });
        }

        let mut documents = self.documents.lock().unwrap();
        debug!(collection = %self.location.collection, domain = %doc.domain, "inserted document");
        documents.push(doc);
        Ok(WriteAck { acknowledged: true })
    }

    async fn upsert_by_domain(&self, doc: ScanDocument) -> Result<WriteAck> {
        if !self.acknowledged() {
            return Ok(WriteAck { acknowledged: false });
        }

        let mut documents = self.documents.lock().unwrap();
        match documents.iter_mut().find(|d| d.domain == doc.domain) {
            Some(existing) => {
                debug!(collection = %self.location.collection, domain = %doc.domain, "replaced document");
                *existing = doc;
            }
            None => {
                debug!(collection = %self.location.collection, domain = %doc.domain, "inserted document");
                documents.push(doc);
            }
        }
        Ok(WriteAck { acknowledged: true })
    }

    async fn delete_where_scan_date_not(
        &self,
        scan_date: DateTime<Utc>,
    ) -> Result<DeleteAck> {
        if !self.acknowledged() {
            return Ok(DeleteAck {
                acknowledged: false,
                deleted_count: 0,
            });
        }

        let mut documents = self.documents.lock().unwrap();
        let before = documents.len();
        documents.retain(|doc| doc.scan_date == scan_date);
        let deleted = (before - documents.len()) as u64;

        debug!(collection = %self.location.collection, deleted, "deleted stale documents");
        Ok(DeleteAck {
            acknowledged: true,
            deleted_count: deleted,
        })
    }
}
