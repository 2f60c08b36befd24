//! Domain → owning-agency association built from the current-federal
//! reference extract.

use crate::agency::normalize_agency_name;
use crate::error::{Result, SaverError};
use csv::{Reader, Writer};
use std::collections::BTreeSet;
use std::path::Path;
use tracing::info;

/// One `(domain, agency)` association as read from the reference extract.
#[derive(Debug, Clone)]
pub struct DomainOwnership {
    /// Lower-cased base domain, the lookup key
    pub domain: String,
    /// Agency name after normalization
    pub agency_name: String,
}

/// In-memory index of base domain → normalized agency name.
///
/// Entries are kept in read order and lookup takes the first match, so a
/// domain listed twice resolves to its earliest row.
pub struct DomainOwnershipIndex {
    entries: Vec<DomainOwnership>,
    /// Rows as read (original-case domain, normalized agency), kept for
    /// the clean-current-federal artifact.
    clean_rows: Vec<(String, String)>,
}

impl DomainOwnershipIndex {
    /// Build the index from the current-federal extract. The extract has
    /// a header row with `Domain Name` and `Agency` columns; access is by
    /// name, never position.
    pub fn load(path: &Path) -> Result<Self> {
        let mut reader = Reader::from_path(path)?;

        let headers = reader.headers()?.clone();
        let domain_idx = column_index(&headers, "Domain Name")?;
        let agency_idx = column_index(&headers, "Agency")?;

        let mut entries = Vec::new();
        let mut clean_rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            let domain = record.get(domain_idx).unwrap_or_default().to_string();
            let agency_name =
                normalize_agency_name(record.get(agency_idx).unwrap_or_default());

            entries.push(DomainOwnership {
                domain: domain.to_lowercase(),
                agency_name: agency_name.clone(),
            });
            clean_rows.push((domain, agency_name));
        }

        info!(entries = entries.len(), "loaded domain ownership index");
        Ok(Self { entries, clean_rows })
    }

    /// Look up the owning agency for a scanned base domain. Returns the
    /// empty string when no association exists; absence is not an error.
    pub fn owner_of(&self, scanned_base_domain: &str) -> &str {
        self.entries
            .iter()
            .find(|entry| entry.domain == scanned_base_domain)
            .map(|entry| entry.agency_name.as_str())
            .unwrap_or("")
    }

    pub fn entries(&self) -> &[DomainOwnership] {
        &self.entries
    }

    /// Deduplicated agency names observed after normalization, for
    /// operator review of the mapping tables.
    pub fn unique_agencies(&self) -> BTreeSet<&str> {
        self.clean_rows
            .iter()
            .map(|(_, agency)| agency.as_str())
            .collect()
    }

    /// Write the unique-agencies and clean-current-federal artifacts for
    /// review and reuse by later stages.
    pub fn write_artifacts(
        &self,
        unique_agencies_path: &Path,
        clean_current_federal_path: &Path,
    ) -> Result<()> {
        let mut unique_writer = Writer::from_path(unique_agencies_path)?;
        for agency in self.unique_agencies() {
            unique_writer.write_record([agency])?;
        }
        unique_writer.flush()?;

        let mut clean_writer = Writer::from_path(clean_current_federal_path)?;
        for (domain, agency) in &self.clean_rows {
            clean_writer.write_record([domain.as_str(), agency.as_str()])?;
        }
        clean_writer.flush()?;

        Ok(())
    }
}

fn column_index(headers: &csv::StringRecord, column: &str) -> Result<usize> {
    headers
        .iter()
        .position(|header| header == column)
        .ok_or_else(|| SaverError::MissingColumn(column.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn index_from(content: &str) -> DomainOwnershipIndex {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", content).unwrap();
        file.flush().unwrap();
        DomainOwnershipIndex::load(file.path()).unwrap()
    }

    #[test]
    fn test_owner_of_known_domain() {
        let index = index_from(
            "Domain Name,Agency\nEXAMPLE.GOV,Department of Example\n",
        );
        assert_eq!(index.owner_of("example.gov"), "Department of Example");
    }

    #[test]
    fn test_owner_of_unknown_domain_is_empty() {
        let index = index_from("Domain Name,Agency\nexample.gov,Department of Example\n");
        assert_eq!(index.owner_of("missing.gov"), "");
    }

    #[test]
    fn test_agency_names_are_normalized() {
        let index = index_from("Domain Name,Agency\nhud.gov,Housing & Urban Development\n");
        assert_eq!(index.owner_of("hud.gov"), "Housing and Urban Development");
    }

    #[test]
    fn test_first_match_wins() {
        let index = index_from(
            "Domain Name,Agency\nshared.gov,First Agency\nshared.gov,Second Agency\n",
        );
        assert_eq!(index.owner_of("shared.gov"), "First Agency");
    }

    #[test]
    fn test_missing_header_fails_fast() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "Domain,Agency\nexample.gov,Whatever\n").unwrap();
        file.flush().unwrap();
        assert!(DomainOwnershipIndex::load(file.path()).is_err());
    }

    #[test]
    fn test_unique_agencies_deduplicated() {
        let index = index_from(
            "Domain Name,Agency\na.gov,Dup Agency\nb.gov,Dup Agency\nc.gov,Other\n",
        );
        let unique: Vec<&str> = index.unique_agencies().into_iter().collect();
        assert_eq!(unique, vec!["Dup Agency", "Other"]);
    }
}
