//! Agency name handling: normalization into a canonical join key,
//! reference-table loading, and canonical-id resolution.

pub mod normalizer;
pub mod resolver;

pub use normalizer::normalize_agency_name;
pub use resolver::{AgencyResolver, Resolution, StakeholderRegistry};

use crate::error::Result;
use csv::ReaderBuilder;
use std::collections::HashMap;
use std::path::Path;

/// Load the headerless `(agency name, canonical id)` reference table.
pub fn load_agency_mapping(path: &Path) -> Result<HashMap<String, String>> {
    let mut mapping = HashMap::new();
    for row in two_column_rows(path)? {
        let (name, id) = row?;
        mapping.insert(name, id);
    }
    Ok(mapping)
}

/// Load the headerless `(trigger substring, replacement)` rewrite table.
/// Row order is preserved; it drives the order rewrites are applied in.
pub fn load_rewrites(path: &Path) -> Result<Vec<(String, String)>> {
    two_column_rows(path)?.collect()
}

/// Load the headerless `(name, override name)` non-stakeholder table.
pub fn load_non_stakeholder_overrides(path: &Path) -> Result<HashMap<String, String>> {
    let mut overrides = HashMap::new();
    for row in two_column_rows(path)? {
        let (name, override_name) = row?;
        overrides.insert(name, override_name);
    }
    Ok(overrides)
}

fn two_column_rows(
    path: &Path,
) -> Result<impl Iterator<Item = Result<(String, String)>>> {
    let reader = ReaderBuilder::new().has_headers(false).from_path(path)?;
    Ok(reader.into_records().map(|record| {
        let record = record?;
        let first = record.get(0).unwrap_or_default().to_string();
        let second = record.get(1).unwrap_or_default().to_string();
        Ok((first, second))
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_agency_mapping() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "Department of Example,DOE").unwrap();
        writeln!(file, "General Services Administration,GSA").unwrap();
        file.flush().unwrap();

        let mapping = load_agency_mapping(file.path()).unwrap();
        assert_eq!(mapping.len(), 2);
        assert_eq!(mapping["Department of Example"], "DOE");
    }

    #[test]
    fn test_load_rewrites_preserves_order() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "Dept,Department").unwrap();
        writeln!(file, "Department of Ex.,Department of Example").unwrap();
        file.flush().unwrap();

        let rewrites = load_rewrites(file.path()).unwrap();
        assert_eq!(rewrites[0].0, "Dept");
        assert_eq!(rewrites[1].1, "Department of Example");
    }
}
