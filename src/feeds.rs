//! Per-feed definitions: target collection, column schema, publish
//! strategy, and the feed-specific field post-processing.

use crate::coerce::{coerce_field, FieldType, RawRow};
use crate::error::Result;
use crate::publish::PublishStrategy;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// One feed column: the CSV header it is read from, the document field it
/// lands in, and the type it is coerced to.
#[derive(Debug, Clone, Copy)]
pub struct ColumnSpec {
    pub column: &'static str,
    pub field: &'static str,
    pub ty: FieldType,
}

const fn col(column: &'static str, field: &'static str, ty: FieldType) -> ColumnSpec {
    ColumnSpec { column, field, ty }
}

/// A scan-result feed and everything needed to load it.
#[derive(Debug, Clone, Copy)]
pub struct Feed {
    pub name: &'static str,
    /// Target collection in the scan database
    pub collection: &'static str,
    /// Results file name under the shared artifacts directory
    pub results_file: &'static str,
    pub columns: &'static [ColumnSpec],
    /// Columns consumed by post-processing rather than the schema table
    pub extra_columns: &'static [&'static str],
    /// When set, rows with this column empty were excluded from the scan
    /// upstream and are skipped wholesale.
    pub required_scan_column: Option<&'static str>,
    pub strategy: PublishStrategy,
}

/// An rua/ruf entry split into its URI and modifier, per RFC 7489 §6.2.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportUri {
    pub uri: String,
    pub modifier: Option<String>,
}

impl Feed {
    /// Every CSV column this feed reads; the header is validated against
    /// this set before any row is processed.
    pub fn required_columns(&self) -> Vec<&'static str> {
        let mut columns = vec!["Domain", "Base Domain"];
        columns.extend(self.columns.iter().map(|spec| spec.column));
        columns.extend(self.extra_columns.iter().copied());
        if let Some(column) = self.required_scan_column {
            if !columns.contains(&column) {
                columns.push(column);
            }
        }
        columns
    }

    /// Coerce a row's feed-specific columns into typed document fields.
    pub fn coerce_fields(&self, row: &RawRow) -> Result<BTreeMap<String, Value>> {
        let mut fields = BTreeMap::new();
        for spec in self.columns {
            let raw = row.get(spec.column)?;
            let value = coerce_field(spec.column, raw, spec.ty)?;
            fields.insert(spec.field.to_string(), value.into_json());
        }
        self.post_process(row, &mut fields)?;
        Ok(fields)
    }

    fn post_process(&self, row: &RawRow, fields: &mut BTreeMap<String, Value>) -> Result<()> {
        match self.name {
            "https" => {
                // The raw HSTS header may itself contain the delimiter
                // used downstream; strip it.
                if let Some(Value::String(header)) = fields.get_mut("hsts_header") {
                    *header = header.replace(';', "");
                }
            }
            "mail" => {
                let ruas = split_report_uris(row.get("DMARC Aggregate Report URIs")?);
                let rufs = split_report_uris(row.get("DMARC Forensic Report URIs")?);
                fields.insert(
                    "aggregate_report_uris".to_string(),
                    serde_json::to_value(ruas).unwrap_or(Value::Null),
                );
                fields.insert(
                    "forensic_report_uris".to_string(),
                    serde_json::to_value(rufs).unwrap_or(Value::Null),
                );
            }
            _ => {}
        }
        Ok(())
    }
}

/// Split a comma-separated rua/ruf column into URI/modifier pairs,
/// dropping empty entries.
fn split_report_uris(raw: &str) -> Vec<ReportUri> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| match entry.split_once('!') {
            Some((uri, modifier)) => ReportUri {
                uri: uri.to_string(),
                modifier: Some(modifier.to_string()),
            },
            None => ReportUri {
                uri: entry.to_string(),
                modifier: None,
            },
        })
        .collect()
}

/// HTTPS configuration posture feed (pshtt output).
pub const HTTPS: Feed = Feed {
    name: "https",
    collection: "https_scan",
    results_file: "pshtt.csv",
    columns: &[
        col("Canonical URL", "canonical_url", FieldType::Text),
        col("Live", "live", FieldType::Boolean),
        col("Redirect", "redirect", FieldType::Boolean),
        col("Redirect To", "redirect_to", FieldType::Text),
        col("Valid HTTPS", "valid_https", FieldType::Boolean),
        col("Defaults to HTTPS", "defaults_https", FieldType::Boolean),
        col("Downgrades HTTPS", "downgrades_https", FieldType::Boolean),
        col("Strictly Forces HTTPS", "strictly_forces_https", FieldType::Boolean),
        col("HTTPS Bad Chain", "https_bad_chain", FieldType::Boolean),
        col("HTTPS Bad Hostname", "https_bad_hostname", FieldType::Boolean),
        col("HTTPS Expired Cert", "https_expired_cert", FieldType::Boolean),
        col("HTTPS Self Signed Cert", "https_self_signed_cert", FieldType::Boolean),
        col("HSTS", "hsts", FieldType::Boolean),
        col("HSTS Header", "hsts_header", FieldType::Text),
        col("HSTS Max Age", "hsts_max_age", FieldType::Integer),
        col("HSTS Entire Domain", "hsts_entire_domain", FieldType::Boolean),
        col("HSTS Preload Ready", "hsts_preload_ready", FieldType::Boolean),
        col("HSTS Preload Pending", "hsts_preload_pending", FieldType::Boolean),
        col("HSTS Preloaded", "hsts_preloaded", FieldType::Boolean),
        col(
            "Base Domain HSTS Preloaded",
            "hsts_base_domain_preloaded",
            FieldType::Boolean,
        ),
        col("Domain Supports HTTPS", "domain_supports_https", FieldType::Boolean),
        col("Domain Enforces HTTPS", "domain_enforces_https", FieldType::Boolean),
        col("Domain Uses Strong HSTS", "domain_uses_strong_hsts", FieldType::Boolean),
        col("Unknown Error", "unknown_error", FieldType::Boolean),
    ],
    extra_columns: &[],
    required_scan_column: None,
    strategy: PublishStrategy::InsertLatest,
};

/// TLS/certificate posture feed (sslyze output).
pub const TLS: Feed = Feed {
    name: "tls",
    collection: "sslyze_scan",
    results_file: "sslyze.csv",
    columns: &[
        col("Scanned Hostname", "scanned_hostname", FieldType::Text),
        col("Scanned Port", "scanned_port", FieldType::Integer),
        col("STARTTLS SMTP", "starttls_smtp", FieldType::Boolean),
        col("SSLv2", "sslv2", FieldType::Boolean),
        col("SSLv3", "sslv3", FieldType::Boolean),
        col("TLSv1.0", "tlsv1_0", FieldType::Boolean),
        col("TLSv1.1", "tlsv1_1", FieldType::Boolean),
        col("TLSv1.2", "tlsv1_2", FieldType::Boolean),
        col("TLSv1.3", "tlsv1_3", FieldType::Boolean),
        col("Any Forward Secrecy", "any_forward_secrecy", FieldType::Boolean),
        col("All Forward Secrecy", "all_forward_secrecy", FieldType::Boolean),
        col("Any RC4", "any_rc4", FieldType::Boolean),
        col("All RC4", "all_rc4", FieldType::Boolean),
        col("Any 3DES", "any_3des", FieldType::Boolean),
        col("Key Type", "key_type", FieldType::Text),
        col("Key Length", "key_length", FieldType::Integer),
        col("Signature Algorithm", "signature_algorithm", FieldType::Text),
        col("SHA-1 in Served Chain", "sha1_in_served_chain", FieldType::Boolean),
        col(
            "SHA-1 in Constructed Chain",
            "sha1_in_constructed_chain",
            FieldType::Boolean,
        ),
        col("Not Before", "not_before", FieldType::Timestamp),
        col("Not After", "not_after", FieldType::Timestamp),
        col("Highest Served Issuer", "highest_served_issuer", FieldType::Text),
        col(
            "Highest Constructed Issuer",
            "highest_constructed_issuer",
            FieldType::Text,
        ),
        col("Is Symantec Cert", "is_symantec_cert", FieldType::Boolean),
        col("Symantec Distrust Date", "symantec_distrust_date", FieldType::Text),
        col("Errors", "errors", FieldType::Text),
    ],
    extra_columns: &[],
    // Rows for domains with no web or mail servers carry null data and an
    // empty scanned port; they were never scanned.
    required_scan_column: Some("Scanned Port"),
    strategy: PublishStrategy::InsertLatest,
};

/// Email-authentication posture feed (trustymail output).
pub const MAIL: Feed = Feed {
    name: "mail",
    collection: "trustymail",
    results_file: "trustymail.csv",
    columns: &[
        col("Live", "live", FieldType::Boolean),
        col("MX Record", "mx_record", FieldType::Boolean),
        col("Mail Servers", "mail_servers", FieldType::Text),
        col("Mail Server Ports Tested", "mail_server_ports_tested", FieldType::Text),
        col("Domain Supports SMTP", "domain_supports_smtp", FieldType::Boolean),
        col(
            "Domain Supports SMTP Results",
            "domain_supports_smtp_results",
            FieldType::Text,
        ),
        col("Domain Supports STARTTLS", "domain_supports_starttls", FieldType::Boolean),
        col(
            "Domain Supports STARTTLS Results",
            "domain_supports_starttls_results",
            FieldType::Text,
        ),
        col("SPF Record", "spf_record", FieldType::Boolean),
        col("Valid SPF", "valid_spf", FieldType::Boolean),
        col("SPF Results", "spf_results", FieldType::Text),
        col("DMARC Record", "dmarc_record", FieldType::Boolean),
        col("Valid DMARC", "valid_dmarc", FieldType::Boolean),
        col("DMARC Results", "dmarc_results", FieldType::Text),
        col("DMARC Record on Base Domain", "dmarc_record_base_domain", FieldType::Boolean),
        col(
            "Valid DMARC Record on Base Domain",
            "valid_dmarc_base_domain",
            FieldType::Boolean,
        ),
        col(
            "DMARC Results on Base Domain",
            "dmarc_results_base_domain",
            FieldType::Text,
        ),
        col("DMARC Policy", "dmarc_policy", FieldType::Text),
        col("DMARC Subdomain Policy", "dmarc_subdomain_policy", FieldType::Text),
        col("DMARC Policy Percentage", "dmarc_policy_percentage", FieldType::Integer),
        col(
            "DMARC Has Aggregate Report URI",
            "has_aggregate_report_uri",
            FieldType::Boolean,
        ),
        col(
            "DMARC Has Forensic Report URI",
            "has_forensic_report_uri",
            FieldType::Boolean,
        ),
        col("Syntax Errors", "syntax_errors", FieldType::Text),
        col("Debug Info", "debug_info", FieldType::Text),
    ],
    extra_columns: &["DMARC Aggregate Report URIs", "DMARC Forensic Report URIs"],
    required_scan_column: None,
    strategy: PublishStrategy::InsertLatest,
};

pub const ALL_FEEDS: &[&Feed] = &[&HTTPS, &TLS, &MAIL];

/// Look up a feed by its CLI name.
pub fn feed_by_name(name: &str) -> Option<&'static Feed> {
    ALL_FEEDS.iter().copied().find(|feed| feed.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_split_report_uris() {
        let uris = split_report_uris("mailto:reports@example.gov!10m, mailto:two@example.gov");
        assert_eq!(
            uris,
            vec![
                ReportUri {
                    uri: "mailto:reports@example.gov".to_string(),
                    modifier: Some("10m".to_string()),
                },
                ReportUri {
                    uri: "mailto:two@example.gov".to_string(),
                    modifier: None,
                },
            ]
        );
        assert!(split_report_uris("").is_empty());
    }

    #[test]
    fn test_https_post_process_strips_hsts_header_delimiters() {
        let mut raw = HashMap::new();
        for spec in HTTPS.columns {
            raw.insert(spec.column.to_string(), String::new());
        }
        raw.insert(
            "HSTS Header".to_string(),
            "max-age=31536000; includeSubDomains; preload".to_string(),
        );
        let row = RawRow::new(raw);

        let fields = HTTPS.coerce_fields(&row).unwrap();
        assert_eq!(
            fields["hsts_header"],
            serde_json::json!("max-age=31536000 includeSubDomains preload")
        );
    }

    #[test]
    fn test_required_columns_include_extras() {
        let columns = MAIL.required_columns();
        assert!(columns.contains(&"Domain"));
        assert!(columns.contains(&"DMARC Aggregate Report URIs"));

        let columns = TLS.required_columns();
        assert!(columns.contains(&"Scanned Port"));
    }

    #[test]
    fn test_feed_by_name() {
        assert_eq!(feed_by_name("https").unwrap().collection, "https_scan");
        assert_eq!(feed_by_name("tls").unwrap().collection, "sslyze_scan");
        assert_eq!(feed_by_name("mail").unwrap().collection, "trustymail");
        assert!(feed_by_name("dns").is_none());
    }
}
