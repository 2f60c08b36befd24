//! Canonicalization of free-text agency names into the join key used by
//! the resolver and the domain ownership index.

/// Normalize a raw agency name into its canonical join-key form.
///
/// The replacements are applied in a fixed order; later replacements see
/// the output of earlier ones. Surrounding whitespace is left untouched
/// beyond what the replacements themselves imply.
pub fn normalize_agency_name(raw: &str) -> String {
    raw.replace('&', "and")
        .replace('/', " ")
        .replace("U. S.", "U.S.")
        .replace(',', "")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replacement_order() {
        assert_eq!(
            normalize_agency_name("Housing & Urban Development"),
            "Housing and Urban Development"
        );
        assert_eq!(
            normalize_agency_name("Education/Training"),
            "Education Training"
        );
        assert_eq!(normalize_agency_name("U. S. Courts"), "U.S. Courts");
        assert_eq!(
            normalize_agency_name("Justice, Department of"),
            "Justice Department of"
        );
    }

    #[test]
    fn test_all_replacements_compose() {
        assert_eq!(
            normalize_agency_name("U. S. Fish & Wildlife, Interior/Parks"),
            "U.S. Fish and Wildlife Interior Parks"
        );
    }

    #[test]
    fn test_idempotent() {
        let inputs = [
            "Department of Example",
            "U. S. Agency for Global Media",
            "Health & Human Services",
            "A/B, C & D",
            "",
        ];
        for raw in inputs {
            let once = normalize_agency_name(raw);
            assert_eq!(normalize_agency_name(&once), once);
        }
    }

    #[test]
    fn test_empty_and_untouched_strings() {
        assert_eq!(normalize_agency_name(""), "");
        assert_eq!(
            normalize_agency_name("General Services Administration"),
            "General Services Administration"
        );
    }
}
