//! Country normalisation for geo targeting

/// Worldwide marker: no geo restriction
pub const WORLDWIDE: &str = "WW";

const ISO_ALPHA2: &[&str] = &[
    "AD", "AE", "AF", "AG", "AI", "AL", "AM", "AO", "AQ", "AR", "AS", "AT", "AU", "AW", "AX", "AZ",
    "BA", "BB", "BD", "BE", "BF", "BG", "BH", "BI", "BJ", "BL", "BM", "BN", "BO", "BQ", "BR", "BS",
    "BT", "BV", "BW", "BY", "BZ", "CA", "CC", "CD", "CF", "CG", "CH", "CI", "CK", "CL", "CM", "CN",
    "CO", "CR", "CU", "CV", "CW", "CX", "CY", "CZ", "DE", "DJ", "DK", "DM", "DO", "DZ", "EC", "EE",
    "EG", "EH", "ER", "ES", "ET", "FI", "FJ", "FK", "FM", "FO", "FR", "GA", "GB", "GD", "GE", "GF",
    "GG", "GH", "GI", "GL", "GM", "GN", "GP", "GQ", "GR", "GS", "GT", "GU", "GW", "GY", "HK", "HM",
    "HN", "HR", "HT", "HU", "ID", "IE", "IL", "IM", "IN", "IO", "IQ", "IR", "IS", "IT", "JE", "JM",
    "JO", "JP", "KE", "KG", "KH", "KI", "KM", "KN", "KP", "KR", "KW", "KY", "KZ", "LA", "LB", "LC",
    "LI", "LK", "LR", "LS", "LT", "LU", "LV", "LY", "MA", "MC", "MD", "ME", "MF", "MG", "MH", "MK",
    "ML", "MM", "MN", "MO", "MP", "MQ", "MR", "MS", "MT", "MU", "MV", "MW", "MX", "MY", "MZ", "NA",
    "NC", "NE", "NF", "NG", "NI", "NL", "NO", "NP", "NR", "NU", "NZ", "OM", "PA", "PE", "PF", "PG",
    "PH", "PK", "PL", "PM", "PN", "PR", "PS", "PT", "PW", "PY", "QA", "RE", "RO", "RS", "RU", "RW",
    "SA", "SB", "SC", "SD", "SE", "SG", "SH", "SI", "SJ", "SK", "SL", "SM", "SN", "SO", "SR", "SS",
    "ST", "SV", "SX", "SY", "SZ", "TC", "TD", "TF", "TG", "TH", "TJ", "TK", "TL", "TM", "TN", "TO",
    "TR", "TT", "TV", "TW", "TZ", "UA", "UG", "UM", "US", "UY", "UZ", "VA", "VC", "VE", "VG", "VI",
    "VN", "VU", "WF", "WS", "YE", "YT", "ZA", "ZM", "ZW",
];

const COUNTRY_NAMES: &[(&str, &str)] = &[
    ("united kingdom", "GB"),
    ("great britain", "GB"),
    ("uk", "GB"),
    ("united states", "US"),
    ("usa", "US"),
    ("australia", "AU"),
    ("new zealand", "NZ"),
    ("canada", "CA"),
    ("ireland", "IE"),
    ("united arab emirates", "AE"),
    ("uae", "AE"),
    ("mexico", "MX"),
    ("germany", "DE"),
    ("spain", "ES"),
    ("italy", "IT"),
    ("chile", "CL"),
];

/// Resolve a country cell to an ISO alpha-2 code or `WW`.
///
/// Accepts codes in any case and the common English names above.
pub fn normalize_country(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    let upper = trimmed.to_uppercase();
    if upper == WORLDWIDE || ISO_ALPHA2.binary_search(&upper.as_str()).is_ok() {
        return Some(upper);
    }

    let lower = trimmed.to_lowercase();
    COUNTRY_NAMES
        .iter()
        .find(|(name, _)| *name == lower)
        .map(|(_, code)| code.to_string())
}

pub fn is_worldwide(code: &str) -> bool {
    code.eq_ignore_ascii_case(WORLDWIDE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_and_names() {
        assert_eq!(normalize_country("us").as_deref(), Some("US"));
        assert_eq!(normalize_country(" GB ").as_deref(), Some("GB"));
        assert_eq!(normalize_country("United Kingdom").as_deref(), Some("GB"));
        assert_eq!(normalize_country("UAE").as_deref(), Some("AE"));
        assert_eq!(normalize_country("ww").as_deref(), Some("WW"));
    }

    #[test]
    fn test_rejects_unknown() {
        assert_eq!(normalize_country(""), None);
        assert_eq!(normalize_country("XX"), None);
        assert_eq!(normalize_country("Atlantis"), None);
    }

    #[test]
    fn test_code_table_is_sorted() {
        assert!(ISO_ALPHA2.windows(2).all(|pair| pair[0] < pair[1]));
    }
}
