//! Best-effort peer location derived from the connecting address.

use serde::{Deserialize, Serialize};

/// Country code used when nothing better is known.
pub const UNKNOWN_COUNTRY_CODE: &str = "XX";

/// Flag token shown for unknown or unrecognised countries.
pub const UNKNOWN_FLAG: &str = "🌍";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub country: String,
    pub country_code: String,
    pub flag: String,
    pub city: String,
    pub region: String,
}

impl Location {
    /// Fallback for failed or not-yet-finished lookups.
    pub fn unknown() -> Self {
        Self {
            country: "Unknown".into(),
            country_code: UNKNOWN_COUNTRY_CODE.into(),
            flag: UNKNOWN_FLAG.into(),
            city: "Unknown".into(),
            region: "Unknown".into(),
        }
    }

    /// Build a location from provider fields, deriving the flag from the code.
    /// Missing city/region collapse to "Unknown".
    pub fn new(
        country: impl Into<String>,
        country_code: impl Into<String>,
        city: Option<String>,
        region: Option<String>,
    ) -> Self {
        let country_code = country_code.into().to_ascii_uppercase();
        Self {
            country: country.into(),
            flag: flag_for(&country_code),
            country_code,
            city: non_empty_or_unknown(city),
            region: non_empty_or_unknown(region),
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.country_code == UNKNOWN_COUNTRY_CODE
    }
}

impl Default for Location {
    fn default() -> Self {
        Self::unknown()
    }
}

fn non_empty_or_unknown(value: Option<String>) -> String {
    match value {
        Some(v) if !v.trim().is_empty() => v,
        _ => "Unknown".into(),
    }
}

/// Map an ISO 3166-1 alpha-2 code to its regional-indicator flag.
pub fn flag_for(country_code: &str) -> String {
    let code = country_code.trim();
    if code.len() != 2
        || !code.chars().all(|c| c.is_ascii_alphabetic())
        || code.eq_ignore_ascii_case(UNKNOWN_COUNTRY_CODE)
    {
        return UNKNOWN_FLAG.into();
    }
    code.to_ascii_uppercase()
        .chars()
        .filter_map(|c| char::from_u32(0x1F1E6 + (c as u32 - 'A' as u32)))
        .collect()
}
