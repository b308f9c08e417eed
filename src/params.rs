// 🧭 Parameter Resolver
//
// Raw request parameters arrive as strings. Everything here normalizes them
// into typed values and NEVER fails: unknown, malformed or out-of-range input
// resolves to the documented default (or to "absent").

use crate::entities::TeamRegistry;
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Longest search string kept after normalization
pub const MAX_SEARCH_CHARS: usize = 80;

// ============================================================================
// RAW PARAMS
// ============================================================================

/// Query-string style key/value pairs, exactly as the caller supplied them
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawParams {
    values: BTreeMap<String, String>,
}

impl RawParams {
    pub fn new() -> Self {
        RawParams::default()
    }

    /// Parse `a=b&c=d` (percent-encoded, `+` as space).
    /// Pairs without `=` become empty values; undecodable text is kept as-is.
    pub fn from_query_string(query: &str) -> Self {
        let query = query.trim_start_matches('?');

        query
            .split('&')
            .filter(|pair| !pair.is_empty())
            .map(|pair| {
                let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
                (decode_component(key), decode_component(value))
            })
            .collect()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    /// Trimmed value, `None` when missing or blank
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values
            .get(key)
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RawParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = RawParams::new();
        for (key, value) in iter {
            params.insert(key, value);
        }
        params
    }
}

fn decode_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    match urlencoding::decode(&spaced) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => spaced,
    }
}

// ============================================================================
// WHITELISTED ENUMS
// ============================================================================

/// An enumeration selectable by request parameter.
///
/// `VARIANTS` lists `(param value, variant, label)` in display order.
pub trait ParamEnum: Copy + PartialEq + Default + 'static {
    const VARIANTS: &'static [(&'static str, Self, &'static str)];

    /// Case-insensitive lookup; anything unrecognized is the default
    fn from_param(raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            return Self::default();
        };
        let wanted = raw.trim().to_ascii_lowercase();

        Self::VARIANTS
            .iter()
            .find(|(key, _, _)| *key == wanted)
            .map(|(_, variant, _)| *variant)
            .unwrap_or_default()
    }

    fn as_param(self) -> &'static str {
        Self::VARIANTS
            .iter()
            .find(|(_, variant, _)| *variant == self)
            .map(|(key, _, _)| *key)
            .unwrap_or_default()
    }

    fn label(self) -> &'static str {
        Self::VARIANTS
            .iter()
            .find(|(_, variant, _)| *variant == self)
            .map(|(_, _, label)| *label)
            .unwrap_or_default()
    }

    fn is_default(self) -> bool {
        self == Self::default()
    }
}

// ============================================================================
// SCALAR RESOLVERS
// ============================================================================

/// Positive integer identifier; non-numeric, zero or negative input is absent
pub fn positive_id(raw: Option<&str>) -> Option<i64> {
    let raw = raw?.trim();
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse::<i64>().ok().filter(|id| *id > 0)
}

/// Integer within `min..=max`, otherwise absent
pub fn bounded_int(raw: Option<&str>, min: i64, max: i64) -> Option<i64> {
    raw?.trim()
        .parse::<i64>()
        .ok()
        .filter(|value| (min..=max).contains(value))
}

/// Franchise code from the team registry
pub fn team_code(raw: Option<&str>) -> Option<String> {
    TeamRegistry::new()
        .normalize_code(raw?)
        .map(str::to_string)
}

/// Free-text search: trimmed, inner whitespace collapsed, length capped
pub fn search_text(raw: Option<&str>) -> Option<String> {
    let collapsed = raw?.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        return None;
    }
    Some(collapsed.chars().take(MAX_SEARCH_CHARS).collect())
}

/// ISO calendar date (`YYYY-MM-DD`)
pub fn date(raw: Option<&str>) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw?.trim(), "%Y-%m-%d").ok()
}

pub fn flag(raw: Option<&str>) -> bool {
    matches!(
        raw.map(|r| r.trim().to_ascii_lowercase()).as_deref(),
        Some("1" | "true" | "yes" | "on")
    )
}

// ============================================================================
// TESTS
// ============================================================================
