use serde::{de, Deserialize, Deserializer};
use std::{fmt, str::FromStr};

const MAX_PER_PAGE: u64 = 100;

/// Page number and size taken from the query string. Missing or zero values fall back to
/// the first page and the configured page size.
pub fn page_window(page: Option<u64>, per_page: Option<u64>, default_per_page: u64) -> (u64, u64) {
    let page = page.unwrap_or(1).max(1);
    let per_page = per_page
        .filter(|n| *n > 0)
        .unwrap_or(default_per_page)
        .clamp(1, MAX_PER_PAGE);
    (page, per_page)
}

/// Treats `?field=` like an absent parameter instead of a parse failure
pub fn empty_string_as_none<'de, D, T>(de: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: fmt::Display,
{
    let opt = Option::<String>::deserialize(de)?;
    match opt.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => FromStr::from_str(s).map_err(de::Error::custom).map(Some),
    }
}

/// Checkbox-style flag: `1`, `true`, `on` and `yes` are set, anything else is not
pub fn flag<'de, D>(de: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(de)?;
    Ok(matches!(
        opt.as_deref().map(|s| s.trim().to_ascii_lowercase()).as_deref(),
        Some("1" | "true" | "on" | "yes")
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct Probe {
        #[serde(default, deserialize_with = "empty_string_as_none")]
        asset_id: Option<i32>,
        #[serde(default, deserialize_with = "flag")]
        overdue: bool,
    }

    fn parse(query: &str) -> Result<Probe, String> {
        let uri: axum::http::Uri = format!("/items?{}", query).parse().unwrap();
        axum::extract::Query::<Probe>::try_from_uri(&uri)
            .map(|q| q.0)
            .map_err(|e| e.to_string())
    }

    fn probe(query: &str) -> Probe {
        parse(query).unwrap()
    }

    #[test]
    fn empty_values_are_absent() {
        let p = probe("asset_id=&overdue=");
        assert_eq!(p.asset_id, None);
        assert!(!p.overdue);
    }

    #[test]
    fn values_parse() {
        let p = probe("asset_id=7&overdue=on");
        assert_eq!(p.asset_id, Some(7));
        assert!(p.overdue);
        assert!(probe("overdue=1").overdue);
        assert!(!probe("overdue=0").overdue);
        assert!(!probe("").overdue);
    }

    #[test]
    fn bad_number_is_rejected() {
        assert!(parse("asset_id=abc").is_err());
    }

    #[test]
    fn page_window_defaults_and_clamps() {
        assert_eq!(page_window(None, None, 10), (1, 10));
        assert_eq!(page_window(Some(0), Some(0), 10), (1, 10));
        assert_eq!(page_window(Some(3), Some(500), 10), (3, 100));
    }
}
