//! Endpoint URL construction
//!
//! The save endpoint embeds the origin URL verbatim in its path:
//! `<root>origin/save/<visit_type>/url/<origin_url>/`. The archive requires the
//! trailing slash, so origins are normalized before they are appended.

use crate::types::VisitType;

const ENDPOINT_SAVE: &str = "origin/save/";
const URL_PATH: &str = "/url/";
const ENDPOINT_PING: &str = "ping/";

/// Ensure `url` ends with exactly the slash the archive expects
///
/// Idempotent: normalizing an already normalized URL returns it unchanged.
pub fn normalize(url: &str) -> String {
    if url.ends_with('/') {
        url.to_string()
    } else {
        format!("{url}/")
    }
}

/// Save endpoint for `origin_url`, used for both submission and polling
pub fn save_url(api_root: &str, visit_type: VisitType, origin_url: &str) -> String {
    normalize(&format!(
        "{}{ENDPOINT_SAVE}{}{URL_PATH}{origin_url}",
        normalize(api_root),
        visit_type.as_str()
    ))
}

/// Quota probe endpoint
pub fn ping_url(api_root: &str) -> String {
    format!("{}{ENDPOINT_PING}", normalize(api_root))
}
