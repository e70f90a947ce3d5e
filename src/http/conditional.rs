//! Conditional request module
//!
//! Strong `ETag` generation from the artifact content hash and `If-Range` evaluation.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tracing::debug;

/// Build the strong validator for an artifact
///
/// # Returns
/// Quoted `ETag` string, e.g., `"2cf24dba5fb0a30e"` (RFC 7232, section 2.3)
pub fn strong_etag(content_hash: &str) -> String {
    format!("\"{content_hash}\"")
}

/// Decide whether the requested ranges may be served
///
/// RFC 7233, section 3.2: "if the representation is unchanged, send me the
/// part(s) that I am requesting in Range; otherwise, send me the entire
/// representation."
///
/// # Arguments
/// * `if_range` - Client-sent If-Range header
/// * `etag` - Server strong validator (quoted)
/// * `last_modified` - Modification time of the artifact, if known
///
/// # Returns
/// Returns false if the full body must be sent instead of the ranges
pub fn if_range_applies(
    if_range: Option<&str>,
    etag: &str,
    last_modified: Option<SystemTime>,
) -> bool {
    let Some(token) = if_range else {
        return true;
    };

    if token == etag {
        return true;
    }

    match httpdate::parse_http_date(token) {
        Ok(date) => match last_modified {
            Some(modified) => date >= truncate_to_seconds(modified),
            None => true,
        },
        Err(e) => {
            debug!("Invalid If-Range header '{token}': {e}");
            false
        }
    }
}

/// HTTP dates have whole-second resolution
fn truncate_to_seconds(time: SystemTime) -> SystemTime {
    time.duration_since(UNIX_EPOCH)
        .map_or(time, |d| UNIX_EPOCH + Duration::from_secs(d.as_secs()))
}
