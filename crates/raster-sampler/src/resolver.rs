//! Raster reference resolution.
//!
//! Public Google Cloud Storage URLs (`https://storage.googleapis.com/<bucket>/<object>`)
//! are rewritten into the JSON API media form, which streams the object bytes
//! directly and honours range requests.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

const GCS_HOST: &str = "storage.googleapis.com";
const GCS_PREFIX: &str = "https://storage.googleapis.com/";

/// Characters left as-is when encoding an object name (everything else,
/// including `/`, is escaped).
const OBJECT_NAME: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Resolve a raster reference into a directly fetchable URL.
///
/// References that are not public GCS object URLs, or that already use the
/// `/o/` media form, are returned unchanged.
pub fn resolve_raster_url(url: &str) -> String {
    if !url.contains(GCS_HOST) || url.contains("/o/") {
        return url.to_string();
    }

    let Some(bucket_object) = url.strip_prefix(GCS_PREFIX) else {
        return url.to_string();
    };

    let Some((bucket, object)) = bucket_object.split_once('/') else {
        return url.to_string();
    };

    if bucket.is_empty() {
        return url.to_string();
    }

    let object = utf8_percent_encode(object, OBJECT_NAME);
    format!("https://storage.googleapis.com/download/storage/v1/b/{bucket}/o/{object}?alt=media")
}
