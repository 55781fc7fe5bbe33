//! Character encoding normalization for fetched pages.
//!
//! Most pages are UTF-8, but some are still generated in the legacy
//! Cyrillic codepage and say so in their `<meta>` charset declaration. A
//! page is first read as UTF-8; if the text then contains the legacy
//! declaration, the original bytes are decoded again as Windows-1251.

use crate::api::PageFetcher;
use crate::utils::truncate_for_log;
use encoding_rs::WINDOWS_1251;
use tracing::{debug, instrument, warn};

/// Substring whose presence marks a page as Windows-1251 encoded.
pub const LEGACY_CHARSET_MARKER: &str = "charset=windows-1251\"";

/// Decode a page body to Unicode text.
pub fn normalize(raw: &[u8]) -> String {
    let text = String::from_utf8_lossy(raw);
    if text.contains(LEGACY_CHARSET_MARKER) {
        let (decoded, _, had_errors) = WINDOWS_1251.decode(raw);
        if had_errors {
            debug!("Windows-1251 decode replaced malformed bytes");
        }
        return decoded.into_owned();
    }
    text.into_owned()
}

/// Decode a page and rewrite its legacy charset declaration to UTF-8.
///
/// The result can be saved and parsed later without knowing the original
/// encoding.
pub fn to_utf8_page(raw: &[u8]) -> String {
    normalize(raw).replace(
        LEGACY_CHARSET_MARKER.trim_end_matches('"'),
        "charset=utf-8",
    )
}

/// Fetch a page and decode it.
///
/// Returns `None` when the fetch fails or the page is empty; callers treat
/// that as "source unavailable".
#[instrument(level = "info", skip(fetcher))]
pub async fn fetch_text<F: PageFetcher>(fetcher: &F, url: &str) -> Option<String> {
    match fetcher.fetch(url).await {
        Ok(raw) => {
            let text = normalize(&raw);
            if text.is_empty() {
                warn!(%url, "Fetched page is empty");
                return None;
            }
            debug!(%url, preview = %truncate_for_log(&text, 200), "Decoded page");
            Some(text)
        }
        Err(e) => {
            warn!(%url, error = %e, "Page fetch failed");
            None
        }
    }
}
