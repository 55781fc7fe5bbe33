//! Site health probe.
//!
//! Times one GET request to the site's landing page. The clock stops when
//! the response headers arrive; the body is never read.

use crate::models::ProbeResult;
use reqwest::Client;
use std::time::Instant;
use tracing::{info, instrument, warn};

/// Time a request to `url`.
///
/// A transport failure is reported as status `-1` with the error text;
/// the elapsed time up to the failure is still recorded.
#[instrument(level = "info", skip(client))]
pub async fn probe(client: &Client, url: &str) -> ProbeResult {
    let t0 = Instant::now();
    let result = client.get(url).send().await;
    let elapsed_ms = t0.elapsed().as_millis() as u64;

    match result {
        Ok(response) => {
            let status = response.status();
            info!(status = status.as_u16(), elapsed_ms, "Site responded");
            ProbeResult {
                status: i32::from(status.as_u16()),
                message: status.canonical_reason().unwrap_or_default().to_string(),
                elapsed_ms,
            }
        }
        Err(e) => {
            warn!(error = %e, elapsed_ms, "Site unreachable");
            ProbeResult {
                status: -1,
                message: e.to_string(),
                elapsed_ms,
            }
        }
    }
}
