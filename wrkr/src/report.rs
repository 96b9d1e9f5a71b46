use std::time::Duration;

use bytes::Bytes;
use serde::Serialize;

/// Placeholder endpoint; there is no real backend behind this today.
const USAGE_REPORT_ENDPOINT: &str = "https://usage.wrkr.nogc.io/v1/report";

#[derive(Debug, Serialize)]
struct UsageReport {
    version: &'static str,
    vus_max: u64,
    duration_secs: Option<u64>,
    iterations: Option<u64>,
}

/// Fires a single best-effort POST at run start. Never blocks the run on failure or on the
/// network round-trip: the send happens on a detached task and errors are only `debug!`-logged.
pub(crate) fn send_usage_report(vus_max: u64, duration: Option<Duration>, iterations: Option<u64>) {
    let report = UsageReport {
        version: env!("CARGO_PKG_VERSION"),
        vus_max,
        duration_secs: duration.map(|d| d.as_secs()),
        iterations,
    };

    tokio::spawn(async move {
        let body = match serde_json::to_vec(&report) {
            Ok(b) => b,
            Err(err) => {
                tracing::debug!(%err, "failed to encode usage report");
                return;
            }
        };

        let client = wrkr_core::HttpClient::new(Some(Duration::from_secs(2)));
        let mut req = wrkr_core::HttpRequest::post_owned(USAGE_REPORT_ENDPOINT.to_string(), Bytes::from(body));
        req.timeout = Some(Duration::from_secs(2));

        if let Err(err) = client.request(req).await {
            tracing::debug!(%err, "usage report beacon failed");
        }
    });
}
