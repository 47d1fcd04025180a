use std::collections::BTreeMap;

use serde::Serialize;

use super::traits::{ConnectError, UpstreamSource};

#[derive(Debug, Serialize)]
pub struct ProbeReport {
    pub endpoint: String,
    pub reachable: bool,
    pub status: Option<u16>,
    pub headers: BTreeMap<String, String>,
    pub error: Option<String>,
}

/// One-shot connection check used by `--probe-upstream`.
pub async fn probe_upstream(source: &dyn UpstreamSource) -> ProbeReport {
    let mut report = ProbeReport {
        endpoint: source.endpoint().to_owned(),
        reachable: false,
        status: None,
        headers: BTreeMap::new(),
        error: None,
    };

    match source.connect().await {
        Ok(mut stream) => {
            report.reachable = true;
            report.status = Some(stream.status.as_u16());
            report.headers = stream
                .headers
                .iter()
                .map(|(name, value)| {
                    (
                        name.as_str().to_owned(),
                        String::from_utf8_lossy(value.as_bytes()).into_owned(),
                    )
                })
                .collect();
            // Runs before logging is set up, so a close failure goes into the report.
            if let Err(err) = stream.body.close().await {
                report.error = Some(format!("failed to close camera connection: {err}"));
            }
        }
        Err(ConnectError::UpstreamStatus(status)) => {
            report.reachable = true;
            report.status = Some(status.as_u16());
            report.error = Some(format!("camera responded with status {status}"));
        }
        Err(err @ ConnectError::Unreachable(_)) => {
            report.error = Some(err.to_string());
        }
    }

    report
}
