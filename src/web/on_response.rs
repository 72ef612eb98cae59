use std::{fmt, time::Duration};

use axum::response::Response;

use tower_http::{LatencyUnit, trace::OnResponse};
use tracing::{Span, info, warn};

struct Latency {
    unit: LatencyUnit,
    duration: Duration,
}

impl fmt::Display for Latency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.unit {
            LatencyUnit::Seconds => write!(f, "{} s", self.duration.as_secs_f64()),
            LatencyUnit::Micros => write!(f, "{} μs", self.duration.as_micros()),
            LatencyUnit::Nanos => write!(f, "{} ns", self.duration.as_nanos()),
            _ => write!(f, "{} ms", self.duration.as_millis()),
        }
    }
}

/// Logs one line per API response with its status and latency.
///
/// Server errors are logged at `WARN` so a failed snapshot reload stands out.
#[derive(Clone, Debug)]
pub struct DefaultOnResponse {
    latency_unit: LatencyUnit,
    include_headers: bool,
}

impl Default for DefaultOnResponse {
    fn default() -> Self {
        Self {
            latency_unit: LatencyUnit::Millis,
            include_headers: false,
        }
    }
}

impl DefaultOnResponse {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn include_headers(self, include_headers: bool) -> Self {
        Self {
            include_headers,
            ..self
        }
    }
}

impl<B> OnResponse<B> for DefaultOnResponse {
    fn on_response(self, response: &Response<B>, latency: Duration, _: &Span) {
        let latency = Latency {
            unit: self.latency_unit,
            duration: latency,
        };
        let response_headers = self
            .include_headers
            .then(|| tracing::field::debug(response.headers()));
        let status = response.status().as_u16();

        if response.status().is_server_error() {
            warn!(%latency, status, response_headers, "request failed");
        } else {
            info!(%latency, status, response_headers);
        }
    }
}
