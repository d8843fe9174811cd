//! Metrics recorders for the query/write/get-document paths.
//!
//! Drop guards record latency and per-status counters through the
//! `metrics` facade; the binary wires an exporter if one is configured.

use std::time::Instant;

use metrics::{counter, histogram};

/// Protocol label attached to request metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Grpc,
    Http,
}

impl Protocol {
    fn as_str(&self) -> &'static str {
        match self {
            Protocol::Grpc => "grpc",
            Protocol::Http => "http",
        }
    }
}

macro_rules! request_metrics {
    ($name:ident, $prefix:literal) => {
        /// Drop guard recording latency and outcome for one request.
        pub struct $name {
            start: Instant,
            protocol: Protocol,
            code: i32,
        }

        impl $name {
            pub fn new(protocol: Protocol) -> Self {
                Self {
                    start: Instant::now(),
                    protocol,
                    code: 0,
                }
            }

            /// Record the final status code before the guard drops.
            pub fn set_code(&mut self, code: i32) {
                self.code = code;
            }

            pub fn elapsed_us(&self) -> u64 {
                self.start.elapsed().as_micros() as u64
            }
        }

        impl Drop for $name {
            fn drop(&mut self) {
                let protocol = self.protocol.as_str();
                let status = if self.code == 0 { "success" } else { "error" };
                counter!(
                    concat!($prefix, "_total"),
                    "protocol" => protocol,
                    "status" => status
                )
                .increment(1);
                histogram!(concat!($prefix, "_latency_us"), "protocol" => protocol)
                    .record(self.elapsed_us() as f64);
            }
        }
    };
}

request_metrics!(QueryMetrics, "vexadb_query");
request_metrics!(WriteMetrics, "vexadb_write");
request_metrics!(GetDocumentMetrics, "vexadb_get_document");

impl WriteMetrics {
    /// Record per-request row volume.
    pub fn record_rows(&self, rows: u64) {
        counter!("vexadb_write_rows_total", "protocol" => self.protocol.as_str())
            .increment(rows);
    }
}
