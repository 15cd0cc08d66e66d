mod authenticate;
mod record_metrics;
mod tracing;

pub use authenticate::authenticate;
pub use record_metrics::record_metrics;
pub use tracing::attach_trace_id;
