mod metrics;
mod tracing;

pub use self::metrics::Metrics;
pub use self::tracing::{init_subscribers, instrument_query, Operation, TracingGuard};
