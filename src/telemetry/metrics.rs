use anyhow::Result;
use prometheus::{
    register_counter_vec_with_registry, register_gauge_vec_with_registry,
    register_histogram_vec_with_registry, Counter, CounterVec, Gauge, GaugeVec, Histogram,
    HistogramVec, Registry,
};

pub struct Metrics {
    pub registry: Registry,

    http_requests_pending: GaugeVec,
    http_requests_total: CounterVec,
    http_requests_duration_seconds: HistogramVec,
    registry_searches_total: CounterVec,
    ingest_jobs_total: CounterVec,
}

impl Metrics {
    pub fn build() -> Result<Self> {
        let registry = Registry::default();

        let http_requests_pending = register_gauge_vec_with_registry!(
            "http_requests_pending",
            "Total number of HTTP requests in progress",
            &["method", "endpoint"],
            &registry
        )?;
        let http_requests_total = register_counter_vec_with_registry!(
            "http_requests_total",
            "Total number of HTTP requests",
            &["method", "endpoint", "status"],
            &registry
        )?;
        let http_requests_duration_seconds = register_histogram_vec_with_registry!(
            "http_requests_duration_seconds",
            "Duration of HTTP requests in seconds",
            &["method", "endpoint", "status"],
            &registry
        )?;
        let registry_searches_total = register_counter_vec_with_registry!(
            "registry_searches_total",
            "Total number of package searches by kind",
            &["kind"],
            &registry
        )?;
        let ingest_jobs_total = register_counter_vec_with_registry!(
            "ingest_jobs_total",
            "Total number of URL ingestion jobs by final status",
            &["status"],
            &registry
        )?;

        Ok(Self {
            registry,
            http_requests_total,
            http_requests_pending,
            http_requests_duration_seconds,
            registry_searches_total,
            ingest_jobs_total,
        })
    }

    pub fn http_requests_pending(&self, method: &str, endpoint: &str) -> Gauge {
        self.http_requests_pending
            .with_label_values(&[method, endpoint])
    }

    pub fn http_requests_total(&self, method: &str, endpoint: &str, status: &str) -> Counter {
        self.http_requests_total
            .with_label_values(&[method, endpoint, status])
    }

    pub fn http_requests_duration_seconds(
        &self,
        method: &str,
        endpoint: &str,
        status: &str,
    ) -> Histogram {
        self.http_requests_duration_seconds
            .with_label_values(&[method, endpoint, status])
    }

    pub fn registry_searches_total(&self, kind: &str) -> Counter {
        self.registry_searches_total.with_label_values(&[kind])
    }

    pub fn ingest_jobs_total(&self, status: &str) -> Counter {
        self.ingest_jobs_total.with_label_values(&[status])
    }
}

#[cfg(test)]
mod tests {
    use prometheus::{Encoder, TextEncoder};

    use super::*;

    #[test]
    fn test_counters_are_exported() {
        let metrics = Metrics::build().unwrap();
        metrics.registry_searches_total("semver").inc();
        metrics.ingest_jobs_total("completed").inc_by(2.0);

        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&metrics.registry.gather(), &mut buffer)
            .unwrap();
        let text = String::from_utf8(buffer).unwrap();

        assert!(text.contains("registry_searches_total{kind=\"semver\"} 1"));
        assert!(text.contains("ingest_jobs_total"));
        assert_eq!(metrics.ingest_jobs_total("completed").get(), 2.0);
    }
}
