use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, HistogramVec, IntCounterVec,
};

lazy_static! {
    pub static ref SCHEMA_OPERATION_DURATION: HistogramVec = register_histogram_vec!(
        "cqlbind_schema_operation_duration_seconds",
        "Schema operation duration in seconds",
        &["operation", "keyspace", "status"]
    ).expect("schema operation histogram registers once");

    pub static ref SCHEMA_OPERATION_COUNTER: IntCounterVec = register_int_counter_vec!(
        "cqlbind_schema_operations_total",
        "Total number of schema operations",
        &["operation", "status"]
    ).expect("schema operation counter registers once");

    pub static ref TIMEOUT_RETRIES: IntCounterVec = register_int_counter_vec!(
        "cqlbind_schema_timeout_retries_total",
        "Schema operations retried after a client-side timeout",
        &["operation"]
    ).expect("timeout retry counter registers once");
}

/// Record one schema operation. Labelled by keyspace only, never by table or type.
pub fn record_operation(operation: &str, keyspace: &str, success: bool, duration: f64) {
    let status = if success { "success" } else { "failure" };
    let labels = [operation, keyspace, status];
    SCHEMA_OPERATION_DURATION.with_label_values(&labels).observe(duration);
    SCHEMA_OPERATION_COUNTER.with_label_values(&[operation, status]).inc();
}

pub fn record_timeout_retry(operation: &str) {
    TIMEOUT_RETRIES.with_label_values(&[operation]).inc();
}
