use iot_telemetry::{
    TelemetryMetrics, metrics, new_request_ids, record_connect_success, record_invocation_latency_ms,
    record_probes,
};

#[test]
fn request_ids_non_empty() {
    let ids = new_request_ids();
    assert!(!ids.request_id.is_empty());
    assert!(!ids.trace_id.is_empty());
    assert_ne!(ids.request_id, ids.trace_id);
}

#[test]
fn record_functions_increase_global_counters() {
    let before = metrics().snapshot();
    record_connect_success();
    record_probes(12);
    record_invocation_latency_ms(40);
    let after = metrics().snapshot();
    assert!(after.connect_success >= before.connect_success + 1);
    assert!(after.probes >= before.probes + 12);
    assert!(after.invocation_latency_ms_total >= before.invocation_latency_ms_total + 40);
    assert!(after.invocation_latency_ms_count >= before.invocation_latency_ms_count + 1);
}

#[test]
fn fresh_metrics_start_at_zero() {
    let snapshot = TelemetryMetrics::new().snapshot();
    assert_eq!(snapshot.devices_registered, 0);
    assert_eq!(snapshot.endpoints_found, 0);
    assert_eq!(snapshot.invocation_latency_ms_count, 0);
}
