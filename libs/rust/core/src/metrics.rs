//! Counters for registry mutations, drift and build submissions.
//! No exporter is installed here; without a meter provider these are no-ops.

use once_cell::sync::Lazy;
use opentelemetry::{global, metrics::Counter, KeyValue};

use crate::error::RegistryOp;

static REGISTRY_MUTATIONS: Lazy<Counter<u64>> = Lazy::new(|| {
    global::meter("edge-core")
        .u64_counter("edge_registry_mutations_total")
        .with_description("Create/update calls accepted by the model registry")
        .build()
});

static DRIFT_DETECTED: Lazy<Counter<u64>> = Lazy::new(|| {
    global::meter("edge-core")
        .u64_counter("edge_drift_detected_total")
        .with_description("Model images found out of sync with the registry")
        .build()
});

static BUILDS_SUBMITTED: Lazy<Counter<u64>> = Lazy::new(|| {
    global::meter("edge-core")
        .u64_counter("edge_builds_submitted_total")
        .with_description("Image build pipeline runs created")
        .build()
});

pub(crate) fn record_mutation(op: RegistryOp) {
    REGISTRY_MUTATIONS.add(1, &[KeyValue::new("op", op.describe())]);
}

pub(crate) fn record_drift() { DRIFT_DETECTED.add(1, &[]); }

pub(crate) fn record_build() { BUILDS_SUBMITTED.add(1, &[]); }
