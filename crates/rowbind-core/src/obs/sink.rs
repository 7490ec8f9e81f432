use crate::error::ErrorClass;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

///
/// RoutineKind
///

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum RoutineKind {
    Scalar,
    Dictionary,
    Poco,
}

///
/// MetricsEvent
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MetricsEvent {
    RoutineCacheHit,
    RoutineCompiled { kind: RoutineKind, bindings: u64 },
    CompileFailed { class: ErrorClass },
    RowMapped,
    RowFailed { class: ErrorClass },
}

///
/// MetricsSink
///

pub trait MetricsSink: Send + Sync {
    fn record(&self, event: MetricsEvent);
}

///
/// NoopSink
///

#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl MetricsSink for NoopSink {
    fn record(&self, _: MetricsEvent) {}
}

///
/// MetricsReport
/// Point-in-time copy of a `CounterSink`.
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct MetricsReport {
    // Compilation
    pub routine_cache_hits: u64,
    pub routines_compiled: u64,
    pub scalar_routines: u64,
    pub dictionary_routines: u64,
    pub poco_routines: u64,
    pub bindings_compiled: u64,
    pub compile_failures: u64,

    // Execution
    pub rows_mapped: u64,
    pub row_failures: u64,
    pub conversion_failures: u64,
}

///
/// CounterSink
///
/// Default sink: saturating in-process counters, safe to share across
/// threads.
///

#[derive(Debug, Default)]
pub struct CounterSink {
    routine_cache_hits: AtomicU64,
    routines_compiled: AtomicU64,
    scalar_routines: AtomicU64,
    dictionary_routines: AtomicU64,
    poco_routines: AtomicU64,
    bindings_compiled: AtomicU64,
    compile_failures: AtomicU64,
    rows_mapped: AtomicU64,
    row_failures: AtomicU64,
    conversion_failures: AtomicU64,
}

impl CounterSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn report(&self) -> MetricsReport {
        let load = |counter: &AtomicU64| counter.load(Ordering::Relaxed);

        MetricsReport {
            routine_cache_hits: load(&self.routine_cache_hits),
            routines_compiled: load(&self.routines_compiled),
            scalar_routines: load(&self.scalar_routines),
            dictionary_routines: load(&self.dictionary_routines),
            poco_routines: load(&self.poco_routines),
            bindings_compiled: load(&self.bindings_compiled),
            compile_failures: load(&self.compile_failures),
            rows_mapped: load(&self.rows_mapped),
            row_failures: load(&self.row_failures),
            conversion_failures: load(&self.conversion_failures),
        }
    }

    /// Reset all counters (useful in tests).
    pub fn reset(&self) {
        for counter in [
            &self.routine_cache_hits,
            &self.routines_compiled,
            &self.scalar_routines,
            &self.dictionary_routines,
            &self.poco_routines,
            &self.bindings_compiled,
            &self.compile_failures,
            &self.rows_mapped,
            &self.row_failures,
            &self.conversion_failures,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

fn bump(counter: &AtomicU64, by: u64) {
    // fetch_update only fails when the closure returns None
    let _ = counter.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |current| {
        Some(current.saturating_add(by))
    });
}

impl MetricsSink for CounterSink {
    fn record(&self, event: MetricsEvent) {
        match event {
            MetricsEvent::RoutineCacheHit => bump(&self.routine_cache_hits, 1),

            MetricsEvent::RoutineCompiled { kind, bindings } => {
                bump(&self.routines_compiled, 1);
                bump(&self.bindings_compiled, bindings);
                match kind {
                    RoutineKind::Scalar => bump(&self.scalar_routines, 1),
                    RoutineKind::Dictionary => bump(&self.dictionary_routines, 1),
                    RoutineKind::Poco => bump(&self.poco_routines, 1),
                }
            }

            MetricsEvent::CompileFailed { .. } => bump(&self.compile_failures, 1),

            MetricsEvent::RowMapped => bump(&self.rows_mapped, 1),

            MetricsEvent::RowFailed { class } => {
                bump(&self.row_failures, 1);
                if class == ErrorClass::Conversion {
                    bump(&self.conversion_failures, 1);
                }
            }
        }
    }
}
