//! Observability: metrics events and the sinks that count them.
//!
//! Mapping logic never touches counters directly; everything flows through
//! `MetricsEvent` and the provider's `MetricsSink`.

mod sink;


pub use sink::{CounterSink, MetricsEvent, MetricsReport, MetricsSink, NoopSink, RoutineKind};
