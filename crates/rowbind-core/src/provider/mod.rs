//! Orchestration: resolve, bind, schedule and cache compiled routines.


use crate::{
    bind::{Binder, MappingPlan},
    cache::{BoundedCache, CacheStats},
    config::{ConfigError, MappingConfig},
    convert::ScalarConverter,
    cursor::{ReaderShape, RowCursor},
    error::{MappingError, UnboundColumnsError},
    obs::{CounterSink, MetricsEvent, MetricsSink, RoutineKind},
    routine::CompiledRoutine,
    schedule,
    schema::RowSchema,
    strategy::{DeclaredNullability, NullabilityOracle, TypeMappingStrategy},
    types::{Bindable, TypeRef},
};
use std::{ops::Range, sync::Arc};

///
/// ColumnSelection
///
/// Which columns a mapping may consume: those inside `range` whose name
/// starts with `prefix` (case-insensitive). Dictionary keys are the column
/// names with the prefix stripped.
///

#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct ColumnSelection {
    pub prefix: String,
    pub range: Range<usize>,
}

impl ColumnSelection {
    #[must_use]
    pub const fn all() -> Self {
        Self {
            prefix: String::new(),
            range: 0..usize::MAX,
        }
    }

    #[must_use]
    pub fn prefixed(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            ..Self::all()
        }
    }

    #[must_use]
    pub const fn within(mut self, range: Range<usize>) -> Self {
        self.range = range;
        self
    }
}

impl Default for ColumnSelection {
    fn default() -> Self {
        Self::all()
    }
}

///
/// RoutineKey
///

#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct RoutineKey {
    pub shape: ReaderShape,
    pub schema: RowSchema,
    pub destination: TypeRef,
    pub selection: ColumnSelection,
}

///
/// MappingProvider
///
/// Owns the conversion and routine caches. Compilation is pure, so
/// concurrent misses for one key may compile twice; only one routine is
/// kept and both are equivalent.
///

pub struct MappingProvider {
    config: MappingConfig,
    converter: ScalarConverter,
    routines: BoundedCache<RoutineKey, Arc<CompiledRoutine>>,
    oracle: Arc<dyn NullabilityOracle>,
    metrics: Arc<dyn MetricsSink>,
}

impl MappingProvider {
    #[must_use]
    pub fn new() -> Self {
        Self::build(MappingConfig::default())
    }

    pub fn with_config(config: MappingConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        Ok(Self::build(config))
    }

    fn build(config: MappingConfig) -> Self {
        Self {
            converter: ScalarConverter::new(
                config.conversion_cache_capacity,
                config.enum_cache_capacity,
            ),
            routines: BoundedCache::new(config.routine_cache_capacity),
            oracle: Arc::new(DeclaredNullability),
            metrics: Arc::new(CounterSink::new()),
            config,
        }
    }

    /// Replace the nullability oracle. Cached routines are dropped since
    /// they were bound under the previous oracle.
    #[must_use]
    pub fn with_oracle(mut self, oracle: impl NullabilityOracle + 'static) -> Self {
        self.oracle = Arc::new(oracle);
        self.routines.clear();
        self
    }

    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsSink>) -> Self {
        self.metrics = metrics;
        self
    }

    #[must_use]
    pub const fn config(&self) -> &MappingConfig {
        &self.config
    }

    #[must_use]
    pub const fn converter(&self) -> &ScalarConverter {
        &self.converter
    }

    #[must_use]
    pub fn routine_stats(&self) -> CacheStats {
        self.routines.stats()
    }

    /// Cached routine for `key`, compiling it on a miss. Failures are
    /// returned every time and never cached.
    pub fn routine_for(&self, key: RoutineKey) -> Result<Arc<CompiledRoutine>, MappingError> {
        let mut compiled = false;
        let schema = key.schema.clone();
        let destination = key.destination.clone();
        let selection = key.selection.clone();

        let routine = self.routines.get_or_try_add(key, || {
            compiled = true;
            self.compile(&schema, &destination, &selection).map(Arc::new)
        });

        match &routine {
            Ok(_) if !compiled => self.metrics.record(MetricsEvent::RoutineCacheHit),
            Ok(_) => {}
            Err(err) => {
                tracing::debug!(
                    destination = %destination,
                    class = %err.class(),
                    error = %err,
                    "routine compilation failed"
                );
                self.metrics
                    .record(MetricsEvent::CompileFailed { class: err.class() });
            }
        }

        routine
    }

    /// Routine mapping `cursor`'s current shape into `T`.
    pub fn routine<C, T>(&self, cursor: &C) -> Result<Arc<CompiledRoutine>, MappingError>
    where
        C: RowCursor + 'static,
        T: Bindable,
    {
        self.routine_with::<C, T>(cursor, ColumnSelection::all())
    }

    /// Like `routine`, restricted to the selected columns.
    pub fn routine_with<C, T>(
        &self,
        cursor: &C,
        selection: ColumnSelection,
    ) -> Result<Arc<CompiledRoutine>, MappingError>
    where
        C: RowCursor + 'static,
        T: Bindable,
    {
        self.routine_for(RoutineKey {
            shape: ReaderShape::of::<C>(),
            schema: RowSchema::from_cursor(cursor),
            destination: T::type_ref(),
            selection,
        })
    }

    /// Map the row `cursor` is positioned on.
    pub fn map_row<C, T>(&self, cursor: &mut C) -> Result<T, MappingError>
    where
        C: RowCursor + 'static,
        T: Bindable,
    {
        let routine = self.routine::<C, T>(cursor)?;

        self.run(&routine, cursor)
    }

    /// Run an already compiled routine against the current row.
    pub fn run<T: Bindable>(
        &self,
        routine: &CompiledRoutine,
        cursor: &mut dyn RowCursor,
    ) -> Result<T, MappingError> {
        match routine.map::<T>(cursor) {
            Ok(value) => {
                self.metrics.record(MetricsEvent::RowMapped);
                Ok(value)
            }
            Err(err) => {
                tracing::debug!(
                    destination = %routine.destination(),
                    column = ?err.column_index(),
                    error = %err,
                    "row mapping failed"
                );
                self.metrics
                    .record(MetricsEvent::RowFailed { class: err.class() });
                Err(err)
            }
        }
    }

    /// Compile a routine without consulting or filling the cache.
    pub fn compile(
        &self,
        schema: &RowSchema,
        destination: &TypeRef,
        selection: &ColumnSelection,
    ) -> Result<CompiledRoutine, MappingError> {
        let binder = Binder::new(&self.converter);
        let ColumnSelection { prefix, range } = selection;

        let (kind, plan) = match destination {
            TypeRef::Composite(_) | TypeRef::MapInterface { .. } | TypeRef::UntypedMap => {
                match TypeMappingStrategy::resolve(destination, self.oracle.as_ref())? {
                    TypeMappingStrategy::Dictionary(strategy) => {
                        let plan = binder.bind_dictionary(
                            &strategy,
                            destination,
                            schema,
                            prefix,
                            range.clone(),
                        );
                        (RoutineKind::Dictionary, plan)
                    }
                    TypeMappingStrategy::Poco(strategy) => {
                        let plan =
                            binder.bind_poco(&strategy, destination, schema, prefix, range.clone())?;
                        (RoutineKind::Poco, plan)
                    }
                }
            }
            _ => (RoutineKind::Scalar, binder.bind_scalar(destination, schema)?),
        };

        if plan.requires_all_columns {
            check_all_bound(&plan, schema, selection)?;
        }

        let program = schedule::compile(&plan)?;
        tracing::debug!(
            destination = %destination,
            kind = ?kind,
            bindings = plan.bindings.len(),
            partial = plan.is_partial_binding,
            registers = program.registers,
            "compiled mapping routine"
        );
        self.metrics.record(MetricsEvent::RoutineCompiled {
            kind,
            bindings: u64::try_from(plan.bindings.len()).unwrap_or(u64::MAX),
        });

        Ok(CompiledRoutine::new(plan, program))
    }
}

impl Default for MappingProvider {
    fn default() -> Self {
        Self::new()
    }
}

fn check_all_bound(
    plan: &MappingPlan,
    schema: &RowSchema,
    selection: &ColumnSelection,
) -> Result<(), UnboundColumnsError> {
    let selected = schema.columns_with_prefix(&selection.prefix, selection.range.clone());
    let unbound = plan.unbound_columns(schema);
    let unbound = selected
        .into_iter()
        .filter(|(_, column)| unbound.iter().any(|u| u.index == column.index))
        .map(|(_, column)| column.clone())
        .collect::<Vec<_>>();

    if unbound.is_empty() {
        return Ok(());
    }

    Err(UnboundColumnsError {
        destination: plan.destination.to_string(),
        unbound,
        bound: plan
            .bindings
            .iter()
            .map(|binding| (binding.retrieval.column.clone(), binding.target.to_string()))
            .collect(),
    })
}
