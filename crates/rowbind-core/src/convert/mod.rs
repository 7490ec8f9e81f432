//! Scalar conversion matrix with safe/unsafe classification.
//!
//! `ScalarConverter::can_convert` resolves a `ConversionPlan` between two
//! types, memoized per `(from, to)` pair. "No conversion" is a first-class
//! cached result. A plan is safe when applying it can neither fail nor lose
//! information or range.

mod enums;
mod numeric;


use crate::{
    cache::{BoundedCache, CacheStats},
    error::BoxError,
    types::{EnumType, ImplicitConversion, NumericFacts, ScalarKind, TypeRef},
    value::{DateTimeKind, EnumValue, Value},
};
use chrono::{Local, NaiveTime, Offset, TimeDelta, TimeZone};
use std::{fmt, sync::Arc};
use thiserror::Error as ThisError;

// re-exports
pub use enums::DefinedValues;

///
/// ConversionError
///

#[derive(Debug, ThisError)]
pub enum ConversionError {
    #[error("cannot convert {value} from {from} to {to} without loss: {reason}")]
    Lossy {
        from: String,
        to: String,
        value: String,
        reason: &'static str,
    },

    #[error("{value} ({from}) does not survive a round trip through {to}")]
    RoundTripMismatch {
        from: String,
        to: String,
        value: String,
    },

    #[error("{value} is not a defined value of enum {path}")]
    EnumOutOfRange { path: String, value: i128 },

    #[error("{value} is not a boolean; only 0 and 1 convert to bool")]
    NonBooleanNumeric { value: String },

    #[error("{value} has a fractional part and cannot be converted to {to}")]
    NonIntegralTruncated { value: String, to: String },

    #[error("null cannot be stored in a slot of non-nullable type {destination}")]
    NullIntoNonNullable { destination: String },

    #[error("implicit conversion from {from} to {to} failed: {source}")]
    Implicit {
        from: String,
        to: String,
        #[source]
        source: BoxError,
    },

    #[error("conversion from {from} received {value}")]
    UnexpectedInput { from: String, value: String },
}

///
/// NumericMode
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum NumericMode {
    /// Destination is wider; cannot fail.
    Widen,
    /// Integral narrowing or sign change; fails on overflow.
    Checked,
    /// Integral into decimal; cannot fail.
    ToDecimal,
    /// Convert, convert back, and require the original value.
    RoundTrip,
}

///
/// ConversionStep
///

#[derive(Clone, Debug)]
pub enum ConversionStep {
    /// Source and destination are the same type.
    Identity,
    /// Any value into `object`.
    Box,
    WrapNullable {
        inner: Option<Arc<ConversionPlan>>,
    },
    Numeric {
        from: ScalarKind,
        to: ScalarKind,
        mode: NumericMode,
    },
    ToEnum {
        to_underlying: Option<Arc<ConversionPlan>>,
        enum_type: Arc<EnumType>,
        defined: Arc<DefinedValues>,
    },
    NumericToBool {
        to_i32: Option<Arc<ConversionPlan>>,
    },
    BoolToNumeric {
        to: ScalarKind,
    },
    DateTimeToDate,
    TimeSpanToTimeOfDay,
    DateTimeToOffset,
    Implicit(ImplicitConversion),
}

///
/// ConversionPlan
///

#[derive(Clone, Debug)]
pub struct ConversionPlan {
    from: TypeRef,
    to: TypeRef,
    step: ConversionStep,
    is_safe: bool,
}

impl ConversionPlan {
    const fn new(from: TypeRef, to: TypeRef, step: ConversionStep, is_safe: bool) -> Self {
        Self {
            from,
            to,
            step,
            is_safe,
        }
    }

    #[must_use]
    pub const fn is_safe(&self) -> bool {
        self.is_safe
    }

    #[must_use]
    pub const fn step(&self) -> &ConversionStep {
        &self.step
    }

    #[must_use]
    pub const fn from_type(&self) -> &TypeRef {
        &self.from
    }

    #[must_use]
    pub const fn to_type(&self) -> &TypeRef {
        &self.to
    }

    /// Apply the plan to a value of the source type.
    pub fn apply(&self, value: Value) -> Result<Value, ConversionError> {
        if value.is_null() {
            return if self.to.can_be_null() {
                Ok(Value::Null)
            } else {
                Err(ConversionError::NullIntoNonNullable {
                    destination: self.to.to_string(),
                })
            };
        }

        match &self.step {
            ConversionStep::Identity | ConversionStep::Box => Ok(value),
            ConversionStep::WrapNullable { inner } => match inner {
                Some(inner) => inner.apply(value),
                None => Ok(value),
            },
            ConversionStep::Numeric { from, to, mode } => self.apply_numeric(value, *from, *to, *mode),
            ConversionStep::ToEnum {
                to_underlying,
                enum_type,
                defined,
            } => {
                let underlying = match to_underlying {
                    Some(plan) => plan.apply(value)?,
                    None => value,
                };
                let raw = numeric::to_i128(&underlying).ok_or_else(|| self.unexpected(&underlying))?;
                if !defined.contains(raw) {
                    return Err(ConversionError::EnumOutOfRange {
                        path: enum_type.path.clone(),
                        value: raw,
                    });
                }

                Ok(Value::Enum(EnumValue::new(&enum_type.path, raw)))
            }
            ConversionStep::NumericToBool { to_i32 } => {
                let as_i32 = match to_i32 {
                    Some(plan) => plan.apply(value)?,
                    None => value,
                };
                match as_i32 {
                    Value::I32(0) => Ok(Value::Bool(false)),
                    Value::I32(1) => Ok(Value::Bool(true)),
                    other => Err(ConversionError::NonBooleanNumeric {
                        value: other.to_string(),
                    }),
                }
            }
            ConversionStep::BoolToNumeric { to } => match value {
                Value::Bool(b) => numeric::cast(&Value::I32(i32::from(b)), *to)
                    .ok_or_else(|| self.lossy(&value, "boolean does not fit destination")),
                other => Err(self.unexpected(&other)),
            },
            ConversionStep::DateTimeToDate => match value {
                Value::DateTime(dt)
                    if dt.kind == DateTimeKind::Unspecified && dt.naive.time() == NaiveTime::MIN =>
                {
                    Ok(Value::Date(dt.naive.date()))
                }
                Value::DateTime(_) => Err(self.lossy(
                    &value,
                    "only midnight timestamps of unspecified kind convert to a date",
                )),
                other => Err(self.unexpected(&other)),
            },
            ConversionStep::TimeSpanToTimeOfDay => match value {
                Value::TimeSpan(span) => time_of_day(span)
                    .map(Value::TimeOfDay)
                    .ok_or_else(|| self.lossy(&value, "time span falls outside a single day")),
                other => Err(self.unexpected(&other)),
            },
            ConversionStep::DateTimeToOffset => match value {
                Value::DateTime(dt) => {
                    let offset = match dt.kind {
                        DateTimeKind::Utc => chrono::Utc.fix(),
                        DateTimeKind::Local | DateTimeKind::Unspecified => Local
                            .offset_from_local_datetime(&dt.naive)
                            .earliest()
                            .unwrap_or_else(|| Local.offset_from_utc_datetime(&dt.naive)),
                    };

                    offset
                        .from_local_datetime(&dt.naive)
                        .single()
                        .map(Value::DateTimeOffset)
                        .ok_or_else(|| self.lossy(&value, "timestamp has no unique offset"))
                }
                other => Err(self.unexpected(&other)),
            },
            ConversionStep::Implicit(conversion) => {
                (conversion.apply)(value).map_err(|source| ConversionError::Implicit {
                    from: self.from.to_string(),
                    to: self.to.to_string(),
                    source,
                })
            }
        }
    }

    fn apply_numeric(
        &self,
        value: Value,
        from: ScalarKind,
        to: ScalarKind,
        mode: NumericMode,
    ) -> Result<Value, ConversionError> {
        if value.scalar_kind() != Some(from) {
            return Err(self.unexpected(&value));
        }

        match mode {
            NumericMode::Widen | NumericMode::ToDecimal => numeric::cast(&value, to)
                .ok_or_else(|| self.lossy(&value, "value does not fit destination")),
            NumericMode::Checked => numeric::cast(&value, to)
                .ok_or_else(|| self.lossy(&value, "arithmetic overflow")),
            NumericMode::RoundTrip => {
                if to.is_integral() {
                    if numeric::is_non_finite(&value) {
                        return Err(self.lossy(&value, "value is not finite"));
                    }
                    if numeric::has_fraction(&value) {
                        return Err(ConversionError::NonIntegralTruncated {
                            value: value.to_string(),
                            to: to.to_string(),
                        });
                    }
                }

                let forward = numeric::cast(&value, to)
                    .ok_or_else(|| self.lossy(&value, "value is out of range"))?;
                match numeric::cast(&forward, from) {
                    Some(back) if back == value => Ok(forward),
                    _ => Err(ConversionError::RoundTripMismatch {
                        from: from.to_string(),
                        to: to.to_string(),
                        value: value.to_string(),
                    }),
                }
            }
        }
    }

    fn lossy(&self, value: &Value, reason: &'static str) -> ConversionError {
        ConversionError::Lossy {
            from: self.from.to_string(),
            to: self.to.to_string(),
            value: value.to_string(),
            reason,
        }
    }

    fn unexpected(&self, value: &Value) -> ConversionError {
        ConversionError::UnexpectedInput {
            from: self.from.to_string(),
            value: value.to_string(),
        }
    }
}

impl fmt::Display for ConversionPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let safety = if self.is_safe { "safe" } else { "checked" };

        write!(f, "{} -> {} ({safety})", self.from, self.to)
    }
}

fn time_of_day(span: TimeDelta) -> Option<NaiveTime> {
    if span < TimeDelta::zero() || span >= TimeDelta::days(1) {
        return None;
    }

    let seconds = u32::try_from(span.num_seconds()).ok()?;
    NaiveTime::from_num_seconds_from_midnight_opt(seconds, span.subsec_nanos().unsigned_abs())
}

///
/// ScalarConverter
///
/// Owns the conversion-plan cache and the enum validity cache.
///

pub struct ScalarConverter {
    plans: BoundedCache<(TypeRef, TypeRef), Option<Arc<ConversionPlan>>>,
    enums: BoundedCache<Arc<EnumType>, Arc<DefinedValues>>,
}

impl ScalarConverter {
    pub const DEFAULT_PLAN_CAPACITY: usize = 5_000;
    pub const DEFAULT_ENUM_CAPACITY: usize = 1_000;

    #[must_use]
    pub fn new(plan_capacity: usize, enum_capacity: usize) -> Self {
        Self {
            plans: BoundedCache::new(plan_capacity),
            enums: BoundedCache::new(enum_capacity),
        }
    }

    /// Resolve the plan converting `from` into `to`, or `None` if the types
    /// are not convertible.
    pub fn can_convert(&self, from: &TypeRef, to: &TypeRef) -> Option<Arc<ConversionPlan>> {
        self.plans
            .get_or_add((from.clone(), to.clone()), || {
                self.resolve(from, to).map(Arc::new)
            })
    }

    /// Defined-value data for an enum type, computed once per type.
    pub fn defined_values(&self, enum_type: &Arc<EnumType>) -> Arc<DefinedValues> {
        self.enums.get_or_add(Arc::clone(enum_type), || {
            Arc::new(DefinedValues::analyze(enum_type))
        })
    }

    #[must_use]
    pub fn plan_stats(&self) -> CacheStats {
        self.plans.stats()
    }

    #[must_use]
    pub fn enum_stats(&self) -> CacheStats {
        self.enums.stats()
    }

    fn resolve(&self, from: &TypeRef, to: &TypeRef) -> Option<ConversionPlan> {
        let plan = |step, is_safe| Some(ConversionPlan::new(from.clone(), to.clone(), step, is_safe));

        if from == to {
            return plan(ConversionStep::Identity, true);
        }

        if *to == TypeRef::Object {
            return plan(ConversionStep::Box, true);
        }

        if let TypeRef::Nullable(inner_to) = to
            && !from.is_nullable()
        {
            if from == inner_to.as_ref() {
                return plan(ConversionStep::WrapNullable { inner: None }, true);
            }
            let inner = self.can_convert(from, inner_to)?;
            let is_safe = inner.is_safe();

            return plan(ConversionStep::WrapNullable { inner: Some(inner) }, is_safe);
        }

        if let Some(from_facts) = from.numeric() {
            let from_kind = from.as_scalar()?;

            if let Some(to_facts) = to.numeric() {
                let (mode, is_safe) = numeric_mode(from_facts, to_facts);
                return plan(
                    ConversionStep::Numeric {
                        from: from_kind,
                        to: to.as_scalar()?,
                        mode,
                    },
                    is_safe,
                );
            }

            if let TypeRef::Enum(enum_type) = to {
                let underlying = TypeRef::Scalar(enum_type.underlying);
                let to_underlying = if *from == underlying {
                    None
                } else {
                    Some(self.can_convert(from, &underlying)?)
                };

                return plan(
                    ConversionStep::ToEnum {
                        to_underlying,
                        enum_type: Arc::clone(enum_type),
                        defined: self.defined_values(enum_type),
                    },
                    false,
                );
            }

            if *to == TypeRef::Scalar(ScalarKind::Bool) {
                let i32_type = TypeRef::Scalar(ScalarKind::I32);
                let to_i32 = if from_kind == ScalarKind::I32 {
                    None
                } else {
                    Some(self.can_convert(from, &i32_type)?)
                };

                return plan(ConversionStep::NumericToBool { to_i32 }, false);
            }
        }

        match (from.as_scalar(), to.as_scalar()) {
            (Some(ScalarKind::Bool), Some(to_kind)) if to_kind.is_numeric() => {
                return plan(ConversionStep::BoolToNumeric { to: to_kind }, true);
            }
            (Some(ScalarKind::DateTime), Some(ScalarKind::Date)) => {
                return plan(ConversionStep::DateTimeToDate, false);
            }
            (Some(ScalarKind::TimeSpan), Some(ScalarKind::TimeOfDay)) => {
                return plan(ConversionStep::TimeSpanToTimeOfDay, false);
            }
            (Some(ScalarKind::DateTime), Some(ScalarKind::DateTimeOffset)) => {
                return plan(ConversionStep::DateTimeToOffset, true);
            }
            _ => {}
        }

        // user-declared operators: destination type first, then source type
        let declared = [to, from].into_iter().find_map(|ty| match ty {
            TypeRef::Custom(custom) => custom.find_implicit(from, to).cloned(),
            _ => None,
        })?;

        plan(ConversionStep::Implicit(declared), false)
    }
}

impl Default for ScalarConverter {
    fn default() -> Self {
        Self::new(Self::DEFAULT_PLAN_CAPACITY, Self::DEFAULT_ENUM_CAPACITY)
    }
}

/// Mode and safety for a numeric pair.
const fn numeric_mode(from: NumericFacts, to: NumericFacts) -> (NumericMode, bool) {
    if from.is_integral() && to.is_integral() {
        if to.size > from.size && from.is_unsigned() == to.is_unsigned() {
            (NumericMode::Widen, true)
        } else {
            (NumericMode::Checked, false)
        }
    } else if to.is_floating() && to.size > from.size {
        (NumericMode::Widen, true)
    } else if from.is_integral() && matches!(to.class, crate::types::NumericClass::Decimal) {
        (NumericMode::ToDecimal, true)
    } else {
        (NumericMode::RoundTrip, false)
    }
}
