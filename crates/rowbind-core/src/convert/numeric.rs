use crate::{types::ScalarKind, value::Value};
use num_traits::FromPrimitive;
use rust_decimal::Decimal;

/// Convert a numeric value to `to`; `None` when the value is out of range or
/// not representable. Float and decimal sources truncate toward zero when
/// the destination is integral.
pub(crate) fn cast(value: &Value, to: ScalarKind) -> Option<Value> {
    let n = value.as_numeric()?;

    let cast = match to {
        ScalarKind::I8 => Value::I8(n.to_i8()?),
        ScalarKind::U8 => Value::U8(n.to_u8()?),
        ScalarKind::I16 => Value::I16(n.to_i16()?),
        ScalarKind::U16 => Value::U16(n.to_u16()?),
        ScalarKind::I32 => Value::I32(n.to_i32()?),
        ScalarKind::U32 => Value::U32(n.to_u32()?),
        ScalarKind::I64 => Value::I64(n.to_i64()?),
        ScalarKind::U64 => Value::U64(n.to_u64()?),
        ScalarKind::F32 => Value::F32(n.to_f32()?),
        ScalarKind::F64 => Value::F64(n.to_f64()?),
        ScalarKind::Decimal => Value::Decimal(to_decimal(value)?),
        _ => return None,
    };

    Some(cast)
}

fn to_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::Decimal(d) => Some(*d),
        Value::F32(v) => Decimal::from_f32(*v),
        Value::F64(v) => Decimal::from_f64(*v),
        other => Decimal::from_i128(other.as_numeric()?.to_i128()?),
    }
}

/// Whether a float or decimal value carries a fractional part.
pub(crate) fn has_fraction(value: &Value) -> bool {
    match value {
        Value::F32(v) => v.fract() != 0.0,
        Value::F64(v) => v.fract() != 0.0,
        Value::Decimal(d) => !d.fract().is_zero(),
        _ => false,
    }
}

/// Whether a float value is NaN or infinite.
pub(crate) fn is_non_finite(value: &Value) -> bool {
    match value {
        Value::F32(v) => !v.is_finite(),
        Value::F64(v) => !v.is_finite(),
        _ => false,
    }
}

/// Integral value widened into `i128`, the domain enum members live in.
pub(crate) fn to_i128(value: &Value) -> Option<i128> {
    value.as_numeric()?.to_i128()
}
