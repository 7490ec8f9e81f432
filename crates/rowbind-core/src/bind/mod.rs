//! Binder/emitter: pairs columns with destination slots and lays out the
//! steps that build one destination value.

mod dictionary;
mod poco;

#[cfg(test)]
mod tests;

use crate::{
    convert::{ConversionError, ConversionPlan, ScalarConverter},
    schema::{Column, RowSchema},
    types::{ConstructorDescriptor, DictionaryImpl, MemberDescriptor, TypeDescriptor, TypeRef},
    value::Value,
};
use std::{fmt, sync::Arc};
use thiserror::Error as ThisError;

///
/// BindError
///

#[derive(Debug, ThisError)]
pub enum BindError {
    #[error("no public constructor of {destination} can be satisfied by the columns [{columns}]")]
    NoQualifyingConstructor { destination: String, columns: String },

    #[error("none of the columns [{columns}] bind to a member of {destination}")]
    NoBindings { destination: String, columns: String },

    #[error("{destination} maps from exactly one column, but the result set has {count}")]
    ColumnCount { destination: String, count: usize },
}

///
/// ColumnRetrieval
///
/// How one column is read and coerced into its slot. When the column and
/// slot types differ and a conversion exists, the column is read as its own
/// type and converted; otherwise it is read directly as the slot type.
///

#[derive(Clone, Debug)]
pub struct ColumnRetrieval {
    pub column: Column,
    pub fetch_as: TypeRef,
    pub dest: TypeRef,
    pub dest_non_nullable_ref: bool,
    pub conversion: Option<Arc<ConversionPlan>>,
}

impl ColumnRetrieval {
    #[must_use]
    pub fn new(
        column: &Column,
        dest: TypeRef,
        converter: &ScalarConverter,
        dest_non_nullable_ref: bool,
    ) -> Self {
        debug_assert!(!dest_non_nullable_ref || !dest.is_value_type());

        let conversion = (column.ty != dest)
            .then(|| converter.can_convert(&column.ty, &dest))
            .flatten();
        let fetch_as = if conversion.is_some() {
            column.ty.clone()
        } else {
            dest.clone()
        };

        Self {
            column: column.clone(),
            fetch_as,
            dest,
            dest_non_nullable_ref,
            conversion,
        }
    }

    /// Whether reading this column can never fail once the cursor returns.
    #[must_use]
    pub fn is_safe(&self) -> bool {
        self.conversion.as_ref().is_none_or(|plan| plan.is_safe())
            && self.fetch_as == self.column.ty
            && !self.dest_non_nullable_ref
            && self.dest.can_be_null()
    }

    /// Turn a raw cursor value into the slot value.
    pub fn finish(&self, raw: Value) -> Result<Value, ConversionError> {
        if raw.is_null() {
            return if self.dest.can_be_null() && !self.dest_non_nullable_ref {
                Ok(Value::Null)
            } else {
                Err(ConversionError::NullIntoNonNullable {
                    destination: self.dest.to_string(),
                })
            };
        }

        match &self.conversion {
            Some(plan) => plan.apply(raw),
            None => Ok(raw),
        }
    }
}

///
/// BindingTarget
///
/// Where a column value lands; the display text appears in diagnostics.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum BindingTarget {
    DictionaryKey { key: String, container: String },
    ConstructorParam {
        owner: String,
        constructor: String,
        param: String,
    },
    Property { owner: String, name: String },
    Field { owner: String, name: String },
    ArrayElement { element: String },
    Nested { outer: Box<Self>, inner: Box<Self> },
    Scalar { ty: String },
}

impl fmt::Display for BindingTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DictionaryKey { container, .. } => write!(f, "{container} value"),
            Self::ConstructorParam {
                owner,
                constructor,
                param,
            } => write!(f, "parameter {param} of {owner}.{constructor}"),
            Self::Property { owner, name } => write!(f, "property {name} of {owner}"),
            Self::Field { owner, name } => write!(f, "field {name} of {owner}"),
            Self::ArrayElement { element } => write!(f, "{element} element"),
            Self::Nested { outer, inner } => write!(f, "{inner} of {outer}"),
            Self::Scalar { ty } => write!(f, "scalar {ty}"),
        }
    }
}

///
/// Binding
///

#[derive(Clone, Debug)]
pub struct Binding {
    pub retrieval: ColumnRetrieval,
    pub target: BindingTarget,
}

///
/// Arg
///
/// A constructor argument: a bound column or a constant.
///

#[derive(Clone, Debug)]
pub enum Arg {
    Binding(usize),
    Const(Value),
}

///
/// EmitStep
///
/// One step of building the destination. Binding indices refer to
/// `MappingPlan::bindings`.
///

#[derive(Clone, Debug)]
pub enum EmitStep {
    Construct {
        constructor: ConstructorDescriptor,
        args: Vec<Arg>,
    },
    DefaultInit {
        descriptor: Arc<TypeDescriptor>,
    },
    Assign {
        binding: usize,
        member: MemberDescriptor,
    },
    AddEntry {
        binding: usize,
        key: String,
        dictionary: DictionaryImpl,
    },
    Yield {
        binding: usize,
    },
}

///
/// MappingPlan
///
/// Bindings in ascending column order plus the steps that consume them.
/// `is_partial_binding` reports unused destination slots, which is benign;
/// `requires_all_columns` says whether leftover source columns are an error.
///

#[derive(Clone, Debug)]
pub struct MappingPlan {
    pub destination: TypeRef,
    pub bindings: Vec<Binding>,
    pub steps: Vec<EmitStep>,
    pub is_partial_binding: bool,
    pub requires_all_columns: bool,
}

impl MappingPlan {
    /// Schema columns that no binding reads.
    #[must_use]
    pub fn unbound_columns<'a>(&self, schema: &'a RowSchema) -> Vec<&'a Column> {
        schema
            .iter()
            .filter(|column| {
                !self
                    .bindings
                    .iter()
                    .any(|binding| binding.retrieval.column.index == column.index)
            })
            .collect()
    }
}

///
/// Binder
///

pub struct Binder<'a> {
    converter: &'a ScalarConverter,
}

impl<'a> Binder<'a> {
    #[must_use]
    pub const fn new(converter: &'a ScalarConverter) -> Self {
        Self { converter }
    }

    /// Bind a non-composite destination from a single column.
    pub fn bind_scalar(
        &self,
        destination: &TypeRef,
        schema: &RowSchema,
    ) -> Result<MappingPlan, BindError> {
        let [column] = schema.columns() else {
            return Err(BindError::ColumnCount {
                destination: destination.to_string(),
                count: schema.len(),
            });
        };

        let binding = Binding {
            retrieval: ColumnRetrieval::new(column, destination.clone(), self.converter, false),
            target: BindingTarget::Scalar {
                ty: destination.to_string(),
            },
        };

        Ok(MappingPlan {
            destination: destination.clone(),
            bindings: vec![binding],
            steps: vec![EmitStep::Yield { binding: 0 }],
            is_partial_binding: false,
            requires_all_columns: true,
        })
    }

    fn retrieval(&self, column: &Column, dest: &TypeRef, non_nullable_ref: bool) -> ColumnRetrieval {
        ColumnRetrieval::new(column, dest.clone(), self.converter, non_nullable_ref)
    }
}

fn column_list(columns: &[(String, &Column)]) -> String {
    columns
        .iter()
        .map(|(_, column)| column.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
