use crate::{
    bind::{Arg, Binder, Binding, BindingTarget, EmitStep, MappingPlan},
    schema::RowSchema,
    strategy::{DictionaryStrategy, ParamRole},
    types::TypeRef,
    value::{KeyComparer, Value},
};
use std::ops::Range;

impl Binder<'_> {
    /// Bind every column in `range` whose name starts with `prefix`. The key
    /// written for each column is its name with the prefix removed.
    #[must_use]
    pub fn bind_dictionary(
        &self,
        strategy: &DictionaryStrategy,
        destination: &TypeRef,
        schema: &RowSchema,
        prefix: &str,
        range: Range<usize>,
    ) -> MappingPlan {
        let container = destination.to_string();

        let columns = schema.columns_with_prefix(prefix, range);

        let capacity = i32::try_from(columns.len()).unwrap_or(i32::MAX);
        let args = strategy
            .roles
            .iter()
            .zip(&strategy.constructor.params)
            .map(|(role, param)| match role {
                ParamRole::Capacity => Arg::Const(Value::I32(capacity)),
                ParamRole::Comparer => Arg::Const(Value::Comparer(KeyComparer::OrdinalIgnoreCase)),
                ParamRole::Defaulted => Arg::Const(param.default.clone().unwrap_or(Value::Null)),
            })
            .collect();

        let mut bindings = Vec::with_capacity(columns.len());
        let mut steps = vec![EmitStep::Construct {
            constructor: strategy.constructor.clone(),
            args,
        }];
        for (index, (key, column)) in columns.into_iter().enumerate() {
            steps.push(EmitStep::AddEntry {
                binding: index,
                key: key.clone(),
                dictionary: strategy.dictionary.clone(),
            });
            bindings.push(Binding {
                retrieval: self.retrieval(column, &strategy.value, strategy.value_non_nullable_ref),
                target: BindingTarget::DictionaryKey {
                    key,
                    container: container.clone(),
                },
            });
        }

        MappingPlan {
            destination: destination.clone(),
            bindings,
            steps,
            is_partial_binding: false,
            requires_all_columns: false,
        }
    }
}
