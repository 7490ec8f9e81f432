use crate::{
    bind::{Arg, BindError, Binder, Binding, BindingTarget, EmitStep, MappingPlan, column_list},
    schema::{Column, RowSchema},
    strategy::{BindableMember, PocoStrategy},
    types::{MemberKind, TypeRef},
    value::{Value, casefold},
};
use std::{
    collections::{BTreeMap, HashSet},
    ops::Range,
};

///
/// SlotBinding
///
/// A column claimed by one bindable slot, before bindings are ordered.
///

struct SlotBinding<'c> {
    /// Case-folded column name with the prefix removed.
    name: String,
    column: &'c Column,
    slot: BindableMember,
}

impl Binder<'_> {
    /// Bind columns to a POCO: constructor parameters first, then writable
    /// properties and fields for whatever columns remain.
    pub fn bind_poco(
        &self,
        strategy: &PocoStrategy,
        destination: &TypeRef,
        schema: &RowSchema,
        prefix: &str,
        range: Range<usize>,
    ) -> Result<MappingPlan, BindError> {
        let columns = schema.columns_with_prefix(prefix, range);

        // duplicate names: the first column wins
        let mut by_name = BTreeMap::<String, &Column>::new();
        for (name, column) in &columns {
            by_name.entry(casefold(name).into_owned()).or_insert(*column);
        }

        let (constructor, mut claimed) = match find_constructor(strategy, &by_name) {
            Some((c, claims)) => (Some(c), claims),
            None if strategy.descriptor.is_value_type() => (None, Vec::new()),
            None => {
                return Err(BindError::NoQualifyingConstructor {
                    destination: destination.to_string(),
                    columns: column_list(&columns),
                });
            }
        };
        let mut bound_names = claimed
            .iter()
            .map(|claim| claim.name.clone())
            .collect::<HashSet<_>>();

        for (name, column) in &columns {
            let folded = casefold(name).into_owned();
            if bound_names.contains(&folded) {
                continue;
            }

            let best = strategy
                .lookup(&folded)
                .iter()
                .filter_map(|slot| match slot {
                    BindableMember::Member(index) => Some((*slot, &strategy.members()[*index])),
                    BindableMember::Param { .. } => None,
                })
                .min_by_key(|(_, member)| (member.kind == MemberKind::Field, member.name != *name));

            if let Some((slot, _)) = best {
                bound_names.insert(folded.clone());
                claimed.push(SlotBinding {
                    name: folded,
                    column: *column,
                    slot,
                });
            }
        }

        if claimed.is_empty() {
            return Err(BindError::NoBindings {
                destination: destination.to_string(),
                columns: column_list(&columns),
            });
        }

        claimed.sort_by_key(|claim| claim.column.index);
        let owner = strategy.descriptor.path();

        let mut bindings = Vec::with_capacity(claimed.len());
        let mut assigns = Vec::new();
        let mut param_bindings = BTreeMap::new();
        for (index, claim) in claimed.iter().enumerate() {
            let non_nullable = strategy.is_non_nullable_reference(claim.slot);

            let (dest, target) = match claim.slot {
                BindableMember::Param {
                    constructor,
                    position,
                } => {
                    let param = strategy.param(constructor, position);
                    param_bindings.insert(position, index);

                    let target = BindingTarget::ConstructorParam {
                        owner: owner.to_string(),
                        constructor: strategy.constructors()[constructor].label.clone(),
                        param: param.name().to_string(),
                    };
                    (&param.ty, target)
                }
                BindableMember::Member(m) => {
                    let member = &strategy.members()[m];
                    assigns.push(EmitStep::Assign {
                        binding: index,
                        member: member.clone(),
                    });

                    let target = match member.kind {
                        MemberKind::Property => BindingTarget::Property {
                            owner: owner.to_string(),
                            name: member.name.clone(),
                        },
                        MemberKind::Field => BindingTarget::Field {
                            owner: owner.to_string(),
                            name: member.name.clone(),
                        },
                    };
                    (&member.ty, target)
                }
            };

            bindings.push(Binding {
                retrieval: self.retrieval(claim.column, dest, non_nullable),
                target,
            });
        }

        let mut steps = Vec::with_capacity(assigns.len() + 1);
        match constructor {
            Some(c) => {
                let constructor = &strategy.constructors()[c];
                let args = constructor
                    .params
                    .iter()
                    .enumerate()
                    .map(|(position, param)| match param_bindings.get(&position) {
                        Some(binding) => Arg::Binding(*binding),
                        None => Arg::Const(param.default.clone().unwrap_or(Value::Null)),
                    })
                    .collect();

                steps.push(EmitStep::Construct {
                    constructor: constructor.clone(),
                    args,
                });
            }
            None => steps.push(EmitStep::DefaultInit {
                descriptor: strategy.descriptor.clone(),
            }),
        }
        steps.extend(assigns);

        Ok(MappingPlan {
            destination: destination.clone(),
            is_partial_binding: bindings.len() < strategy.name_count(),
            bindings,
            steps,
            requires_all_columns: true,
        })
    }
}

/// The constructor binding the most columns; ties go to the one with fewer
/// parameters, then to declaration order.
fn find_constructor<'c>(
    strategy: &PocoStrategy,
    by_name: &BTreeMap<String, &'c Column>,
) -> Option<(usize, Vec<SlotBinding<'c>>)> {
    let mut best: Option<(usize, Vec<SlotBinding<'c>>)> = None;

    for (c, constructor) in strategy.constructors().iter().enumerate() {
        let Some(claims) = bind_constructor(strategy, c, by_name) else {
            continue;
        };

        let better = best.as_ref().is_none_or(|(best_c, best_claims)| {
            claims.len() > best_claims.len()
                || (claims.len() == best_claims.len()
                    && constructor.params.len() < strategy.constructors()[*best_c].params.len())
        });
        if better {
            best = Some((c, claims));
        }
    }

    best
}

fn bind_constructor<'c>(
    strategy: &PocoStrategy,
    c: usize,
    by_name: &BTreeMap<String, &'c Column>,
) -> Option<Vec<SlotBinding<'c>>> {
    let mut claims = Vec::new();

    for (position, param) in strategy.constructors()[c].params.iter().enumerate() {
        if param.by_ref {
            return None;
        }

        let name = param.name.as_deref().map(|name| casefold(name).into_owned());
        let matched = name.and_then(|name| {
            let column = *by_name.get(&name)?;
            let taken = claims
                .iter()
                .any(|claim: &SlotBinding<'_>| claim.column.index == column.index);

            (!taken).then_some((name, column))
        });

        match matched {
            Some((name, column)) => claims.push(SlotBinding {
                name,
                column,
                slot: BindableMember::Param {
                    constructor: c,
                    position,
                },
            }),
            None if param.has_default() => {}
            None => return None,
        }
    }

    Some(claims)
}
