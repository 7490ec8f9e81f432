//! Compiled routines: the executable form of one mapping.


use crate::{
    bind::{Binding, MappingPlan},
    cursor::RowCursor,
    error::{ColumnMappingError, MappingCause, MappingError, TypeMappingError},
    schedule::{Instr, Operand, Program},
    types::{Bindable, Instance, TypeRef},
    value::Value,
};

///
/// Output
///
/// What one routine invocation produced.
///

pub enum Output {
    Instance(Instance),
    Scalar(Value),
}

impl std::fmt::Debug for Output {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Instance(_) => f.write_str("Instance(..)"),
            Self::Scalar(value) => f.debug_tuple("Scalar").field(value).finish(),
        }
    }
}

///
/// ErrorTranslator
///
/// Wraps runtime failures with the column that was in flight, or with the
/// destination type when no column was.
///

#[derive(Clone, Debug)]
pub struct ErrorTranslator {
    destination: String,
}

impl ErrorTranslator {
    #[must_use]
    pub fn new(destination: &TypeRef) -> Self {
        Self {
            destination: destination.to_string(),
        }
    }

    #[must_use]
    pub fn translate(&self, in_flight: Option<&Binding>, cause: MappingCause) -> MappingError {
        match in_flight {
            Some(binding) => ColumnMappingError {
                column: binding.retrieval.column.clone(),
                target: binding.target.to_string(),
                cause,
            }
            .into(),
            None => TypeMappingError {
                destination: self.destination.clone(),
                cause,
            }
            .into(),
        }
    }
}

///
/// CompiledRoutine
///
/// Immutable after compilation and shared across threads; every invocation
/// owns its registers.
///

#[derive(Debug)]
pub struct CompiledRoutine {
    destination: TypeRef,
    bindings: Vec<Binding>,
    program: Program,
    is_partial_binding: bool,
    translator: ErrorTranslator,
}

impl CompiledRoutine {
    #[must_use]
    pub fn new(plan: MappingPlan, program: Program) -> Self {
        let translator = ErrorTranslator::new(&plan.destination);

        Self {
            destination: plan.destination,
            bindings: plan.bindings,
            program,
            is_partial_binding: plan.is_partial_binding,
            translator,
        }
    }

    #[must_use]
    pub const fn destination(&self) -> &TypeRef {
        &self.destination
    }

    #[must_use]
    pub fn bindings(&self) -> &[Binding] {
        &self.bindings
    }

    #[must_use]
    pub const fn program(&self) -> &Program {
        &self.program
    }

    #[must_use]
    pub const fn is_partial_binding(&self) -> bool {
        self.is_partial_binding
    }

    /// Map the cursor's current row.
    pub fn run(&self, cursor: &mut dyn RowCursor) -> Result<Output, MappingError> {
        let mut registers = vec![None; self.program.registers];
        let mut target: Option<Instance> = None;

        for instr in &self.program.instrs {
            match instr {
                Instr::Fetch { binding, slot } => {
                    let binding = self.binding(*binding)?;
                    let value = fetch(cursor, binding)
                        .map_err(|cause| self.translator.translate(Some(binding), cause))?;
                    store(&mut registers, *slot, value)?;
                }
                Instr::Construct { constructor, args } => {
                    let values = args
                        .iter()
                        .map(|operand| match operand {
                            Operand::Slot(slot) => take(&mut registers, *slot),
                            Operand::Const(value) => Ok(value.clone()),
                        })
                        .collect::<Result<Vec<_>, _>>()?;
                    let instance = constructor.invoke(values).map_err(|err| {
                        self.translator
                            .translate(None, MappingCause::Destination(err))
                    })?;
                    target = Some(instance);
                }
                Instr::DefaultInit { descriptor } => {
                    let instance = descriptor.default_init().ok_or_else(|| {
                        MappingError::Invariant(format!(
                            "{} has no default initialization",
                            descriptor.path()
                        ))
                    })?;
                    target = Some(instance);
                }
                Instr::Assign {
                    binding,
                    member,
                    slot,
                } => {
                    let binding = self.binding(*binding)?;

                    let value = take(&mut registers, *slot)?;
                    let instance = target_mut(&mut target)?;
                    member
                        .set(instance, value)
                        .map_err(|err| {
                            self.translator
                                .translate(Some(binding), MappingCause::Destination(err))
                        })?;
                }
                Instr::AddEntry {
                    binding,
                    key,
                    dictionary,
                    slot,
                } => {
                    let binding = self.binding(*binding)?;

                    let value = take(&mut registers, *slot)?;
                    let instance = target_mut(&mut target)?;
                    dictionary
                        .add(instance, key.clone(), value)
                        .map_err(|err| {
                            self.translator
                                .translate(Some(binding), MappingCause::Destination(err))
                        })?;
                }
                Instr::Yield { slot } => return take(&mut registers, *slot).map(Output::Scalar),
            }
        }

        target
            .map(Output::Instance)
            .ok_or_else(|| MappingError::Invariant("routine produced no value".to_string()))
    }

    /// Map the current row and hand it back as `T`.
    pub fn map<T: Bindable>(&self, cursor: &mut dyn RowCursor) -> Result<T, MappingError> {
        match self.run(cursor)? {
            Output::Instance(instance) => instance
                .downcast::<T>()
                .map(|value| *value)
                .map_err(|_| self.mismatch::<T>()),
            Output::Scalar(value) => T::from_value(value).map_err(|err| {
                self.translator
                    .translate(None, MappingCause::Destination(Box::new(err)))
            }),
        }
    }

    fn mismatch<T: Bindable>(&self) -> MappingError {
        MappingError::DestinationMismatch {
            expected: T::type_ref().to_string(),
            actual: self.destination.to_string(),
        }
    }

    fn binding(&self, index: usize) -> Result<&Binding, MappingError> {
        self.bindings
            .get(index)
            .ok_or_else(|| MappingError::Invariant(format!("binding {index} does not exist")))
    }
}

// Null is checked first so nullable slots never ask the cursor to produce a
// typed value for an empty cell.
fn fetch(cursor: &mut dyn RowCursor, binding: &Binding) -> Result<Value, MappingCause> {
    let retrieval = &binding.retrieval;
    let index = retrieval.column.index;

    let raw = if cursor.is_null(index).map_err(MappingCause::Cursor)? {
        Value::Null
    } else {
        cursor
            .read_column(index, &retrieval.fetch_as)
            .map_err(MappingCause::Cursor)?
    };

    Ok(retrieval.finish(raw)?)
}

fn store(registers: &mut [Option<Value>], slot: usize, value: Value) -> Result<(), MappingError> {
    let register = registers
        .get_mut(slot)
        .ok_or_else(|| MappingError::Invariant(format!("register {slot} does not exist")))?;
    *register = Some(value);

    Ok(())
}

fn take(registers: &mut [Option<Value>], slot: usize) -> Result<Value, MappingError> {
    registers
        .get_mut(slot)
        .and_then(Option::take)
        .ok_or_else(|| MappingError::Invariant(format!("register {slot} is empty")))
}

fn target_mut(
    target: &mut Option<Instance>,
) -> Result<&mut (dyn std::any::Any + Send), MappingError> {
    target
        .as_deref_mut()
        .ok_or_else(|| MappingError::Invariant("member assigned before construction".to_string()))
}
