//! Sequential column scheduler.
//!
//! Cursors are forward-only and each column may be read once, but emission
//! steps ask for bindings in whatever order the destination needs them. The
//! scheduler turns those requests into register-machine instructions that
//! fetch every binding exactly once, in ascending binding (and therefore
//! column) order, buffering values that are fetched before they are needed.
//!
//! A plan is a single linear sequence of steps; conditional fetch paths are
//! not supported.

#[cfg(test)]
mod tests;

use crate::{
    bind::{Arg, EmitStep, MappingPlan},
    types::{ConstructorDescriptor, DictionaryImpl, MemberDescriptor, TypeDescriptor},
    value::Value,
};
use std::{collections::HashMap, sync::Arc};
use thiserror::Error as ThisError;

///
/// ScheduleError
///

#[derive(Debug, ThisError)]
pub enum ScheduleError {
    #[error("binding {binding} was requested more than once")]
    AlreadyRequested { binding: usize },

    #[error("binding {binding} does not exist; the plan has {count} bindings")]
    UnknownBinding { binding: usize, count: usize },

    #[error("bindings {bindings:?} were fetched but never consumed")]
    Unconsumed { bindings: Vec<usize> },
}

///
/// Operand
///

#[derive(Clone, Debug)]
pub enum Operand {
    Slot(usize),
    Const(Value),
}

///
/// Instr
///

#[derive(Clone, Debug)]
pub enum Instr {
    /// Read a binding's column from the cursor into a register.
    Fetch { binding: usize, slot: usize },
    Construct {
        constructor: ConstructorDescriptor,
        args: Vec<Operand>,
    },
    DefaultInit { descriptor: Arc<TypeDescriptor> },
    Assign {
        binding: usize,
        member: MemberDescriptor,
        slot: usize,
    },
    AddEntry {
        binding: usize,
        key: String,
        dictionary: DictionaryImpl,
        slot: usize,
    },
    Yield { slot: usize },
}

///
/// Program
///

#[derive(Clone, Debug)]
pub struct Program {
    pub instrs: Vec<Instr>,
    pub registers: usize,
}

impl Program {
    /// Bindings in the order the program fetches them.
    pub fn fetch_order(&self) -> impl Iterator<Item = usize> + '_ {
        self.instrs.iter().filter_map(|instr| match instr {
            Instr::Fetch { binding, .. } => Some(*binding),
            _ => None,
        })
    }
}

///
/// ColumnScheduler
///

#[derive(Debug)]
pub struct ColumnScheduler {
    next: usize,
    requested: Vec<bool>,
    buffered: HashMap<usize, usize>,
    free: Vec<usize>,
    registers: usize,
    instrs: Vec<Instr>,
}

impl ColumnScheduler {
    #[must_use]
    pub fn new(binding_count: usize) -> Self {
        Self {
            next: 0,
            requested: vec![false; binding_count],
            buffered: HashMap::new(),
            free: Vec::new(),
            registers: 0,
            instrs: Vec::new(),
        }
    }

    /// Register holding `binding`'s value. Earlier unread bindings are
    /// fetched and buffered first; a buffered binding is handed over without
    /// another read. The caller releases the register once it is consumed.
    pub fn request(&mut self, binding: usize) -> Result<usize, ScheduleError> {
        if let Some(slot) = self.buffered.remove(&binding) {
            return Ok(slot);
        }

        match self.requested.get(binding) {
            None => {
                return Err(ScheduleError::UnknownBinding {
                    binding,
                    count: self.requested.len(),
                });
            }
            Some(true) => return Err(ScheduleError::AlreadyRequested { binding }),
            Some(false) => {}
        }

        while self.next < binding {
            let earlier = self.next;
            let slot = self.fetch(earlier);
            self.buffered.insert(earlier, slot);
        }

        Ok(self.fetch(binding))
    }

    pub fn release(&mut self, slot: usize) {
        self.free.push(slot);
    }

    pub fn emit(&mut self, instr: Instr) {
        self.instrs.push(instr);
    }

    pub fn finish(self) -> Result<Program, ScheduleError> {
        if !self.buffered.is_empty() {
            let mut bindings = self.buffered.into_keys().collect::<Vec<_>>();
            bindings.sort_unstable();

            return Err(ScheduleError::Unconsumed { bindings });
        }

        Ok(Program {
            instrs: self.instrs,
            registers: self.registers,
        })
    }

    fn fetch(&mut self, binding: usize) -> usize {
        let slot = self.free.pop().unwrap_or_else(|| {
            self.registers += 1;
            self.registers - 1
        });

        self.requested[binding] = true;
        self.next = binding + 1;
        self.instrs.push(Instr::Fetch { binding, slot });

        slot
    }
}

/// Lower a mapping plan into a program.
pub fn compile(plan: &MappingPlan) -> Result<Program, ScheduleError> {
    let mut scheduler = ColumnScheduler::new(plan.bindings.len());

    for step in &plan.steps {
        match step {
            EmitStep::Construct { constructor, args } => {
                let mut operands = Vec::with_capacity(args.len());
                let mut used = Vec::new();
                for arg in args {
                    match arg {
                        Arg::Binding(binding) => {
                            let slot = scheduler.request(*binding)?;
                            used.push(slot);
                            operands.push(Operand::Slot(slot));
                        }
                        Arg::Const(value) => operands.push(Operand::Const(value.clone())),
                    }
                }

                scheduler.emit(Instr::Construct {
                    constructor: constructor.clone(),
                    args: operands,
                });
                for slot in used {
                    scheduler.release(slot);
                }
            }
            EmitStep::DefaultInit { descriptor } => {
                scheduler.emit(Instr::DefaultInit {
                    descriptor: Arc::clone(descriptor),
                });
            }
            EmitStep::Assign { binding, member } => {
                let slot = scheduler.request(*binding)?;
                scheduler.emit(Instr::Assign {
                    binding: *binding,
                    member: member.clone(),
                    slot,
                });
                scheduler.release(slot);
            }
            EmitStep::AddEntry {
                binding,
                key,
                dictionary,
            } => {
                let slot = scheduler.request(*binding)?;
                scheduler.emit(Instr::AddEntry {
                    binding: *binding,
                    key: key.clone(),
                    dictionary: dictionary.clone(),
                    slot,
                });
                scheduler.release(slot);
            }
            EmitStep::Yield { binding } => {
                let slot = scheduler.request(*binding)?;
                scheduler.emit(Instr::Yield { slot });
                scheduler.release(slot);
            }
        }
    }

    scheduler.finish()
}
