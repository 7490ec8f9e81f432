use super::*;
use crate::{
    bind::Binder,
    convert::ScalarConverter,
    schema::RowSchema,
    strategy::{DeclaredNullability, TypeMappingStrategy},
    types::{ParamDescriptor, TypeRef},
};
use proptest::prelude::*;
use std::collections::HashMap;

#[derive(Debug, Default)]
struct Mixed {
    a: i32,
    b: i32,
    c: i32,
}

fn plan_for(ty: &TypeRef, names: &[&str]) -> MappingPlan {
    let schema = RowSchema::new(names.iter().map(|name| (*name, TypeRef::of::<i32>())));
    let converter = ScalarConverter::default();
    let binder = Binder::new(&converter);

    match TypeMappingStrategy::resolve(ty, &DeclaredNullability).unwrap() {
        TypeMappingStrategy::Poco(strategy) => binder
            .bind_poco(&strategy, ty, &schema, "", 0..schema.len())
            .unwrap(),
        TypeMappingStrategy::Dictionary(strategy) => {
            binder.bind_dictionary(&strategy, ty, &schema, "", 0..schema.len())
        }
    }
}

fn mixed() -> TypeRef {
    TypeDescriptor::builder::<Mixed>("tests::Mixed")
        .constructor("new", vec![ParamDescriptor::of::<i32>("c")], |args| {
            Ok(Mixed {
                c: args.take()?,
                ..Mixed::default()
            })
        })
        .field::<i32, _>("a", |m, v| m.a = v)
        .field::<i32, _>("b", |m, v| m.b = v)
        .into_type_ref()
}

/// Drive a scheduler through `order`, releasing each register right after
/// it is consumed.
fn drive(count: usize, order: &[usize]) -> (Program, Vec<(usize, usize)>) {
    let mut scheduler = ColumnScheduler::new(count);
    let mut handed = Vec::new();

    for &binding in order {
        let slot = scheduler.request(binding).unwrap();
        handed.push((binding, slot));
        scheduler.release(slot);
    }

    (scheduler.finish().unwrap(), handed)
}

#[test]
fn in_order_requests_need_one_register() {
    let (program, _) = drive(4, &[0, 1, 2, 3]);

    assert_eq!(program.fetch_order().collect::<Vec<_>>(), [0, 1, 2, 3]);
    assert_eq!(program.registers, 1);
}

#[test]
fn reverse_requests_buffer_earlier_bindings() {
    let mut scheduler = ColumnScheduler::new(3);

    let last = scheduler.request(2).unwrap();
    assert_eq!(scheduler.instrs.len(), 3);

    let middle = scheduler.request(1).unwrap();
    let first = scheduler.request(0).unwrap();
    assert_eq!(scheduler.instrs.len(), 3, "buffered values are not fetched again");

    for slot in [last, middle, first] {
        scheduler.release(slot);
    }
    let program = scheduler.finish().unwrap();

    assert_eq!(program.fetch_order().collect::<Vec<_>>(), [0, 1, 2]);
    assert_eq!(program.registers, 3);
    assert_ne!(first, middle);
    assert_ne!(middle, last);
}

#[test]
fn released_registers_are_reused() {
    let (program, handed) = drive(4, &[1, 0, 3, 2]);

    // 1 buffers 0; after both are released, 3 buffers 2 in the freed slots
    assert_eq!(program.registers, 2);
    assert_eq!(handed.len(), 4);
}

#[test]
fn second_request_for_a_binding_is_rejected() {
    let mut scheduler = ColumnScheduler::new(2);
    let slot = scheduler.request(0).unwrap();
    scheduler.release(slot);

    let err = scheduler.request(0).unwrap_err();

    assert!(matches!(err, ScheduleError::AlreadyRequested { binding: 0 }));
}

#[test]
fn unknown_bindings_are_rejected() {
    let mut scheduler = ColumnScheduler::new(2);

    let err = scheduler.request(5).unwrap_err();

    assert!(matches!(
        err,
        ScheduleError::UnknownBinding { binding: 5, count: 2 }
    ));
}

#[test]
fn buffered_values_left_over_fail_finish() {
    let mut scheduler = ColumnScheduler::new(3);
    let slot = scheduler.request(2).unwrap();
    scheduler.release(slot);

    let err = scheduler.finish().unwrap_err();

    assert!(matches!(err, ScheduleError::Unconsumed { bindings } if bindings == [0, 1]));
}

#[test]
fn constructor_argument_ahead_of_members_is_buffered() {
    let plan = plan_for(&mixed(), &["b", "a", "c"]);

    let program = compile(&plan).unwrap();

    assert_eq!(program.fetch_order().collect::<Vec<_>>(), [0, 1, 2]);
    assert_eq!(program.registers, 3);
    assert!(matches!(
        &program.instrs[3],
        Instr::Construct { args, .. } if matches!(args.as_slice(), [Operand::Slot(2)])
    ));
    assert!(matches!(program.instrs[4], Instr::Assign { binding: 0, slot: 0, .. }));
    assert!(matches!(program.instrs[5], Instr::Assign { binding: 1, slot: 1, .. }));
}

#[test]
fn dictionary_programs_interleave_fetch_and_add() {
    let plan = plan_for(&TypeRef::of::<HashMap<String, i64>>(), &["x", "y"]);

    let program = compile(&plan).unwrap();

    assert_eq!(program.registers, 1);
    assert!(matches!(program.instrs[0], Instr::Construct { .. }));
    assert!(matches!(program.instrs[1], Instr::Fetch { binding: 0, slot: 0 }));
    assert!(matches!(&program.instrs[2], Instr::AddEntry { key, .. } if key == "x"));
    assert!(matches!(program.instrs[3], Instr::Fetch { binding: 1, slot: 0 }));
    assert!(matches!(&program.instrs[4], Instr::AddEntry { key, .. } if key == "y"));
}

#[test]
fn scalar_programs_fetch_then_yield() {
    let plan = Binder::new(&ScalarConverter::default())
        .bind_scalar(
            &TypeRef::of::<i64>(),
            &RowSchema::new([("n", TypeRef::of::<i32>())]),
        )
        .unwrap();

    let program = compile(&plan).unwrap();

    assert!(matches!(
        program.instrs.as_slice(),
        [Instr::Fetch { binding: 0, slot: 0 }, Instr::Yield { slot: 0 }]
    ));
}

fn permutation() -> impl Strategy<Value = Vec<usize>> {
    (1usize..16).prop_flat_map(|n| Just((0..n).collect::<Vec<_>>()).prop_shuffle())
}

proptest! {
    #[test]
    fn every_binding_is_fetched_once_in_ascending_order(order in permutation()) {
        let (program, handed) = drive(order.len(), &order);

        let fetched = program.fetch_order().collect::<Vec<_>>();
        prop_assert_eq!(fetched, (0..order.len()).collect::<Vec<_>>());
        prop_assert!(program.registers <= order.len());

        // every request is served from the register its Fetch wrote
        let written = program
            .instrs
            .iter()
            .filter_map(|instr| match instr {
                Instr::Fetch { binding, slot } => Some((*binding, *slot)),
                _ => None,
            })
            .collect::<HashMap<_, _>>();
        for (binding, slot) in handed {
            prop_assert_eq!(written[&binding], slot);
        }
    }
}
