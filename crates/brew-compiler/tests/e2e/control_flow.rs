//! Conditionals, loops, switches and jump negation

use super::harness::*;
use brew_compiler::{
    is_dense, negate_opcode, BinaryOp, CompileError, Conditional, Expr, JumpCond, Loop,
    MethodDescriptor, Opcode, Stmt, Switch, Type,
};

fn int_vars(names: &[&'static str]) -> Vec<(&'static str, Type)> {
    names.iter().map(|name| (*name, Type::INT)).collect()
}

#[test]
fn test_counting_loop() {
    expect_i32(
        Type::INT,
        &int_vars(&["i"]),
        vec![
            Stmt::assign("i", Expr::int(0)),
            Loop::while_true(
                Expr::cmp_ne(Expr::var("i"), Expr::int(5)),
                vec![Stmt::increment("i", 1)],
            )
            .into(),
            Stmt::Return(Expr::var("i")),
        ],
        5,
    );
}

#[test]
fn test_sum_to_ten() {
    expect_i32(
        Type::INT,
        &int_vars(&["sum", "i"]),
        vec![
            Stmt::assign("sum", Expr::int(0)),
            Stmt::assign("i", Expr::int(1)),
            Loop::while_true(
                Expr::binary(BinaryOp::Le, Expr::var("i"), Expr::int(10)),
                vec![
                    Stmt::assign("sum", Expr::add(Expr::var("sum"), Expr::var("i"))),
                    Stmt::increment("i", 1),
                ],
            )
            .into(),
            Stmt::Return(Expr::var("sum")),
        ],
        55,
    );
}

#[test]
fn test_loop_that_never_runs() {
    expect_i32(
        Type::INT,
        &int_vars(&["x"]),
        vec![
            Stmt::assign("x", Expr::int(0)),
            Loop::while_true(Expr::boolean(false), vec![Stmt::assign("x", Expr::int(100))]).into(),
            Stmt::Return(Expr::var("x")),
        ],
        0,
    );
}

#[test]
fn test_else_if_chain() {
    let mut method = function("sign", &[("n", Type::INT)], &[], Type::INT);
    method.push_stmt(
        Conditional::new(
            Expr::cmp_lt(Expr::var("n"), Expr::int(0)),
            vec![Stmt::Return(Expr::int(-1))],
        )
        .else_if(
            Expr::cmp_eq(Expr::var("n"), Expr::int(0)),
            vec![Stmt::Return(Expr::int(0))],
        )
        .or_else(vec![Stmt::Return(Expr::int(1))])
        .into(),
    );
    let mut jvm = load_method(method);
    for (n, expected) in [(-5, -1), (0, 0), (7, 1), (i32::MIN, -1)] {
        let result = jvm.invoke_static("sign", "(I)I", vec![Value::Int(n)]).unwrap();
        assert_eq!(result, Some(Value::Int(expected)), "sign({})", n);
    }
}

#[test]
fn test_if_without_else_falls_through() {
    let mut method = function("clamp", &[("n", Type::INT)], &[], Type::INT);
    method.extend_stmts([
        Conditional::new(
            Expr::cmp_gt(Expr::var("n"), Expr::int(10)),
            vec![Stmt::assign("n", Expr::int(10))],
        )
        .into(),
        Stmt::Return(Expr::var("n")),
    ]);
    let mut jvm = load_method(method);
    assert_eq!(
        jvm.invoke_static("clamp", "(I)I", vec![Value::Int(50)]).unwrap(),
        Some(Value::Int(10))
    );
    assert_eq!(
        jvm.invoke_static("clamp", "(I)I", vec![Value::Int(3)]).unwrap(),
        Some(Value::Int(3))
    );
}

#[test]
fn test_break_and_continue() {
    // Sum the odd numbers in 1..=9
    expect_i32(
        Type::INT,
        &int_vars(&["i", "sum"]),
        vec![
            Stmt::assign("i", Expr::int(0)),
            Stmt::assign("sum", Expr::int(0)),
            Loop::infinite(vec![
                Stmt::increment("i", 1),
                Conditional::new(Expr::cmp_gt(Expr::var("i"), Expr::int(9)), vec![Stmt::Break]).into(),
                Conditional::new(
                    Expr::cmp_eq(
                        Expr::binary(BinaryOp::Rem, Expr::var("i"), Expr::int(2)),
                        Expr::int(0),
                    ),
                    vec![Stmt::Continue],
                )
                .into(),
                Stmt::assign("sum", Expr::add(Expr::var("sum"), Expr::var("i"))),
            ])
            .into(),
            Stmt::Return(Expr::var("sum")),
        ],
        25,
    );
}

#[test]
fn test_break_leaves_inner_loop_only() {
    // for i in 0..3 { for j in 0..100 { if j == 2 break; count++ } }
    expect_i32(
        Type::INT,
        &int_vars(&["i", "j", "count"]),
        vec![
            Stmt::assign("i", Expr::int(0)),
            Stmt::assign("count", Expr::int(0)),
            Loop::while_true(
                Expr::cmp_lt(Expr::var("i"), Expr::int(3)),
                vec![
                    Stmt::assign("j", Expr::int(0)),
                    Loop::while_true(
                        Expr::cmp_lt(Expr::var("j"), Expr::int(100)),
                        vec![
                            Conditional::new(
                                Expr::cmp_eq(Expr::var("j"), Expr::int(2)),
                                vec![Stmt::Break],
                            )
                            .into(),
                            Stmt::increment("count", 1),
                            Stmt::increment("j", 1),
                        ],
                    )
                    .into(),
                    Stmt::increment("i", 1),
                ],
            )
            .into(),
            Stmt::Return(Expr::var("count")),
        ],
        6,
    );
}

fn switch_method(keys: &[i32]) -> brew_compiler::Method {
    let mut method = function("pick", &[("k", Type::INT)], &[], Type::INT);
    let switch = keys
        .iter()
        .fold(Switch::new(Expr::var("k")), |switch, &key| {
            switch.case(key, vec![Stmt::Return(Expr::mul(Expr::int(key), Expr::int(10)))])
        })
        .default(vec![Stmt::Return(Expr::int(-1))]);
    method.push_stmt(switch.into());
    method
}

fn switch_opcode(jvm: &Jvm) -> Opcode {
    let method = jvm.class().find_method("pick", "(I)I").unwrap();
    let code = &method.code.as_ref().unwrap().code;
    brew_bytecode::decode_instructions(code)
        .unwrap()
        .into_iter()
        .map(|i| i.opcode)
        .find(|op| matches!(op, Opcode::Tableswitch | Opcode::Lookupswitch))
        .expect("a switch instruction")
}

#[test]
fn test_dense_switch() {
    let mut jvm = load_method(switch_method(&[3, 1, 2, 4]));
    assert_eq!(switch_opcode(&jvm), Opcode::Tableswitch);
    for (k, expected) in [(1, 10), (3, 30), (4, 40), (0, -1), (5, -1), (i32::MIN, -1)] {
        let result = jvm.invoke_static("pick", "(I)I", vec![Value::Int(k)]).unwrap();
        assert_eq!(result, Some(Value::Int(expected)), "pick({})", k);
    }
}

#[test]
fn test_sparse_switch() {
    let mut jvm = load_method(switch_method(&[1000, -100, 7]));
    assert_eq!(switch_opcode(&jvm), Opcode::Lookupswitch);
    for (k, expected) in [(-100, -1000), (7, 70), (1000, 10000), (8, -1)] {
        let result = jvm.invoke_static("pick", "(I)I", vec![Value::Int(k)]).unwrap();
        assert_eq!(result, Some(Value::Int(expected)), "pick({})", k);
    }
}

#[test]
fn test_switch_cases_do_not_fall_through() {
    expect_i32(
        Type::INT,
        &int_vars(&["k", "hits"]),
        vec![
            Stmt::assign("k", Expr::int(1)),
            Stmt::assign("hits", Expr::int(0)),
            Switch::new(Expr::var("k"))
                .case(1, vec![Stmt::increment("hits", 1)])
                .case(2, vec![Stmt::increment("hits", 10)])
                .default(vec![Stmt::increment("hits", 100)])
                .into(),
            Stmt::Return(Expr::var("hits")),
        ],
        1,
    );
}

#[test]
fn test_break_in_switch_leaves_loop() {
    expect_i32(
        Type::INT,
        &int_vars(&["i"]),
        vec![
            Stmt::assign("i", Expr::int(0)),
            Loop::infinite(vec![Switch::new(Expr::var("i"))
                .case(3, vec![Stmt::Break])
                .default(vec![Stmt::increment("i", 1)])
                .into()])
            .into(),
            Stmt::Return(Expr::var("i")),
        ],
        3,
    );
}

#[test]
fn test_switch_without_default_is_not_lowered() {
    let mut method = function("pick", &[("k", Type::INT)], &[], Type::INT);
    method.push_stmt(
        Switch::new(Expr::var("k"))
            .case(1, vec![Stmt::Return(Expr::int(1))])
            .into(),
    );
    let err = method.resolve("demo/Test").unwrap_err();
    assert!(matches!(err, CompileError::IncompleteSwitch { .. }));
    assert!(method.body().iter().all(|(_, block)| block.is_empty()));
    assert_eq!(method.state(), brew_compiler::MethodState::Unresolved);
}

#[test]
fn test_float_comparisons_with_nan() {
    let mut below = function("below", &[("x", Type::FLOAT)], &[], Type::BOOLEAN);
    below.push_stmt(Stmt::Return(Expr::cmp_lt(Expr::var("x"), Expr::float(1.0))));
    let mut not_below = function("notBelow", &[("x", Type::FLOAT)], &[], Type::INT);
    not_below.extend_stmts([
        Conditional::new(
            Expr::not(Expr::cmp_lt(Expr::var("x"), Expr::float(1.0))),
            vec![Stmt::Return(Expr::int(1))],
        )
        .into(),
        Stmt::Return(Expr::int(0)),
    ]);
    let mut at_least = function("atLeast", &[("x", Type::DOUBLE)], &[], Type::BOOLEAN);
    at_least.push_stmt(Stmt::Return(Expr::binary(
        BinaryOp::Ge,
        Expr::var("x"),
        Expr::double(1.0),
    )));

    let mut builder = brew_compiler::ClassBuilder::new(CLASS);
    builder.method(below);
    builder.method(not_below);
    builder.method(at_least);
    let mut jvm = load(builder);

    let nan = Value::Float(f32::NAN);
    assert_eq!(jvm.invoke_static("below", "(F)Z", vec![nan]).unwrap(), Some(Value::Int(0)));
    assert_eq!(jvm.invoke_static("notBelow", "(F)I", vec![nan]).unwrap(), Some(Value::Int(1)));
    assert_eq!(
        jvm.invoke_static("atLeast", "(D)Z", vec![Value::Double(f64::NAN)]).unwrap(),
        Some(Value::Int(0))
    );
    assert_eq!(
        jvm.invoke_static("below", "(F)Z", vec![Value::Float(0.5)]).unwrap(),
        Some(Value::Int(1))
    );
}

#[test]
fn test_recursive_call() {
    let fact = MethodDescriptor::new(vec![Type::INT], Type::INT);
    let mut method = function("fact", &[("n", Type::INT)], &[], Type::INT);
    method.extend_stmts([
        Conditional::new(
            Expr::binary(BinaryOp::Le, Expr::var("n"), Expr::int(1)),
            vec![Stmt::Return(Expr::int(1))],
        )
        .into(),
        Stmt::Return(Expr::mul(
            Expr::var("n"),
            Expr::call_self("fact", fact, vec![Expr::sub(Expr::var("n"), Expr::int(1))]),
        )),
    ]);
    let mut jvm = load_method(method);
    assert_eq!(
        jvm.invoke_static("fact", "(I)I", vec![Value::Int(10)]).unwrap(),
        Some(Value::Int(3_628_800))
    );
}

#[test]
fn test_jump_negation_is_an_involution() {
    let conds = [
        JumpCond::Always,
        JumpCond::Eq,
        JumpCond::Ne,
        JumpCond::Lt,
        JumpCond::Ge,
        JumpCond::Gt,
        JumpCond::Le,
        JumpCond::IcmpEq,
        JumpCond::IcmpNe,
        JumpCond::IcmpLt,
        JumpCond::IcmpGe,
        JumpCond::IcmpGt,
        JumpCond::IcmpLe,
        JumpCond::AcmpEq,
        JumpCond::AcmpNe,
        JumpCond::Null,
        JumpCond::NonNull,
    ];
    for cond in conds {
        assert_eq!(cond.negate().negate(), cond);
        let byte = cond.opcode().to_u8();
        assert_eq!(negate_opcode(negate_opcode(byte).unwrap()).unwrap(), byte);
    }
    assert_eq!(JumpCond::Always.negate(), JumpCond::Always);
    assert_eq!(
        negate_opcode(Opcode::Goto.to_u8()).unwrap(),
        Opcode::Goto.to_u8()
    );
    assert_eq!(
        negate_opcode(Opcode::Ifnull.to_u8()).unwrap(),
        Opcode::Ifnonnull.to_u8()
    );
}

#[test]
fn test_density() {
    assert!(is_dense(&[2, 3, 4, 5]));
    assert!(!is_dense(&[2, 3, 5]));
}
