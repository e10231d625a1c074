//! Failures surface as a single error type naming the class

use super::harness::*;
use brew_compiler::{
    negate_opcode, BinaryOp, ClassBuilder, CompileError, CompilerOptions, Expr, Loop, Method, Op,
    Opcode, Stmt, Switch, Type, VarRef, Vars,
};

fn compile_err(method: Method) -> brew_compiler::ClassCompileError {
    let mut builder = ClassBuilder::new(CLASS);
    builder.method(method);
    compile(builder).err().expect("compilation fails")
}

#[test]
fn test_type_error_names_the_class() {
    let mut method = static_method("f", Vec::new(), Type::VOID);
    method.push_stmt(Stmt::Return(Expr::int(1)));
    let err = compile_err(method);
    assert_eq!(err.class, CLASS);
    assert!(matches!(err.source, CompileError::TypeCheck(_)));
    assert!(err.to_string().contains("demo/Test"));
}

#[test]
fn test_mismatched_operands() {
    let mut method = function("f", &[], &[("x", Type::INT)], Type::INT);
    method.extend_stmts([
        Stmt::assign("x", Expr::long(5)),
        Stmt::Return(Expr::var("x")),
    ]);
    let err = compile_err(method);
    assert!(matches!(err.source, CompileError::TypeCheck(_)));
}

#[test]
fn test_undefined_variable() {
    let mut method = function("f", &[], &[("x", Type::INT)], Type::INT);
    method.push_stmt(Stmt::Return(Expr::var("y")));
    let err = compile_err(method);
    match err.source {
        CompileError::UndefinedVariable { name } => assert_eq!(name, "y"),
        other => panic!("unexpected error {:?}", other),
    }
}

#[test]
fn test_duplicate_variable() {
    let err = Vars::new([("x", Type::INT), ("x", Type::LONG)]).unwrap_err();
    assert!(matches!(err, CompileError::DuplicateVariable { ref name } if name == "x"));
}

#[test]
fn test_break_outside_loop() {
    let mut method = static_method("f", Vec::new(), Type::VOID);
    method.push_stmt(Stmt::Break);
    assert!(matches!(compile_err(method).source, CompileError::InvalidBreak));

    let mut method = static_method("g", Vec::new(), Type::VOID);
    method.push_stmt(Stmt::Continue);
    assert!(matches!(compile_err(method).source, CompileError::InvalidContinue));
}

#[test]
fn test_break_inside_loop_is_fine() {
    let mut method = static_method("f", Vec::new(), Type::VOID);
    method.push_stmt(Loop::infinite(vec![Stmt::Break]).into());
    let mut builder = ClassBuilder::new(CLASS);
    builder.method(method);
    assert!(compile(builder).is_ok());
}

#[test]
fn test_options_from_json() {
    let err = CompilerOptions::from_json(r#"{ "major_version": 52 }"#).unwrap_err();
    assert!(matches!(err, CompileError::InvalidOptions { .. }));
    let err = CompilerOptions::from_json(r#"{ "stack_maps": true }"#).unwrap_err();
    assert!(matches!(err, CompileError::InvalidOptions { .. }));

    let options = CompilerOptions::from_json(r#"{ "major_version": 46 }"#).unwrap();
    assert_eq!(options.major_version, 46);
    assert!(options.eliminate_dead_methods);
}

#[test]
fn test_compile_rejects_bad_options() {
    let options = CompilerOptions {
        major_version: 61,
        ..Default::default()
    };
    let mut builder = ClassBuilder::new(CLASS);
    builder.method(static_method("f", Vec::new(), Type::VOID));
    let err = builder.compile(&options).unwrap_err();
    assert!(matches!(err.source, CompileError::InvalidOptions { .. }));
}

#[test]
fn test_negating_a_non_branch_opcode() {
    let err = negate_opcode(Opcode::Iadd.to_u8()).unwrap_err();
    assert!(matches!(err, CompileError::InvalidJump { opcode } if opcode == 0x60));
}

#[test]
fn test_negative_raw_slot() {
    let mut method = static_method("f", Vec::new(), Type::INT);
    let entry = method.new_block();
    method
        .block_mut(entry)
        .unwrap()
        .extend([Op::load(VarRef::Slot(-1), Type::INT), Op::Return { ty: Type::INT }]);
    assert!(matches!(
        compile_err(method).source,
        CompileError::NegativeSlot { slot: -1 }
    ));
}

#[test]
fn test_string_switch_is_unsupported() {
    let mut method = function("f", &[("s", Type::string())], &[], Type::INT);
    method.extend_stmts([
        Switch::new(Expr::var("s"))
            .string_case("a", vec![Stmt::Return(Expr::int(1))])
            .default(vec![Stmt::Return(Expr::int(0))])
            .into(),
    ]);
    assert!(matches!(
        compile_err(method).source,
        CompileError::UnsupportedFeature { .. }
    ));
}

#[test]
fn test_ordered_reference_comparison_is_unsupported() {
    let mut method = function(
        "f",
        &[("a", Type::string()), ("b", Type::string())],
        &[],
        Type::BOOLEAN,
    );
    method.push_stmt(Stmt::Return(Expr::binary(
        BinaryOp::Lt,
        Expr::var("a"),
        Expr::var("b"),
    )));
    assert!(matches!(
        compile_err(method).source,
        CompileError::UnsupportedFeature { .. }
    ));
}

#[test]
fn test_duplicate_switch_case() {
    let mut method = function("f", &[("k", Type::INT)], &[], Type::INT);
    method.push_stmt(
        Switch::new(Expr::var("k"))
            .case(1, vec![Stmt::Return(Expr::int(1))])
            .case(1, vec![Stmt::Return(Expr::int(2))])
            .default(vec![Stmt::Return(Expr::int(0))])
            .into(),
    );
    assert!(matches!(
        compile_err(method).source,
        CompileError::DuplicateCase { key: 1 }
    ));
}
