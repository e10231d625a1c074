//! Dead private method elimination through the whole pipeline
//!
//! Only methods whose access flags are exactly `private` can be dropped, so
//! the candidates here are private instance methods.

use super::harness::*;
use brew_bytecode::{access, ClassFile};
use brew_compiler::{
    ClassBuilder, CompilerOptions, Expr, InvokeKind, Method, MethodDescriptor, Owner, Stmt, Type,
};

fn private(name: &str) -> Method {
    Method::new(name, Vec::new(), Type::INT).with_access(access::ACC_PRIVATE)
}

fn call_on(receiver: Expr, name: &str) -> Expr {
    Expr::call(
        InvokeKind::Special,
        Owner::SelfClass,
        name,
        MethodDescriptor::new(Vec::new(), Type::INT),
        vec![receiver],
    )
}

fn call(name: &str) -> Expr {
    call_on(Expr::This, name)
}

fn returning(mut method: Method, value: Expr) -> Method {
    method.push_stmt(Stmt::Return(value));
    method
}

/// `main` calls `used`; `a` and `b` only call each other
fn builder() -> ClassBuilder {
    let mut builder = ClassBuilder::new(CLASS);
    builder.default_constructor();
    builder.method(returning(
        Method::new("main", Vec::new(), Type::INT).with_access(access::ACC_PUBLIC),
        Expr::add(call("used"), Expr::int(1)),
    ));
    builder.method(returning(private("used"), Expr::int(41)));
    builder.method(returning(private("a"), call("b")));
    builder.method(returning(private("b"), call("a")));
    builder
}

fn names(class: &ClassFile) -> Vec<&str> {
    let mut names: Vec<&str> = class
        .methods
        .iter()
        .filter_map(|m| class.method_name(m))
        .collect();
    names.sort_unstable();
    names
}

#[test]
fn test_unreachable_private_cycle_is_dropped() {
    let class = compile(builder()).unwrap();
    assert_eq!(names(&class), vec!["<init>", "main", "used"]);

    let mut jvm = Jvm::new(class);
    let this = jvm.new_instance();
    assert_eq!(
        jvm.invoke_virtual(this, "main", "()I", Vec::new()).unwrap(),
        Some(Value::Int(42))
    );
}

#[test]
fn test_disabled_elimination_keeps_everything() {
    let options = CompilerOptions {
        eliminate_dead_methods: false,
        ..Default::default()
    };
    let class = compile_with(builder(), &options).unwrap();
    assert_eq!(names(&class), vec!["<init>", "a", "b", "main", "used"]);
}

#[test]
fn test_static_initializer_keeps_its_callees() {
    let mut builder = ClassBuilder::new(CLASS);
    builder.default_constructor();
    builder.static_field("SEED", Type::INT, access::ACC_STATIC);
    let fresh = Expr::New {
        class: Owner::SelfClass,
        descriptor: MethodDescriptor::new(Vec::new(), Type::VOID),
        args: Vec::new(),
    };
    builder.static_init().push_stmt(Stmt::set_static(
        Owner::SelfClass,
        "SEED",
        Type::INT,
        call_on(fresh, "seed"),
    ));
    builder.method(returning(private("seed"), Expr::int(7)));
    builder.method(returning(private("unused"), Expr::int(0)));

    let jvm = load(builder);
    assert_eq!(names(jvm.class()), vec!["<clinit>", "<init>", "seed"]);
    assert_eq!(jvm.get_static("SEED"), Some(Value::Int(7)));
}

#[test]
fn test_private_static_methods_are_roots() {
    let mut builder = ClassBuilder::new(CLASS);
    builder.method(returning(
        Method::new("helper", Vec::new(), Type::INT)
            .with_access(access::ACC_PRIVATE | access::ACC_STATIC),
        Expr::int(3),
    ));
    let class = compile(builder).unwrap();
    assert_eq!(names(&class), vec!["helper"]);
}
