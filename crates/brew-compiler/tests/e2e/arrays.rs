//! Array literals, static array constants and runtime arrays

use super::harness::*;
use brew_compiler::{
    ArrayLiteral, ArrayValues, BinaryOp, ClassBuilder, CompileError, Expr, Loop, Stmt, Type,
    MAX_ARRAY_LITERAL_LEN,
};

fn ints(jvm: &Jvm, field: &str) -> Vec<i32> {
    let array = jvm.get_static(field).expect("field is initialized");
    jvm.array(array)
        .unwrap()
        .iter()
        .map(|v| match v {
            Value::Int(i) => *i,
            other => panic!("unexpected element {:?}", other),
        })
        .collect()
}

#[test]
fn test_static_constants_of_every_kind() {
    let mut builder = ClassBuilder::new(CLASS);
    builder
        .static_array_constant("FLAGS", ArrayValues::Boolean(vec![true, false, true]))
        .unwrap()
        .static_array_constant("BYTES", ArrayValues::Byte(vec![-128, 0, 127]))
        .unwrap()
        .static_array_constant("CHARS", ArrayValues::Char(vec![65, 0xFFFF]))
        .unwrap()
        .static_array_constant("SHORTS", ArrayValues::Short(vec![i16::MIN, -1, 300]))
        .unwrap()
        .static_array_constant("INTS", ArrayValues::Int(vec![-1, 5, 6, 200, 40_000, i32::MIN]))
        .unwrap()
        .static_array_constant("LONGS", ArrayValues::Long(vec![0, 1, -1, i64::MAX]))
        .unwrap()
        .static_array_constant("FLOATS", ArrayValues::Float(vec![0.0, 2.0, -0.0, 1.5]))
        .unwrap()
        .static_array_constant("DOUBLES", ArrayValues::Double(vec![1.0, -2.25]))
        .unwrap();
    let jvm = load(builder);

    assert_eq!(ints(&jvm, "FLAGS"), vec![1, 0, 1]);
    assert_eq!(ints(&jvm, "BYTES"), vec![-128, 0, 127]);
    assert_eq!(ints(&jvm, "CHARS"), vec![65, 0xFFFF]);
    assert_eq!(ints(&jvm, "SHORTS"), vec![-32768, -1, 300]);
    assert_eq!(ints(&jvm, "INTS"), vec![-1, 5, 6, 200, 40_000, i32::MIN]);

    let longs = jvm.array(jvm.get_static("LONGS").unwrap()).unwrap();
    assert_eq!(
        longs,
        &[Value::Long(0), Value::Long(1), Value::Long(-1), Value::Long(i64::MAX)]
    );

    let floats = jvm.array(jvm.get_static("FLOATS").unwrap()).unwrap();
    let bits: Vec<u32> = floats
        .iter()
        .map(|v| match v {
            Value::Float(f) => f.to_bits(),
            other => panic!("unexpected element {:?}", other),
        })
        .collect();
    assert_eq!(
        bits,
        vec![0.0f32.to_bits(), 2.0f32.to_bits(), (-0.0f32).to_bits(), 1.5f32.to_bits()]
    );

    let doubles = jvm.array(jvm.get_static("DOUBLES").unwrap()).unwrap();
    assert_eq!(doubles, &[Value::Double(1.0), Value::Double(-2.25)]);

    let class = jvm.class();
    let signature = class
        .fields
        .iter()
        .find_map(|f| class.field_signature(f).filter(|(name, _)| *name == "INTS"));
    assert_eq!(signature, Some(("INTS", "[I")));
}

#[test]
fn test_literals_at_the_ceiling() {
    let n = MAX_ARRAY_LITERAL_LEN;
    let mut builder = ClassBuilder::new(CLASS);
    builder
        .static_array_constant("FLAGS", ArrayValues::Boolean((0..n).map(|i| i % 3 == 0).collect()))
        .unwrap()
        .static_array_constant("BYTES", ArrayValues::Byte((0..n).map(|i| i as i8).collect()))
        .unwrap()
        .static_array_constant("CHARS", ArrayValues::Char((0..n).map(|i| i as u16).collect()))
        .unwrap()
        .static_array_constant("SHORTS", ArrayValues::Short((0..n).map(|i| -(i as i16)).collect()))
        .unwrap()
        .static_array_constant("INTS", ArrayValues::Int((0..n).map(|i| i as i32 * 100_003).collect()))
        .unwrap()
        .static_array_constant(
            "LONGS",
            ArrayValues::Long((0..n).map(|i| i as i64 * 1_000_000_007).collect()),
        )
        .unwrap()
        .static_array_constant("FLOATS", ArrayValues::Float((0..n).map(|i| i as f32 + 0.5).collect()))
        .unwrap()
        .static_array_constant(
            "DOUBLES",
            ArrayValues::Double((0..n).map(|i| i as f64 * 0.25).collect()),
        )
        .unwrap();
    let jvm = load(builder);

    for field in ["FLAGS", "BYTES", "CHARS", "SHORTS", "INTS", "LONGS", "FLOATS", "DOUBLES"] {
        let array = jvm.array(jvm.get_static(field).unwrap()).unwrap();
        assert_eq!(array.len(), n, "{}", field);
    }
    let ints = ints(&jvm, "INTS");
    assert_eq!(ints[n - 1], (n as i32 - 1) * 100_003);
    let longs = jvm.array(jvm.get_static("LONGS").unwrap()).unwrap();
    assert_eq!(longs[n - 1], Value::Long((n as i64 - 1) * 1_000_000_007));
    let doubles = jvm.array(jvm.get_static("DOUBLES").unwrap()).unwrap();
    assert_eq!(doubles[8], Value::Double(2.0));
}

#[test]
fn test_literal_over_the_ceiling() {
    let too_many = MAX_ARRAY_LITERAL_LEN + 1;
    let err = ArrayLiteral::new(ArrayValues::Int(vec![0; too_many])).unwrap_err();
    assert!(matches!(
        err,
        CompileError::ArrayLiteralTooLarge {
            len: 4097,
            max: 4096
        }
    ));

    let mut builder = ClassBuilder::new(CLASS);
    let err = builder
        .static_array_constant("BIG", ArrayValues::Double(vec![0.0; too_many]))
        .err()
        .expect("literal is rejected");
    assert!(matches!(err, CompileError::ArrayLiteralTooLarge { len: 4097, .. }));
    assert!(builder.fields().is_empty());
    assert!(builder.static_inits().is_empty());
}

#[test]
fn test_runtime_array() {
    // int[] a = new int[n]; fill with squares; sum them
    let mut method = function(
        "squares",
        &[("n", Type::INT)],
        &[("a", Type::array(Type::INT)), ("i", Type::INT), ("sum", Type::INT)],
        Type::INT,
    );
    method.extend_stmts([
        Stmt::assign("a", Expr::new_array(Type::INT, Expr::var("n"))),
        Stmt::assign("i", Expr::int(0)),
        Loop::while_true(
            Expr::cmp_lt(Expr::var("i"), Expr::array_length(Expr::var("a"))),
            vec![
                Stmt::array_set(
                    Expr::var("a"),
                    Expr::var("i"),
                    Expr::mul(Expr::var("i"), Expr::var("i")),
                ),
                Stmt::increment("i", 1),
            ],
        )
        .into(),
        Stmt::assign("sum", Expr::int(0)),
        Stmt::assign("i", Expr::int(0)),
        Loop::while_true(
            Expr::binary(BinaryOp::Lt, Expr::var("i"), Expr::var("n")),
            vec![
                Stmt::assign(
                    "sum",
                    Expr::add(
                        Expr::var("sum"),
                        Expr::array_get(Expr::var("a"), Expr::var("i")),
                    ),
                ),
                Stmt::increment("i", 1),
            ],
        )
        .into(),
        Stmt::Return(Expr::var("sum")),
    ]);
    let mut jvm = load_method(method);
    assert_eq!(
        jvm.invoke_static("squares", "(I)I", vec![Value::Int(10)]).unwrap(),
        Some(Value::Int(285))
    );
    assert_eq!(
        jvm.invoke_static("squares", "(I)I", vec![Value::Int(0)]).unwrap(),
        Some(Value::Int(0))
    );
}

#[test]
fn test_literal_in_method_body() {
    let literal = ArrayLiteral::new(ArrayValues::Short(vec![3, -4, 5])).unwrap();
    expect_i32(
        Type::INT,
        &[("a", Type::array(Type::Primitive(brew_compiler::PrimitiveType::Short)))],
        vec![
            Stmt::assign("a", Expr::ArrayLiteral(literal)),
            Stmt::Return(Expr::add(
                Expr::array_length(Expr::var("a")),
                Expr::array_get(Expr::var("a"), Expr::int(1)),
            )),
        ],
        -1,
    );
}

#[test]
fn test_empty_literal() {
    let literal = ArrayLiteral::new(ArrayValues::Long(Vec::new())).unwrap();
    assert!(literal.is_empty());
    expect_i32(
        Type::INT,
        &[],
        vec![Stmt::Return(Expr::array_length(Expr::ArrayLiteral(literal)))],
        0,
    );
}
