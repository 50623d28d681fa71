use relmap::transform::{
    ast::{Expression, Operator, Value},
    parser::TransformParser,
    TransformRegistry, ValueTransformer,
};
use relmap::mapping::FieldMapping;
use relmap::{EngineConfig, TransformError};
use serde_json::json;
use std::sync::Arc;

fn apply(transform: &str, value: serde_json::Value) -> Result<serde_json::Value, TransformError> {
    ValueTransformer::new(Arc::new(TransformRegistry::new())).try_apply(transform, &value)
}

#[test]
fn test_parse_simple_arithmetic() {
    let parser = TransformParser::new();
    let expr = parser.parse_expression("val + 1").unwrap();
    assert_eq!(
        expr,
        Expression::BinaryOp {
            left: Box::new(Expression::Variable("val".to_string())),
            operator: Operator::Add,
            right: Box::new(Expression::Literal(Value::Integer(1))),
        }
    );
}

#[test]
fn test_operator_precedence_and_associativity() {
    assert_eq!(apply("1 + 2 * 3", json!(null)), Ok(json!(7)));
    assert_eq!(apply("10 - 4 - 3", json!(null)), Ok(json!(3)));
    assert_eq!(apply("2 ^ 3 ^ 2", json!(null)), Ok(json!(512)));
    assert_eq!(apply("-val ^ 2", json!(3)), Ok(json!(-9)));
    assert_eq!(apply("-2 ^ 2", json!(null)), Ok(json!(-4)));
    assert_eq!(apply("(-val) ^ 2", json!(3)), Ok(json!(9)));
    assert_eq!(apply("2 ^ -1", json!(null)), Ok(json!(0.5)));
    assert_eq!(apply("val % 4 == 1 && !(val > 10)", json!(5)), Ok(json!(true)));
}

#[test]
fn test_strings_and_conditionals() {
    assert_eq!(apply("'id-' + to_string(val)", json!(7)), Ok(json!("id-7")));
    assert_eq!(
        apply("let s = trim(val); if s == \"\" then null else lower(s)", json!("  MiXeD ")),
        Ok(json!("mixed"))
    );
    assert_eq!(apply("coalesce(val, 0)", json!(null)), Ok(json!(0)));
}

#[test]
fn test_integral_results_stay_integers() {
    assert_eq!(apply("val * 2", json!(21)), Ok(json!(42)));
    assert_eq!(apply("val * 1.5", json!(3)), Ok(json!(4.5)));
    assert!(apply("val * 2", json!(21)).unwrap().is_i64());
}

#[test]
fn test_large_integers_survive_expressions() {
    let big = json!(9007199254740993i64);
    assert_eq!(apply("val", big.clone()), Ok(big.clone()));
    assert_eq!(apply("if val > 0 then val else 0", big.clone()), Ok(big.clone()));
    assert_eq!(apply("val - 1", big), Ok(json!(9007199254740992i64)));
    assert_eq!(apply("val", json!(u64::MAX)), Ok(json!(u64::MAX)));
    assert_eq!(apply("max(val, 0)", json!(i64::MIN)), Ok(json!(0)));
    assert!(apply("val * val", json!(i64::MAX)).is_err());
}

#[test]
fn test_cached_and_uncached_resolution_agree() {
    let registry = Arc::new(TransformRegistry::new());
    registry.register("text", "shout", |v| {
        v.as_str()
            .map(|s| json!(s.to_uppercase()))
            .ok_or_else(|| "not a string".to_string())
    });
    let cached = ValueTransformer::new(Arc::clone(&registry));
    let uncached = ValueTransformer::from_config(
        &EngineConfig {
            cache_transforms: false,
            ..EngineConfig::default()
        },
        Arc::clone(&registry),
    );

    let transforms = ["val * 2", "@text.shout", "@text.missing", "val +", "concat(val, '!')"];
    let values = [json!(21), json!("hi"), json!(null), json!(9007199254740993i64)];
    // each pair is evaluated twice so the second round is served from the cache
    for _ in 0..2 {
        for transform in transforms {
            let field = FieldMapping::column("TEXT")
                .with_dest("out")
                .with_transform(transform);
            for value in &values {
                assert_eq!(
                    cached.try_apply(transform, value),
                    uncached.try_apply(transform, value),
                    "{} on {}",
                    transform,
                    value
                );
                assert_eq!(
                    cached.apply(&field, value.clone()),
                    uncached.apply(&field, value.clone())
                );
            }
        }
    }

    registry.register("text", "shout", |_| Ok(json!("replaced")));
    assert_eq!(cached.try_apply("@text.shout", &json!("a")), Ok(json!("replaced")));
    assert_eq!(uncached.try_apply("@text.shout", &json!("a")), Ok(json!("replaced")));
}

#[test]
fn test_capabilities_outside_the_language_fail_closed() {
    for source in [
        "open(\"/etc/passwd\")",
        "import os",
        "__import__('os').system('ls')",
        "val.__class__",
        "exec('1')",
        "env(\"HOME\")",
    ] {
        assert!(apply(source, json!("x")).is_err(), "{}", source);
    }
}

#[test]
fn test_runtime_errors_are_reported() {
    assert!(matches!(apply("val / 0", json!(1)), Err(TransformError::Evaluation(_))));
    assert!(matches!(apply("val +", json!(1)), Err(TransformError::Parse(_))));
    assert!(matches!(
        apply("to_number(val)", json!("abc")),
        Err(TransformError::Function { .. })
    ));
    assert!(matches!(
        apply("@not.registered", json!(1)),
        Err(TransformError::Unregistered { .. })
    ));
}
