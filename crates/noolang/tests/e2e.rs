//! End-to-end coverage of the ten concrete input/output scenarios and the
//! boundary behaviours, run through a single `Session` the way a REPL or
//! batch runner would drive the pipeline. Styled after `meshc/tests/e2e.rs`
//! and `snowc/src/main.rs`'s `build`/`report_diagnostics` split.

use noo_ast::Type;
use noo_eval::Value;
use noolang::{DiagnosticKind, Session};

fn fresh() -> Session {
    Session::new().expect("stdlib must load")
}

#[test]
fn scenario_1_arithmetic_types_and_evaluates() {
    let mut s = fresh();
    let (value, ty) = s.run("1 + 2").unwrap();
    assert_eq!(ty, Type::float());
    assert!(matches!(value, Value::Number(n) if n == 3.0));
}

#[test]
fn scenario_2_string_concatenation() {
    let mut s = fresh();
    let (value, ty) = s.run(r#""hello" + " world""#).unwrap();
    assert_eq!(ty, Type::string());
    assert!(matches!(value, Value::String(ref v) if v == "hello world"));
}

#[test]
fn scenario_3_operator_mismatch_is_a_type_error() {
    let mut s = fresh();
    let diag = s.run(r#"1 + "hello""#).unwrap_err();
    assert_eq!(diag.kind, DiagnosticKind::Type);
}

#[test]
fn scenario_4_let_polymorphism() {
    let mut s = fresh();
    s.run("id = fn x => x").unwrap();
    let (value, ty) = s.run(r#"id "hi""#).unwrap();
    assert_eq!(ty, Type::string());
    assert!(matches!(value, Value::String(ref v) if v == "hi"));
}

#[test]
fn scenario_5_map_over_a_list() {
    let mut s = fresh();
    let (value, ty) = s.run("map (fn x => x + 1) [1, 2, 3]").unwrap();
    assert_eq!(ty, Type::list(Type::float()));
    match value {
        Value::List(items) => {
            assert_eq!(items.len(), 3);
            assert!(matches!(items[0], Value::Number(n) if n == 2.0));
            assert!(matches!(items[1], Value::Number(n) if n == 3.0));
            assert!(matches!(items[2], Value::Number(n) if n == 4.0));
        }
        other => panic!("expected a List, got {other}"),
    }
}

#[test]
fn scenario_6_duplicate_trait_implementation_is_an_error() {
    // Uses a trait name that doesn't collide with the embedded stdlib's
    // own `Show Float` implementation, so the duplicate detected here is
    // the second `implement Disp Float`, not stdlib preload noise.
    let mut s = fresh();
    s.run(r#"constraint Disp a (disp : a -> String); implement Disp Float (disp = toString)"#)
        .unwrap();
    let diag = s.run("implement Disp Float (disp = toString)").unwrap_err();
    assert_eq!(diag.kind, DiagnosticKind::Trait);
}

#[test]
fn scenario_7_ambiguous_trait_call_names_both_candidates() {
    let mut s = fresh();
    s.run(
        r#"constraint P a (d : a -> String); constraint R a (d : a -> String); implement P Float (d = toString); implement R Float (d = toString)"#,
    )
    .unwrap();
    let diag = s.run("d 42").unwrap_err();
    assert_eq!(diag.kind, DiagnosticKind::Trait);
    assert!(diag.message.contains('P') && diag.message.contains('R'));
}

#[test]
fn scenario_7_ambiguity_is_a_type_error_not_only_a_runtime_one() {
    // `check` never reaches the evaluator, so a `Trait` diagnostic here
    // proves the inferencer itself rejects the ambiguous call (§7) rather
    // than the value only looking right by `DiagnosticKind` because it
    // came from C9's runtime dispatch table.
    let mut s = fresh();
    s.run(
        r#"constraint P a (d : a -> String); constraint R a (d : a -> String); implement P Float (d = toString); implement R Float (d = toString)"#,
    )
    .unwrap();
    let diag = s.check("d 42").unwrap_err();
    assert_eq!(diag.kind, DiagnosticKind::Trait);
    assert!(diag.message.contains('P') && diag.message.contains('R'));
}

#[test]
fn stdlib_fmap_over_option_does_not_shadow_the_list_map_builtin() {
    let mut s = fresh();
    let (value, ty) = s.run("map (fn x => x + 1) [1, 2, 3]").unwrap();
    assert_eq!(ty, Type::list(Type::float()));
    assert!(matches!(value, Value::List(items) if items.len() == 3));

    let (value, ty) = s.run("fmap (fn x => x + 1) (Some 1)").unwrap();
    assert_eq!(ty, Type::variant("Option", vec![Type::float()]));
    assert!(matches!(value, Value::Constructor(ref name, ref args)
        if name == "Some" && matches!(args.as_slice(), [Value::Number(n)] if *n == 2.0)));
}

#[test]
fn scenario_8_match_on_option() {
    let mut s = fresh();
    let (value, ty) = s
        .run("match Some 1 with (Some x => x + 1; None => 0)")
        .unwrap();
    assert_eq!(ty, Type::float());
    assert!(matches!(value, Value::Number(n) if n == 2.0));
}

#[test]
fn scenario_9_accessor_as_a_function() {
    let mut s = fresh();
    let (value, ty) = s
        .run(r#"(fn obj => @name obj) {@name "Alice"}"#)
        .unwrap();
    assert_eq!(ty, Type::string());
    assert!(matches!(value, Value::String(ref v) if v == "Alice"));
}

#[test]
fn scenario_10_safe_thrush_on_ok_and_none() {
    let mut s = fresh();
    let (value, _) = s.run("Ok 5 |? (fn x => x * 2)").unwrap();
    assert!(matches!(value, Value::Constructor(ref name, ref args)
        if name == "Ok" && matches!(args.as_slice(), [Value::Number(n)] if *n == 10.0)));

    let (value, _) = s.run("None |? (fn x => x * 2)").unwrap();
    assert!(matches!(value, Value::Constructor(ref name, ref args) if name == "None" && args.is_empty()));
}

#[test]
fn empty_input_is_an_empty_program_of_type_unit() {
    let mut s = fresh();
    let (value, ty) = s.run("").unwrap();
    assert_eq!(ty, Type::unit());
    assert!(matches!(value, Value::Unit));
}

#[test]
fn only_semicolons_is_an_empty_program() {
    let mut s = fresh();
    let (_, ty) = s.run(";;;").unwrap();
    assert_eq!(ty, Type::unit());
}

#[test]
fn trailing_comma_in_list_and_record_is_accepted() {
    let mut s = fresh();
    s.run("[1, 2, 3,]").unwrap();
    s.run(r#"{@a 1, @b 2,}"#).unwrap();
}

#[test]
fn mixed_named_and_positional_fields_is_a_parse_error() {
    let mut s = fresh();
    let diag = s.run(r#"{@a 1, 2}"#).unwrap_err();
    assert_eq!(diag.kind, DiagnosticKind::Parse);
}

#[test]
fn unary_minus_is_a_negative_literal_not_subtraction() {
    let mut s = fresh();
    let (value, _) = s.run("-123").unwrap();
    assert!(matches!(value, Value::Number(n) if n == -123.0));
}

#[test]
fn binary_minus_with_space_on_the_left_is_subtraction() {
    let mut s = fresh();
    let (value, _) = s.run("10 - 3").unwrap();
    assert!(matches!(value, Value::Number(n) if n == 7.0));
}
