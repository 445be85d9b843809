mod common;

use common::{TestResult, compile, compile_errors, evaluate, feature};
use mapstyle::{Color, EvaluationContext, JsonFeature, NodeKind, Type, Value};
use serde_json::json;

#[test]
fn sum_of_feature_properties() -> TestResult {
    let expr = json!(["+", ["get", "a"], ["get", "b"]]);
    let both = feature(json!({"a": 2, "b": 3}));
    assert_eq!(evaluate(expr.clone(), 3.0, &both)?, Value::Number(5.0));
    assert_eq!(evaluate(expr.clone(), 18.0, &both)?, Value::Number(5.0));

    let missing = feature(json!({"a": 2}));
    let err = evaluate(expr, 3.0, &missing).unwrap_err();
    assert!(err.message.contains("'b'"), "{}", err.message);
    Ok(())
}

#[test]
fn case_only_evaluates_the_taken_branch() -> TestResult {
    // The second condition needs a feature and would fail without one.
    let expr = compile(json!(["case", true, 1, ["boolean", ["get", "missing"]], 2, 3]), None);
    assert_eq!(expr.evaluate(&EvaluationContext::default())?, Value::Number(1.0));
    Ok(())
}

#[test]
fn case_falls_through_to_otherwise() -> TestResult {
    let expr = json!([
        "case",
        ["==", ["get", "kind"], "a"],
        "first",
        ["==", ["get", "kind"], "b"],
        "second",
        "none"
    ]);
    assert_eq!(evaluate(expr.clone(), 0.0, &feature(json!({"kind": "b"})))?, Value::from("second"));
    assert_eq!(evaluate(expr, 0.0, &feature(json!({"kind": "z"})))?, Value::from("none"));
    Ok(())
}

#[test]
fn coalesce_returns_first_success() -> TestResult {
    let expr = json!(["coalesce", ["number", ["get", "a"]], ["number", ["get", "b"]], 5]);
    assert_eq!(evaluate(expr, 0.0, &feature(json!({})))?, Value::Number(5.0));
    Ok(())
}

#[test]
fn coalesce_reports_the_last_error() {
    let expr = json!(["coalesce", ["number", ["get", "a"]], ["number", ["get", "b"]]]);
    let err = evaluate(expr, 0.0, &feature(json!({}))).unwrap_err();
    assert_eq!(err.message, "Property 'b' not found in feature.properties");
}

#[test]
fn match_requires_integral_numbers() -> TestResult {
    let expr = json!(["match", ["get", "n"], 2, "two", [3, 4], "three or four", "other"]);
    assert_eq!(evaluate(expr.clone(), 0.0, &feature(json!({"n": 2.0})))?, Value::from("two"));
    assert_eq!(
        evaluate(expr.clone(), 0.0, &feature(json!({"n": 4})))?,
        Value::from("three or four")
    );
    assert_eq!(evaluate(expr, 0.0, &feature(json!({"n": 2.5})))?, Value::from("other"));
    Ok(())
}

#[test]
fn match_inputs_beyond_exact_integers_miss() -> TestResult {
    let expr = json!(["match", ["get", "n"], 9007199254740991_i64, "max", "other"]);
    let max = feature(json!({"n": 9007199254740991_i64}));
    assert_eq!(evaluate(expr.clone(), 0.0, &max)?, Value::from("max"));
    assert_eq!(evaluate(expr, 0.0, &feature(json!({"n": 1e25})))?, Value::from("other"));
    Ok(())
}

#[test]
fn match_input_is_asserted_at_runtime() {
    let expr = json!(["match", ["get", "n"], 2, "two", "other"]);
    let err = evaluate(expr, 0.0, &feature(json!({"n": "2"}))).unwrap_err();
    assert_eq!(err.message, "Expected value to be of type Number, but found String instead.");
}

#[test]
fn match_shares_one_output_between_labels() {
    let expr = compile(json!(["match", "a", ["a", "b", "c"], 1, 0]), None);
    let NodeKind::Match { cases, outputs, .. } = &expr.node(expr.root()).kind else {
        panic!("expected a match node");
    };
    assert_eq!(cases.len(), 3);
    assert_eq!(outputs.len(), 1);
}

#[test]
fn step_curve_clamps_and_includes_lower_stop() -> TestResult {
    let expr = compile(json!(["curve", ["step"], ["zoom"], 5, "a", 10, "b"]), None);
    let at = |zoom: f64| expr.evaluate(&EvaluationContext::zoom_only(zoom));
    assert_eq!(at(0.0)?, Value::from("a"));
    assert_eq!(at(5.0)?, Value::from("a"));
    assert_eq!(at(7.5)?, Value::from("a"));
    assert_eq!(at(10.0)?, Value::from("b"));
    assert_eq!(at(100.0)?, Value::from("b"));
    Ok(())
}

#[test]
fn curve_at_a_stop_does_not_evaluate_its_neighbour() -> TestResult {
    let expr = compile(
        json!(["curve", ["linear"], ["zoom"], 0, 1, 10, 2, 20, ["number", ["get", "missing"]]]),
        None,
    );
    assert_eq!(expr.evaluate(&EvaluationContext::zoom_only(10.0))?, Value::Number(2.0));
    assert!(expr.evaluate(&EvaluationContext::zoom_only(15.0)).is_err());
    Ok(())
}

#[test]
fn exponential_curve_interpolates_colors() -> TestResult {
    let expr = compile(
        json!([
            "curve",
            ["exponential", 1],
            ["zoom"],
            0,
            ["rgba", 0, 0, 0, 1],
            10,
            ["rgba", 255, 255, 255, 1]
        ]),
        Some(Type::Color),
    );
    let color = expr.evaluate_as::<Color>(&EvaluationContext::zoom_only(5.0))?;
    assert_eq!(color, Color::new(0.5, 0.5, 0.5, 1.0));
    Ok(())
}

#[test]
fn curve_interpolates_fixed_length_arrays() -> TestResult {
    let expr = compile(
        json!(["curve", ["linear"], ["zoom"], 0, ["literal", [0, 10]], 10, ["literal", [10, 0]]]),
        Some(Type::array_n(Type::Number, 2)),
    );
    assert_eq!(expr.evaluate_as::<[f64; 2]>(&EvaluationContext::zoom_only(5.0))?, [5.0, 5.0]);
    Ok(())
}

#[test]
fn zoom_is_required_for_zoom_curves() {
    let expr = compile(json!(["curve", ["step"], ["zoom"], 0, 1]), None);
    let err = expr.evaluate(&EvaluationContext::default()).unwrap_err();
    assert_eq!(
        err.message,
        "The 'zoom' expression is unavailable in the current evaluation context."
    );
}

#[test]
fn array_assertion_checks_length_at_runtime() {
    let literal = compile(json!(["array", "number", 2, ["literal", [1, 2, 3]]]), None);
    assert_eq!(literal.ty(), &Type::array_n(Type::Number, 2));
    let err = literal.evaluate(&EvaluationContext::default()).unwrap_err();
    assert_eq!(
        err.message,
        "Expected value to be of type Array<Number, 2>, but found Array<Number, 3> instead."
    );

    let from_feature = json!(["array", "number", 2, ["get", "xs"]]);
    assert!(evaluate(from_feature.clone(), 0.0, &feature(json!({"xs": [1, 2, 3]}))).is_err());
    assert!(evaluate(from_feature, 0.0, &feature(json!({"xs": [1, 2]}))).is_ok());
}

#[test]
fn array_assertion_item_types_are_distinct() -> TestResult {
    let strings = feature(json!({"xs": ["a", "b"]}));
    assert!(evaluate(json!(["array", "string", ["get", "xs"]]), 0.0, &strings).is_ok());
    assert!(evaluate(json!(["array", "number", ["get", "xs"]]), 0.0, &strings).is_err());
    assert!(evaluate(json!(["array", "boolean", ["get", "xs"]]), 0.0, &strings).is_err());

    let flags = feature(json!({"xs": [true, false]}));
    assert_eq!(
        evaluate(json!(["array", "boolean", ["get", "xs"]]), 0.0, &flags)?,
        Value::Array(vec![Value::Boolean(true), Value::Boolean(false)])
    );
    Ok(())
}

#[test]
fn at_indexes_arrays() -> TestResult {
    let expr = compile(json!(["at", 1, ["literal", [1, 2, 3]]]), None);
    assert_eq!(expr.ty(), &Type::Number);
    assert_eq!(expr.evaluate(&EvaluationContext::default())?, Value::Number(2.0));

    let out_of_bounds = compile(json!(["at", 3, ["literal", [1, 2, 3]]]), None);
    let err = out_of_bounds.evaluate(&EvaluationContext::default()).unwrap_err();
    assert_eq!(err.message, "Array index out of bounds: 3 >= 3");
    Ok(())
}

#[test]
fn length_selects_the_matching_overload() -> TestResult {
    let ctx = EvaluationContext::default();
    assert_eq!(
        compile(json!(["length", ["literal", [1, 2]]]), None).evaluate(&ctx)?,
        Value::Number(2.0)
    );
    assert_eq!(compile(json!(["length", "abc"]), None).evaluate(&ctx)?, Value::Number(3.0));

    let errors = compile_errors(json!(["length", ["literal", {"a": 1}]]), None);
    assert_eq!(errors.len(), 1);
    assert!(!errors[0].1.contains("Expected String but found"), "{}", errors[0].1);
    Ok(())
}

#[test]
fn length_of_an_untyped_value_is_ambiguous() {
    let errors = compile_errors(json!(["length", ["get", "x"]]), None);
    assert_eq!(
        errors,
        vec![(
            "".to_string(),
            "Expected arguments of type (Array<T>) | (String), but found (Value) instead.".to_string()
        )]
    );
}

#[test]
fn equality_requires_matching_operand_types() -> TestResult {
    let errors = compile_errors(json!(["==", 1, "a"]), None);
    assert_eq!(
        errors[0],
        ("[2]".to_string(), "Expected Number but found String instead.".to_string())
    );

    let road = feature(json!({"class": "motorway"}));
    assert_eq!(
        evaluate(json!(["==", ["get", "class"], "motorway"]), 0.0, &road)?,
        Value::Boolean(true)
    );
    assert_eq!(
        evaluate(json!(["!=", ["get", "class"], "motorway"]), 0.0, &road)?,
        Value::Boolean(false)
    );
    Ok(())
}

#[test]
fn equality_operand_order_does_not_matter() -> TestResult {
    let text = feature(json!({"a": "x"}));
    for (left, right) in [(json!(["get", "a"]), json!(1)), (json!(1), json!(["get", "a"]))] {
        assert_eq!(evaluate(json!(["==", left, right]), 0.0, &text)?, Value::Boolean(false));
        assert_eq!(evaluate(json!(["!=", left, right]), 0.0, &text)?, Value::Boolean(true));
    }
    let one = feature(json!({"a": 1}));
    assert_eq!(evaluate(json!(["==", 1, ["get", "a"]]), 0.0, &one)?, Value::Boolean(true));
    Ok(())
}

#[test]
fn feature_accessors() -> TestResult {
    let road = JsonFeature::new()
        .with_id(json!(42))
        .with_property("name", json!("Main"))
        .with_geometry_type(mapstyle::GeometryType::LineString);
    assert_eq!(evaluate(json!(["id"]), 0.0, &road)?, Value::Number(42.0));
    assert_eq!(evaluate(json!(["geometry-type"]), 0.0, &road)?, Value::from("LineString"));
    assert_eq!(evaluate(json!(["has", "name"]), 0.0, &road)?, Value::Boolean(true));
    assert_eq!(
        evaluate(json!(["get", "name", ["properties"]]), 0.0, &road)?,
        Value::from("Main")
    );
    Ok(())
}

#[test]
fn conversions_and_strings() -> TestResult {
    let empty = feature(json!({}));
    assert_eq!(evaluate(json!(["to-string", 1]), 0.0, &empty)?, Value::from("1"));
    assert_eq!(evaluate(json!(["to-number", " 2.5 "]), 0.0, &empty)?, Value::Number(2.5));
    assert_eq!(
        evaluate(json!(["concat", "lanes: ", ["get", "n", ["literal", {"n": 4}]]]), 0.0, &empty)?,
        Value::from("lanes: 4")
    );
    assert_eq!(evaluate(json!(["upcase", "abc"]), 0.0, &empty)?, Value::from("ABC"));
    let err = evaluate(json!(["to-number", "abc"]), 0.0, &empty).unwrap_err();
    assert_eq!(err.message, r#"Could not convert "abc" to number."#);
    Ok(())
}

#[test]
fn zoom_curve_is_found_through_coalesce() {
    let expr = compile(
        json!(["coalesce", ["number", ["get", "w"]], ["curve", ["linear"], ["zoom"], 0, 1, 10, 2]]),
        None,
    );
    let curve = expr.find_zoom_curve().expect("zoom curve");
    assert!(matches!(expr.node(curve).kind, NodeKind::Curve { .. }));

    let property_curve =
        compile(json!(["curve", ["linear"], ["number", ["get", "w"]], 0, 1, 10, 2]), None);
    assert_eq!(property_curve.find_zoom_curve(), None);
}

#[test]
fn typed_evaluation_reports_mismatches() {
    let expr = compile(json!("abc"), None);
    let err = expr.evaluate_as::<f64>(&EvaluationContext::default()).unwrap_err();
    assert_eq!(err.message, "Expected value to be of type Number, but found String instead.");
}
