use std::error::Error;

use serde_json::{json, Value};
use skema::{Options, Specification, Validator};

const BASE: &str = "http://example.com/schema.json";

fn check(schema: &Value, instance: &Value) -> bool {
    skema::validate(schema, instance, BASE).unwrap()
}

fn check_draft07(schema: &Value, instance: &Value) -> bool {
    let options = Options {
        default_specification: Specification::Draft07,
        ..Options::default()
    };
    Validator::new()
        .options(options)
        .validate(schema, instance, BASE)
        .unwrap()
        .valid
}

#[test]
fn test_numeric_bounds() {
    let schema = json!({
        "type": "integer",
        "minimum": 0,
        "exclusiveMaximum": 10
    });
    assert!(check_draft07(&schema, &json!(0)));
    assert!(!check_draft07(&schema, &json!(10)));
    assert!(!check_draft07(&schema, &json!(9.9))); // not an integer
    assert!(!check_draft07(&schema, &json!("5")));
    assert!(check_draft07(&schema, &json!(9.0))); // integral float
}

#[test]
fn test_unevaluated_properties() {
    let schema = json!({
        "properties": {
            "a": { "type": "string" }
        },
        "unevaluatedProperties": false
    });
    assert!(check(&schema, &json!({"a": "x"})));
    assert!(!check(&schema, &json!({"a": "x", "b": 1})));
    assert!(!check(&schema, &json!({"a": 1})));
}

#[test]
fn test_additional_properties() {
    let schema = json!({
        "allOf": [{ "type": "object" }],
        "properties": {
            "n": { "type": "number" }
        },
        "additionalProperties": false
    });
    assert!(!check(&schema, &json!({"n": 1, "x": 2})));
    assert!(check(&schema, &json!({"n": 1})));
}

#[test]
fn test_ref_into_defs() {
    let schema = json!({
        "$id": "https://e.x/s",
        "items": { "$ref": "#/$defs/T" },
        "$defs": {
            "T": { "type": "integer" }
        }
    });
    assert!(check(&schema, &json!([1, 2, 3])));
    assert!(!check(&schema, &json!([1, "x"])));
}

#[test]
fn test_one_of() {
    let schema = json!({
        "oneOf": [
            { "type": "number" },
            { "type": "integer" }
        ]
    });
    assert!(!check(&schema, &json!(5))); // both match
    assert!(check(&schema, &json!(5.5)));
    assert!(!check(&schema, &json!("x"))); // neither matches
}

#[test]
fn test_contains_bounds() {
    let schema = json!({
        "contains": { "const": 42 },
        "minContains": 2
    });
    assert!(check(&schema, &json!([1, 42, 42, 3])));
    assert!(!check(&schema, &json!([42])));

    // minContains 0 passes with no matches, and maxContains still binds
    let schema = json!({
        "contains": { "const": 42 },
        "minContains": 0,
        "maxContains": 1
    });
    assert!(check(&schema, &json!([1, 2])));
    assert!(check(&schema, &json!([42, 1])));
    assert!(!check(&schema, &json!([42, 42])));
}

#[test]
fn test_multiple_of_exact_decimal() {
    let schema = json!({"multipleOf": 0.1});
    // exact decimal arithmetic, where binary floats disagree
    assert!(check(&schema, &json!(0.3)));
    assert!(check(&schema, &json!(1)));
    assert!(!check(&schema, &json!(0.35)));
}

#[test]
fn test_annotation_keywords_never_change_verdict() {
    let bare = json!({"type": "integer"});
    let annotated = json!({
        "type": "integer",
        "title": "a number",
        "description": "some number",
        "default": 7,
        "deprecated": true,
        "readOnly": false,
        "examples": [1, 2]
    });
    for instance in [json!(5), json!("x")] {
        assert_eq!(check(&bare, &instance), check(&annotated, &instance));
    }
}

#[test]
fn test_not_inverts() {
    let schema = json!({"type": "integer"});
    let negated = json!({"not": {"type": "integer"}});
    for instance in [json!(5), json!("x"), json!(null)] {
        assert_eq!(check(&schema, &instance), !check(&negated, &instance));
    }
}

#[test]
fn test_enum_is_any_of_consts() {
    let enumed = json!({"enum": [1, "two", [3], {"four": 4}]});
    let any_of = json!({"anyOf": [
        {"const": 1},
        {"const": "two"},
        {"const": [3]},
        {"const": {"four": 4}}
    ]});
    for instance in [
        json!(1),
        json!(1.0),
        json!("two"),
        json!([3]),
        json!({"four": 4}),
        json!("five"),
        json!(null),
    ] {
        assert_eq!(check(&enumed, &instance), check(&any_of, &instance));
    }
}

#[test]
fn test_equal_instances_validate_equally() {
    let schema = json!({"minimum": 1, "maximum": 1});
    assert_eq!(check(&schema, &json!(1)), check(&schema, &json!(1.0)));
    let schema = json!({"const": {"a": [1, 2.0]}});
    assert!(check(&schema, &json!({"a": [1.0, 2]})));
}

#[test]
fn test_cyclic_ref_terminates() {
    // a linked-list schema referring back to its own root
    let schema = json!({
        "$id": "https://e.x/list",
        "type": "object",
        "properties": {
            "value": { "type": "integer" },
            "next": { "$ref": "#" }
        },
        "required": ["value"]
    });
    let ok = json!({"value": 1, "next": {"value": 2, "next": {"value": 3}}});
    let bad = json!({"value": 1, "next": {"value": "x"}});
    assert!(check(&schema, &ok));
    assert!(!check(&schema, &bad));
}

#[test]
fn test_string_lengths_in_code_points() {
    let schema = json!({"minLength": 3, "maxLength": 3});
    assert!(check(&schema, &json!("abc")));
    assert!(check(&schema, &json!("日本語"))); // 3 code points, 9 bytes
    assert!(check(&schema, &json!("\u{1F600}ab"))); // astral plane
    assert!(!check(&schema, &json!("ab")));
}

#[test]
fn test_pattern_is_unanchored() {
    let schema = json!({"pattern": "b+c"});
    assert!(check(&schema, &json!("abbbcd")));
    assert!(!check(&schema, &json!("abd")));
    // non-strings pass
    assert!(check(&schema, &json!(12)));
}

#[test]
fn test_property_names() {
    let schema = json!({"propertyNames": {"pattern": "^x-"}});
    assert!(check(&schema, &json!({"x-a": 1, "x-b": 2})));
    assert!(!check(&schema, &json!({"x-a": 1, "b": 2})));
}

#[test]
fn test_dependent_keywords() {
    let schema = json!({
        "dependentRequired": { "a": ["b"] },
        "dependentSchemas": {
            "c": { "required": ["d"] }
        }
    });
    assert!(check(&schema, &json!({})));
    assert!(check(&schema, &json!({"a": 1, "b": 2})));
    assert!(!check(&schema, &json!({"a": 1})));
    assert!(!check(&schema, &json!({"c": 1})));
    assert!(check(&schema, &json!({"c": 1, "d": 2})));
}

#[test]
fn test_dependencies_draft07() {
    let schema = json!({
        "dependencies": {
            "a": ["b"],
            "c": { "required": ["d"] }
        }
    });
    assert!(check_draft07(&schema, &json!({"a": 1, "b": 2})));
    assert!(!check_draft07(&schema, &json!({"a": 1})));
    assert!(!check_draft07(&schema, &json!({"c": 1})));
    // dependencies is gone in 2019-09
    assert!(check(&schema, &json!({"a": 1})));
}

#[test]
fn test_if_then_else() {
    let schema = json!({
        "if": { "type": "number" },
        "then": { "minimum": 10 },
        "else": { "maxLength": 2 }
    });
    assert!(check(&schema, &json!(12)));
    assert!(!check(&schema, &json!(5)));
    assert!(check(&schema, &json!("ab")));
    assert!(!check(&schema, &json!("abc")));
}

#[test]
fn test_items_forms() {
    let positional = json!({
        "items": [{ "type": "integer" }, { "type": "string" }],
        "additionalItems": { "type": "boolean" }
    });
    assert!(check_draft07(&positional, &json!([1, "a", true, false])));
    assert!(!check_draft07(&positional, &json!([1, "a", 3])));
    assert!(check_draft07(&positional, &json!([1])));

    let uniform = json!({"items": { "type": "integer" }});
    assert!(check(&uniform, &json!([])));
    assert!(!check(&uniform, &json!([1, null])));
}

#[test]
fn test_unevaluated_items() {
    let schema = json!({
        "allOf": [
            { "items": [{ "type": "integer" }] }
        ],
        "unevaluatedItems": { "type": "string" }
    });
    assert!(check(&schema, &json!([1, "a", "b"])));
    assert!(!check(&schema, &json!([1, "a", 2])));
    assert!(check(&schema, &json!([1])));
}

#[test]
fn test_unique_items_structural() {
    let schema = json!({"uniqueItems": true});
    assert!(check(&schema, &json!([1, 2, "1"])));
    assert!(!check(&schema, &json!([1, 2, 1.0]))); // numeric equality
    assert!(!check(&schema, &json!([{"a": 1, "b": 2}, {"b": 2, "a": 1}])));
}

#[test]
fn test_reports() -> Result<(), Box<dyn Error>> {
    let schema = json!({
        "properties": {
            "a": { "type": "string" }
        },
        "unevaluatedProperties": false
    });
    let report = Validator::new()
        .collect_annotations(true)
        .collect_errors(true)
        .collect_ids(true)
        .validate(&schema, &json!({"a": "x"}), BASE)?;
    assert!(report.valid);

    // the properties annotation records the matched keys at the instance root
    let annotations = report.annotations.as_ref().unwrap();
    let by_name = annotations.get("").unwrap().get("properties").unwrap();
    let annotation = by_name.get("/properties").unwrap();
    assert_eq!(
        annotation.value,
        skema::AnnotationValue::Keys(["a".to_owned()].into())
    );
    assert_eq!(annotation.instance_location, "");
    assert!(report.errors.as_ref().unwrap().is_empty());
    assert_eq!(report.ids.as_ref().unwrap().len(), 1);

    // failures land keyed by schema location, then instance location
    let report = Validator::new()
        .collect_errors(true)
        .validate(&schema, &json!({"a": 1}), BASE)?;
    assert!(!report.valid);
    let errors = report.errors.unwrap();
    let at_type = errors
        .get("/properties/a/type")
        .and_then(|by_instance| by_instance.get("/a"));
    assert!(at_type.is_some(), "missing type error: {errors:?}");
    Ok(())
}

#[test]
fn test_fail_fast() -> Result<(), Box<dyn Error>> {
    let options = Options {
        fail_fast: true,
        ..Options::default()
    };
    let schema = json!({
        "items": { "type": "integer" }
    });
    let report = Validator::new()
        .options(options)
        .collect_errors(true)
        .validate(&schema, &json!(["a", "b"]), BASE)?;
    assert!(!report.valid);
    Ok(())
}

#[test]
fn test_content_keywords() {
    let schema = json!({
        "contentEncoding": "base64",
        "contentMediaType": "application/json"
    });
    // annotation-only by default
    assert!(check(&schema, &json!("not base64!")));

    let options = Options {
        content: true,
        ..Options::default()
    };
    let asserting = Validator::new().options(options);
    let valid = json!("eyJhIjogMX0="); // {"a": 1}
    let bad_encoding = json!("###");
    let bad_json = json!("bm90IGpzb24="); // not json
    assert!(asserting.validate(&schema, &valid, BASE).unwrap().valid);
    assert!(!asserting.validate(&schema, &bad_encoding, BASE).unwrap().valid);
    assert!(!asserting.validate(&schema, &bad_json, BASE).unwrap().valid);
}

#[test]
fn test_content_schema() {
    let schema = json!({
        "contentMediaType": "application/json",
        "contentSchema": { "required": ["a"] }
    });
    assert!(check(&schema, &json!("{}"))); // annotation-only

    let options = Options {
        content: true,
        ..Options::default()
    };
    let asserting = Validator::new().options(options);
    assert!(
        asserting
            .validate(&schema, &json!("{\"a\": 1}"), BASE)
            .unwrap()
            .valid
    );
    assert!(
        !asserting
            .validate(&schema, &json!("{}"), BASE)
            .unwrap()
            .valid
    );
}

#[test]
fn test_format_assertion_defaults() {
    let schema = json!({"format": "email"});
    let bad = json!("not an email");
    // draft-07 asserts by default, 2019-09 only annotates
    assert!(!check_draft07(&schema, &bad));
    assert!(check(&schema, &bad));

    // explicit option overrides the draft default
    let options = Options {
        format: Some(true),
        ..Options::default()
    };
    let asserting = Validator::new().options(options);
    assert!(!asserting.validate(&schema, &bad, BASE).unwrap().valid);
    assert!(
        asserting
            .validate(&schema, &json!("me@example.com"), BASE)
            .unwrap()
            .valid
    );
}
