use std::collections::HashMap;

use once_cell::sync::Lazy;
use serde_json::Value;

use crate::{context::Context, Error};

mod array;
mod core;
mod generic;
mod logic;
mod number;
mod object;
mod string;

// Evaluation classes, in the order they run within a schema object. Within a
// class, the schema's own key order is kept.
pub(crate) const CLASS_IDENTITY: u8 = 0;
pub(crate) const CLASS_ASSERTION: u8 = 1;
pub(crate) const CLASS_POST: u8 = 2;
pub(crate) const CLASS_UNEVALUATED: u8 = 3;

type ApplyFn = for<'a, 'v> fn(&'a Value, &'v Value, &mut Context<'a>) -> Result<bool, Error>;

pub(crate) struct Keyword {
    pub(crate) class: u8,
    apply: ApplyFn,
}

static KEYWORDS: Lazy<HashMap<&'static str, Keyword>> = Lazy::new(|| {
    let mut m = HashMap::<&'static str, Keyword>::new();
    let mut register = |name, class, apply| m.insert(name, Keyword { class, apply });

    // identity and structure
    register("$id", CLASS_IDENTITY, core::id);
    register("$recursiveAnchor", CLASS_IDENTITY, core::recursive_anchor);
    register("$schema", CLASS_IDENTITY, core::schema);
    register("$anchor", CLASS_IDENTITY, core::anchor);
    register("$vocabulary", CLASS_IDENTITY, core::vocabulary);
    register("$defs", CLASS_IDENTITY, core::defs);

    // references
    register("$ref", CLASS_ASSERTION, core::ref_);
    register("$recursiveRef", CLASS_ASSERTION, core::recursive_ref);
    register("definitions", CLASS_ASSERTION, core::defs);
    register("$comment", CLASS_ASSERTION, core::comment);

    // assertions
    register("type", CLASS_ASSERTION, generic::type_);
    register("enum", CLASS_ASSERTION, generic::enum_);
    register("const", CLASS_ASSERTION, generic::const_);
    register("format", CLASS_ASSERTION, generic::format);
    register("minimum", CLASS_ASSERTION, number::minimum);
    register("maximum", CLASS_ASSERTION, number::maximum);
    register("exclusiveMinimum", CLASS_ASSERTION, number::exclusive_minimum);
    register("exclusiveMaximum", CLASS_ASSERTION, number::exclusive_maximum);
    register("multipleOf", CLASS_ASSERTION, number::multiple_of);
    register("minLength", CLASS_ASSERTION, string::min_length);
    register("maxLength", CLASS_ASSERTION, string::max_length);
    register("pattern", CLASS_ASSERTION, string::pattern);
    register("contentEncoding", CLASS_ASSERTION, string::content_encoding);
    register("contentMediaType", CLASS_ASSERTION, string::content_media_type);
    register("contentSchema", CLASS_ASSERTION, string::content_schema);
    register("minItems", CLASS_ASSERTION, array::min_items);
    register("maxItems", CLASS_ASSERTION, array::max_items);
    register("uniqueItems", CLASS_ASSERTION, array::unique_items);
    register("items", CLASS_ASSERTION, array::items);
    register("contains", CLASS_ASSERTION, array::contains);
    register("minProperties", CLASS_ASSERTION, object::min_properties);
    register("maxProperties", CLASS_ASSERTION, object::max_properties);
    register("required", CLASS_ASSERTION, object::required);
    register("properties", CLASS_ASSERTION, object::properties);
    register("patternProperties", CLASS_ASSERTION, object::pattern_properties);
    register("propertyNames", CLASS_ASSERTION, object::property_names);
    register("dependencies", CLASS_ASSERTION, object::dependencies);
    register("dependentRequired", CLASS_ASSERTION, object::dependent_required);
    register("dependentSchemas", CLASS_ASSERTION, object::dependent_schemas);

    // combinators
    register("allOf", CLASS_ASSERTION, logic::all_of);
    register("anyOf", CLASS_ASSERTION, logic::any_of);
    register("oneOf", CLASS_ASSERTION, logic::one_of);
    register("not", CLASS_ASSERTION, logic::not);
    register("if", CLASS_ASSERTION, logic::if_);

    // annotation-only
    register("title", CLASS_ASSERTION, generic::title);
    register("description", CLASS_ASSERTION, generic::description);
    register("default", CLASS_ASSERTION, generic::default_);
    register("deprecated", CLASS_ASSERTION, generic::deprecated);
    register("readOnly", CLASS_ASSERTION, generic::read_only);
    register("writeOnly", CLASS_ASSERTION, generic::write_only);
    register("examples", CLASS_ASSERTION, generic::examples);

    // post-applicator: these consume annotations of the classes above
    register("then", CLASS_POST, logic::then);
    register("else", CLASS_POST, logic::else_);
    register("additionalItems", CLASS_POST, array::additional_items);
    register("additionalProperties", CLASS_POST, object::additional_properties);
    register("maxContains", CLASS_POST, array::max_contains);
    register("minContains", CLASS_POST, array::min_contains);

    // unevaluated: these consume annotations from all prior classes
    register("unevaluatedItems", CLASS_UNEVALUATED, array::unevaluated_items);
    register(
        "unevaluatedProperties",
        CLASS_UNEVALUATED,
        object::unevaluated_properties,
    );

    m
});

pub(crate) fn exists(name: &str) -> bool {
    KEYWORDS.contains_key(name)
}

pub(crate) fn class(name: &str) -> u8 {
    KEYWORDS
        .get(name)
        .map(|kw| kw.class)
        .unwrap_or(CLASS_ASSERTION)
}

pub(crate) fn apply<'a>(
    name: &str,
    value: &'a Value,
    instance: &Value,
    ctx: &mut Context<'a>,
) -> Result<bool, Error> {
    match KEYWORDS.get(name) {
        Some(kw) => (kw.apply)(value, instance, ctx),
        None => Ok(true),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry() {
        assert!(exists("$ref"));
        assert!(exists("unevaluatedProperties"));
        assert!(!exists("x-nonstandard"));
    }

    #[test]
    fn test_classes() {
        assert_eq!(class("$id"), CLASS_IDENTITY);
        assert_eq!(class("properties"), CLASS_ASSERTION);
        assert_eq!(class("additionalProperties"), CLASS_POST);
        assert_eq!(class("unevaluatedItems"), CLASS_UNEVALUATED);
        // classes are ordered
        assert!(class("$id") < class("$ref"));
        assert!(class("if") < class("then"));
        assert!(class("additionalProperties") < class("unevaluatedProperties"));
    }
}
