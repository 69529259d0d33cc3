use std::cmp::min;

use serde_json::Value;

use crate::{context::Context, num, AnnotationValue, Error, Specification};

fn count_bound<'a>(value: &'a Value, ctx: &Context<'a>) -> Result<usize, Error> {
    value
        .as_number()
        .and_then(num::as_usize)
        .ok_or_else(|| ctx.schema_error("not a non-negative integer"))
}

pub(crate) fn min_items<'a>(
    value: &'a Value,
    instance: &Value,
    ctx: &mut Context<'a>,
) -> Result<bool, Error> {
    let min = count_bound(value, ctx)?;
    let Value::Array(arr) = instance else {
        return Ok(true);
    };
    if arr.len() < min {
        ctx.add_error(format!("got {} items, want at least {min}", arr.len()));
        return Ok(false);
    }
    Ok(true)
}

pub(crate) fn max_items<'a>(
    value: &'a Value,
    instance: &Value,
    ctx: &mut Context<'a>,
) -> Result<bool, Error> {
    let max = count_bound(value, ctx)?;
    let Value::Array(arr) = instance else {
        return Ok(true);
    };
    if arr.len() > max {
        ctx.add_error(format!("got {} items, want at most {max}", arr.len()));
        return Ok(false);
    }
    Ok(true)
}

pub(crate) fn unique_items<'a>(
    value: &'a Value,
    instance: &Value,
    ctx: &mut Context<'a>,
) -> Result<bool, Error> {
    let Value::Bool(unique) = value else {
        return Err(ctx.schema_error("not a boolean"));
    };
    if !unique {
        return Ok(true);
    }
    let Value::Array(arr) = instance else {
        return Ok(true);
    };
    for i in 1..arr.len() {
        for j in 0..i {
            if num::equals(&arr[i], &arr[j]) {
                ctx.add_error(format!("items {j} and {i} are equal"));
                return Ok(false);
            }
        }
    }
    Ok(true)
}

/// `items`: a single schema applied to every element, or an array of schemas
/// applied positionally.
pub(crate) fn items<'a>(
    value: &'a Value,
    instance: &Value,
    ctx: &mut Context<'a>,
) -> Result<bool, Error> {
    if !(value.is_object() || value.is_boolean() || value.is_array()) {
        return Err(ctx.schema_error("not a schema or array"));
    }
    let Value::Array(arr) = instance else {
        return Ok(true);
    };

    let mut retval = true;
    if let Value::Array(schemas) = value {
        let limit = min(schemas.len(), arr.len());
        for i in 0..limit {
            let path = i.to_string();
            if !ctx.apply(&schemas[i], &path, &arr[i], &path)? {
                if ctx.is_fail_fast() {
                    return Ok(false);
                }
                ctx.add_error(format!("item {i} not valid"));
                retval = false;
                ctx.set_collect_sub_annotations(false);
            }
        }
        // the number of positionally applied items
        ctx.add_annotation("items", AnnotationValue::Count(limit));
    } else {
        for (i, item) in arr.iter().enumerate() {
            if !ctx.apply(value, "", item, &i.to_string())? {
                if ctx.is_fail_fast() {
                    return Ok(false);
                }
                ctx.add_error(format!("item {i} not valid"));
                retval = false;
                ctx.set_collect_sub_annotations(false);
            }
        }
        ctx.add_annotation("items", AnnotationValue::Bool(true));
    }
    Ok(retval)
}

/// Applies to elements beyond those covered by an array-form `items`.
pub(crate) fn additional_items<'a>(
    value: &'a Value,
    instance: &Value,
    ctx: &mut Context<'a>,
) -> Result<bool, Error> {
    ctx.check_valid_schema(value, "")?;

    // only meaningful with a positional items sibling
    let Some(Value::Array(schemas)) = ctx.parent_object().and_then(|obj| obj.get("items")) else {
        return Ok(true);
    };
    let Value::Array(arr) = instance else {
        return Ok(true);
    };

    let processed = min(schemas.len(), arr.len());
    let mut retval = true;
    for (i, item) in arr.iter().enumerate().skip(processed) {
        if !ctx.apply(value, "", item, &i.to_string())? {
            if ctx.is_fail_fast() {
                return Ok(false);
            }
            ctx.add_error(format!("additional item {i} not valid"));
            retval = false;
            ctx.set_collect_sub_annotations(false);
        }
    }
    // annotate only if the keyword was actually applied
    if retval && processed < arr.len() {
        ctx.add_annotation("additionalItems", AnnotationValue::Bool(true));
    }
    Ok(retval)
}

pub(crate) fn unevaluated_items<'a>(
    value: &'a Value,
    instance: &Value,
    ctx: &mut Context<'a>,
) -> Result<bool, Error> {
    if ctx.specification() < Specification::Draft201909 {
        return Ok(true);
    }
    ctx.check_valid_schema(value, "")?;
    let Value::Array(arr) = instance else {
        return Ok(true);
    };

    // the largest index evaluated anywhere below this schema object
    let parent = ctx.schema_parent_location().to_owned();
    let mut evaluated = 0usize;
    let mut all = false;
    for name in ["items", "additionalItems", "unevaluatedItems"] {
        if let Some(by_loc) = ctx.get_annotations(name) {
            for (loc, a) in by_loc {
                if !loc.starts_with(&parent) {
                    continue;
                }
                match a.value {
                    AnnotationValue::Bool(true) => all = true,
                    AnnotationValue::Count(n) => evaluated = evaluated.max(n),
                    _ => {}
                }
            }
        }
    }
    if all {
        return Ok(true);
    }

    let mut retval = true;
    for (i, item) in arr.iter().enumerate().skip(evaluated) {
        if !ctx.apply(value, "", item, &i.to_string())? {
            if ctx.is_fail_fast() {
                return Ok(false);
            }
            ctx.add_error(format!("unevaluated item {i} not valid"));
            retval = false;
            ctx.set_collect_sub_annotations(false);
        }
    }
    if retval {
        ctx.add_annotation("unevaluatedItems", AnnotationValue::Bool(true));
    }
    Ok(retval)
}

/// Counts matching elements; `minContains`/`maxContains` consume the count.
pub(crate) fn contains<'a>(
    value: &'a Value,
    instance: &Value,
    ctx: &mut Context<'a>,
) -> Result<bool, Error> {
    ctx.check_valid_schema(value, "")?;
    let Value::Array(arr) = instance else {
        return Ok(true);
    };

    let mut matched = 0usize;
    for (i, item) in arr.iter().enumerate() {
        if ctx.apply(value, "", item, &i.to_string())? {
            matched += 1;
        }
    }
    ctx.add_annotation("contains", AnnotationValue::Count(matched));

    // with a minContains sibling the bounds keywords decide
    let has_min = ctx
        .parent_object()
        .is_some_and(|obj| obj.contains_key("minContains"));
    if matched == 0 && !has_min {
        ctx.add_error("no items match the contains schema".to_owned());
        return Ok(false);
    }
    Ok(true)
}

pub(crate) fn min_contains<'a>(
    value: &'a Value,
    _instance: &Value,
    ctx: &mut Context<'a>,
) -> Result<bool, Error> {
    if ctx.specification() < Specification::Draft201909 {
        return Ok(true);
    }
    let min = count_bound(value, ctx)?;
    let Some(matched) = contains_count(ctx) else {
        return Ok(true);
    };
    if matched < min {
        ctx.add_error(format!("got {matched} contains matches, want at least {min}"));
        return Ok(false);
    }
    Ok(true)
}

pub(crate) fn max_contains<'a>(
    value: &'a Value,
    _instance: &Value,
    ctx: &mut Context<'a>,
) -> Result<bool, Error> {
    if ctx.specification() < Specification::Draft201909 {
        return Ok(true);
    }
    let max = count_bound(value, ctx)?;
    let Some(matched) = contains_count(ctx) else {
        return Ok(true);
    };
    // zero matches with minContains 0 is still within bounds
    if matched > max {
        ctx.add_error(format!("got {matched} contains matches, want at most {max}"));
        return Ok(false);
    }
    Ok(true)
}

// the match count annotated by the contains sibling
fn contains_count(ctx: &Context) -> Option<usize> {
    ctx.parent_object()?.get("contains")?;
    let loc = format!("{}/contains", ctx.schema_parent_location());
    match ctx.get_annotations("contains")?.get(&loc)?.value {
        AnnotationValue::Count(n) => Some(n),
        _ => None,
    }
}
