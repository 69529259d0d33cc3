use std::collections::BTreeSet;

use regex::Regex;
use serde_json::Value;

use crate::{
    context::Context,
    ecma, num,
    util::{join_iter, quote},
    AnnotationValue, Error, Specification,
};

pub(crate) fn min_properties<'a>(
    value: &'a Value,
    instance: &Value,
    ctx: &mut Context<'a>,
) -> Result<bool, Error> {
    let min = count_bound(value, ctx)?;
    let Value::Object(obj) = instance else {
        return Ok(true);
    };
    if obj.len() < min {
        ctx.add_error(format!("got {} properties, want at least {min}", obj.len()));
        return Ok(false);
    }
    Ok(true)
}

pub(crate) fn max_properties<'a>(
    value: &'a Value,
    instance: &Value,
    ctx: &mut Context<'a>,
) -> Result<bool, Error> {
    let max = count_bound(value, ctx)?;
    let Value::Object(obj) = instance else {
        return Ok(true);
    };
    if obj.len() > max {
        ctx.add_error(format!("got {} properties, want at most {max}", obj.len()));
        return Ok(false);
    }
    Ok(true)
}

fn count_bound<'a>(value: &'a Value, ctx: &Context<'a>) -> Result<usize, Error> {
    value
        .as_number()
        .and_then(num::as_usize)
        .ok_or_else(|| ctx.schema_error("not a non-negative integer"))
}

pub(crate) fn required<'a>(
    value: &'a Value,
    instance: &Value,
    ctx: &mut Context<'a>,
) -> Result<bool, Error> {
    let Value::Array(names) = value else {
        return Err(ctx.schema_error("not an array"));
    };
    let Value::Object(obj) = instance else {
        return Ok(true);
    };
    let mut missing = vec![];
    for name in names {
        let Value::String(name) = name else {
            return Err(ctx.schema_error("not an array of strings"));
        };
        if !obj.contains_key(name) {
            missing.push(quote(name));
        }
    }
    if !missing.is_empty() {
        ctx.add_error(format!(
            "missing required properties: {}",
            join_iter(missing, ", ")
        ));
        return Ok(false);
    }
    Ok(true)
}

pub(crate) fn properties<'a>(
    value: &'a Value,
    instance: &Value,
    ctx: &mut Context<'a>,
) -> Result<bool, Error> {
    let Value::Object(props) = value else {
        return Err(ctx.schema_error("not an object"));
    };
    let Value::Object(obj) = instance else {
        return Ok(true);
    };

    let mut matched = BTreeSet::new();
    let mut retval = true;
    for (name, sub) in props {
        let Some(pvalue) = obj.get(name) else {
            continue;
        };
        if ctx.apply(sub, name, pvalue, name)? {
            matched.insert(name.clone());
        } else {
            if ctx.is_fail_fast() {
                return Ok(false);
            }
            ctx.add_error(format!("property {} not valid", quote(name)));
            retval = false;
            ctx.set_collect_sub_annotations(false);
        }
    }
    if retval {
        ctx.add_annotation("properties", AnnotationValue::Keys(matched));
    }
    Ok(retval)
}

pub(crate) fn pattern_properties<'a>(
    value: &'a Value,
    instance: &Value,
    ctx: &mut Context<'a>,
) -> Result<bool, Error> {
    let Value::Object(props) = value else {
        return Err(ctx.schema_error("not an object"));
    };
    let Value::Object(obj) = instance else {
        return Ok(true);
    };

    let mut matched = BTreeSet::new();
    let mut retval = true;
    for (pattern, sub) in props {
        let Ok(regex) = Regex::new(&ecma::convert(pattern)) else {
            return Err(ctx.schema_error_at(pattern, "not a valid regex"));
        };
        for (name, pvalue) in obj {
            if !regex.is_match(name) {
                continue;
            }
            if ctx.apply(sub, pattern, pvalue, name)? {
                matched.insert(name.clone());
            } else {
                if ctx.is_fail_fast() {
                    return Ok(false);
                }
                ctx.add_error(format!("property {} not valid", quote(name)));
                retval = false;
                ctx.set_collect_sub_annotations(false);
            }
        }
    }
    if retval {
        ctx.add_annotation("patternProperties", AnnotationValue::Keys(matched));
    }
    Ok(retval)
}

pub(crate) fn additional_properties<'a>(
    value: &'a Value,
    instance: &Value,
    ctx: &mut Context<'a>,
) -> Result<bool, Error> {
    ctx.check_valid_schema(value, "")?;
    let Value::Object(obj) = instance else {
        return Ok(true);
    };

    // keys already claimed by the sibling applicators
    let mut evaluated = BTreeSet::new();
    sibling_keys(ctx, "properties", &mut evaluated);
    sibling_keys(ctx, "patternProperties", &mut evaluated);

    let mut matched = BTreeSet::new();
    let mut retval = true;
    for (name, pvalue) in obj {
        if evaluated.contains(name) {
            continue;
        }
        if ctx.apply(value, "", pvalue, name)? {
            matched.insert(name.clone());
        } else {
            if ctx.is_fail_fast() {
                return Ok(false);
            }
            ctx.add_error(format!("additional property {} not valid", quote(name)));
            retval = false;
            ctx.set_collect_sub_annotations(false);
        }
    }
    if retval {
        ctx.add_annotation("additionalProperties", AnnotationValue::Keys(matched));
    }
    Ok(retval)
}

pub(crate) fn unevaluated_properties<'a>(
    value: &'a Value,
    instance: &Value,
    ctx: &mut Context<'a>,
) -> Result<bool, Error> {
    if ctx.specification() < Specification::Draft201909 {
        return Ok(true);
    }
    ctx.check_valid_schema(value, "")?;
    let Value::Object(obj) = instance else {
        return Ok(true);
    };

    // keys evaluated anywhere below this schema object, including through
    // $ref and the combinators
    let mut evaluated = BTreeSet::new();
    for name in [
        "properties",
        "patternProperties",
        "additionalProperties",
        "unevaluatedProperties",
    ] {
        descendant_keys(ctx, name, &mut evaluated);
    }

    let mut matched = BTreeSet::new();
    let mut retval = true;
    for (name, pvalue) in obj {
        if evaluated.contains(name) {
            continue;
        }
        if ctx.apply(value, "", pvalue, name)? {
            matched.insert(name.clone());
        } else {
            if ctx.is_fail_fast() {
                return Ok(false);
            }
            ctx.add_error(format!("unevaluated property {} not valid", quote(name)));
            retval = false;
            ctx.set_collect_sub_annotations(false);
        }
    }
    if retval {
        ctx.add_annotation("unevaluatedProperties", AnnotationValue::Keys(matched));
    }
    Ok(retval)
}

// keys annotated by the named keyword of this very schema object
fn sibling_keys(ctx: &Context, name: &str, out: &mut BTreeSet<String>) {
    let loc = format!("{}/{name}", ctx.schema_parent_location());
    if let Some(by_loc) = ctx.get_annotations(name) {
        if let Some(a) = by_loc.get(&loc) {
            if let AnnotationValue::Keys(keys) = &a.value {
                out.extend(keys.iter().cloned());
            }
        }
    }
}

// keys annotated by the named keyword anywhere under this schema object
fn descendant_keys(ctx: &Context, name: &str, out: &mut BTreeSet<String>) {
    let parent = ctx.schema_parent_location();
    if let Some(by_loc) = ctx.get_annotations(name) {
        for (loc, a) in by_loc {
            if !loc.starts_with(parent) {
                continue;
            }
            if let AnnotationValue::Keys(keys) = &a.value {
                out.extend(keys.iter().cloned());
            }
        }
    }
}

pub(crate) fn property_names<'a>(
    value: &'a Value,
    instance: &Value,
    ctx: &mut Context<'a>,
) -> Result<bool, Error> {
    ctx.check_valid_schema(value, "")?;
    let Value::Object(obj) = instance else {
        return Ok(true);
    };

    let mut retval = true;
    for name in obj.keys() {
        // each key is validated as a string instance
        let name_value = Value::String(name.clone());
        if !ctx.apply(value, "", &name_value, name)? {
            if ctx.is_fail_fast() {
                return Ok(false);
            }
            ctx.add_error(format!("property name {} not valid", quote(name)));
            retval = false;
            ctx.set_collect_sub_annotations(false);
        }
    }
    Ok(retval)
}

/// Pre-2019-09 `dependencies`: each member is either a list of required
/// dependents or a conditional subschema.
pub(crate) fn dependencies<'a>(
    value: &'a Value,
    instance: &Value,
    ctx: &mut Context<'a>,
) -> Result<bool, Error> {
    if ctx.specification() >= Specification::Draft201909 {
        return Ok(true);
    }
    let Value::Object(deps) = value else {
        return Err(ctx.schema_error("not an object"));
    };
    let Value::Object(obj) = instance else {
        return Ok(true);
    };

    let mut retval = true;
    for (name, dep) in deps {
        if !obj.contains_key(name) {
            continue;
        }
        match dep {
            Value::Array(names) => {
                if !require_dependents(name, names, instance, ctx)? {
                    if ctx.is_fail_fast() {
                        return Ok(false);
                    }
                    retval = false;
                    ctx.set_collect_sub_annotations(false);
                }
            }
            _ if dep.is_object() || dep.is_boolean() => {
                if !ctx.apply(dep, name, instance, "")? {
                    if ctx.is_fail_fast() {
                        return Ok(false);
                    }
                    ctx.add_error(format!("dependency of {} not valid", quote(name)));
                    retval = false;
                    ctx.set_collect_sub_annotations(false);
                }
            }
            _ => return Err(ctx.schema_error_at(name, "not a schema or array")),
        }
    }
    Ok(retval)
}

pub(crate) fn dependent_required<'a>(
    value: &'a Value,
    instance: &Value,
    ctx: &mut Context<'a>,
) -> Result<bool, Error> {
    if ctx.specification() < Specification::Draft201909 {
        return Ok(true);
    }
    let Value::Object(deps) = value else {
        return Err(ctx.schema_error("not an object"));
    };
    let Value::Object(obj) = instance else {
        return Ok(true);
    };

    let mut retval = true;
    for (name, dep) in deps {
        if !obj.contains_key(name) {
            continue;
        }
        let Value::Array(names) = dep else {
            return Err(ctx.schema_error_at(name, "not an array"));
        };
        if !require_dependents(name, names, instance, ctx)? {
            if ctx.is_fail_fast() {
                return Ok(false);
            }
            retval = false;
            ctx.set_collect_sub_annotations(false);
        }
    }
    Ok(retval)
}

pub(crate) fn dependent_schemas<'a>(
    value: &'a Value,
    instance: &Value,
    ctx: &mut Context<'a>,
) -> Result<bool, Error> {
    if ctx.specification() < Specification::Draft201909 {
        return Ok(true);
    }
    let Value::Object(deps) = value else {
        return Err(ctx.schema_error("not an object"));
    };
    let Value::Object(obj) = instance else {
        return Ok(true);
    };

    let mut retval = true;
    for (name, sub) in deps {
        if !obj.contains_key(name) {
            continue;
        }
        if !ctx.apply(sub, name, instance, "")? {
            if ctx.is_fail_fast() {
                return Ok(false);
            }
            ctx.add_error(format!("dependency of {} not valid", quote(name)));
            retval = false;
            ctx.set_collect_sub_annotations(false);
        }
    }
    Ok(retval)
}

// the array half shared by dependencies and dependentRequired
fn require_dependents<'a>(
    name: &str,
    names: &[Value],
    instance: &Value,
    ctx: &mut Context<'a>,
) -> Result<bool, Error> {
    let Value::Object(obj) = instance else {
        return Ok(true);
    };
    let mut seen = BTreeSet::new();
    let mut missing = vec![];
    for (i, dependent) in names.iter().enumerate() {
        let Value::String(dependent) = dependent else {
            return Err(ctx.schema_error_at(name, format!("element {i} is not a string")));
        };
        if !seen.insert(dependent) {
            return Err(ctx.schema_error_at(name, format!("{} is not unique", quote(dependent))));
        }
        if !obj.contains_key(dependent) {
            missing.push(quote(dependent));
        }
    }
    if !missing.is_empty() {
        ctx.add_error(format!(
            "properties {} required by {}",
            join_iter(missing, ", "),
            quote(name)
        ));
        return Ok(false);
    }
    Ok(true)
}
