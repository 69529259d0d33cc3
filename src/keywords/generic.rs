use serde_json::Value;

use crate::{
    context::Context,
    formats::FORMATS,
    num,
    util::{join_iter, quote},
    AnnotationValue, Error,
};

const TYPE_NAMES: [&str; 7] = [
    "null", "boolean", "number", "integer", "string", "array", "object",
];

fn type_of(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn type_matches(want: &str, v: &Value) -> bool {
    match want {
        "integer" => matches!(v, Value::Number(n) if num::is_integer(n)),
        _ => type_of(v) == want,
    }
}

pub(crate) fn type_<'a>(
    value: &'a Value,
    instance: &Value,
    ctx: &mut Context<'a>,
) -> Result<bool, Error> {
    let types: Vec<&str> = match value {
        Value::String(s) => vec![s.as_str()],
        Value::Array(arr) => {
            let mut types = Vec::with_capacity(arr.len());
            for t in arr {
                let Value::String(t) = t else {
                    return Err(ctx.schema_error("not a string or array of strings"));
                };
                types.push(t.as_str());
            }
            types
        }
        _ => return Err(ctx.schema_error("not a string or array of strings")),
    };
    for t in &types {
        if !TYPE_NAMES.contains(t) {
            return Err(ctx.schema_error(format!("unknown type {}", quote(t))));
        }
    }

    if types.iter().any(|t| type_matches(t, instance)) {
        Ok(true)
    } else {
        ctx.add_error(format!(
            "got {}, want {}",
            type_of(instance),
            join_iter(&types, " or ")
        ));
        Ok(false)
    }
}

pub(crate) fn enum_<'a>(
    value: &'a Value,
    instance: &Value,
    ctx: &mut Context<'a>,
) -> Result<bool, Error> {
    let Value::Array(arr) = value else {
        return Err(ctx.schema_error("not an array"));
    };
    if arr.iter().any(|e| num::equals(e, instance)) {
        Ok(true)
    } else {
        ctx.add_error("value not in enumeration".to_owned());
        Ok(false)
    }
}

pub(crate) fn const_<'a>(
    value: &'a Value,
    instance: &Value,
    ctx: &mut Context<'a>,
) -> Result<bool, Error> {
    if num::equals(value, instance) {
        Ok(true)
    } else {
        ctx.add_error(format!("got {instance}, want {value}"));
        Ok(false)
    }
}

pub(crate) fn format<'a>(
    value: &'a Value,
    instance: &Value,
    ctx: &mut Context<'a>,
) -> Result<bool, Error> {
    let Value::String(name) = value else {
        return Err(ctx.schema_error("not a string"));
    };
    ctx.add_annotation("format", AnnotationValue::Json(value.clone()));

    if !ctx.format_assertion() {
        return Ok(true);
    }
    // unknown formats and non-string instances are never asserted
    let Some(format) = FORMATS.get(name.as_str()) else {
        return Ok(true);
    };
    let Value::String(s) = instance else {
        return Ok(true);
    };
    if (format.check)(s) {
        Ok(true)
    } else {
        ctx.add_error(format!("{} is not a valid {name}", quote(s)));
        Ok(false)
    }
}

// annotation-only keywords: they type-check their value and never affect the
// verdict

fn annotate_string<'a>(
    name: &'static str,
    value: &'a Value,
    ctx: &mut Context<'a>,
) -> Result<bool, Error> {
    let Value::String(_) = value else {
        return Err(ctx.schema_error("not a string"));
    };
    ctx.add_annotation(name, AnnotationValue::Json(value.clone()));
    Ok(true)
}

fn annotate_bool<'a>(
    name: &'static str,
    value: &'a Value,
    ctx: &mut Context<'a>,
) -> Result<bool, Error> {
    let Value::Bool(b) = value else {
        return Err(ctx.schema_error("not a boolean"));
    };
    ctx.add_annotation(name, AnnotationValue::Bool(*b));
    Ok(true)
}

pub(crate) fn title<'a>(
    value: &'a Value,
    _instance: &Value,
    ctx: &mut Context<'a>,
) -> Result<bool, Error> {
    annotate_string("title", value, ctx)
}

pub(crate) fn description<'a>(
    value: &'a Value,
    _instance: &Value,
    ctx: &mut Context<'a>,
) -> Result<bool, Error> {
    annotate_string("description", value, ctx)
}

pub(crate) fn default_<'a>(
    value: &'a Value,
    _instance: &Value,
    ctx: &mut Context<'a>,
) -> Result<bool, Error> {
    ctx.add_annotation("default", AnnotationValue::Json(value.clone()));
    Ok(true)
}

pub(crate) fn deprecated<'a>(
    value: &'a Value,
    _instance: &Value,
    ctx: &mut Context<'a>,
) -> Result<bool, Error> {
    annotate_bool("deprecated", value, ctx)
}

pub(crate) fn read_only<'a>(
    value: &'a Value,
    _instance: &Value,
    ctx: &mut Context<'a>,
) -> Result<bool, Error> {
    annotate_bool("readOnly", value, ctx)
}

pub(crate) fn write_only<'a>(
    value: &'a Value,
    _instance: &Value,
    ctx: &mut Context<'a>,
) -> Result<bool, Error> {
    annotate_bool("writeOnly", value, ctx)
}

pub(crate) fn examples<'a>(
    value: &'a Value,
    _instance: &Value,
    ctx: &mut Context<'a>,
) -> Result<bool, Error> {
    let Value::Array(_) = value else {
        return Err(ctx.schema_error("not an array"));
    };
    ctx.add_annotation("examples", AnnotationValue::Json(value.clone()));
    Ok(true)
}
