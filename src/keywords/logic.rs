use serde_json::Value;

use crate::{context::Context, AnnotationValue, Error};

fn subschema_array<'a>(value: &'a Value, ctx: &Context<'a>) -> Result<&'a Vec<Value>, Error> {
    match value {
        Value::Array(arr) if !arr.is_empty() => Ok(arr),
        _ => Err(ctx.schema_error("not a non-empty array")),
    }
}

pub(crate) fn all_of<'a>(
    value: &'a Value,
    instance: &Value,
    ctx: &mut Context<'a>,
) -> Result<bool, Error> {
    let schemas = subschema_array(value, ctx)?;
    let mut retval = true;
    for (i, sub) in schemas.iter().enumerate() {
        if !ctx.apply(sub, &i.to_string(), instance, "")? {
            if ctx.is_fail_fast() {
                return Ok(false);
            }
            ctx.add_error(format!("subschema {i} not valid"));
            retval = false;
            ctx.set_collect_sub_annotations(false);
        }
    }
    Ok(retval)
}

pub(crate) fn any_of<'a>(
    value: &'a Value,
    instance: &Value,
    ctx: &mut Context<'a>,
) -> Result<bool, Error> {
    let schemas = subschema_array(value, ctx)?;
    // every subschema is applied, to collect annotations from all that pass
    let mut valid = 0usize;
    for (i, sub) in schemas.iter().enumerate() {
        if ctx.apply(sub, &i.to_string(), instance, "")? {
            valid += 1;
        }
    }
    if valid == 0 {
        ctx.add_error("no subschema valid".to_owned());
        return Ok(false);
    }
    Ok(true)
}

pub(crate) fn one_of<'a>(
    value: &'a Value,
    instance: &Value,
    ctx: &mut Context<'a>,
) -> Result<bool, Error> {
    let schemas = subschema_array(value, ctx)?;
    let mut valid = 0usize;
    for (i, sub) in schemas.iter().enumerate() {
        if ctx.apply(sub, &i.to_string(), instance, "")? {
            valid += 1;
            if valid > 1 {
                // annotations under a multi-match oneOf are discarded
                ctx.set_collect_sub_annotations(false);
            }
        }
    }
    if valid != 1 {
        ctx.add_error(format!("want 1 subschema valid, got {valid}"));
        return Ok(false);
    }
    Ok(true)
}

pub(crate) fn not<'a>(
    value: &'a Value,
    instance: &Value,
    ctx: &mut Context<'a>,
) -> Result<bool, Error> {
    ctx.check_valid_schema(value, "")?;
    // `not` never contributes annotations
    let saved = ctx.state.collect_sub;
    ctx.set_collect_sub_annotations(false);
    let result = ctx.apply(value, "", instance, "");
    ctx.set_collect_sub_annotations(saved);

    if result? {
        ctx.add_error("instance is valid against the subschema".to_owned());
        Ok(false)
    } else {
        Ok(true)
    }
}

/// `if` records its outcome as an annotation; `then` and `else` consume it.
/// The keyword itself never fails the schema.
pub(crate) fn if_<'a>(
    value: &'a Value,
    instance: &Value,
    ctx: &mut Context<'a>,
) -> Result<bool, Error> {
    ctx.check_valid_schema(value, "")?;
    let ok = ctx.apply(value, "", instance, "")?;
    if !ok {
        // the branch was not taken, its annotations do not count
        ctx.drop_branch_annotations();
    }
    ctx.add_annotation("if", AnnotationValue::Bool(ok));
    Ok(true)
}

pub(crate) fn then<'a>(
    value: &'a Value,
    instance: &Value,
    ctx: &mut Context<'a>,
) -> Result<bool, Error> {
    branch(value, instance, ctx, true, "then")
}

pub(crate) fn else_<'a>(
    value: &'a Value,
    instance: &Value,
    ctx: &mut Context<'a>,
) -> Result<bool, Error> {
    branch(value, instance, ctx, false, "else")
}

fn branch<'a>(
    value: &'a Value,
    instance: &Value,
    ctx: &mut Context<'a>,
    want: bool,
    name: &str,
) -> Result<bool, Error> {
    ctx.check_valid_schema(value, "")?;
    let loc = format!("{}/if", ctx.schema_parent_location());
    let outcome = match ctx.get_annotations("if").and_then(|by_loc| by_loc.get(&loc)) {
        Some(a) => match a.value {
            AnnotationValue::Bool(b) => b,
            _ => return Ok(true),
        },
        None => return Ok(true),
    };
    if outcome != want {
        return Ok(true);
    }
    if !ctx.apply(value, "", instance, "")? {
        if !ctx.is_fail_fast() {
            ctx.add_error(format!("'{name}' subschema not valid"));
        }
        return Ok(false);
    }
    Ok(true)
}
