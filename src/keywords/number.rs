use std::cmp::Ordering;

use serde_json::{Number, Value};

use crate::{context::Context, num, Error};

fn bound<'a>(value: &'a Value, ctx: &Context<'a>) -> Result<&'a Number, Error> {
    match value {
        Value::Number(n) => Ok(n),
        _ => Err(ctx.schema_error("not a number")),
    }
}

pub(crate) fn minimum<'a>(
    value: &'a Value,
    instance: &Value,
    ctx: &mut Context<'a>,
) -> Result<bool, Error> {
    let min = bound(value, ctx)?;
    let Value::Number(n) = instance else {
        return Ok(true);
    };
    if num::num_cmp(n, min) == Ordering::Less {
        ctx.add_error(format!("{n} is less than minimum {min}"));
        return Ok(false);
    }
    Ok(true)
}

pub(crate) fn maximum<'a>(
    value: &'a Value,
    instance: &Value,
    ctx: &mut Context<'a>,
) -> Result<bool, Error> {
    let max = bound(value, ctx)?;
    let Value::Number(n) = instance else {
        return Ok(true);
    };
    if num::num_cmp(n, max) == Ordering::Greater {
        ctx.add_error(format!("{n} is greater than maximum {max}"));
        return Ok(false);
    }
    Ok(true)
}

pub(crate) fn exclusive_minimum<'a>(
    value: &'a Value,
    instance: &Value,
    ctx: &mut Context<'a>,
) -> Result<bool, Error> {
    let min = bound(value, ctx)?;
    let Value::Number(n) = instance else {
        return Ok(true);
    };
    if num::num_cmp(n, min) != Ordering::Greater {
        ctx.add_error(format!("{n} is not greater than exclusive minimum {min}"));
        return Ok(false);
    }
    Ok(true)
}

pub(crate) fn exclusive_maximum<'a>(
    value: &'a Value,
    instance: &Value,
    ctx: &mut Context<'a>,
) -> Result<bool, Error> {
    let max = bound(value, ctx)?;
    let Value::Number(n) = instance else {
        return Ok(true);
    };
    if num::num_cmp(n, max) != Ordering::Less {
        ctx.add_error(format!("{n} is not less than exclusive maximum {max}"));
        return Ok(false);
    }
    Ok(true)
}

pub(crate) fn multiple_of<'a>(
    value: &'a Value,
    instance: &Value,
    ctx: &mut Context<'a>,
) -> Result<bool, Error> {
    let of = bound(value, ctx)?;
    if num::num_cmp(of, &Number::from(0)) != Ordering::Greater {
        return Err(ctx.schema_error("not > 0"));
    }
    let Value::Number(n) = instance else {
        return Ok(true);
    };
    if !num::multiple_of(n, of) {
        ctx.add_error(format!("{n} is not a multiple of {of}"));
        return Ok(false);
    }
    Ok(true)
}
