use std::borrow::Cow;

use regex::Regex;
use serde_json::{Map, Value};

use crate::{
    content::{DECODERS, MEDIA_TYPES},
    context::Context,
    ecma, num,
    util::quote,
    AnnotationValue, Error,
};

fn length_bound<'a>(value: &'a Value, ctx: &Context<'a>) -> Result<usize, Error> {
    value
        .as_number()
        .and_then(num::as_usize)
        .ok_or_else(|| ctx.schema_error("not a non-negative integer"))
}

pub(crate) fn min_length<'a>(
    value: &'a Value,
    instance: &Value,
    ctx: &mut Context<'a>,
) -> Result<bool, Error> {
    let min = length_bound(value, ctx)?;
    let Value::String(s) = instance else {
        return Ok(true);
    };
    // length in code points, not utf-16 units or bytes
    let len = s.chars().count();
    if len < min {
        ctx.add_error(format!("length {len} is less than minimum {min}"));
        return Ok(false);
    }
    Ok(true)
}

pub(crate) fn max_length<'a>(
    value: &'a Value,
    instance: &Value,
    ctx: &mut Context<'a>,
) -> Result<bool, Error> {
    let max = length_bound(value, ctx)?;
    let Value::String(s) = instance else {
        return Ok(true);
    };
    let len = s.chars().count();
    if len > max {
        ctx.add_error(format!("length {len} is greater than maximum {max}"));
        return Ok(false);
    }
    Ok(true)
}

pub(crate) fn pattern<'a>(
    value: &'a Value,
    instance: &Value,
    ctx: &mut Context<'a>,
) -> Result<bool, Error> {
    let Value::String(p) = value else {
        return Err(ctx.schema_error("not a string"));
    };
    let Ok(regex) = Regex::new(&ecma::convert(p)) else {
        return Err(ctx.schema_error(format!("{} is not a valid regex", quote(p))));
    };
    let Value::String(s) = instance else {
        return Ok(true);
    };
    if regex.is_match(s) {
        Ok(true)
    } else {
        ctx.add_error(format!("{} does not match pattern {}", quote(s), quote(p)));
        Ok(false)
    }
}

// content keywords: annotations unless content assertions are enabled

pub(crate) fn content_encoding<'a>(
    value: &'a Value,
    instance: &Value,
    ctx: &mut Context<'a>,
) -> Result<bool, Error> {
    let Value::String(encoding) = value else {
        return Err(ctx.schema_error("not a string"));
    };
    ctx.add_annotation("contentEncoding", AnnotationValue::Json(value.clone()));
    if !ctx.options().content {
        return Ok(true);
    }
    let Value::String(s) = instance else {
        return Ok(true);
    };
    let Some(decode) = DECODERS.get(encoding.as_str()) else {
        return Ok(true); // unknown encodings are not asserted
    };
    if decode(s).is_none() {
        ctx.add_error(format!("content is not valid {encoding}"));
        return Ok(false);
    }
    Ok(true)
}

pub(crate) fn content_media_type<'a>(
    value: &'a Value,
    instance: &Value,
    ctx: &mut Context<'a>,
) -> Result<bool, Error> {
    let Value::String(media_type) = value else {
        return Err(ctx.schema_error("not a string"));
    };
    ctx.add_annotation("contentMediaType", AnnotationValue::Json(value.clone()));
    if !ctx.options().content {
        return Ok(true);
    }
    let Value::String(s) = instance else {
        return Ok(true);
    };
    let Some(check) = MEDIA_TYPES.get(media_type.as_str()) else {
        return Ok(true);
    };
    let Some(bytes) = decoded(ctx.parent_object(), s) else {
        // undecodable content is contentEncoding's failure to report
        return Ok(true);
    };
    if !check(&bytes) {
        ctx.add_error(format!("content is not valid {media_type}"));
        return Ok(false);
    }
    Ok(true)
}

pub(crate) fn content_schema<'a>(
    value: &'a Value,
    instance: &Value,
    ctx: &mut Context<'a>,
) -> Result<bool, Error> {
    ctx.check_valid_schema(value, "")?;
    ctx.add_annotation("contentSchema", AnnotationValue::Json(value.clone()));
    if !ctx.options().content {
        return Ok(true);
    }
    // meaningful only alongside an application/json media type
    let parent = ctx.parent_object();
    let is_json = matches!(
        parent.and_then(|obj| obj.get("contentMediaType")),
        Some(Value::String(mt)) if mt == "application/json"
    );
    if !is_json {
        return Ok(true);
    }
    let Value::String(s) = instance else {
        return Ok(true);
    };
    let Some(bytes) = decoded(parent, s) else {
        return Ok(true);
    };
    let Ok(content) = serde_json::from_slice::<Value>(&bytes) else {
        ctx.add_error("content is not valid application/json".to_owned());
        return Ok(false);
    };
    if !ctx.validate_detached(value, &content)? {
        ctx.add_error("content not valid against content schema".to_owned());
        return Ok(false);
    }
    Ok(true)
}

// decodes the instance per a sibling contentEncoding, if any
fn decoded<'s>(parent: Option<&Map<String, Value>>, s: &'s str) -> Option<Cow<'s, [u8]>> {
    match parent.and_then(|obj| obj.get("contentEncoding")) {
        Some(Value::String(encoding)) => {
            let decode = DECODERS.get(encoding.as_str())?;
            decode(s).map(Cow::Owned)
        }
        _ => Some(Cow::Borrowed(s.as_bytes())),
    }
}
