use serde_json::Value;
use url::Url;

use crate::{
    context::{Context, RefTarget},
    draft::{draft, ANCHOR_PATTERN},
    util::*,
    Error, Specification,
};

pub(crate) fn id<'a>(
    value: &'a Value,
    _instance: &Value,
    ctx: &mut Context<'a>,
) -> Result<bool, Error> {
    let Value::String(s) = value else {
        return Err(ctx.schema_error("not a string"));
    };
    let Ok(uri) = ctx.base_uri().join(s) else {
        return Err(ctx.schema_error("not a valid URI-reference"));
    };
    if has_non_empty_fragment(&uri) {
        if ctx.specification() >= Specification::Draft201909 {
            return Err(ctx.schema_error("has a non-empty fragment"));
        }
        // anchor-form identifier, leaves the base untouched
        return Ok(true);
    }
    ctx.set_base_uri(strip_fragment(&uri).into_owned());
    Ok(true)
}

pub(crate) fn schema<'a>(
    value: &'a Value,
    _instance: &Value,
    ctx: &mut Context<'a>,
) -> Result<bool, Error> {
    let Value::String(s) = value else {
        return Err(ctx.schema_error("not a string"));
    };
    let (uri, fragment) = split(s);
    if !fragment.as_str().is_empty() {
        return Err(ctx.schema_error("has a non-empty fragment"));
    }
    let Ok(uri) = Url::parse(uri) else {
        return Err(ctx.schema_error("not an absolute URI"));
    };
    let at_resource_root = ctx.is_root_schema()
        || ctx
            .parent_object()
            .is_some_and(|obj| obj.contains_key("$id"));
    if !at_resource_root {
        return Err(ctx.schema_error("only allowed at a resource root"));
    }
    let Some(spec) = Specification::from_url(s) else {
        return Err(ctx.schema_error("unknown meta-schema"));
    };
    ctx.set_specification(spec);
    ctx.validate_against_meta(&uri)?;
    Ok(true)
}

pub(crate) fn anchor<'a>(
    value: &'a Value,
    _instance: &Value,
    ctx: &mut Context<'a>,
) -> Result<bool, Error> {
    let Value::String(s) = value else {
        return Err(ctx.schema_error("not a string"));
    };
    if !ANCHOR_PATTERN.is_match(s) {
        return Err(ctx.schema_error("invalid plain name"));
    }
    Ok(true)
}

pub(crate) fn recursive_anchor<'a>(
    value: &'a Value,
    _instance: &Value,
    ctx: &mut Context<'a>,
) -> Result<bool, Error> {
    if ctx.specification() < Specification::Draft201909 {
        return Ok(true);
    }
    let Value::Bool(b) = value else {
        return Err(ctx.schema_error("not a boolean"));
    };
    if *b {
        ctx.set_recursive_base_uri();
    }
    Ok(true)
}

pub(crate) fn vocabulary<'a>(
    value: &'a Value,
    _instance: &Value,
    ctx: &mut Context<'a>,
) -> Result<bool, Error> {
    if ctx.specification() < Specification::Draft201909 {
        return Ok(true);
    }
    let Value::Object(obj) = value else {
        return Err(ctx.schema_error("not an object"));
    };
    let draft = draft(ctx.specification());
    for (uri, required) in obj {
        let Value::Bool(required) = required else {
            return Err(ctx.schema_error_at(uri, "not a boolean"));
        };
        if Url::parse(uri).is_err() {
            return Err(ctx.schema_error_at(uri, "not a valid URI"));
        }
        let known = uri
            .strip_prefix(draft.vocab_prefix)
            .is_some_and(|name| draft.all_vocabs.contains(&name));
        if *required && !known {
            return Err(Error::UnsupportedVocabulary {
                location: ctx.absolute_keyword_location(),
                vocabulary: uri.clone(),
            });
        }
    }
    Ok(true)
}

/// `$defs` and its draft-07 spelling `definitions`: every member must be a
/// schema, none is applied to the instance.
pub(crate) fn defs<'a>(
    value: &'a Value,
    _instance: &Value,
    ctx: &mut Context<'a>,
) -> Result<bool, Error> {
    let Value::Object(obj) = value else {
        return Err(ctx.schema_error("not an object"));
    };
    for (name, sub) in obj {
        ctx.check_valid_schema(sub, name)?;
    }
    Ok(true)
}

pub(crate) fn comment<'a>(
    value: &'a Value,
    _instance: &Value,
    ctx: &mut Context<'a>,
) -> Result<bool, Error> {
    if let Value::String(_) = value {
        Ok(true)
    } else {
        Err(ctx.schema_error("not a string"))
    }
}

pub(crate) fn ref_<'a>(
    value: &'a Value,
    instance: &Value,
    ctx: &mut Context<'a>,
) -> Result<bool, Error> {
    let Value::String(s) = value else {
        return Err(ctx.schema_error("not a string"));
    };
    let target = ctx.resolve_ref(s)?;
    apply_target(target, instance, ctx, s)
}

pub(crate) fn recursive_ref<'a>(
    value: &'a Value,
    instance: &Value,
    ctx: &mut Context<'a>,
) -> Result<bool, Error> {
    if ctx.specification() < Specification::Draft201909 {
        return Ok(true);
    }
    let Value::String(s) = value else {
        return Err(ctx.schema_error("not a string"));
    };
    // resolve against the dynamic recursive base when one is in scope
    let target = match ctx.recursive_base_uri() {
        Some(base) => {
            let Ok(uri) = base.join(s) else {
                return Err(ctx.schema_error("not a valid URI-reference"));
            };
            ctx.resolve_uri(&uri)?
        }
        None => ctx.resolve_ref(s)?,
    };
    apply_target(target, instance, ctx, s)
}

// Applies a resolved reference target. The dynamic keyword location stays on
// the referencing keyword; the static location, base, and specification jump
// to the target for the duration of the application.
fn apply_target<'a>(
    target: RefTarget<'a>,
    instance: &Value,
    ctx: &mut Context<'a>,
    reference: &str,
) -> Result<bool, Error> {
    let saved = ctx.state.clone();
    ctx.state.base_uri = target.base;
    ctx.state.spec = target.spec;
    ctx.state.abs_kw_loc = target.abs;
    if target.root {
        // the target starts a resource of its own
        ctx.state.schema_object = None;
    }
    let result = ctx.apply(target.schema, "", instance, "");
    ctx.state = saved;

    match result {
        Ok(true) => Ok(true),
        Ok(false) => {
            if !ctx.is_fail_fast() {
                ctx.add_error(format!("not valid against {}", quote(reference)));
            }
            Ok(false)
        }
        Err(e) => Err(e),
    }
}
