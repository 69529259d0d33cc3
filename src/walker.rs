use serde_json::Value;

use crate::{
    draft::{Draft, POS_ITEM, POS_PROP, POS_SELF},
    util::escape,
};

/// How an element relates to the schema grammar around it. `Schema`,
/// `PropMap` and `ItemArr` are keyword positions; `Other` covers everything
/// else (`enum` values, `const`, unknown keyword payloads).
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Kind {
    /// a schema position: the element is itself a (potential) schema
    Schema,
    /// the value of a map-of-schemas keyword such as `properties` or `$defs`
    PropMap,
    /// the value of an array-of-schemas keyword such as `allOf`
    ItemArr,
    /// a non-keyword position
    Other,
}

pub(crate) struct WalkState<'a> {
    /// json-pointer to the element
    pub(crate) path: String,
    /// token of the element under its parent, "" at the root
    pub(crate) name: &'a str,
    pub(crate) kind: Kind,
}

/// Walks every position of `v` in document order, keyword and non-keyword
/// alike. The visitor receives each element with its state and the seed
/// computed by its parent, and returns the seed for the element's children.
pub(crate) fn walk<'v, T, E, F>(draft: &Draft, v: &'v Value, seed: T, f: &mut F) -> Result<(), E>
where
    T: Clone,
    F: FnMut(&'v Value, &WalkState, &T) -> Result<T, E>,
{
    let state = WalkState {
        path: String::new(),
        name: "",
        kind: Kind::Schema,
    };
    walk_element(draft, v, &state, seed, f)
}

fn walk_element<'v, T, E, F>(
    draft: &Draft,
    v: &'v Value,
    state: &WalkState,
    seed: T,
    f: &mut F,
) -> Result<(), E>
where
    T: Clone,
    F: FnMut(&'v Value, &WalkState, &T) -> Result<T, E>,
{
    let seed = f(v, state, &seed)?;
    match v {
        Value::Object(obj) => {
            for (name, child) in obj {
                let child_state = WalkState {
                    path: format!("{}/{}", state.path, escape(name)),
                    name,
                    kind: child_kind(draft, state.kind, name, child),
                };
                walk_element(draft, child, &child_state, seed.clone(), f)?;
            }
        }
        Value::Array(arr) => {
            for (i, child) in arr.iter().enumerate() {
                let name = i.to_string();
                let child_state = WalkState {
                    path: format!("{}/{i}", state.path),
                    name: &name,
                    kind: match state.kind {
                        Kind::ItemArr => Kind::Schema,
                        _ => Kind::Other,
                    },
                };
                walk_element(draft, child, &child_state, seed.clone(), f)?;
            }
        }
        _ => {}
    }
    Ok(())
}

fn child_kind(draft: &Draft, parent: Kind, name: &str, child: &Value) -> Kind {
    match parent {
        Kind::Schema => match draft.subschemas.get(name) {
            Some(&pos) => {
                if pos & POS_ITEM != 0 && child.is_array() {
                    Kind::ItemArr
                } else if pos & POS_PROP != 0 {
                    Kind::PropMap
                } else if pos & POS_SELF != 0 {
                    Kind::Schema
                } else {
                    Kind::Other
                }
            }
            None => Kind::Other,
        },
        Kind::PropMap => Kind::Schema,
        // object members of an items-array element or of non-schema payloads
        Kind::ItemArr | Kind::Other => Kind::Other,
    }
}
