use std::collections::HashMap;
use std::hash::{Hash, Hasher};

use serde_json::Value;
use url::Url;

use crate::{
    draft::{draft, ANCHOR_PATTERN},
    util::*,
    walker, Error, Specification,
};

/// A schema identifier found by the pre-validation scan.
///
/// Identity is carried by [`Id::uri`] alone; the remaining fields record how
/// the identifier was constructed.
#[derive(Debug, Clone)]
pub struct Id {
    /// the value resolved against the base in effect; anchors carry a
    /// non-empty fragment
    pub uri: Url,
    /// the original lexeme, absent for synthesized entries
    pub value: Option<String>,
    /// the base against which `value` was resolved
    pub base: Option<Url>,
    /// json-pointer to the schema object declaring the identifier
    pub path: String,
    /// the root identifier of the containing document
    pub root: Option<Url>,
    /// the resource the containing document was obtained from
    pub root_uri: Option<Url>,
}

impl Id {
    pub(crate) fn key(uri: Url) -> Self {
        Self {
            uri,
            value: None,
            base: None,
            path: String::new(),
            root: None,
            root_uri: None,
        }
    }

    /// whether this identifier was built from a plain-name anchor
    pub fn is_anchor(&self) -> bool {
        has_non_empty_fragment(&self.uri)
    }
}

impl PartialEq for Id {
    fn eq(&self, other: &Self) -> bool {
        self.uri == other.uri
    }
}

impl Eq for Id {}

impl Hash for Id {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.uri.hash(state);
    }
}

impl std::fmt::Display for Id {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.uri.fmt(f)
    }
}

// --

/// Scans `schema` for `$id` and `$anchor` declarations, producing the map
/// used to resolve references during validation.
///
/// `base_uri` must be absolute with no non-empty fragment. The document root
/// is always present in the result, keyed under `base_uri` unless a root
/// `$id` overrides it.
pub fn scan_ids<'a>(
    base_uri: &str,
    schema: &'a Value,
    spec: Specification,
) -> Result<HashMap<Id, &'a Value>, Error> {
    scan_ids_opt(base_uri, schema, spec, true)
}

pub(crate) fn scan_ids_opt<'a>(
    base_uri: &str,
    schema: &'a Value,
    spec: Specification,
    auto_resolve: bool,
) -> Result<HashMap<Id, &'a Value>, Error> {
    let base = Url::parse(base_uri).map_err(|src| Error::ParseUrl {
        url: base_uri.to_owned(),
        src,
    })?;
    if has_non_empty_fragment(&base) {
        return Err(Error::NonEmptyFragment {
            url: base_uri.to_owned(),
        });
    }
    let base = strip_fragment(&base).into_owned();

    let mut scan = Scan {
        root_uri: base.clone(),
        root_id: base.clone(),
        spec,
        auto_resolve,
        ids: HashMap::new(),
    };
    walker::walk(draft(spec), schema, base.clone(), &mut |v, state, seed| {
        scan.element(v, state, seed)
    })?;
    let Scan {
        root_id, mut ids, ..
    } = scan;

    // the document root answers to the base even without a root $id
    let root = Id {
        uri: base.clone(),
        value: None,
        base: None,
        path: String::new(),
        root: Some(root_id),
        root_uri: Some(base),
    };
    ids.entry(root).or_insert(schema);

    Ok(ids)
}

struct Scan<'a> {
    root_uri: Url,
    root_id: Url,
    spec: Specification,
    auto_resolve: bool,
    ids: HashMap<Id, &'a Value>,
}

impl<'a> Scan<'a> {
    // seed is the base URI in effect for this element; the return value is
    // the base its children inherit
    fn element(
        &mut self,
        v: &'a Value,
        state: &walker::WalkState,
        base: &Url,
    ) -> Result<Url, Error> {
        let Value::Object(obj) = v else {
            return Ok(base.clone());
        };

        // a `properties` map holds property names, not keywords
        if state.name == "properties" {
            return Ok(base.clone());
        }

        let mut base = base.clone();

        if let Some(id) = obj.get("$id") {
            let loc = format!("{}/$id", state.path);
            let Value::String(id) = id else {
                return Err(self.malformed(&loc, "not a string"));
            };
            if !self.auto_resolve && is_relative(id) {
                return Err(self.malformed(&loc, "relative identifier not allowed"));
            }
            let Ok(uri) = base.join(id) else {
                return Err(self.malformed(&loc, "not a valid URI-reference"));
            };

            if has_non_empty_fragment(&uri) {
                if self.spec >= Specification::Draft201909 {
                    return Err(self.malformed(&loc, "has a non-empty fragment"));
                }
                let frag_raw = uri.fragment().unwrap_or_default();
                let frag_wrapper = Fragment(frag_raw);
                let Ok(frag) = frag_wrapper.decode() else {
                    return Err(self.malformed(&loc, "fragment is not valid UTF-8"));
                };
                if !ANCHOR_PATTERN.is_match(&frag) {
                    return Err(self.malformed(&loc, "invalid plain name"));
                }
                self.record(uri, id, &base, state, v, true)?;
                // an anchor-form $id does not change the base
            } else {
                let uri = strip_fragment(&uri).into_owned();
                self.record(uri.clone(), id, &base, state, v, false)?;
                base = uri;
                if state.path.is_empty() {
                    self.root_id = base.clone();
                }
            }
        }

        if self.spec >= Specification::Draft201909 {
            if let Some(anchor) = obj.get("$anchor") {
                let loc = format!("{}/$anchor", state.path);
                let Value::String(anchor) = anchor else {
                    return Err(self.malformed(&loc, "not a string"));
                };
                if !ANCHOR_PATTERN.is_match(anchor) {
                    return Err(self.malformed(&loc, "invalid plain name"));
                }
                let Ok(uri) = base.join(&format!("#{anchor}")) else {
                    return Err(self.malformed(&loc, "not a valid URI-reference"));
                };
                self.record(uri, anchor, &base, state, v, true)?;
            }
        }

        Ok(base)
    }

    fn record(
        &mut self,
        uri: Url,
        value: &str,
        base: &Url,
        state: &walker::WalkState,
        v: &'a Value,
        anchor: bool,
    ) -> Result<(), Error> {
        let id = Id {
            uri,
            value: Some(value.to_owned()),
            base: Some(base.clone()),
            path: state.path.clone(),
            root: Some(self.root_id.clone()),
            root_uri: Some(self.root_uri.clone()),
        };
        if let Some((prev, _)) = self.ids.get_key_value(&id) {
            let location = self.location(&state.path);
            return Err(if anchor || prev.is_anchor() {
                Error::DuplicateAnchor {
                    location,
                    anchor: value.to_owned(),
                }
            } else {
                Error::DuplicateId {
                    location,
                    id: id.uri.to_string(),
                }
            });
        }
        self.ids.insert(id, v);
        Ok(())
    }

    fn malformed(&self, path: &str, message: &str) -> Error {
        Error::MalformedSchema {
            location: self.location(path),
            message: message.to_owned(),
        }
    }

    fn location(&self, path: &str) -> String {
        let mut url = self.root_uri.clone();
        url.set_fragment(Some(path));
        url.to_string()
    }
}

fn is_relative(id: &str) -> bool {
    let (id, _) = split(id);
    matches!(Url::parse(id), Err(url::ParseError::RelativeUrlWithoutBase))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use serde_json::json;

    use super::*;

    fn ids_of(base: &str, schema: &Value, spec: Specification) -> HashMap<String, String> {
        scan_ids(base, schema, spec)
            .unwrap()
            .keys()
            .map(|id| (id.uri.to_string(), id.path.clone()))
            .collect()
    }

    #[test]
    fn test_collect_ids() {
        let schema = json!({
            "$id": "http://a.com/schemas/schema.json",
            "definitions": {
                "s1": { "$id": "http://a.com/definitions/s1" },
                "s2": {
                    "$id": "../s2",
                    "items": [
                        { "$id": "http://c.com/item" },
                        { "$id": "http://d.com/item" }
                    ]
                },
                "s3": {
                    "definitions": {
                        "s1": {
                            "$id": "s3",
                            "items": {
                                "$id": "http://b.com/item"
                            }
                        }
                    }
                }
            }
        });

        let got = ids_of(
            "http://a.com/schema.json",
            &schema,
            Specification::Draft07,
        );
        let want = HashMap::from(
            [
                ("http://a.com/schemas/schema.json", ""), // root with id
                ("http://a.com/schema.json", ""),         // the retrieval uri
                ("http://a.com/definitions/s1", "/definitions/s1"),
                ("http://a.com/s2", "/definitions/s2"), // relative id
                ("http://a.com/schemas/s3", "/definitions/s3/definitions/s1"),
                (
                    "http://b.com/item",
                    "/definitions/s3/definitions/s1/items",
                ),
                ("http://c.com/item", "/definitions/s2/items/0"),
                ("http://d.com/item", "/definitions/s2/items/1"),
            ]
            .map(|(u, p)| (u.to_owned(), p.to_owned())),
        );
        assert_eq!(got, want);
    }

    #[test]
    fn test_anchor_form_id() {
        // pre-2019 drafts treat a fragment-only $id as an anchor
        let schema = json!({
            "definitions": {
                "s4": { "$id": "#abcd" }
            }
        });
        let ids = scan_ids("http://e.com/def", &schema, Specification::Draft07).unwrap();
        let anchor = ids
            .keys()
            .find(|id| id.path == "/definitions/s4")
            .unwrap();
        assert!(anchor.is_anchor());
        assert_eq!(anchor.uri.as_str(), "http://e.com/def#abcd");

        // and 2019-09 rejects it
        let err = scan_ids("http://e.com/def", &schema, Specification::Draft201909);
        assert!(matches!(err, Err(Error::MalformedSchema { .. })));
    }

    #[test]
    fn test_anchors_2019() {
        let schema = json!({
            "$defs": {
                "s2": {
                    "$id": "http://b.com",
                    "$anchor": "b1",
                    "items": [
                        { "$anchor": "b2" },
                        { "$anchor": "b3" }
                    ]
                }
            }
        });
        let got = ids_of(
            "http://a.com/schema.json",
            &schema,
            Specification::Draft201909,
        );
        assert_eq!(got.get("/$defs/s2/items/0").unwrap(), "http://b.com/#b2");
        assert_eq!(got.get("/$defs/s2/items/1").unwrap(), "http://b.com/#b3");
    }

    #[test]
    fn test_properties_not_scanned() {
        // a property literally named $id is data, not an identifier
        let schema = json!({
            "properties": {
                "$id": { "type": "string" },
                "$anchor": { "type": "string" }
            }
        });
        let ids = scan_ids(
            "http://a.com/schema.json",
            &schema,
            Specification::Draft201909,
        )
        .unwrap();
        assert_eq!(ids.len(), 1); // just the root
    }

    #[test]
    fn test_duplicate_id() {
        let schema = json!({
            "$defs": {
                "a": { "$id": "http://x.com/s" },
                "b": { "$id": "http://x.com/s" }
            }
        });
        let err = scan_ids(
            "http://a.com/schema.json",
            &schema,
            Specification::Draft201909,
        );
        assert!(matches!(err, Err(Error::DuplicateId { .. })));
    }

    #[test]
    fn test_duplicate_anchor() {
        let schema = json!({
            "$defs": {
                "a": { "$anchor": "x" },
                "b": { "$anchor": "x" }
            }
        });
        let err = scan_ids(
            "http://a.com/schema.json",
            &schema,
            Specification::Draft201909,
        );
        assert!(matches!(err, Err(Error::DuplicateAnchor { .. })));
    }

    #[test]
    fn test_base_uri_fragment_rejected() {
        let schema = json!(true);
        let err = scan_ids("http://a.com/s#frag", &schema, Specification::Draft07);
        assert!(matches!(err, Err(Error::NonEmptyFragment { .. })));
    }
}
