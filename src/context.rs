use std::collections::{HashMap, HashSet};

use serde_json::{Map, Value};
use url::Url;

use crate::{
    keywords,
    loader,
    scan::Id,
    util::*,
    Annotation, AnnotationMap, AnnotationValue, Error, ErrorMap, Options, Specification,
};

/// The mutable evaluation state. Cloned on entry to a subschema and restored
/// on unwind, so keywords may adjust it freely for their subtree.
#[derive(Clone)]
pub(crate) struct State<'a> {
    /// the enclosing schema object of the keyword being applied
    pub(crate) schema_object: Option<&'a Map<String, Value>>,
    /// the enclosing schema object as a value, for meta-validation
    pub(crate) schema_value: Option<&'a Value>,
    /// whether the enclosing schema object is the root of its resource
    pub(crate) is_root: bool,
    /// base URI of the closest enclosing `$id`
    pub(crate) base_uri: Url,
    pub(crate) spec: Specification,
    /// resolution target for `$recursiveRef`
    pub(crate) prev_recursive_base: Option<Url>,
    /// innermost `$recursiveAnchor=true` base seen so far
    pub(crate) recursive_base: Option<Url>,
    /// dynamic json-pointer to the parent of the current keyword
    pub(crate) kw_parent_loc: String,
    /// dynamic json-pointer to the current keyword; follows `$ref`
    pub(crate) kw_loc: String,
    /// static URI of the current keyword; never traverses `$ref`
    pub(crate) abs_kw_loc: Url,
    /// json-pointer into the instance
    pub(crate) instance_loc: String,
    /// annotations from failing branches are withheld once this is off
    pub(crate) collect_sub: bool,
}

/// The schema processing state threaded through every keyword application.
pub(crate) struct Context<'a> {
    pub(crate) state: State<'a>,
    annotations: AnnotationMap,
    errors: ErrorMap,
    known_ids: HashMap<Id, &'a Value>,
    /// resources whose meta-schemas are validated or being validated
    validated: HashSet<Url>,
    options: Options,
    collect_errors: bool,
}

impl<'a> Context<'a> {
    /// `base_uri` must be absolute with no non-empty fragment.
    pub(crate) fn new(
        base_uri: Url,
        spec: Specification,
        known_ids: HashMap<Id, &'a Value>,
        validated: HashSet<Url>,
        options: Options,
        collect_errors: bool,
    ) -> Self {
        let mut abs = base_uri.clone();
        abs.set_fragment(Some(""));
        Self {
            state: State {
                schema_object: None,
                schema_value: None,
                is_root: true,
                base_uri,
                spec,
                prev_recursive_base: None,
                recursive_base: None,
                kw_parent_loc: String::new(),
                kw_loc: String::new(),
                abs_kw_loc: abs,
                instance_loc: String::new(),
                collect_sub: true,
            },
            annotations: HashMap::new(),
            errors: HashMap::new(),
            known_ids,
            validated,
            options,
            collect_errors,
        }
    }

    pub(crate) fn into_reports(self) -> (AnnotationMap, ErrorMap) {
        (self.annotations, self.errors)
    }

    // accessors --

    pub(crate) fn parent_object(&self) -> Option<&'a Map<String, Value>> {
        self.state.schema_object
    }

    pub(crate) fn is_root_schema(&self) -> bool {
        self.state.is_root
    }

    pub(crate) fn specification(&self) -> Specification {
        self.state.spec
    }

    pub(crate) fn set_specification(&mut self, spec: Specification) {
        self.state.spec = spec;
    }

    pub(crate) fn base_uri(&self) -> &Url {
        &self.state.base_uri
    }

    pub(crate) fn set_base_uri(&mut self, uri: Url) {
        self.state.base_uri = uri;
    }

    /// the base against which `$recursiveRef` resolves
    pub(crate) fn recursive_base_uri(&self) -> Option<&Url> {
        self.state.prev_recursive_base.as_ref()
    }

    /// Promotes the current base: the current recursive base becomes the
    /// previous one, and the current base becomes the recursive base. The
    /// first promotion points both at the current base.
    pub(crate) fn set_recursive_base_uri(&mut self) {
        let base = self.state.base_uri.clone();
        self.state.prev_recursive_base = match self.state.recursive_base.take() {
            Some(curr) => Some(curr),
            None => Some(base.clone()),
        };
        self.state.recursive_base = Some(base);
    }

    pub(crate) fn schema_parent_location(&self) -> &str {
        &self.state.kw_parent_loc
    }

    /// the static URI of the current keyword
    pub(crate) fn absolute_keyword_location(&self) -> String {
        self.state.abs_kw_loc.to_string()
    }

    pub(crate) fn options(&self) -> &Options {
        &self.options
    }

    pub(crate) fn is_fail_fast(&self) -> bool {
        self.options.fail_fast
    }

    /// whether `format` asserts under the current specification
    pub(crate) fn format_assertion(&self) -> bool {
        self.options
            .format
            .unwrap_or(self.state.spec < Specification::Draft201909)
    }

    pub(crate) fn set_collect_sub_annotations(&mut self, collect: bool) {
        self.state.collect_sub = collect;
    }

    // annotations --

    pub(crate) fn add_annotation(&mut self, name: &str, value: AnnotationValue) {
        if !self.state.collect_sub {
            return;
        }
        let annotation = Annotation {
            name: name.to_owned(),
            schema_location: self.state.kw_loc.clone(),
            absolute_schema_location: self.state.abs_kw_loc.to_string(),
            instance_location: self.state.instance_loc.clone(),
            value,
        };
        self.annotations
            .entry(self.state.instance_loc.clone())
            .or_default()
            .entry(name.to_owned())
            .or_default()
            .insert(self.state.kw_loc.clone(), annotation);
    }

    /// annotations with the given name at the current instance location,
    /// keyed by schema location
    pub(crate) fn get_annotations(&self, name: &str) -> Option<&HashMap<String, Annotation>> {
        self.annotations.get(&self.state.instance_loc)?.get(name)
    }

    fn prune_annotations(&mut self, instance_loc: &str, kw_prefix: &str) {
        if let Some(by_name) = self.annotations.get_mut(instance_loc) {
            for by_loc in by_name.values_mut() {
                by_loc.retain(|loc, _| !loc.starts_with(kw_prefix));
            }
        }
    }

    /// discards annotations contributed under the current keyword, at the
    /// current instance location
    pub(crate) fn drop_branch_annotations(&mut self) {
        let instance_loc = self.state.instance_loc.clone();
        let kw_loc = self.state.kw_loc.clone();
        self.prune_annotations(&instance_loc, &kw_loc);
    }

    // errors --

    /// records a validation failure for the current keyword
    pub(crate) fn add_error(&mut self, message: String) {
        if !self.collect_errors {
            return;
        }
        self.errors
            .entry(self.state.kw_loc.clone())
            .or_default()
            .insert(self.state.instance_loc.clone(), message);
    }

    /// a malformed-schema error at the current keyword
    pub(crate) fn schema_error(&self, message: impl Into<String>) -> Error {
        self.schema_error_at("", message)
    }

    /// a malformed-schema error at `path` below the current keyword
    pub(crate) fn schema_error_at(&self, path: &str, message: impl Into<String>) -> Error {
        Error::MalformedSchema {
            location: resolve_absolute(&self.state.abs_kw_loc, path).to_string(),
            message: message.into(),
        }
    }

    /// checks that `v` is an object or boolean
    pub(crate) fn check_valid_schema(&self, v: &Value, path: &str) -> Result<(), Error> {
        if v.is_object() || v.is_boolean() {
            Ok(())
        } else {
            Err(self.schema_error_at(path, "not a valid JSON schema"))
        }
    }

    // apply --

    /// Applies a schema to an instance. The path parameters are single
    /// relative tokens, "" meaning the current location. This is the only
    /// point of recursion in the engine.
    pub(crate) fn apply(
        &mut self,
        schema: &'a Value,
        schema_path: &str,
        instance: &Value,
        instance_path: &str,
    ) -> Result<bool, Error> {
        if let Value::Bool(b) = schema {
            return Ok(*b);
        }

        let abs_kw_loc = resolve_absolute(&self.state.abs_kw_loc, schema_path);
        let Value::Object(schema_object) = schema else {
            return Err(Error::MalformedSchema {
                location: abs_kw_loc.to_string(),
                message: "not a valid JSON schema".to_owned(),
            });
        };
        if schema_object.is_empty() {
            return Ok(true); // empty schemas always validate
        }

        let kw_loc = resolve_pointer(&self.state.kw_loc, schema_path);
        let instance_loc = resolve_pointer(&self.state.instance_loc, instance_path);

        // order the keywords by their evaluation class, keeping the schema's
        // key order within a class
        let mut ordered: Vec<(&'a String, &'a Value)> = schema_object
            .iter()
            .filter(|(name, _)| keywords::exists(name))
            .collect();
        ordered.sort_by_key(|(name, _)| keywords::class(name));

        let saved = self.state.clone();
        self.state.is_root = self.state.schema_object.is_none();
        self.state.schema_object = Some(schema_object);
        self.state.schema_value = Some(schema);
        self.state.kw_parent_loc = kw_loc.clone();
        self.state.instance_loc = instance_loc.clone();

        let result = (|| {
            for (name, value) in ordered {
                // a sibling $ref hides everything else before 2019-09
                if self.state.spec < Specification::Draft201909
                    && schema_object.contains_key("$ref")
                    && name.as_str() != "$ref"
                {
                    continue;
                }

                self.state.kw_loc = resolve_pointer(&kw_loc, name);
                self.state.abs_kw_loc = resolve_absolute(&abs_kw_loc, name);

                if !keywords::apply(name, value, instance, self)? {
                    if !self.options.collect_annotations_for_failed {
                        let kw_loc = self.state.kw_loc.clone();
                        self.prune_annotations(&instance_loc, &kw_loc);
                    }
                    return Ok(false);
                }
            }
            Ok(true)
        })();

        self.state = saved;
        result
    }

    // reference resolution --

    /// Resolves `reference` against the current base and locates the target
    /// schema, first among the scanned IDs and then among the embedded
    /// meta-schema resources.
    pub(crate) fn resolve_ref(&self, reference: &str) -> Result<RefTarget<'a>, Error> {
        let Ok(uri) = self.state.base_uri.join(reference) else {
            return Err(self.schema_error("not a valid URI-reference"));
        };
        self.find_schema(&uri)
            .ok_or_else(|| Error::UnresolvedReference {
                location: self.state.abs_kw_loc.to_string(),
                reference: uri.to_string(),
            })
    }

    /// Resolves an already-absolute URI the same way `resolve_ref` does.
    pub(crate) fn resolve_uri(&self, uri: &Url) -> Result<RefTarget<'a>, Error> {
        self.find_schema(uri)
            .ok_or_else(|| Error::UnresolvedReference {
                location: self.state.abs_kw_loc.to_string(),
                reference: uri.to_string(),
            })
    }

    fn find_schema(&self, uri: &Url) -> Option<RefTarget<'a>> {
        let stripped = strip_fragment(uri).into_owned();
        let frag = Fragment(uri.fragment().unwrap_or(""));

        // anchors and full ids match the scan directly
        let lookup = if frag.is_anchor() {
            uri.clone()
        } else {
            stripped.clone()
        };
        if let Some((id, &schema)) = self.known_ids.get_key_value(&Id::key(lookup)) {
            let abs = match (&id.root_uri, frag.is_anchor()) {
                (Some(root), true) => fragment_location(root, &id.path),
                _ => fragment_location(&stripped, ""),
            };
            let target = RefTarget {
                schema,
                base: stripped.clone(),
                spec: self.state.spec,
                abs,
                root: !frag.is_anchor(),
            };
            if frag.is_anchor() || frag.as_str().is_empty() {
                return Some(target);
            }
            // a pointer fragment walks down from the identified node
            let ptr = frag.decode().ok()?;
            let schema = follow(target.schema, &ptr)?;
            return Some(RefTarget {
                schema,
                abs: fragment_location(&stripped, &ptr),
                root: false,
                ..target
            });
        }

        // embedded meta-schema resources
        let res = loader::load_resource(&stripped)?;
        if frag.is_anchor() {
            let ids = loader::resource_ids(&stripped)?;
            let (id, &schema) = ids.get_key_value(&Id::key(uri.clone()))?;
            return Some(RefTarget {
                schema,
                base: stripped,
                spec: res.spec,
                abs: fragment_location(&res.url, &id.path),
                root: false,
            });
        }
        let ptr = frag.decode().ok()?;
        let schema = follow(&res.doc, &ptr)?;
        Some(RefTarget {
            schema,
            base: stripped,
            spec: res.spec,
            abs: fragment_location(&res.url, &ptr),
            root: ptr.is_empty(),
        })
    }

    // meta-validation --

    /// Validates the enclosing schema resource against the meta-schema at
    /// `meta_uri`, once per resource per evaluation.
    pub(crate) fn validate_against_meta(&mut self, meta_uri: &Url) -> Result<(), Error> {
        let resource = strip_fragment(&self.state.base_uri).into_owned();
        if !self.validated.insert(resource) {
            return Ok(());
        }
        let Some(schema_value) = self.state.schema_value else {
            return Ok(());
        };
        let Some(meta) = loader::load_resource(&strip_fragment(meta_uri)) else {
            return Err(self.schema_error("unknown meta-schema"));
        };
        let ids = loader::resource_ids(&meta.url)
            .cloned()
            .unwrap_or_default();
        let valid = validate_internal(
            &meta.doc,
            schema_value,
            meta.url.clone(),
            meta.spec,
            ids,
            self.validated.clone(),
            self.options.clone(),
        )?;
        if !valid {
            return Err(self.schema_error("schema not valid against its meta-schema"));
        }
        Ok(())
    }

    /// Validates `instance` against `schema` in a detached evaluation that
    /// shares the current resolution scope but keeps its own reports. Used
    /// for decoded content, whose instance tree is transient.
    pub(crate) fn validate_detached(
        &self,
        schema: &Value,
        instance: &Value,
    ) -> Result<bool, Error> {
        validate_internal(
            schema,
            instance,
            self.state.base_uri.clone(),
            self.state.spec,
            self.known_ids.clone(),
            self.validated.clone(),
            self.options.clone(),
        )
    }
}

/// A resolved reference target.
pub(crate) struct RefTarget<'a> {
    pub(crate) schema: &'a Value,
    /// base URI in effect inside the target
    pub(crate) base: Url,
    pub(crate) spec: Specification,
    /// static location of the target
    pub(crate) abs: Url,
    /// whether the target is the root of its schema resource
    pub(crate) root: bool,
}

/// Runs a complete nested evaluation with its own context. Used for
/// meta-validation and content re-validation, where the instance does not
/// share the caller's lifetime.
pub(crate) fn validate_internal<'v>(
    schema: &'v Value,
    instance: &'v Value,
    base_uri: Url,
    spec: Specification,
    known_ids: HashMap<Id, &'v Value>,
    validated: HashSet<Url>,
    options: Options,
) -> Result<bool, Error> {
    let mut context = Context::new(base_uri, spec, known_ids, validated, options, false);
    context.apply(schema, "", instance, "")
}

fn resolve_pointer(base: &str, path: &str) -> String {
    if path.is_empty() {
        base.to_owned()
    } else {
        format!("{base}/{}", escape(path))
    }
}

fn resolve_absolute(base: &Url, path: &str) -> Url {
    if path.is_empty() {
        return base.clone();
    }
    let mut url = base.clone();
    let frag = base.fragment().unwrap_or("");
    url.set_fragment(Some(&format!("{frag}/{}", fragment_escape(path))));
    url
}

fn fragment_location(base: &Url, ptr: &str) -> Url {
    let mut url = strip_fragment(base).into_owned();
    url.set_fragment(Some(ptr));
    url
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_pointer() {
        assert_eq!(resolve_pointer("", "type"), "/type");
        assert_eq!(resolve_pointer("/properties", "a/b"), "/properties/a~1b");
        assert_eq!(resolve_pointer("/allOf", ""), "/allOf");
    }

    #[test]
    fn test_resolve_absolute() {
        let base = Url::parse("http://a.com/s.json#").unwrap();
        assert_eq!(
            resolve_absolute(&base, "properties").as_str(),
            "http://a.com/s.json#/properties"
        );
        let deeper = resolve_absolute(&resolve_absolute(&base, "properties"), "a b");
        assert_eq!(deeper.as_str(), "http://a.com/s.json#/properties/a%20b");
        assert_eq!(resolve_absolute(&base, ""), base);
    }

    #[test]
    fn test_recursive_base_promotion() {
        let base1 = Url::parse("http://a.com/one").unwrap();
        let base2 = Url::parse("http://a.com/two").unwrap();
        let mut ctx = Context::new(
            base1.clone(),
            Specification::Draft201909,
            HashMap::new(),
            HashSet::new(),
            Options::default(),
            false,
        );
        assert!(ctx.recursive_base_uri().is_none());

        ctx.set_recursive_base_uri();
        assert_eq!(ctx.recursive_base_uri(), Some(&base1));

        ctx.set_base_uri(base2.clone());
        ctx.set_recursive_base_uri();
        // the previous innermost becomes the resolution target
        assert_eq!(ctx.recursive_base_uri(), Some(&base1));
        assert_eq!(ctx.state.recursive_base, Some(base2));
    }
}
