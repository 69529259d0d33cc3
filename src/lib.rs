//! A general-purpose JSON Schema validator supporting drafts 6, 7 and
//! 2019-09.
//!
//! Validation walks the schema tree against the instance tree directly. A
//! pre-validation scan collects `$id` and `$anchor` declarations so that
//! references resolve across the document and the embedded meta-schemas, and
//! an annotation store carries the results of applicators like `properties`
//! to the keywords that consume them (`additionalProperties`,
//! `unevaluatedProperties`, `then`, `minContains`, ...).
//!
//! ```
//! use serde_json::json;
//!
//! let schema = json!({
//!     "type": "object",
//!     "properties": {
//!         "speak": { "const": "meow" }
//!     },
//!     "required": ["speak"]
//! });
//! let instance = json!({"speak": "meow"});
//! let valid = skema::validate(&schema, &instance, "http://example.com/cat.json")?;
//! assert!(valid);
//! # Ok::<(), skema::Error>(())
//! ```
//!
//! Structured reports are collected through [`Validator`]:
//!
//! ```
//! use serde_json::json;
//! use skema::Validator;
//!
//! let schema = json!({"items": {"type": "integer"}});
//! let report = Validator::new()
//!     .collect_errors(true)
//!     .validate(&schema, &json!([1, "two"]), "http://example.com/s.json")?;
//! assert!(!report.valid);
//! # Ok::<(), skema::Error>(())
//! ```

mod content;
mod context;
mod draft;
mod ecma;
mod formats;
mod keywords;
mod loader;
mod num;
mod scan;
mod util;
mod walker;

use std::collections::{BTreeSet, HashMap, HashSet};

use serde::Serialize;
use serde_json::Value;
use url::Url;

use crate::context::Context;
use crate::util::quote;

pub use draft::Specification;
pub use scan::{scan_ids, Id};

/// annotations keyed by instance location, name, then schema location
pub type AnnotationMap = HashMap<String, HashMap<String, HashMap<String, Annotation>>>;

/// validation failures keyed by schema location, then instance location
pub type ErrorMap = HashMap<String, HashMap<String, String>>;

/// A value attached by a keyword to an instance location.
#[derive(Debug, Clone, Serialize)]
pub struct Annotation {
    pub name: String,
    /// dynamic json-pointer through the schema, following `$ref`
    pub schema_location: String,
    /// static URI of the producing keyword
    pub absolute_schema_location: String,
    pub instance_location: String,
    pub value: AnnotationValue,
}

/// The payload domain of [`Annotation`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AnnotationValue {
    Bool(bool),
    /// a count of positionally applied items
    Count(usize),
    /// a set of matched object keys
    Keys(BTreeSet<String>),
    Json(Value),
}

/// Validation options. The defaults follow the drafts: `format` asserts up
/// to draft-07 and only annotates from 2019-09 on, content keywords only
/// annotate, and relative identifiers resolve against the base URI.
#[derive(Debug, Clone)]
pub struct Options {
    /// treat `format` as an assertion; `None` applies the per-draft default
    pub format: Option<bool>,
    /// enforce `contentEncoding`/`contentMediaType`/`contentSchema`
    pub content: bool,
    /// draft used when `$schema` is absent
    pub default_specification: Specification,
    /// keep annotations contributed by failed subschemas
    pub collect_annotations_for_failed: bool,
    /// stop at the first validation error
    pub fail_fast: bool,
    /// resolve relative `$id`s against the base URI
    pub auto_resolve: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            format: None,
            content: false,
            default_specification: Specification::Draft201909,
            collect_annotations_for_failed: false,
            fail_fast: false,
            auto_resolve: true,
        }
    }
}

// --

/// The errors that abort a validation call. Validation failures of the
/// instance are not errors; they surface as a `false` verdict and, when
/// collection is enabled, as entries in the error report.
#[derive(Debug)]
pub enum Error {
    ParseUrl {
        url: String,
        src: url::ParseError,
    },
    NonEmptyFragment {
        url: String,
    },
    /// the schema itself is invalid; `location` is the absolute keyword URI
    MalformedSchema {
        location: String,
        message: String,
    },
    DuplicateId {
        location: String,
        id: String,
    },
    DuplicateAnchor {
        location: String,
        anchor: String,
    },
    UnsupportedVocabulary {
        location: String,
        vocabulary: String,
    },
    UnresolvedReference {
        location: String,
        reference: String,
    },
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ParseUrl { url, src } => write!(f, "error parsing {}: {src}", quote(url)),
            Self::NonEmptyFragment { url } => {
                write!(f, "{} has a non-empty fragment", quote(url))
            }
            Self::MalformedSchema { location, message } => {
                write!(f, "invalid schema at {location}: {message}")
            }
            Self::DuplicateId { location, id } => {
                write!(f, "duplicate id {} at {location}", quote(id))
            }
            Self::DuplicateAnchor { location, anchor } => {
                write!(f, "duplicate anchor {} at {location}", quote(anchor))
            }
            Self::UnsupportedVocabulary {
                location,
                vocabulary,
            } => write!(f, "unsupported vocabulary {} at {location}", quote(vocabulary)),
            Self::UnresolvedReference {
                location,
                reference,
            } => write!(f, "cannot resolve {} at {location}", quote(reference)),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ParseUrl { src, .. } => Some(src),
            _ => None,
        }
    }
}

// --

/// The outcome of a [`Validator::validate`] call. The optional reports are
/// present for the categories whose collection was requested.
#[derive(Debug)]
pub struct Report {
    pub valid: bool,
    pub annotations: Option<AnnotationMap>,
    pub errors: Option<ErrorMap>,
    pub ids: Option<Vec<Id>>,
}

/// Configures and runs validations.
#[derive(Debug, Default, Clone)]
pub struct Validator {
    options: Options,
    collect_annotations: bool,
    collect_errors: bool,
    collect_ids: bool,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn options(mut self, options: Options) -> Self {
        self.options = options;
        self
    }

    /// include the annotation report in the outcome
    pub fn collect_annotations(mut self, yes: bool) -> Self {
        self.collect_annotations = yes;
        self
    }

    /// include the error report in the outcome
    pub fn collect_errors(mut self, yes: bool) -> Self {
        self.collect_errors = yes;
        self
    }

    /// include the scanned identifiers in the outcome
    pub fn collect_ids(mut self, yes: bool) -> Self {
        self.collect_ids = yes;
        self
    }

    /// Validates `instance` against `schema`. `base_uri` must be absolute
    /// with no non-empty fragment; it identifies the schema resource and is
    /// the base for relative references.
    pub fn validate(
        &self,
        schema: &Value,
        instance: &Value,
        base_uri: &str,
    ) -> Result<Report, Error> {
        let spec = detect_specification(schema, &self.options);
        let ids = scan::scan_ids_opt(base_uri, schema, spec, self.options.auto_resolve)?;
        let report_ids = self
            .collect_ids
            .then(|| ids.keys().cloned().collect::<Vec<_>>());

        // scan_ids has already vetted the base
        let mut base = Url::parse(base_uri).map_err(|src| Error::ParseUrl {
            url: base_uri.to_owned(),
            src,
        })?;
        base.set_fragment(None);

        let mut context = Context::new(
            base,
            spec,
            ids,
            HashSet::new(),
            self.options.clone(),
            self.collect_errors,
        );
        let valid = context.apply(schema, "", instance, "")?;
        let (annotations, mut errors) = context.into_reports();
        if valid {
            // errors recorded along failed branches of a passing evaluation
            // are not failures of the instance
            errors.clear();
        }

        Ok(Report {
            valid,
            annotations: self.collect_annotations.then_some(annotations),
            errors: self.collect_errors.then_some(errors),
            ids: report_ids,
        })
    }
}

/// Validates `instance` against `schema` with default options, reporting
/// only the verdict.
pub fn validate(schema: &Value, instance: &Value, base_uri: &str) -> Result<bool, Error> {
    Validator::new()
        .validate(schema, instance, base_uri)
        .map(|report| report.valid)
}

// the draft in effect at the document root
fn detect_specification(schema: &Value, options: &Options) -> Specification {
    if let Value::Object(obj) = schema {
        if let Some(Value::String(s)) = obj.get("$schema") {
            if let Some(spec) = Specification::from_url(s) {
                return spec;
            }
        }
    }
    options.default_specification
}
