use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::util::*;

pub(crate) const POS_SELF: u8 = 1 << 0;
pub(crate) const POS_PROP: u8 = 1 << 1;
pub(crate) const POS_ITEM: u8 = 1 << 2;

/// The supported specification drafts, in increasing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Specification {
    Draft06,
    Draft07,
    Draft201909,
}

impl Specification {
    /// Recognizes the `$schema` URI of a supported draft. Percent-encoded
    /// and `http`/`https` variants are accepted.
    pub fn from_url(url: &str) -> Option<Specification> {
        let (mut url, fragment) = split(url);
        if !fragment.as_str().is_empty() {
            return None;
        }
        if let Some(s) = url.strip_prefix("http://") {
            url = s;
        }
        if let Some(s) = url.strip_prefix("https://") {
            url = s;
        }
        let url = path_unescape(url).ok()?;
        match url.as_str() {
            "json-schema.org/draft/2019-09/schema" => Some(Specification::Draft201909),
            "json-schema.org/draft-07/schema" => Some(Specification::Draft07),
            "json-schema.org/draft-06/schema" => Some(Specification::Draft06),
            _ => None,
        }
    }
}

impl std::fmt::Display for Specification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Specification::Draft06 => write!(f, "draft-06"),
            Specification::Draft07 => write!(f, "draft-07"),
            Specification::Draft201909 => write!(f, "draft 2019-09"),
        }
    }
}

// --

pub(crate) struct Draft {
    /// keyword name to the positions at which its value holds subschemas
    pub(crate) subschemas: HashMap<&'static str, u8>,
    pub(crate) vocab_prefix: &'static str,
    pub(crate) all_vocabs: Vec<&'static str>,
}

static DRAFT6: Lazy<Draft> = Lazy::new(|| Draft {
    subschemas: HashMap::from([
        // type agnostic
        ("definitions", POS_PROP),
        ("not", POS_SELF),
        ("allOf", POS_ITEM),
        ("anyOf", POS_ITEM),
        ("oneOf", POS_ITEM),
        // object
        ("properties", POS_PROP),
        ("additionalProperties", POS_SELF),
        ("patternProperties", POS_PROP),
        ("propertyNames", POS_SELF),
        ("dependencies", POS_PROP),
        // array
        ("items", POS_SELF | POS_ITEM),
        ("additionalItems", POS_SELF),
        ("contains", POS_SELF),
    ]),
    vocab_prefix: "",
    all_vocabs: vec![],
});

static DRAFT7: Lazy<Draft> = Lazy::new(|| {
    let mut subschemas = DRAFT6.subschemas.clone();
    subschemas.extend([("if", POS_SELF), ("then", POS_SELF), ("else", POS_SELF)]);
    Draft {
        subschemas,
        vocab_prefix: "",
        all_vocabs: vec![],
    }
});

static DRAFT2019: Lazy<Draft> = Lazy::new(|| {
    let mut subschemas = DRAFT7.subschemas.clone();
    subschemas.extend([
        ("$defs", POS_PROP),
        ("dependentSchemas", POS_PROP),
        ("unevaluatedProperties", POS_SELF),
        ("unevaluatedItems", POS_SELF),
        ("contentSchema", POS_SELF),
    ]);
    Draft {
        subschemas,
        vocab_prefix: "https://json-schema.org/draft/2019-09/vocab/",
        all_vocabs: vec![
            "core",
            "applicator",
            "validation",
            "meta-data",
            "format",
            "content",
        ],
    }
});

pub(crate) fn draft(spec: Specification) -> &'static Draft {
    match spec {
        Specification::Draft06 => &DRAFT6,
        Specification::Draft07 => &DRAFT7,
        Specification::Draft201909 => &DRAFT2019,
    }
}

/// plain-name anchors, as in xml NCName
pub(crate) static ANCHOR_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new("^[A-Z_a-z][-A-Z_a-z.0-9]*$").expect("anchor pattern must compile"));

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_url() {
        let tests = [
            (
                "http://json-schema.org/draft/2019-09/schema",
                Some(Specification::Draft201909),
            ),
            (
                "https://json-schema.org/draft/2019-09/schema",
                Some(Specification::Draft201909),
            ),
            (
                "https://json-schema.org/draft-07/schema",
                Some(Specification::Draft07),
            ),
            (
                "https://json-schema.org/%64raft-06/schema", // percent-encoded
                Some(Specification::Draft06),
            ),
            ("https://json-schema.org/draft-04/schema", None),
            ("https://json-schema.org/draft-07/schema#frag", None),
        ];
        for (url, want) in tests {
            assert_eq!(Specification::from_url(url), want, "for {url}");
        }
    }

    #[test]
    fn test_ordering() {
        assert!(Specification::Draft06 < Specification::Draft07);
        assert!(Specification::Draft07 < Specification::Draft201909);
    }

    #[test]
    fn test_anchor_pattern() {
        assert!(ANCHOR_PATTERN.is_match("a-b.c_d0"));
        assert!(ANCHOR_PATTERN.is_match("_x"));
        assert!(!ANCHOR_PATTERN.is_match("0abc"));
        assert!(!ANCHOR_PATTERN.is_match("a b"));
        assert!(!ANCHOR_PATTERN.is_match(""));
    }
}
