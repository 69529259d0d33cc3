use std::collections::HashMap;

use once_cell::sync::Lazy;
use serde_json::Value;
use url::Url;

use crate::{scan, scan::Id, Specification};

/// A meta-schema resource shipped with the crate.
pub(crate) struct Resource {
    pub(crate) url: Url,
    pub(crate) spec: Specification,
    pub(crate) doc: Value,
}

static RESOURCES: Lazy<HashMap<Url, Resource>> = Lazy::new(|| {
    let entries: &[(&str, Specification, &str)] = &[
        (
            "https://json-schema.org/draft/2019-09/schema",
            Specification::Draft201909,
            include_str!("metaschemas/draft2019-09/schema.json"),
        ),
        (
            "https://json-schema.org/draft/2019-09/meta/core",
            Specification::Draft201909,
            include_str!("metaschemas/draft2019-09/core.json"),
        ),
        (
            "https://json-schema.org/draft/2019-09/meta/applicator",
            Specification::Draft201909,
            include_str!("metaschemas/draft2019-09/applicator.json"),
        ),
        (
            "https://json-schema.org/draft/2019-09/meta/validation",
            Specification::Draft201909,
            include_str!("metaschemas/draft2019-09/validation.json"),
        ),
        (
            "https://json-schema.org/draft/2019-09/meta/meta-data",
            Specification::Draft201909,
            include_str!("metaschemas/draft2019-09/meta-data.json"),
        ),
        (
            "https://json-schema.org/draft/2019-09/meta/format",
            Specification::Draft201909,
            include_str!("metaschemas/draft2019-09/format.json"),
        ),
        (
            "https://json-schema.org/draft/2019-09/meta/content",
            Specification::Draft201909,
            include_str!("metaschemas/draft2019-09/content.json"),
        ),
        (
            "http://json-schema.org/draft-07/schema",
            Specification::Draft07,
            include_str!("metaschemas/draft7.json"),
        ),
        (
            "http://json-schema.org/draft-06/schema",
            Specification::Draft06,
            include_str!("metaschemas/draft6.json"),
        ),
    ];
    entries
        .iter()
        .map(|(url, spec, json)| {
            let url = Url::parse(url).expect("embedded meta-schema url must parse");
            let doc = serde_json::from_str(json).expect("embedded meta-schema must parse");
            (
                url.clone(),
                Resource {
                    url,
                    spec: *spec,
                    doc,
                },
            )
        })
        .collect()
});

// ids scanned once per meta resource, keyed by the normalized resource url
static RESOURCE_IDS: Lazy<HashMap<Url, HashMap<Id, &'static Value>>> = Lazy::new(|| {
    RESOURCES
        .iter()
        .map(|(url, res)| {
            let ids = scan::scan_ids(url.as_str(), &res.doc, res.spec)
                .expect("embedded meta-schema ids must scan");
            (url.clone(), ids)
        })
        .collect()
});

/// Returns the embedded resource registered under `url`, which must carry no
/// fragment.
pub(crate) fn load_resource(url: &Url) -> Option<&'static Resource> {
    RESOURCES.get(url)
}

pub(crate) fn resource_ids(url: &Url) -> Option<&'static HashMap<Id, &'static Value>> {
    RESOURCE_IDS.get(url)
}
