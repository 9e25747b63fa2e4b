//! Canonical request signatures.
//!
//! A [`RequestSignature`] encodes a resource name plus every parameter that
//! affects a read. Parameters are kept in a sorted map and list values are
//! sorted before joining, so two requests with equal semantics produce equal
//! signatures no matter the order their parameters were supplied in.
//!
//! ```rust
//! # use eventide::cache::RequestSignature;
//! let a = RequestSignature::builder("events/search")
//!     .param("page", 1)
//!     .list("categories", &["music", "art"])
//!     .build();
//! let b = RequestSignature::builder("events/search")
//!     .list("categories", &["art", "music"])
//!     .param("page", 1)
//!     .build();
//! assert_eq!(a, b);
//! assert_eq!(a.as_str(), "events/search?categories=art,music&page=1");
//! ```
//!
//! # Pages
//!
//! Paginated reads build one signature per parameter set (its scope) and
//! extend it with [`RequestSignature::page`]. Every page of a scope then
//! shares [`RequestSignature::page_prefix`], so all of them can be evicted
//! together with `CacheStore::invalidate`.

use std::collections::BTreeMap;
use std::fmt;

/// Opaque, order-independent cache key for a read operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestSignature(String);

impl RequestSignature {
    /// Start building a signature for `resource`.
    pub fn builder(resource: impl Into<String>) -> SignatureBuilder {
        SignatureBuilder {
            resource: resource.into(),
            params: BTreeMap::new(),
        }
    }

    /// The canonical string form.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The resource name, i.e. everything before the parameter list.
    pub fn resource(&self) -> &str {
        self.0
            .split(['?', PAGE_MARKER])
            .next()
            .unwrap_or(self.0.as_str())
    }

    /// Signature of `page` within this scope.
    pub fn page(&self, page: u32) -> RequestSignature {
        RequestSignature(format!("{}{PAGE_MARKER}page={page}", self.0))
    }

    /// Prefix shared by the signatures of every page of this scope.
    pub fn page_prefix(&self) -> String {
        format!("{}{PAGE_MARKER}", self.0)
    }
}

/// Separates a scope from its page number.
const PAGE_MARKER: char = '#';

impl fmt::Display for RequestSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Builder for [`RequestSignature`].
#[derive(Debug, Clone)]
pub struct SignatureBuilder {
    resource: String,
    params: BTreeMap<String, String>,
}

impl SignatureBuilder {
    /// Add a single-valued parameter.
    ///
    /// Floats are rendered with their shortest exact representation; no
    /// rounding is applied.
    pub fn param(mut self, key: &str, value: impl fmt::Display) -> Self {
        self.params.insert(key.to_string(), escape(&value.to_string()));
        self
    }

    /// Add a parameter only when it is present.
    pub fn opt_param<T: fmt::Display>(self, key: &str, value: Option<T>) -> Self {
        match value {
            Some(value) => self.param(key, value),
            None => self,
        }
    }

    /// Add a multi-valued parameter. Values are sorted; an empty list is omitted.
    pub fn list<S: AsRef<str>>(mut self, key: &str, values: &[S]) -> Self {
        if values.is_empty() {
            return self;
        }
        let mut escaped: Vec<String> = values.iter().map(|v| escape(v.as_ref())).collect();
        escaped.sort();
        self.params.insert(key.to_string(), escaped.join(","));
        self
    }

    pub fn build(self) -> RequestSignature {
        if self.params.is_empty() {
            return RequestSignature(self.resource);
        }
        let query = self
            .params
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&");
        RequestSignature(format!("{}?{query}", self.resource))
    }
}

/// Escape the separators used by the canonical form.
fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '%' => out.push_str("%25"),
            '&' => out.push_str("%26"),
            '=' => out.push_str("%3D"),
            ',' => out.push_str("%2C"),
            '?' => out.push_str("%3F"),
            '#' => out.push_str("%23"),
            c => out.push(c),
        }
    }
    out
}
