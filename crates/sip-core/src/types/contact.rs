use std::fmt;

use crate::types::param::ParamList;
use crate::types::uri::Uri;

/// A single binding in a `Contact` header (RFC 3261 §20.10). A request or
/// response carries zero or more of these; `*` (the "remove all bindings"
/// form used by REGISTER) is represented separately as `Contact::Star`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ContactBinding {
    pub display_name: Option<String>,
    pub uri: Uri,
    pub params: ParamList,
}

impl ContactBinding {
    pub fn new(uri: Uri) -> Self {
        ContactBinding { display_name: None, uri, params: ParamList::new() }
    }

    /// The `q` parameter (RFC 3261 §20.10), used to rank multiple bindings.
    pub fn q(&self) -> Option<f32> {
        self.params.get("q").and_then(|v| v.parse().ok())
    }

    /// The `expires` parameter, if present; falls back to the header's own
    /// `Expires` only at a higher layer, not here.
    pub fn expires(&self) -> Option<u32> {
        self.params.get("expires").and_then(|v| v.parse().ok())
    }
}

impl fmt::Display for ContactBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(name) = &self.display_name {
            write!(f, "\"{}\" ", name.replace('"', "\\\""))?;
        }
        write!(f, "<{}>{}", self.uri, self.params)
    }
}

/// The `Contact` header value: either one or more bindings, or the bare
/// `*` wildcard (only legal in a REGISTER request).
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Contact {
    Star,
    Bindings(Vec<ContactBinding>),
}

impl fmt::Display for Contact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Contact::Star => f.write_str("*"),
            Contact::Bindings(bindings) => {
                let strs: Vec<String> = bindings.iter().map(|b| b.to_string()).collect();
                f.write_str(&strs.join(", "))
            }
        }
    }
}
