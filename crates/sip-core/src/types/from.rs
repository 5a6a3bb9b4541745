use std::fmt;

use crate::types::param::ParamList;
use crate::types::uri::Uri;

/// The `From` header (RFC 3261 §20.20): the logical sender of the request,
/// always carrying a `tag` once a dialog exists.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct From {
    pub display_name: Option<String>,
    pub uri: Uri,
    pub params: ParamList,
}

impl From {
    pub fn new(uri: Uri) -> Self {
        From { display_name: None, uri, params: ParamList::new() }
    }

    pub fn tag(&self) -> Option<&str> {
        self.params.get("tag")
    }

    pub fn set_tag(&mut self, tag: impl Into<String>) {
        self.params.set("tag", tag);
    }
}

impl fmt::Display for From {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(name) = &self.display_name {
            write!(f, "\"{}\" ", name.replace('"', "\\\""))?;
        }
        write!(f, "<{}>{}", self.uri, self.params)
    }
}
