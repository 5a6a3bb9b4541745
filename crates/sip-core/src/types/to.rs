use std::fmt;

use crate::types::param::ParamList;
use crate::types::uri::Uri;

/// The `To` header (RFC 3261 §20.39): the logical recipient. Gains a `tag`
/// the first time the recipient sends a response back within the dialog.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct To {
    pub display_name: Option<String>,
    pub uri: Uri,
    pub params: ParamList,
}

impl To {
    pub fn new(uri: Uri) -> Self {
        To { display_name: None, uri, params: ParamList::new() }
    }

    pub fn tag(&self) -> Option<&str> {
        self.params.get("tag")
    }

    pub fn set_tag(&mut self, tag: impl Into<String>) {
        self.params.set("tag", tag);
    }
}

impl fmt::Display for To {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(name) = &self.display_name {
            write!(f, "\"{}\" ", name.replace('"', "\\\""))?;
        }
        write!(f, "<{}>{}", self.uri, self.params)
    }
}
