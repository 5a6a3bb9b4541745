use std::fmt;

use crate::types::method::Method;

/// The `Allow` header (RFC 3261 §20.5): the set of methods the sender
/// supports, most commonly carried on a 200 to an OPTIONS request.
#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub struct Allow(pub Vec<Method>);

impl Allow {
    pub fn contains(&self, method: &Method) -> bool {
        self.0.contains(method)
    }
}

impl fmt::Display for Allow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let strs: Vec<String> = self.0.iter().map(|m| m.to_string()).collect();
        f.write_str(&strs.join(", "))
    }
}
