use std::fmt;

use crate::types::param::ParamList;
use crate::types::uri::Uri;

/// One entry of a `Route` or `Record-Route` header (RFC 3261 §20.34/
/// §20.30): a `name-addr` naming a proxy the request must, or already
/// did, traverse.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RouteEntry {
    pub display_name: Option<String>,
    pub uri: Uri,
    pub params: ParamList,
}

impl RouteEntry {
    pub fn new(uri: Uri) -> Self {
        RouteEntry { display_name: None, uri, params: ParamList::new() }
    }

    /// Whether the URI carries the `lr` (loose-routing) parameter, the
    /// signal that this is an RFC 3261 proxy and not a strict-routing
    /// RFC 2543 one.
    pub fn is_loose_routing(&self) -> bool {
        self.uri.as_sip().map(|u| u.lr_param).unwrap_or(false)
    }
}

impl fmt::Display for RouteEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(name) = &self.display_name {
            write!(f, "\"{}\" ", name.replace('"', "\\\""))?;
        }
        write!(f, "<{}>{}", self.uri, self.params)
    }
}

/// A `Route` header: the ordered list of proxies the request must pass
/// through next, consumed one entry at a time by a strict-routing UA and
/// left untouched by a loose-routing one.
#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub struct Route(pub Vec<RouteEntry>);

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let strs: Vec<String> = self.0.iter().map(|r| r.to_string()).collect();
        f.write_str(&strs.join(", "))
    }
}

/// A `Record-Route` header: the ordered list of proxies that inserted
/// themselves into the path, copied into the dialog's route-set so
/// subsequent in-dialog requests traverse the same proxies.
#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub struct RecordRoute(pub Vec<RouteEntry>);

impl fmt::Display for RecordRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let strs: Vec<String> = self.0.iter().map(|r| r.to_string()).collect();
        f.write_str(&strs.join(", "))
    }
}
