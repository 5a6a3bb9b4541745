use std::fmt;

/// The `Unsupported` header (RFC 3261 §20.40): carried on a 420 to list
/// the option tags from the request's `Require` that the UAS rejected.
#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub struct Unsupported(pub Vec<String>);

impl fmt::Display for Unsupported {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join(", "))
    }
}
