use std::fmt;

/// The `Require` header (RFC 3261 §20.32): option tags the UAS must
/// understand or else reject the request with a 420 listing the
/// unsupported ones in `Unsupported`.
#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub struct Require(pub Vec<String>);

impl Require {
    pub fn contains(&self, tag: &str) -> bool {
        self.0.iter().any(|t| t.eq_ignore_ascii_case(tag))
    }
}

impl fmt::Display for Require {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join(", "))
    }
}
