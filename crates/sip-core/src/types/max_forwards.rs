use std::fmt;

/// The `Max-Forwards` header (RFC 3261 §20.22): a hop counter decremented
/// by every proxy, used to prevent a misrouted request from looping
/// forever. The core itself only models the value; decrementing it is a
/// proxy-layer concern outside this crate's scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct MaxForwards(pub u8);

impl MaxForwards {
    /// RFC 3261 §8.1.1 recommends 70 as the default a UAC sets.
    pub const DEFAULT: MaxForwards = MaxForwards(70);

    pub fn decrement(self) -> Option<MaxForwards> {
        self.0.checked_sub(1).map(MaxForwards)
    }
}

impl Default for MaxForwards {
    fn default() -> Self {
        MaxForwards::DEFAULT
    }
}

impl fmt::Display for MaxForwards {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
