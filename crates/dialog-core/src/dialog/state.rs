/// A dialog's lifecycle state (RFC 3261 §12):
///
/// ```text
/// Initial → Early → Confirmed → Terminated
///    └────────────────┘
///     (2xx can also confirm directly from Initial)
/// ```
///
/// `Recovering` is not part of RFC 3261 proper; it's this engine's own
/// extension for surviving a transport failure mid-dialog (§4.4) without
/// tearing the dialog down outright.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum DialogState {
    /// Created from a request/response that hasn't yet produced a tag on
    /// both sides.
    Initial,
    /// A provisional response with a To-tag was seen (early dialog).
    Early,
    /// A 2xx response completed dialog establishment.
    Confirmed,
    /// The underlying transport failed; recovery is attempting to
    /// re-establish it before giving up.
    Recovering,
    /// BYE sent/received, or establishment failed outright.
    Terminated,
}

impl DialogState {
    pub fn is_terminated(&self) -> bool {
        matches!(self, DialogState::Terminated)
    }
}
