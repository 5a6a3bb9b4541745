use std::fmt;

use sip_core::types::Method;

/// A transaction's identity for matching purposes (RFC 3261 §17.2.3):
/// the top Via branch plus the request method, plus a flag for which
/// side of the transaction this key names (client vs server transaction
/// tables are matched independently, and a UAS's ACK lookup needs to
/// find the *server* transaction, never a client one).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TransactionKey {
    pub branch: String,
    pub method: Method,
    pub is_server: bool,
}

impl TransactionKey {
    pub fn new(branch: impl Into<String>, method: Method, is_server: bool) -> Self {
        TransactionKey { branch: branch.into(), method, is_server }
    }

    /// The key a CANCEL or non-2xx ACK for this INVITE transaction
    /// matches against: same branch, same server/client side, but
    /// `Method::Invite` rather than the incoming request's own method
    /// (RFC 3261 §17.2.3 matches CANCEL/ACK-for-non-2xx against the
    /// *original* INVITE transaction by branch, not by their own
    /// method).
    pub fn invite_sibling(&self) -> TransactionKey {
        TransactionKey { branch: self.branch.clone(), method: Method::Invite, is_server: self.is_server }
    }
}

impl fmt::Display for TransactionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.branch, self.method, if self.is_server { "server" } else { "client" })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invite_sibling_keeps_branch_and_side_but_forces_invite_method() {
        let key = TransactionKey::new("z9hG4bK123", Method::Cancel, true);
        let sibling = key.invite_sibling();
        assert_eq!(sibling.branch, "z9hG4bK123");
        assert_eq!(sibling.method, Method::Invite);
        assert!(sibling.is_server);
    }
}
