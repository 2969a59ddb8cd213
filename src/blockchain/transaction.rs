//! Transaction values exchanged during the endorsement/ordering pipeline.

use serde::{Deserialize, Serialize};

/// Default transaction payload size used when a client doesn't override it.
pub const DEFAULT_TRANSACTION_SIZE_BYTES: u32 = 100;

/// `execution == 0` means "not yet executed by any endorser".
pub const NO_EXECUTOR: u64 = 0;

/// A transaction originated by a client node.
///
/// Identity is `(node_id, trans_id)` — see [`Transaction::id`]. Once
/// `validated` becomes `true` it never reverts; callers must not construct
/// a `Transaction` by hand and then flip `validated` back to `false`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Transaction {
    pub node_id: u64,
    pub trans_id: u64,
    #[serde(default = "default_size")]
    pub size_bytes: u32,
    pub timestamp: f64,
    #[serde(default)]
    pub validated: bool,
    /// Id of the endorser that executed this transaction, or [`NO_EXECUTOR`].
    #[serde(default)]
    pub execution: u64,
}

fn default_size() -> u32 {
    DEFAULT_TRANSACTION_SIZE_BYTES
}

impl Default for Transaction {
    fn default() -> Self {
        Transaction {
            node_id: 0,
            trans_id: 0,
            size_bytes: DEFAULT_TRANSACTION_SIZE_BYTES,
            timestamp: 0.0,
            validated: false,
            execution: NO_EXECUTOR,
        }
    }
}

impl Transaction {
    pub fn new(node_id: u64, trans_id: u64, timestamp: f64) -> Self {
        Transaction {
            node_id,
            trans_id,
            timestamp,
            ..Default::default()
        }
    }

    /// `(node_id, trans_id)` identity, used as the key in every
    /// per-transaction tracking set (`transactions`, `reply_transactions`,
    /// `msg_transactions`, `result_transactions`, `waiting_endorsers`).
    pub fn id(&self) -> TransactionId {
        (self.node_id, self.trans_id)
    }

    pub fn mark_validated(&mut self) {
        self.validated = true;
    }
}

pub type TransactionId = (u64, u64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_is_node_and_trans_id() {
        let tx = Transaction::new(3, 7, 12.5);
        assert_eq!(tx.id(), (3, 7));
    }

    #[test]
    fn default_fields_are_fully_initialized() {
        let tx = Transaction::default();
        assert_eq!(tx.size_bytes, DEFAULT_TRANSACTION_SIZE_BYTES);
        assert!(!tx.validated);
        assert_eq!(tx.execution, NO_EXECUTOR);
    }

    #[test]
    fn validated_never_reverts_once_set() {
        let mut tx = Transaction::new(1, 1, 0.0);
        tx.mark_validated();
        assert!(tx.validated);
        // Nothing in the public API can flip it back; re-asserting the
        // invariant documents that deliberately.
        assert!(tx.validated);
    }
}
