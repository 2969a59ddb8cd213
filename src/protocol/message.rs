//! The ten protocol message kinds (§4.2).
//!
//! Every message is a JSON object carrying at minimum `{"type": ...,
//! "message": ...}` — `type` drives deserialization (via serde's internally
//! tagged representation) and `message` carries the numeric kind code from
//! the original protocol, preserved here purely for wire-compatibility with
//! the textual format described in §4.2.

use crate::blockchain::{Block, BlockHeader, Transaction};
use serde::{Deserialize, Serialize};

/// Numeric kind codes, in the order §4.2 lists them.
pub mod kind {
    pub const INV: i32 = 0;
    pub const REQUEST_TRANS: i32 = 1;
    pub const GET_HEADERS: i32 = 2;
    pub const HEADERS: i32 = 3;
    pub const GET_DATA: i32 = 4;
    pub const BLOCK: i32 = 5;
    pub const NO_MESSAGE: i32 = 6;
    pub const REPLY_TRANS: i32 = 7;
    pub const MSG_TRANS: i32 = 8;
    pub const RESULT_TRANS: i32 = 9;
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum NetworkMessage {
    #[serde(rename = "INV")]
    Inv { message: i32, hashes: Vec<String> },

    #[serde(rename = "REQUEST_TRANS")]
    RequestTrans {
        message: i32,
        transaction: Transaction,
    },

    #[serde(rename = "GET_HEADERS")]
    GetHeaders { message: i32, hashes: Vec<String> },

    #[serde(rename = "HEADERS")]
    Headers {
        message: i32,
        headers: Vec<BlockHeader>,
    },

    #[serde(rename = "GET_DATA")]
    GetData { message: i32, hashes: Vec<String> },

    #[serde(rename = "BLOCK")]
    Block { message: i32, block: Block },

    #[serde(rename = "NO_MESSAGE")]
    NoMessage { message: i32 },

    #[serde(rename = "REPLY_TRANS")]
    ReplyTrans {
        message: i32,
        node_id: u64,
        trans_id: u64,
        /// Id of the endorser that executed the transaction.
        execution: u64,
    },

    #[serde(rename = "MSG_TRANS")]
    MsgTrans {
        message: i32,
        transaction: Transaction,
    },

    #[serde(rename = "RESULT_TRANS")]
    ResultTrans {
        message: i32,
        node_id: u64,
        trans_id: u64,
    },
}

impl NetworkMessage {
    pub fn inv(hashes: Vec<String>) -> Self {
        NetworkMessage::Inv {
            message: kind::INV,
            hashes,
        }
    }

    pub fn request_trans(transaction: Transaction) -> Self {
        NetworkMessage::RequestTrans {
            message: kind::REQUEST_TRANS,
            transaction,
        }
    }

    pub fn get_headers(hashes: Vec<String>) -> Self {
        NetworkMessage::GetHeaders {
            message: kind::GET_HEADERS,
            hashes,
        }
    }

    pub fn headers(headers: Vec<BlockHeader>) -> Self {
        NetworkMessage::Headers {
            message: kind::HEADERS,
            headers,
        }
    }

    pub fn get_data(hashes: Vec<String>) -> Self {
        NetworkMessage::GetData {
            message: kind::GET_DATA,
            hashes,
        }
    }

    pub fn block(block: Block) -> Self {
        NetworkMessage::Block {
            message: kind::BLOCK,
            block,
        }
    }

    pub fn no_message() -> Self {
        NetworkMessage::NoMessage {
            message: kind::NO_MESSAGE,
        }
    }

    pub fn reply_trans(node_id: u64, trans_id: u64, execution: u64) -> Self {
        NetworkMessage::ReplyTrans {
            message: kind::REPLY_TRANS,
            node_id,
            trans_id,
            execution,
        }
    }

    pub fn msg_trans(transaction: Transaction) -> Self {
        NetworkMessage::MsgTrans {
            message: kind::MSG_TRANS,
            transaction,
        }
    }

    pub fn result_trans(node_id: u64, trans_id: u64) -> Self {
        NetworkMessage::ResultTrans {
            message: kind::RESULT_TRANS,
            node_id,
            trans_id,
        }
    }

    /// Whether this message kind carries a `Block` body large enough to be
    /// subject to the bandwidth model of §4.3, rather than being delivered
    /// as an immediate, delay-free control message.
    pub fn is_block_payload(&self) -> bool {
        matches!(self, NetworkMessage::Block { .. })
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            NetworkMessage::Inv { .. } => "INV",
            NetworkMessage::RequestTrans { .. } => "REQUEST_TRANS",
            NetworkMessage::GetHeaders { .. } => "GET_HEADERS",
            NetworkMessage::Headers { .. } => "HEADERS",
            NetworkMessage::GetData { .. } => "GET_DATA",
            NetworkMessage::Block { .. } => "BLOCK",
            NetworkMessage::NoMessage { .. } => "NO_MESSAGE",
            NetworkMessage::ReplyTrans { .. } => "REPLY_TRANS",
            NetworkMessage::MsgTrans { .. } => "MSG_TRANS",
            NetworkMessage::ResultTrans { .. } => "RESULT_TRANS",
        }
    }
}
