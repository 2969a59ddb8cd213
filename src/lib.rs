//! Discrete-event simulator for blockchain network protocols: a
//! PoW/gossip mode modeled on Bitcoin-style propagation and a
//! Hyperledger-style endorse/order/validate pipeline, sharing one
//! virtual-time event queue and bandwidth model.

pub mod blockchain;
pub mod config;
pub mod error;
pub mod network;
pub mod node;
pub mod protocol;
pub mod sim;
pub mod stats;
