//! Domain model and the storage contract the ledger depends on.

pub mod ports;
pub mod transfer;
pub mod wallet;
