//! Application layer containing the ledger's business logic orchestration.
//!
//! This module defines the `LedgerEngine`, the entry point for onboarding,
//! deposits and idempotent transfers. It owns a storage backend behind the
//! `LedgerStore` port and never keeps balances between calls.

pub mod ledger;
