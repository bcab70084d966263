//! Receipt Layer
//!
//! Tamper-evident record of council decisions:
//! - Content-addressed, immutable receipts
//! - Optional hash chaining across the whole history
//! - Append-only stores (JSON file, in-memory)

pub mod chain;
pub mod hash;
pub mod record;
pub mod store;

pub use chain::{verify_chain, ChainVerification, HashMode, LinkFault};
pub use record::{Proposal, Receipt, Vote};
pub use store::{JsonFileStore, MemoryStore, ReceiptStore};
