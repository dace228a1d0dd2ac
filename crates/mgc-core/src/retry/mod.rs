//! Retry rounds.
//!
//! A failed clone is never retried inside its own round. Instead the manager
//! runs up to `max_rounds` rounds; after each one the filesystem oracle decides
//! which repositories still need a clone, and `RoundPolicy` decides whether
//! (and after how long) another round starts.

mod oracle;
mod policy;

pub use oracle::still_failed;
pub use policy::{RetryDecision, RoundPolicy};
