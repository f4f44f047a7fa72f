//! # Cache
//!
//! Process-lifetime cache of Key Vault identities.
//!
//! - `named_lock`: per-name async locks
//! - `resolver`: management identifier <-> data-plane base URI resolution

pub mod named_lock;
pub mod resolver;

pub use named_lock::NamedLocks;
pub use resolver::{CacheEntry, IdentityResolver};
