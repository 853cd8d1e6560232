//! Fetch-once cache of remote financial orders.
//!
//! Orders are fetched from a remote endpoint only while the local store is
//! empty, written in a single transaction, and served from the store after.

pub mod codec;
pub mod config;
pub mod domain;
pub mod remote;
pub mod storage;
pub mod sync;

#[cfg(test)]
mod test_support;
