//! Shared utilities.
//!
//! Hashing and test helpers.

pub mod hash;

#[cfg(test)]
pub mod testutil;
