//! # folio_core
//!
//! Core domain logic for Folio: password hashing, signed session tokens,
//! the session lifecycle, book ownership and the storage contracts behind them.

pub mod auth;
pub mod books;
pub mod config;
pub mod ids;
pub mod migrate;
pub mod models;
pub mod store;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_not_empty() {
        assert!(!version().is_empty());
    }
}
