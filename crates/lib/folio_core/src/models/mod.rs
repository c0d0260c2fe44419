//! Domain models shared by the session layer, the book service and the stores.

pub mod auth;
pub mod book;
