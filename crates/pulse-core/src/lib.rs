//! Core types and trait definitions for the Pulse embedded admin app.
//!
//! This crate is free of HTTP and database dependencies. It owns the
//! identity model, the session model, the storage and shop-info traits the
//! outer crates implement, and the precedence rules that merge them.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod error;
pub mod identity;
pub mod refine;
pub mod resolve;
pub mod session;
pub mod shop;
pub mod store;

pub use error::{Error, Result};
pub use identity::UserIdentity;
