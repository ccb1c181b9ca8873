//! LSP Protocol Implementation
//!
//! Publishes parse diagnostics and exposes layers as document symbols.

pub mod backend;
pub mod document;
pub mod handlers;
pub mod server;

pub use backend::Backend;
