//! Bridge Common - Shared utilities for the immich-bridge service
//!
//! This crate provides functionality shared between the service and the
//! clients that call it:
//!
//! - **Initialization**: [`init_tracing`] for standardized log setup
//! - **Envelope**: the `{success, data | error}` shape every action returns
//!
//! # Example
//!
//! ```rust,ignore
//! use bridge_common::{init_tracing, Envelope};
//!
//! init_tracing("immich_bridge")?;
//!
//! let reply: Envelope<Vec<String>> = Envelope::ok(vec!["a1".into()]);
//! assert!(reply.success);
//! ```

pub mod envelope;
pub mod init;

// Re-export commonly used items at crate root
pub use envelope::{Envelope, EnvelopeError};
pub use init::{init_tracing, init_tracing_with, LogFormat};
