//! Immich image-search bridge
//!
//! Lets an editor search a self-hosted Immich photo library and import a
//! chosen image into local media, getting back ready-to-insert markup.
//!
//! - [`settings`]: Immich server URL and API key
//! - [`immich`]: search, metadata, download and thumbnail calls
//! - [`import`]: asset id to stored file plus markup
//! - [`web`]: the HTTP service (`search_images`, `get_image`, admin pages)
//! - [`widget`]: the search box state machine shared by the CLI picker

pub mod client;
pub mod config;
pub mod error;
pub mod immich;
pub mod import;
pub mod media;
pub mod nonce;
pub mod settings;
pub mod web;
pub mod widget;

pub use config::BridgeConfig;
pub use error::{BridgeError, BridgeResult};
