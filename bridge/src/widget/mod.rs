//! Front-end search controller
//!
//! [`controller`] is the state machine behind every search box (debounce,
//! results, selection, import). [`driver`] runs it on tokio against a
//! [`BridgeApi`] and an [`EditorHost`]; the browser build of the same
//! behavior lives in `static/widget.js`. [`markup`] renders the public
//! widget and expands content markers.

pub mod controller;
pub mod driver;
pub mod markup;

pub use controller::{ControllerOptions, Effect, Event, Phase, SearchController, View};
pub use driver::{BridgeApi, ControllerDriver, EditorHost};
pub use markup::{expand_placeholders, widget_fragment, WidgetContext};
