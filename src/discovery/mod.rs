//! Controller discovery
//!
//! Discovery turns a glob pattern into an ordered list of paths
//! ([`pattern::resolve`]) and each path into a catalog entry
//! ([`ControllerCatalog::resolve`]). Instantiation is done by the broker,
//! which owns the context handed to every factory.

mod catalog;
pub mod pattern;

pub use catalog::{logical_name, ControllerCatalog, ControllerFactory};
pub use pattern::{expand_braces, resolve, unescape};
