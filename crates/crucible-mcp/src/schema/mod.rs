//! Tool Schema & Argument Binding
//!
//! Declarative registration for tools: a [`ParamSpec`] list drives JSON
//! Schema emission (preserving exact source casing, excluding defaulted
//! parameters from `required`), and the [`binder`] resolves and coerces
//! incoming argument objects against the same specs before a handler runs.

pub mod binder;
pub mod builder;

pub use binder::{bind_arguments, BoundArguments};
pub use builder::{ParamSpec, ParamType, ToolBuilder};
