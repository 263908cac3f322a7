//! virtgather-core: collector contract, registry and dispatch engine
//!
//! Defines the [`Collector`] trait every platform module implements, the
//! static module [`Registry`], and the [`Gatherer`] that drives each
//! configured target through its module and merges the results.

pub mod collector;
pub mod error;
pub mod gatherer;
pub mod input;
pub mod output;
pub mod registry;

pub use collector::{Collector, ParamDefault, ParamSpec, validate_parameters};
pub use error::{ConfigError, InputError, OutputError};
pub use gatherer::Gatherer;
pub use input::load_targets;
pub use output::{write_json, write_output};
pub use registry::Registry;
