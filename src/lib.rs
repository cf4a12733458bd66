//! # disir
//!
//! A versioned, schema-validated configuration library built around a
//! small object graph: **molds** describe a configuration's shape and
//! evolution (what keys exist, their types, their defaults and
//! restrictions, and at which version each was introduced); **configs**
//! are instances of a mold, holding actual values and their own version.
//!
//! ## Quick start
//!
//! ```rust
//! use disir::context::{Context, ContextKind};
//! use disir::value::ValueType;
//! use disir::version::Version;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Describe the shape: a MOLD with one integer keyval.
//! let mold = Context::begin(None, ContextKind::Mold)?;
//! let port = Context::begin(Some(&mold), ContextKind::Keyval)?;
//! port.set_name(b"port")?;
//! port.set_value_type(ValueType::Integer)?;
//! port.add_default(Version::new(1, 0), disir::value::Value::Integer(8080))?;
//! mold.attach_child("port", &port)?;
//! mold.finalize()?;
//!
//! // Instantiate it: a CONFIG bound to that MOLD.
//! let config = disir::config::begin_config(&mold)?;
//! let config_port = Context::begin(Some(&config), ContextKind::Keyval)?;
//! config_port.set_name(b"port")?;
//! config.attach_child("port", &config_port)?;
//! config_port.set_value_int(9090)?;
//! config.finalize()?;
//!
//! assert_eq!(config_port.value()?.unwrap().get_int()?, 9090);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`context`]: the single polymorphic node type ([`context::Context`])
//!   every other module builds on
//! - [`mold`], [`config`]: root-level operations for each kind of tree
//! - [`documentation`], [`default`], [`restriction`]: versioned metadata
//!   attached to nodes
//! - [`query`]: dotted-path resolution across a tree
//! - [`validator`]: the recursive invariant checker behind `finalize`
//! - [`update`]: migrates a Config to a newer Mold, pausing on conflicts
//! - [`archive`]: export/import bundles of configs
//! - [`plugin`], [`instance`]: pluggable storage backends and the
//!   top-level application handle
//! - [`serialize`]: the TOML reference adapter
//! - [`error`]: the closed error taxonomy shared by every operation

pub mod archive;
pub mod collection;
pub mod config;
pub mod context;
pub mod default;
pub mod documentation;
pub mod element_storage;
pub mod error;
pub mod instance;
pub mod keyval;
pub mod logging;
pub mod mold;
pub mod plugin;
pub mod query;
pub mod restriction;
pub mod serialize;
pub mod update;
pub mod validator;
pub mod value;
pub mod version;

mod atomic;

pub use context::{Context, ContextKind};
pub use error::{DisirError, DisirResult};
pub use version::Version;
