//! Quicksilver objects: the object and value model of an embeddable JavaScript runtime
//!
//! This crate implements the ECMAScript object model: values and their
//! coercions, property descriptors, ordinary objects, the Array exotic object
//! with its dense fast path, proxies, and host-backed dynamic objects. Array,
//! Object, Reflect and Proxy builtins run on top of it.
//!
//! # Quick Start
//!
//! ```no_run
//! use quicksilver_objects::{Runtime, Value};
//!
//! fn main() -> quicksilver_objects::Result<()> {
//!     let runtime = Runtime::new();
//!     let array = runtime.new_array_from_values(vec![Value::from(3), Value::from(1), Value::from(2)]);
//!     let sort = runtime.array_prototype().get("sort")?;
//!     if let Some(sort) = sort.as_object() {
//!         sort.call(&Value::from(&array), &[])?;
//!     }
//!     println!("{:?}", array.export()?);
//!     Ok(())
//! }
//! ```
//!
//! # Module Overview
//!
//! | Category | Modules |
//! |----------|---------|
//! | **Values** | [`Value`], [`Symbol`], [`PropertyKey`], [`PropertyDescriptor`] |
//! | **Objects** | [`Object`], [`ObjectImpl`], [`BaseObject`], [`ArrayObject`], [`FunctionObject`] |
//! | **Exotics** | [`ProxyObject`], [`DynamicObjectAdapter`], [`DynamicArrayAdapter`] |
//! | **Embedding** | [`Runtime`], [`config`], [`Exported`], [`error`](Error) |
// Clippy configuration for the object model.
//
// These suppressions exist because:
// - type_complexity: proxy traps return nested Result<Option<Option<T>>> types
// - too_many_arguments: builtin helpers pass the runtime plus call context
// - new_without_default: some backings need a prototype to be constructed
#![allow(clippy::type_complexity)]
#![allow(clippy::too_many_arguments)]
#![allow(clippy::new_without_default)]

pub mod config;
pub mod runtime;

mod error;

pub use config::RuntimeConfig;
pub use error::{messages, Error, ErrorKind, Result};
pub use runtime::{
    class, well_known, ArrayObject, Attributes, BaseObject, DynamicArray, DynamicArrayAdapter,
    DynamicObject, DynamicObjectAdapter, ExportContext, Exported, FunctionObject, JsString, Object,
    ObjectImpl, OwnProperty, PreferredType, Property, PropertyDescriptor, PropertyKey, ProxyHandler,
    ProxyObject, ProxyTrapConfig, Runtime, Symbol, Value, MAX_SAFE_INTEGER,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
