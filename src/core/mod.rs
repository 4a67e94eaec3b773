// src/core/mod.rs

//! # Resolution Engine
//!
//! - **`value`**, **`coerce`**, **`timefmt`**: typed values and the text that
//!   produces them.
//! - **`tree`**, **`xref`**: the command arena and its per-command lookup maps.
//! - **`session`**, **`matcher`**, **`parse_loop`**: one pass over the argument
//!   vector.
//! - **`dispatcher`**, **`engine`**: action invocation and the public entry point.
//! - **`store`**, **`config_loader`**, **`errors`**: shared plumbing.

pub mod coerce;
pub mod config_loader;
pub mod dispatcher;
pub mod engine;
pub mod errors;
pub mod matcher;
pub mod parse_loop;
pub mod session;
pub mod store;
pub mod timefmt;
pub mod tree;
pub mod value;
pub mod xref;
