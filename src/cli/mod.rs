// src/cli/mod.rs

//! # Presentation Layer
//!
//! Everything the built-ins print: the help screen, the command tree, the
//! debug dump, and the registration of the built-in flags and commands.

pub mod builtins;
pub mod debug_view;
pub mod help;
pub mod tree_view;
