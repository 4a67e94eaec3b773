//! # System Interaction Layer
//!
//! Boundary between the engine and the terminal.
//!
//! - **`input`**: hidden password prompts and external-editor sessions used to
//!   read flag values interactively.

pub mod input;
