//! # quillrpc-gen
//!
//! Code generator for quillrpc services: feeds a parsed package model
//! through the emitter and renders the `<package>_quillrpc.rs` file with the
//! dispatch glue and SMD schema for every discovered service.

pub mod emit;
pub mod writer;

pub use emit::{generate, output_file_name, EmitOptions};
pub use writer::CodeWriter;
