//! `ada_rt`: the runtime ABI that code generated by `adac` links against.
//!
//! Every `#[unsafe(no_mangle)] extern "C"` function here corresponds to one
//! `declare` line in `codegen::runtime` — see that module for the
//! authoritative symbol table. This crate builds as both a `staticlib`
//! (for linking into compiled Ada programs) and an `rlib` (so the compiler
//! crate's `build.rs` can pin a matching version and its tests can call
//! straight into the runtime without going through clang at all).

pub mod checks;
pub mod exceptions;
pub mod finalize;
pub mod image;
pub mod sec_stack;
pub mod tasking;
pub mod text_io;

pub use exceptions::{CONSTRAINT_ERROR, NUMERIC_ERROR, PROGRAM_ERROR, STORAGE_ERROR, TASKING_ERROR};
