//! RailSL code generator: translates a RailBlocks node forest into railway
//! control text.
//!
//! The generator is the read-only half of the core: it never mutates the
//! forest, never fails, and emits the same text for the same forest every
//! time. Structural problems are the analyses' business; here they only
//! degrade the output.

pub mod generator;

pub use generator::compile;
