//! # Input
//!
//! The reader contract the engine consumes: a copyable cursor over code units
//! with `peek`, `bump`, `position` and `is_eof`, plus sub-range views.
//!
//! Encodings are not modelled here beyond the [`CodeUnit`] trait. A UTF-8
//! string is read as `u8` units, UTF-16 as `u16`, and pre-decoded text as
//! `char` or `u32`.

mod reader;
mod span;
mod unit;

pub use reader::Reader;
pub use span::Span;
pub use unit::{CodeUnit, units_to_string};
