//! Binary record codec for docrec
//!
//! Provides `BinarySerializer`, a `Serializer` whose buffers carry a field
//! slot table so that lazy loading can decode single fields and list field
//! names without reading values.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod binary;

pub use binary::{BinarySerializer, FLAG_DELTA, FORMAT_VERSION};
