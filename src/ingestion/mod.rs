//! File decoding: uploaded bytes + declared format -> [`crate::types::ParsedFile`].
//!
//! Most callers should use [`parse`] (from [`unified`]), which dispatches on the declared
//! [`FileFormat`] (never on the file name or content) and rejects files without data rows.
//!
//! Format-specific decoders are also available under:
//! - [`csv`]
//! - [`json`]
//! - [`html`]
//! - [`parquet`]
//! - `excel` (Cargo feature `excel`, on by default)
//!
//! Every decoder takes header keys verbatim from the first structural row of the source and
//! surfaces every cell as text; no decoder infers types.

pub mod csv;
#[cfg(feature = "excel")]
pub mod excel;
pub mod html;
pub mod json;
pub mod parquet;
pub mod unified;

pub use unified::{parse, parse_declared, FileFormat};
