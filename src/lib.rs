//! typelib — loader and structural validator for binary module-API descriptors.
//!
//! A typelib is a single immutable binary file describing the public API of
//! one module: its functions, callbacks, constants, structures, unions,
//! enumerations, flags, interfaces and classes, with full type signatures.
//! This crate provides:
//! - **Format constants** (`format`): magic, versioning, blob sizes, the
//!   blob-type and type-tag spaces.
//! - **Loading** (`Typelib::new`): take ownership of a byte buffer and run the
//!   fast header check.
//! - **Validation** (`Typelib::validate`): the full defensive structural pass
//!   over the directory and every local blob; all offsets and counts are
//!   treated as untrusted.
//! - **Lookup** (`entry`, `entry_by_name`, `entry_by_gtype_name`,
//!   `entry_by_error_domain`, `matches_gtype_name_prefix`): queries over the
//!   directory, with optional perfect-hash acceleration.
//! - **Symbol resolution** (`Typelib::symbol`): lazy, once-only binding of the
//!   shared libraries named in the header.
//!
//! Validation is a pure read over the buffer, so distinct typelibs validate
//! concurrently and a validated typelib is freely shared across threads.

pub mod blobs;
pub mod format;
pub mod header;
pub mod quark;
pub mod window;

mod bind;
mod error;
mod typelib;
mod validate;

pub use error::{Result, TypelibError};
pub use format::{BlobType, SectionId, TypeTag};
pub use header::Header;
pub use quark::Quark;
pub use typelib::{DirectoryIndexOracle, Entry, Typelib, TypelibOptions};
