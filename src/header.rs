//! Typelib header: fixed 112-byte layout at offset 0.
//!
//! Parsing performs the fast structural checks that gate everything else:
//! magic, version, entry counts, declared size, the fixed blob-size table,
//! and table alignment. Full validation of the directory and blobs is a
//! separate pass (see `validate`).

use crate::error::{Result, TypelibError};
use crate::format::{self, MAJOR_VERSION, TYPELIB_MAGIC};
use crate::window::{is_aligned, Window};

/// Decoded typelib header.
///
/// String-valued fields (`namespace`, `nsversion`, ...) are offsets into the
/// string pool; resolve them through the owning typelib.
#[derive(Debug, Clone)]
pub struct Header {
    pub major_version: u8,
    pub minor_version: u8,
    /// Total number of directory entries.
    pub n_entries: u16,
    /// Number of leading entries defined in this typelib.
    pub n_local_entries: u16,
    /// Byte offset of the directory.
    pub directory: u32,
    pub n_attributes: u32,
    /// Byte offset of the attribute table.
    pub attributes: u32,
    /// Byte offset of the dependency list string, or 0.
    pub dependencies: u32,
    /// Declared total size; must equal the buffer length.
    pub size: u32,
    /// String-pool offset of the namespace name.
    pub namespace: u32,
    /// String-pool offset of the namespace version string.
    pub nsversion: u32,
    /// String-pool offset of the comma-separated shared-library list, or 0.
    pub shared_library: u32,
    /// String-pool offset of the comma-separated C symbol prefix list, or 0.
    pub c_prefix: u32,
    /// Byte offset of the section table, or 0.
    pub sections: u32,
}

/// The per-blob size fields and the fixed sizes they must equal, in header
/// order starting at byte 60.
const BLOB_SIZE_TABLE: [(&str, u16); 18] = [
    ("entry", format::ENTRY_BLOB_SIZE),
    ("function", format::FUNCTION_BLOB_SIZE),
    ("callback", format::CALLBACK_BLOB_SIZE),
    ("signal", format::SIGNAL_BLOB_SIZE),
    ("vfunc", format::VFUNC_BLOB_SIZE),
    ("arg", format::ARG_BLOB_SIZE),
    ("property", format::PROPERTY_BLOB_SIZE),
    ("field", format::FIELD_BLOB_SIZE),
    ("value", format::VALUE_BLOB_SIZE),
    ("attribute", format::ATTRIBUTE_BLOB_SIZE),
    ("constant", format::CONSTANT_BLOB_SIZE),
    ("error domain", format::ERROR_DOMAIN_BLOB_SIZE),
    ("signature", format::SIGNATURE_BLOB_SIZE),
    ("enum", format::ENUM_BLOB_SIZE),
    ("struct", format::STRUCT_BLOB_SIZE),
    ("object", format::OBJECT_BLOB_SIZE),
    ("interface", format::INTERFACE_BLOB_SIZE),
    ("union", format::UNION_BLOB_SIZE),
];

impl Header {
    /// Decode and check the header of `window`.
    ///
    /// Fails fast with `InvalidHeader` on any structural disagreement; the
    /// namespace name is also validated here so that later error messages can
    /// rely on it.
    pub fn parse(window: &Window<'_>) -> Result<Header> {
        if window.len() < format::HEADER_SIZE {
            return Err(TypelibError::InvalidHeader(format!(
                "The buffer is only {} bytes; a typelib header needs {}",
                window.len(),
                format::HEADER_SIZE
            )));
        }

        let magic = window.bytes_at(0, 16)?;
        if magic != TYPELIB_MAGIC {
            return Err(TypelibError::InvalidHeader(
                "Invalid magic header".to_string(),
            ));
        }

        let major_version = window.read_u8(16)?;
        let minor_version = window.read_u8(17)?;
        if major_version != MAJOR_VERSION {
            return Err(TypelibError::InvalidHeader(format!(
                "Typelib version mismatch; expected {}, found {}",
                MAJOR_VERSION, major_version
            )));
        }

        let n_entries = window.read_u16(20)?;
        let n_local_entries = window.read_u16(22)?;
        if n_entries < n_local_entries {
            return Err(TypelibError::InvalidHeader(format!(
                "Inconsistent entry counts: {} local entries but only {} total",
                n_local_entries, n_entries
            )));
        }

        let size = window.read_u32(40)?;
        if size as usize != window.len() {
            return Err(TypelibError::InvalidHeader(format!(
                "Typelib size {} does not match the buffer length {}",
                size,
                window.len()
            )));
        }

        for (i, (what, expected)) in BLOB_SIZE_TABLE.iter().enumerate() {
            let got = window.read_u16(60 + i * 2)?;
            if got != *expected {
                return Err(TypelibError::InvalidHeader(format!(
                    "Blob size mismatch: {} blob size is {}, expected {}",
                    what, got, expected
                )));
            }
        }

        let directory = window.read_u32(24)?;
        let n_attributes = window.read_u32(28)?;
        let attributes = window.read_u32(32)?;
        if !is_aligned(directory as usize) {
            return Err(TypelibError::InvalidHeader(
                "Misaligned directory".to_string(),
            ));
        }
        if !is_aligned(attributes as usize) {
            return Err(TypelibError::InvalidHeader(
                "Misaligned attribute table".to_string(),
            ));
        }
        if n_attributes > 0 && attributes == 0 {
            return Err(TypelibError::InvalidHeader(format!(
                "{} attributes declared but no attribute table",
                n_attributes
            )));
        }

        let header = Header {
            major_version,
            minor_version,
            n_entries,
            n_local_entries,
            directory,
            n_attributes,
            attributes,
            dependencies: window.read_u32(36)?,
            size,
            namespace: window.read_u32(44)?,
            nsversion: window.read_u32(48)?,
            shared_library: window.read_u32(52)?,
            c_prefix: window.read_u32(56)?,
            sections: window.read_u32(96)?,
        };

        window.validate_name("namespace", header.namespace as usize)?;
        Ok(header)
    }
}
