//! Typelib binary format constants.
//!
//! Defines the magic, version, fixed blob sizes, blob-type and type-tag spaces,
//! and section ids for the typelib format. All multi-byte fields are
//! little-endian; blob start offsets are aligned to 4 bytes.

use num_enum::TryFromPrimitive;

/// Magic bytes at the start of every typelib: "GOBJ\nMETADATA\r\n\x1a".
pub const TYPELIB_MAGIC: [u8; 16] = *b"GOBJ\nMETADATA\r\n\x1a";

/// Major format version understood by this crate. Readers reject anything else.
pub const MAJOR_VERSION: u8 = 4;

/// Minor format version written by current producers.
pub const MINOR_VERSION: u8 = 0;

/// Size of the fixed header at offset 0.
pub const HEADER_SIZE: usize = 112;

/// Longest permitted name, including the terminating NUL.
pub const MAX_NAME_LEN: usize = 2048;

/// Size of one directory entry.
pub const ENTRY_BLOB_SIZE: u16 = 12;
/// Fixed size of a function blob (its signature lives elsewhere).
pub const FUNCTION_BLOB_SIZE: u16 = 20;
/// Fixed size of a callback blob.
pub const CALLBACK_BLOB_SIZE: u16 = 12;
/// Fixed size of a signal blob.
pub const SIGNAL_BLOB_SIZE: u16 = 16;
/// Fixed size of a virtual-function blob.
pub const VFUNC_BLOB_SIZE: u16 = 20;
/// Fixed size of one argument blob inside a signature.
pub const ARG_BLOB_SIZE: u16 = 16;
/// Fixed size of a property blob.
pub const PROPERTY_BLOB_SIZE: u16 = 16;
/// Fixed size of a field blob (an embedded callback may follow it).
pub const FIELD_BLOB_SIZE: u16 = 16;
/// Fixed size of an enumeration value blob.
pub const VALUE_BLOB_SIZE: u16 = 12;
/// Fixed size of an attribute blob.
pub const ATTRIBUTE_BLOB_SIZE: u16 = 12;
/// Fixed size of a constant blob (its payload lives elsewhere).
pub const CONSTANT_BLOB_SIZE: u16 = 24;
/// Fixed size of the reserved error-domain blob. Kept in the header for
/// compatibility; no such blob is emitted by version 4 producers.
pub const ERROR_DOMAIN_BLOB_SIZE: u16 = 16;
/// Fixed size of a signature blob header (arguments follow contiguously).
pub const SIGNATURE_BLOB_SIZE: u16 = 8;
/// Fixed size of an enum or flags blob header (values and methods follow).
pub const ENUM_BLOB_SIZE: u16 = 24;
/// Fixed size of a struct or boxed blob header (fields and methods follow).
pub const STRUCT_BLOB_SIZE: u16 = 32;
/// Fixed size of an object blob header (six tail arrays follow).
pub const OBJECT_BLOB_SIZE: u16 = 60;
/// Fixed size of an interface blob header (five tail arrays follow).
pub const INTERFACE_BLOB_SIZE: u16 = 40;
/// Fixed size of a union blob header.
pub const UNION_BLOB_SIZE: u16 = 40;
/// Size of the common prefix shared by all top-level blobs.
pub const COMMON_BLOB_SIZE: u16 = 8;
/// Size of an inline simple-type blob.
pub const SIMPLE_TYPE_BLOB_SIZE: u16 = 4;
/// Fixed size of an array type blob.
pub const ARRAY_TYPE_BLOB_SIZE: u16 = 8;
/// Fixed size of an interface-reference type blob.
pub const INTERFACE_TYPE_BLOB_SIZE: u16 = 4;
/// Fixed size of a parameterized (list/hash) type blob header.
pub const PARAM_TYPE_BLOB_SIZE: u16 = 4;
/// Fixed size of an error type blob.
pub const ERROR_TYPE_BLOB_SIZE: u16 = 4;

/// Tag space for top-level blobs, as recorded in directory entries and in the
/// common blob prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive)]
#[repr(u16)]
pub enum BlobType {
    /// Reserved; also the tag carried by non-local directory entries.
    Invalid = 0,
    Function = 1,
    Callback = 2,
    Struct = 3,
    /// Boxed types share the struct blob layout.
    Boxed = 4,
    Enum = 5,
    /// Flags share the enum blob layout.
    Flags = 6,
    Object = 7,
    Interface = 8,
    Constant = 9,
    /// Formerly the error-domain blob; no longer emitted.
    Invalid0 = 10,
    Union = 11,
}

/// Highest valid blob-type tag.
pub const BLOB_TYPE_MAX: u16 = BlobType::Union as u16;

impl BlobType {
    /// Blob kinds that carry a type-registration name and initializer symbol.
    pub fn is_registered_type(self) -> bool {
        matches!(
            self,
            BlobType::Struct
                | BlobType::Boxed
                | BlobType::Enum
                | BlobType::Flags
                | BlobType::Object
                | BlobType::Interface
        )
    }

    /// Blob kinds that may contain methods, i.e. act as function containers.
    pub fn is_container(self) -> bool {
        matches!(
            self,
            BlobType::Struct
                | BlobType::Boxed
                | BlobType::Enum
                | BlobType::Flags
                | BlobType::Object
                | BlobType::Interface
                | BlobType::Union
        )
    }
}

/// Tag space for type expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive)]
#[repr(u8)]
pub enum TypeTag {
    Void = 0,
    Boolean = 1,
    Int8 = 2,
    UInt8 = 3,
    Int16 = 4,
    UInt16 = 5,
    Int32 = 6,
    UInt32 = 7,
    Int64 = 8,
    UInt64 = 9,
    Float = 10,
    Double = 11,
    GType = 12,
    Utf8 = 13,
    Filename = 14,
    Array = 15,
    Interface = 16,
    GList = 17,
    GSList = 18,
    GHash = 19,
    Error = 20,
    Unichar = 21,
}

impl TypeTag {
    /// Whether this tag may be encoded inline in a simple-type blob.
    pub fn is_basic(self) -> bool {
        (self as u8) < TypeTag::Array as u8 || self == TypeTag::Unichar
    }

    /// Fixed payload width for constants of this type, or `None` when the
    /// width is not checked (strings, gtype, and all complex types).
    pub fn constant_size(self) -> Option<u32> {
        match self {
            TypeTag::Boolean => Some(4),
            TypeTag::Int8 | TypeTag::UInt8 => Some(1),
            TypeTag::Int16 | TypeTag::UInt16 => Some(2),
            TypeTag::Int32 | TypeTag::UInt32 => Some(4),
            TypeTag::Int64 | TypeTag::UInt64 => Some(8),
            TypeTag::Float => Some(4),
            TypeTag::Double => Some(8),
            TypeTag::Unichar => Some(4),
            _ => None,
        }
    }
}

/// Section ids in the optional section table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[repr(u32)]
pub enum SectionId {
    /// Sentinel terminating the section list.
    End = 0,
    /// Precomputed perfect-hash index over local entry names.
    DirectoryIndex = 1,
}
