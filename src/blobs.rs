//! Decoded views of directory entries and blobs.
//!
//! Each `parse` checks that the blob's fixed prefix fits the buffer, then
//! decodes its fields. Decoding is layout-only; the semantic rules (tag
//! agreement, cross-reference ranges, tail walking) live in `validate`.

use crate::error::Result;
use crate::format;
use crate::window::Window;

/// One 12-byte directory entry.
///
/// Local entries point at a blob in this typelib; non-local entries carry the
/// string offset of the defining namespace's name instead.
#[derive(Debug, Clone, Copy)]
pub struct DirEntry {
    /// Raw blob-type tag. 0 for non-local references.
    pub blob_type: u16,
    pub local: bool,
    /// String-pool offset of the entry name.
    pub name: u32,
    /// Local: blob offset. Non-local: namespace-name string offset.
    pub offset: u32,
}

impl DirEntry {
    pub fn parse(window: &Window<'_>, offset: usize) -> Result<DirEntry> {
        window.check_room(offset, format::ENTRY_BLOB_SIZE as usize, "directory entry")?;
        Ok(DirEntry {
            blob_type: window.read_u16(offset)?,
            local: window.read_u16(offset + 2)? & 0x1 != 0,
            name: window.read_u32(offset + 4)?,
            offset: window.read_u32(offset + 8)?,
        })
    }
}

/// A 4-byte simple-type blob: either a basic type encoded inline or, when any
/// of the low 24 bits are set, a byte offset to a complex type blob.
#[derive(Debug, Clone, Copy)]
pub struct SimpleType(pub u32);

impl SimpleType {
    pub fn parse(window: &Window<'_>, offset: usize) -> Result<SimpleType> {
        window.check_room(offset, format::SIMPLE_TYPE_BLOB_SIZE as usize, "type blob")?;
        Ok(SimpleType(window.read_u32(offset)?))
    }

    /// Inline encoding applies when the reserved low bits are all zero.
    pub fn is_inline(self) -> bool {
        self.0 & 0x00ff_ffff == 0
    }

    pub fn pointer(self) -> bool {
        self.0 & (1 << 24) != 0
    }

    /// The 5-bit tag of an inline basic type.
    pub fn tag(self) -> u8 {
        (self.0 >> 27) as u8
    }

    /// The forward offset of a non-inline type.
    pub fn offset(self) -> u32 {
        self.0
    }
}

/// Common prefix of the complex type blobs: pointer bit and tag packed into
/// the first byte, whatever follows depends on the tag.
#[derive(Debug, Clone, Copy)]
pub struct ComplexTypePrefix {
    pub pointer: bool,
    pub tag: u8,
}

impl ComplexTypePrefix {
    pub fn parse(window: &Window<'_>, offset: usize) -> Result<ComplexTypePrefix> {
        window.check_room(offset, format::PARAM_TYPE_BLOB_SIZE as usize, "type blob")?;
        let b0 = window.read_u8(offset)?;
        Ok(ComplexTypePrefix {
            pointer: b0 & 0x1 != 0,
            tag: (b0 >> 3) & 0x1f,
        })
    }
}

/// An interface-reference type blob: a directory index in the upper half.
#[derive(Debug, Clone, Copy)]
pub struct InterfaceTypeBlob {
    pub interface: u16,
}

impl InterfaceTypeBlob {
    pub fn parse(window: &Window<'_>, offset: usize) -> Result<InterfaceTypeBlob> {
        window.check_room(
            offset,
            format::INTERFACE_TYPE_BLOB_SIZE as usize,
            "interface type blob",
        )?;
        Ok(InterfaceTypeBlob {
            interface: window.read_u16(offset + 2)?,
        })
    }
}

/// A parameterized type blob (list, slist, hash): parameter count in the
/// upper half, that many simple types follow.
#[derive(Debug, Clone, Copy)]
pub struct ParamTypeBlob {
    pub pointer: bool,
    pub n_types: u16,
}

impl ParamTypeBlob {
    pub fn parse(window: &Window<'_>, offset: usize) -> Result<ParamTypeBlob> {
        window.check_room(
            offset,
            format::PARAM_TYPE_BLOB_SIZE as usize,
            "parameter type blob",
        )?;
        let b0 = window.read_u8(offset)?;
        Ok(ParamTypeBlob {
            pointer: b0 & 0x1 != 0,
            n_types: window.read_u16(offset + 2)?,
        })
    }
}

/// A function blob. `flags` packs deprecated/setter/getter/constructor/
/// wraps-vfunc/throws bits and a 10-bit accessor index.
#[derive(Debug, Clone, Copy)]
pub struct FunctionBlob {
    pub blob_type: u16,
    flags: u16,
    pub name: u32,
    pub symbol: u32,
    pub signature: u32,
}

impl FunctionBlob {
    pub fn parse(window: &Window<'_>, offset: usize) -> Result<FunctionBlob> {
        window.check_room(offset, format::FUNCTION_BLOB_SIZE as usize, "function blob")?;
        Ok(FunctionBlob {
            blob_type: window.read_u16(offset)?,
            flags: window.read_u16(offset + 2)?,
            name: window.read_u32(offset + 4)?,
            symbol: window.read_u32(offset + 8)?,
            signature: window.read_u32(offset + 12)?,
        })
    }

    pub fn setter(self) -> bool {
        self.flags & (1 << 1) != 0
    }

    pub fn getter(self) -> bool {
        self.flags & (1 << 2) != 0
    }

    pub fn constructor(self) -> bool {
        self.flags & (1 << 3) != 0
    }

    pub fn wraps_vfunc(self) -> bool {
        self.flags & (1 << 4) != 0
    }

    /// Index of the property or vfunc this function is tied to.
    pub fn index(self) -> u16 {
        self.flags >> 6
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CallbackBlob {
    pub blob_type: u16,
    pub name: u32,
    pub signature: u32,
}

impl CallbackBlob {
    pub fn parse(window: &Window<'_>, offset: usize) -> Result<CallbackBlob> {
        window.check_room(offset, format::CALLBACK_BLOB_SIZE as usize, "callback blob")?;
        Ok(CallbackBlob {
            blob_type: window.read_u16(offset)?,
            name: window.read_u32(offset + 4)?,
            signature: window.read_u32(offset + 8)?,
        })
    }
}

/// A signature blob: return type, transfer flags, and the argument count.
/// Argument blobs follow contiguously.
#[derive(Debug, Clone, Copy)]
pub struct SignatureBlob {
    pub return_type: SimpleType,
    pub n_arguments: u16,
}

impl SignatureBlob {
    pub fn parse(window: &Window<'_>, offset: usize) -> Result<SignatureBlob> {
        window.check_room(offset, format::SIGNATURE_BLOB_SIZE as usize, "signature blob")?;
        Ok(SignatureBlob {
            return_type: SimpleType(window.read_u32(offset)?),
            n_arguments: window.read_u16(offset + 6)?,
        })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ArgBlob {
    pub name: u32,
    pub arg_type: SimpleType,
}

impl ArgBlob {
    pub fn parse(window: &Window<'_>, offset: usize) -> Result<ArgBlob> {
        window.check_room(offset, format::ARG_BLOB_SIZE as usize, "argument blob")?;
        Ok(ArgBlob {
            name: window.read_u32(offset)?,
            arg_type: SimpleType(window.read_u32(offset + 12)?),
        })
    }
}

/// A field blob. When `has_embedded_type` is set, a callback blob follows it
/// in place of a type reference.
#[derive(Debug, Clone, Copy)]
pub struct FieldBlob {
    pub name: u32,
    pub has_embedded_type: bool,
}

impl FieldBlob {
    pub fn parse(window: &Window<'_>, offset: usize) -> Result<FieldBlob> {
        window.check_room(offset, format::FIELD_BLOB_SIZE as usize, "field blob")?;
        Ok(FieldBlob {
            name: window.read_u32(offset)?,
            has_embedded_type: window.read_u8(offset + 4)? & (1 << 2) != 0,
        })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PropertyBlob {
    pub name: u32,
}

impl PropertyBlob {
    pub fn parse(window: &Window<'_>, offset: usize) -> Result<PropertyBlob> {
        window.check_room(offset, format::PROPERTY_BLOB_SIZE as usize, "property blob")?;
        Ok(PropertyBlob {
            name: window.read_u32(offset)?,
        })
    }
}

/// A signal blob. Exactly one of the three run-stage flags must be set.
#[derive(Debug, Clone, Copy)]
pub struct SignalBlob {
    flags: u16,
    /// Index into the container's signals when `has_class_closure` is set.
    pub class_closure: u16,
    pub name: u32,
    pub signature: u32,
}

impl SignalBlob {
    pub fn parse(window: &Window<'_>, offset: usize) -> Result<SignalBlob> {
        window.check_room(offset, format::SIGNAL_BLOB_SIZE as usize, "signal blob")?;
        Ok(SignalBlob {
            flags: window.read_u16(offset)?,
            class_closure: window.read_u16(offset + 2)?,
            name: window.read_u32(offset + 4)?,
            signature: window.read_u32(offset + 12)?,
        })
    }

    pub fn run_first(self) -> bool {
        self.flags & (1 << 1) != 0
    }

    pub fn run_last(self) -> bool {
        self.flags & (1 << 2) != 0
    }

    pub fn run_cleanup(self) -> bool {
        self.flags & (1 << 3) != 0
    }

    pub fn has_class_closure(self) -> bool {
        self.flags & (1 << 8) != 0
    }
}

/// A virtual-function blob.
#[derive(Debug, Clone, Copy)]
pub struct VFuncBlob {
    pub name: u32,
    flags: u16,
    /// Index into the container's vfuncs when the class-closure flag is set.
    pub class_closure_index: u16,
    pub signature: u32,
}

impl VFuncBlob {
    pub fn parse(window: &Window<'_>, offset: usize) -> Result<VFuncBlob> {
        window.check_room(offset, format::VFUNC_BLOB_SIZE as usize, "vfunc blob")?;
        Ok(VFuncBlob {
            name: window.read_u32(offset)?,
            flags: window.read_u16(offset + 4)?,
            class_closure_index: window.read_u16(offset + 6)?,
            signature: window.read_u32(offset + 16)?,
        })
    }

    pub fn has_class_closure(self) -> bool {
        self.flags & (1 << 3) != 0
    }
}

/// A constant blob: a type, a payload size, and the payload offset.
#[derive(Debug, Clone, Copy)]
pub struct ConstantBlob {
    pub blob_type: u16,
    pub name: u32,
    pub constant_type: SimpleType,
    pub size: u32,
    pub offset: u32,
}

impl ConstantBlob {
    pub fn parse(window: &Window<'_>, offset: usize) -> Result<ConstantBlob> {
        window.check_room(offset, format::CONSTANT_BLOB_SIZE as usize, "constant blob")?;
        Ok(ConstantBlob {
            blob_type: window.read_u16(offset)?,
            name: window.read_u32(offset + 4)?,
            constant_type: SimpleType(window.read_u32(offset + 8)?),
            size: window.read_u32(offset + 12)?,
            offset: window.read_u32(offset + 16)?,
        })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ValueBlob {
    pub name: u32,
    pub value: i32,
}

impl ValueBlob {
    pub fn parse(window: &Window<'_>, offset: usize) -> Result<ValueBlob> {
        window.check_room(offset, format::VALUE_BLOB_SIZE as usize, "value blob")?;
        Ok(ValueBlob {
            name: window.read_u32(offset + 4)?,
            value: window.read_i32(offset + 8)?,
        })
    }
}

/// A struct or boxed blob; the two share one layout. Fields (with optional
/// embedded callbacks) and then methods follow contiguously.
#[derive(Debug, Clone, Copy)]
pub struct StructBlob {
    pub blob_type: u16,
    pub unregistered: bool,
    pub name: u32,
    pub gtype_name: u32,
    pub gtype_init: u32,
    pub n_fields: u16,
    pub n_methods: u16,
}

impl StructBlob {
    pub fn parse(window: &Window<'_>, offset: usize) -> Result<StructBlob> {
        window.check_room(offset, format::STRUCT_BLOB_SIZE as usize, "struct blob")?;
        Ok(StructBlob {
            blob_type: window.read_u16(offset)?,
            unregistered: window.read_u16(offset + 2)? & (1 << 1) != 0,
            name: window.read_u32(offset + 4)?,
            gtype_name: window.read_u32(offset + 8)?,
            gtype_init: window.read_u32(offset + 12)?,
            n_fields: window.read_u16(offset + 20)?,
            n_methods: window.read_u16(offset + 22)?,
        })
    }
}

/// An enum or flags blob; the two share one layout. Values and then methods
/// follow contiguously.
#[derive(Debug, Clone, Copy)]
pub struct EnumBlob {
    pub blob_type: u16,
    pub unregistered: bool,
    pub name: u32,
    pub gtype_name: u32,
    pub gtype_init: u32,
    pub n_values: u16,
    pub n_methods: u16,
    /// String-pool offset of the error-domain name, or 0.
    pub error_domain: u32,
}

impl EnumBlob {
    pub fn parse(window: &Window<'_>, offset: usize) -> Result<EnumBlob> {
        window.check_room(offset, format::ENUM_BLOB_SIZE as usize, "enum blob")?;
        Ok(EnumBlob {
            blob_type: window.read_u16(offset)?,
            unregistered: window.read_u16(offset + 2)? & (1 << 1) != 0,
            name: window.read_u32(offset + 4)?,
            gtype_name: window.read_u32(offset + 8)?,
            gtype_init: window.read_u32(offset + 12)?,
            n_values: window.read_u16(offset + 16)?,
            n_methods: window.read_u16(offset + 18)?,
            error_domain: window.read_u32(offset + 20)?,
        })
    }
}

/// An object blob. Six tail arrays follow the fixed part, in order: interface
/// indices (padded to 4-byte alignment), fields, properties, methods,
/// signals, vfuncs, constants.
#[derive(Debug, Clone, Copy)]
pub struct ObjectBlob {
    pub blob_type: u16,
    pub name: u32,
    pub gtype_name: u32,
    pub gtype_init: u32,
    /// Directory index of the parent object, or 0.
    pub parent: u16,
    /// Directory index of the class struct, or 0.
    pub gtype_struct: u16,
    pub n_interfaces: u16,
    pub n_fields: u16,
    pub n_properties: u16,
    pub n_methods: u16,
    pub n_signals: u16,
    pub n_vfuncs: u16,
    pub n_constants: u16,
    /// Declared number of fields carrying embedded callbacks; checked against
    /// the observed count during validation.
    pub n_field_callbacks: u16,
}

impl ObjectBlob {
    pub fn parse(window: &Window<'_>, offset: usize) -> Result<ObjectBlob> {
        window.check_room(offset, format::OBJECT_BLOB_SIZE as usize, "object blob")?;
        Ok(ObjectBlob {
            blob_type: window.read_u16(offset)?,
            name: window.read_u32(offset + 4)?,
            gtype_name: window.read_u32(offset + 8)?,
            gtype_init: window.read_u32(offset + 12)?,
            parent: window.read_u16(offset + 16)?,
            gtype_struct: window.read_u16(offset + 18)?,
            n_interfaces: window.read_u16(offset + 20)?,
            n_fields: window.read_u16(offset + 22)?,
            n_properties: window.read_u16(offset + 24)?,
            n_methods: window.read_u16(offset + 26)?,
            n_signals: window.read_u16(offset + 28)?,
            n_vfuncs: window.read_u16(offset + 30)?,
            n_constants: window.read_u16(offset + 32)?,
            n_field_callbacks: window.read_u16(offset + 34)?,
        })
    }
}

/// An interface blob. Prerequisite indices and then five tail arrays follow.
#[derive(Debug, Clone, Copy)]
pub struct InterfaceBlob {
    pub blob_type: u16,
    pub name: u32,
    pub gtype_name: u32,
    pub gtype_init: u32,
    pub n_prerequisites: u16,
    pub n_properties: u16,
    pub n_methods: u16,
    pub n_signals: u16,
    pub n_vfuncs: u16,
    pub n_constants: u16,
}

impl InterfaceBlob {
    pub fn parse(window: &Window<'_>, offset: usize) -> Result<InterfaceBlob> {
        window.check_room(offset, format::INTERFACE_BLOB_SIZE as usize, "interface blob")?;
        Ok(InterfaceBlob {
            blob_type: window.read_u16(offset)?,
            name: window.read_u32(offset + 4)?,
            gtype_name: window.read_u32(offset + 8)?,
            gtype_init: window.read_u32(offset + 12)?,
            n_prerequisites: window.read_u16(offset + 18)?,
            n_properties: window.read_u16(offset + 20)?,
            n_methods: window.read_u16(offset + 22)?,
            n_signals: window.read_u16(offset + 24)?,
            n_vfuncs: window.read_u16(offset + 26)?,
            n_constants: window.read_u16(offset + 28)?,
        })
    }
}

/// A union blob. Structurally parsed only; deep validation is intentionally
/// not performed.
#[derive(Debug, Clone, Copy)]
pub struct UnionBlob {
    pub blob_type: u16,
    pub name: u32,
    pub n_fields: u16,
    pub n_functions: u16,
}

impl UnionBlob {
    pub fn parse(window: &Window<'_>, offset: usize) -> Result<UnionBlob> {
        window.check_room(offset, format::UNION_BLOB_SIZE as usize, "union blob")?;
        Ok(UnionBlob {
            blob_type: window.read_u16(offset)?,
            name: window.read_u32(offset + 4)?,
            n_fields: window.read_u16(offset + 20)?,
            n_functions: window.read_u16(offset + 22)?,
        })
    }
}
