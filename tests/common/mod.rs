//! In-memory typelib fixture builder for the integration tests.
//!
//! Assembles well-formed typelib buffers (header, directory, blobs, string
//! pool, optional section table) and hands back the absolute offsets of the
//! blobs it wrote, so tests can corrupt specific bytes afterwards. Layout:
//! header at 0, blob area at 112, then directory, string pool, and the
//! optional section table.

#![allow(dead_code)]

use std::collections::HashMap;

/// Blob area starts right after the fixed header.
pub const BLOB_BASE: usize = 112;

/// Header byte offsets used by corruption tests.
pub const HEADER_N_ENTRIES: usize = 20;
pub const HEADER_DIRECTORY: usize = 24;
pub const HEADER_SIZE_FIELD: usize = 40;
pub const HEADER_BLOB_SIZES: usize = 60;

/// Blob-type tags.
pub const FUNCTION: u16 = 1;
pub const CALLBACK: u16 = 2;
pub const STRUCT: u16 = 3;
pub const BOXED: u16 = 4;
pub const ENUM: u16 = 5;
pub const OBJECT: u16 = 7;
pub const INTERFACE: u16 = 8;
pub const CONSTANT: u16 = 9;
pub const UNION: u16 = 11;

/// Type tags.
pub const TAG_INT32: u8 = 6;
pub const TAG_UTF8: u8 = 13;
pub const TAG_INTERFACE: u8 = 16;

/// Inline simple-type word for a basic tag.
pub fn simple_basic(tag: u8, pointer: bool) -> u32 {
    ((tag as u32) << 27) | ((pointer as u32) << 24)
}

enum OffsetVal {
    /// Absolute blob offset (local entries).
    Abs(u32),
    /// String-pool position, patched at build time (non-local entries).
    Str(usize),
}

struct EntrySpec {
    blob_type: u16,
    local: bool,
    name_pos: usize,
    offset: OffsetVal,
}

/// A field inside a struct or object.
pub struct FieldSpec<'a> {
    pub name: &'a str,
    /// Write an embedded callback (name, signature offset) after the field.
    pub callback: Option<(&'a str, u32)>,
}

/// A method inside a container's tail.
pub struct MethodSpec<'a> {
    pub name: &'a str,
    pub symbol: &'a str,
    pub signature: u32,
    pub flags: u16,
}

/// A signal inside an object or interface tail.
pub struct SignalSpec<'a> {
    pub name: &'a str,
    pub flags: u16,
    pub class_closure: u16,
    pub signature: u32,
}

#[derive(Default)]
pub struct ObjectSpec<'a> {
    pub name: &'a str,
    pub gtype_name: &'a str,
    pub gtype_init: &'a str,
    pub parent: u16,
    pub gtype_struct: u16,
    pub interfaces: Vec<u16>,
    pub fields: Vec<FieldSpec<'a>>,
    /// Declared field-callback count; `None` means the observed count.
    pub n_field_callbacks: Option<u16>,
    pub methods: Vec<MethodSpec<'a>>,
    pub signals: Vec<SignalSpec<'a>>,
}

pub struct Builder {
    namespace_pos: usize,
    nsversion_pos: usize,
    shared_library_pos: Option<usize>,
    c_prefix_pos: Option<usize>,
    entries: Vec<EntrySpec>,
    blob: Vec<u8>,
    pool: Vec<u8>,
    interned: HashMap<String, usize>,
    str_patches: Vec<(usize, usize)>,
    with_dirindex: bool,
}

impl Builder {
    pub fn new(namespace: &str) -> Builder {
        let mut b = Builder {
            namespace_pos: 0,
            nsversion_pos: 0,
            shared_library_pos: None,
            c_prefix_pos: None,
            entries: Vec::new(),
            blob: Vec::new(),
            pool: Vec::new(),
            interned: HashMap::new(),
            str_patches: Vec::new(),
            with_dirindex: false,
        };
        b.namespace_pos = b.intern(namespace);
        b.nsversion_pos = b.intern("1.0");
        b
    }

    pub fn shared_library(&mut self, list: &str) -> &mut Self {
        self.shared_library_pos = Some(self.intern(list));
        self
    }

    pub fn c_prefix(&mut self, list: &str) -> &mut Self {
        self.c_prefix_pos = Some(self.intern(list));
        self
    }

    pub fn with_directory_index(&mut self) -> &mut Self {
        self.with_dirindex = true;
        self
    }

    fn intern(&mut self, s: &str) -> usize {
        if let Some(&pos) = self.interned.get(s) {
            return pos;
        }
        let pos = self.pool.len();
        self.pool.extend_from_slice(s.as_bytes());
        self.pool.push(0);
        self.interned.insert(s.to_string(), pos);
        pos
    }

    // Raw blob writers.

    fn push_u8(&mut self, v: u8) {
        self.blob.push(v);
    }

    fn push_u16(&mut self, v: u16) {
        self.blob.extend_from_slice(&v.to_le_bytes());
    }

    fn push_u32(&mut self, v: u32) {
        self.blob.extend_from_slice(&v.to_le_bytes());
    }

    fn push_i32(&mut self, v: i32) {
        self.blob.extend_from_slice(&v.to_le_bytes());
    }

    /// Write a string reference; the absolute offset is patched in at build.
    fn push_str_ref(&mut self, s: &str) {
        let pos = self.intern(s);
        self.str_patches.push((self.blob.len(), pos));
        self.push_u32(0);
    }

    /// Align the blob area and return the absolute offset of the next blob.
    fn begin_blob(&mut self) -> u32 {
        while self.blob.len() % 4 != 0 {
            self.blob.push(0);
        }
        (BLOB_BASE + self.blob.len()) as u32
    }

    // Directory.

    pub fn add_entry(&mut self, blob_type: u16, name: &str, offset: u32) -> u16 {
        let name_pos = self.intern(name);
        self.entries.push(EntrySpec {
            blob_type,
            local: true,
            name_pos,
            offset: OffsetVal::Abs(offset),
        });
        self.entries.len() as u16
    }

    pub fn add_nonlocal_entry(&mut self, name: &str, namespace: &str) -> u16 {
        let name_pos = self.intern(name);
        let ns_pos = self.intern(namespace);
        self.entries.push(EntrySpec {
            blob_type: 0,
            local: false,
            name_pos,
            offset: OffsetVal::Str(ns_pos),
        });
        self.entries.len() as u16
    }

    // Blob constructors; each returns the absolute offset it was written at.

    /// A signature blob: return type word, zero flags, then the arguments.
    pub fn add_signature(&mut self, return_type: u32, args: &[(&str, u32)]) -> u32 {
        let offset = self.begin_blob();
        self.push_u32(return_type);
        self.push_u16(0);
        self.push_u16(args.len() as u16);
        for (name, arg_type) in args {
            self.push_str_ref(name);
            self.push_u32(0); // direction and transfer flags
            self.push_u8(0); // closure
            self.push_u8(0); // destroy
            self.push_u16(0); // padding
            self.push_u32(*arg_type);
        }
        offset
    }

    pub fn add_function(&mut self, name: &str, symbol: &str, signature: u32, flags: u16) -> u32 {
        let offset = self.begin_blob();
        self.push_u16(FUNCTION);
        self.push_u16(flags);
        self.push_str_ref(name);
        self.push_str_ref(symbol);
        self.push_u32(signature);
        self.push_u16(0); // is_static
        self.push_u16(0); // reserved
        offset
    }

    /// Function entry with an `() -> i32` signature; returns the blob offset.
    pub fn add_function_entry(&mut self, name: &str, symbol: &str) -> u32 {
        let signature = self.add_signature(simple_basic(TAG_INT32, false), &[]);
        let offset = self.add_function(name, symbol, signature, 0);
        self.add_entry(FUNCTION, name, offset);
        offset
    }

    fn write_callback(&mut self, name: &str, signature: u32) {
        self.push_u16(CALLBACK);
        self.push_u16(0);
        self.push_str_ref(name);
        self.push_u32(signature);
    }

    pub fn add_callback(&mut self, name: &str, signature: u32) -> u32 {
        let offset = self.begin_blob();
        self.write_callback(name, signature);
        offset
    }

    /// An interface-reference type blob pointing at directory index `index`.
    pub fn add_interface_type(&mut self, index: u16) -> u32 {
        let offset = self.begin_blob();
        self.push_u8((TAG_INTERFACE << 3) | 1); // tag and pointer bit
        self.push_u8(0);
        self.push_u16(index);
        offset
    }

    /// An enum blob (values only, no methods). Registered when `gtype` names
    /// are given.
    pub fn add_enum(
        &mut self,
        name: &str,
        gtype: Option<(&str, &str)>,
        error_domain: Option<&str>,
        values: &[(&str, i32)],
    ) -> u32 {
        let offset = self.begin_blob();
        self.push_u16(ENUM);
        self.push_u16(if gtype.is_some() { 0 } else { 1 << 1 }); // unregistered bit
        self.push_str_ref(name);
        match gtype {
            Some((gtype_name, gtype_init)) => {
                self.push_str_ref(gtype_name);
                self.push_str_ref(gtype_init);
            }
            None => {
                self.push_u32(0);
                self.push_u32(0);
            }
        }
        self.push_u16(values.len() as u16);
        self.push_u16(0); // n_methods
        match error_domain {
            Some(domain) => self.push_str_ref(domain),
            None => self.push_u32(0),
        }
        for (value_name, value) in values {
            self.push_u32(0); // flags
            self.push_str_ref(value_name);
            self.push_i32(*value);
        }
        offset
    }

    /// A constant blob plus its payload.
    pub fn add_constant(&mut self, name: &str, constant_type: u32, payload: &[u8]) -> u32 {
        let payload_offset = self.begin_blob();
        let data = payload.to_vec();
        self.blob.extend_from_slice(&data);
        let offset = self.begin_blob();
        self.push_u16(CONSTANT);
        self.push_u16(0);
        self.push_str_ref(name);
        self.push_u32(constant_type);
        self.push_u32(data.len() as u32);
        self.push_u32(payload_offset);
        self.push_u32(0);
        offset
    }

    /// An object blob with its tail arrays.
    pub fn add_object(&mut self, spec: &ObjectSpec<'_>) -> u32 {
        let offset = self.begin_blob();
        let observed_callbacks = spec
            .fields
            .iter()
            .filter(|f| f.callback.is_some())
            .count() as u16;
        self.push_u16(OBJECT);
        self.push_u16(0);
        self.push_str_ref(spec.name);
        self.push_str_ref(spec.gtype_name);
        self.push_str_ref(spec.gtype_init);
        self.push_u16(spec.parent);
        self.push_u16(spec.gtype_struct);
        self.push_u16(spec.interfaces.len() as u16);
        self.push_u16(spec.fields.len() as u16);
        self.push_u16(0); // n_properties
        self.push_u16(spec.methods.len() as u16);
        self.push_u16(spec.signals.len() as u16);
        self.push_u16(0); // n_vfuncs
        self.push_u16(0); // n_constants
        self.push_u16(spec.n_field_callbacks.unwrap_or(observed_callbacks));
        for _ in 0..6 {
            self.push_u32(0); // ref/unref/set/get funcs and reserved words
        }
        for index in &spec.interfaces {
            self.push_u16(*index);
        }
        if self.blob.len() % 4 != 0 {
            self.push_u16(0); // pad interface list
        }
        for field in &spec.fields {
            self.write_field(field);
        }
        for method in &spec.methods {
            self.write_method(method);
        }
        for signal in &spec.signals {
            self.write_signal(signal);
        }
        offset
    }

    /// An interface blob with a prerequisite list and optional signals.
    pub fn add_interface(
        &mut self,
        name: &str,
        gtype_name: &str,
        gtype_init: &str,
        prerequisites: &[u16],
    ) -> u32 {
        let offset = self.begin_blob();
        self.push_u16(INTERFACE);
        self.push_u16(0);
        self.push_str_ref(name);
        self.push_str_ref(gtype_name);
        self.push_str_ref(gtype_init);
        self.push_u16(0); // gtype_struct
        self.push_u16(prerequisites.len() as u16);
        self.push_u16(0); // n_properties
        self.push_u16(0); // n_methods
        self.push_u16(0); // n_signals
        self.push_u16(0); // n_vfuncs
        self.push_u16(0); // n_constants
        self.push_u16(0); // padding
        self.push_u32(0);
        self.push_u32(0);
        for index in prerequisites {
            self.push_u16(*index);
        }
        if self.blob.len() % 4 != 0 {
            self.push_u16(0);
        }
        offset
    }

    /// An unregistered struct blob with its field and method tails.
    pub fn add_struct(
        &mut self,
        name: &str,
        fields: &[FieldSpec<'_>],
        methods: &[MethodSpec<'_>],
    ) -> u32 {
        self.add_record(STRUCT, name, fields, methods)
    }

    /// A boxed blob; same layout as a struct, different tag.
    pub fn add_boxed(
        &mut self,
        name: &str,
        fields: &[FieldSpec<'_>],
        methods: &[MethodSpec<'_>],
    ) -> u32 {
        self.add_record(BOXED, name, fields, methods)
    }

    fn add_record(
        &mut self,
        blob_type: u16,
        name: &str,
        fields: &[FieldSpec<'_>],
        methods: &[MethodSpec<'_>],
    ) -> u32 {
        let offset = self.begin_blob();
        self.push_u16(blob_type);
        self.push_u16(1 << 1); // unregistered
        self.push_str_ref(name);
        self.push_u32(0);
        self.push_u32(0);
        self.push_u32(0); // size
        self.push_u16(fields.len() as u16);
        self.push_u16(methods.len() as u16);
        self.push_u32(0);
        self.push_u32(0);
        for field in fields {
            self.write_field(field);
        }
        for method in methods {
            self.write_method(method);
        }
        offset
    }

    /// A union blob. Member counts are written as given and nothing follows;
    /// the validator is expected not to look.
    pub fn add_union(&mut self, name: &str, n_fields: u16, n_functions: u16) -> u32 {
        let offset = self.begin_blob();
        self.push_u16(UNION);
        self.push_u16(1 << 1); // unregistered
        self.push_str_ref(name);
        self.push_u32(0);
        self.push_u32(0);
        self.push_u32(0); // size
        self.push_u16(n_fields);
        self.push_u16(n_functions);
        self.push_u32(0);
        self.push_u32(0);
        self.push_i32(-1); // discriminator offset
        self.push_u32(0); // discriminator type
        offset
    }

    fn write_field(&mut self, field: &FieldSpec<'_>) {
        self.push_str_ref(field.name);
        self.push_u8(if field.callback.is_some() { 1 << 2 } else { 0 });
        self.push_u8(0); // bits
        self.push_u16(0); // struct offset
        self.push_u32(0);
        match field.callback {
            Some(_) => self.push_u32(0), // type word unused with embedded callback
            None => self.push_u32(simple_basic(TAG_INT32, false)),
        }
        if let Some((callback_name, signature)) = field.callback {
            self.write_callback(callback_name, signature);
        }
    }

    fn write_method(&mut self, method: &MethodSpec<'_>) {
        self.push_u16(FUNCTION);
        self.push_u16(method.flags);
        self.push_str_ref(method.name);
        self.push_str_ref(method.symbol);
        self.push_u32(method.signature);
        self.push_u16(0);
        self.push_u16(0);
    }

    fn write_signal(&mut self, signal: &SignalSpec<'_>) {
        self.push_u16(signal.flags);
        self.push_u16(signal.class_closure);
        self.push_str_ref(signal.name);
        self.push_u32(0);
        self.push_u32(signal.signature);
    }

    /// Assemble the final buffer.
    pub fn build(&self) -> Vec<u8> {
        let n_entries = self.entries.len();
        let n_local = self.entries.iter().filter(|e| e.local).count();
        // Local entries must form the directory prefix.
        assert!(
            self.entries[..n_local].iter().all(|e| e.local),
            "local entries must come first"
        );

        let blob_len = align4(self.blob.len());
        let dir_off = BLOB_BASE + blob_len;
        let str_base = dir_off + n_entries * 12;
        let str_end = str_base + self.pool.len();
        let (sections_off, total) = if self.with_dirindex {
            let sections_off = align4(str_end);
            // Section table: DIRECTORY_INDEX entry, END sentinel, hash data.
            (sections_off, sections_off + 16 + 8)
        } else {
            (0, str_end)
        };

        let mut out = Vec::with_capacity(total);
        out.extend_from_slice(b"GOBJ\nMETADATA\r\n\x1a");
        out.push(4); // major
        out.push(0); // minor
        out.extend_from_slice(&0u16.to_le_bytes()); // reserved
        out.extend_from_slice(&(n_entries as u16).to_le_bytes());
        out.extend_from_slice(&(n_local as u16).to_le_bytes());
        out.extend_from_slice(&(dir_off as u32).to_le_bytes());
        out.extend_from_slice(&0u32.to_le_bytes()); // n_attributes
        out.extend_from_slice(&0u32.to_le_bytes()); // attributes
        out.extend_from_slice(&0u32.to_le_bytes()); // dependencies
        out.extend_from_slice(&(total as u32).to_le_bytes());
        out.extend_from_slice(&((str_base + self.namespace_pos) as u32).to_le_bytes());
        out.extend_from_slice(&((str_base + self.nsversion_pos) as u32).to_le_bytes());
        let shared = self.shared_library_pos.map_or(0, |p| str_base + p) as u32;
        out.extend_from_slice(&shared.to_le_bytes());
        let prefix = self.c_prefix_pos.map_or(0, |p| str_base + p) as u32;
        out.extend_from_slice(&prefix.to_le_bytes());
        for size in [
            12u16, 20, 12, 16, 20, 16, 16, 16, 12, 12, 24, 16, 8, 24, 32, 60, 40, 40,
        ] {
            out.extend_from_slice(&size.to_le_bytes());
        }
        out.extend_from_slice(&(sections_off as u32).to_le_bytes());
        out.extend_from_slice(&[0u8; 12]); // padding
        assert_eq!(out.len(), BLOB_BASE);

        out.extend_from_slice(&self.blob);
        out.resize(BLOB_BASE + blob_len, 0);

        for entry in &self.entries {
            out.extend_from_slice(&entry.blob_type.to_le_bytes());
            out.extend_from_slice(&(entry.local as u16).to_le_bytes());
            out.extend_from_slice(&((str_base + entry.name_pos) as u32).to_le_bytes());
            let offset = match entry.offset {
                OffsetVal::Abs(abs) => abs,
                OffsetVal::Str(pos) => (str_base + pos) as u32,
            };
            out.extend_from_slice(&offset.to_le_bytes());
        }

        out.extend_from_slice(&self.pool);

        if self.with_dirindex {
            out.resize(sections_off, 0);
            out.extend_from_slice(&1u32.to_le_bytes()); // DIRECTORY_INDEX
            out.extend_from_slice(&((sections_off + 16) as u32).to_le_bytes());
            out.extend_from_slice(&0u32.to_le_bytes()); // END
            out.extend_from_slice(&0u32.to_le_bytes());
            out.extend_from_slice(&[0u8; 8]); // opaque hash data
        }
        assert_eq!(out.len(), total);

        // Patch string references inside the blob area.
        for (blob_pos, pool_pos) in &self.str_patches {
            let absolute = (str_base + pool_pos) as u32;
            out[BLOB_BASE + blob_pos..BLOB_BASE + blob_pos + 4]
                .copy_from_slice(&absolute.to_le_bytes());
        }
        out
    }
}

fn align4(n: usize) -> usize {
    (n + 3) & !3
}

/// Patch a little-endian u16 in place.
pub fn patch_u16(bytes: &mut [u8], offset: usize, value: u16) {
    bytes[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
}

/// Patch a little-endian u32 in place.
pub fn patch_u32(bytes: &mut [u8], offset: usize, value: u32) {
    bytes[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}
