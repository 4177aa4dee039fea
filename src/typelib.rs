//! The typelib container: construction, lookups, and symbol resolution.

use std::borrow::Cow;
use std::ffi::c_void;
use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};

use libloading::Library;

use crate::bind;
use crate::blobs::{DirEntry, EnumBlob};
use crate::error::{Result, TypelibError};
use crate::format::{self, BlobType, SectionId};
use crate::header::Header;
use crate::quark::Quark;
use crate::validate;
use crate::window::Window;

/// Pluggable lookup over the directory-index section.
///
/// Given the raw bytes of the section (running to the end of the buffer), a
/// name, and the number of local entries, returns a candidate 0-based local
/// entry index. The candidate is untrusted: the typelib verifies it by name
/// comparison before returning anything, so a hostile section can only cause
/// a miss.
pub type DirectoryIndexOracle = dyn Fn(&[u8], &str, u16) -> Option<u16> + Send + Sync;

/// Construction options for a [`Typelib`].
#[derive(Default)]
pub struct TypelibOptions {
    /// Directories tried, in order, before the system loader when a shared
    /// library is named with a relative path.
    pub library_paths: Vec<PathBuf>,
    /// Hash lookup used by [`Typelib::entry_by_name`] when the typelib
    /// carries a directory-index section. Without one, lookup falls back to a
    /// linear scan of the local entries.
    pub directory_index_oracle: Option<Box<DirectoryIndexOracle>>,
}

impl fmt::Debug for TypelibOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypelibOptions")
            .field("library_paths", &self.library_paths)
            .field(
                "directory_index_oracle",
                &self.directory_index_oracle.as_ref().map(|_| ".."),
            )
            .finish()
    }
}

/// A resolved directory entry.
#[derive(Debug, Clone, Copy)]
pub struct Entry<'t> {
    /// 1-based directory index.
    pub index: u16,
    /// Raw blob-type tag; 0 for non-local references.
    pub blob_type: u16,
    /// Whether the entry is defined in this typelib.
    pub local: bool,
    /// Entry name from the string pool.
    pub name: &'t str,
    /// Local entries: blob offset. Non-local entries: string-pool offset of
    /// the defining namespace name.
    pub offset: u32,
}

impl Entry<'_> {
    /// The entry's blob type, when it is in the known range.
    pub fn kind(&self) -> Option<BlobType> {
        BlobType::try_from(self.blob_type).ok()
    }
}

struct Inner {
    data: Cow<'static, [u8]>,
    header: Header,
    options: TypelibOptions,
    /// Opened shared libraries, populated at most once on first symbol
    /// resolution. Dropping the last handle closes them.
    libraries: OnceLock<Vec<Library>>,
}

/// A loaded typelib.
///
/// Construction decodes and checks the header; [`Typelib::validate`] performs
/// the full structural pass. Handles are cheap atomically-refcounted clones
/// of one immutable buffer; the shared libraries opened for symbol resolution
/// are closed when the last clone drops.
#[derive(Clone)]
pub struct Typelib {
    inner: Arc<Inner>,
}

impl fmt::Debug for Typelib {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Typelib")
            .field("namespace", &self.namespace())
            .field("n_entries", &self.inner.header.n_entries)
            .field("size", &self.inner.data.len())
            .finish()
    }
}

impl Typelib {
    /// Load a typelib from an owning byte container.
    ///
    /// Runs the fast header check immediately; call [`Typelib::validate`] for
    /// the full structural pass.
    pub fn new(data: impl Into<Cow<'static, [u8]>>) -> Result<Typelib> {
        Typelib::with_options(data, TypelibOptions::default())
    }

    /// Like [`Typelib::new`], with library search paths and an optional
    /// directory-index oracle.
    pub fn with_options(
        data: impl Into<Cow<'static, [u8]>>,
        options: TypelibOptions,
    ) -> Result<Typelib> {
        let data = data.into();
        let header = Header::parse(&Window::new(&data))?;
        Ok(Typelib {
            inner: Arc::new(Inner {
                data,
                header,
                options,
                libraries: OnceLock::new(),
            }),
        })
    }

    /// Full structural validation of the directory and every local blob.
    pub fn validate(&self) -> Result<()> {
        validate::validate(self.window(), &self.inner.header)
    }

    /// The raw bytes of the typelib.
    pub fn data(&self) -> &[u8] {
        &self.inner.data
    }

    /// The decoded header.
    pub fn header(&self) -> &Header {
        &self.inner.header
    }

    fn window(&self) -> Window<'_> {
        Window::new(&self.inner.data)
    }

    /// The namespace name recorded in the header.
    pub fn namespace(&self) -> &str {
        // Validated during header parsing.
        self.window()
            .string_at(self.inner.header.namespace as usize, "namespace")
            .unwrap_or("")
    }

    /// The namespace version string, if present.
    pub fn nsversion(&self) -> Option<&str> {
        self.header_string(self.inner.header.nsversion)
    }

    /// The comma-separated C symbol prefix list, if present.
    pub fn c_prefix(&self) -> Option<&str> {
        self.header_string(self.inner.header.c_prefix)
    }

    /// The comma-separated shared-library list, if present.
    pub fn shared_library(&self) -> Option<&str> {
        self.header_string(self.inner.header.shared_library)
    }

    fn header_string(&self, offset: u32) -> Option<&str> {
        if offset == 0 {
            return None;
        }
        self.window().string_at(offset as usize, "header").ok()
    }

    /// Total number of directory entries.
    pub fn n_entries(&self) -> u16 {
        self.inner.header.n_entries
    }

    /// Number of entries defined in this typelib.
    pub fn n_local_entries(&self) -> u16 {
        self.inner.header.n_local_entries
    }

    /// The directory entry at 1-based `index`.
    pub fn entry(&self, index: u16) -> Result<Entry<'_>> {
        if index == 0 || index > self.inner.header.n_entries {
            return Err(TypelibError::InvalidBlob(format!(
                "The directory index {} is out of range",
                index
            )));
        }
        let window = self.window();
        let offset = self.inner.header.directory as usize
            + (index as usize - 1) * format::ENTRY_BLOB_SIZE as usize;
        let raw = DirEntry::parse(&window, offset)?;
        Ok(Entry {
            index,
            blob_type: raw.blob_type,
            local: raw.local,
            name: window.string_at(raw.name as usize, "entry")?,
            offset: raw.offset,
        })
    }

    /// Find the local entry named `name`.
    ///
    /// Uses the directory-index section together with the configured oracle
    /// when both are present, verifying the candidate by name comparison;
    /// otherwise scans the local entries. Absence is `None`, never an error.
    pub fn entry_by_name(&self, name: &str) -> Option<Entry<'_>> {
        if let Some(section_offset) = self.section_by_id(SectionId::DirectoryIndex) {
            if let Some(oracle) = self.inner.options.directory_index_oracle.as_deref() {
                let hash = self.inner.data.get(section_offset as usize..)?;
                let candidate = oracle(hash, name, self.inner.header.n_local_entries)?;
                if candidate >= self.inner.header.n_local_entries {
                    return None;
                }
                let entry = self.entry(candidate + 1).ok()?;
                return (entry.name == name).then_some(entry);
            }
        }
        self.local_entries().find(|e| e.name == name)
    }

    /// Find the local registered-type entry whose type-registration name is
    /// `gtype_name`.
    pub fn entry_by_gtype_name(&self, gtype_name: &str) -> Option<Entry<'_>> {
        let window = self.window();
        self.local_entries().find(|entry| {
            let Some(kind) = entry.kind() else {
                return false;
            };
            if !kind.is_registered_type() {
                return false;
            }
            // Registered-type blobs share the gtype_name position.
            let Ok(name_offset) = window.read_u32(entry.offset as usize + 8) else {
                return false;
            };
            name_offset != 0
                && window
                    .string_at(name_offset as usize, "gtype name")
                    .is_ok_and(|s| s == gtype_name)
        })
    }

    /// Find the local enum entry whose error domain matches `domain`.
    pub fn entry_by_error_domain(&self, domain: Quark) -> Option<Entry<'_>> {
        let window = self.window();
        let wanted = domain.as_str();
        self.local_entries().find(|entry| {
            if entry.blob_type != BlobType::Enum as u16 {
                return false;
            }
            let Ok(blob) = EnumBlob::parse(&window, entry.offset as usize) else {
                return false;
            };
            blob.error_domain != 0
                && window
                    .string_at(blob.error_domain as usize, "error domain")
                    .is_ok_and(|s| s == wanted)
        })
    }

    /// Whether `gtype_name` falls under one of the recorded C prefixes: some
    /// prefix must be a proper prefix of the name with an ASCII upper-case
    /// character right after it.
    pub fn matches_gtype_name_prefix(&self, gtype_name: &str) -> bool {
        let Some(prefixes) = self.c_prefix() else {
            return false;
        };
        prefixes.split(',').any(|prefix| {
            gtype_name
                .strip_prefix(prefix)
                .and_then(|rest| rest.chars().next())
                .is_some_and(|c| c.is_ascii_uppercase())
        })
    }

    /// Byte offset of the section with the given id, if the typelib has a
    /// section table and the section is present.
    pub fn section_by_id(&self, id: SectionId) -> Option<u32> {
        let window = self.window();
        let mut cursor = self.inner.header.sections as usize;
        if cursor == 0 {
            return None;
        }
        loop {
            let section_id = window.read_u32(cursor).ok()?;
            if section_id == SectionId::End as u32 {
                return None;
            }
            let offset = window.read_u32(cursor + 4).ok()?;
            if section_id == id as u32 {
                return Some(offset);
            }
            cursor += 8;
        }
    }

    /// Resolve `name` against the typelib's shared libraries.
    ///
    /// The libraries named in the header are opened on the first call, at
    /// most once per typelib even under concurrent callers. Returns `None`
    /// when no opened library exports the symbol.
    pub fn symbol(&self, name: &str) -> Option<*mut c_void> {
        let libraries = self.inner.libraries.get_or_init(|| {
            bind::open_libraries(self.shared_library(), &self.inner.options.library_paths)
        });
        bind::lookup_symbol(libraries, name)
    }

    fn local_entries(&self) -> impl Iterator<Item = Entry<'_>> {
        (1..=self.inner.header.n_local_entries).filter_map(|i| self.entry(i).ok())
    }
}
