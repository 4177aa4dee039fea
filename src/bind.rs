//! Shared-library binding for symbol resolution.
//!
//! The header's shared-library list is opened lazily, at most once per
//! typelib (see `Typelib::symbol`). Libraries are bound lazily and locally so
//! that loading a typelib never drags symbol resolution forward or pollutes
//! the global namespace. A library that fails to open is reported as a
//! warning and skipped; resolution simply walks whatever did open.

use std::ffi::{c_void, CString};
use std::path::{Path, PathBuf};

use libloading::Library;

/// Open every library named in the comma-separated `shared_library` list.
///
/// Relative names are tried against `search_paths` first, then handed to the
/// system loader as-is. An empty (or absent) list means the main program
/// image. Open failures are logged and skipped.
pub(crate) fn open_libraries(
    shared_library: Option<&str>,
    search_paths: &[PathBuf],
) -> Vec<Library> {
    let mut libraries = Vec::new();
    match shared_library {
        Some(list) if !list.is_empty() => {
            for name in list.split(',') {
                match open_one(name, search_paths) {
                    Ok(library) => libraries.push(library),
                    Err(err) => {
                        log::warn!(
                            "Failed to load shared library '{}' referenced by the typelib: {}",
                            name,
                            err
                        );
                    }
                }
            }
        }
        _ => {
            if let Some(library) = open_self() {
                libraries.push(library);
            }
        }
    }
    libraries
}

/// Resolve `name` against the opened libraries, in insertion order.
pub(crate) fn lookup_symbol(libraries: &[Library], name: &str) -> Option<*mut c_void> {
    let symbol = CString::new(name).ok()?;
    for library in libraries {
        // SAFETY: the resolved address is returned as an opaque pointer; no
        // call happens here, so no signature can be violated.
        let found = unsafe { library.get::<*mut c_void>(symbol.as_bytes_with_nul()) };
        if let Ok(found) = found {
            // Copy the address out before the symbol guard drops.
            return Some(*found);
        }
    }
    None
}

fn open_one(name: &str, search_paths: &[PathBuf]) -> Result<Library, libloading::Error> {
    // Absolute paths (and loader-relative @-paths on macOS) go straight to
    // the system loader; everything else is tried against the configured
    // search paths first.
    let direct = Path::new(name).is_absolute()
        || (cfg!(target_os = "macos") && name.starts_with('@'));
    if !direct {
        for dir in search_paths {
            if let Ok(library) = open_lazy(&dir.join(name)) {
                return Ok(library);
            }
        }
    }
    open_lazy(Path::new(name))
}

#[cfg(unix)]
fn open_lazy(path: &Path) -> Result<Library, libloading::Error> {
    use libloading::os::unix::{Library as UnixLibrary, RTLD_LAZY, RTLD_LOCAL};
    // SAFETY: library initializers run on open; that is inherent to binding
    // shared libraries and is what the caller asked for.
    unsafe { UnixLibrary::open(Some(path), RTLD_LAZY | RTLD_LOCAL).map(Library::from) }
}

#[cfg(not(unix))]
fn open_lazy(path: &Path) -> Result<Library, libloading::Error> {
    // SAFETY: as above.
    unsafe { Library::new(path) }
}

#[cfg(unix)]
fn open_self() -> Option<Library> {
    Some(Library::from(libloading::os::unix::Library::this()))
}

#[cfg(windows)]
fn open_self() -> Option<Library> {
    libloading::os::windows::Library::this().ok().map(Library::from)
}

#[cfg(not(any(unix, windows)))]
fn open_self() -> Option<Library> {
    None
}
