//! Process-global string interner for error-domain keys.
//!
//! Error-domain lookup is keyed by a small integer standing for an interned
//! string, so that repeated lookups compare integers instead of strings.
//! Interned strings are never freed; the table lives for the process.

use std::collections::HashMap;
use std::sync::{Mutex, OnceLock};

/// An interned string key. Two quarks are equal iff their strings are equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Quark(u32);

struct Registry {
    by_name: HashMap<&'static str, u32>,
    names: Vec<&'static str>,
}

fn registry() -> &'static Mutex<Registry> {
    static REGISTRY: OnceLock<Mutex<Registry>> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        Mutex::new(Registry {
            by_name: HashMap::new(),
            names: Vec::new(),
        })
    })
}

impl Quark {
    /// Intern `name`, returning its key. The same string always maps to the
    /// same quark within one process.
    pub fn from_string(name: &str) -> Quark {
        let mut reg = registry().lock().unwrap_or_else(|e| e.into_inner());
        if let Some(&id) = reg.by_name.get(name) {
            return Quark(id);
        }
        let leaked: &'static str = Box::leak(name.to_owned().into_boxed_str());
        let id = reg.names.len() as u32;
        reg.names.push(leaked);
        reg.by_name.insert(leaked, id);
        Quark(id)
    }

    /// The string this quark was interned from.
    pub fn as_str(self) -> &'static str {
        let reg = registry().lock().unwrap_or_else(|e| e.into_inner());
        reg.names[self.0 as usize]
    }
}
