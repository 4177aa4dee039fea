#![no_main]

use libfuzzer_sys::fuzz_target;

// Construction and validation must reject arbitrary input gracefully; any
// panic or out-of-bounds read here is a bug.
fuzz_target!(|data: &[u8]| {
    if let Ok(typelib) = typelib::Typelib::new(data.to_vec()) {
        let _ = typelib.validate();
        let _ = typelib.entry_by_name("name");
        let _ = typelib.matches_gtype_name_prefix("Name");
    }
});
