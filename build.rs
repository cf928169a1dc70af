use std::env;
use std::path::PathBuf;

fn main() {
    println!("cargo:rerun-if-changed=src/rust/ffi.rs");

    let Ok(crate_dir) = env::var("CARGO_MANIFEST_DIR") else {
        return;
    };
    let header = PathBuf::from(&crate_dir).join("include").join("ondevice_intent.h");

    let generated = cbindgen::Builder::new()
        .with_crate(&crate_dir)
        .with_language(cbindgen::Language::C)
        .with_include_guard("ONDEVICE_INTENT_H")
        .with_documentation(true)
        .generate();

    match generated {
        Ok(bindings) => {
            if let Some(parent) = header.parent() {
                let _ = std::fs::create_dir_all(parent);
            }
            bindings.write_to_file(header);
        }
        Err(e) => println!("cargo:warning=C header not generated: {}", e),
    }
}
