//! Build script for the Clovord desktop shell
//!
//! Runs the Tauri build step only when the desktop shell is being built;
//! the update core compiles and tests without it.

fn main() {
    #[cfg(feature = "desktop")]
    tauri_build::build();

    println!("cargo:rerun-if-changed=tauri.conf.json");
    println!("cargo:rerun-if-changed=build.rs");
}
