//! Locates the `ada_rt` static library so it can be embedded into the
//! compiler binary, the same way the runtime would be embedded in a
//! production toolchain distribution.

use std::env;
use std::fs;
use std::path::PathBuf;

fn main() {
    verify_runtime_version();
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());

    // OUT_DIR = target/<profile>/build/<pkg>-<hash>/out
    let target_dir = out_dir
        .parent()
        .and_then(|p| p.parent())
        .and_then(|p| p.parent())
        .expect("could not find target directory");

    let direct_lib = target_dir.join("libada_rt.a");

    let runtime_lib = if direct_lib.exists() {
        direct_lib
    } else {
        let deps_dir = target_dir.join("deps");
        find_runtime_in_deps(&deps_dir).unwrap_or_else(|| {
            panic!(
                "ada_rt static library not found.\nLooked in: {}\nAnd deps: {}\nOUT_DIR was: {}",
                direct_lib.display(),
                deps_dir.display(),
                out_dir.display()
            )
        })
    };

    println!(
        "cargo:rustc-env=ADA_RUNTIME_LIB_PATH={}",
        runtime_lib.display()
    );
    println!("cargo:rerun-if-changed={}", runtime_lib.display());
}

fn find_runtime_in_deps(deps_dir: &PathBuf) -> Option<PathBuf> {
    if !deps_dir.exists() {
        return None;
    }
    fs::read_dir(deps_dir).ok()?.find_map(|entry| {
        let entry = entry.ok()?;
        let name = entry.file_name();
        let name_str = name.to_string_lossy();
        if name_str.starts_with("libada_rt") && name_str.ends_with(".a") {
            Some(entry.path())
        } else {
            None
        }
    })
}

/// The embedded runtime must match the compiler's version so published
/// packages can't silently drift apart.
fn verify_runtime_version() {
    let compiler_version = env!("CARGO_PKG_VERSION");
    let cargo_toml = fs::read_to_string("Cargo.toml").expect("failed to read compiler/Cargo.toml");

    let runtime_version = cargo_toml
        .lines()
        .find(|line| line.contains("ada-rt") && line.contains("version"))
        .and_then(|line| line.split("version = \"").nth(1))
        .and_then(|s| s.split('"').next());

    let Some(runtime_version) = runtime_version else {
        // No pinned path dependency on ada-rt in this Cargo.toml yet; nothing to verify.
        return;
    };
    let runtime_version = runtime_version.trim_start_matches('=');

    if compiler_version != runtime_version {
        panic!(
            "\nVERSION MISMATCH: adac {compiler_version} vs ada-rt {runtime_version}.\n\
             Pin ada-rt in compiler/Cargo.toml to version = \"={compiler_version}\".\n"
        );
    }
}
