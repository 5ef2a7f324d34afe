use std::env;
use std::path::PathBuf;

// ffmpeg-sys-next finds FFmpeg through pkg-config everywhere except Windows,
// where it needs FFMPEG_DIR. Point at a vcpkg install when one is present.
fn main() {
    for variable in ["FFMPEG_DIR", "VCPKG_ROOT", "VCPKGRS_TRIPLET"] {
        println!("cargo:rerun-if-env-changed={variable}");
    }

    if env::var("CARGO_CFG_TARGET_OS").as_deref() != Ok("windows")
        || env::var_os("FFMPEG_DIR").is_some()
    {
        return;
    }

    let Some(vcpkg_root) = env::var_os("VCPKG_ROOT") else {
        println!("cargo:warning=clipgif: set FFMPEG_DIR to an FFmpeg install to build on Windows");
        return;
    };

    let triplet = env::var("VCPKGRS_TRIPLET").unwrap_or_else(|_| "x64-windows".to_string());
    let candidate = PathBuf::from(vcpkg_root).join("installed").join(triplet);
    if candidate.join("include").join("libavformat").is_dir() {
        println!(
            "cargo:warning=clipgif: found FFmpeg under {}; export FFMPEG_DIR to that path",
            candidate.display()
        );
    } else {
        println!(
            "cargo:warning=clipgif: no FFmpeg headers under {}",
            candidate.display()
        );
    }
}
