use std::env;
use std::path::PathBuf;
use std::process::Command;

fn main() {
    println!("cargo:rerun-if-env-changed=GPHOTO2_LIB_DIR");

    if env::var_os("CARGO_FEATURE_GPHOTO2").is_none() {
        return;
    }

    println!("cargo:rustc-link-lib=gphoto2");
    println!("cargo:rustc-link-lib=gphoto2_port");

    // Try to find the library in this order:
    // 1. GPHOTO2_LIB_DIR
    // 2. pkg-config
    // 3. Common system paths

    if let Ok(lib_dir) = env::var("GPHOTO2_LIB_DIR") {
        println!("cargo:rustc-link-search=native={lib_dir}");
        return;
    }

    if let Ok(output) = Command::new("pkg-config")
        .args(["--libs-only-L", "libgphoto2"])
        .output()
    {
        if output.status.success() {
            let libs = String::from_utf8_lossy(&output.stdout);
            let mut found = false;
            for path in libs.split_whitespace().filter_map(|lib| lib.strip_prefix("-L")) {
                println!("cargo:rustc-link-search=native={path}");
                found = true;
            }
            if found || libs.trim().is_empty() {
                // Empty output means the library sits on the default search path.
                return;
            }
        }
    }

    let system_paths = [
        "/usr/local/lib",
        "/usr/lib",
        "/usr/lib/x86_64-linux-gnu",
        "/usr/lib/aarch64-linux-gnu",
        "/usr/lib/arm-linux-gnueabihf",
        "/opt/homebrew/lib",
    ];

    for path in &system_paths {
        if PathBuf::from(path).join("libgphoto2.so").exists()
            || PathBuf::from(path).join("libgphoto2.dylib").exists()
        {
            println!("cargo:rustc-link-search=native={path}");
            return;
        }
    }

    println!("cargo:warning=Could not locate libgphoto2. Install its development package or set GPHOTO2_LIB_DIR.");
}
