use std::env;

fn main() {
    println!("cargo:rerun-if-env-changed=BRAILAB_WRAPPER_LIB_DIR");

    if env::var_os("CARGO_FEATURE_NATIVE_ENGINE").is_none() {
        return;
    }

    if let Ok(dir) = env::var("BRAILAB_WRAPPER_LIB_DIR") {
        if !dir.is_empty() {
            println!("cargo:rustc-link-search=native={dir}");
        }
    }

    if let Ok(target) = env::var("CARGO_CFG_TARGET_OS") {
        if target != "windows" {
            println!("cargo:warning=native-engine targets the Windows brailab_wrapper library");
        }
    }
}
