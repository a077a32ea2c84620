fn main() {
    // Release builds stamp the tag through VERSION; local builds use Cargo.toml
    let version = std::env::var("VERSION")
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map(|v| v.trim().trim_start_matches('v').to_string())
        .unwrap_or_else(|| std::env::var("CARGO_PKG_VERSION").unwrap_or_default());
    println!("cargo:rustc-env=GO_INSTALLER_VERSION={version}");
    println!("cargo:rerun-if-env-changed=VERSION");
}
