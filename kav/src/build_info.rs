//! Build information: package version, git commit, build time, rustc, target.

#[cfg(feature = "build-info")]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

/// Multi-line version report printed by `kav version`.
///
/// ```text
/// kav 0.3.0 (x86_64-unknown-linux-gnu)
/// Built: Sun, 18 Oct 2026 09:12:44 +0000
/// Commit: a1b2c3d
/// Rustc: rustc 1.82.0
/// ```
#[cfg(feature = "build-info")]
pub fn version_info() -> String {
    format!(
        "{} {} ({})\nBuilt: {}\nCommit: {}\nRustc: {}",
        built_info::PKG_NAME,
        built_info::PKG_VERSION,
        built_info::TARGET,
        built_info::BUILT_TIME_UTC,
        built_info::GIT_COMMIT_HASH_SHORT.unwrap_or("unknown"),
        built_info::RUSTC_VERSION
    )
}

#[cfg(feature = "build-info")]
pub fn version_short() -> &'static str {
    built_info::PKG_VERSION
}

#[cfg(not(feature = "build-info"))]
pub fn version_info() -> String {
    format!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
}

#[cfg(not(feature = "build-info"))]
pub fn version_short() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_info_starts_with_name_and_version() {
        let info = version_info();
        assert!(info.starts_with(&format!("kav {}", env!("CARGO_PKG_VERSION"))));
    }

    #[test]
    fn test_version_short_matches_manifest() {
        assert_eq!(version_short(), env!("CARGO_PKG_VERSION"));
    }
}
