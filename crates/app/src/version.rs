use std::fmt;

use serde::Serialize;

/// Build metadata stamped in by `build.rs`
#[derive(Debug, Clone, Serialize)]
pub struct BuildInfo {
    pub version: String,
    pub repo_version: String,
    pub build_profile: String,
    pub build_timestamp: String,
    pub rust_version: String,
    pub build_target: Option<String>,
}

pub fn build_info() -> BuildInfo {
    BuildInfo {
        version: env!("CARGO_PKG_VERSION").to_string(),
        repo_version: env!("REPO_VERSION").to_string(),
        build_profile: env!("BUILD_PROFILE").to_string(),
        build_timestamp: env!("BUILD_TIMESTAMP").to_string(),
        rust_version: env!("RUST_VERSION").to_string(),
        build_target: option_env!("BUILD_TARGET").map(str::to_string),
    }
}

impl fmt::Display for BuildInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "nfsrods {} ({}, {} build, {}, built {})",
            self.version,
            self.repo_version,
            self.build_profile,
            self.rust_version,
            self.build_timestamp
        )?;
        if let Some(target) = &self.build_target {
            write!(f, " for {}", target)?;
        }
        Ok(())
    }
}
