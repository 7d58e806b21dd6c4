//! Build metadata embedded by `build.rs`, reported by `/health` and logged at startup.

/// Short git commit hash, or `unknown` outside a checkout.
pub const GIT_HASH: &str = env!("CTBOT_GIT_HASH");

/// Build time as seconds since the Unix epoch.
pub const BUILD_TIMESTAMP: &str = env!("CTBOT_BUILD_TIMESTAMP");

/// Cargo profile the binary was built with.
pub const BUILD_PROFILE: &str = env!("CTBOT_BUILD_PROFILE");

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// `"<version> (<hash>, <profile>)"`, e.g. `"0.1.0 (abc1234, release)"`.
pub fn version_string() -> String {
    format!("{VERSION} ({GIT_HASH}, {BUILD_PROFILE})")
}

/// Build time as a UTC timestamp, if the embedded value parses.
pub fn built_at() -> Option<chrono::DateTime<chrono::Utc>> {
    BUILD_TIMESTAMP
        .parse::<i64>()
        .ok()
        .and_then(|secs| chrono::DateTime::from_timestamp(secs, 0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_string_contains_parts() {
        let v = version_string();
        assert!(v.starts_with(VERSION));
        assert!(v.contains(GIT_HASH));
        assert!(v.contains(BUILD_PROFILE));
    }

    #[test]
    fn test_built_at_parses() {
        let built = built_at().expect("build timestamp should be numeric");
        assert!(built.timestamp() > 0);
    }
}
