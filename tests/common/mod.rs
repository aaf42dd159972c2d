//! Common test utilities and fixtures

pub mod fixtures;

use std::path::PathBuf;

/// Get the path to test fixtures directory
pub fn fixtures_path() -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("common");
    path.push("fixtures");
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixtures_path() {
        let path = fixtures_path();
        assert!(path.ends_with("tests/common/fixtures"));
        assert!(path.join("config.json").exists());
    }
}
