//! Environment loading.

use std::path::Path;

/// Files read at startup, highest precedence first. Variables already set in
/// the process environment are never overridden.
const ENV_FILES: &[&str] = &[".env.local", ".env"];

/// Loads `.env.local` then `.env` from the working directory.
///
/// Runs before logging is set up, so failures are returned for the caller
/// to report.
pub fn load_env() -> Vec<String> {
    load_from(Path::new("."))
}

fn load_from(dir: &Path) -> Vec<String> {
    let mut failures = Vec::new();
    for file in ENV_FILES {
        let path = dir.join(file);
        if !path.exists() {
            continue;
        }
        if let Err(err) = dotenvy::from_path(&path) {
            failures.push(format!("{}: {err}", path.display()));
        }
    }
    failures
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_files_are_not_failures() {
        let dir = std::env::temp_dir().join(format!("chat-adapter-cli-{}", std::process::id()));
        assert!(load_from(&dir).is_empty());
    }
}
