use std::time::{Duration, SystemTime};

/// Current UNIX time in seconds.
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_secs()
}

/// Top-level module a path belongs to: the first directory below `src/`
/// (or below the root), `"."` for files at the top.
pub fn module_of(path: &str) -> &str {
    let trimmed = path.strip_prefix("src/").unwrap_or(path);
    match trimmed.split_once('/') {
        Some((module, _)) => module,
        None => ".",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_of() {
        assert_eq!(module_of("src/billing/invoice.ts"), "billing");
        assert_eq!(module_of("lib/db.js"), "lib");
        assert_eq!(module_of("src/index.ts"), ".");
        assert_eq!(module_of("README.md"), ".");
    }
}
