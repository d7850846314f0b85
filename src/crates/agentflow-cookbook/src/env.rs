//! Typed environment-variable readers
//!
//! Unset and empty variables fall back to the provided default; unparseable
//! values are logged at WARN and fall back rather than aborting, matching the
//! tolerant posture of the storage selector.

use std::str::FromStr;

/// Trimmed value of `name`, or `None` when unset or empty
pub fn get_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Value of `name`, or `default` when unset or empty
pub fn get_env_or(name: &str, default: &str) -> String {
    get_env(name).unwrap_or_else(|| default.to_string())
}

/// Parsed value of `name`, or `default` when unset or unparseable
pub fn get_env_parse<T>(name: &str, default: T) -> T
where
    T: FromStr,
{
    match get_env(name) {
        Some(raw) => match raw.parse() {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!(var = name, value = %raw, "unparseable value, using default");
                default
            }
        },
        None => default,
    }
}

/// Boolean value of `name`: true/false, yes/no, on/off, 1/0
pub fn get_env_bool(name: &str, default: bool) -> bool {
    match get_env(name) {
        Some(raw) => match raw.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" => false,
            other => {
                tracing::warn!(var = name, value = other, "unrecognized boolean, using default");
                default
            }
        },
        None => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn lock_env() -> std::sync::MutexGuard<'static, ()> {
        ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    #[test]
    fn test_get_env_ignores_empty() {
        let _guard = lock_env();
        std::env::set_var("COOKBOOK_TEST_EMPTY", "   ");
        assert!(get_env("COOKBOOK_TEST_EMPTY").is_none());
        std::env::remove_var("COOKBOOK_TEST_EMPTY");
    }

    #[test]
    fn test_get_env_or_default() {
        let _guard = lock_env();
        std::env::remove_var("COOKBOOK_TEST_MISSING");
        assert_eq!(get_env_or("COOKBOOK_TEST_MISSING", "fallback"), "fallback");
    }

    #[test]
    fn test_get_env_parse_falls_back_on_garbage() {
        let _guard = lock_env();
        std::env::set_var("COOKBOOK_TEST_NUM", "not-a-number");
        assert_eq!(get_env_parse("COOKBOOK_TEST_NUM", 7usize), 7);

        std::env::set_var("COOKBOOK_TEST_NUM", "42");
        assert_eq!(get_env_parse("COOKBOOK_TEST_NUM", 7usize), 42);
        std::env::remove_var("COOKBOOK_TEST_NUM");
    }

    #[test]
    fn test_get_env_bool_variants() {
        let _guard = lock_env();
        for (raw, expected) in [("true", true), ("YES", true), ("on", true), ("1", true),
                                 ("false", false), ("no", false), ("OFF", false), ("0", false)] {
            std::env::set_var("COOKBOOK_TEST_BOOL", raw);
            assert_eq!(get_env_bool("COOKBOOK_TEST_BOOL", !expected), expected, "value: {raw}");
        }

        std::env::set_var("COOKBOOK_TEST_BOOL", "maybe");
        assert!(get_env_bool("COOKBOOK_TEST_BOOL", true));
        std::env::remove_var("COOKBOOK_TEST_BOOL");
    }
}
