use std::path::PathBuf;

// ---------------------------------------------------------------------------
// ScoutConfig — env-var configuration surface for the extraction pipeline
// ---------------------------------------------------------------------------

pub const ENV_PROXY_URL: &str = "PROXY_URL";
pub const ENV_HEADLESS: &str = "HEADLESS";
pub const ENV_CHROME_EXECUTABLE: &str = "CHROME_EXECUTABLE";
pub const ENV_SESSION_CAPACITY: &str = "AWARD_SCOUT_CAPACITY";
pub const ENV_SHOT_DIR: &str = "AWARD_SCOUT_SHOT_DIR";

/// How many browser sessions may run at once. Observed safe value for a small
/// VPS driving a full Chromium per request.
pub const DEFAULT_SESSION_CAPACITY: usize = 2;

#[derive(Debug, Clone)]
pub struct ScoutConfig {
    /// Run the browser headless. Defaults to `false`: the target site is far
    /// less suspicious of a headed browser (under Xvfb on a server).
    pub headless: bool,
    /// Forward proxy URL. Applied only when the scheme is `http*` or `socks*`;
    /// anything else (or blank) means a direct connection.
    pub proxy_url: Option<String>,
    /// Explicit browser binary. `None` → auto-discovery.
    pub chrome_executable: Option<String>,
    /// Concurrency gate capacity, fixed for the process lifetime.
    pub session_capacity: usize,
    /// Where screenshot artifacts are written.
    pub shot_dir: PathBuf,
}

impl Default for ScoutConfig {
    fn default() -> Self {
        Self {
            headless: false,
            proxy_url: None,
            chrome_executable: None,
            session_capacity: DEFAULT_SESSION_CAPACITY,
            shot_dir: std::env::temp_dir().join("award-scout-shots"),
        }
    }
}

impl ScoutConfig {
    /// Build a config from the process environment. Missing or blank
    /// variables fall back to the defaults above.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(v) = std::env::var(ENV_HEADLESS) {
            cfg.headless = parse_bool(&v);
        }
        if let Ok(v) = std::env::var(ENV_PROXY_URL) {
            let v = v.trim();
            if !v.is_empty() {
                cfg.proxy_url = Some(v.to_string());
            }
        }
        if let Ok(v) = std::env::var(ENV_CHROME_EXECUTABLE) {
            let v = v.trim();
            if !v.is_empty() {
                cfg.chrome_executable = Some(v.to_string());
            }
        }
        if let Ok(v) = std::env::var(ENV_SESSION_CAPACITY) {
            if let Ok(n) = v.trim().parse::<usize>() {
                if n > 0 {
                    cfg.session_capacity = n;
                }
            }
        }
        if let Ok(v) = std::env::var(ENV_SHOT_DIR) {
            let v = v.trim();
            if !v.is_empty() {
                cfg.shot_dir = PathBuf::from(v);
            }
        }

        cfg
    }
}

fn parse_bool(v: &str) -> bool {
    matches!(
        v.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bool_parsing_accepts_common_spellings() {
        assert!(parse_bool("1"));
        assert!(parse_bool("TRUE"));
        assert!(parse_bool(" yes "));
        assert!(!parse_bool("0"));
        assert!(!parse_bool(""));
        assert!(!parse_bool("False"));
    }

    #[test]
    fn default_capacity_is_two() {
        assert_eq!(ScoutConfig::default().session_capacity, 2);
    }
}
