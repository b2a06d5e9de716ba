use std::path::Path;
use std::time::Duration;

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com";
/// Realistic desktop browser UA; some sites serve empty shells to unknown agents.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

pub(crate) fn env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

pub(crate) fn env_truthy(key: &str) -> bool {
    matches!(
        env(key).unwrap_or_default().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn env_u64(key: &str, default: u64) -> u64 {
    env(key)
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(default)
}

fn env_bool(key: &str, default: bool) -> bool {
    match env(key).map(|s| s.to_ascii_lowercase()) {
        Some(s) if matches!(s.as_str(), "1" | "true" | "yes" | "on") => true,
        Some(s) if matches!(s.as_str(), "0" | "false" | "no" | "off") => false,
        _ => default,
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub openai_base_url: String,
    pub openai_api_key: Option<String>,
    pub model_timeout: Duration,
    pub fetch_timeout: Duration,
    pub fetch_max_bytes: u64,
    pub render_timeout: Duration,
    pub render_disabled: bool,
    pub node_bin: String,
    pub node_path: Option<String>,
    /// `None` keeps the chat log unbounded.
    pub max_turns: Option<usize>,
    pub auto_summarize: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            openai_base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            openai_api_key: None,
            model_timeout: Duration::from_millis(60_000),
            fetch_timeout: Duration::from_millis(10_000),
            fetch_max_bytes: 5_000_000,
            render_timeout: Duration::from_millis(10_000),
            render_disabled: false,
            node_bin: "node".to_string(),
            node_path: None,
            max_turns: None,
            auto_summarize: true,
        }
    }
}

impl Settings {
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            openai_base_url: env("GROUNDCHAT_OPENAI_BASE_URL").unwrap_or(d.openai_base_url),
            openai_api_key: env("GROUNDCHAT_OPENAI_API_KEY").or_else(|| env("OPENAI_API_KEY")),
            model_timeout: Duration::from_millis(env_u64("GROUNDCHAT_MODEL_TIMEOUT_MS", 60_000)),
            fetch_timeout: Duration::from_millis(env_u64("GROUNDCHAT_FETCH_TIMEOUT_MS", 10_000)),
            fetch_max_bytes: env_u64("GROUNDCHAT_FETCH_MAX_BYTES", d.fetch_max_bytes),
            render_timeout: Duration::from_millis(env_u64(
                "GROUNDCHAT_RENDER_TIMEOUT_MS",
                10_000,
            )),
            render_disabled: env_truthy("GROUNDCHAT_RENDER_DISABLE"),
            node_bin: env("GROUNDCHAT_NODE").unwrap_or(d.node_bin),
            node_path: env("GROUNDCHAT_NODE_PATH"),
            max_turns: env("GROUNDCHAT_MAX_TURNS")
                .and_then(|s| s.parse::<usize>().ok())
                .filter(|n| *n > 0),
            auto_summarize: env_bool("GROUNDCHAT_AUTO_SUMMARIZE", d.auto_summarize),
        }
    }
}

/// Apply `KEY=VALUE` lines from `path`; `#` comments and malformed lines are skipped.
///
/// Never overrides a variable already present in the process environment and
/// never logs values. Returns how many variables were set.
pub fn load_env_file(path: &Path) -> usize {
    let Ok(txt) = std::fs::read_to_string(path) else {
        tracing::debug!(path = %path.display(), "env file unreadable");
        return 0;
    };
    let mut applied = 0;
    for raw in txt.lines() {
        let s = raw.trim();
        if s.is_empty() || s.starts_with('#') {
            continue;
        }
        let Some((k, v)) = s.split_once('=') else {
            continue;
        };
        let k = k.trim();
        if k.is_empty() || k.contains('\0') || v.contains('\0') {
            continue;
        }
        if std::env::var_os(k).is_none() {
            std::env::set_var(k, v.trim());
            applied += 1;
        }
    }
    applied
}

/// Opt-in: load the file named by `GROUNDCHAT_ENV_FILE`, if set.
pub fn load_env_file_from_env() -> usize {
    match env("GROUNDCHAT_ENV_FILE") {
        Some(p) => load_env_file(Path::new(&p)),
        None => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::Mutex;

    // Env vars are process-global; serialize tests that mutate them.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    const KEYS: [&str; 8] = [
        "GROUNDCHAT_OPENAI_BASE_URL",
        "GROUNDCHAT_OPENAI_API_KEY",
        "OPENAI_API_KEY",
        "GROUNDCHAT_FETCH_TIMEOUT_MS",
        "GROUNDCHAT_RENDER_DISABLE",
        "GROUNDCHAT_MAX_TURNS",
        "GROUNDCHAT_AUTO_SUMMARIZE",
        "GROUNDCHAT_NODE",
    ];

    fn clear() {
        for k in KEYS {
            std::env::remove_var(k);
        }
    }

    #[test]
    fn defaults_when_env_is_empty() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        clear();
        let s = Settings::from_env();
        assert_eq!(s.openai_base_url, DEFAULT_OPENAI_BASE_URL);
        assert_eq!(s.fetch_timeout, Duration::from_secs(10));
        assert_eq!(s.render_timeout, Duration::from_secs(10));
        assert!(s.openai_api_key.is_none());
        assert!(s.max_turns.is_none());
        assert!(s.auto_summarize);
        assert!(!s.render_disabled);
    }

    #[test]
    fn env_overrides_and_blank_values_are_ignored() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        clear();
        std::env::set_var("GROUNDCHAT_OPENAI_BASE_URL", "   ");
        std::env::set_var("OPENAI_API_KEY", "sk-fallback");
        std::env::set_var("GROUNDCHAT_FETCH_TIMEOUT_MS", "2500");
        std::env::set_var("GROUNDCHAT_RENDER_DISABLE", "yes");
        std::env::set_var("GROUNDCHAT_MAX_TURNS", "0");
        std::env::set_var("GROUNDCHAT_AUTO_SUMMARIZE", "off");
        let s = Settings::from_env();
        assert_eq!(s.openai_base_url, DEFAULT_OPENAI_BASE_URL);
        assert_eq!(s.openai_api_key.as_deref(), Some("sk-fallback"));
        assert_eq!(s.fetch_timeout, Duration::from_millis(2500));
        assert!(s.render_disabled);
        assert!(s.max_turns.is_none());
        assert!(!s.auto_summarize);

        std::env::set_var("GROUNDCHAT_OPENAI_API_KEY", "sk-primary");
        std::env::set_var("GROUNDCHAT_MAX_TURNS", "50");
        let s = Settings::from_env();
        assert_eq!(s.openai_api_key.as_deref(), Some("sk-primary"));
        assert_eq!(s.max_turns, Some(50));
        clear();
    }

    #[test]
    fn env_file_fills_gaps_without_overriding() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        clear();
        std::env::set_var("GROUNDCHAT_NODE", "/usr/bin/node-from-shell");
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            f,
            "# keys for local runs\n\
             GROUNDCHAT_OPENAI_API_KEY = sk-from-file\n\
             GROUNDCHAT_NODE=/opt/node\n\
             not a pair\n\
             =orphan\n\
             GROUNDCHAT_MAX_TURNS=7"
        )
        .unwrap();

        let applied = load_env_file(f.path());
        assert_eq!(applied, 2);
        let s = Settings::from_env();
        assert_eq!(s.openai_api_key.as_deref(), Some("sk-from-file"));
        assert_eq!(s.node_bin, "/usr/bin/node-from-shell");
        assert_eq!(s.max_turns, Some(7));
        clear();
    }

    #[test]
    fn env_file_is_opt_in_and_missing_files_are_ignored() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        clear();
        std::env::remove_var("GROUNDCHAT_ENV_FILE");
        assert_eq!(load_env_file_from_env(), 0);

        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.env");
        std::env::set_var("GROUNDCHAT_ENV_FILE", &missing);
        assert_eq!(load_env_file_from_env(), 0);
        std::env::remove_var("GROUNDCHAT_ENV_FILE");
        assert!(Settings::from_env().openai_api_key.is_none());
    }
}
