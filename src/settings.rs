//! Run settings and preferences
//!
//! Native builds read `HALLOWEEN_RUN_*` environment variables; the web build
//! reads LocalStorage and lets URL query parameters override it.

use serde::{Deserialize, Serialize};

/// Which agent drives headless and demo play
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum PolicyKind {
    Random,
    #[default]
    Dodge,
}

impl PolicyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PolicyKind::Random => "random",
            PolicyKind::Dodge => "dodge",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "random" | "rand" => Some(PolicyKind::Random),
            "dodge" | "heuristic" => Some(PolicyKind::Dodge),
            _ => None,
        }
    }
}

/// Settings/preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Spawner seed; `None` draws one from OS entropy (native) or the clock (web)
    pub seed: Option<u64>,
    /// Run without an on-screen surface
    pub headless: bool,

    // === Headless agent runs ===
    pub episodes: u32,
    /// Episodes longer than this are cut off (0 = unlimited)
    pub max_steps: u64,
    pub policy: PolicyKind,

    // === Storage ===
    pub high_score_path: String,
    /// Optional JSON tuning override
    pub tuning_path: Option<String>,

    // === HUD ===
    pub show_fps: bool,

    // === Audio ===
    /// Master volume (0.0 - 1.0)
    pub master_volume: f32,
    pub muted: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            seed: None,
            headless: false,

            episodes: 10,
            max_steps: 100_000,
            policy: PolicyKind::Dodge,

            high_score_path: "highscore.json".to_string(),
            tuning_path: None,

            show_fps: false,

            master_volume: 0.8,
            muted: false,
        }
    }
}

/// Truthy flag values ("1", "true", "yes", "on")
pub fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

impl Settings {
    /// Environment variable prefix
    pub const ENV_PREFIX: &'static str = "HALLOWEEN_RUN_";

    /// Build settings from a key lookup (keys without the prefix, e.g. `SEED`).
    /// Unparseable values are logged and ignored.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut settings = Self::default();
        settings.apply_lookup(lookup);
        settings
    }

    /// Override fields from a key lookup
    pub fn apply_lookup(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        fn parsed<T: std::str::FromStr>(key: &str, raw: &str) -> Option<T> {
            let value = raw.trim().parse().ok();
            if value.is_none() {
                log::warn!("Ignoring invalid {} value: {:?}", key, raw);
            }
            value
        }

        if let Some(raw) = lookup("SEED") {
            if let Some(seed) = parsed("SEED", &raw) {
                self.seed = Some(seed);
            }
        }
        if let Some(raw) = lookup("HEADLESS") {
            match parse_flag(&raw) {
                Some(flag) => self.headless = flag,
                None => log::warn!("Ignoring invalid HEADLESS value: {:?}", raw),
            }
        }
        if let Some(raw) = lookup("EPISODES") {
            if let Some(episodes) = parsed("EPISODES", &raw) {
                self.episodes = episodes;
            }
        }
        if let Some(raw) = lookup("MAX_STEPS") {
            if let Some(max_steps) = parsed("MAX_STEPS", &raw) {
                self.max_steps = max_steps;
            }
        }
        if let Some(raw) = lookup("POLICY") {
            match PolicyKind::parse(&raw) {
                Some(policy) => self.policy = policy,
                None => log::warn!("Ignoring invalid POLICY value: {:?}", raw),
            }
        }
        if let Some(raw) = lookup("HIGHSCORE") {
            if !raw.trim().is_empty() {
                self.high_score_path = raw.trim().to_string();
            }
        }
        if let Some(raw) = lookup("TUNING") {
            self.tuning_path = Some(raw.trim().to_string()).filter(|p| !p.is_empty());
        }
        if let Some(raw) = lookup("SHOW_FPS") {
            if let Some(flag) = parse_flag(&raw) {
                self.show_fps = flag;
            }
        }
        if let Some(raw) = lookup("VOLUME") {
            if let Some(volume) = parsed::<f32>("VOLUME", &raw) {
                self.master_volume = volume.clamp(0.0, 1.0);
            }
        }
        if let Some(raw) = lookup("MUTED") {
            if let Some(flag) = parse_flag(&raw) {
                self.muted = flag;
            }
        }
    }

    /// Settings from `HALLOWEEN_RUN_*` environment variables (native)
    #[cfg(not(target_arch = "wasm32"))]
    pub fn from_env() -> Self {
        let settings =
            Self::from_lookup(|key| std::env::var(format!("{}{}", Self::ENV_PREFIX, key)).ok());
        log::info!("Settings: {:?}", settings);
        settings
    }

    /// Load the tuning override if one is configured, defaults otherwise
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load_tuning(&self) -> Result<crate::Tuning, crate::TuningError> {
        match &self.tuning_path {
            Some(path) => crate::Tuning::load(path),
            None => Ok(crate::Tuning::default()),
        }
    }

    /// Effective volume (0 when muted)
    pub fn effective_volume(&self) -> f32 {
        if self.muted { 0.0 } else { self.master_volume }
    }

    /// LocalStorage key
    #[allow(dead_code)]
    const STORAGE_KEY: &'static str = "halloween_run_settings";

    /// Load settings from LocalStorage, then apply `?key=value` query overrides (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn load() -> Self {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        let mut settings = storage
            .and_then(|s| s.get_item(Self::STORAGE_KEY).ok().flatten())
            .and_then(|json| serde_json::from_str::<Settings>(&json).ok())
            .unwrap_or_else(|| {
                log::info!("Using default settings");
                Self::default()
            });

        let query = web_sys::window()
            .and_then(|w| w.location().search().ok())
            .and_then(|search| web_sys::UrlSearchParams::new_with_str(&search).ok());
        if let Some(params) = query {
            settings.apply_lookup(|key| params.get(&key.to_lowercase()));
        }
        settings
    }

    /// Save settings to LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn save(&self) {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(json) = serde_json::to_string(self) {
                let _ = storage.set_item(Self::STORAGE_KEY, &json);
                log::info!("Settings saved");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_vars() {
        assert_eq!(Settings::from_lookup(|_| None), Settings::default());
    }

    #[test]
    fn test_parses_vars() {
        let settings = Settings::from_lookup(lookup(&[
            ("SEED", "1234"),
            ("HEADLESS", "1"),
            ("EPISODES", "3"),
            ("MAX_STEPS", "500"),
            ("POLICY", "Random"),
            ("HIGHSCORE", "/tmp/hs.json"),
            ("TUNING", "tuning.json"),
            ("VOLUME", "1.7"),
            ("MUTED", "yes"),
        ]));
        assert_eq!(settings.seed, Some(1234));
        assert!(settings.headless);
        assert_eq!(settings.episodes, 3);
        assert_eq!(settings.max_steps, 500);
        assert_eq!(settings.policy, PolicyKind::Random);
        assert_eq!(settings.high_score_path, "/tmp/hs.json");
        assert_eq!(settings.tuning_path.as_deref(), Some("tuning.json"));
        assert_eq!(settings.master_volume, 1.0);
        assert_eq!(settings.effective_volume(), 0.0);
    }

    #[test]
    fn test_invalid_values_keep_defaults() {
        let settings = Settings::from_lookup(lookup(&[
            ("SEED", "abc"),
            ("HEADLESS", "maybe"),
            ("EPISODES", "-1"),
            ("POLICY", "genius"),
        ]));
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_parse_flag() {
        assert_eq!(parse_flag("TRUE"), Some(true));
        assert_eq!(parse_flag(" on "), Some(true));
        assert_eq!(parse_flag("0"), Some(false));
        assert_eq!(parse_flag("2"), None);
    }

    #[test]
    fn test_policy_names() {
        for kind in [PolicyKind::Random, PolicyKind::Dodge] {
            assert_eq!(PolicyKind::parse(kind.as_str()), Some(kind));
        }
    }
}
