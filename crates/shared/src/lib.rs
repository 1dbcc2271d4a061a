pub mod chat;
pub mod reply;

pub mod settings {
    use serde::{Deserialize, Serialize};
    use std::env;
    use std::fs;
    use std::path::{Path, PathBuf};

    fn default_model() -> String {
        "gemini-2.5-flash".into()
    }

    fn default_timeout_secs() -> u64 {
        120
    }

    fn default_storage_slot() -> String {
        "chatHistory".into()
    }

    fn default_true() -> bool {
        true
    }

    #[derive(Debug, Clone, Default, Serialize, Deserialize)]
    pub struct ProviderAuth {
        pub api_key: Option<String>,
    }

    impl ProviderAuth {
        /// Configured key, falling back to `GEMINI_API_KEY` then `API_KEY`.
        pub fn resolve_api_key(&self) -> Option<String> {
            self.api_key
                .clone()
                .filter(|k| !k.trim().is_empty())
                .or_else(|| env::var("GEMINI_API_KEY").ok())
                .or_else(|| env::var("API_KEY").ok())
                .filter(|k| !k.trim().is_empty())
        }
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct AppSettings {
        #[serde(default = "default_model")]
        pub gemini_model: String, // e.g., "gemini-2.5-flash"
        #[serde(default)]
        pub gemini_auth: ProviderAuth,
        /// Client-side deadline for one request; 0 disables it
        #[serde(default = "default_timeout_secs")]
        pub request_timeout_secs: u64,
        /// Key-value slot the conversation is persisted under
        #[serde(default = "default_storage_slot")]
        pub storage_slot: String,
        #[serde(default = "default_true")]
        pub dark_mode: bool,
    }

    impl Default for AppSettings {
        fn default() -> Self {
            Self {
                gemini_model: default_model(),
                gemini_auth: ProviderAuth::default(),
                request_timeout_secs: default_timeout_secs(),
                storage_slot: default_storage_slot(),
                dark_mode: true,
            }
        }
    }

    impl AppSettings {
        pub fn request_timeout(&self) -> Option<std::time::Duration> {
            (self.request_timeout_secs > 0)
                .then(|| std::time::Duration::from_secs(self.request_timeout_secs))
        }
    }

    /// Per-user config directory for the app.
    pub fn config_dir() -> Option<PathBuf> {
        directories::ProjectDirs::from("com.local", "Risenova", "Risenova")
            .map(|p| p.config_dir().to_path_buf())
    }

    pub fn settings_path() -> Option<PathBuf> {
        config_dir().map(|d| d.join("settings.json"))
    }

    /// Load settings from disk, using defaults when missing or unreadable.
    pub fn load_settings_or_default() -> AppSettings {
        match settings_path() {
            Some(path) => load_settings_from(&path),
            None => AppSettings::default(),
        }
    }

    pub fn load_settings_from(path: &Path) -> AppSettings {
        match fs::read(path) {
            Ok(bytes) => match serde_json::from_slice::<AppSettings>(&bytes) {
                Ok(settings) => settings,
                Err(e) => {
                    tracing::warn!("Ignoring malformed settings at {}: {}", path.display(), e);
                    AppSettings::default()
                }
            },
            Err(_) => AppSettings::default(),
        }
    }

    pub fn save_settings(settings: &AppSettings) -> anyhow::Result<()> {
        let path = settings_path()
            .ok_or_else(|| anyhow::anyhow!("No config directory available"))?;
        save_settings_to(&path, settings)
    }

    pub fn save_settings_to(path: &Path, settings: &AppSettings) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_vec_pretty(settings)?)?;
        tracing::debug!("saved settings to {}", path.display());
        Ok(())
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_partial_settings_fill_defaults() {
            let s: AppSettings =
                serde_json::from_str(r#"{"gemini_model":"gemini-pro"}"#).unwrap();
            assert_eq!(s.gemini_model, "gemini-pro");
            assert_eq!(s.storage_slot, "chatHistory");
            assert_eq!(s.request_timeout_secs, 120);
            assert!(s.dark_mode);
        }

        #[test]
        fn test_zero_timeout_disables_deadline() {
            let s = AppSettings {
                request_timeout_secs: 0,
                ..Default::default()
            };
            assert!(s.request_timeout().is_none());
            assert_eq!(
                AppSettings::default().request_timeout(),
                Some(std::time::Duration::from_secs(120))
            );
        }

        #[test]
        fn test_saved_theme_survives_reload() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("nested").join("settings.json");
            let settings = AppSettings {
                dark_mode: false,
                ..Default::default()
            };

            save_settings_to(&path, &settings).unwrap();

            let loaded = load_settings_from(&path);
            assert!(!loaded.dark_mode);
            assert_eq!(loaded.gemini_model, "gemini-2.5-flash");
        }

        #[test]
        fn test_missing_or_malformed_settings_use_defaults() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("settings.json");
            assert!(load_settings_from(&path).dark_mode);

            fs::write(&path, "{ not json").unwrap();
            assert_eq!(load_settings_from(&path).storage_slot, "chatHistory");
        }

        #[test]
        fn test_configured_key_wins() {
            let auth = ProviderAuth {
                api_key: Some("from-settings".into()),
            };
            assert_eq!(auth.resolve_api_key().as_deref(), Some("from-settings"));
        }
    }
}
