use directories::BaseDirs;
use serde::Deserialize;
use std::{env, fs, path::PathBuf};
use tracing::warn;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

pub const DEFAULT_SYSTEM_INSTRUCTION: &str = "You are a supportive well-being companion. Offer empathetic emotional support, stress management techniques, and well-being tips in a calm, supportive tone. If a user expresses crisis or self-harm intent, provide crisis hotline resources and strongly urge professional help. When a user greets you, say who you are and ask how they are feeling. If a user asks about a specific topic, provide information and resources. Always prioritize user safety and well-being.";

#[derive(Clone, Debug, Default, Deserialize)]
pub struct GeminiFileConfig {
    pub base_url: Option<String>,
    pub system_instruction: Option<String>,
}

/// Process-wide settings, built once in `main` and handed to the client.
#[derive(Clone, Debug)]
pub struct GeminiConfig {
    /// `None` disables every network call; requests then resolve to a fixed
    /// explanatory message instead of failing.
    pub api_key: Option<String>,
    pub base_url: String,
    pub system_instruction: String,
    pub proxy: Option<String>,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            system_instruction: DEFAULT_SYSTEM_INSTRUCTION.to_string(),
            proxy: None,
        }
    }
}

impl GeminiConfig {
    pub fn from_env_and_file() -> Self {
        let mut cfg = GeminiConfig {
            api_key: env::var("GEMINI_API_KEY")
                .ok()
                .filter(|k| !k.trim().is_empty()),
            ..GeminiConfig::default()
        };
        if cfg.api_key.is_none() {
            warn!(target: "providers::gemini", "GEMINI_API_KEY is not set; chat requests will be answered locally");
        }

        if let Some(path) = Self::config_path() {
            if path.exists() {
                match fs::read_to_string(&path) {
                    Ok(text) => match toml::from_str::<GeminiFileConfig>(&text) {
                        Ok(file_cfg) => cfg.apply_file(file_cfg),
                        Err(e) => {
                            warn!(target: "providers::gemini", "ignoring malformed {}: {}", path.display(), e)
                        }
                    },
                    Err(e) => {
                        warn!(target: "providers::gemini", "cannot read {}: {}", path.display(), e)
                    }
                }
            }
        }

        if let Ok(url) = env::var("GEMINI_BASE_URL") {
            cfg.base_url = url;
        }
        cfg.proxy = env::var("HTTPS_PROXY")
            .ok()
            .or_else(|| env::var("HTTP_PROXY").ok());
        cfg
    }

    pub fn apply_file(&mut self, file_cfg: GeminiFileConfig) {
        if let Some(u) = file_cfg.base_url {
            self.base_url = u;
        }
        if let Some(s) = file_cfg.system_instruction {
            if !s.trim().is_empty() {
                self.system_instruction = s;
            }
        }
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    fn config_path() -> Option<PathBuf> {
        let base = BaseDirs::new()?;
        Some(base.config_dir().join("gemchat").join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_values_override_defaults() {
        let mut cfg = GeminiConfig::default();
        let file: GeminiFileConfig = toml::from_str(
            r#"
            base_url = "http://localhost:8080"
            system_instruction = "Be brief."
            "#,
        )
        .unwrap();
        cfg.apply_file(file);
        assert_eq!(cfg.base_url, "http://localhost:8080");
        assert_eq!(cfg.system_instruction, "Be brief.");
        assert!(!cfg.has_api_key());
    }

    #[test]
    fn blank_instruction_keeps_default() {
        let mut cfg = GeminiConfig::default();
        cfg.apply_file(GeminiFileConfig {
            base_url: None,
            system_instruction: Some("  ".into()),
        });
        assert_eq!(cfg.system_instruction, DEFAULT_SYSTEM_INSTRUCTION);
        assert_eq!(cfg.base_url, DEFAULT_BASE_URL);
    }
}
