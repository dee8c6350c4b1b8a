use std::env;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

/// Main configuration structure for aiforge
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Hosted AI provider configuration
    #[serde(default)]
    pub provider: ProviderSettings,

    /// Code generation configuration
    #[serde(default)]
    pub codegen: CodeGenSettings,

    /// Enable debug logging
    #[serde(default)]
    pub debug: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSettings {
    /// Provider to use ("openai" is the only one shipped)
    #[serde(default = "default_provider")]
    pub name: String,

    /// Model to request
    #[serde(default = "default_model")]
    pub model: String,

    /// API key, usually supplied through the environment
    #[serde(default)]
    pub api_key: Option<String>,

    /// Maximum tokens in a response
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Sampling temperature (0.0 to 2.0)
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeGenSettings {
    /// Output directory for generated files
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Directory containing the template catalog
    #[serde(default = "default_template_dir")]
    pub template_dir: String,

    /// Target language when none is given on the command line
    #[serde(default = "default_language")]
    pub default_language: String,

    /// Languages accepted by the generator
    #[serde(default = "default_supported_languages")]
    pub supported_languages: Vec<String>,
}

// Default value functions
fn default_provider() -> String { "openai".to_string() }
fn default_model() -> String { "gpt-4o-mini".to_string() }
fn default_max_tokens() -> u32 { 1000 }
fn default_temperature() -> f32 { 0.7 }
fn default_output_dir() -> String { "./generated".to_string() }
fn default_template_dir() -> String { "./templates".to_string() }
fn default_language() -> String { "python".to_string() }
fn default_supported_languages() -> Vec<String> {
    ["python", "javascript", "typescript", "java", "cpp", "csharp", "go", "rust"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Default for ProviderSettings {
    fn default() -> Self {
        ProviderSettings {
            name: default_provider(),
            model: default_model(),
            api_key: None,
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
        }
    }
}

impl Default for CodeGenSettings {
    fn default() -> Self {
        CodeGenSettings {
            output_dir: default_output_dir(),
            template_dir: default_template_dir(),
            default_language: default_language(),
            supported_languages: default_supported_languages(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            provider: ProviderSettings::default(),
            codegen: CodeGenSettings::default(),
            debug: false,
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))
    }

    /// Load configuration from an explicit path or the default locations,
    /// then apply environment overrides and validate the result.
    pub fn load(config_path: &Option<String>) -> Result<Self> {
        let mut config = match config_path {
            Some(path) => Self::from_file(path)?,
            None => Self::load_default_locations(),
        };
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    fn load_default_locations() -> Self {
        let default_paths = [
            "aiforge.yaml",
            ".aiforge.yaml",
            "~/.config/aiforge/config.yaml",
        ];

        for path in default_paths {
            let expanded_path = shellexpand::tilde(path);
            if Path::new(expanded_path.as_ref()).exists() {
                match Self::from_file(expanded_path.as_ref()) {
                    Ok(config) => return config,
                    Err(e) => eprintln!("Warning: Failed to load config from {}: {}", path, e),
                }
            }
        }

        Self::default()
    }

    /// Environment variables take precedence over file values.
    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(provider) = env::var("AIFORGE_PROVIDER") {
            self.provider.name = provider;
        }
        if let Ok(model) = env::var("AIFORGE_MODEL") {
            self.provider.model = model;
        }
        if let Ok(key) = env::var("OPENAI_API_KEY") {
            self.provider.api_key = Some(key);
        }
        if let Ok(tokens) = env::var("AIFORGE_MAX_TOKENS") {
            self.provider.max_tokens = tokens
                .parse()
                .context("AIFORGE_MAX_TOKENS must be an integer")?;
        }
        if let Ok(temperature) = env::var("AIFORGE_TEMPERATURE") {
            self.provider.temperature = temperature
                .parse()
                .context("AIFORGE_TEMPERATURE must be a number")?;
        }
        if let Ok(dir) = env::var("AIFORGE_OUTPUT_DIR") {
            self.codegen.output_dir = dir;
        }
        if let Ok(dir) = env::var("AIFORGE_TEMPLATE_DIR") {
            self.codegen.template_dir = dir;
        }
        if let Ok(language) = env::var("AIFORGE_LANGUAGE") {
            self.codegen.default_language = language;
        }
        if let Ok(debug) = env::var("AIFORGE_DEBUG") {
            self.debug = debug.eq_ignore_ascii_case("true");
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.provider.max_tokens == 0 {
            bail!("max_tokens must be greater than zero");
        }
        if !(0.0..=2.0).contains(&self.provider.temperature) {
            bail!(
                "temperature must be between 0.0 and 2.0, got {}",
                self.provider.temperature
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.provider.name, "openai");
        assert_eq!(config.provider.max_tokens, 1000);
        assert_eq!(config.codegen.default_language, "python");
        assert!(config.codegen.supported_languages.contains(&"rust".to_string()));
        assert!(!config.debug);
    }

    #[test]
    fn test_validate_rejects_zero_max_tokens() {
        let mut config = Config::default();
        config.provider.max_tokens = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_out_of_range_temperature() {
        let mut config = Config::default();
        config.provider.temperature = 2.5;
        assert!(config.validate().is_err());

        config.provider.temperature = -0.1;
        assert!(config.validate().is_err());

        config.provider.temperature = 2.0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_partial_yaml() {
        let yaml = "provider:\n  model: gpt-4o\ncodegen:\n  default_language: rust\n";
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.provider.model, "gpt-4o");
        assert_eq!(config.provider.name, "openai");
        assert_eq!(config.codegen.default_language, "rust");
        assert_eq!(config.codegen.output_dir, "./generated");
    }
}
