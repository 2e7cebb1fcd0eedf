use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use framestory_ml::{GenerateOptions, ModelSpec};
use serde::Deserialize;

use crate::prompt::DEFAULT_STORY_PROMPT;

/// Picked up from the working directory when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = "framestory.toml";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Vision-language model describing each frame.
    pub metadata_model: ModelSpec,
    /// Seq2seq model writing the story and its title.
    pub story_model: ModelSpec,
    pub image_folder: PathBuf,
    pub output_folder: PathBuf,
    pub story_prompt: String,
    pub seed: u64,
    pub cpu: bool,
    pub cache_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            metadata_model: ModelSpec::new("vikhyatk/moondream2", "2024-03-06"),
            story_model: ModelSpec::new("google/flan-t5-large", "main"),
            image_folder: PathBuf::from("images"),
            output_folder: PathBuf::from("outputs"),
            story_prompt: DEFAULT_STORY_PROMPT.to_string(),
            seed: GenerateOptions::default().seed,
            cpu: false,
            cache_dir: None,
        }
    }
}

impl Config {
    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_toml(&text).with_context(|| format!("failed to parse {}", path.display()))
    }

    /// Uses `explicit` when given, else `framestory.toml` in the working
    /// directory if present, else the built-in defaults.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::load(path),
            None => {
                let path = Path::new(DEFAULT_CONFIG_FILE);
                if path.is_file() {
                    Self::load(path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Sampling for the story model: up to 512 new tokens at temperature 0.3.
    pub fn story_options(&self) -> GenerateOptions {
        GenerateOptions {
            max_new_tokens: 512,
            temperature: 0.3,
            seed: self.seed,
            ..GenerateOptions::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_stock_pipeline() {
        let config = Config::default();
        assert_eq!(config.story_model.id, "google/flan-t5-large");
        assert_eq!(config.image_folder, PathBuf::from("images"));
        assert_eq!(config.output_folder, PathBuf::from("outputs"));
        assert!(config.story_prompt.starts_with("You are a creative storyteller AI."));

        let options = config.story_options();
        assert_eq!(options.max_new_tokens, 512);
        assert_eq!(options.temperature, 0.3);
    }

    #[test]
    fn partial_file_overrides_only_named_fields() -> Result<()> {
        let config = Config::from_toml(
            r#"
            image_folder = "frames/run-1"
            seed = 7

            [story_model]
            id = "google/flan-t5-base"
            "#,
        )?;

        assert_eq!(config.image_folder, PathBuf::from("frames/run-1"));
        assert_eq!(config.story_model, ModelSpec::new("google/flan-t5-base", "main"));
        assert_eq!(config.story_options().seed, 7);
        assert_eq!(config.output_folder, Config::default().output_folder);
        assert_eq!(config.metadata_model, Config::default().metadata_model);
        Ok(())
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(Config::from_toml("image_dir = \"x\"").is_err());
    }

    #[test]
    fn load_reads_from_disk() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join(DEFAULT_CONFIG_FILE);
        std::fs::write(&path, "cpu = true\noutput_folder = \"out\"\n")?;

        let config = Config::resolve(Some(&path))?;
        assert!(config.cpu);
        assert_eq!(config.output_folder, PathBuf::from("out"));

        assert!(Config::load(&dir.path().join("missing.toml")).is_err());
        Ok(())
    }
}
