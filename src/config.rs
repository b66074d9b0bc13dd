//! Dataset configuration.
//!
//! Every dataset lives in `<datasets-dir>/<name>/dataset.yaml`; the active one is
//! selected through [`DATASET_ENV`]. Paths inside the file are relative to it.

use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use element_resolver::{CommandRenderer, DisabledRenderer, PageRenderer};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tool_vocabulary::{ApiRenderMode, CustomApi, CustomCatalog, ToolManifest, ToolVocabulary, VocabularyError};
use tracing::info;

/// Environment variable naming the active dataset.
pub const DATASET_ENV: &str = "SOUL_DATASET";
/// Environment variable overriding the datasets directory.
pub const DATASETS_DIR_ENV: &str = "SOUL_DATASETS_DIR";
pub const DEFAULT_DATASETS_DIR: &str = "datasets";
pub const DATASET_FILE: &str = "dataset.yaml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reading {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parsing {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error(transparent)]
    Vocabulary(#[from] VocabularyError),
    #[error("invalid renderer configuration: {0}")]
    Renderer(String),
}

/// External page renderer command.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RendererConfig {
    /// Program and arguments; the HTML is piped to its stdin.
    pub command: Vec<String>,
    #[serde(default = "default_renderer_timeout")]
    pub timeout_secs: u64,
}

fn default_renderer_timeout() -> u64 {
    30
}

/// OpenAI-compatible endpoint used by `annotate`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ThoughtConfig {
    #[serde(default = "default_api_base")]
    pub api_base: String,
    pub model: String,
    /// Environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_thought_timeout")]
    pub timeout_secs: u64,
}

fn default_api_base() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_temperature() -> f32 {
    0.2
}

fn default_thought_timeout() -> u64 {
    60
}

/// Contents of `dataset.yaml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct DatasetConfig {
    #[serde(default)]
    pub name: String,
    /// Force the web context; inferred per episode when absent.
    #[serde(default)]
    pub web: Option<bool>,
    #[serde(default)]
    pub system_prompt: String,
    /// Inline tool description prepended to the first turn.
    #[serde(default)]
    pub tool_description: Option<String>,
    /// File holding the tool description; wins over the inline text.
    #[serde(default)]
    pub tool_description_file: Option<PathBuf>,
    #[serde(default)]
    pub api_render: ApiRenderMode,
    #[serde(default)]
    pub custom_apis: Vec<CustomApi>,
    /// Extra YAML catalog of custom APIs.
    #[serde(default)]
    pub custom_api_file: Option<PathBuf>,
    /// JSON tool manifest.
    #[serde(default)]
    pub tool_manifest: Option<PathBuf>,
    #[serde(default)]
    pub renderer: Option<RendererConfig>,
    #[serde(default)]
    pub thoughts: Option<ThoughtConfig>,
}

/// A dataset configuration with every referenced file loaded.
#[derive(Debug, Clone)]
pub struct LoadedDataset {
    pub config: DatasetConfig,
    pub path: PathBuf,
    pub tool_description: String,
    pub vocabulary: Arc<ToolVocabulary>,
}

impl LoadedDataset {
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Page renderer for this dataset; datasets without one fail every
    /// tree build softly.
    pub fn page_renderer(&self) -> Result<Arc<dyn PageRenderer>, ConfigError> {
        match self.config.renderer.as_ref() {
            Some(renderer) => {
                let command = CommandRenderer::from_argv(
                    &renderer.command,
                    Duration::from_secs(renderer.timeout_secs),
                )
                .map_err(|err| ConfigError::Renderer(err.to_string()))?;
                Ok(Arc::new(command))
            }
            None => Ok(Arc::new(DisabledRenderer)),
        }
    }
}

/// Name of the active dataset.
///
/// # Panics
///
/// When [`DATASET_ENV`] is unset or empty; rendering without a dataset is a
/// usage error, not a recoverable condition.
pub fn require_dataset() -> String {
    let name = env::var(DATASET_ENV).ok().filter(|name| !name.trim().is_empty());
    assert!(
        name.is_some(),
        "{DATASET_ENV} must name the active dataset configuration"
    );
    name.unwrap_or_default()
}

/// Directory holding per-dataset folders.
pub fn datasets_dir(cli_override: Option<&Path>) -> PathBuf {
    if let Some(dir) = cli_override {
        return dir.to_path_buf();
    }
    env::var(DATASETS_DIR_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_DATASETS_DIR))
}

pub fn dataset_path(datasets_dir: &Path, name: &str) -> PathBuf {
    datasets_dir.join(name).join(DATASET_FILE)
}

pub fn load_dataset(path: &Path) -> Result<LoadedDataset, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let mut config: DatasetConfig =
        serde_yaml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    let base = path.parent().unwrap_or_else(|| Path::new("."));
    if config.name.is_empty() {
        config.name = base
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
    }

    let tool_description = match config.tool_description_file.as_ref() {
        Some(file) => {
            let file = base.join(file);
            std::fs::read_to_string(&file).map_err(|source| ConfigError::Read { path: file, source })?
        }
        None => config.tool_description.clone().unwrap_or_default(),
    };

    let mut apis = config.custom_apis.clone();
    if let Some(file) = config.custom_api_file.as_ref() {
        apis.extend(CustomCatalog::load(&base.join(file))?.iter().cloned());
    }
    let custom = CustomCatalog::from_entries(apis)?;

    let manifest = match config.tool_manifest.as_ref() {
        Some(file) => ToolManifest::load(&base.join(file))?,
        None => ToolManifest::default(),
    };

    info!(
        dataset = %config.name,
        path = %path.display(),
        custom_apis = custom.len(),
        manifest = !manifest.is_empty(),
        "dataset configuration loaded"
    );

    let vocabulary = Arc::new(ToolVocabulary::new(custom, manifest, config.api_render));
    Ok(LoadedDataset {
        config,
        path: path.to_path_buf(),
        tool_description,
        vocabulary,
    })
}

/// Resolve and load the dataset named by [`DATASET_ENV`].
pub fn load_active_dataset(datasets_dir_override: Option<&Path>) -> Result<LoadedDataset, ConfigError> {
    let name = require_dataset();
    load_dataset(&dataset_path(&datasets_dir(datasets_dir_override), &name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_relative_files() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("flights");
        std::fs::create_dir_all(&root).unwrap();
        std::fs::write(
            root.join(DATASET_FILE),
            "system_prompt: You book flights.\n\
             tool_description_file: tools.txt\n\
             api_render: direct\n\
             custom_apis:\n  - name: search_flights\n    required: [origin]\n\
             tool_manifest: manifest.json\n",
        )
        .unwrap();
        std::fs::write(root.join("tools.txt"), "TOOLS").unwrap();
        std::fs::write(
            root.join("manifest.json"),
            r#"[{"name": "get_weather", "parameters": {"type": "object", "properties": {}}}]"#,
        )
        .unwrap();

        let dataset = load_dataset(&dataset_path(dir.path(), "flights")).unwrap();
        assert_eq!(dataset.name(), "flights");
        assert_eq!(dataset.tool_description, "TOOLS");
        assert_eq!(dataset.vocabulary.api_mode(), ApiRenderMode::Direct);
        assert!(dataset.vocabulary.custom().contains("search_flights"));
        assert!(dataset.vocabulary.manifest().contains("get_weather"));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DATASET_FILE);
        std::fs::write(&path, "sytem_prompt: typo\n").unwrap();
        let err = load_dataset(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    #[serial_test::serial]
    fn active_dataset_follows_environment() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("webshop");
        std::fs::create_dir_all(&root).unwrap();
        std::fs::write(root.join(DATASET_FILE), "web: true\n").unwrap();

        env::set_var(DATASET_ENV, "webshop");
        let dataset = load_active_dataset(Some(dir.path()));
        env::remove_var(DATASET_ENV);

        let dataset = dataset.unwrap();
        assert_eq!(dataset.name(), "webshop");
        assert_eq!(dataset.config.web, Some(true));
    }

    #[test]
    #[serial_test::serial]
    #[should_panic(expected = "SOUL_DATASET")]
    fn missing_dataset_selection_panics() {
        env::remove_var(DATASET_ENV);
        require_dataset();
    }
}
