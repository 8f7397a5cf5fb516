//! Configuration primitives and loader for the bpmn-inject toolkit.
//!
//! Settings resolve through a small precedence stack:
//! override flag → working directory → built-in defaults.
//! Each layer only overrides the keys it declares. Values are validated as
//! each layer is applied so errors can name the file that introduced them.

use std::env;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

const CONFIG_FILE_NAME: &str = ".bpmn-inject.toml";

pub const DEFAULT_PRE_PROCESS_TASK_NAME: &str = "Pre-Process Service Task";
pub const DEFAULT_POST_PROCESS_TASK_NAME: &str = "Post-Process Service Task";
pub const DEFAULT_EXTENSION_PREFIX: &str = "camunda";
pub const DEFAULT_TASK_TYPE: &str = "external";
pub const DEFAULT_TASK_TOPIC: &str = "service-task-topic";
pub const DEFAULT_ID_SEED: u64 = 1000;

/// Complete configuration resolved from defaults and on-disk overrides.
#[derive(Clone, Debug)]
pub struct Config {
    pub inject: InjectSettings,
    pub task: TaskSettings,
    pub ids: IdSettings,
    pub sources: ConfigSources,
}

/// Which anchored injections the driving entry point runs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InjectSettings {
    pub add_pre_process_task: bool,
    pub add_post_process_task: bool,
    pub pre_process_task_name: String,
    pub post_process_task_name: String,
}

impl Default for InjectSettings {
    fn default() -> Self {
        Self {
            add_pre_process_task: true,
            add_post_process_task: true,
            pre_process_task_name: DEFAULT_PRE_PROCESS_TASK_NAME.to_string(),
            post_process_task_name: DEFAULT_POST_PROCESS_TASK_NAME.to_string(),
        }
    }
}

/// Vendor execution metadata stamped onto every created service task.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TaskSettings {
    pub extension_prefix: String,
    pub task_type: String,
    pub topic: String,
}

impl Default for TaskSettings {
    fn default() -> Self {
        Self {
            extension_prefix: DEFAULT_EXTENSION_PREFIX.to_string(),
            task_type: DEFAULT_TASK_TYPE.to_string(),
            topic: DEFAULT_TASK_TOPIC.to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IdSettings {
    pub seed: u64,
}

impl Default for IdSettings {
    fn default() -> Self {
        Self {
            seed: DEFAULT_ID_SEED,
        }
    }
}

/// Records which layers contributed to the resolved configuration.
#[derive(Clone, Debug)]
pub struct ConfigSources {
    pub working_directory: PathBuf,
    pub layers: Vec<ConfigSource>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConfigSource {
    pub kind: ConfigSourceKind,
    pub path: Option<PathBuf>,
}

impl ConfigSource {
    fn defaults() -> Self {
        ConfigSource {
            kind: ConfigSourceKind::Default,
            path: None,
        }
    }

    pub fn for_file(kind: ConfigSourceKind, path: PathBuf) -> Self {
        ConfigSource {
            kind,
            path: Some(path),
        }
    }

    pub fn describe(&self) -> String {
        match (&self.kind, &self.path) {
            (ConfigSourceKind::Default, _) => "built-in defaults".to_owned(),
            (kind, Some(path)) => format!("{} at {}", kind, path.display()),
            (kind, None) => kind.to_string(),
        }
    }
}

/// Kinds of configuration sources, ordered from lowest to highest precedence.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ConfigSourceKind {
    Default,
    Local,
    Override,
}

impl fmt::Display for ConfigSourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ConfigSourceKind::Default => "defaults",
            ConfigSourceKind::Local => "local config",
            ConfigSourceKind::Override => "override config",
        };
        f.write_str(label)
    }
}

/// Loader options, typically supplied by the CLI layer.
#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub override_path: Option<PathBuf>,
    pub working_dir: Option<PathBuf>,
}

impl LoadOptions {
    pub fn with_override_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.override_path = Some(path.into());
        self
    }

    pub fn with_working_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(path.into());
        self
    }
}

/// Errors surfaced while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to resolve working directory {attempted}: {source}")]
    WorkingDirectory {
        attempted: PathBuf,
        source: io::Error,
    },
    #[error("override config {path} not found")]
    OverrideNotFound { path: PathBuf },
    #[error("failed to read config {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("invalid value for '{key}' ({}): {message}", .origin.describe())]
    Validation {
        key: &'static str,
        message: String,
        origin: ConfigSource,
    },
}

impl Config {
    /// Loads configuration using the precedence rules and returns typed settings.
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let working_dir = resolve_working_dir(options.working_dir)?;
        let override_path = options
            .override_path
            .map(|path| make_absolute(&path, &working_dir));

        if let Some(path) = &override_path {
            if !path.exists() {
                return Err(ConfigError::OverrideNotFound { path: path.clone() });
            }
        }

        let mut config = Config::defaults(working_dir.clone());

        let local_config_path = working_dir.join(CONFIG_FILE_NAME);
        if local_config_path.exists() && Some(&local_config_path) != override_path.as_ref() {
            let source = ConfigSource::for_file(ConfigSourceKind::Local, local_config_path);
            config.apply_file(source)?;
        }

        if let Some(path) = override_path {
            let source = ConfigSource::for_file(ConfigSourceKind::Override, path);
            config.apply_file(source)?;
        }

        Ok(config)
    }

    /// Built-in defaults without consulting the filesystem.
    pub fn defaults(working_directory: PathBuf) -> Self {
        Config {
            inject: InjectSettings::default(),
            task: TaskSettings::default(),
            ids: IdSettings::default(),
            sources: ConfigSources {
                working_directory,
                layers: vec![ConfigSource::defaults()],
            },
        }
    }

    /// Parses a TOML layer from a string and applies it on top of `self`.
    pub fn merge_str(&mut self, contents: &str, source: ConfigSource) -> Result<(), ConfigError> {
        let raw: RawConfig = toml::from_str(contents).map_err(|err| ConfigError::Parse {
            path: source.path.clone().unwrap_or_default(),
            source: err,
        })?;
        raw.apply(self, &source)?;
        self.sources.layers.push(source);
        Ok(())
    }

    fn apply_file(&mut self, source: ConfigSource) -> Result<(), ConfigError> {
        let path = source.path.clone().unwrap_or_default();
        let contents = fs::read_to_string(&path).map_err(|err| ConfigError::Io {
            path: path.clone(),
            source: err,
        })?;
        self.merge_str(&contents, source)
    }
}

fn resolve_working_dir(override_dir: Option<PathBuf>) -> Result<PathBuf, ConfigError> {
    match override_dir {
        Some(path) => fs::canonicalize(&path).map_err(|source| ConfigError::WorkingDirectory {
            attempted: path,
            source,
        }),
        None => env::current_dir().map_err(|source| ConfigError::WorkingDirectory {
            attempted: PathBuf::from("."),
            source,
        }),
    }
}

fn make_absolute(path: &Path, base: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

fn non_empty(
    key: &'static str,
    value: String,
    source: &ConfigSource,
) -> Result<String, ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Validation {
            key,
            message: "value must not be empty".to_string(),
            origin: source.clone(),
        });
    }
    Ok(trimmed.to_string())
}

#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    #[serde(default)]
    inject: Option<RawInject>,
    #[serde(default)]
    task: Option<RawTask>,
    #[serde(default)]
    ids: Option<RawIds>,
}

impl RawConfig {
    fn apply(self, config: &mut Config, source: &ConfigSource) -> Result<(), ConfigError> {
        if let Some(inject) = self.inject {
            inject.apply(&mut config.inject, source)?;
        }
        if let Some(task) = self.task {
            task.apply(&mut config.task, source)?;
        }
        if let Some(ids) = self.ids {
            if let Some(seed) = ids.seed {
                config.ids.seed = seed;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawInject {
    #[serde(default, alias = "addPreProcessTask")]
    add_pre_process_task: Option<bool>,
    #[serde(default, alias = "addPostProcessTask")]
    add_post_process_task: Option<bool>,
    #[serde(default, alias = "preProcessTaskName")]
    pre_process_task_name: Option<String>,
    #[serde(default, alias = "postProcessTaskName")]
    post_process_task_name: Option<String>,
}

impl RawInject {
    fn apply(self, settings: &mut InjectSettings, source: &ConfigSource) -> Result<(), ConfigError> {
        if let Some(flag) = self.add_pre_process_task {
            settings.add_pre_process_task = flag;
        }
        if let Some(flag) = self.add_post_process_task {
            settings.add_post_process_task = flag;
        }
        if let Some(name) = self.pre_process_task_name {
            settings.pre_process_task_name = non_empty("inject.pre_process_task_name", name, source)?;
        }
        if let Some(name) = self.post_process_task_name {
            settings.post_process_task_name =
                non_empty("inject.post_process_task_name", name, source)?;
        }
        Ok(())
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawTask {
    #[serde(default)]
    extension_prefix: Option<String>,
    #[serde(default, rename = "type")]
    task_type: Option<String>,
    #[serde(default)]
    topic: Option<String>,
}

impl RawTask {
    fn apply(self, settings: &mut TaskSettings, source: &ConfigSource) -> Result<(), ConfigError> {
        if let Some(prefix) = self.extension_prefix {
            let prefix = non_empty("task.extension_prefix", prefix, source)?;
            if prefix.contains(':') || prefix.chars().any(char::is_whitespace) {
                return Err(ConfigError::Validation {
                    key: "task.extension_prefix",
                    message: format!("'{prefix}' is not a valid namespace prefix"),
                    origin: source.clone(),
                });
            }
            settings.extension_prefix = prefix;
        }
        if let Some(task_type) = self.task_type {
            settings.task_type = non_empty("task.type", task_type, source)?;
        }
        if let Some(topic) = self.topic {
            settings.topic = non_empty("task.topic", topic, source)?;
        }
        Ok(())
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawIds {
    #[serde(default)]
    seed: Option<u64>,
}
