// src/config.rs
use serde::{Serialize, Deserialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use directories::ProjectDirs;
use log::{info, warn};
use toml;

use crate::generator::PasswordCriteria;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Argon2Params {
    pub m_cost: u32, // KiB
    pub t_cost: u32, // iterations
    pub p_cost: u32, // parallelism
}

impl Default for Argon2Params {
    fn default() -> Self {
        Argon2Params {
            m_cost: 19456, // 19 MiB (19 * 1024 KiB)
            t_cost: 2,
            p_cost: 1,
        }
    }
}

/// What `RecordStore::load` does with a data file that exists but does not parse.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum CorruptPolicy {
    /// Surface `StoreError::Corrupt`.
    #[default]
    Fail,
    /// Copy the bad file aside and start from an empty collection.
    Reset,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct StorageConfig {
    pub on_corrupt: CorruptPolicy,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct EncryptionConfig {
    pub enabled: bool,
    pub argon2_params: Argon2Params,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct GeneratorConfig {
    pub length: usize,
    pub use_uppercase: bool,
    pub use_lowercase: bool,
    pub use_numbers: bool,
    pub use_symbols: bool,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        let criteria = PasswordCriteria::default();
        GeneratorConfig {
            length: criteria.length,
            use_uppercase: criteria.use_uppercase,
            use_lowercase: criteria.use_lowercase,
            use_numbers: criteria.use_numbers,
            use_symbols: criteria.use_symbols,
        }
    }
}

impl From<&GeneratorConfig> for PasswordCriteria {
    fn from(g: &GeneratorConfig) -> Self {
        PasswordCriteria {
            length: g.length,
            use_uppercase: g.use_uppercase,
            use_lowercase: g.use_lowercase,
            use_numbers: g.use_numbers,
            use_symbols: g.use_symbols,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    pub data_file: PathBuf,
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub encryption: EncryptionConfig,
    pub generator: GeneratorConfig,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            data_file: default_data_file(),
            server: ServerConfig::default(),
            storage: StorageConfig::default(),
            encryption: EncryptionConfig::default(),
            generator: GeneratorConfig::default(),
        }
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "Credvault", "Credvault")
}

fn default_data_file() -> PathBuf {
    project_dirs()
        .map(|dirs| dirs.data_dir().join("credentials.json"))
        .unwrap_or_else(|| PathBuf::from("data").join("credentials.json"))
}

pub fn default_config_path() -> Option<PathBuf> {
    project_dirs().map(|proj_dirs| proj_dirs.config_dir().join("credvault.toml"))
}

fn save_default_config(config_path: &Path, config: &Config) -> Result<(), String> {
    info!("Attempting to save default config to {:?}", config_path);
    if let Some(parent_dir) = config_path.parent() {
        if !parent_dir.as_os_str().is_empty() && !parent_dir.exists() {
            fs::create_dir_all(parent_dir)
                .map_err(|e| format!("Failed to create config directory {:?}: {}", parent_dir, e))?;
            info!("Created config directory: {:?}", parent_dir);
        }
    }

    let toml_string = toml::to_string_pretty(config)
        .map_err(|e| format!("Failed to serialize default config to TOML: {}", e))?;

    let mut file = fs::File::create(config_path)
        .map_err(|e| format!("Failed to create default config file {:?}: {}", config_path, e))?;

    file.write_all(toml_string.as_bytes())
        .map_err(|e| format!("Failed to write default config to {:?}: {}", config_path, e))?;

    info!("Saved default configuration to {:?}", config_path);
    Ok(())
}

/// Reads the config at `config_path`, writing a default one if it does not exist yet.
/// Unreadable or unparsable files fall back to defaults with a warning.
pub fn load_config_from(config_path: &Path) -> Config {
    if !config_path.exists() {
        info!(
            "Config file not found at {:?}. Creating and using default configuration.",
            config_path
        );
        let default_config = Config::default();
        if let Err(e) = save_default_config(config_path, &default_config) {
            warn!("Failed to save default configuration: {}", e);
        }
        return default_config;
    }

    info!("Loading configuration from {:?}", config_path);
    match fs::read_to_string(config_path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(loaded_config) => {
                info!("Configuration loaded successfully.");
                loaded_config
            }
            Err(e) => {
                warn!(
                    "Failed to parse config file at {:?}: {}. Using default configuration.",
                    config_path, e
                );
                Config::default()
            }
        },
        Err(e) => {
            warn!(
                "Failed to read config file at {:?}: {}. Using default configuration.",
                config_path, e
            );
            Config::default()
        }
    }
}

pub fn load_config(override_path: Option<&Path>) -> Config {
    match override_path {
        Some(path) => load_config_from(path),
        None => match default_config_path() {
            Some(path) => load_config_from(&path),
            None => {
                warn!("Could not determine config directory. Using default configuration.");
                Config::default()
            }
        },
    }
}
