use anyhow::{Context, Result};
use circulca_schemas::{defaults::CompanyDefaults, project::ProjectMetadata};
use serde::{de::DeserializeOwned, Deserialize};
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            timeout_secs: 60,
        }
    }
}

/// Application settings. Every key is optional in the YAML file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub service: ServiceConfig,
    pub company_id: String,
    pub defaults_path: PathBuf,
    pub run_log_path: PathBuf,
    pub output_dir: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            service: ServiceConfig::default(),
            company_id: "default".to_string(),
            defaults_path: PathBuf::from("./data/company_defaults.yaml"),
            run_log_path: PathBuf::from("./data/runs.csv"),
            output_dir: PathBuf::from("./data/reports"),
        }
    }
}

impl AppConfig {
    /// Loads the config file, or the built-in settings when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => load_yaml(path),
            None => Ok(Self::default()),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.service.timeout_secs)
    }
}

pub fn load_project(path: &Path) -> Result<ProjectMetadata> {
    load_yaml(path)
}

pub fn load_company_defaults(path: &Path) -> Result<CompanyDefaults> {
    load_yaml(path)
}

fn load_yaml<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {:?}", path))?;
    serde_yaml::from_str(&content).with_context(|| format!("Failed to parse YAML from {:?}", path))
}
