//! Per-company default parameters sent along with service requests.

use crate::error::PipelineError;
use circulca_schemas::defaults::CompanyDefaults;
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
    sync::{Mutex, PoisonError},
};
use tracing::info;

pub trait DefaultsStore {
    /// Defaults for `company_id`, or an empty set when none were saved.
    fn read(&self, company_id: &str) -> Result<CompanyDefaults, PipelineError>;

    /// Replaces the defaults saved for `company_id`.
    fn write(&self, company_id: &str, defaults: &CompanyDefaults) -> Result<(), PipelineError>;
}

#[derive(Debug, Default)]
pub struct MemoryDefaultsStore {
    entries: Mutex<BTreeMap<String, CompanyDefaults>>,
}

impl DefaultsStore for MemoryDefaultsStore {
    fn read(&self, company_id: &str) -> Result<CompanyDefaults, PipelineError> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(company_id).cloned().unwrap_or_default())
    }

    fn write(&self, company_id: &str, defaults: &CompanyDefaults) -> Result<(), PipelineError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(company_id.to_string(), defaults.clone());
        Ok(())
    }
}

/// All companies' defaults in one YAML file, keyed by company id.
#[derive(Debug, Clone)]
pub struct YamlDefaultsStore {
    path: PathBuf,
}

impl YamlDefaultsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<BTreeMap<String, CompanyDefaults>, PipelineError> {
        let display = self.path.display().to_string();
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let content =
            fs::read_to_string(&self.path).map_err(|e| PipelineError::FileIO(display.clone(), e))?;
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_yaml::from_str(&content).map_err(|e| PipelineError::YamlParsing(display, e))
    }
}

impl DefaultsStore for YamlDefaultsStore {
    fn read(&self, company_id: &str) -> Result<CompanyDefaults, PipelineError> {
        Ok(self.load()?.remove(company_id).unwrap_or_default())
    }

    fn write(&self, company_id: &str, defaults: &CompanyDefaults) -> Result<(), PipelineError> {
        let display = self.path.display().to_string();
        let mut entries = self.load()?;
        entries.insert(company_id.to_string(), defaults.clone());

        let yaml = serde_yaml::to_string(&entries)
            .map_err(|e| PipelineError::YamlParsing(display.clone(), e))?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| PipelineError::FileIO(display.clone(), e))?;
        }
        fs::write(&self.path, yaml).map_err(|e| PipelineError::FileIO(display, e))?;
        info!(company_id, path = %self.path.display(), "saved company defaults");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn custom(rate: f64) -> CompanyDefaults {
        let mut defaults = CompanyDefaults {
            custom: true,
            ..Default::default()
        };
        defaults
            .parameters
            .insert("recycling_rate".to_string(), json!(rate));
        defaults
    }

    #[test]
    fn unset_company_reads_as_empty() {
        let store = MemoryDefaultsStore::default();
        let defaults = store.read("acme").unwrap();
        assert_eq!(defaults, CompanyDefaults::default());
        assert!(!defaults.has_overrides());
    }

    #[test]
    fn memory_write_is_an_upsert() {
        let store = MemoryDefaultsStore::default();
        store.write("acme", &custom(0.5)).unwrap();
        store.write("acme", &custom(0.8)).unwrap();
        assert_eq!(store.read("acme").unwrap(), custom(0.8));
        assert_eq!(store.read("other").unwrap(), CompanyDefaults::default());
    }

    #[test]
    fn yaml_store_persists_per_company() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("defaults.yaml");
        let store = YamlDefaultsStore::new(&path);

        assert_eq!(store.read("acme").unwrap(), CompanyDefaults::default());

        store.write("acme", &custom(0.5)).unwrap();
        store.write("globex", &custom(0.2)).unwrap();
        store.write("acme", &custom(0.9)).unwrap();

        let reopened = YamlDefaultsStore::new(&path);
        assert_eq!(reopened.read("acme").unwrap(), custom(0.9));
        assert_eq!(reopened.read("globex").unwrap(), custom(0.2));
    }

    #[test]
    fn malformed_yaml_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("defaults.yaml");
        fs::write(&path, "acme: [unclosed").unwrap();

        let result = YamlDefaultsStore::new(&path).read("acme");
        assert!(matches!(result, Err(PipelineError::YamlParsing(_, _))));
    }
}
