// Run configuration: which folders feed which slots, where the service
// lives, and how uploads are labelled. Built once in `main` and passed down
// by reference.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, UploadError};
use crate::retry::RetryPolicy;

pub const DEFAULT_BASE_URL: &str = "https://darwin.v7labs.com/api/v2";
pub const DEFAULT_BATCH_NAME: &str = "example_slots";
pub const BASE_URL_ENV: &str = "DARWIN_API_URL";
const CONFIG_DIR_NAME: &str = "multislot-upload";
const CONFIG_FILE_NAME: &str = "config.json";

const EXAMPLE_API_KEY: &str = "DHMhAWr.BHucps-tKMAi6rWF1xieOpUvNe5WzrHP";

/// Static configuration for a run, usually read from a JSON file.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct UploadConfig {
    /// One slot per folder, paired by position with `folder_paths`.
    pub slot_names: Vec<String>,
    pub folder_paths: Vec<PathBuf>,
    /// Label sent with every upload confirmation.
    pub batch_name: String,
    /// Dataset path every registered item is placed under.
    pub item_path: String,
    pub base_url: String,
    pub timeout_secs: u64,
    pub retry: RetryPolicy,
}

impl Default for UploadConfig {
    fn default() -> Self {
        UploadConfig {
            slot_names: Vec::new(),
            folder_paths: Vec::new(),
            batch_name: DEFAULT_BATCH_NAME.to_string(),
            item_path: "/".to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: 60,
            retry: RetryPolicy::default(),
        }
    }
}

impl UploadConfig {
    /// `<config dir>/multislot-upload/config.json`, if the platform has a
    /// config directory.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Read a config file. A missing file is only an error when the caller
    /// asked for that file explicitly (`required`); otherwise defaults apply.
    pub fn load(path: &Path, required: bool) -> Result<Self> {
        if !path.exists() {
            if required {
                return Err(UploadError::Config(format!(
                    "config file {} does not exist",
                    path.display()
                )));
            }
            debug!("No config file at {}, using defaults", path.display());
            return Ok(UploadConfig::default());
        }
        let raw = fs::read_to_string(path)?;
        let config = serde_json::from_str(&raw).map_err(|e| {
            UploadError::Config(format!("invalid config file {}: {}", path.display(), e))
        })?;
        debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Let `DARWIN_API_URL` override the configured base URL.
    pub fn apply_env(&mut self) {
        if let Ok(url) = std::env::var(BASE_URL_ENV) {
            if !url.trim().is_empty() {
                self.base_url = url;
            }
        }
    }

    /// Replace both lists with slots given on the command line.
    pub fn set_slots(&mut self, slots: &[SlotArg]) {
        self.slot_names = slots.iter().map(|s| s.slot_name.clone()).collect();
        self.folder_paths = slots.iter().map(|s| s.folder.clone()).collect();
    }

    /// Slot/folder pairs in configuration order.
    pub fn slot_folders(&self) -> impl Iterator<Item = (&str, &Path)> {
        self.slot_names
            .iter()
            .map(String::as_str)
            .zip(self.folder_paths.iter().map(PathBuf::as_path))
    }

    pub fn validate(&self) -> Result<()> {
        if self.slot_names.len() != self.folder_paths.len() {
            return Err(UploadError::Config(format!(
                "{} slot names but {} folder paths; they are paired by position",
                self.slot_names.len(),
                self.folder_paths.len()
            )));
        }
        if self.slot_names.is_empty() {
            return Err(UploadError::Config(
                "no slots configured; pass --slot NAME=FOLDER or set slot_names/folder_paths"
                    .into(),
            ));
        }
        let mut seen = HashSet::new();
        for name in &self.slot_names {
            if name.trim().is_empty() {
                return Err(UploadError::Config("slot names must not be empty".into()));
            }
            if !seen.insert(name.as_str()) {
                return Err(UploadError::Config(format!("duplicate slot name {}", name)));
            }
        }
        if self.batch_name.trim().is_empty() {
            return Err(UploadError::Config("batch_name must not be empty".into()));
        }
        Ok(())
    }
}

/// `NAME=FOLDER` as given to `--slot`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotArg {
    pub slot_name: String,
    pub folder: PathBuf,
}

impl FromStr for SlotArg {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.split_once('=') {
            Some((name, folder)) if !name.is_empty() && !folder.is_empty() => Ok(SlotArg {
                slot_name: name.to_string(),
                folder: PathBuf::from(folder),
            }),
            _ => Err(format!("expected NAME=FOLDER, got {:?}", s)),
        }
    }
}

/// Check the shape of an API key: a 7 character prefix, one dot, and a 32
/// character secret.
pub fn validate_api_key(api_key: &str) -> Result<()> {
    let pattern = Regex::new(r"^[^.]{7}\.[^.]{32}$")
        .map_err(|e| UploadError::Config(format!("API key pattern: {}", e)))?;
    if pattern.is_match(api_key) {
        Ok(())
    } else {
        Err(UploadError::Config(format!(
            "expected API key to match the pattern: {}",
            EXAMPLE_API_KEY
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn accepts_well_formed_api_key() {
        assert!(validate_api_key(EXAMPLE_API_KEY).is_ok());
    }

    #[test]
    fn rejects_malformed_api_keys() {
        let bad = [
            "",
            "DHMhAWrBHucps-tKMAi6rWF1xieOpUvNe5WzrHP",
            "DHMhAW.BHucps-tKMAi6rWF1xieOpUvNe5WzrHPx",
            "DHMhAWrx.BHucps-tKMAi6rWF1xieOpUvNe5WzrH",
            "DHMhAWr.BHucps-tKMAi6rWF1xieOpUvNe5WzrH",
            "DHMhAWr.BHucps-tKMAi6rWF1xieOpUvNe5WzrHPP",
            "DHMhAWr.BHucps.tKMAi6rWF1xieOpUvNe5WzrHP",
            "DHMhAWr.BHucps-tKMAi6rWF1xieOpUvNe5WzrHP\n",
        ];
        for key in bad {
            assert!(
                matches!(validate_api_key(key), Err(UploadError::Config(_))),
                "accepted {:?}",
                key
            );
        }
    }

    #[test]
    fn mismatched_lists_are_a_config_error() {
        let config = UploadConfig {
            slot_names: vec!["rgb".into(), "depth".into()],
            folder_paths: vec![PathBuf::from("rgb")],
            ..UploadConfig::default()
        };
        assert!(matches!(config.validate(), Err(UploadError::Config(_))));
    }

    #[test]
    fn empty_and_duplicate_slots_are_rejected() {
        assert!(UploadConfig::default().validate().is_err());

        let mut config = UploadConfig::default();
        config.set_slots(&["a=x".parse().unwrap(), "a=y".parse().unwrap()]);
        assert!(matches!(config.validate(), Err(UploadError::Config(_))));
    }

    #[test]
    fn slot_args_replace_both_lists_in_order() {
        let mut config = UploadConfig::default();
        let slots: Vec<SlotArg> = ["rgb=./data/rgb", "depth=./data/depth"]
            .iter()
            .map(|s| s.parse().unwrap())
            .collect();
        config.set_slots(&slots);
        assert!(config.validate().is_ok());
        let pairs: Vec<(&str, &Path)> = config.slot_folders().collect();
        assert_eq!(
            pairs,
            vec![
                ("rgb", Path::new("./data/rgb")),
                ("depth", Path::new("./data/depth"))
            ]
        );
    }

    #[test]
    fn slot_arg_requires_name_and_folder() {
        assert!("rgb".parse::<SlotArg>().is_err());
        assert!("=folder".parse::<SlotArg>().is_err());
        assert!("rgb=".parse::<SlotArg>().is_err());
        let arg: SlotArg = "mask=a=b".parse().unwrap();
        assert_eq!(arg.slot_name, "mask");
        assert_eq!(arg.folder, PathBuf::from("a=b"));
    }

    #[test]
    fn loads_partial_file_over_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{"slot_names": ["rgb"], "folder_paths": ["imgs"], "retry": {"max_retries": 2}}"#,
        )
        .unwrap();
        let config = UploadConfig::load(&path, true).unwrap();
        assert_eq!(config.slot_names, vec!["rgb"]);
        assert_eq!(config.folder_paths, vec![PathBuf::from("imgs")]);
        assert_eq!(config.batch_name, DEFAULT_BATCH_NAME);
        assert_eq!(config.item_path, "/");
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.retry.max_retries, 2);
        assert_eq!(config.retry.initial_delay_ms, crate::retry::DEFAULT_INITIAL_DELAY_MS);
    }

    #[test]
    fn missing_file_depends_on_whether_it_was_asked_for() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("absent.json");
        assert_eq!(UploadConfig::load(&path, false).unwrap(), UploadConfig::default());
        assert!(matches!(
            UploadConfig::load(&path, true),
            Err(UploadError::Config(_))
        ));
    }

    #[test]
    fn invalid_json_is_a_config_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            UploadConfig::load(&path, true),
            Err(UploadError::Config(_))
        ));
    }
}
