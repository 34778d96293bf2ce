//! Configuration management for `blackout-core`.
//!
//! This module defines the serialisable form of the detector registry. It
//! handles YAML (de)serialisation and provides utilities for loading, merging,
//! filtering and validating detector sets. Compilation into regular
//! expressions lives in [`crate::sanitizers::compiler`].
//!
//! License: MIT OR Apache-2.0

use anyhow::{anyhow, Context, Result};
use log::{debug, info, warn};
use regex::RegexBuilder;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// Maximum allowed length for a detector pattern string.
pub const MAX_PATTERN_LENGTH: usize = 500;

/// A single named PII detector.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(default)]
pub struct Detector {
    /// Unique identifier (e.g. "email").
    pub name: String,
    /// Human-readable label used in summaries (e.g. "Email address").
    pub label: String,
    /// The regular expression.
    pub pattern: String,
    /// Detectors are case-insensitive unless this is set.
    pub case_sensitive: bool,
    /// If true, the detector is inactive unless explicitly enabled.
    pub opt_in: bool,
    /// Explicit override for enabling/disabling the detector.
    pub enabled: Option<bool>,
    pub description: Option<String>,
}

impl Default for Detector {
    fn default() -> Self {
        Self {
            name: String::new(),
            label: String::new(),
            pattern: String::new(),
            case_sensitive: false,
            opt_in: false,
            enabled: None,
            description: None,
        }
    }
}

impl Detector {
    /// Label shown to users; falls back to the name.
    pub fn display_label(&self) -> &str {
        if self.label.is_empty() {
            &self.name
        } else {
            &self.label
        }
    }

    /// Whether the detector takes part in a scan.
    pub fn is_active(&self) -> bool {
        self.enabled.unwrap_or(true)
    }
}

/// The ordered detector registry as read from YAML.
#[derive(Debug, Default, Deserialize, Serialize, Clone, PartialEq)]
pub struct DetectorConfig {
    #[serde(default)]
    pub detectors: Vec<Detector>,
}

impl DetectorConfig {
    /// Loads detectors from a YAML file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading custom detectors from: {}", path.display());
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: DetectorConfig = serde_yml::from_str(&text)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        validate_detectors(&config.detectors)?;
        info!("Loaded {} detectors from file {}.", config.detectors.len(), path.display());

        Ok(config)
    }

    /// Loads the built-in detector set.
    pub fn load_default() -> Result<Self> {
        debug!("Loading default detectors from embedded string...");
        let default_yaml = include_str!("../config/default_detectors.yaml");
        let config: DetectorConfig = serde_yml::from_str(default_yaml)
            .context("Failed to parse default detectors")?;

        validate_detectors(&config.detectors)?;
        debug!("Loaded {} default detectors.", config.detectors.len());
        Ok(config)
    }

    /// Filters active detectors based on enable/disable lists provided via CLI.
    ///
    /// Disabled names are removed. Opt-in detectors survive only when named in
    /// `enable`. Unknown names are reported and otherwise ignored.
    pub fn set_active(&mut self, enable: &[String], disable: &[String]) {
        let enable_set: HashSet<&str> = enable.iter().map(String::as_str).collect();
        let disable_set: HashSet<&str> = disable.iter().map(String::as_str).collect();

        debug!("Detector count before filtering: {}", self.detectors.len());

        let all_names: HashSet<&str> = self.detectors.iter().map(|d| d.name.as_str()).collect();

        for name in enable_set.difference(&all_names) {
            warn!("Detector '{}' in `enable` list does not exist.", name);
        }

        for name in disable_set.difference(&all_names) {
            warn!("Detector '{}' in `disable` list does not exist.", name);
        }

        self.detectors.retain(|d| {
            let name = d.name.as_str();
            !disable_set.contains(name) && (!d.opt_in || enable_set.contains(name))
        });

        debug!("Detector count after filtering: {}", self.detectors.len());
    }

    /// Looks up a detector by name.
    pub fn get(&self, name: &str) -> Option<&Detector> {
        self.detectors.iter().find(|d| d.name == name)
    }
}

/// Merges user-defined detectors into the defaults.
///
/// A user detector replaces the default of the same name in place; new
/// detectors are appended in the order they appear in the user file, so the
/// resulting registry order is deterministic.
pub fn merge_detectors(default_config: DetectorConfig, user_config: Option<DetectorConfig>) -> DetectorConfig {
    debug!("merge_detectors called. Default detector count: {}", default_config.detectors.len());

    let mut merged = default_config.detectors;

    if let Some(user_cfg) = user_config {
        debug!("User config provided. Merging {} user detectors.", user_cfg.detectors.len());
        let mut positions: HashMap<String, usize> = merged
            .iter()
            .enumerate()
            .map(|(i, d)| (d.name.clone(), i))
            .collect();

        for user_detector in user_cfg.detectors {
            match positions.get(&user_detector.name) {
                Some(&index) => {
                    debug!("Overriding detector '{}' with user definition.", user_detector.name);
                    merged[index] = user_detector;
                }
                None => {
                    positions.insert(user_detector.name.clone(), merged.len());
                    merged.push(user_detector);
                }
            }
        }
    }

    debug!("Final detector count after merge: {}", merged.len());
    DetectorConfig { detectors: merged }
}

/// Validates detector integrity: names, patterns and regex syntax.
pub fn validate_detectors(detectors: &[Detector]) -> Result<()> {
    let mut names = HashSet::new();
    let mut errors = Vec::new();

    for detector in detectors {
        if detector.name.is_empty() {
            errors.push("A detector has an empty `name` field.".to_string());
        } else if !names.insert(detector.name.as_str()) {
            errors.push(format!("Duplicate detector name found: '{}'.", detector.name));
        }

        if detector.pattern.is_empty() {
            errors.push(format!("Detector '{}' has an empty `pattern` field.", detector.name));
            continue;
        }

        if detector.pattern.len() > MAX_PATTERN_LENGTH {
            errors.push(format!(
                "Detector '{}': pattern length ({}) exceeds maximum allowed ({}).",
                detector.name,
                detector.pattern.len(),
                MAX_PATTERN_LENGTH
            ));
            continue;
        }

        if let Err(e) = RegexBuilder::new(&detector.pattern)
            .case_insensitive(!detector.case_sensitive)
            .build()
        {
            errors.push(format!("Detector '{}' has an invalid regex pattern: {}", detector.name, e));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(anyhow!("Detector validation failed:\n{}", errors.join("\n")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detector(name: &str, pattern: &str) -> Detector {
        Detector {
            name: name.to_string(),
            pattern: pattern.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_default_detector_order_is_stable() {
        let config = DetectorConfig::load_default().unwrap();
        let names: Vec<&str> = config.detectors.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "phone_number",
                "national_id",
                "national_id_spaced",
                "email",
                "url",
                "ipv4_address",
                "tax_id",
                "bank_routing_code",
                "payment_card",
                "sensitive_keyword",
            ]
        );
        assert!(config.detectors.iter().all(|d| !d.case_sensitive));
    }

    #[test]
    fn test_merge_preserves_position_of_overridden_detector() {
        let defaults = DetectorConfig {
            detectors: vec![detector("a", "a"), detector("b", "b")],
        };
        let user = DetectorConfig {
            detectors: vec![detector("c", "c"), detector("a", "A+")],
        };
        let merged = merge_detectors(defaults, Some(user));
        let names: Vec<&str> = merged.detectors.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        assert_eq!(merged.detectors[0].pattern, "A+");
    }

    #[test]
    fn test_validate_rejects_duplicates_and_bad_regex() {
        let err = validate_detectors(&[detector("x", "a"), detector("x", "(")]).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("Duplicate detector name found: 'x'"));
        assert!(msg.contains("invalid regex pattern"));
    }

    #[test]
    fn test_validate_rejects_overlong_pattern() {
        let long = "a".repeat(MAX_PATTERN_LENGTH + 1);
        let err = validate_detectors(&[detector("long", &long)]).unwrap_err();
        assert!(err.to_string().contains("exceeds maximum allowed"));
    }

    #[test]
    fn test_set_active_handles_opt_in() {
        let mut config = DetectorConfig {
            detectors: vec![
                detector("keep", "k"),
                Detector { opt_in: true, ..detector("optional", "o") },
                detector("drop", "d"),
            ],
        };
        config.set_active(&[], &["drop".to_string()]);
        let names: Vec<&str> = config.detectors.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["keep"]);

        let mut config = DetectorConfig {
            detectors: vec![Detector { opt_in: true, ..detector("optional", "o") }],
        };
        config.set_active(&["optional".to_string()], &[]);
        assert_eq!(config.detectors.len(), 1);
    }
}
