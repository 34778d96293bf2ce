//! compiler.rs - Compiles detector definitions into the pattern registry.
//!
//! The registry is built once at startup and then only borrowed. It is never
//! mutated after construction, so it can be shared freely between threads.
//!
//! License: MIT OR Apache-2.0

use log::{debug, warn};
use regex::{Regex, RegexBuilder};

use crate::config::{Detector, DetectorConfig, MAX_PATTERN_LENGTH};
use crate::errors::BlackoutError;

/// A single compiled detector.
#[derive(Debug, Clone)]
pub struct CompiledDetector {
    /// The unique name of the detector.
    pub name: String,
    /// Human-readable label for summaries.
    pub label: String,
    /// The compiled regular expression used for matching.
    pub regex: Regex,
}

impl CompiledDetector {
    /// Returns the non-overlapping full-match spans found in `text`.
    pub fn find_spans<'a>(&'a self, text: &'a str) -> impl Iterator<Item = (usize, usize, &'a str)> + 'a {
        self.regex
            .find_iter(text)
            .filter(|m| !m.as_str().is_empty())
            .map(|m| (m.start(), m.end(), m.as_str()))
    }
}

/// The ordered, immutable set of compiled detectors.
#[derive(Debug, Clone, Default)]
pub struct PatternRegistry {
    detectors: Vec<CompiledDetector>,
}

impl PatternRegistry {
    /// Compiles every active detector of `config`.
    pub fn from_config(config: &DetectorConfig) -> Result<Self, BlackoutError> {
        compile_detectors(config.detectors.clone())
    }

    pub fn detectors(&self) -> &[CompiledDetector] {
        &self.detectors
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CompiledDetector> {
        self.detectors.iter()
    }

    pub fn len(&self) -> usize {
        self.detectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.detectors.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&CompiledDetector> {
        self.detectors.iter().find(|d| d.name == name)
    }

    /// Literals matched by the detector at `detector_index`, in text order.
    pub fn find_literals<'t>(&self, detector_index: usize, text: &'t str) -> Vec<&'t str> {
        match self.detectors.get(detector_index) {
            Some(detector) => detector
                .regex
                .find_iter(text)
                .map(|m| m.as_str())
                .filter(|s| !s.is_empty())
                .collect(),
            None => Vec::new(),
        }
    }
}

/// Compiles a list of detectors into a [`PatternRegistry`].
///
/// Disabled detectors (`enabled: false`) are skipped. All compilation
/// failures are collected and reported together.
pub fn compile_detectors(detectors: Vec<Detector>) -> Result<PatternRegistry, BlackoutError> {
    debug!("Starting compilation of {} detectors.", detectors.len());

    let mut compiled = Vec::with_capacity(detectors.len());
    let mut compilation_errors = Vec::new();

    for detector in detectors {
        if !detector.is_active() {
            debug!("Skipping disabled detector '{}'.", detector.name);
            continue;
        }
        if detector.pattern.is_empty() {
            warn!("Skipping detector '{}' because its pattern is empty.", detector.name);
            continue;
        }
        if detector.pattern.len() > MAX_PATTERN_LENGTH {
            compilation_errors.push(BlackoutError::PatternLengthExceeded(
                detector.name,
                detector.pattern.len(),
                MAX_PATTERN_LENGTH,
            ));
            continue;
        }

        let regex_result = RegexBuilder::new(&detector.pattern)
            .case_insensitive(!detector.case_sensitive)
            .size_limit(10 * (1 << 20))
            .build();

        match regex_result {
            Ok(regex) => {
                debug!(target: "blackout_core::compiler", "Detector '{}' compiled successfully.", detector.name);
                let label = detector.display_label().to_string();
                compiled.push(CompiledDetector {
                    name: detector.name,
                    label,
                    regex,
                });
            }
            Err(e) => compilation_errors.push(BlackoutError::DetectorCompilationError(detector.name, e)),
        }
    }

    if !compilation_errors.is_empty() {
        let error_message = compilation_errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<String>>()
            .join("\n");
        return Err(BlackoutError::Fatal(format!(
            "Failed to compile {} detector(s):\n{}",
            compilation_errors.len(),
            error_message
        )));
    }

    debug!("Finished compiling detectors. Total compiled: {}.", compiled.len());
    Ok(PatternRegistry { detectors: compiled })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_registry() -> PatternRegistry {
        PatternRegistry::from_config(&DetectorConfig::load_default().unwrap()).unwrap()
    }

    fn literals(registry: &PatternRegistry, name: &str, text: &str) -> Vec<String> {
        registry
            .get(name)
            .unwrap()
            .find_spans(text)
            .map(|(_, _, s)| s.to_string())
            .collect()
    }

    #[test]
    fn test_compile_skips_disabled_detectors() {
        let registry = compile_detectors(vec![
            Detector { name: "on".into(), pattern: "a".into(), ..Default::default() },
            Detector { name: "off".into(), pattern: "b".into(), enabled: Some(false), ..Default::default() },
        ])
        .unwrap();
        assert_eq!(registry.len(), 1);
        assert!(registry.get("off").is_none());
    }

    #[test]
    fn test_compile_reports_every_failure() {
        let err = compile_detectors(vec![
            Detector { name: "bad1".into(), pattern: "(".into(), ..Default::default() },
            Detector { name: "bad2".into(), pattern: "[".into(), ..Default::default() },
        ])
        .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("Failed to compile 2 detector(s)"));
        assert!(msg.contains("bad1") && msg.contains("bad2"));
    }

    #[test]
    fn test_case_insensitive_by_default() {
        let registry = default_registry();
        assert_eq!(literals(&registry, "sensitive_keyword", "My PASSWORD is"), vec!["PASSWORD"]);
        assert_eq!(literals(&registry, "tax_id", "pan abcde1234f"), vec!["abcde1234f"]);
    }

    #[test]
    fn test_case_sensitive_detector() {
        let registry = compile_detectors(vec![Detector {
            name: "upper".into(),
            pattern: "SECRET".into(),
            case_sensitive: true,
            ..Default::default()
        }])
        .unwrap();
        assert!(literals(&registry, "upper", "secret").is_empty());
        assert_eq!(literals(&registry, "upper", "SECRET"), vec!["SECRET"]);
    }

    #[test]
    fn test_default_detector_samples() {
        let registry = default_registry();
        assert_eq!(literals(&registry, "phone_number", "call 9876543210 now"), vec!["9876543210"]);
        assert!(literals(&registry, "phone_number", "call 1234567890").is_empty());
        assert_eq!(literals(&registry, "national_id", "id 123456789012"), vec!["123456789012"]);
        assert_eq!(literals(&registry, "national_id_spaced", "id 1234 5678 9012"), vec!["1234 5678 9012"]);
        assert_eq!(literals(&registry, "email", "mail jane@example.com."), vec!["jane@example.com"]);
        assert_eq!(literals(&registry, "url", "see https://example.com/a?b=1 ok"), vec!["https://example.com/a?b=1"]);
        assert_eq!(literals(&registry, "ipv4_address", "host 10.0.0.12"), vec!["10.0.0.12"]);
        assert_eq!(literals(&registry, "tax_id", "PAN ABCDE1234F"), vec!["ABCDE1234F"]);
        assert_eq!(literals(&registry, "bank_routing_code", "IFSC SBIN0001234"), vec!["SBIN0001234"]);
        assert_eq!(literals(&registry, "payment_card", "card 4111 1111 1111 1111"), vec!["4111 1111 1111 1111"]);
    }

    #[test]
    fn test_keyword_detector_matches_label_only() {
        let registry = default_registry();
        assert_eq!(literals(&registry, "sensitive_keyword", "password: hunter2"), vec!["password"]);
        assert!(literals(&registry, "sensitive_keyword", "passwords").is_empty());
    }
}
