// src/config/mod.rs
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::extractors::normalizer::Normalizer;
use crate::utils::error::ConfigError;

/// Widest column gap an edition may ask for. Exhibit columns are a few spaces apart.
pub const MAX_NUMERIC_GAP: usize = 64;

/// Known layouts of the budget summary exhibit. Each edition carries its own
/// anchor table and normalization variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentEdition {
    /// Adopted ("A") budget: general receipts, special receipts, available balances.
    Adopted,
    /// Proposed ("P") budget: receipts only, wider gaps between numeric columns.
    Proposed,
}

impl DocumentEdition {
    pub fn config(self) -> EditionConfig {
        let general = SectionConfig::receipts(
            "general_receipts",
            "General Receipts:",
            "Total General Receipts",
            "General Fund",
        );
        let special = SectionConfig::receipts(
            "special_receipts",
            "Special Receipts:",
            "Total Special Receipts...",
            "Special Fund",
        );

        match self {
            DocumentEdition::Adopted => EditionConfig {
                edition: self,
                rule_variant: RuleVariant::default(),
                sections: vec![
                    general,
                    special,
                    SectionConfig {
                        name: "available_balances".to_string(),
                        kind: SectionKind::Balances,
                        start_anchor: "Available Balances:".to_string(),
                        end_anchor: "Total Available Balances...".to_string(),
                        required: false,
                        category: None,
                        max_fields: 4,
                    },
                ],
            },
            DocumentEdition::Proposed => EditionConfig {
                edition: self,
                rule_variant: RuleVariant {
                    min_numeric_gap: 3,
                    ..RuleVariant::default()
                },
                sections: vec![general, special],
            },
        }
    }
}

impl FromStr for DocumentEdition {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "adopted" | "approved" | "a" => Ok(DocumentEdition::Adopted),
            "proposed" | "p" => Ok(DocumentEdition::Proposed),
            other => Err(ConfigError::UnknownEdition(other.to_string())),
        }
    }
}

impl fmt::Display for DocumentEdition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentEdition::Adopted => write!(f, "adopted"),
            DocumentEdition::Proposed => write!(f, "proposed"),
        }
    }
}

/// What a section's rows mean downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionKind {
    Receipts,
    Balances,
}

/// One named section of the exhibit, bounded by two literal anchors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionConfig {
    pub name: String,
    pub kind: SectionKind,
    pub start_anchor: String,
    pub end_anchor: String,
    #[serde(default = "default_required")]
    pub required: bool,
    /// Fund type stamped on every row of the section.
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default = "default_max_fields")]
    pub max_fields: usize,
}

impl SectionConfig {
    fn receipts(name: &str, start_anchor: &str, end_anchor: &str, category: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: SectionKind::Receipts,
            start_anchor: start_anchor.to_string(),
            end_anchor: end_anchor.to_string(),
            required: true,
            category: Some(category.to_string()),
            max_fields: 3,
        }
    }
}

fn default_required() -> bool {
    true
}

fn default_max_fields() -> usize {
    3
}

/// Parameters of the artifact normalizer that differ between editions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleVariant {
    /// Minimum number of spaces between two digits that counts as a column gap.
    pub min_numeric_gap: usize,
    /// Column headers and titles removed before rows are parsed.
    pub boilerplate: Vec<String>,
}

impl Default for RuleVariant {
    fn default() -> Self {
        Self {
            min_numeric_gap: 1,
            boilerplate: [
                "EXHIBIT B",
                "BUDGET SUMMARY",
                "RECEIPTS",
                " of Total",
                " ofTotal",
                "Total",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

/// Everything the pipeline needs to process one edition of the exhibit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditionConfig {
    pub edition: DocumentEdition,
    #[serde(default)]
    pub rule_variant: RuleVariant,
    pub sections: Vec<SectionConfig>,
}

impl EditionConfig {
    /// Loads an edition table from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        tracing::info!("Loading edition configuration from {}", path.display());
        let raw = std::fs::read_to_string(path)?;
        let config: EditionConfig = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sections.is_empty() {
            return Err(ConfigError::Invalid(format!(
                "edition {} defines no sections",
                self.edition
            )));
        }
        let gap = self.rule_variant.min_numeric_gap;
        if !(1..=MAX_NUMERIC_GAP).contains(&gap) {
            return Err(ConfigError::Invalid(format!(
                "min_numeric_gap {} outside 1..={}",
                gap, MAX_NUMERIC_GAP
            )));
        }
        for section in &self.sections {
            if section.start_anchor.is_empty() || section.end_anchor.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "section {} has an empty anchor",
                    section.name
                )));
            }
            if !(2..=4).contains(&section.max_fields) {
                return Err(ConfigError::Invalid(format!(
                    "section {} allows {} fields, expected 2 to 4",
                    section.name, section.max_fields
                )));
            }
        }
        let mut names: Vec<&str> = self.sections.iter().map(|s| s.name.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        if names.len() != self.sections.len() {
            return Err(ConfigError::Invalid("duplicate section names".to_string()));
        }
        // The rule patterns must compile before any document is read.
        Normalizer::new(&self.rule_variant)?;
        Ok(())
    }
}

/// Fiscal period stamped on reconciled rows, e.g. `2021-2022` / `2022`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FiscalPeriod {
    pub label: String,
    pub shorthand: i32,
}

impl FromStr for FiscalPeriod {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ConfigError::FiscalYear(s.to_string());
        let (first, second) = s.trim().split_once('-').ok_or_else(invalid)?;
        let first: i32 = first.parse().map_err(|_| invalid())?;
        let second: i32 = second.parse().map_err(|_| invalid())?;
        if second != first + 1 {
            return Err(invalid());
        }
        Ok(FiscalPeriod {
            label: format!("{}-{}", first, second),
            shorthand: second,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_editions_are_valid() {
        for edition in [DocumentEdition::Adopted, DocumentEdition::Proposed] {
            let config = edition.config();
            assert!(config.validate().is_ok(), "{} config invalid", edition);
            assert_eq!(config.edition, edition);
        }
    }

    #[test]
    fn adopted_balances_section_is_optional() {
        let config = DocumentEdition::Adopted.config();
        let balances = config
            .sections
            .iter()
            .find(|s| s.kind == SectionKind::Balances)
            .expect("adopted edition has a balances section");
        assert!(!balances.required);
        assert_eq!(balances.max_fields, 4);
        assert!(balances.category.is_none());
    }

    #[test]
    fn proposed_uses_wider_numeric_gap() {
        let config = DocumentEdition::Proposed.config();
        assert_eq!(config.rule_variant.min_numeric_gap, 3);
        assert!(config.sections.iter().all(|s| s.kind == SectionKind::Receipts));
    }

    #[test]
    fn unknown_edition_is_a_config_error() {
        assert!(matches!(
            "revised".parse::<DocumentEdition>(),
            Err(ConfigError::UnknownEdition(_))
        ));
        assert_eq!("Adopted".parse::<DocumentEdition>().unwrap(), DocumentEdition::Adopted);
    }

    #[test]
    fn json_override_fills_defaults() {
        let json = r#"{
            "edition": "proposed",
            "sections": [
                {"name": "gf", "kind": "receipts", "start_anchor": "General Receipts:",
                 "end_anchor": "Total General Receipts", "category": "General Fund"}
            ]
        }"#;
        let config: EditionConfig = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.rule_variant, RuleVariant::default());
        assert!(config.sections[0].required);
        assert_eq!(config.sections[0].max_fields, 3);
    }

    #[test]
    fn empty_section_table_is_rejected() {
        let config = EditionConfig {
            edition: DocumentEdition::Adopted,
            rule_variant: RuleVariant::default(),
            sections: vec![],
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn oversized_numeric_gap_is_rejected_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("edition.json");
        std::fs::write(
            &path,
            r#"{
                "edition": "adopted",
                "rule_variant": {"min_numeric_gap": 5000000000, "boilerplate": ["Total"]},
                "sections": [
                    {"name": "gf", "kind": "receipts", "start_anchor": "General Receipts:",
                     "end_anchor": "Total General Receipts", "category": "General Fund"}
                ]
            }"#,
        )
        .unwrap();
        assert!(matches!(EditionConfig::load(&path), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn load_reads_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("edition.json");
        let config = DocumentEdition::Adopted.config();
        std::fs::write(&path, serde_json::to_string(&config).unwrap()).unwrap();
        assert_eq!(EditionConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn fiscal_period_parses_consecutive_years() {
        let period: FiscalPeriod = "2021-2022".parse().unwrap();
        assert_eq!(period.label, "2021-2022");
        assert_eq!(period.shorthand, 2022);
        assert!("2021-2023".parse::<FiscalPeriod>().is_err());
        assert!("FY22".parse::<FiscalPeriod>().is_err());
    }
}
