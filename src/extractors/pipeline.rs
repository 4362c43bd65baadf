// src/extractors/pipeline.rs
//! Runs normalization, section lookup, row segmentation and record parsing
//! over one document for every section its edition defines.

use serde::Serialize;

use crate::config::{EditionConfig, SectionKind, SectionConfig};
use crate::document::Document;
use crate::extractors::normalizer::{Normalizer, FIELD_SEPARATOR};
use crate::extractors::record::{self, Record};
use crate::extractors::section;
use crate::extractors::segmenter;
use crate::utils::error::{ConfigError, ExtractError};

/// A row that could not be turned into a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedRow {
    pub section: String,
    pub raw: String,
    pub reason: String,
}

/// What a reviewer needs to judge the recovery before publishing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Manifest {
    pub skipped_rows: Vec<SkippedRow>,
    pub absent_sections: Vec<String>,
}

/// Records of one section, in document order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SectionRecords {
    pub name: String,
    pub kind: SectionKind,
    /// Normalized section text, kept for debug output.
    #[serde(skip)]
    pub normalized: String,
    pub records: Vec<Record>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineOutput {
    /// Sections found in the document, in configuration order.
    pub sections: Vec<SectionRecords>,
    pub manifest: Manifest,
}

impl PipelineOutput {
    #[cfg(test)]
    pub fn records(&self, section: &str) -> Option<&[Record]> {
        self.sections
            .iter()
            .find(|s| s.name == section)
            .map(|s| s.records.as_slice())
    }

    pub fn records_of_kind(&self, kind: SectionKind) -> impl Iterator<Item = &Record> + '_ {
        self.sections
            .iter()
            .filter(move |s| s.kind == kind)
            .flat_map(|s| s.records.iter())
    }

    pub fn record_count(&self) -> usize {
        self.sections.iter().map(|s| s.records.len()).sum()
    }
}

pub struct Pipeline {
    config: EditionConfig,
    normalizer: Normalizer,
}

impl Pipeline {
    pub fn new(config: EditionConfig) -> Result<Self, ConfigError> {
        let normalizer = Normalizer::new(&config.rule_variant)?;
        Ok(Self { config, normalizer })
    }

    pub fn config(&self) -> &EditionConfig {
        &self.config
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    /// Extracts every configured section of `document`.
    ///
    /// Malformed rows are skipped and listed in the manifest. A missing
    /// optional section is listed as absent; a missing required section
    /// fails the whole document.
    pub fn run(&self, document: &Document) -> Result<PipelineOutput, ExtractError> {
        tracing::info!(
            "Running {} pipeline over {} pages ({} sections configured)",
            self.config.edition,
            document.page_count(),
            self.config.sections.len()
        );

        // Anchors are matched after structural characters are gone, so that
        // a title broken across lines still matches.
        let stripped = self.normalizer.strip_structural(&document.raw_text());

        let mut output = PipelineOutput {
            sections: Vec::with_capacity(self.config.sections.len()),
            manifest: Manifest::default(),
        };

        for section_config in &self.config.sections {
            // Anchors go through the same stripping as the text they are searched in.
            let start_anchor = self.normalizer.strip_structural(&section_config.start_anchor);
            let end_anchor = self.normalizer.strip_structural(&section_config.end_anchor);
            match section::locate(&stripped, &section_config.name, &start_anchor, &end_anchor) {
                Ok(found) => {
                    tracing::debug!("Section '{}' spans {}..{}", found.name, found.start, found.end);
                    let records = self.process_section(section_config, found.text, &mut output.manifest);
                    output.sections.push(records);
                }
                Err(e) if !section_config.required => {
                    tracing::warn!("Optional section '{}' absent: {}", section_config.name, e);
                    output.manifest.absent_sections.push(section_config.name.clone());
                }
                Err(e) => {
                    tracing::error!("Required section '{}' missing: {}", section_config.name, e);
                    return Err(e);
                }
            }
        }

        tracing::info!(
            "Extracted {} records; {} rows skipped, {} sections absent",
            output.record_count(),
            output.manifest.skipped_rows.len(),
            output.manifest.absent_sections.len()
        );
        Ok(output)
    }

    fn process_section(&self, section_config: &SectionConfig, text: &str, manifest: &mut Manifest) -> SectionRecords {
        let normalized = self.normalizer.normalize(text);
        let mut records = Vec::new();

        for row in segmenter::segment(&normalized) {
            match record::parse(&row, FIELD_SEPARATOR, section_config.max_fields) {
                Ok(fields) => {
                    records.push(Record::from_fields(fields, &section_config.name, section_config.category.as_deref()));
                }
                Err(e) => {
                    let raw = row.text.replace(FIELD_SEPARATOR, " | ");
                    tracing::warn!("Skipping row {} of '{}': {} [{}]", row.index, section_config.name, e, raw);
                    let reason = match e {
                        ExtractError::MalformedRow { reason, .. } => reason,
                        other => other.to_string(),
                    };
                    manifest.skipped_rows.push(SkippedRow {
                        section: section_config.name.clone(),
                        raw,
                        reason,
                    });
                }
            }
        }

        tracing::debug!("Section '{}' produced {} records", section_config.name, records.len());
        SectionRecords {
            name: section_config.name.clone(),
            kind: section_config.kind,
            normalized,
            records,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DocumentEdition;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn adopted_document() -> Document {
        Document::from_pages(vec![
            "EXHIBIT B\nBUDGET SUMMARY\nRECEIPTS\n% of Total\nGeneral Receipts:\n\
             Property Tax..........$ 1,234,567 45.2%\nSales Tax.......... 567,000 20.7%\n"
                .to_string(),
            "Licenses, Permits, Fees and Fines..... 89,012 .--\n\
             Total General Receipts..........$ 1,890,579 100.0%\n\
             Special Receipts:\nSewer Construction and Maintenance Fund..... 300,000 60.0%\n\
             Solid Waste Resources Revenue Fund..... 200,000 40.0%\n\
             Total Special Receipts..........$ 500,000 100.0%\n"
                .to_string(),
            "Available Balances:\nSewer Construction and Maintenance Fund..... 25,000 50.0%\n\
             Solid Waste Resources Revenue Fund..... 0 .--\n\
             Total Available Balances..........$ 25,000\n"
                .to_string(),
        ])
    }

    #[test]
    fn extracts_all_adopted_sections() {
        let pipeline = Pipeline::new(DocumentEdition::Adopted.config()).unwrap();
        let output = pipeline.run(&adopted_document()).unwrap();

        let general = output.records("general_receipts").unwrap();
        assert_eq!(general.len(), 3);
        assert_eq!(general[0].label, "Property Tax");
        assert_eq!(general[0].amount, dec("1234567"));
        assert_eq!(general[0].percent, Some(dec("45.2")));
        assert_eq!(general[0].category.as_deref(), Some("General Fund"));
        assert_eq!(general[2].label, "Licenses Permits Fees and Fines");
        assert_eq!(general[2].percent, Some(dec("0")));

        let special = output.records("special_receipts").unwrap();
        assert_eq!(special.len(), 2);
        assert!(special.iter().all(|r| r.category.as_deref() == Some("Special Fund")));

        let balances = output.records("available_balances").unwrap();
        assert_eq!(balances.len(), 2);
        assert_eq!(balances[0].amount, dec("25000"));
        assert!(balances[0].category.is_none());

        assert_eq!(output.records_of_kind(SectionKind::Receipts).count(), 5);
        assert!(output.manifest.skipped_rows.is_empty());
        assert!(output.manifest.absent_sections.is_empty());
    }

    #[test]
    fn scenario_with_all_artifacts() {
        let doc = Document::from_pages(vec![
            "General Receipts:Property Tax..........1234567.--LicensesPermits andFees Permits ... 89 10123Total General Receipts"
                .to_string(),
        ]);
        let config = EditionConfig {
            sections: vec![DocumentEdition::Adopted.config().sections[0].clone()],
            ..DocumentEdition::Adopted.config()
        };
        let output = Pipeline::new(config).unwrap().run(&doc).unwrap();
        let rows = output.records("general_receipts").unwrap();
        assert!(rows.len() >= 2);
        assert_eq!(rows[0].label, "Property Tax");
        assert_eq!(rows[0].amount, dec("1234567.00"));
        assert_eq!(rows[1].label, "LicensesPermits andFees Permits");
        assert_eq!(rows[1].amount, dec("89"));
        assert_eq!(rows[1].percent, Some(dec("10123")));
    }

    #[test]
    fn one_malformed_row_among_five() {
        let doc = Document::from_pages(vec![
            "General Receipts:\nAlpha.....100\nBravo.....200\nCharlie.....see note 3\nDelta.....400\nEcho.....500\nTotal General Receipts"
                .to_string(),
        ]);
        let config = EditionConfig {
            sections: vec![DocumentEdition::Adopted.config().sections[0].clone()],
            ..DocumentEdition::Adopted.config()
        };
        let output = Pipeline::new(config).unwrap().run(&doc).unwrap();
        let rows = output.records("general_receipts").unwrap();
        assert_eq!(rows.len(), 4);
        assert_eq!(
            rows.iter().map(|r| r.label.as_str()).collect::<Vec<_>>(),
            vec!["Alpha", "Bravo", "Delta", "Echo"]
        );
        assert_eq!(output.manifest.skipped_rows.len(), 1);
        let skipped = &output.manifest.skipped_rows[0];
        assert_eq!(skipped.section, "general_receipts");
        assert!(skipped.raw.contains("Charlie"));
        assert_eq!(skipped.reason, "non-numeric amount");
    }

    #[test]
    fn placeholder_after_three_leader_dots_is_a_zero_row() {
        let doc = Document::from_pages(vec![
            "General Receipts:Fees...--Other.....5Total General Receipts".to_string(),
        ]);
        let config = EditionConfig {
            sections: vec![DocumentEdition::Adopted.config().sections[0].clone()],
            ..DocumentEdition::Adopted.config()
        };
        let output = Pipeline::new(config).unwrap().run(&doc).unwrap();
        let rows = output.records("general_receipts").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].label, "Fees");
        assert_eq!(rows[0].amount, dec("0"));
        assert_eq!(rows[1].label, "Other");
        assert!(output.manifest.skipped_rows.is_empty());
    }

    fn proposed_document() -> Document {
        Document::from_pages(vec![
            "EXHIBIT B\nBUDGET SUMMARY\nGeneral Receipts:\n\
             Property Tax.......... 1,234,567   45.2%\n\
             Measure 1 2020 Bond..... 500   2.5%\n\
             Sales Tax.......... 567,000   20.7%\n\
             Total General Receipts..........$ 1,802,067   100.0%\n"
                .to_string(),
            "Special Receipts:\nSewer Fund..... 300,000   100.0%\n\
             Total Special Receipts..........$ 300,000   100.0%\n"
                .to_string(),
        ])
    }

    #[test]
    fn proposed_edition_splits_only_wide_gaps() {
        let output = Pipeline::new(DocumentEdition::Proposed.config())
            .unwrap()
            .run(&proposed_document())
            .unwrap();

        let general = output.records("general_receipts").unwrap();
        assert_eq!(
            general.iter().map(|r| r.label.as_str()).collect::<Vec<_>>(),
            vec!["Property Tax", "Measure 1 2020 Bond", "Sales Tax"]
        );
        assert_eq!(general[0].amount, dec("1234567"));
        assert_eq!(general[0].percent, Some(dec("45.2")));
        assert_eq!(general[1].amount, dec("500"));
        assert_eq!(general[1].percent, Some(dec("2.5")));

        let special = output.records("special_receipts").unwrap();
        assert_eq!(special.len(), 1);
        assert_eq!(special[0].amount, dec("300000"));

        assert_eq!(output.records_of_kind(SectionKind::Balances).count(), 0);
        assert!(output.manifest.skipped_rows.is_empty());
        assert!(output.manifest.absent_sections.is_empty());
    }

    #[test]
    fn adopted_gap_rule_breaks_proposed_label() {
        // A single space between digits is a column gap in the adopted layout.
        let output = Pipeline::new(DocumentEdition::Adopted.config())
            .unwrap()
            .run(&proposed_document())
            .unwrap();
        assert_eq!(output.records("general_receipts").unwrap().len(), 2);
        assert_eq!(output.manifest.skipped_rows.len(), 1);
        assert_eq!(output.manifest.skipped_rows[0].reason, "unexpected field count");
        assert_eq!(output.manifest.absent_sections, vec!["available_balances".to_string()]);
    }

    #[test]
    fn uncompilable_rule_variant_is_a_config_error() {
        let mut config = DocumentEdition::Adopted.config();
        config.rule_variant.min_numeric_gap = usize::MAX;
        assert!(matches!(Pipeline::new(config), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn missing_required_end_anchor_fails_document() {
        let mut pages = adopted_document().pages().to_vec();
        pages[1] = pages[1].replace("Total General Receipts", "General Receipts Sum");
        let err = Pipeline::new(DocumentEdition::Adopted.config())
            .unwrap()
            .run(&Document::from_pages(pages))
            .unwrap_err();
        assert!(
            matches!(err, ExtractError::SectionNotFound { ref section, .. } if section == "general_receipts")
        );
    }

    #[test]
    fn missing_optional_section_is_reported() {
        let mut pages = adopted_document().pages().to_vec();
        pages.truncate(2);
        let output = Pipeline::new(DocumentEdition::Adopted.config())
            .unwrap()
            .run(&Document::from_pages(pages))
            .unwrap();
        assert_eq!(output.manifest.absent_sections, vec!["available_balances".to_string()]);
        assert!(output.records("available_balances").is_none());
        assert_eq!(output.records("general_receipts").unwrap().len(), 3);
    }
}
