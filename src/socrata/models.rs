// src/socrata/models.rs
use serde::{Deserialize, Serialize};

/// One row of the published revenue dataset as the SODA API returns it.
/// Socrata serializes numbers as strings and omits empty cells.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoricalRevenue {
    #[serde(default)]
    pub revenue_source: Option<String>,
    #[serde(default)]
    pub amount: Option<String>,
    #[serde(default)]
    pub fund_type: Option<String>,
    #[serde(default)]
    pub fiscal_year: Option<String>,
    /// Shorthand fiscal year (e.g. "2022" for 2021-2022).
    #[serde(default)]
    pub fiscal_year_2: Option<String>,
}

/// Where the published dataset lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetLocation {
    pub domain: String,
    pub dataset_id: String,
}

impl DatasetLocation {
    /// Constructs the SODA resource URL for this dataset.
    pub fn resource_url(&self, limit: usize) -> String {
        format!(
            "https://{}/resource/{}.json?$limit={}",
            self.domain, self.dataset_id, limit
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resource_url_includes_limit() {
        let location = DatasetLocation {
            domain: "data.lacity.org".to_string(),
            dataset_id: "ih6g-qkwz".to_string(),
        };
        assert_eq!(
            location.resource_url(50000),
            "https://data.lacity.org/resource/ih6g-qkwz.json?$limit=50000"
        );
    }

    #[test]
    fn missing_cells_deserialize_as_none() {
        let rows: Vec<HistoricalRevenue> = serde_json::from_str(
            r#"[{"revenue_source": "Property Tax", "amount": "100", "fiscal_year_2": "2020"}]"#,
        )
        .unwrap();
        assert_eq!(rows[0].revenue_source.as_deref(), Some("Property Tax"));
        assert!(rows[0].fund_type.is_none());
    }
}
