//! Pipeline kinds
//!
//! The closed set of pipelines this tool knows how to run. Each kind carries
//! its endpoint, headers, reference table and schema defaults; config can
//! override any of them.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use eyre::{Context, Result};
use fieldpath::FieldSchema;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::Config;
use crate::storage::PipelineDirs;

pub mod embedded;

const PROVIDER_DETAILS_URL: &str = "https://www.myagedcare.gov.au/api/v1/find-a-provider/details";

/// A pipeline kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineKind {
    /// Provider operations and finances, one row per provider
    Operations,
    /// Refundable accommodation deposits, one row per room type
    Rads,
}

impl PipelineKind {
    pub const ALL: [PipelineKind; 2] = [PipelineKind::Operations, PipelineKind::Rads];

    /// Name used in directories, file names and logs
    pub fn name(&self) -> &'static str {
        match self {
            Self::Operations => "operations",
            Self::Rads => "rads",
        }
    }

    pub fn default_endpoint(&self) -> String {
        match self {
            Self::Operations => format!(
                "{}/{{nid}}?search=search-by-name&searchType=agedCareHomes",
                PROVIDER_DETAILS_URL
            ),
            Self::Rads => format!(
                "{}/{{nid}}?search=search-by-name&searchType=companyName&start=0&rows=20&sort=titleAsc",
                PROVIDER_DETAILS_URL
            ),
        }
    }

    pub fn default_headers(&self) -> BTreeMap<String, String> {
        let pairs: &[(&str, &str)] = match self {
            Self::Operations => &[
                ("accept", "application/json, text/plain, */*"),
                ("referer", "https://www.myagedcare.gov.au/find-a-provider/aged-care-homes/"),
                ("sec-ch-ua-mobile", "?0"),
                ("user-agent", "OperationsBot/1.0"),
            ],
            Self::Rads => &[
                ("accept", "application/json, text/plain, */*"),
                ("referer", "https://www.myagedcare.gov.au/find-a-provider/"),
                (
                    "user-agent",
                    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/134.0.0.0 Safari/537.36",
                ),
            ],
        };
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    pub fn default_nids_csv(&self) -> PathBuf {
        match self {
            Self::Operations => PathBuf::from("data/refs/NIDs_Only.csv"),
            Self::Rads => PathBuf::from("data/refs/ProviderDirectory.csv"),
        }
    }

    pub fn embedded_schema(&self) -> &'static str {
        match self {
            Self::Operations => embedded::OPERATIONS_SCHEMA,
            Self::Rads => embedded::RADS_SCHEMA,
        }
    }
}

impl std::str::FromStr for PipelineKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "operations" | "ops" => Ok(Self::Operations),
            "rads" | "rad" => Ok(Self::Rads),
            _ => Err(format!("Unknown pipeline: {}. Use: operations or rads", s)),
        }
    }
}

impl std::fmt::Display for PipelineKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A pipeline kind with config overrides applied
#[derive(Debug, Clone)]
pub struct Pipeline {
    pub kind: PipelineKind,
    pub schema: FieldSchema,
    pub endpoint: String,
    pub headers: BTreeMap<String, String>,
    pub nids_csv: PathBuf,
    pub dirs: PipelineDirs,
    pub fallback_raw_dir: Option<PathBuf>,
}

impl Pipeline {
    /// Resolve a pipeline kind against configuration
    pub fn from_config(kind: PipelineKind, config: &Config) -> Result<Self> {
        let overrides = config.pipeline(kind);

        let schema = match &overrides.schema_file {
            Some(path) => {
                let text = fs::read_to_string(path)
                    .context(format!("Failed to read schema file {}", path.display()))?;
                FieldSchema::from_yaml(&text).context(format!("Invalid schema file {}", path.display()))?
            }
            None => FieldSchema::from_yaml(kind.embedded_schema())
                .context(format!("Invalid embedded schema for {}", kind))?,
        };
        debug!(pipeline = %kind, columns = schema.len(), "Pipeline::from_config: schema loaded");

        Ok(Self {
            kind,
            schema,
            endpoint: overrides.endpoint.clone().unwrap_or_else(|| kind.default_endpoint()),
            headers: overrides.headers.clone().unwrap_or_else(|| kind.default_headers()),
            nids_csv: overrides.nids_csv.clone().unwrap_or_else(|| kind.default_nids_csv()),
            dirs: PipelineDirs::new(kind, &config.paths),
            fallback_raw_dir: overrides.fallback_raw_dir.clone(),
        })
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldpath::ColumnSource;

    #[test]
    fn test_parse_and_display() {
        assert_eq!("operations".parse::<PipelineKind>().unwrap(), PipelineKind::Operations);
        assert_eq!("RADS".parse::<PipelineKind>().unwrap(), PipelineKind::Rads);
        assert!("homes".parse::<PipelineKind>().is_err());
        assert_eq!(PipelineKind::Rads.to_string(), "rads");
    }

    #[test]
    fn test_embedded_schemas_load() {
        for kind in PipelineKind::ALL {
            let schema = FieldSchema::from_yaml(kind.embedded_schema()).unwrap();
            assert_eq!(schema.column_names().next(), Some("nid"));
        }
    }

    #[test]
    fn test_operations_schema_is_single_row() {
        let schema = FieldSchema::from_yaml(PipelineKind::Operations.embedded_schema()).unwrap();
        assert!(schema.expansion().is_none());
        assert!(schema.column_names().any(|c| c == "rating_compliance"));
    }

    #[test]
    fn test_rads_schema_expands_room_costs() {
        let schema = FieldSchema::from_yaml(PipelineKind::Rads.embedded_schema()).unwrap();
        assert_eq!(schema.expansion().unwrap().to_string(), "ach_room_costs.subtypes");
        let composite = schema
            .columns()
            .iter()
            .find(|c| c.name == "suburb_postcode")
            .unwrap();
        assert!(matches!(composite.source, ColumnSource::Join { .. }));
    }

    #[test]
    fn test_default_endpoints_take_nid() {
        for kind in PipelineKind::ALL {
            assert!(kind.default_endpoint().contains("/details/{nid}?"));
            assert!(kind.default_headers().contains_key("referer"));
            assert!(kind.default_headers().contains_key("accept"));
        }
    }

    #[test]
    fn test_from_config_applies_overrides() {
        let mut config = Config::default();
        config.pipelines.rads.endpoint = Some("http://localhost:9/{nid}".to_string());
        config.pipelines.rads.nids_csv = Some(PathBuf::from("/tmp/nids.csv"));

        let rads = Pipeline::from_config(PipelineKind::Rads, &config).unwrap();
        assert_eq!(rads.endpoint, "http://localhost:9/{nid}");
        assert_eq!(rads.nids_csv, PathBuf::from("/tmp/nids.csv"));
        assert_eq!(rads.dirs.raw, PathBuf::from("data/raw/rads"));

        let ops = Pipeline::from_config(PipelineKind::Operations, &config).unwrap();
        assert_eq!(ops.nids_csv, PathBuf::from("data/refs/NIDs_Only.csv"));
    }

    #[test]
    fn test_from_config_missing_schema_file() {
        let mut config = Config::default();
        config.pipelines.operations.schema_file = Some(PathBuf::from("/nonexistent/schema.yml"));
        assert!(Pipeline::from_config(PipelineKind::Operations, &config).is_err());
    }
}
