use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::GaqetError;

pub const DEFAULT_TOOL_CONFIG: &str = "gaqet.json";

/// Program names (or paths) for every external collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ToolConfig {
    pub agat: String,
    pub gffread: String,
    pub busco: String,
    pub gt: String,
    pub ltr_finder: String,
    pub cat: String,
    pub ltr_retriever: String,
    pub lai: String,
    pub stringtie: String,
    pub gffcompare: String,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            agat: "agat_sp_statistics.pl".to_string(),
            gffread: "gffread".to_string(),
            busco: "busco".to_string(),
            gt: "gt".to_string(),
            ltr_finder: "LTR_FINDER_parallel".to_string(),
            cat: "cat".to_string(),
            ltr_retriever: "LTR_retriever".to_string(),
            lai: "LAI".to_string(),
            stringtie: "stringtie".to_string(),
            gffcompare: "gffcompare".to_string(),
        }
    }
}

impl ToolConfig {
    pub fn programs(&self) -> [&str; 10] {
        [
            self.agat.as_str(),
            self.gffread.as_str(),
            self.busco.as_str(),
            self.gt.as_str(),
            self.ltr_finder.as_str(),
            self.cat.as_str(),
            self.ltr_retriever.as_str(),
            self.lai.as_str(),
            self.stringtie.as_str(),
            self.gffcompare.as_str(),
        ]
    }
}

pub struct ToolConfigLoader;

impl ToolConfigLoader {
    /// An explicit path must exist; otherwise `gaqet.json` in the current
    /// directory is used when present, falling back to the built-in defaults.
    pub fn resolve(path: Option<&str>) -> Result<ToolConfig, GaqetError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(DEFAULT_TOOL_CONFIG),
        };

        if path.is_none() && !config_path.exists() {
            return Ok(ToolConfig::default());
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| GaqetError::ToolConfigRead(config_path.clone()))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<ToolConfig, GaqetError> {
        serde_json::from_str(content).map_err(|err| GaqetError::ToolConfigParse(err.to_string()))
    }
}
