//! Review configuration: which domains to review and how.
//!
//! A config file lists review domains plus global settings:
//!
//! ```json
//! {
//!   "version": "1.0",
//!   "domains": [
//!     {
//!       "id": "zsh",
//!       "name": "Zsh",
//!       "description": "Shell configuration",
//!       "day_of_week": 1,
//!       "target_files": ["zsh/**/*.zsh", ".zshrc"],
//!       "search_hints": {
//!         "primary_keywords": ["zsh", "config"],
//!         "focus_areas": ["startup time"],
//!         "exclude_terms": ["bash"]
//!       },
//!       "analysis_context": {
//!         "current_version": "5.9",
//!         "priority_aspects": ["performance"]
//!       }
//!     }
//!   ],
//!   "global_settings": { "max_search_results": 10 }
//! }
//! ```
//!
//! Files ending in `.yaml`/`.yml` are parsed as YAML, everything else as JSON.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewConfig {
    #[serde(default = "default_version")]
    pub version: String,

    #[serde(default)]
    pub domains: Vec<DomainConfig>,

    #[serde(default)]
    pub global_settings: GlobalSettings,
}

fn default_version() -> String {
    "1.0".to_string()
}

/// One area of the dotfiles under periodic review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainConfig {
    pub id: String,
    pub name: String,

    #[serde(default)]
    pub description: String,

    /// Scheduling hint for the caller (0 = Sunday); not used by the workflow.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day_of_week: Option<u8>,

    /// Glob patterns relative to the content base.
    #[serde(default)]
    pub target_files: Vec<String>,

    #[serde(default)]
    pub search_hints: SearchHints,

    #[serde(default)]
    pub analysis_context: AnalysisContext,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchHints {
    #[serde(default)]
    pub primary_keywords: Vec<String>,
    #[serde(default)]
    pub focus_areas: Vec<String>,
    /// Results mentioning any of these (case-insensitive) are dropped.
    #[serde(default)]
    pub exclude_terms: Vec<String>,
    #[serde(default)]
    pub exclude_domains: Vec<String>,
    #[serde(default)]
    pub include_domains: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_version: Option<String>,
    #[serde(default)]
    pub priority_aspects: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalSettings {
    #[serde(default = "default_max_search_results")]
    pub max_search_results: u32,

    #[serde(default = "default_analysis_temperature")]
    pub analysis_temperature: f64,

    #[serde(default = "default_issue_labels")]
    pub issue_labels: Vec<String>,
}

impl Default for GlobalSettings {
    fn default() -> Self {
        Self {
            max_search_results: default_max_search_results(),
            analysis_temperature: default_analysis_temperature(),
            issue_labels: default_issue_labels(),
        }
    }
}

fn default_max_search_results() -> u32 {
    10
}

fn default_analysis_temperature() -> f64 {
    0.3
}

fn default_issue_labels() -> Vec<String> {
    vec!["dotfiles-kaizen".to_string()]
}

impl ReviewConfig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    pub fn domain(&self, id: &str) -> Option<&DomainConfig> {
        self.domains.iter().find(|d| d.id == id)
    }

    /// Like [`ReviewConfig::domain`], failing with `UnknownDomain`.
    pub fn require_domain(&self, id: &str) -> Result<&DomainConfig, ConfigError> {
        self.domain(id)
            .ok_or_else(|| ConfigError::UnknownDomain(id.to_string()))
    }
}

/// Load a review config file.
pub fn load_config(path: impl AsRef<Path>) -> Result<ReviewConfig, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let is_yaml = matches!(
        path.extension().and_then(|ext| ext.to_str()),
        Some("yaml" | "yml")
    );
    let parsed = if is_yaml {
        ReviewConfig::from_yaml(&content).map_err(|e| e.to_string())
    } else {
        ReviewConfig::from_json(&content).map_err(|e| e.to_string())
    };
    parsed.map_err(|message| ConfigError::Parse {
        path: path.to_path_buf(),
        message,
    })
}
