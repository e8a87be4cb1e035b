//! Sources and keywords to scan for.
//!
//! Without `--config` the built-in board list is used. A config file is YAML:
//!
//! ```yaml
//! keywords:
//!   - Solutions Engineer
//!   - Forward Deployed
//! sources:
//!   - name: Palantir
//!     url: https://jobs.lever.co/palantir
//!     kind: lever
//!     politeness_delay_ms: 1000
//! ```

use crate::error::ConfigError;
use crate::filter::KeywordFilter;
use crate::models::{SourceDescriptor, SourceKind};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{info, instrument, warn};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct FeedConfig {
    pub keywords: Vec<String>,
    pub sources: Vec<SourceDescriptor>,
}

impl Default for FeedConfig {
    fn default() -> Self {
        let keywords = [
            "Solutions Engineer",
            "Sales Engineer",
            "Forward Deployed",
            "Deployment",
            "Implementation",
            "Solutions Consultant",
            "Technical Success",
            "Partner Engineer",
        ];

        use SourceKind::*;
        let sources = [
            // dev tools
            ("Datadog", "https://boards.greenhouse.io/datadog", Greenhouse),
            ("MongoDB", "https://boards.greenhouse.io/mongodb", Greenhouse),
            ("Postman", "https://boards.greenhouse.io/postman", Greenhouse),
            // defense / hard tech
            ("Anduril", "https://boards.greenhouse.io/andurilindustries", Greenhouse),
            ("Palantir", "https://jobs.lever.co/palantir", Lever),
            ("Vannevar Labs", "https://jobs.ashbyhq.com/vannevarlabs", Ashby),
            ("Hadrian", "https://jobs.ashbyhq.com/hadrian", Ashby),
            // startups
            ("Linear", "https://jobs.ashbyhq.com/linear", Ashby),
            ("Rippling", "https://jobs.ashbyhq.com/rippling", Ashby),
        ];

        Self {
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            sources: sources
                .into_iter()
                .map(|(name, url, kind)| SourceDescriptor::new(name, url, kind))
                .collect(),
        }
    }
}

impl FeedConfig {
    /// Read and validate a YAML config file.
    #[instrument(level = "info")]
    pub async fn load(path: &str) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Read {
                path: path.to_string(),
                source,
            })?;
        let config = Self::from_yaml_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_string(),
            source,
        })?;
        config.validate()?;
        info!(
            sources = config.sources.len(),
            keywords = config.keywords.len(),
            "Loaded config"
        );
        Ok(config)
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(raw)
    }

    /// Check every source URL parses before any request goes out.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for source in &self.sources {
            if let Err(e) = source.endpoint() {
                return Err(ConfigError::InvalidSource {
                    name: source.name.clone(),
                    url: source.url.clone(),
                    source: e,
                });
            }
            if source.kind == SourceKind::Ashby && source.slug().is_none() {
                warn!(source = %source.name, url = %source.url, "Ashby source has no board slug; it will fail every run");
            }
        }
        if KeywordFilter::new(&self.keywords).is_empty() {
            warn!("No keywords configured; nothing will match");
        }
        Ok(())
    }
}
