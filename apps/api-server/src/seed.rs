//! Startup seed of the domain and theme directories.
//!
//! Domain and theme records are owned by other parts of a deployment; for
//! local runs they are loaded from a JSON file (`SEED_PATH`):
//!
//! ```json
//! {
//!   "themes": [{"id": "bartik", "name": "Bartik"}],
//!   "domains": [{"id": "example_com", "hostname": "example.com"}]
//! }
//! ```

use std::fmt;
use std::path::Path;

use serde::Deserialize;
use theme_switch::{CoreError, Domain, DomainId, Theme};

#[derive(Debug, Deserialize)]
pub struct Seed {
    #[serde(default = "default_themes")]
    pub themes: Vec<SeedTheme>,
    #[serde(default)]
    pub domains: Vec<SeedDomain>,
}

#[derive(Debug, Deserialize)]
pub struct SeedTheme {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct SeedDomain {
    pub id: String,
    pub hostname: String,
}

#[derive(Debug)]
pub enum SeedError {
    Io(std::io::Error),
    Parse(serde_json::Error),
    Invalid(CoreError),
}

impl fmt::Display for SeedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeedError::Io(e) => write!(f, "read seed file: {}", e),
            SeedError::Parse(e) => write!(f, "parse seed file: {}", e),
            SeedError::Invalid(e) => write!(f, "invalid seed entry: {}", e),
        }
    }
}

impl std::error::Error for SeedError {}

fn default_themes() -> Vec<SeedTheme> {
    [("bartik", "Bartik"), ("seven", "Seven"), ("stark", "Stark")]
        .into_iter()
        .map(|(id, name)| SeedTheme {
            id: id.into(),
            name: name.into(),
        })
        .collect()
}

impl Default for Seed {
    fn default() -> Self {
        Self {
            themes: default_themes(),
            domains: Vec::new(),
        }
    }
}

impl Seed {
    pub fn from_json(raw: &str) -> Result<Self, SeedError> {
        serde_json::from_str(raw).map_err(SeedError::Parse)
    }

    /// Read the seed file, or the built-in seed when no path is configured.
    pub fn load(path: Option<&Path>) -> Result<Self, SeedError> {
        match path {
            Some(p) => Self::from_json(&std::fs::read_to_string(p).map_err(SeedError::Io)?),
            None => Ok(Self::default()),
        }
    }

    /// Validated domains and themes, in file order.
    pub fn into_parts(self) -> Result<(Vec<Domain>, Vec<Theme>), SeedError> {
        let domains = self
            .domains
            .into_iter()
            .map(|d| -> Result<Domain, CoreError> {
                Ok(Domain::new(DomainId::new(d.id)?, d.hostname))
            })
            .collect::<Result<Vec<_>, CoreError>>()
            .map_err(SeedError::Invalid)?;
        let themes = self
            .themes
            .into_iter()
            .map(|t| Theme::new(t.id, t.name))
            .collect();
        Ok((domains, themes))
    }
}
