use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;

use crate::models::Hub;
use crate::services::{DirectoryError, HubDirectory};

#[derive(Debug, Deserialize)]
struct SeedFile {
    #[serde(default)]
    hubs: Vec<Hub>,
}

/// In-memory hub directory
///
/// Loaded from a TOML seed file of `[[hubs]]` tables, or built directly in
/// tests. Hubs keep the order they were given in.
#[derive(Debug, Clone, Default)]
pub struct StaticHubDirectory {
    hubs: Vec<Hub>,
}

impl StaticHubDirectory {
    pub fn new(hubs: Vec<Hub>) -> Self {
        Self { hubs }
    }

    pub fn from_toml(contents: &str) -> Result<Self, DirectoryError> {
        let seed: SeedFile = toml::from_str(contents)?;
        Ok(Self::new(seed.hubs))
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, DirectoryError> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        let directory = Self::from_toml(&contents)?;
        tracing::info!("Loaded {} hubs from {}", directory.len(), path.as_ref().display());
        Ok(directory)
    }

    pub fn len(&self) -> usize {
        self.hubs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hubs.is_empty()
    }

    pub fn hubs(&self) -> &[Hub] {
        &self.hubs
    }
}

#[async_trait]
impl HubDirectory for StaticHubDirectory {
    async fn hub(&self, id: &str) -> Result<Option<Hub>, DirectoryError> {
        Ok(self.hubs.iter().find(|h| h.id == id).cloned())
    }

    async fn all_hubs(&self) -> Result<Vec<Hub>, DirectoryError> {
        Ok(self.hubs.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEED: &str = r#"
        [[hubs]]
        id = "waterloo"
        name = "Waterloo"
        lat = 51.5033
        lng = -0.1145
        zone = "1"
        lines = ["Bakerloo", "Jubilee", "Northern", "Waterloo & City"]

        [[hubs]]
        id = "angel"
        name = "Angel"
        lat = 51.5322
        lng = -0.1058
    "#;

    #[tokio::test]
    async fn test_parse_seed() {
        let directory = StaticHubDirectory::from_toml(SEED).unwrap();
        assert_eq!(directory.len(), 2);

        let waterloo = directory.hub("waterloo").await.unwrap().unwrap();
        assert_eq!(waterloo.lines.len(), 4);

        let angel = directory.hub("angel").await.unwrap().unwrap();
        assert!(angel.zone.is_empty());
        assert!(angel.lines.is_empty());

        assert!(directory.hub("bank").await.unwrap().is_none());
    }

    #[test]
    fn test_invalid_seed_is_an_error() {
        let result = StaticHubDirectory::from_toml("[[hubs]]\nid = 3");
        assert!(matches!(result, Err(DirectoryError::ParseError(_))));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let result = StaticHubDirectory::load("does/not/exist.toml");
        assert!(matches!(result, Err(DirectoryError::IoError(_))));
    }

    #[test]
    fn test_bundled_seed_parses() {
        let directory = StaticHubDirectory::load(concat!(env!("CARGO_MANIFEST_DIR"), "/data/hubs.toml")).unwrap();
        assert!(directory.len() >= 25);
        assert!(directory.hubs().iter().all(|h| h.center().is_resolved()));
    }
}
