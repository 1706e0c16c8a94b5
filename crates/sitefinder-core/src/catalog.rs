// ── Static site catalog ──
//
// Loaded once at startup from a JSON array and never mutated. Cloning a
// catalog shares the same backing slice.

use std::path::Path;
use std::sync::Arc;

use tracing::info;

use crate::error::CoreError;
use crate::filter;
use crate::model::{Coordinate, Site};

#[derive(Debug, Clone, Default)]
pub struct SiteCatalog {
    sites: Arc<[Site]>,
}

impl SiteCatalog {
    pub fn new(sites: Vec<Site>) -> Self {
        Self {
            sites: sites.into(),
        }
    }

    /// Parse a JSON array of sites.
    pub fn from_json(raw: &str) -> Result<Self, CoreError> {
        let sites: Vec<Site> = serde_json::from_str(raw).map_err(|e| CoreError::Catalog {
            message: format!("invalid catalog JSON: {e}"),
        })?;
        if let Some(bad) = sites
            .iter()
            .find(|s| !s.lat.is_finite() || !s.lng.is_finite())
        {
            return Err(CoreError::Catalog {
                message: format!("site '{}' has a non-finite coordinate", bad.name),
            });
        }
        Ok(Self::new(sites))
    }

    /// Read and parse a catalog file.
    pub fn load(path: &Path) -> Result<Self, CoreError> {
        let raw = std::fs::read_to_string(path).map_err(|e| CoreError::Catalog {
            message: format!("cannot read {}: {e}", path.display()),
        })?;
        let catalog = Self::from_json(&raw)?;
        info!(path = %path.display(), sites = catalog.len(), "site catalog loaded");
        Ok(catalog)
    }

    pub fn sites(&self) -> &[Site] {
        &self.sites
    }

    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    pub fn nearby(&self, position: Coordinate, radius_km: f64) -> Vec<Site> {
        filter::nearby(position, radius_km, &self.sites)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"name":"A","lat":37.5665,"lng":126.978,"openingHours":"24h"}},
               {{"name":"B","latitude":37.57,"longitude":126.98}}]"#
        )
        .unwrap();

        let catalog = SiteCatalog::load(file.path()).unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.sites()[0].opening_hours.as_deref(), Some("24h"));
        assert_eq!(catalog.sites()[1].name, "B");
    }

    #[test]
    fn missing_file_is_catalog_error() {
        let err = SiteCatalog::load(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(matches!(err, CoreError::Catalog { .. }));
    }

    #[test]
    fn rejects_non_array() {
        let err = SiteCatalog::from_json(r#"{"name":"A"}"#).unwrap_err();
        assert!(matches!(err, CoreError::Catalog { .. }));
    }

    #[test]
    fn clones_share_storage() {
        let catalog = SiteCatalog::new(vec![Site::new("A", 1.0, 2.0)]);
        let copy = catalog.clone();
        assert!(std::ptr::eq(catalog.sites(), copy.sites()));
    }
}
