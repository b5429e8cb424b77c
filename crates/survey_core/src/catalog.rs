use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::error::{CatalogError, LocationError};
use crate::schema::Location;

/// Sector → village → property numbers, as shipped in the catalog file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Catalog {
    sectors: BTreeMap<String, SectorEntry>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct SectorEntry {
    villages: BTreeMap<String, Vec<String>>,
}

impl Catalog {
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let raw = fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&raw).map_err(|source| CatalogError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(raw)
    }

    pub fn sectors(&self) -> Vec<&str> {
        self.sectors.keys().map(String::as_str).collect()
    }

    pub fn villages(&self, sector: &str) -> Vec<&str> {
        self.sectors
            .get(sector)
            .map(|entry| entry.villages.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    pub fn property_numbers(&self, sector: &str, village: &str) -> &[String] {
        self.sectors
            .get(sector)
            .and_then(|entry| entry.villages.get(village))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Check that the village belongs to the sector and the property number
    /// to the village.
    pub fn check(&self, location: &Location) -> Result<(), LocationError> {
        let sector = self
            .sectors
            .get(&location.sector)
            .ok_or_else(|| LocationError::UnknownSector {
                sector: location.sector.clone(),
            })?;
        let properties =
            sector
                .villages
                .get(&location.village)
                .ok_or_else(|| LocationError::UnknownVillage {
                    sector: location.sector.clone(),
                    village: location.village.clone(),
                })?;
        if !properties.iter().any(|p| p == &location.property_number) {
            return Err(LocationError::UnknownPropertyNumber {
                village: location.village.clone(),
                property_number: location.property_number.clone(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const SAMPLE: &str = r#"
sectors:
  Tyre:
    villages:
      Qana: ["101", "102", "103"]
      Srifa: ["7", "8"]
  Bint Jbeil:
    villages:
      Aitaroun: ["55"]
"#;

    pub(crate) fn sample() -> Catalog {
        Catalog::from_yaml_str(SAMPLE).unwrap()
    }

    fn location(sector: &str, village: &str, property: &str) -> Location {
        Location {
            sector: sector.into(),
            village: village.into(),
            property_number: property.into(),
        }
    }

    #[test]
    fn cascading_lists_follow_the_parent_choice() {
        let catalog = sample();
        assert_eq!(catalog.sectors(), vec!["Bint Jbeil", "Tyre"]);
        assert_eq!(catalog.villages("Tyre"), vec!["Qana", "Srifa"]);
        assert_eq!(catalog.property_numbers("Tyre", "Srifa"), ["7", "8"]);
        assert!(catalog.villages("Nowhere").is_empty());
        assert!(catalog.property_numbers("Tyre", "Aitaroun").is_empty());
    }

    #[test]
    fn check_rejects_each_broken_link() {
        let catalog = sample();
        assert!(catalog.check(&location("Tyre", "Qana", "102")).is_ok());
        assert!(matches!(
            catalog.check(&location("Sidon", "Qana", "102")),
            Err(LocationError::UnknownSector { .. })
        ));
        assert!(matches!(
            catalog.check(&location("Tyre", "Aitaroun", "55")),
            Err(LocationError::UnknownVillage { .. })
        ));
        assert!(matches!(
            catalog.check(&location("Tyre", "Qana", "7")),
            Err(LocationError::UnknownPropertyNumber { .. })
        ));
    }
}
