//! Answers files: a surveyor's form values written down as TOML, so a
//! registration can be filled in without the interactive form.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use survey_core::{EntryCollection, EntryKind, FloorFields, FormSnapshot, ResidentFields};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct Answers {
    /// `single`, `myFloors` or `full`.
    pub entry: EntryKind,

    pub sector: String,
    pub village: String,
    pub neighborhood: String,
    pub building_name: String,
    pub street: String,

    pub property_number: String,
    pub section_number: String,
    pub in_building: bool,
    pub block: String,
    pub building_count: String,
    pub building_type: String,
    pub total_floors: String,
    pub floor_number: String,
    pub section_type: String,
    pub direction: String,

    pub full_name: String,
    pub mother_name: String,
    pub registry: String,
    pub phone: String,

    pub floors: Vec<FloorFields>,
    pub residents: Vec<ResidentFields>,
}

impl Answers {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading answers file {}", path.display()))?;
        Self::from_toml_str(&raw).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn from_toml_str(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    /// Lay the answers out as the form would hold them.
    pub fn into_form(self) -> FormSnapshot {
        let mut form = FormSnapshot {
            sector: self.sector,
            village: self.village,
            neighborhood: self.neighborhood,
            building_name: self.building_name,
            street: self.street,
            property_number: self.property_number,
            section_number: self.section_number,
            block: self.block,
            building_count: self.building_count,
            building_type: self.building_type,
            total_floors: self.total_floors,
            floor_number: self.floor_number,
            section_type: self.section_type,
            direction: self.direction,
            full_name: self.full_name,
            mother_name: self.mother_name,
            registry: self.registry,
            phone: self.phone,
            ..FormSnapshot::default()
        };
        form.set_in_building(self.in_building);
        fill_rows(&mut form.floors, self.floors);
        fill_rows(&mut form.residents, self.residents);
        form
    }
}

/// Write `rows` into the collection, reusing its initial empty row.
fn fill_rows<T: Default>(collection: &mut EntryCollection<T>, rows: Vec<T>) {
    collection.reset();
    for (index, row) in rows.into_iter().enumerate() {
        let handle = match index {
            0 => collection.handles().next(),
            _ => Some(collection.add()),
        };
        if let Some(slot) = handle.and_then(|handle| collection.get_mut(handle)) {
            *slot = row;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn floor_rows_fill_the_collection_in_order() {
        let answers = Answers::from_toml_str(
            r#"
            entry = "myFloors"
            sector = "Tyre"
            block = "B"

            [[floors]]
            floorNumber = "1"
            registrantName = "Ali Hassan"

            [[floors]]
            floorNumber = "3"
            "#,
        )
        .unwrap();
        assert_eq!(answers.entry, EntryKind::MyFloors);

        let form = answers.into_form();
        assert_eq!(form.sector, "Tyre");
        assert_eq!(form.floors.len(), 2);
        let numbers: Vec<&str> = form.floors.iter().map(|f| f.floor_number.as_str()).collect();
        assert_eq!(numbers, ["1", "3"]);
        // one empty resident row remains
        assert_eq!(form.residents.len(), 1);
        // block is dropped when the unit is not in a building
        assert!(form.block.is_empty());
    }

    #[test]
    fn missing_entry_means_single() {
        let answers = Answers::from_toml_str("sector = \"Tyre\"").unwrap();
        assert_eq!(answers.entry, EntryKind::Single);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(Answers::from_toml_str("phonenumber = \"70123456\"").is_err());
    }
}
