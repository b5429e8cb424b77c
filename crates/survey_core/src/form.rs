use serde::{Deserialize, Serialize};

use crate::entries::EntryCollection;
use crate::flow::Step;
use crate::schema::{
    EntryKind, EntryVariant, Location, PropertyUnit, ResidentEntry, Submission,
};
use crate::validate::{self, ValidationResult};

/// Raw values of one floor row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FloorFields {
    pub floor_number: String,
    pub section_type: String,
    pub direction: String,
    pub registrant_name: String,
}

/// Raw values of one resident row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResidentFields {
    pub full_name: String,
    pub mother_name: String,
    pub registry: String,
    pub phone: String,
    pub floor: String,
    pub section_type: String,
    pub direction: String,
}

/// Every form control's current value, as typed by the surveyor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FormSnapshot {
    // step 1
    pub sector: String,
    pub village: String,
    pub neighborhood: String,
    pub building_name: String,
    pub street: String,
    // step 2
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
    // step 3
    pub full_name: String,
    pub mother_name: String,
    pub registry: String,
    pub phone: String,
    // 2a / 2b
    pub floors: EntryCollection<FloorFields>,
    pub residents: EntryCollection<ResidentFields>,
}

impl FormSnapshot {
    /// Turning the in-building toggle off discards block and building count.
    pub fn set_in_building(&mut self, in_building: bool) {
        self.in_building = in_building;
        if !in_building {
            self.block.clear();
            self.building_count.clear();
        }
    }

    /// Clear every value and shrink both collections back to one empty row.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Typed content shown on the review step; stamped into a [`Submission`]
/// on confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Review {
    pub location: Location,
    pub unit: PropertyUnit,
    pub entry: EntryVariant,
}

impl Review {
    /// Parse every step on the path of `kind`. The first step that does not
    /// parse is reported with its errors.
    pub fn from_form(
        form: &FormSnapshot,
        kind: EntryKind,
    ) -> Result<Self, (Step, ValidationResult)> {
        let place = validate::parse_location_step(form).map_err(|e| (Step::Location, e))?;
        let building = validate::parse_building_step(form).map_err(|e| (Step::Building, e))?;

        let entry = match kind {
            EntryKind::Single => EntryVariant::Single {
                contact: validate::parse_contact_step(form).map_err(|e| (Step::Contact, e))?,
            },
            EntryKind::MyFloors => {
                let floors = validate::parse_floor_rows(form).map_err(|e| (Step::MyFloors, e))?;
                let contact =
                    validate::parse_contact_step(form).map_err(|e| (Step::Contact, e))?;
                EntryVariant::MyFloors { contact, floors }
            }
            EntryKind::FullBuilding => {
                let residents =
                    validate::parse_resident_rows(form).map_err(|e| (Step::FullBuilding, e))?;
                // step 3 is skipped on this path; the first resident registers
                let contact = residents
                    .first()
                    .map(ResidentEntry::contact)
                    .unwrap_or_default();
                EntryVariant::FullBuilding { contact, residents }
            }
        };

        Ok(Self {
            location: Location {
                sector: place.sector,
                village: place.village,
                property_number: building.property_number,
            },
            unit: PropertyUnit {
                neighborhood: place.neighborhood,
                building_name: place.building_name,
                street: place.street,
                section_number: building.section_number,
                building_type: building.building_type,
                total_floors: building.total_floors,
                floor_number: building.floor_number,
                section_type: building.section_type,
                direction: building.direction,
                building: building.building,
            },
            entry,
        })
    }

    pub fn into_submission(self, submitted_at: String) -> Submission {
        Submission {
            location: self.location,
            unit: self.unit,
            entry: self.entry,
            submitted_at,
        }
    }
}
