//! Step validation.
//!
//! Each step has a parser that either yields the step's typed values or the
//! full set of problems found on it. [`validate`] runs the parser for one
//! step and keeps only the problems.
//!
//! Steps 1, 2 and 3 report one message per field. The floor and resident
//! steps report a single batch alert covering every incomplete row.

use regex::Regex;
use std::collections::BTreeMap;
use std::fmt;
use std::num::NonZeroU32;
use std::str::FromStr;
use std::sync::LazyLock;

use crate::flow::Step;
use crate::form::FormSnapshot;
use crate::schema::{
    BuildingBlock, BuildingType, Contact, Direction, FloorEntry, ResidentEntry, SectionType,
};

/// Mobile and landline prefixes followed by six digits.
static PHONE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(03|70|71|76|78|79|81)\d{6}$").expect("Invalid phone regex")
});

// Shared by the contact step and every resident row.
const FULL_NAME_MIN: usize = 5;
const MOTHER_NAME_MIN: usize = 3;
const REGISTRY_MIN: usize = 3;

/// Identifier of a per-field error slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FieldId {
    Sector,
    Village,
    Neighborhood,
    BuildingName,
    Street,
    PropertyNumber,
    SectionNumber,
    Block,
    BuildingCount,
    BuildingType,
    TotalFloors,
    FloorNumber,
    SectionType,
    Direction,
    FullName,
    MotherName,
    Registry,
    Phone,
}

impl FieldId {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldId::Sector => "sector",
            FieldId::Village => "village",
            FieldId::Neighborhood => "neighborhood",
            FieldId::BuildingName => "buildingName",
            FieldId::Street => "street",
            FieldId::PropertyNumber => "propertyNumber",
            FieldId::SectionNumber => "sectionNumber",
            FieldId::Block => "block",
            FieldId::BuildingCount => "buildingCount",
            FieldId::BuildingType => "buildingType",
            FieldId::TotalFloors => "totalFloors",
            FieldId::FloorNumber => "floorNumber",
            FieldId::SectionType => "sectionType",
            FieldId::Direction => "direction",
            FieldId::FullName => "fullName",
            FieldId::MotherName => "motherName",
            FieldId::Registry => "registry",
            FieldId::Phone => "phone",
        }
    }
}

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationResult {
    pub field_errors: BTreeMap<FieldId, String>,
    /// Collection-level alert for the floor and resident steps.
    pub batch_error: Option<String>,
}

impl ValidationResult {
    pub fn is_ok(&self) -> bool {
        self.field_errors.is_empty() && self.batch_error.is_none()
    }

    pub fn error_count(&self) -> usize {
        self.field_errors.len() + usize::from(self.batch_error.is_some())
    }
}

/// Check the fields belonging to `step`. Review and Submitted have nothing
/// to check.
pub fn validate(step: Step, form: &FormSnapshot) -> ValidationResult {
    let outcome = match step {
        Step::Location => parse_location_step(form).err(),
        Step::Building => parse_building_step(form).err(),
        Step::MyFloors => parse_floor_rows(form).err(),
        Step::FullBuilding => parse_resident_rows(form).err(),
        Step::Contact => parse_contact_step(form).err(),
        Step::Review | Step::Submitted => None,
    };
    let result = outcome.unwrap_or_default();
    if !result.is_ok() {
        tracing::debug!(%step, errors = result.error_count(), "step failed validation");
    }
    result
}

/// Lebanese mobile or landline number; spaces and dashes are ignored.
pub fn is_valid_phone(phone: &str) -> bool {
    PHONE.is_match(&normalize_phone(phone))
}

pub fn normalize_phone(phone: &str) -> String {
    phone
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .collect()
}

pub(crate) struct LocationStep {
    pub sector: String,
    pub village: String,
    pub neighborhood: String,
    pub building_name: String,
    pub street: String,
}

pub(crate) struct BuildingStep {
    pub property_number: String,
    pub section_number: String,
    pub building: Option<BuildingBlock>,
    pub building_type: BuildingType,
    pub total_floors: NonZeroU32,
    pub floor_number: u32,
    pub section_type: SectionType,
    pub direction: Direction,
}

pub(crate) fn parse_location_step(form: &FormSnapshot) -> Result<LocationStep, ValidationResult> {
    let mut check = Checker::default();
    let sector = check.text(FieldId::Sector, &form.sector, 1, "Please choose a sector");
    let village = check.text(FieldId::Village, &form.village, 1, "Please choose a property area");
    let neighborhood = check.text(
        FieldId::Neighborhood,
        &form.neighborhood,
        2,
        "Please enter the neighborhood",
    );
    let building_name = check.text(
        FieldId::BuildingName,
        &form.building_name,
        2,
        "Please enter the building name",
    );
    let street = check.text(FieldId::Street, &form.street, 2, "Please enter the street name");

    check.finish(|| {
        Some(LocationStep {
            sector,
            village,
            neighborhood,
            building_name,
            street,
        })
    })
}

pub(crate) fn parse_building_step(form: &FormSnapshot) -> Result<BuildingStep, ValidationResult> {
    let mut check = Checker::default();
    let property_number = check.text(
        FieldId::PropertyNumber,
        &form.property_number,
        1,
        "Please choose a property number",
    );
    let section_number = check.text(
        FieldId::SectionNumber,
        &form.section_number,
        1,
        "Please enter the section number",
    );

    let building = if form.in_building {
        let block = check.text(FieldId::Block, &form.block, 1, "Please enter the block");
        let count = check.count(
            FieldId::BuildingCount,
            &form.building_count,
            "Please enter the number of buildings/blocks",
        );
        count.map(|building_count| {
            Some(BuildingBlock {
                block,
                building_count,
            })
        })
    } else {
        Some(None)
    };

    let building_type = check.choice::<BuildingType>(
        FieldId::BuildingType,
        &form.building_type,
        "Please choose the building type",
    );
    let total_floors = check.count(
        FieldId::TotalFloors,
        &form.total_floors,
        "Please enter the number of floors",
    );
    let floor_number = check.floor(
        FieldId::FloorNumber,
        &form.floor_number,
        "Please enter the floor number",
    );
    let section_type = check.choice::<SectionType>(
        FieldId::SectionType,
        &form.section_type,
        "Please choose the section type",
    );
    let direction =
        check.choice::<Direction>(FieldId::Direction, &form.direction, "Please choose the direction");

    check.finish(|| {
        Some(BuildingStep {
            property_number,
            section_number,
            building: building?,
            building_type: building_type?,
            total_floors: total_floors?,
            floor_number: floor_number?,
            section_type: section_type?,
            direction: direction?,
        })
    })
}

pub(crate) fn parse_contact_step(form: &FormSnapshot) -> Result<Contact, ValidationResult> {
    let mut check = Checker::default();
    let full_name = check.text(
        FieldId::FullName,
        &form.full_name,
        FULL_NAME_MIN,
        "Please enter the full three-part name",
    );
    let mother_name = check.text(
        FieldId::MotherName,
        &form.mother_name,
        MOTHER_NAME_MIN,
        "Please enter the mother's name",
    );
    let registry = check.text(
        FieldId::Registry,
        &form.registry,
        REGISTRY_MIN,
        "Please enter the registry number",
    );
    let phone = check.text(FieldId::Phone, &form.phone, 1, "Please enter the phone number");
    if !phone.is_empty() && !is_valid_phone(&phone) {
        check.fail(FieldId::Phone, "The phone number is not valid");
    }

    check.finish(|| {
        Some(Contact {
            full_name,
            mother_name,
            registry,
            phone: normalize_phone(&phone),
        })
    })
}

pub(crate) fn parse_floor_rows(form: &FormSnapshot) -> Result<Vec<FloorEntry>, ValidationResult> {
    let mut floors = Vec::with_capacity(form.floors.len());
    let mut incomplete = Vec::new();
    for (position, row) in form.floors.iter().enumerate() {
        let parsed = (|| {
            Some(FloorEntry {
                floor_number: parse_floor(&row.floor_number)?,
                section_type: row.section_type.parse().ok()?,
                direction: row.direction.parse().ok()?,
                registrant_name: required(&row.registrant_name)?,
            })
        })();
        match parsed {
            Some(floor) => floors.push(floor),
            None => incomplete.push(position + 1),
        }
    }
    batch_outcome(floors, &incomplete, "floor")
}

pub(crate) fn parse_resident_rows(
    form: &FormSnapshot,
) -> Result<Vec<ResidentEntry>, ValidationResult> {
    let mut residents = Vec::with_capacity(form.residents.len());
    let mut incomplete = Vec::new();
    for (position, row) in form.residents.iter().enumerate() {
        let parsed = (|| {
            Some(ResidentEntry {
                full_name: at_least(&row.full_name, FULL_NAME_MIN)?,
                mother_name: at_least(&row.mother_name, MOTHER_NAME_MIN)?,
                registry: at_least(&row.registry, REGISTRY_MIN)?,
                phone: required(&row.phone)
                    .filter(|phone| is_valid_phone(phone))
                    .map(|phone| normalize_phone(&phone))?,
                floor: parse_floor(&row.floor)?,
                section_type: row.section_type.parse().ok()?,
                direction: row.direction.parse().ok()?,
            })
        })();
        match parsed {
            Some(resident) => residents.push(resident),
            None => incomplete.push(position + 1),
        }
    }
    batch_outcome(residents, &incomplete, "resident")
}

fn batch_outcome<T>(
    rows: Vec<T>,
    incomplete: &[usize],
    noun: &str,
) -> Result<Vec<T>, ValidationResult> {
    if incomplete.is_empty() {
        return Ok(rows);
    }
    let listed = incomplete
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    Err(ValidationResult {
        field_errors: BTreeMap::new(),
        batch_error: Some(format!(
            "Please fill in all required fields for every {noun} (incomplete: {noun} {listed})"
        )),
    })
}

fn required(raw: &str) -> Option<String> {
    let value = raw.trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// Trimmed value with at least `min_chars` characters.
fn at_least(raw: &str, min_chars: usize) -> Option<String> {
    required(raw).filter(|value| value.chars().count() >= min_chars)
}

fn parse_floor(raw: &str) -> Option<u32> {
    raw.trim().parse().ok()
}

fn parse_count(raw: &str) -> Option<NonZeroU32> {
    raw.trim().parse().ok()
}

#[derive(Default)]
struct Checker {
    result: ValidationResult,
}

impl Checker {
    fn fail(&mut self, field: FieldId, message: &str) {
        self.result
            .field_errors
            .entry(field)
            .or_insert_with(|| message.to_string());
    }

    /// Trimmed value; fails when shorter than `min_chars`.
    fn text(&mut self, field: FieldId, raw: &str, min_chars: usize, message: &str) -> String {
        let value = raw.trim();
        if value.chars().count() < min_chars {
            self.fail(field, message);
        }
        value.to_string()
    }

    fn choice<T: FromStr>(&mut self, field: FieldId, raw: &str, message: &str) -> Option<T> {
        if raw.trim().is_empty() {
            self.fail(field, message);
            return None;
        }
        let parsed = raw.parse().ok();
        if parsed.is_none() {
            self.fail(field, &format!("{} is not a valid choice", raw.trim()));
        }
        parsed
    }

    fn count(&mut self, field: FieldId, raw: &str, message: &str) -> Option<NonZeroU32> {
        if raw.trim().is_empty() {
            self.fail(field, message);
            return None;
        }
        let parsed = parse_count(raw);
        if parsed.is_none() {
            self.fail(field, "Please enter a whole number of 1 or more");
        }
        parsed
    }

    fn floor(&mut self, field: FieldId, raw: &str, message: &str) -> Option<u32> {
        if raw.trim().is_empty() {
            self.fail(field, message);
            return None;
        }
        let parsed = parse_floor(raw);
        if parsed.is_none() {
            self.fail(field, "Please enter a whole number of 0 or more");
        }
        parsed
    }

    fn finish<T>(self, build: impl FnOnce() -> Option<T>) -> Result<T, ValidationResult> {
        if !self.result.is_ok() {
            return Err(self.result);
        }
        build().ok_or(self.result)
    }
}
