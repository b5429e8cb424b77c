//! Flattening of stored submissions into one uniform table.
//!
//! Every submission yields a base row. Single entries emit it as is; floor
//! and resident entries emit one copy per sub-entry with the sub-entry's
//! values written over it and a `"{i}.{j}"` registration number.

use schemars::JsonSchema;
use serde::Serialize;

use crate::error::ExportError;
use crate::schema::{EntryVariant, FloorEntry, ResidentEntry, Submission};
use crate::store::LoadReport;

/// One row of the export. All rows carry every column; columns a row has
/// no value for are empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, JsonSchema)]
pub struct FlatRecord {
    #[serde(rename = "Registration No.")]
    pub registration: String,
    #[serde(rename = "Registered At")]
    pub registered_at: String,
    #[serde(rename = "Sector")]
    pub sector: String,
    #[serde(rename = "Village")]
    pub village: String,
    #[serde(rename = "Neighborhood")]
    pub neighborhood: String,
    #[serde(rename = "Building Name")]
    pub building_name: String,
    #[serde(rename = "Street")]
    pub street: String,
    #[serde(rename = "Property Number")]
    pub property_number: String,
    #[serde(rename = "Section Number")]
    pub section_number: String,
    #[serde(rename = "In Building")]
    pub in_building: String,
    #[serde(rename = "Block")]
    pub block: String,
    #[serde(rename = "Building Count")]
    pub building_count: String,
    #[serde(rename = "Building Type")]
    pub building_type: String,
    #[serde(rename = "Total Floors")]
    pub total_floors: String,
    #[serde(rename = "Floor Number")]
    pub floor_number: String,
    #[serde(rename = "Section Type")]
    pub section_type: String,
    #[serde(rename = "Direction")]
    pub direction: String,
    #[serde(rename = "Full Name")]
    pub full_name: String,
    #[serde(rename = "Mother Name")]
    pub mother_name: String,
    #[serde(rename = "Registry")]
    pub registry: String,
    #[serde(rename = "Phone")]
    pub phone: String,
    #[serde(rename = "Entry Type")]
    pub entry_type: String,
    #[serde(rename = "Registered Floors")]
    pub registered_floors: String,
    #[serde(rename = "Residents")]
    pub residents: String,
    #[serde(rename = "Registrant Name")]
    pub registrant_name: String,
    #[serde(rename = "Resident Name")]
    pub resident_name: String,
    #[serde(rename = "Resident Mother Name")]
    pub resident_mother_name: String,
    #[serde(rename = "Resident Registry")]
    pub resident_registry: String,
    #[serde(rename = "Resident Phone")]
    pub resident_phone: String,
}

impl FlatRecord {
    /// Column headers in output order.
    pub const COLUMNS: [&'static str; 29] = [
        "Registration No.",
        "Registered At",
        "Sector",
        "Village",
        "Neighborhood",
        "Building Name",
        "Street",
        "Property Number",
        "Section Number",
        "In Building",
        "Block",
        "Building Count",
        "Building Type",
        "Total Floors",
        "Floor Number",
        "Section Type",
        "Direction",
        "Full Name",
        "Mother Name",
        "Registry",
        "Phone",
        "Entry Type",
        "Registered Floors",
        "Residents",
        "Registrant Name",
        "Resident Name",
        "Resident Mother Name",
        "Resident Registry",
        "Resident Phone",
    ];

    fn base(position: usize, submission: &Submission) -> Self {
        let unit = &submission.unit;
        let contact = submission.entry.contact();
        Self {
            registration: position.to_string(),
            registered_at: submission.submitted_at.clone(),
            sector: submission.location.sector.clone(),
            village: submission.location.village.clone(),
            neighborhood: unit.neighborhood.clone(),
            building_name: unit.building_name.clone(),
            street: unit.street.clone(),
            property_number: submission.location.property_number.clone(),
            section_number: unit.section_number.clone(),
            in_building: if unit.in_building() { "yes" } else { "no" }.to_string(),
            block: unit
                .building
                .as_ref()
                .map(|b| b.block.clone())
                .unwrap_or_default(),
            building_count: unit
                .building
                .as_ref()
                .map(|b| b.building_count.to_string())
                .unwrap_or_default(),
            building_type: unit.building_type.to_string(),
            total_floors: unit.total_floors.to_string(),
            floor_number: unit.floor_number.to_string(),
            section_type: unit.section_type.to_string(),
            direction: unit.direction.to_string(),
            full_name: contact.full_name.clone(),
            mother_name: contact.mother_name.clone(),
            registry: contact.registry.clone(),
            phone: contact.phone.clone(),
            entry_type: submission.entry.kind().label().to_string(),
            ..Self::default()
        }
    }

    fn with_floor(&self, position: usize, sub: usize, floor: &FloorEntry) -> Self {
        Self {
            registration: format!("{position}.{sub}"),
            floor_number: floor.floor_number.to_string(),
            section_type: floor.section_type.to_string(),
            direction: floor.direction.to_string(),
            registrant_name: floor.registrant_name.clone(),
            ..self.clone()
        }
    }

    fn with_resident(&self, position: usize, sub: usize, resident: &ResidentEntry) -> Self {
        Self {
            registration: format!("{position}.{sub}"),
            floor_number: resident.floor.to_string(),
            section_type: resident.section_type.to_string(),
            direction: resident.direction.to_string(),
            resident_name: resident.full_name.clone(),
            resident_mother_name: resident.mother_name.clone(),
            resident_registry: resident.registry.clone(),
            resident_phone: resident.phone.clone(),
            ..self.clone()
        }
    }
}

/// Expand submissions, in the given order, into flat rows.
pub fn flatten(submissions: &[Submission]) -> Result<Vec<FlatRecord>, ExportError> {
    if submissions.is_empty() {
        return Err(ExportError::EmptyInput);
    }

    let mut rows = Vec::with_capacity(submissions.len());
    for (index, submission) in submissions.iter().enumerate() {
        let position = index + 1;
        let mut base = FlatRecord::base(position, submission);
        match &submission.entry {
            EntryVariant::Single { .. } => rows.push(base),
            EntryVariant::MyFloors { floors, .. } => {
                base.registered_floors = floors.len().to_string();
                rows.extend(
                    floors
                        .iter()
                        .enumerate()
                        .map(|(j, floor)| base.with_floor(position, j + 1, floor)),
                );
            }
            EntryVariant::FullBuilding { residents, .. } => {
                base.residents = residents.len().to_string();
                rows.extend(
                    residents
                        .iter()
                        .enumerate()
                        .map(|(j, resident)| base.with_resident(position, j + 1, resident)),
                );
            }
        }
    }
    Ok(rows)
}

/// Counts reported back to whoever triggered the export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportSummary {
    pub submissions: usize,
    pub rows: usize,
    /// Stored records that could not be read and were left out.
    pub skipped: usize,
}

/// Flatten everything a store load produced, keeping count of the records
/// it had to skip.
pub fn flatten_report(
    report: &LoadReport,
) -> Result<(Vec<FlatRecord>, ExportSummary), ExportError> {
    let rows = flatten(&report.submissions)?;
    let summary = ExportSummary {
        submissions: report.submissions.len(),
        rows: rows.len(),
        skipped: report.malformed.len(),
    };
    tracing::info!(
        submissions = summary.submissions,
        rows = summary.rows,
        skipped = summary.skipped,
        "submissions flattened"
    );
    Ok((rows, summary))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Direction, SectionType};
    use crate::store::tests::submission;
    use crate::store::{MalformedRecord, SubmissionKey};

    #[test]
    fn columns_match_serialized_headers() {
        let value = serde_json::to_value(FlatRecord::default()).unwrap();
        let mut keys: Vec<&str> = value.as_object().unwrap().keys().map(String::as_str).collect();
        let mut expected = FlatRecord::COLUMNS.to_vec();
        keys.sort_unstable();
        expected.sort_unstable();
        assert_eq!(keys, expected);
    }

    #[test]
    fn resident_rows_overwrite_unit_placement() {
        let mut full = submission("Ali Hassan");
        let resident = ResidentEntry {
            full_name: "Mariam Saad".into(),
            mother_name: "Hoda".into(),
            registry: "77".into(),
            phone: "03123456".into(),
            floor: 3,
            section_type: SectionType::Clinic,
            direction: Direction::Southwest,
        };
        full.entry = EntryVariant::FullBuilding {
            contact: resident.contact(),
            residents: vec![resident],
        };

        let rows = flatten(&[full]).unwrap();
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.registration, "1.1");
        assert_eq!(row.entry_type, "full building");
        assert_eq!(row.residents, "1");
        assert_eq!(row.floor_number, "3");
        assert_eq!(row.section_type, "clinic");
        assert_eq!(row.direction, "southwest");
        assert_eq!(row.resident_name, "Mariam Saad");
        assert_eq!(row.full_name, "Mariam Saad");
        assert_eq!(row.registrant_name, "");
    }

    #[test]
    fn report_summary_counts_skipped_records() {
        let report = LoadReport {
            submissions: vec![submission("Ali Hassan")],
            malformed: vec![MalformedRecord {
                key: SubmissionKey::from_millis(5),
                reason: "expected value".into(),
            }],
        };
        let (rows, summary) = flatten_report(&report).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(
            summary,
            ExportSummary {
                submissions: 1,
                rows: 1,
                skipped: 1
            }
        );
        assert_eq!(rows[0].in_building, "no");
        assert_eq!(rows[0].entry_type, "single");
    }

    #[test]
    fn empty_input_is_an_error() {
        assert_eq!(flatten(&[]), Err(ExportError::EmptyInput));
        assert!(flatten_report(&LoadReport::default()).is_err());
    }
}
