use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::NonZeroU32;
use std::str::FromStr;

use crate::error::UnknownValue;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub sector: String,
    pub village: String,         // must belong to `sector` in the catalog
    pub property_number: String, // must belong to `village` in the catalog
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BuildingBlock {
    pub block: String,
    pub building_count: NonZeroU32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PropertyUnit {
    pub neighborhood: String,
    pub building_name: String,
    pub street: String,
    pub section_number: String,
    pub building_type: BuildingType,
    pub total_floors: NonZeroU32,
    pub floor_number: u32,
    pub section_type: SectionType,
    pub direction: Direction,
    /// Present only when the unit sits inside a multi-building block.
    pub building: Option<BuildingBlock>,
}

impl PropertyUnit {
    pub fn in_building(&self) -> bool {
        self.building.is_some()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub full_name: String,
    pub mother_name: String,
    pub registry: String,
    pub phone: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FloorEntry {
    pub floor_number: u32,
    pub section_type: SectionType,
    pub direction: Direction,
    pub registrant_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResidentEntry {
    pub full_name: String,
    pub mother_name: String,
    pub registry: String,
    pub phone: String,
    pub floor: u32,
    pub section_type: SectionType,
    pub direction: Direction,
}

impl ResidentEntry {
    pub fn contact(&self) -> Contact {
        Contact {
            full_name: self.full_name.clone(),
            mother_name: self.mother_name.clone(),
            registry: self.registry.clone(),
            phone: self.phone.clone(),
        }
    }
}

/// The shape of one submission. Sub-entry lists are never empty and keep
/// the order they were authored in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "entryType", rename_all = "camelCase")]
pub enum EntryVariant {
    Single {
        contact: Contact,
    },
    MyFloors {
        contact: Contact,
        floors: Vec<FloorEntry>,
    },
    #[serde(rename = "full")]
    FullBuilding {
        contact: Contact,
        residents: Vec<ResidentEntry>,
    },
}

impl EntryVariant {
    pub fn kind(&self) -> EntryKind {
        match self {
            EntryVariant::Single { .. } => EntryKind::Single,
            EntryVariant::MyFloors { .. } => EntryKind::MyFloors,
            EntryVariant::FullBuilding { .. } => EntryKind::FullBuilding,
        }
    }

    /// Floor and resident entries must carry at least one sub-entry.
    pub fn has_sub_entries(&self) -> bool {
        match self {
            EntryVariant::Single { .. } => true,
            EntryVariant::MyFloors { floors, .. } => !floors.is_empty(),
            EntryVariant::FullBuilding { residents, .. } => !residents.is_empty(),
        }
    }

    pub fn contact(&self) -> &Contact {
        match self {
            EntryVariant::Single { contact }
            | EntryVariant::MyFloors { contact, .. }
            | EntryVariant::FullBuilding { contact, .. } => contact,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub location: Location,
    pub unit: PropertyUnit,
    pub entry: EntryVariant,
    pub submitted_at: String, // RFC 3339, UTC
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum EntryKind {
    #[default]
    Single,
    MyFloors,
    #[serde(rename = "full")]
    FullBuilding,
}

impl EntryKind {
    /// Label written to the entry-type column of an export.
    pub fn label(&self) -> &'static str {
        match self {
            EntryKind::Single => "single",
            EntryKind::MyFloors => "my floors",
            EntryKind::FullBuilding => "full building",
        }
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            EntryKind::Single => "single",
            EntryKind::MyFloors => "myFloors",
            EntryKind::FullBuilding => "full",
        };
        write!(f, "{value}")
    }
}

impl FromStr for EntryKind {
    type Err = UnknownValue;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "single" => Ok(EntryKind::Single),
            "myFloors" => Ok(EntryKind::MyFloors),
            "full" => Ok(EntryKind::FullBuilding),
            other => Err(UnknownValue(other.to_string())),
        }
    }
}

/// Declares a closed, lowercase-serialized option set with `as_str`,
/// `Display` and `FromStr`.
macro_rules! option_set {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
        #[serde(rename_all = "lowercase")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownValue;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                match value.trim() {
                    $($text => Ok($name::$variant),)+
                    other => Err(UnknownValue(other.to_string())),
                }
            }
        }
    };
}

option_set!(
    /// Use of the damaged section.
    SectionType {
        House => "house",
        Shop => "shop",
        Warehouse => "warehouse",
        Office => "office",
        Clinic => "clinic",
        Factory => "factory",
        Other => "other",
    }
);

option_set!(
    /// Compass side of the building the section faces.
    Direction {
        North => "north",
        South => "south",
        East => "east",
        West => "west",
        Northeast => "northeast",
        Northwest => "northwest",
        Southeast => "southeast",
        Southwest => "southwest",
    }
);

option_set!(BuildingType {
    Residential => "residential",
    Commercial => "commercial",
    Mixed => "mixed",
    Industrial => "industrial",
    Public => "public",
    Other => "other",
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn option_sets_parse_their_own_labels() {
        for direction in Direction::ALL {
            assert_eq!(direction.as_str().parse::<Direction>(), Ok(*direction));
        }
        assert_eq!(" shop ".parse::<SectionType>(), Ok(SectionType::Shop));
        assert!("north-east".parse::<Direction>().is_err());
    }

    #[test]
    fn unknown_values_name_the_rejected_input() {
        let err = "attic".parse::<SectionType>().unwrap_err();
        assert_eq!(err, UnknownValue("attic".into()));
        assert_eq!(err.to_string(), "unknown value: attic");
        assert_eq!(
            "everything".parse::<EntryKind>().unwrap_err().to_string(),
            "unknown value: everything"
        );
    }

    #[test]
    fn entry_variant_is_tagged_with_the_persisted_kind() {
        let entry = EntryVariant::FullBuilding {
            contact: Contact {
                full_name: "Ali Hassan Khalil".into(),
                mother_name: "Zeinab".into(),
                registry: "114".into(),
                phone: "70123456".into(),
            },
            residents: Vec::new(),
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["entryType"], "full");
        assert_eq!(entry.kind().to_string(), "full");
        assert_eq!(entry.kind().label(), "full building");
    }
}
