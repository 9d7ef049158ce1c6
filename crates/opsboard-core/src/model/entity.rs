// ── Map entity model ──
//
// Emergencies and vehicles arrive as full-replacement snapshots. Kind,
// status, and priority stay as the raw labels the feed sends; the style
// tables in `map::style` interpret them.

use std::fmt;

use serde::{Deserialize, Serialize};

/// WGS84 position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Finite and inside the lat/lng ranges.
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.4}, {:.4})", self.lat, self.lng)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Emergency {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub location: String,
    pub coordinates: Coordinates,
    pub status: String,
    pub priority: String,
    pub time: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vehicle {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub location: String,
    pub coordinates: Coordinates,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,
}

/// One full entity snapshot as supplied by the feed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntitySnapshot {
    #[serde(default)]
    pub emergencies: Vec<Emergency>,
    #[serde(default)]
    pub vehicles: Vec<Vehicle>,
}

impl EntitySnapshot {
    pub fn len(&self) -> usize {
        self.emergencies.len() + self.vehicles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.emergencies.is_empty() && self.vehicles.is_empty()
    }
}

// ── EntityKey ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityClass {
    Emergency,
    Vehicle,
}

/// Identity of a map entity across snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityKey {
    pub class: EntityClass,
    pub id: String,
}

impl EntityKey {
    pub fn emergency(id: impl Into<String>) -> Self {
        Self {
            class: EntityClass::Emergency,
            id: id.into(),
        }
    }

    pub fn vehicle(id: impl Into<String>) -> Self {
        Self {
            class: EntityClass::Vehicle,
            id: id.into(),
        }
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.class {
            EntityClass::Emergency => write!(f, "emergency:{}", self.id),
            EntityClass::Vehicle => write!(f, "vehicle:{}", self.id),
        }
    }
}
