// ── Marker style tables ──
//
// Kind → (icon, color) and priority/status → label background, resolved
// by table lookup. Labels not in a table get the generic row.

use serde::Serialize;
use strum::{Display, EnumString};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Glyph {
    pub icon: &'static str,
    pub color: &'static str,
}

pub const RED: &str = "#dc2626";
pub const AMBER: &str = "#f59e0b";
pub const GRAY: &str = "#6b7280";
pub const GREEN: &str = "#059669";
pub const PURPLE: &str = "#7c3aed";
pub const BLUE: &str = "#1d4ed8";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
pub enum EmergencyKind {
    #[strum(to_string = "화재", serialize = "fire")]
    Fire,
    #[strum(to_string = "교통사고", serialize = "traffic")]
    Traffic,
    #[strum(to_string = "의료응급", serialize = "medical")]
    Medical,
    #[strum(to_string = "범죄", serialize = "crime")]
    Crime,
    #[strum(to_string = "자연재해", serialize = "disaster")]
    NaturalDisaster,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
pub enum VehicleKind {
    #[strum(to_string = "소방차", serialize = "fire-truck")]
    FireTruck,
    #[strum(to_string = "구급차", serialize = "ambulance")]
    Ambulance,
    #[strum(to_string = "경찰차", serialize = "police")]
    Police,
    #[strum(to_string = "레스큐", serialize = "rescue")]
    Rescue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
pub enum Priority {
    #[strum(to_string = "긴급", serialize = "urgent")]
    Urgent,
    #[strum(to_string = "높음", serialize = "high")]
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
pub enum VehicleStatus {
    #[strum(to_string = "출동중", serialize = "dispatched")]
    Dispatched,
    #[strum(to_string = "현장도착", serialize = "on-scene")]
    OnScene,
    #[strum(to_string = "대기중", serialize = "standby")]
    Standby,
}

const EMERGENCY_GLYPHS: &[(EmergencyKind, Glyph)] = &[
    (EmergencyKind::Fire, Glyph { icon: "🔥", color: RED }),
    (EmergencyKind::Traffic, Glyph { icon: "🚗", color: AMBER }),
    (EmergencyKind::Medical, Glyph { icon: "🏥", color: RED }),
    (EmergencyKind::Crime, Glyph { icon: "👮‍♂️", color: PURPLE }),
    (EmergencyKind::NaturalDisaster, Glyph { icon: "🌪️", color: GREEN }),
];

const VEHICLE_GLYPHS: &[(VehicleKind, Glyph)] = &[
    (VehicleKind::FireTruck, Glyph { icon: "🚒", color: RED }),
    (VehicleKind::Ambulance, Glyph { icon: "🚑", color: GREEN }),
    (VehicleKind::Police, Glyph { icon: "🚔", color: BLUE }),
    (VehicleKind::Rescue, Glyph { icon: "🚐", color: AMBER }),
];

const PRIORITY_BACKGROUNDS: &[(Priority, &str)] = &[(Priority::Urgent, RED), (Priority::High, AMBER)];

const VEHICLE_STATUS_BACKGROUNDS: &[(VehicleStatus, &str)] = &[
    (VehicleStatus::Dispatched, RED),
    (VehicleStatus::OnScene, AMBER),
    (VehicleStatus::Standby, GRAY),
];

pub const GENERIC_EMERGENCY: Glyph = Glyph {
    icon: "🚨",
    color: "#ef4444",
};

pub const GENERIC_VEHICLE: Glyph = Glyph {
    icon: "🚐",
    color: "#3b82f6",
};

fn lookup<K: PartialEq + Copy, V: Copy>(table: &[(K, V)], key: Option<K>) -> Option<V> {
    let key = key?;
    table.iter().find(|(k, _)| *k == key).map(|(_, v)| *v)
}

pub fn emergency_glyph(kind: &str) -> Glyph {
    lookup(EMERGENCY_GLYPHS, kind.parse().ok()).unwrap_or(GENERIC_EMERGENCY)
}

pub fn vehicle_glyph(kind: &str) -> Glyph {
    lookup(VEHICLE_GLYPHS, kind.parse().ok()).unwrap_or(GENERIC_VEHICLE)
}

/// Emergency label background, by priority.
pub fn priority_background(priority: &str) -> &'static str {
    lookup(PRIORITY_BACKGROUNDS, priority.parse().ok()).unwrap_or(GRAY)
}

/// Vehicle label background, by status.
pub fn vehicle_status_background(status: &str) -> &'static str {
    lookup(VEHICLE_STATUS_BACKGROUNDS, status.parse().ok()).unwrap_or(GREEN)
}
