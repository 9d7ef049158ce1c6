// ── Overlay planning ──
//
// Turns one entity into the marker, label, and popup specs the SDK will
// build. Pure: no SDK calls happen here.

use serde::Serialize;

use super::sdk::{LabelSize, LabelSpec, MarkerSpec, PopupSpec};
use super::style::{
    emergency_glyph, priority_background, vehicle_glyph, vehicle_status_background,
};
use crate::error::CoreError;
use crate::model::{Coordinates, Emergency, EntityKey, Vehicle};

const LABEL_Y_ANCHOR: f32 = 2.0;

/// Everything needed to draw one entity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverlayPlan {
    pub key: EntityKey,
    pub marker: MarkerSpec,
    pub label: LabelSpec,
    pub popup: PopupSpec,
}

fn validate(key: &EntityKey, coordinates: Coordinates) -> Result<(), CoreError> {
    if key.id.trim().is_empty() {
        return Err(CoreError::InvalidEntity {
            key: key.to_string(),
            reason: "empty id".into(),
        });
    }
    if !coordinates.is_valid() {
        return Err(CoreError::InvalidEntity {
            key: key.to_string(),
            reason: format!("coordinates out of range {coordinates}"),
        });
    }
    Ok(())
}

pub fn plan_emergency(emergency: &Emergency) -> Result<OverlayPlan, CoreError> {
    let key = EntityKey::emergency(emergency.id.clone());
    validate(&key, emergency.coordinates)?;
    let glyph = emergency_glyph(&emergency.kind);

    Ok(OverlayPlan {
        marker: MarkerSpec {
            position: emergency.coordinates,
            title: emergency.description.clone(),
        },
        label: LabelSpec {
            position: emergency.coordinates,
            text: format!("{} {}", glyph.icon, emergency.kind),
            background: priority_background(&emergency.priority),
            size: LabelSize::Prominent,
            y_anchor: LABEL_Y_ANCHOR,
        },
        popup: PopupSpec {
            title: format!("{} {}", glyph.icon, emergency.kind),
            title_color: glyph.color,
            rows: vec![
                ("위치".into(), emergency.location.clone()),
                ("상태".into(), emergency.status.clone()),
                ("우선순위".into(), emergency.priority.clone()),
                ("시간".into(), emergency.time.clone()),
            ],
            note: Some(emergency.description.clone()).filter(|d| !d.is_empty()),
        },
        key,
    })
}

pub fn plan_vehicle(vehicle: &Vehicle) -> Result<OverlayPlan, CoreError> {
    let key = EntityKey::vehicle(vehicle.id.clone());
    validate(&key, vehicle.coordinates)?;
    let glyph = vehicle_glyph(&vehicle.kind);

    let mut rows = vec![
        ("위치".into(), vehicle.location.clone()),
        ("상태".into(), vehicle.status.clone()),
    ];
    if let Some(assigned) = &vehicle.assigned_to {
        rows.push(("배정".into(), assigned.clone()));
    }

    Ok(OverlayPlan {
        marker: MarkerSpec {
            position: vehicle.coordinates,
            title: format!("{} - {}", vehicle.kind, vehicle.status),
        },
        label: LabelSpec {
            position: vehicle.coordinates,
            text: format!("{} {}", glyph.icon, vehicle.kind),
            background: vehicle_status_background(&vehicle.status),
            size: LabelSize::Compact,
            y_anchor: LABEL_Y_ANCHOR,
        },
        popup: PopupSpec {
            title: format!("{} {} {}", glyph.icon, vehicle.kind, vehicle.id),
            title_color: glyph.color,
            rows,
            note: None,
        },
        key,
    })
}
