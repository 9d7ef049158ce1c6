// ── Map provider capability ──
//
// The map SDK is an external collaborator. The reconciler only needs the
// calls below; rendering, tiles, and pan/zoom stay on the SDK side.

use std::fmt;
use std::future::Future;

use serde::Serialize;

use crate::error::CoreError;
use crate::model::Coordinates;

macro_rules! sdk_handle {
    ($name:ident, $prefix:literal) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "-{}"), self.0)
            }
        }
    };
}

sdk_handle!(MapHandle, "map");
sdk_handle!(MarkerHandle, "marker");
sdk_handle!(OverlayHandle, "overlay");
sdk_handle!(PopupHandle, "popup");

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapOptions {
    pub center: Coordinates,
    pub level: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarkerSpec {
    pub position: Coordinates,
    pub title: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelSize {
    /// Emergencies: larger pill with a thicker border.
    Prominent,
    /// Vehicles.
    Compact,
}

/// Custom overlay drawn above a marker.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabelSpec {
    pub position: Coordinates,
    pub text: String,
    pub background: &'static str,
    pub size: LabelSize,
    pub y_anchor: f32,
}

/// Info window opened when its marker is clicked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PopupSpec {
    pub title: String,
    pub title_color: &'static str,
    pub rows: Vec<(String, String)>,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlPosition {
    Top,
    Right,
    Bottom,
    Left,
}

pub trait MapSdk {
    /// SDK loaded and its container mounted.
    fn is_ready(&self) -> bool;

    fn create_map(&mut self, options: &MapOptions) -> Result<MapHandle, CoreError>;

    fn add_marker(&mut self, map: MapHandle, spec: &MarkerSpec) -> Result<MarkerHandle, CoreError>;

    fn remove_marker(&mut self, marker: MarkerHandle);

    fn add_label(&mut self, map: MapHandle, spec: &LabelSpec) -> Result<OverlayHandle, CoreError>;

    fn remove_label(&mut self, overlay: OverlayHandle);

    /// Attach a popup that opens when `marker` is clicked.
    fn bind_popup(
        &mut self,
        map: MapHandle,
        marker: MarkerHandle,
        spec: &PopupSpec,
    ) -> Result<PopupHandle, CoreError>;

    fn remove_popup(&mut self, popup: PopupHandle);

    fn add_zoom_control(&mut self, map: MapHandle, position: ControlPosition)
    -> Result<(), CoreError>;
}

/// Geolocation-like position query.
pub trait PositionSource {
    fn current_position(&self) -> impl Future<Output = Result<Coordinates, CoreError>> + Send;
}
