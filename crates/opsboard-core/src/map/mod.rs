// ── Map surface ──
//
// The marker reconciler and its seams: the map SDK capability, position
// sources, style tables, and a headless SDK for the console and tests.

pub mod headless;
pub mod markers;
pub mod overlay;
pub mod position;
pub mod reconciler;
pub mod sdk;
pub mod style;

pub use headless::HeadlessMap;
pub use markers::{MarkerSet, OverlayTriple};
pub use overlay::{OverlayPlan, plan_emergency, plan_vehicle};
pub use position::{FixedPosition, NoGeolocation};
pub use reconciler::{
    InitOutcome, MapStatus, MarkerReconciler, ReconcileReport, SkippedEntity, UpdateOutcome,
};
pub use sdk::{
    ControlPosition, LabelSize, LabelSpec, MapHandle, MapOptions, MapSdk, MarkerHandle,
    MarkerSpec, OverlayHandle, PopupHandle, PopupSpec, PositionSource,
};
