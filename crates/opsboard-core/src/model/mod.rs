// ── Domain model ──

pub mod camera;
pub mod entity;

pub use camera::{CameraFeed, CameraId, CameraLayout, CameraList, CameraStatus};
pub use entity::{Coordinates, Emergency, EntityClass, EntityKey, EntitySnapshot, Vehicle};
