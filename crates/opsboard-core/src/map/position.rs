// ── Position sources ──

use super::sdk::PositionSource;
use crate::error::CoreError;
use crate::model::Coordinates;

/// Always reports the same position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedPosition(pub Coordinates);

impl PositionSource for FixedPosition {
    async fn current_position(&self) -> Result<Coordinates, CoreError> {
        Ok(self.0)
    }
}

/// A device without geolocation; callers fall back to the default position.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoGeolocation;

impl PositionSource for NoGeolocation {
    async fn current_position(&self) -> Result<Coordinates, CoreError> {
        Err(CoreError::MapInit {
            message: "geolocation not supported".into(),
        })
    }
}
