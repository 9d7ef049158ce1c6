// ── Camera feed model ──
//
// CameraFeed identity is the numeric id. Status is external state that can
// flip at any time; it never participates in connection identity.

use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::CoreError;

// ── CameraId ────────────────────────────────────────────────────────

/// Stable numeric camera identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CameraId(pub u32);

impl fmt::Display for CameraId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for CameraId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}

impl From<u32> for CameraId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

// ── CameraStatus ────────────────────────────────────────────────────

/// Detection status reported by the camera's analytics.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
pub enum CameraStatus {
    #[default]
    #[serde(rename = "감시중", alias = "monitoring")]
    #[strum(to_string = "감시중", serialize = "monitoring")]
    Monitoring,
    #[serde(rename = "발견됨", alias = "detected")]
    #[strum(to_string = "발견됨", serialize = "detected")]
    Detected,
}

impl CameraStatus {
    pub fn is_detected(self) -> bool {
        matches!(self, Self::Detected)
    }
}

// ── CameraFeed ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CameraFeed {
    pub id: CameraId,
    pub name: String,
    #[serde(default)]
    pub status: CameraStatus,
    /// Address of the camera's stream server.
    pub ip: IpAddr,
}

// ── CameraLayout ────────────────────────────────────────────────────

/// Grid layout of the camera wall.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
pub enum CameraLayout {
    #[serde(rename = "1x1")]
    #[strum(serialize = "1x1")]
    Single,
    #[default]
    #[serde(rename = "2x2")]
    #[strum(serialize = "2x2")]
    Quad,
    #[serde(rename = "3x3")]
    #[strum(serialize = "3x3")]
    Nine,
}

impl CameraLayout {
    /// Number of cells mounted simultaneously.
    pub fn cell_count(self) -> usize {
        match self {
            Self::Single => 1,
            Self::Quad => 4,
            Self::Nine => 9,
        }
    }

    /// Grid column count, for renderers.
    pub fn columns(self) -> usize {
        match self {
            Self::Single => 1,
            Self::Quad => 2,
            Self::Nine => 3,
        }
    }
}

// ── CameraList ──────────────────────────────────────────────────────

/// Ordered camera registry for one session.
///
/// Insertion order is the stable "list order" used to fill the grid.
#[derive(Debug, Clone, Default)]
pub struct CameraList {
    feeds: IndexMap<CameraId, CameraFeed>,
}

impl CameraList {
    /// Build from feeds in list order. Duplicate ids are rejected.
    pub fn new(feeds: impl IntoIterator<Item = CameraFeed>) -> Result<Self, CoreError> {
        let mut map = IndexMap::new();
        for feed in feeds {
            let id = feed.id;
            if map.insert(id, feed).is_some() {
                return Err(CoreError::Config {
                    message: format!("duplicate camera id {id}"),
                });
            }
        }
        Ok(Self { feeds: map })
    }

    pub fn get(&self, id: CameraId) -> Option<&CameraFeed> {
        self.feeds.get(&id)
    }

    pub fn require(&self, id: CameraId) -> Result<&CameraFeed, CoreError> {
        self.get(id).ok_or(CoreError::CameraNotFound { id })
    }

    pub fn contains(&self, id: CameraId) -> bool {
        self.feeds.contains_key(&id)
    }

    pub fn first_id(&self) -> Option<CameraId> {
        self.feeds.keys().next().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CameraFeed> {
        self.feeds.values()
    }

    pub fn len(&self) -> usize {
        self.feeds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.feeds.is_empty()
    }

    /// Update a camera's status in place. Returns the previous status.
    pub(crate) fn set_status(
        &mut self,
        id: CameraId,
        status: CameraStatus,
    ) -> Result<CameraStatus, CoreError> {
        let feed = self
            .feeds
            .get_mut(&id)
            .ok_or(CoreError::CameraNotFound { id })?;
        Ok(std::mem::replace(&mut feed.status, status))
    }

    /// Cameras mounted for a layout: the selected camera first, then the
    /// rest in list order, truncated to the layout's cell count.
    pub fn plan_grid(&self, selected: CameraId, layout: CameraLayout) -> Vec<CameraId> {
        std::iter::once(selected)
            .chain(self.feeds.keys().copied().filter(|id| *id != selected))
            .take(layout.cell_count())
            .collect()
    }
}
