use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{CarouselImageId, ProjectId};

/// Full project row as served by `GET /projects`. Feed clients keep only the
/// fields they know about and ignore the rest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectRecord {
    pub id: ProjectId,
    pub name: String,
    pub description: Option<String>,
    pub cover: Option<String>,
    pub url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Full carousel row as served by `GET /carousel`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CarouselImageRecord {
    pub id: CarouselImageId,
    pub path: String,
    pub desc: Option<String>,
    pub position: i64,
    pub created_at: DateTime<Utc>,
}

/// Write payload for creating or updating a project. An update overwrites
/// every field with the draft's contents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectDraft {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub cover: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

/// Write payload for creating or updating a carousel image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CarouselImageDraft {
    pub path: String,
    #[serde(default)]
    pub desc: Option<String>,
}

/// Acknowledgement returned by every admin mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MutationAck {
    pub success: bool,
}
