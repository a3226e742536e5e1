use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// A row of the `tasks` table. Server-assigned fields (`id`, `created_at`,
// `email`) are immutable once the row exists.
#[derive(Clone, Deserialize, Debug, PartialEq)]
pub struct Task {
    pub id: i64,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub email: Option<String>,
}

// Insert payload. `image_url` is omitted entirely when no image was
// uploaded, so the column default applies.
#[derive(Serialize, Debug)]
pub struct NewTask {
    pub title: String,
    pub description: String,
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

// Update payload: only the two user-editable columns.
#[derive(Serialize, Debug, PartialEq)]
pub struct TaskPatch {
    pub title: String,
    pub description: String,
}

#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct Session {
    pub access_token: String,
    pub user: User,
}

/// A change notification for the `tasks` table, pushed out of band from
/// any request this client issued (including its own). Delete events only
/// carry the primary key of the dropped row.
#[derive(Clone, Debug, PartialEq)]
pub enum ChangeEvent {
    Insert { new: Task },
    Update { new: Task },
    Delete { id: i64 },
}
