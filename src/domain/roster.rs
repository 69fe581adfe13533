use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A bookable tee time. Its slots form one flight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeeTime {
    pub id: String,
    pub club_id: String,
    pub starts_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlayerType {
    Member,
    Guest,
    Dependent,
    Walkup,
}

/// One player position (1..=4) in a flight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slot {
    pub id: String,
    pub tee_time_id: String,
    pub position: u8,
    pub r#type: PlayerType,
    pub name: String,
    /// Directory id for members and dependents, used for suspension checks.
    #[serde(default)]
    pub member_id: Option<String>,
    #[serde(default)]
    pub checked_in_at: Option<DateTime<Utc>>,
}

impl Slot {
    pub fn is_checked_in(&self) -> bool {
        self.checked_in_at.is_some()
    }
}
