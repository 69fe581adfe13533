use serde::{Deserialize, Serialize};

/// Club-level settlement and check-in rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClubPolicy {
    pub allow_partial_payment: bool,
    pub block_suspended_members: bool,
    pub require_all_items_paid: bool,
}

impl Default for ClubPolicy {
    fn default() -> Self {
        Self {
            allow_partial_payment: true,
            block_suspended_members: true,
            require_all_items_paid: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MemberStatus {
    Active,
    Suspended,
    Inactive,
    Resigned,
}
