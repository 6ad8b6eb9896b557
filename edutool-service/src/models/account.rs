use serde::Serialize;

/// Rows removed by an account deletion, per table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DeletionSummary {
    pub generation_requests: u64,
    pub custom_tool_types: u64,
    pub custom_categories: u64,
    pub users: u64,
}

impl DeletionSummary {
    pub fn total(&self) -> u64 {
        self.generation_requests + self.custom_tool_types + self.custom_categories + self.users
    }
}
