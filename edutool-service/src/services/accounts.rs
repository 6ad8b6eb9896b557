//! Account storage abstraction.

use crate::models::DeletionSummary;
use async_trait::async_trait;
use service_core::error::AppError;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

/// Tables holding per-user rows, in deletion order. `users` goes last.
pub const USER_OWNED_TABLES: [&str; 3] =
    ["generation_requests", "custom_tool_types", "custom_categories"];

#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Remove the user and every row they own. All or nothing.
    async fn delete_account(&self, user_id: &str) -> Result<DeletionSummary, AppError>;

    async fn health_check(&self) -> Result<(), AppError>;
}

/// In-process store backing the HTTP tests.
#[derive(Default)]
pub struct InMemoryAccountStore {
    inner: Mutex<MemoryState>,
}

#[derive(Default)]
struct MemoryState {
    users: HashSet<String>,
    /// table -> user id -> row count
    rows: HashMap<&'static str, HashMap<String, u64>>,
    fail_deletes: bool,
}

impl InMemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_user(&self, user_id: &str) {
        self.lock().users.insert(user_id.to_string());
    }

    /// Add `count` rows owned by `user_id` to one of [`USER_OWNED_TABLES`].
    pub fn add_rows(&self, table: &'static str, user_id: &str, count: u64) {
        *self
            .lock()
            .rows
            .entry(table)
            .or_default()
            .entry(user_id.to_string())
            .or_default() += count;
    }

    /// Make every subsequent deletion fail, leaving data untouched.
    pub fn fail_deletes(&self) {
        self.lock().fail_deletes = true;
    }

    pub fn has_user(&self, user_id: &str) -> bool {
        self.lock().users.contains(user_id)
    }

    pub fn row_count(&self, table: &str, user_id: &str) -> u64 {
        self.lock()
            .rows
            .get(table)
            .and_then(|owners| owners.get(user_id))
            .copied()
            .unwrap_or(0)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl AccountStore for InMemoryAccountStore {
    async fn delete_account(&self, user_id: &str) -> Result<DeletionSummary, AppError> {
        let mut state = self.lock();
        if state.fail_deletes {
            return Err(AppError::DatabaseError(anyhow::anyhow!(
                "Failed to delete account: storage rejected the delete"
            )));
        }

        let mut take = |table: &str| {
            state
                .rows
                .get_mut(table)
                .and_then(|owners| owners.remove(user_id))
                .unwrap_or(0)
        };

        let generation_requests = take(USER_OWNED_TABLES[0]);
        let custom_tool_types = take(USER_OWNED_TABLES[1]);
        let custom_categories = take(USER_OWNED_TABLES[2]);
        let users = u64::from(state.users.remove(user_id));

        Ok(DeletionSummary {
            generation_requests,
            custom_tool_types,
            custom_categories,
            users,
        })
    }

    async fn health_check(&self) -> Result<(), AppError> {
        Ok(())
    }
}
