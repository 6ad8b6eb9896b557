pub mod accounts;
pub mod database;
pub mod metrics;
pub mod providers;
pub mod resilient;
pub mod session;
pub mod tools;

pub use accounts::{AccountStore, InMemoryAccountStore};
pub use database::Database;
pub use resilient::{GenerationError, ResilientGenerator, RetryPolicy};
pub use session::{SessionResolver, SignedCookieSessionResolver};
pub use tools::{ToolError, ToolService};
