//! Domain models for the edutool service.

pub mod account;
pub mod tool;
pub mod user;

pub use account::DeletionSummary;
pub use tool::{Attachment, AttachmentKind, GeneratedTool, ToolRequest, ToolType};
pub use user::SessionUser;
