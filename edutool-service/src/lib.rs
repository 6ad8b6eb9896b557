//! edutool-service: educational tool generation on Gemini with retry and
//! model fallback, plus account management.

pub mod config;
pub mod handlers;
pub mod models;
pub mod services;
pub mod startup;
