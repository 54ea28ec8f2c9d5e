//! # Auth Module
//!
//! This module handles authentication and authorization:
//! - JWT token issuance and validation
//! - The role ladder (admin ⊇ hr_manager ⊇ recruiter ⊇ viewer) and superuser override
//! - AuthedUser extractor for protected routes

pub mod extractors;
pub mod handlers;
pub mod models;
pub mod routes;

#[cfg(test)]
mod tests;

pub use extractors::AuthedUser;
pub use models::{Role, User};
pub use routes::auth_routes;
