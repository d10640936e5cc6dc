//! Persistence for identities and role profiles.
//!
//! `repository` defines the storage seam; `operations` implements it on
//! Postgres and `memory` in-process for tests (`test-util` feature).

#[cfg(any(test, feature = "test-util"))]
pub mod memory;
pub mod models;
pub mod operations;
pub mod repository;

#[cfg(any(test, feature = "test-util"))]
pub use memory::{MemoryDatabase, StoreOp};
pub use models::{Doctor, Gender, Patient, Role, User};
pub use operations::PgDatabase;
pub use repository::{Database, ProfileRepository, ProfileStore};
