//! Profile reads and partial updates for patients and doctors.

pub mod dto;
pub mod handlers;
pub mod service;

pub use dto::{DoctorChanges, DoctorProfile, PatientChanges, PatientProfile};
pub use service::ProfileService;
