#![allow(dead_code)]

use careid_server::auth::dto::{DoctorRegistration, PatientRegistration};
use careid_server::db::{Gender, MemoryDatabase};
use careid_server::{AppState, Settings};
use std::sync::Arc;

pub fn test_state() -> (AppState<MemoryDatabase>, MemoryDatabase) {
    let db = MemoryDatabase::new();
    let config = Settings::new_for_test().expect("Failed to load test config");
    let state = AppState::new(config, Arc::new(db.clone())).expect("Failed to build app state");
    (state, db)
}

pub fn patient(hospital_id: &str) -> PatientRegistration {
    PatientRegistration {
        hospital_id: hospital_id.to_string(),
        password: "secret123".to_string(),
        first_name: "Somsri".to_string(),
        last_name: "Rakdee".to_string(),
        gender: Gender::Female,
        phone_number: "0812345678".to_string(),
        birth_date: chrono::NaiveDate::from_ymd_opt(1988, 2, 14),
        id_card_number: Some("1103700012345".to_string()),
        address: Some("99 Rama IV Rd, Bangkok".to_string()),
        allergies: Some("penicillin".to_string()),
        emergency_contact: Some("0899999999".to_string()),
        blood_type: Some("O+".to_string()),
    }
}

pub fn doctor(username: &str) -> DoctorRegistration {
    DoctorRegistration {
        username: username.to_string(),
        password: "doctor-secret".to_string(),
        first_name: "Prasert".to_string(),
        last_name: "Wongsa".to_string(),
        gender: Gender::Male,
        phone_number: "0823456789".to_string(),
        specialty: Some("Cardiology".to_string()),
        bio: Some("Interventional cardiologist".to_string()),
        years_experience: Some(12),
    }
}
