use crate::db::models::{Gender, Role};
use crate::error::AppError;
use crate::validation;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Deserialize)]
pub struct PatientRegistration {
    pub hospital_id: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub gender: Gender,
    pub phone_number: String,
    pub birth_date: Option<NaiveDate>,
    pub id_card_number: Option<String>,
    pub address: Option<String>,
    pub allergies: Option<String>,
    pub emergency_contact: Option<String>,
    pub blood_type: Option<String>,
}

impl PatientRegistration {
    pub fn validate(&self) -> Result<(), AppError> {
        validation::non_empty("hospital_id", &self.hospital_id)?;
        validation::min_chars("password", &self.password, validation::PATIENT_PASSWORD_MIN)?;
        validation::non_empty("first_name", &self.first_name)?;
        validation::non_empty("last_name", &self.last_name)?;
        validation::non_empty("phone_number", &self.phone_number)?;
        validation::id_card_number(self.id_card_number.as_deref())?;
        validation::blood_type(self.blood_type.as_deref())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DoctorRegistration {
    pub username: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub gender: Gender,
    pub phone_number: String,
    pub specialty: Option<String>,
    pub bio: Option<String>,
    pub years_experience: Option<i32>,
}

impl DoctorRegistration {
    pub fn validate(&self) -> Result<(), AppError> {
        validation::non_empty("username", &self.username)?;
        validation::min_chars("password", &self.password, validation::DOCTOR_PASSWORD_MIN)?;
        validation::non_empty("first_name", &self.first_name)?;
        validation::non_empty("last_name", &self.last_name)?;
        validation::non_empty("phone_number", &self.phone_number)?;
        validation::years_experience(self.years_experience)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PatientLoginRequest {
    pub hospital_id: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DoctorLoginRequest {
    pub username: String,
    pub password: String,
}

impl PatientLoginRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        validation::non_empty("hospital_id", &self.hospital_id)?;
        validation::non_empty("password", &self.password)
    }
}

impl DoctorLoginRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        validation::non_empty("username", &self.username)?;
        validation::non_empty("password", &self.password)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegistrationResult {
    pub user_id: Uuid,
    pub role: Role,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub message: String,
    pub id: Uuid,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn patient() -> PatientRegistration {
        serde_json::from_value(json!({
            "hospital_id": "HN-0001",
            "password": "secret1",
            "first_name": "Somchai",
            "last_name": "Jaidee",
            "gender": "male",
            "phone_number": "0812345678",
            "birth_date": "1990-04-01",
            "id_card_number": "1103700012345",
            "blood_type": "O+"
        }))
        .unwrap()
    }

    #[test]
    fn test_patient_registration_validation() {
        assert!(patient().validate().is_ok());

        let mut short = patient();
        short.password = "12345".into();
        assert!(matches!(short.validate(), Err(AppError::ValidationError(_))));

        let mut bad_card = patient();
        bad_card.id_card_number = Some("110370001234".into());
        assert!(bad_card.validate().is_err());

        let mut blank = patient();
        blank.hospital_id = " ".into();
        assert!(blank.validate().is_err());
    }

    #[test]
    fn test_doctor_registration_requires_longer_password() {
        let mut doctor: DoctorRegistration = serde_json::from_value(json!({
            "username": "dr.strange",
            "password": "1234567",
            "first_name": "Stephen",
            "last_name": "Strange",
            "gender": "male",
            "phone_number": "0899999999"
        }))
        .unwrap();
        assert!(doctor.validate().is_err());

        doctor.password = "12345678".into();
        assert!(doctor.validate().is_ok());

        doctor.years_experience = Some(-3);
        assert!(doctor.validate().is_err());
    }

    #[test]
    fn test_missing_or_unknown_fields_fail_to_parse() {
        let result: Result<PatientLoginRequest, _> = serde_json::from_value(json!({ "hospital_id": "HN" }));
        assert!(result.is_err());
        let result: Result<DoctorRegistration, _> = serde_json::from_value(json!({
            "username": "u", "password": "p", "first_name": "f", "last_name": "l",
            "gender": "robot", "phone_number": "1"
        }));
        assert!(result.is_err());
    }
}
