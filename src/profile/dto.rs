use crate::db::models::{Doctor, Gender, Patient, Role, User};
use crate::error::AppError;
use crate::validation;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity and patient fields as seen by API callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientProfile {
    pub id: Uuid,
    pub role: Role,
    pub first_name: String,
    pub last_name: String,
    pub gender: Gender,
    pub phone_number: String,
    pub hospital_id: String,
    pub birth_date: Option<NaiveDate>,
    pub id_card_number: Option<String>,
    pub address: Option<String>,
    pub allergies: Option<String>,
    pub emergency_contact: Option<String>,
    pub blood_type: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PatientProfile {
    pub fn compose(user: User, patient: Patient) -> Self {
        Self {
            id: user.id,
            role: user.role,
            first_name: user.first_name,
            last_name: user.last_name,
            gender: user.gender,
            phone_number: user.phone_number,
            hospital_id: patient.hospital_id,
            birth_date: patient.birth_date,
            id_card_number: patient.id_card_number,
            address: patient.address,
            allergies: patient.allergies,
            emergency_contact: patient.emergency_contact,
            blood_type: patient.blood_type,
            created_at: user.created_at,
            updated_at: user.updated_at.max(patient.updated_at),
        }
    }
}

/// Identity and doctor fields as seen by API callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoctorProfile {
    pub id: Uuid,
    pub role: Role,
    pub first_name: String,
    pub last_name: String,
    pub gender: Gender,
    pub phone_number: String,
    pub username: String,
    pub specialty: Option<String>,
    pub bio: Option<String>,
    pub years_experience: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DoctorProfile {
    pub fn compose(user: User, doctor: Doctor) -> Self {
        Self {
            id: user.id,
            role: user.role,
            first_name: user.first_name,
            last_name: user.last_name,
            gender: user.gender,
            phone_number: user.phone_number,
            username: doctor.username,
            specialty: doctor.specialty,
            bio: doctor.bio,
            years_experience: doctor.years_experience,
            created_at: user.created_at,
            updated_at: user.updated_at.max(doctor.updated_at),
        }
    }
}

/// Partial update of a patient. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PatientChanges {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub gender: Option<Gender>,
    pub phone_number: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub id_card_number: Option<String>,
    pub address: Option<String>,
    pub allergies: Option<String>,
    pub emergency_contact: Option<String>,
    pub blood_type: Option<String>,
}

impl PatientChanges {
    pub fn validate(&self) -> Result<(), AppError> {
        validation::optional_non_empty("first_name", self.first_name.as_deref())?;
        validation::optional_non_empty("last_name", self.last_name.as_deref())?;
        validation::optional_non_empty("phone_number", self.phone_number.as_deref())?;
        validation::id_card_number(self.id_card_number.as_deref())?;
        validation::blood_type(self.blood_type.as_deref())
    }

    pub fn apply(self, user: &mut User, patient: &mut Patient) {
        apply_identity(user, self.first_name, self.last_name, self.gender, self.phone_number);
        replace(&mut patient.birth_date, self.birth_date);
        replace(&mut patient.id_card_number, self.id_card_number);
        replace(&mut patient.address, self.address);
        replace(&mut patient.allergies, self.allergies);
        replace(&mut patient.emergency_contact, self.emergency_contact);
        replace(&mut patient.blood_type, self.blood_type);
    }
}

/// Partial update of a doctor. The username is a login handle and is not
/// changeable here.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DoctorChanges {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub gender: Option<Gender>,
    pub phone_number: Option<String>,
    pub specialty: Option<String>,
    pub bio: Option<String>,
    pub years_experience: Option<i32>,
}

impl DoctorChanges {
    pub fn validate(&self) -> Result<(), AppError> {
        validation::optional_non_empty("first_name", self.first_name.as_deref())?;
        validation::optional_non_empty("last_name", self.last_name.as_deref())?;
        validation::optional_non_empty("phone_number", self.phone_number.as_deref())?;
        validation::years_experience(self.years_experience)
    }

    pub fn apply(self, user: &mut User, doctor: &mut Doctor) {
        apply_identity(user, self.first_name, self.last_name, self.gender, self.phone_number);
        replace(&mut doctor.specialty, self.specialty);
        replace(&mut doctor.bio, self.bio);
        replace(&mut doctor.years_experience, self.years_experience);
    }
}

fn apply_identity(
    user: &mut User,
    first_name: Option<String>,
    last_name: Option<String>,
    gender: Option<Gender>,
    phone_number: Option<String>,
) {
    if let Some(v) = first_name {
        user.first_name = v;
    }
    if let Some(v) = last_name {
        user.last_name = v;
    }
    if let Some(v) = gender {
        user.gender = v;
    }
    if let Some(v) = phone_number {
        user.phone_number = v;
    }
}

fn replace<T>(field: &mut Option<T>, change: Option<T>) {
    if change.is_some() {
        *field = change;
    }
}

#[derive(Debug, Deserialize)]
pub struct PatientIdsRequest {
    pub patient_ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct DoctorIdsRequest {
    pub doctor_ids: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows() -> (User, Patient) {
        let user = User::new(
            "hash".into(),
            "Malee".into(),
            "Sukjai".into(),
            Gender::Female,
            "0811111111".into(),
            Role::Patient,
        );
        let mut patient = Patient::new(user.id, "HN-42".into());
        patient.allergies = Some("penicillin".into());
        patient.blood_type = Some("B".into());
        (user, patient)
    }

    #[test]
    fn test_patient_changes_touch_only_present_fields() {
        let (mut user, mut patient) = rows();
        let before = patient.clone();

        PatientChanges {
            first_name: Some("Mali".into()),
            ..Default::default()
        }
        .apply(&mut user, &mut patient);

        assert_eq!(user.first_name, "Mali");
        assert_eq!(user.last_name, "Sukjai");
        assert_eq!(patient, before);
    }

    #[test]
    fn test_doctor_changes() {
        let user = User::new("h".into(), "A".into(), "B".into(), Gender::Other, "1".into(), Role::Doctor);
        let mut doctor = Doctor::new(user.id, "dr.b".into());
        let mut user = user;
        DoctorChanges {
            years_experience: Some(4),
            bio: Some("Cardiology fellow".into()),
            ..Default::default()
        }
        .apply(&mut user, &mut doctor);

        assert_eq!(doctor.years_experience, Some(4));
        assert_eq!(doctor.bio.as_deref(), Some("Cardiology fellow"));
        assert_eq!(doctor.username, "dr.b");
        assert_eq!(user.first_name, "A");
    }

    #[test]
    fn test_changes_validation() {
        assert!(PatientChanges::default().validate().is_ok());
        let bad = PatientChanges {
            first_name: Some("".into()),
            ..Default::default()
        };
        assert!(bad.validate().is_err());
        let bad = DoctorChanges {
            years_experience: Some(-1),
            ..Default::default()
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_profile_view_hides_password() {
        let (user, patient) = rows();
        let json = serde_json::to_value(PatientProfile::compose(user, patient)).unwrap();
        assert!(json.get("password").is_none());
        assert_eq!(json["hospital_id"], "HN-42");
        assert_eq!(json["role"], "patient");
    }
}
