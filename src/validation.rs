//! Field checks shared by request DTOs. Each returns `ValidationError` naming
//! the offending field.

use crate::error::AppError;
use uuid::Uuid;

pub const PATIENT_PASSWORD_MIN: usize = 6;
pub const DOCTOR_PASSWORD_MIN: usize = 8;
pub const ID_CARD_LEN: usize = 13;
pub const BLOOD_TYPE_MAX: usize = 5;

fn invalid(field: &str, reason: &str) -> AppError {
    AppError::ValidationError(format!("{} {}", field, reason))
}

pub fn non_empty(field: &str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(invalid(field, "must not be empty"));
    }
    Ok(())
}

pub fn optional_non_empty(field: &str, value: Option<&str>) -> Result<(), AppError> {
    match value {
        Some(v) => non_empty(field, v),
        None => Ok(()),
    }
}

pub fn min_chars(field: &str, value: &str, min: usize) -> Result<(), AppError> {
    if value.chars().count() < min {
        return Err(invalid(field, &format!("must be at least {} characters", min)));
    }
    Ok(())
}

pub fn id_card_number(value: Option<&str>) -> Result<(), AppError> {
    match value {
        Some(v) if v.len() != ID_CARD_LEN || !v.bytes().all(|b| b.is_ascii_digit()) => Err(invalid(
            "id_card_number",
            &format!("must be exactly {} digits", ID_CARD_LEN),
        )),
        _ => Ok(()),
    }
}

pub fn blood_type(value: Option<&str>) -> Result<(), AppError> {
    match value {
        Some(v) if v.is_empty() || v.chars().count() > BLOOD_TYPE_MAX => Err(invalid(
            "blood_type",
            &format!("must be 1 to {} characters", BLOOD_TYPE_MAX),
        )),
        _ => Ok(()),
    }
}

pub fn years_experience(value: Option<i32>) -> Result<(), AppError> {
    match value {
        Some(years) if years < 0 => Err(invalid("years_experience", "must not be negative")),
        _ => Ok(()),
    }
}

/// Parses a batch of ids, rejecting the whole batch on the first bad entry.
pub fn uuid_list(field: &str, values: &[String]) -> Result<Vec<Uuid>, AppError> {
    values
        .iter()
        .map(|v| Uuid::parse_str(v).map_err(|_| invalid(field, &format!("contains invalid id {:?}", v))))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_card_number() {
        assert!(id_card_number(None).is_ok());
        assert!(id_card_number(Some("1234567890123")).is_ok());
        assert!(id_card_number(Some("123456789012")).is_err());
        assert!(id_card_number(Some("12345678901a3")).is_err());
        assert!(id_card_number(Some("๑๒๓๔๕๖๗๘๙๐๑๒๓")).is_err());
    }

    #[test]
    fn test_blood_type_and_years() {
        assert!(blood_type(Some("AB+")).is_ok());
        assert!(blood_type(Some("AB+RH-")).is_err());
        assert!(blood_type(Some("")).is_err());
        assert!(years_experience(Some(0)).is_ok());
        assert!(years_experience(Some(-1)).is_err());
    }

    #[test]
    fn test_text_fields() {
        assert!(non_empty("first_name", "  ").is_err());
        assert!(optional_non_empty("first_name", None).is_ok());
        assert!(min_chars("password", "12345", PATIENT_PASSWORD_MIN).is_err());
        assert!(min_chars("password", "123456", PATIENT_PASSWORD_MIN).is_ok());
    }

    #[test]
    fn test_uuid_list() {
        let id = Uuid::now_v7();
        assert_eq!(uuid_list("ids", &[id.to_string()]).unwrap(), vec![id]);
        assert!(uuid_list("ids", &[]).unwrap().is_empty());
        match uuid_list("ids", &[id.to_string(), "nope".to_string()]) {
            Err(AppError::ValidationError(msg)) => assert!(msg.contains("nope")),
            other => panic!("unexpected {:?}", other),
        }
    }
}
