use chrono::{Datelike, NaiveDate};
use uuid::Uuid;

use patient_registry_data::models::{PatientRecord, UserRecord};

use crate::entities::patient::PatientResponse;
use crate::entities::search::SearchResult;
use crate::entities::user::UserResponse;

/// Conversion functions between data models and domain entities.
/// They follow the pattern convert_to_[target]_[model].

/// Parse a path id. Anything that is not a UUID cannot name a stored record.
pub fn parse_string_to_uuid(id: &str) -> Option<Uuid> {
    Uuid::parse_str(id).ok()
}

/// Whole years between `birth_date` and `today`
pub fn age_on(birth_date: NaiveDate, today: NaiveDate) -> i32 {
    let mut age = today.year() - birth_date.year();
    if (today.month(), today.day()) < (birth_date.month(), birth_date.day()) {
        age -= 1;
    }
    age
}

pub fn convert_to_patient_response(record: PatientRecord, today: NaiveDate) -> PatientResponse {
    PatientResponse {
        id: record.id,
        age: age_on(record.birth_date, today),
        name: record.name,
        cpf: record.cpf,
        birth_date: record.birth_date,
        gender: record.gender,
        email: record.email,
        phone: record.phone,
        address: record.address,
        medical_conditions: record.medical_conditions,
        medications: record.medications,
        allergies: record.allergies,
        emergency_contact: record.emergency_contact,
        insurance_info: record.insurance_info,
        notes: record.notes,
        created_at: record.created_at,
        updated_at: record.updated_at,
        created_by: record.created_by,
    }
}

pub fn convert_to_search_result(record: &PatientRecord, today: NaiveDate, match_score: f64) -> SearchResult {
    SearchResult {
        id: record.id,
        name: record.name.clone(),
        cpf: record.cpf.clone(),
        birth_date: record.birth_date,
        age: age_on(record.birth_date, today),
        gender: record.gender.clone(),
        email: record.email.clone(),
        phone: record.phone.clone(),
        medical_conditions: record.medical_conditions.clone(),
        medications: record.medications.clone(),
        allergies: record.allergies.clone(),
        match_score,
    }
}

/// Public view of an account. The password hash never leaves the domain.
pub fn convert_to_user_response(record: UserRecord) -> UserResponse {
    UserResponse {
        id: record.id,
        email: record.email,
        username: record.username,
        full_name: record.full_name,
        is_active: record.is_active,
        is_admin: record.is_admin,
        created_at: record.created_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_age_before_and_after_birthday() {
        let birth = date(1990, 5, 15);

        assert_eq!(age_on(birth, date(2024, 5, 14)), 33);
        assert_eq!(age_on(birth, date(2024, 5, 15)), 34);
        assert_eq!(age_on(birth, date(2024, 12, 31)), 34);
    }

    #[test]
    fn test_age_leap_day() {
        let birth = date(2000, 2, 29);
        assert_eq!(age_on(birth, date(2023, 2, 28)), 22);
        assert_eq!(age_on(birth, date(2023, 3, 1)), 23);
    }

    #[test]
    fn test_parse_uuid() {
        assert!(parse_string_to_uuid("not-a-uuid").is_none());
        let id = Uuid::new_v4();
        assert_eq!(parse_string_to_uuid(&id.to_string()), Some(id));
    }
}
