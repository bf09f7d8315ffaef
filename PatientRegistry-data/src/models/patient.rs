use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Storage model for a patient
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientRecord {
    /// Unique identifier of the patient
    pub id: Uuid,

    /// Full name
    pub name: String,

    /// Normalized CPF (11 digits, unique)
    pub cpf: String,

    /// Date of birth
    pub birth_date: NaiveDate,

    /// Single letter gender code (M, F or O)
    pub gender: String,

    pub email: Option<String>,

    /// Phone number, digits only
    pub phone: Option<String>,

    /// Address document
    pub address: Option<serde_json::Value>,

    pub medical_conditions: Vec<String>,

    pub medications: Vec<String>,

    pub allergies: Vec<String>,

    /// Emergency contact document
    pub emergency_contact: Option<serde_json::Value>,

    /// Insurance document
    pub insurance_info: Option<serde_json::Value>,

    pub notes: Option<String>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,

    /// Username of the account that created the record
    pub created_by: Option<String>,
}

impl PatientRecord {
    /// Look up a text field inside the address document
    pub fn address_field(&self, field: &str) -> Option<&str> {
        self.address
            .as_ref()
            .and_then(|address| address.get(field))
            .and_then(|value| value.as_str())
    }
}

/// Input data for storing a new patient
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPatient {
    pub name: String,
    pub cpf: String,
    pub birth_date: NaiveDate,
    pub gender: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<serde_json::Value>,
    pub medical_conditions: Vec<String>,
    pub medications: Vec<String>,
    pub allergies: Vec<String>,
    pub emergency_contact: Option<serde_json::Value>,
    pub insurance_info: Option<serde_json::Value>,
    pub notes: Option<String>,
    pub created_by: Option<String>,
}

impl NewPatient {
    /// Turn the input into a stored record with a fresh id and timestamps
    pub fn into_record(self, now: DateTime<Utc>) -> PatientRecord {
        PatientRecord {
            id: Uuid::new_v4(),
            name: self.name,
            cpf: self.cpf,
            birth_date: self.birth_date,
            gender: self.gender,
            email: self.email,
            phone: self.phone,
            address: self.address,
            medical_conditions: self.medical_conditions,
            medications: self.medications,
            allergies: self.allergies,
            emergency_contact: self.emergency_contact,
            insurance_info: self.insurance_info,
            notes: self.notes,
            created_at: now,
            updated_at: now,
            created_by: self.created_by,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn new_patient() -> NewPatient {
        NewPatient {
            name: "Maria Santos".to_string(),
            cpf: "98765432100".to_string(),
            birth_date: NaiveDate::from_ymd_opt(1985, 5, 15).unwrap(),
            gender: "F".to_string(),
            email: None,
            phone: None,
            address: Some(json!({ "city": "Rio de Janeiro", "state": "RJ" })),
            medical_conditions: vec![],
            medications: vec![],
            allergies: vec![],
            emergency_contact: None,
            insurance_info: None,
            notes: None,
            created_by: Some("admin".to_string()),
        }
    }

    #[test]
    fn test_into_record_sets_timestamps() {
        let now = Utc::now();
        let record = new_patient().into_record(now);

        assert_eq!(record.created_at, now);
        assert_eq!(record.updated_at, now);
        assert_eq!(record.created_by.as_deref(), Some("admin"));
    }

    #[test]
    fn test_address_field_lookup() {
        let record = new_patient().into_record(Utc::now());

        assert_eq!(record.address_field("city"), Some("Rio de Janeiro"));
        assert_eq!(record.address_field("zip_code"), None);
    }
}
