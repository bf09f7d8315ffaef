use chrono::{DateTime, NaiveDate, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;
use validator::Validate;

#[cfg(feature = "with-api")]
use utoipa::{IntoParams, ToSchema};

/// Patient gender code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub enum Gender {
    #[serde(rename = "M")]
    Male,
    #[serde(rename = "F")]
    Female,
    #[serde(rename = "O")]
    Other,
}

impl Gender {
    /// Single letter code as stored
    pub fn code(&self) -> &'static str {
        match self {
            Gender::Male => "M",
            Gender::Female => "F",
            Gender::Other => "O",
        }
    }
}

/// Postal address
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct Address {
    pub street: String,
    pub number: Option<String>,
    pub complement: Option<String>,
    pub neighborhood: Option<String>,
    pub city: String,
    /// Two letter state code, e.g. SP
    pub state: String,
    /// CEP, with or without the dash
    pub zip_code: String,
}

impl Address {
    pub fn to_document(&self) -> Value {
        json!({
            "street": self.street,
            "number": self.number,
            "complement": self.complement,
            "neighborhood": self.neighborhood,
            "city": self.city,
            "state": self.state,
            "zip_code": self.zip_code,
        })
    }
}

/// Person to call in an emergency
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct EmergencyContact {
    pub name: String,
    pub relationship: String,
    pub phone: String,
    #[validate(email(message = "Invalid emergency contact email"))]
    pub email: Option<String>,
}

impl EmergencyContact {
    pub fn to_document(&self) -> Value {
        json!({
            "name": self.name,
            "relationship": self.relationship,
            "phone": self.phone,
            "email": self.email,
        })
    }
}

/// Health insurance plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct InsuranceInfo {
    pub provider: String,
    pub plan: String,
    pub number: String,
    pub validity: Option<NaiveDate>,
}

impl InsuranceInfo {
    pub fn to_document(&self) -> Value {
        json!({
            "provider": self.provider,
            "plan": self.plan,
            "number": self.number,
            "validity": self.validity,
        })
    }
}

/// Request payload for registering a patient
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct CreatePatientRequest {
    /// Full name
    #[validate(length(min = 3, max = 200, message = "Name must be between 3 and 200 characters"))]
    pub name: String,

    /// CPF, punctuation allowed
    pub cpf: String,

    pub birth_date: NaiveDate,

    pub gender: Gender,

    #[validate(email(message = "Invalid email address"))]
    pub email: Option<String>,

    /// Phone with area code, punctuation allowed
    pub phone: Option<String>,

    pub address: Option<Address>,

    #[serde(default)]
    pub medical_conditions: Vec<String>,

    #[serde(default)]
    pub medications: Vec<String>,

    #[serde(default)]
    pub allergies: Vec<String>,

    pub emergency_contact: Option<EmergencyContact>,

    pub insurance_info: Option<InsuranceInfo>,

    pub notes: Option<String>,
}

/// Partial update of a patient. Absent or null fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct UpdatePatientRequest {
    #[validate(length(min = 3, max = 200, message = "Name must be between 3 and 200 characters"))]
    pub name: Option<String>,
    pub cpf: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub gender: Option<Gender>,
    #[validate(email(message = "Invalid email address"))]
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<Address>,
    pub medical_conditions: Option<Vec<String>>,
    pub medications: Option<Vec<String>>,
    pub allergies: Option<Vec<String>>,
    pub emergency_contact: Option<EmergencyContact>,
    pub insurance_info: Option<InsuranceInfo>,
    pub notes: Option<String>,
}

/// Public representation of a patient
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct PatientResponse {
    pub id: Uuid,
    pub name: String,
    pub cpf: String,
    pub birth_date: NaiveDate,
    pub gender: String,
    /// Age in whole years, computed on each request
    pub age: i32,
    pub email: Option<String>,
    pub phone: Option<String>,
    #[cfg_attr(feature = "with-api", schema(value_type = Option<Object>))]
    pub address: Option<Value>,
    pub medical_conditions: Vec<String>,
    pub medications: Vec<String>,
    pub allergies: Vec<String>,
    #[cfg_attr(feature = "with-api", schema(value_type = Option<Object>))]
    pub emergency_contact: Option<Value>,
    #[cfg_attr(feature = "with-api", schema(value_type = Option<Object>))]
    pub insurance_info: Option<Value>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
}

/// Page selection for listing patients
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Validate)]
#[cfg_attr(feature = "with-api", derive(IntoParams))]
#[cfg_attr(feature = "with-api", into_params(parameter_in = Query))]
pub struct PageQuery {
    /// 1-based page number
    #[serde(default = "default_page")]
    #[validate(range(min = 1, message = "page must be at least 1"))]
    pub page: u32,

    /// Items per page
    #[serde(default = "default_size")]
    #[validate(range(min = 1, max = 100, message = "size must be between 1 and 100"))]
    pub size: u32,
}

impl Default for PageQuery {
    fn default() -> Self {
        Self {
            page: default_page(),
            size: default_size(),
        }
    }
}

fn default_page() -> u32 {
    1
}

fn default_size() -> u32 {
    10
}

/// One page of patients
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct PaginatedPatients {
    pub items: Vec<PatientResponse>,
    pub total: usize,
    pub page: u32,
    pub size: u32,
    pub pages: usize,
}

/// Outcome of a bulk import
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct ImportSummary {
    pub message: String,
    pub imported: usize,
    /// Number of items that failed
    pub errors: usize,
    /// First failures, at most ten
    pub error_details: Vec<String>,
}

/// Aggregate statistics over all patients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct PatientStats {
    pub total_patients: usize,
    /// Age bucket to count, in bucket order
    #[cfg_attr(feature = "with-api", schema(value_type = Object))]
    pub age_distribution: IndexMap<String, usize>,
    /// Gender code to count
    #[cfg_attr(feature = "with-api", schema(value_type = Object))]
    pub gender_distribution: IndexMap<String, usize>,
    /// Most frequent conditions, most common first
    #[cfg_attr(feature = "with-api", schema(value_type = Object))]
    pub top_conditions: IndexMap<String, usize>,
    pub average_age: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gender_codes_on_the_wire() {
        let gender: Gender = serde_json::from_str("\"F\"").unwrap();
        assert_eq!(gender, Gender::Female);
        assert_eq!(serde_json::to_string(&Gender::Other).unwrap(), "\"O\"");
        assert!(serde_json::from_str::<Gender>("\"X\"").is_err());
    }

    #[test]
    fn test_create_request_defaults_lists() {
        let request: CreatePatientRequest = serde_json::from_value(json!({
            "name": "João Silva",
            "cpf": "123.456.789-01",
            "birth_date": "1990-01-01",
            "gender": "M"
        }))
        .unwrap();

        assert!(request.medical_conditions.is_empty());
        assert!(request.address.is_none());
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_create_request_name_length() {
        let request: CreatePatientRequest = serde_json::from_value(json!({
            "name": "Jo",
            "cpf": "12345678901",
            "birth_date": "1990-01-01",
            "gender": "M"
        }))
        .unwrap();

        assert!(request.validate().is_err());
    }

    #[test]
    fn test_update_request_null_is_absent() {
        let request: UpdatePatientRequest =
            serde_json::from_value(json!({"name": null, "notes": "follow up"})).unwrap();

        assert!(request.name.is_none());
        assert_eq!(request.notes.as_deref(), Some("follow up"));
    }

    #[test]
    fn test_page_query_bounds() {
        assert!(PageQuery::default().validate().is_ok());
        assert!(PageQuery { page: 0, size: 10 }.validate().is_err());
        assert!(PageQuery { page: 1, size: 101 }.validate().is_err());
    }
}
