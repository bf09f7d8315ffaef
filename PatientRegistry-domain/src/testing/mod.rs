// Testing utilities and fixtures for the domain layer
// This module is only available when the "mock" feature is enabled

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use indexmap::IndexMap;
use serde_json::json;

use patient_registry_data::models::{NewPatient, PatientRecord};
use patient_registry_data::repository::{PatientRepository, PatientRepositoryTrait};

pub use patient_registry_data::repository::{MockPatientRepositoryTrait, MockUserRepositoryTrait};

use crate::config::AuthConfig;
use crate::entities::patient::{Address, CreatePatientRequest, EmergencyContact, Gender};
use crate::entities::user::RegisterRequest;
use crate::health::{ComponentStatus, HealthComponent, HealthServiceTrait, SystemHealth};

/// Signing settings shared by tests
pub fn test_auth_config() -> AuthConfig {
    AuthConfig {
        jwt_secret: "test_secret_key_for_testing_only".to_string(),
        issuer: "patient-registry-test".to_string(),
        access_token_minutes: 30,
        refresh_token_days: 7,
        bcrypt_cost: 4,
    }
}

/// Registration payload with password `testpass123`
pub fn register_request(username: &str) -> RegisterRequest {
    RegisterRequest {
        email: format!("{}@example.com", username),
        username: username.to_string(),
        password: "testpass123".to_string(),
        full_name: Some("Test User".to_string()),
    }
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("fixture dates are valid")
}

/// A complete, valid create request for João Silva (CPF 12345678901)
pub fn sample_create_request() -> CreatePatientRequest {
    CreatePatientRequest {
        name: "João Silva".to_string(),
        cpf: "12345678901".to_string(),
        birth_date: date(1990, 1, 1),
        gender: Gender::Male,
        email: Some("joao@example.com".to_string()),
        phone: Some("11999999999".to_string()),
        address: Some(Address {
            street: "Rua das Flores".to_string(),
            number: Some("123".to_string()),
            complement: None,
            neighborhood: Some("Centro".to_string()),
            city: "São Paulo".to_string(),
            state: "SP".to_string(),
            zip_code: "01234-567".to_string(),
        }),
        medical_conditions: vec!["Hipertensão".to_string()],
        medications: vec!["Losartana".to_string()],
        allergies: vec!["Dipirona".to_string()],
        emergency_contact: Some(EmergencyContact {
            name: "Maria Silva".to_string(),
            relationship: "Esposa".to_string(),
            phone: "11988888888".to_string(),
            email: None,
        }),
        insurance_info: None,
        notes: None,
    }
}

/// Minimal stored patient with the given name and CPF
pub fn new_patient(name: &str, cpf: &str) -> NewPatient {
    NewPatient {
        name: name.to_string(),
        cpf: cpf.to_string(),
        birth_date: date(1990, 1, 1),
        gender: "O".to_string(),
        email: None,
        phone: None,
        address: None,
        medical_conditions: vec![],
        medications: vec![],
        allergies: vec![],
        emergency_contact: None,
        insurance_info: None,
        notes: None,
        created_by: None,
    }
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

/// João, Maria and Pedro, the search fixtures
pub fn search_patient_inputs() -> Vec<NewPatient> {
    vec![
        NewPatient {
            birth_date: date(1990, 1, 1),
            gender: "M".to_string(),
            email: Some("joao@example.com".to_string()),
            phone: Some("11999999999".to_string()),
            address: Some(json!({"city": "São Paulo", "state": "SP"})),
            medical_conditions: strings(&["Hipertensão", "Diabetes"]),
            medications: strings(&["Losartana", "Metformina"]),
            allergies: strings(&["Dipirona"]),
            ..new_patient("João Silva", "12345678901")
        },
        NewPatient {
            birth_date: date(1985, 5, 15),
            gender: "F".to_string(),
            email: Some("maria@example.com".to_string()),
            phone: Some("21888888888".to_string()),
            address: Some(json!({"city": "Rio de Janeiro", "state": "RJ"})),
            medical_conditions: strings(&["Asma"]),
            medications: strings(&["Salbutamol"]),
            allergies: strings(&["Penicilina"]),
            ..new_patient("Maria Santos", "98765432100")
        },
        NewPatient {
            birth_date: date(2000, 10, 20),
            gender: "M".to_string(),
            email: Some("pedro@example.com".to_string()),
            phone: Some("31777777777".to_string()),
            address: Some(json!({"city": "Belo Horizonte", "state": "MG"})),
            medical_conditions: strings(&["Diabetes"]),
            medications: strings(&["Insulina"]),
            allergies: vec![],
            ..new_patient("Pedro Oliveira", "55555555555")
        },
    ]
}

/// The search fixtures as stored records
pub fn search_patient_records() -> Vec<PatientRecord> {
    let now = Utc::now();
    search_patient_inputs()
        .into_iter()
        .map(|patient| patient.into_record(now))
        .collect()
}

/// Store the search fixtures through the repository
pub async fn seed_search_patients(repository: &PatientRepository) -> Vec<PatientRecord> {
    let mut stored = Vec::new();
    for patient in search_patient_inputs() {
        if let Ok(record) = repository.create(patient).await {
            stored.push(record);
        }
    }
    stored
}

/// Health service that reports fixed component statuses
#[derive(Debug, Clone, Default)]
pub struct MockHealthService {
    components: IndexMap<String, HealthComponent>,
}

impl MockHealthService {
    /// All components healthy
    pub fn new() -> Self {
        Self::default().with_component("api", ComponentStatus::Healthy, None)
    }

    /// Add or replace a component
    pub fn with_component(mut self, name: &str, status: ComponentStatus, details: Option<String>) -> Self {
        self.components
            .insert(name.to_string(), HealthComponent { status, details });
        self
    }
}

#[async_trait]
impl HealthServiceTrait for MockHealthService {
    async fn get_system_health(&self) -> SystemHealth {
        SystemHealth::from_components(self.components.clone())
    }
}
