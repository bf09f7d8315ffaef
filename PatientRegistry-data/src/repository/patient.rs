use async_trait::async_trait;
use chrono::Utc;
use tracing::debug;
use uuid::Uuid;

use crate::models::patient::{NewPatient, PatientRecord};
use super::errors::RepositoryError;
use super::in_memory::InMemoryStorage;

/// Repository trait for patient records
#[cfg_attr(any(test, feature = "mock"), mockall::automock)]
#[async_trait]
pub trait PatientRepositoryTrait {
    /// Store a new patient. Fails with a conflict when the CPF is taken.
    async fn create(&self, patient: NewPatient) -> Result<PatientRecord, RepositoryError>;

    /// Get a patient by ID
    async fn get_by_id(&self, id: Uuid) -> Result<Option<PatientRecord>, RepositoryError>;

    /// Get a patient by normalized CPF
    async fn get_by_cpf(&self, cpf: &str) -> Result<Option<PatientRecord>, RepositoryError>;

    /// Replace a stored patient. Returns `None` when the ID is unknown.
    async fn update(&self, patient: PatientRecord) -> Result<Option<PatientRecord>, RepositoryError>;

    /// Delete a patient, reporting whether it existed
    async fn delete(&self, id: Uuid) -> Result<bool, RepositoryError>;

    /// Page through patients in creation order, returning the page and the total
    async fn list(&self, offset: usize, limit: usize) -> Result<(Vec<PatientRecord>, usize), RepositoryError>;

    /// Get all patients in creation order
    async fn get_all(&self) -> Result<Vec<PatientRecord>, RepositoryError>;

    /// Number of stored patients
    async fn count(&self) -> Result<usize, RepositoryError>;
}

/// Repository for patient records backed by in-memory storage
#[derive(Debug, Clone, Default)]
pub struct PatientRepository {
    storage: InMemoryStorage<PatientRecord>,
}

impl PatientRepository {
    /// Create a new repository
    pub fn new() -> Self {
        Self {
            storage: InMemoryStorage::new(),
        }
    }

    fn cpf_conflict(cpf: &str) -> impl Fn(&PatientRecord) -> Option<RepositoryError> + '_ {
        move |existing| (existing.cpf == cpf).then(|| RepositoryError::conflict("cpf", cpf))
    }
}

#[async_trait]
impl PatientRepositoryTrait for PatientRepository {
    async fn create(&self, patient: NewPatient) -> Result<PatientRecord, RepositoryError> {
        let record = patient.into_record(Utc::now());
        debug!("Storing patient: {}", record.id);

        let cpf = record.cpf.clone();
        self.storage.insert_unique(record.id, record, Self::cpf_conflict(&cpf))
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<PatientRecord>, RepositoryError> {
        debug!("Getting patient by ID: {}", id);
        self.storage.get(&id)
    }

    async fn get_by_cpf(&self, cpf: &str) -> Result<Option<PatientRecord>, RepositoryError> {
        self.storage.find(|patient| patient.cpf == cpf)
    }

    async fn update(&self, patient: PatientRecord) -> Result<Option<PatientRecord>, RepositoryError> {
        debug!("Replacing patient: {}", patient.id);
        let cpf = patient.cpf.clone();
        self.storage.replace_unique(patient.id, patient, Self::cpf_conflict(&cpf))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, RepositoryError> {
        debug!("Deleting patient: {}", id);
        self.storage.remove(&id)
    }

    async fn list(&self, offset: usize, limit: usize) -> Result<(Vec<PatientRecord>, usize), RepositoryError> {
        let patients = self.storage.all()?;
        let total = patients.len();

        let page = patients.into_iter().skip(offset).take(limit).collect();

        Ok((page, total))
    }

    async fn get_all(&self) -> Result<Vec<PatientRecord>, RepositoryError> {
        self.storage.all()
    }

    async fn count(&self) -> Result<usize, RepositoryError> {
        self.storage.count()
    }
}
