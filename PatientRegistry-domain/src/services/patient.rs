use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use thiserror::Error;
use tracing::{debug, error, info, warn};
use validator::Validate;

use patient_registry_data::models::{NewPatient, PatientRecord};
use patient_registry_data::repository::{PatientRepository, PatientRepositoryTrait, RepositoryError};

use crate::entities::conversions::{convert_to_patient_response, parse_string_to_uuid};
use crate::entities::patient::{
    Address, CreatePatientRequest, EmergencyContact, ImportSummary, PageQuery, PaginatedPatients,
    PatientResponse, PatientStats, UpdatePatientRequest,
};
use crate::services::import::{self, ImportError};
use crate::services::stats;
use crate::validation::{format_validation_errors, normalize_cep, normalize_cpf, normalize_phone, InvalidField};

/// Most item errors echoed back by an import
const MAX_IMPORT_ERROR_DETAILS: usize = 10;

/// Patient service errors
#[derive(Debug, Error, PartialEq)]
pub enum PatientServiceError {
    /// Validation error
    #[error("{0}")]
    Validation(String),

    /// No patient with this id
    #[error("Patient not found")]
    NotFound,

    /// CPF already belongs to another patient
    #[error("CPF already registered")]
    DuplicateCpf,

    /// Upload rejected as a whole
    #[error(transparent)]
    Import(#[from] ImportError),

    /// Repository error
    #[error("Repository error: {0}")]
    Repository(String),
}

impl From<InvalidField> for PatientServiceError {
    fn from(err: InvalidField) -> Self {
        PatientServiceError::Validation(err.to_string())
    }
}

impl From<RepositoryError> for PatientServiceError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Conflict { field: "cpf", .. } => PatientServiceError::DuplicateCpf,
            other => {
                error!("Patient repository failure: {}", other);
                PatientServiceError::Repository(other.to_string())
            }
        }
    }
}

/// Trait for patient record operations
#[async_trait]
pub trait PatientServiceTrait {
    /// Page through patients in creation order
    async fn list_patients(&self, page: PageQuery) -> Result<PaginatedPatients, PatientServiceError>;

    /// Get one patient by its id as given in the path
    async fn get_patient(&self, id: &str) -> Result<PatientResponse, PatientServiceError>;

    /// Validate, normalize and store a new patient
    async fn create_patient(
        &self,
        request: CreatePatientRequest,
        created_by: Option<String>,
    ) -> Result<PatientResponse, PatientServiceError>;

    /// Apply a partial update
    async fn update_patient(
        &self,
        id: &str,
        request: UpdatePatientRequest,
    ) -> Result<PatientResponse, PatientServiceError>;

    async fn delete_patient(&self, id: &str) -> Result<(), PatientServiceError>;

    /// Import patients from an uploaded JSON file
    async fn import_patients(
        &self,
        filename: &str,
        content: &[u8],
        created_by: Option<String>,
    ) -> Result<ImportSummary, PatientServiceError>;

    /// Aggregate statistics over all patients
    async fn stats(&self) -> Result<PatientStats, PatientServiceError>;
}

/// Patient service backed by a patient repository
pub struct PatientService<R: PatientRepositoryTrait> {
    repository: R,
}

impl<R: PatientRepositoryTrait> PatientService<R> {
    pub fn new(repository: R) -> Self {
        Self { repository }
    }

    fn today() -> NaiveDate {
        Utc::now().date_naive()
    }

    async fn find(&self, id: &str) -> Result<PatientRecord, PatientServiceError> {
        let Some(uuid) = parse_string_to_uuid(id) else {
            debug!("Patient id is not a UUID: {}", id);
            return Err(PatientServiceError::NotFound);
        };
        self.repository
            .get_by_id(uuid)
            .await?
            .ok_or(PatientServiceError::NotFound)
    }
}

fn validate_request<T: Validate>(request: &T) -> Result<(), PatientServiceError> {
    request
        .validate()
        .map_err(|e| PatientServiceError::Validation(format_validation_errors(&e)))
}

/// Empty phone strings count as no phone
fn normalize_optional_phone(phone: Option<String>) -> Result<Option<String>, InvalidField> {
    match phone {
        Some(phone) if !phone.is_empty() => normalize_phone(&phone).map(Some),
        _ => Ok(None),
    }
}

fn address_document(mut address: Address) -> Result<serde_json::Value, InvalidField> {
    address.zip_code = normalize_cep(&address.zip_code)?;
    Ok(address.to_document())
}

fn contact_document(contact: EmergencyContact) -> Result<serde_json::Value, PatientServiceError> {
    validate_request(&contact)?;
    Ok(contact.to_document())
}

/// Validate a create request and normalize it into storable form
pub fn prepare_new_patient(
    request: CreatePatientRequest,
    created_by: Option<String>,
) -> Result<NewPatient, PatientServiceError> {
    validate_request(&request)?;

    Ok(NewPatient {
        cpf: normalize_cpf(&request.cpf)?,
        phone: normalize_optional_phone(request.phone)?,
        address: request.address.map(address_document).transpose()?,
        emergency_contact: request.emergency_contact.map(contact_document).transpose()?,
        insurance_info: request.insurance_info.map(|info| info.to_document()),
        name: request.name,
        birth_date: request.birth_date,
        gender: request.gender.code().to_string(),
        email: request.email,
        medical_conditions: request.medical_conditions,
        medications: request.medications,
        allergies: request.allergies,
        notes: request.notes,
        created_by,
    })
}

/// Apply the present fields of `update` onto `record`
fn apply_update(record: &mut PatientRecord, update: UpdatePatientRequest) -> Result<(), PatientServiceError> {
    validate_request(&update)?;

    if let Some(name) = update.name {
        record.name = name;
    }
    if let Some(cpf) = update.cpf {
        record.cpf = normalize_cpf(&cpf)?;
    }
    if let Some(birth_date) = update.birth_date {
        record.birth_date = birth_date;
    }
    if let Some(gender) = update.gender {
        record.gender = gender.code().to_string();
    }
    if let Some(email) = update.email {
        record.email = Some(email);
    }
    if let Some(phone) = update.phone {
        record.phone = normalize_optional_phone(Some(phone))?;
    }
    if let Some(address) = update.address {
        record.address = Some(address_document(address)?);
    }
    if let Some(conditions) = update.medical_conditions {
        record.medical_conditions = conditions;
    }
    if let Some(medications) = update.medications {
        record.medications = medications;
    }
    if let Some(allergies) = update.allergies {
        record.allergies = allergies;
    }
    if let Some(contact) = update.emergency_contact {
        record.emergency_contact = Some(contact_document(contact)?);
    }
    if let Some(info) = update.insurance_info {
        record.insurance_info = Some(info.to_document());
    }
    if let Some(notes) = update.notes {
        record.notes = Some(notes);
    }

    record.updated_at = Utc::now();
    Ok(())
}

#[async_trait]
impl<R: PatientRepositoryTrait + Send + Sync> PatientServiceTrait for PatientService<R> {
    async fn list_patients(&self, page: PageQuery) -> Result<PaginatedPatients, PatientServiceError> {
        validate_request(&page)?;

        let size = page.size as usize;
        let offset = (page.page as usize - 1).saturating_mul(size);
        let (records, total) = self.repository.list(offset, size).await?;

        let today = Self::today();
        Ok(PaginatedPatients {
            items: records
                .into_iter()
                .map(|record| convert_to_patient_response(record, today))
                .collect(),
            total,
            page: page.page,
            size: page.size,
            pages: total.div_ceil(size),
        })
    }

    async fn get_patient(&self, id: &str) -> Result<PatientResponse, PatientServiceError> {
        let record = self.find(id).await?;
        Ok(convert_to_patient_response(record, Self::today()))
    }

    async fn create_patient(
        &self,
        request: CreatePatientRequest,
        created_by: Option<String>,
    ) -> Result<PatientResponse, PatientServiceError> {
        let new_patient = prepare_new_patient(request, created_by).map_err(|e| {
            warn!("Rejected patient: {}", e);
            e
        })?;

        if self.repository.get_by_cpf(&new_patient.cpf).await?.is_some() {
            warn!("Duplicate CPF on create");
            return Err(PatientServiceError::DuplicateCpf);
        }

        let record = self.repository.create(new_patient).await?;
        info!("Patient created: {}", record.id);

        Ok(convert_to_patient_response(record, Self::today()))
    }

    async fn update_patient(
        &self,
        id: &str,
        request: UpdatePatientRequest,
    ) -> Result<PatientResponse, PatientServiceError> {
        let mut record = self.find(id).await?;
        apply_update(&mut record, request)?;

        let updated = self
            .repository
            .update(record)
            .await?
            .ok_or(PatientServiceError::NotFound)?;
        info!("Patient updated: {}", updated.id);

        Ok(convert_to_patient_response(updated, Self::today()))
    }

    async fn delete_patient(&self, id: &str) -> Result<(), PatientServiceError> {
        let record = self.find(id).await?;
        if !self.repository.delete(record.id).await? {
            return Err(PatientServiceError::NotFound);
        }
        info!("Patient deleted: {}", record.id);
        Ok(())
    }

    async fn import_patients(
        &self,
        filename: &str,
        content: &[u8],
        created_by: Option<String>,
    ) -> Result<ImportSummary, PatientServiceError> {
        let items = import::parse_payload(filename, content).map_err(|e| {
            warn!("Rejected import file {}: {}", filename, e);
            e
        })?;

        let mut imported = 0;
        let mut errors: Vec<String> = Vec::new();

        for (index, item) in items.into_iter().enumerate() {
            let new_patient = match import::item_to_request(item)
                .map_err(PatientServiceError::Validation)
                .and_then(|request| prepare_new_patient(request, created_by.clone()))
            {
                Ok(patient) => patient,
                Err(e) => {
                    errors.push(format!("Item {}: {}", index + 1, e));
                    continue;
                }
            };

            if self.repository.get_by_cpf(&new_patient.cpf).await?.is_some() {
                debug!("Skipping already registered CPF in import");
                continue;
            }

            match self.repository.create(new_patient).await {
                Ok(_) => imported += 1,
                // Registered concurrently since the lookup above
                Err(RepositoryError::Conflict { .. }) => continue,
                Err(e) => return Err(e.into()),
            }
        }

        info!("Import completed: {} imported, {} errors", imported, errors.len());

        let error_count = errors.len();
        errors.truncate(MAX_IMPORT_ERROR_DETAILS);

        Ok(ImportSummary {
            message: "Import completed".to_string(),
            imported,
            errors: error_count,
            error_details: errors,
        })
    }

    async fn stats(&self) -> Result<PatientStats, PatientServiceError> {
        let records = self.repository.get_all().await?;
        Ok(stats::summarize(&records, Self::today()))
    }
}

/// Create the default patient service over a shared repository
pub fn create_patient_service(repository: PatientRepository) -> impl PatientServiceTrait + Send + Sync {
    PatientService::new(repository)
}
