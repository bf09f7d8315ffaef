use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, error, info};

use patient_registry_data::models::PatientRecord;
use patient_registry_data::repository::{PatientRepository, PatientRepositoryTrait, RepositoryError};

use crate::entities::conversions::{age_on, convert_to_search_result};
use crate::entities::search::{
    SearchCriteria, SearchResponse, SortField, SortOrder, SuggestionsResponse,
};

/// Highest relevance a result can get
const MAX_SCORE: f64 = 2.0;

/// Search service errors
#[derive(Debug, Error, PartialEq)]
pub enum SearchServiceError {
    #[error("Repository error: {0}")]
    Repository(String),
}

impl From<RepositoryError> for SearchServiceError {
    fn from(err: RepositoryError) -> Self {
        error!("Search repository failure: {}", err);
        SearchServiceError::Repository(err.to_string())
    }
}

/// Trait for patient search operations
#[async_trait]
pub trait SearchServiceTrait {
    /// Filter, order, paginate and score patients
    async fn search(&self, criteria: SearchCriteria) -> Result<SearchResponse, SearchServiceError>;

    /// Distinct values of `field` starting with `prefix`, sorted
    async fn suggestions(
        &self,
        field: &str,
        prefix: &str,
        limit: usize,
    ) -> Result<SuggestionsResponse, SearchServiceError>;
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

fn any_contains_ci(values: &[String], needle: &str) -> bool {
    values.iter().any(|value| contains_ci(value, needle))
}

fn optional_contains_ci(haystack: Option<&str>, needle: &str) -> bool {
    haystack.is_some_and(|value| contains_ci(value, needle))
}

/// Whether `patient` passes every filter in `criteria`
pub fn matches(patient: &PatientRecord, criteria: &SearchCriteria, today: NaiveDate) -> bool {
    if let Some(q) = &criteria.query {
        let hit = contains_ci(&patient.name, q)
            || patient.cpf.contains(q.as_str())
            || optional_contains_ci(patient.email.as_deref(), q)
            || optional_contains_ci(patient.phone.as_deref(), q)
            || optional_contains_ci(patient.notes.as_deref(), q);
        if !hit {
            return false;
        }
    }

    if let Some(name) = &criteria.name {
        if !contains_ci(&patient.name, name) {
            return false;
        }
    }
    if let Some(cpf) = &criteria.cpf {
        if !patient.cpf.contains(cpf.as_str()) {
            return false;
        }
    }
    if let Some(email) = &criteria.email {
        if !optional_contains_ci(patient.email.as_deref(), email) {
            return false;
        }
    }
    if let Some(phone) = &criteria.phone {
        if !patient.phone.as_deref().is_some_and(|p| p.contains(phone.as_str())) {
            return false;
        }
    }
    if let Some(gender) = &criteria.gender {
        if patient.gender != gender.to_uppercase() {
            return false;
        }
    }

    if criteria.age_min.is_some() || criteria.age_max.is_some() {
        let age = age_on(patient.birth_date, today);
        if criteria.age_min.is_some_and(|min| age < min) || criteria.age_max.is_some_and(|max| age > max) {
            return false;
        }
    }
    if criteria.birth_date_from.is_some_and(|from| patient.birth_date < from)
        || criteria.birth_date_to.is_some_and(|to| patient.birth_date > to)
    {
        return false;
    }

    if let Some(condition) = &criteria.condition {
        if !any_contains_ci(&patient.medical_conditions, condition) {
            return false;
        }
    }
    if let Some(medication) = &criteria.medication {
        if !any_contains_ci(&patient.medications, medication) {
            return false;
        }
    }
    if let Some(allergy) = &criteria.allergy {
        if !any_contains_ci(&patient.allergies, allergy) {
            return false;
        }
    }

    if let Some(city) = &criteria.city {
        if !optional_contains_ci(patient.address_field("city"), city) {
            return false;
        }
    }
    if let Some(state) = &criteria.state {
        if !optional_contains_ci(patient.address_field("state"), state) {
            return false;
        }
    }

    true
}

/// Relevance of `patient` for `criteria`.
///
/// Starts at 1.0. Name, CPF, condition, medication and allergy are criteria:
/// each match adds a bonus and the total is scaled by the fraction of
/// criteria that matched. Email and phone only add a bonus.
pub fn match_score(patient: &PatientRecord, criteria: &SearchCriteria) -> f64 {
    let mut score = 1.0;
    let mut matched = 0u32;
    let mut total = 0u32;

    if let Some(name) = &criteria.name {
        total += 1;
        if contains_ci(&patient.name, name) {
            matched += 1;
            if patient.name.to_lowercase() == name.to_lowercase() {
                score += 0.5;
            }
        }
    }

    if let Some(cpf) = &criteria.cpf {
        total += 1;
        if patient.cpf.contains(cpf.as_str()) {
            matched += 1;
            score += 0.3;
        }
    }

    let list_criteria = [
        (&criteria.condition, &patient.medical_conditions, 0.2),
        (&criteria.medication, &patient.medications, 0.1),
        (&criteria.allergy, &patient.allergies, 0.1),
    ];
    for (term, values, bonus) in list_criteria {
        if let Some(term) = term {
            total += 1;
            if any_contains_ci(values, term) {
                matched += 1;
                score += bonus;
            }
        }
    }

    if let Some(email) = &criteria.email {
        if optional_contains_ci(patient.email.as_deref(), email) {
            score += 0.2;
        }
    }
    if let Some(phone) = &criteria.phone {
        if patient.phone.as_deref().is_some_and(|p| p.contains(phone.as_str())) {
            score += 0.2;
        }
    }

    if total > 0 {
        score *= f64::from(matched) / f64::from(total);
    }

    score.min(MAX_SCORE)
}

fn compare(a: &PatientRecord, b: &PatientRecord, field: SortField) -> Ordering {
    match field {
        SortField::Name => a
            .name
            .to_lowercase()
            .cmp(&b.name.to_lowercase())
            .then_with(|| a.name.cmp(&b.name)),
        SortField::BirthDate => a.birth_date.cmp(&b.birth_date),
        SortField::CreatedAt => a.created_at.cmp(&b.created_at),
    }
}

/// Patient search over the shared patient repository
pub struct SearchService<R: PatientRepositoryTrait> {
    repository: R,
}

impl<R: PatientRepositoryTrait> SearchService<R> {
    pub fn new(repository: R) -> Self {
        Self { repository }
    }
}

#[async_trait]
impl<R: PatientRepositoryTrait + Send + Sync> SearchServiceTrait for SearchService<R> {
    async fn search(&self, criteria: SearchCriteria) -> Result<SearchResponse, SearchServiceError> {
        let start_time = Instant::now();
        let today = Utc::now().date_naive();

        let mut found: Vec<PatientRecord> = self
            .repository
            .get_all()
            .await?
            .into_iter()
            .filter(|patient| matches(patient, &criteria, today))
            .collect();
        let total = found.len();

        found.sort_by(|a, b| {
            let ordering = compare(a, b, criteria.sort_by);
            match criteria.order {
                SortOrder::Asc => ordering,
                SortOrder::Desc => ordering.reverse(),
            }
        });

        let offset = criteria.page.saturating_sub(1).saturating_mul(criteria.size);
        let mut results: Vec<_> = found
            .iter()
            .skip(offset)
            .take(criteria.size)
            .map(|patient| convert_to_search_result(patient, today, match_score(patient, &criteria)))
            .collect();

        if criteria.ranks_by_score() {
            results.sort_by(|a, b| b.match_score.total_cmp(&a.match_score));
        }

        let query_time_ms = start_time.elapsed().as_secs_f64() * 1000.0;
        info!("Search completed: {} results, {:.2}ms", total, query_time_ms);

        Ok(SearchResponse {
            results,
            total,
            query_time_ms,
            filters_applied: criteria.filters_applied(),
        })
    }

    async fn suggestions(
        &self,
        field: &str,
        prefix: &str,
        limit: usize,
    ) -> Result<SuggestionsResponse, SearchServiceError> {
        let patients = self.repository.get_all().await?;

        let values: Vec<&str> = match field {
            "medical_conditions" => patients
                .iter()
                .flat_map(|p| p.medical_conditions.iter().map(String::as_str))
                .collect(),
            "medications" => patients
                .iter()
                .flat_map(|p| p.medications.iter().map(String::as_str))
                .collect(),
            "allergies" => patients
                .iter()
                .flat_map(|p| p.allergies.iter().map(String::as_str))
                .collect(),
            "cities" => patients.iter().filter_map(|p| p.address_field("city")).collect(),
            other => {
                debug!("No suggestions for unknown field {}", other);
                Vec::new()
            }
        };

        let prefix = prefix.to_lowercase();
        let suggestions: Vec<String> = values
            .into_iter()
            .filter(|value| !value.is_empty())
            .filter(|value| value.to_lowercase().starts_with(&prefix))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .take(limit)
            .map(str::to_string)
            .collect();

        Ok(SuggestionsResponse {
            field: field.to_string(),
            count: suggestions.len(),
            suggestions,
        })
    }
}

/// Create the default search service over a shared repository
pub fn create_search_service(repository: PatientRepository) -> impl SearchServiceTrait + Send + Sync {
    SearchService::new(repository)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::search::SearchQuery;
    use crate::testing::{new_patient, seed_search_patients};
    use patient_registry_data::repository::MockPatientRepositoryTrait;

    async fn seeded() -> SearchService<PatientRepository> {
        let repository = PatientRepository::new();
        seed_search_patients(&repository).await;
        SearchService::new(repository)
    }

    fn criteria(query: SearchQuery) -> SearchCriteria {
        query.into_criteria().unwrap()
    }

    fn names(response: &SearchResponse) -> Vec<&str> {
        response.results.iter().map(|r| r.name.as_str()).collect()
    }

    #[tokio::test]
    async fn test_search_by_name() {
        let service = seeded().await;

        let response = service
            .search(criteria(SearchQuery {
                name: Some("João".to_string()),
                ..Default::default()
            }))
            .await
            .unwrap();

        assert_eq!(response.total, 1);
        assert_eq!(names(&response), vec!["João Silva"]);
        assert!(response.filters_applied.contains_key("name"));
    }

    #[tokio::test]
    async fn test_search_by_cpf_and_gender() {
        let service = seeded().await;

        let by_cpf = service
            .search(criteria(SearchQuery {
                cpf: Some("123".to_string()),
                ..Default::default()
            }))
            .await
            .unwrap();
        assert_eq!(names(&by_cpf), vec!["João Silva"]);

        let by_gender = service
            .search(criteria(SearchQuery {
                gender: Some("m".to_string()),
                ..Default::default()
            }))
            .await
            .unwrap();
        assert_eq!(by_gender.total, 2);
        assert!(by_gender.results.iter().all(|r| r.gender == "M"));
    }

    #[tokio::test]
    async fn test_general_query() {
        let service = seeded().await;

        let response = service
            .search(criteria(SearchQuery {
                q: Some("maria@".to_string()),
                ..Default::default()
            }))
            .await
            .unwrap();

        assert_eq!(names(&response), vec!["Maria Santos"]);
        assert_eq!(response.filters_applied["general_query"], "maria@");
    }

    #[tokio::test]
    async fn test_condition_and_city() {
        let service = seeded().await;

        let diabetes = service
            .search(criteria(SearchQuery {
                condition: Some("diabetes".to_string()),
                ..Default::default()
            }))
            .await
            .unwrap();
        assert_eq!(diabetes.total, 2);

        let rio = service
            .search(criteria(SearchQuery {
                city: Some("rio".to_string()),
                ..Default::default()
            }))
            .await
            .unwrap();
        assert_eq!(names(&rio), vec!["Maria Santos"]);

        let minas = service
            .search(criteria(SearchQuery {
                state: Some("MG".to_string()),
                ..Default::default()
            }))
            .await
            .unwrap();
        assert_eq!(names(&minas), vec!["Pedro Oliveira"]);
    }

    #[tokio::test]
    async fn test_age_range_inclusive() {
        let service = seeded().await;
        let today = Utc::now().date_naive();
        let pedro_age = age_on(NaiveDate::from_ymd_opt(2000, 10, 20).unwrap(), today);

        let response = service
            .search(criteria(SearchQuery {
                age_min: Some(pedro_age),
                age_max: Some(pedro_age),
                ..Default::default()
            }))
            .await
            .unwrap();

        assert_eq!(names(&response), vec!["Pedro Oliveira"]);
    }

    #[tokio::test]
    async fn test_birth_date_range() {
        let service = seeded().await;

        let response = service
            .search(criteria(SearchQuery {
                birth_date_from: NaiveDate::from_ymd_opt(1985, 5, 15),
                birth_date_to: NaiveDate::from_ymd_opt(1990, 1, 1),
                sort_by: Some("birth_date".to_string()),
                ..Default::default()
            }))
            .await
            .unwrap();

        assert_eq!(names(&response), vec!["Maria Santos", "João Silva"]);
    }

    #[tokio::test]
    async fn test_sorting_and_pagination() {
        let service = seeded().await;

        let desc = service
            .search(criteria(SearchQuery {
                order: Some("desc".to_string()),
                ..Default::default()
            }))
            .await
            .unwrap();
        assert_eq!(names(&desc), vec!["Pedro Oliveira", "Maria Santos", "João Silva"]);

        let second_page = service
            .search(criteria(SearchQuery {
                page: Some(2),
                size: Some(2),
                ..Default::default()
            }))
            .await
            .unwrap();
        assert_eq!(second_page.total, 3);
        assert_eq!(names(&second_page), vec!["Pedro Oliveira"]);
    }

    #[tokio::test]
    async fn test_equal_scores_keep_sort_order() {
        let service = seeded().await;

        let response = service
            .search(criteria(SearchQuery {
                condition: Some("Diabetes".to_string()),
                order: Some("desc".to_string()),
                ..Default::default()
            }))
            .await
            .unwrap();

        assert_eq!(names(&response), vec!["Pedro Oliveira", "João Silva"]);
    }

    #[tokio::test]
    async fn test_relevance_reorders_page() {
        let repository = PatientRepository::new();
        repository.create(new_patient("Ana", "11122233344")).await.unwrap();
        repository.create(new_patient("Ana Souza", "22233344455")).await.unwrap();
        let service = SearchService::new(repository);

        let response = service
            .search(criteria(SearchQuery {
                q: Some("ana".to_string()),
                name: Some("ana".to_string()),
                order: Some("desc".to_string()),
                ..Default::default()
            }))
            .await
            .unwrap();

        // Name order would put "Ana Souza" first; the exact match outranks it
        assert_eq!(names(&response), vec!["Ana", "Ana Souza"]);
        assert!((response.results[0].match_score - 1.5).abs() < 1e-9);
        assert!((response.results[1].match_score - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_match_score_values() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let patient = crate::testing::search_patient_records()
            .into_iter()
            .next()
            .unwrap();
        assert!(matches(&patient, &SearchCriteria { page: 1, size: 10, ..Default::default() }, today));

        let no_criteria = SearchCriteria::default();
        assert_eq!(match_score(&patient, &no_criteria), 1.0);

        let exact_name = SearchCriteria {
            name: Some("joão silva".to_string()),
            ..Default::default()
        };
        assert!((match_score(&patient, &exact_name) - 1.5).abs() < 1e-9);

        let half = SearchCriteria {
            name: Some("João".to_string()),
            cpf: Some("999".to_string()),
            ..Default::default()
        };
        assert!((match_score(&patient, &half) - 0.5).abs() < 1e-9);

        let capped = SearchCriteria {
            name: Some("João Silva".to_string()),
            cpf: Some("123".to_string()),
            condition: Some("Diabetes".to_string()),
            medication: Some("Losartana".to_string()),
            allergy: Some("Dipirona".to_string()),
            email: Some("joao".to_string()),
            phone: Some("119".to_string()),
            ..Default::default()
        };
        assert_eq!(match_score(&patient, &capped), 2.0);

        let contact_only = SearchCriteria {
            email: Some("JOAO@".to_string()),
            ..Default::default()
        };
        assert!((match_score(&patient, &contact_only) - 1.2).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_suggestions() {
        let service = seeded().await;

        let conditions = service.suggestions("medical_conditions", "", 10).await.unwrap();
        assert_eq!(conditions.suggestions, vec!["Asma", "Diabetes", "Hipertensão"]);
        assert_eq!(conditions.count, 3);

        let cities = service.suggestions("cities", "s", 10).await.unwrap();
        assert_eq!(cities.suggestions, vec!["São Paulo"]);

        let limited = service.suggestions("medications", "", 2).await.unwrap();
        assert_eq!(limited.suggestions, vec!["Insulina", "Losartana"]);

        let unknown = service.suggestions("blood_type", "", 10).await.unwrap();
        assert!(unknown.suggestions.is_empty());
        assert_eq!(unknown.field, "blood_type");
    }

    #[tokio::test]
    async fn test_repository_failure() {
        let mut mock = MockPatientRepositoryTrait::new();
        mock.expect_get_all()
            .returning(|| Err(RepositoryError::Lock("poisoned".to_string())));
        let service = SearchService::new(mock);

        let result = service.search(SearchCriteria { page: 1, size: 10, ..Default::default() }).await;
        assert!(matches!(result, Err(SearchServiceError::Repository(_))));
    }
}
