use chrono::NaiveDate;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::validation::{empty_string_as_none, format_validation_errors};

#[cfg(feature = "with-api")]
use utoipa::{IntoParams, ToSchema};

/// Query string of `GET /search/patients`.
///
/// Blank parameters count as absent. Ranges are checked by
/// [`SearchQuery::into_criteria`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[cfg_attr(feature = "with-api", derive(IntoParams))]
#[cfg_attr(feature = "with-api", into_params(parameter_in = Query))]
pub struct SearchQuery {
    /// General query over name, CPF, email, phone and notes
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub q: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub cpf: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub phone: Option<String>,
    /// M, F or O
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub gender: Option<String>,
    /// Minimum age, 0 to 150
    #[serde(default, deserialize_with = "empty_string_as_none")]
    #[validate(range(min = 0, max = 150, message = "must be between 0 and 150"))]
    pub age_min: Option<i32>,
    /// Maximum age, 0 to 150
    #[serde(default, deserialize_with = "empty_string_as_none")]
    #[validate(range(min = 0, max = 150, message = "must be between 0 and 150"))]
    pub age_max: Option<i32>,
    /// YYYY-MM-DD
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub birth_date_from: Option<NaiveDate>,
    /// YYYY-MM-DD
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub birth_date_to: Option<NaiveDate>,
    /// Medical condition
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub condition: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub medication: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub allergy: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub city: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub state: Option<String>,
    /// 1-based page number
    #[serde(default, deserialize_with = "empty_string_as_none")]
    #[validate(range(min = 1, message = "must be at least 1"))]
    pub page: Option<u32>,
    /// Results per page, 1 to 100
    #[serde(default, deserialize_with = "empty_string_as_none")]
    #[validate(range(min = 1, max = 100, message = "must be between 1 and 100"))]
    pub size: Option<u32>,
    /// name, birth_date or created_at
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub sort_by: Option<String>,
    /// asc or desc
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub order: Option<String>,
}

/// Field the search results are ordered by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortField {
    #[default]
    Name,
    BirthDate,
    CreatedAt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

/// Parsed and validated search filters
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SearchCriteria {
    pub query: Option<String>,
    pub name: Option<String>,
    pub cpf: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub gender: Option<String>,
    pub age_min: Option<i32>,
    pub age_max: Option<i32>,
    pub birth_date_from: Option<NaiveDate>,
    pub birth_date_to: Option<NaiveDate>,
    pub condition: Option<String>,
    pub medication: Option<String>,
    pub allergy: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub page: usize,
    pub size: usize,
    pub sort_by: SortField,
    pub order: SortOrder,
}

impl SearchCriteria {
    /// Whether results should be reordered by relevance
    pub fn ranks_by_score(&self) -> bool {
        self.query.is_some() || self.condition.is_some() || self.medication.is_some()
    }

    /// Echo of the active filters, keyed by filter name
    pub fn filters_applied(&self) -> IndexMap<String, String> {
        let mut filters = IndexMap::new();
        let mut put = |key: &str, value: Option<String>| {
            if let Some(value) = value {
                filters.insert(key.to_string(), value);
            }
        };

        put("general_query", self.query.clone());
        put("name", self.name.clone());
        put("cpf", self.cpf.clone());
        put("email", self.email.clone());
        put("phone", self.phone.clone());
        put("gender", self.gender.clone());
        put("age_min", self.age_min.map(|v| v.to_string()));
        put("age_max", self.age_max.map(|v| v.to_string()));
        put("birth_date_from", self.birth_date_from.map(|d| d.to_string()));
        put("birth_date_to", self.birth_date_to.map(|d| d.to_string()));
        put("medical_condition", self.condition.clone());
        put("medication", self.medication.clone());
        put("allergy", self.allergy.clone());
        put("city", self.city.clone());
        put("state", self.state.clone());

        filters
    }
}

impl SearchQuery {
    /// Check the ranges and build the criteria. Errors carry a readable message.
    pub fn into_criteria(self) -> Result<SearchCriteria, String> {
        self.validate().map_err(|e| format_validation_errors(&e))?;

        let (sort_by, order) = match self.sort_by.as_deref() {
            Some("name") | None => (SortField::Name, parse_order(self.order.as_deref())),
            Some("birth_date") => (SortField::BirthDate, parse_order(self.order.as_deref())),
            Some("created_at") => (SortField::CreatedAt, parse_order(self.order.as_deref())),
            // Unknown fields fall back to name, always ascending
            Some(_) => (SortField::Name, SortOrder::Asc),
        };

        Ok(SearchCriteria {
            query: self.q,
            name: self.name,
            cpf: self.cpf,
            email: self.email,
            phone: self.phone,
            gender: self.gender,
            age_min: self.age_min,
            age_max: self.age_max,
            birth_date_from: self.birth_date_from,
            birth_date_to: self.birth_date_to,
            condition: self.condition,
            medication: self.medication,
            allergy: self.allergy,
            city: self.city,
            state: self.state,
            page: self.page.unwrap_or(1) as usize,
            size: self.size.unwrap_or(10) as usize,
            sort_by,
            order,
        })
    }
}

fn parse_order(value: Option<&str>) -> SortOrder {
    match value {
        Some("asc") | None => SortOrder::Asc,
        Some(_) => SortOrder::Desc,
    }
}

/// One matching patient with its relevance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct SearchResult {
    pub id: Uuid,
    pub name: String,
    pub cpf: String,
    pub birth_date: NaiveDate,
    pub age: i32,
    pub gender: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub medical_conditions: Vec<String>,
    pub medications: Vec<String>,
    pub allergies: Vec<String>,
    /// Relevance between 0.0 and 2.0
    pub match_score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct SearchResponse {
    pub results: Vec<SearchResult>,
    /// Matches before pagination
    pub total: usize,
    pub query_time_ms: f64,
    #[cfg_attr(feature = "with-api", schema(value_type = Object))]
    pub filters_applied: IndexMap<String, String>,
}

/// Query string of `GET /search/suggestions`
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[cfg_attr(feature = "with-api", derive(IntoParams))]
#[cfg_attr(feature = "with-api", into_params(parameter_in = Query))]
pub struct SuggestionsQuery {
    /// medical_conditions, medications, allergies or cities
    pub field: String,
    /// Case-insensitive prefix
    #[serde(default)]
    pub prefix: String,
    /// Maximum suggestions, 1 to 50
    #[serde(default, deserialize_with = "empty_string_as_none")]
    #[validate(range(min = 1, max = 50, message = "must be between 1 and 50"))]
    pub limit: Option<u32>,
}

impl SuggestionsQuery {
    /// The requested limit, defaulting to 10
    pub fn limit(&self) -> Result<usize, String> {
        self.validate().map_err(|e| format_validation_errors(&e))?;
        Ok(self.limit.unwrap_or(10) as usize)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct SuggestionsResponse {
    pub field: String,
    pub suggestions: Vec<String>,
    pub count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    #[test]
    fn test_defaults() {
        let criteria = SearchQuery::default().into_criteria().unwrap();

        assert_eq!(criteria.page, 1);
        assert_eq!(criteria.size, 10);
        assert_eq!(criteria.sort_by, SortField::Name);
        assert_eq!(criteria.order, SortOrder::Asc);
        assert!(criteria.filters_applied().is_empty());
    }

    fn query_from(value: serde_json::Value) -> Result<SearchQuery, serde_json::Error> {
        serde_json::from_value(value)
    }

    #[test]
    fn test_empty_values_are_absent() {
        let criteria = query_from(json!({
            "name": "",
            "age_min": "",
            "birth_date_from": " ",
            "size": ""
        }))
        .unwrap()
        .into_criteria()
        .unwrap();

        assert_eq!(criteria.name, None);
        assert_eq!(criteria.age_min, None);
        assert_eq!(criteria.birth_date_from, None);
        assert_eq!(criteria.size, 10);
    }

    #[test]
    fn test_text_values_are_parsed() {
        let query = query_from(json!({
            "age_min": "18",
            "birth_date_to": "1990-02-01",
            "page": "3"
        }))
        .unwrap();

        assert_eq!(query.age_min, Some(18));
        assert_eq!(query.birth_date_to, NaiveDate::from_ymd_opt(1990, 2, 1));
        assert_eq!(query.page, Some(3));
    }

    #[test]
    fn test_bounds_rejected() {
        let too_old = SearchQuery {
            age_max: Some(151),
            ..Default::default()
        };
        assert_eq!(
            too_old.into_criteria().unwrap_err(),
            "age_max: must be between 0 and 150"
        );

        let negative = SearchQuery {
            age_min: Some(-1),
            ..Default::default()
        };
        assert!(negative.into_criteria().unwrap_err().contains("age_min"));

        let zero_page = SearchQuery {
            page: Some(0),
            ..Default::default()
        };
        assert!(zero_page.into_criteria().is_err());

        let big_page = SearchQuery {
            size: Some(101),
            ..Default::default()
        };
        assert!(big_page.into_criteria().is_err());

        assert!(query_from(json!({"birth_date_to": "01/02/1990"})).is_err());
        assert!(query_from(json!({"age_min": "old"})).is_err());
    }

    #[test]
    fn test_sort_parsing() {
        let by_birth_desc = SearchQuery {
            sort_by: Some("birth_date".to_string()),
            order: Some("desc".to_string()),
            ..Default::default()
        }
        .into_criteria()
        .unwrap();
        assert_eq!(by_birth_desc.sort_by, SortField::BirthDate);
        assert_eq!(by_birth_desc.order, SortOrder::Desc);

        let unknown = SearchQuery {
            sort_by: Some("cpf".to_string()),
            order: Some("desc".to_string()),
            ..Default::default()
        }
        .into_criteria()
        .unwrap();
        assert_eq!(unknown.sort_by, SortField::Name);
        assert_eq!(unknown.order, SortOrder::Asc);

        let odd_order = SearchQuery {
            order: Some("ASC".to_string()),
            ..Default::default()
        }
        .into_criteria()
        .unwrap();
        assert_eq!(odd_order.order, SortOrder::Desc);
    }

    #[test]
    fn test_filters_applied_keys() {
        let criteria = SearchQuery {
            q: Some("silva".to_string()),
            condition: Some("Diabetes".to_string()),
            age_min: Some(18),
            ..Default::default()
        }
        .into_criteria()
        .unwrap();

        let filters = criteria.filters_applied();
        assert_eq!(filters.get("general_query").map(String::as_str), Some("silva"));
        assert_eq!(filters.get("medical_condition").map(String::as_str), Some("Diabetes"));
        assert_eq!(filters.get("age_min").map(String::as_str), Some("18"));
        assert_eq!(filters.len(), 3);
        assert!(criteria.ranks_by_score());
    }

    #[test]
    fn test_suggestion_limit() {
        let query = SuggestionsQuery {
            field: "cities".to_string(),
            prefix: String::new(),
            limit: None,
        };
        assert_eq!(query.limit().unwrap(), 10);

        let too_many = SuggestionsQuery {
            limit: Some(51),
            ..query
        };
        assert!(too_many.limit().is_err());
    }
}
