//! Bulk import payload parsing.
//!
//! A payload is either a JSON array of patient objects or a FHIR bundle with
//! an `entry` array. Bundle entries carrying a `resource` are mapped onto the
//! patient shape before validation.

use serde_json::{json, Value};
use thiserror::Error;
use uuid::Uuid;

use crate::entities::patient::CreatePatientRequest;

/// Import errors that reject the whole file
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ImportError {
    #[error("Only JSON files are supported")]
    UnsupportedFile,

    #[error("Invalid JSON file")]
    InvalidJson,

    /// Valid JSON that is neither an array nor a bundle
    #[error("Invalid JSON format")]
    InvalidFormat,
}

/// Check the upload name and split the payload into items
pub fn parse_payload(filename: &str, content: &[u8]) -> Result<Vec<Value>, ImportError> {
    if !filename.ends_with(".json") {
        return Err(ImportError::UnsupportedFile);
    }

    let data: Value = serde_json::from_slice(content).map_err(|_| ImportError::InvalidJson)?;

    match data {
        Value::Array(items) => Ok(items),
        Value::Object(mut bundle) => match bundle.remove("entry") {
            Some(Value::Array(entries)) => Ok(entries),
            _ => Err(ImportError::InvalidFormat),
        },
        _ => Err(ImportError::InvalidFormat),
    }
}

/// Turn one payload item into a create request
pub fn item_to_request(item: Value) -> Result<CreatePatientRequest, String> {
    let patient = match item.get("resource") {
        Some(resource) => map_fhir_resource(resource)?,
        None => item,
    };
    serde_json::from_value(patient).map_err(|e| e.to_string())
}

fn first<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    value.get(key).and_then(|v| v.as_array()).and_then(|items| items.first())
}

fn text<'a>(value: Option<&'a Value>, key: &str) -> Option<&'a str> {
    value.and_then(|v| v.get(key)).and_then(Value::as_str)
}

/// Map a FHIR `Patient` resource onto the patient shape
fn map_fhir_resource(resource: &Value) -> Result<Value, String> {
    let name_entry = first(resource, "name");
    let given = name_entry
        .and_then(|n| first(n, "given"))
        .and_then(Value::as_str)
        .unwrap_or("");
    let family = text(name_entry, "family").unwrap_or("");
    let name = format!("{} {}", given, family).trim().to_string();

    let cpf = text(first(resource, "identifier"), "value")
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string().chars().take(11).collect());

    let birth_date = resource
        .get("birthDate")
        .and_then(Value::as_str)
        .unwrap_or("2000-01-01");

    let gender = resource.get("gender").and_then(Value::as_str).unwrap_or("other");
    let gender: String = match gender.chars().next() {
        Some(c) => c.to_uppercase().collect(),
        None => return Err("gender is empty".to_string()),
    };

    let email = match resource.get("id") {
        Some(Value::String(id)) => format!("{}@example.com", id),
        Some(Value::Number(id)) => format!("{}@example.com", id),
        _ => format!("{}@example.com", Uuid::new_v4()),
    };

    let phone = text(first(resource, "telecom"), "value").unwrap_or("11999999999");

    Ok(json!({
        "name": name,
        "cpf": cpf,
        "birth_date": birth_date,
        "gender": gender,
        "email": email,
        "phone": phone,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::patient::Gender;

    #[test]
    fn test_rejects_non_json_filename() {
        assert_eq!(parse_payload("patients.csv", b"[]"), Err(ImportError::UnsupportedFile));
    }

    #[test]
    fn test_rejects_malformed_json() {
        assert_eq!(parse_payload("patients.json", b"{not json"), Err(ImportError::InvalidJson));
    }

    #[test]
    fn test_rejects_wrong_shape() {
        assert_eq!(parse_payload("p.json", b"42"), Err(ImportError::InvalidFormat));
        assert_eq!(parse_payload("p.json", br#"{"patients": []}"#), Err(ImportError::InvalidFormat));
    }

    #[test]
    fn test_accepts_array_and_bundle() {
        assert_eq!(parse_payload("p.json", br#"[{}, {}]"#).unwrap().len(), 2);
        assert_eq!(
            parse_payload("p.json", br#"{"resourceType": "Bundle", "entry": [{}]}"#)
                .unwrap()
                .len(),
            1
        );
    }

    #[test]
    fn test_maps_fhir_resource() {
        let request = item_to_request(json!({
            "resource": {
                "resourceType": "Patient",
                "id": "abc-123",
                "name": [{"given": ["Ana", "Maria"], "family": "Souza"}],
                "identifier": [{"value": "123.456.789-01"}],
                "birthDate": "1975-04-02",
                "gender": "female",
                "telecom": [{"value": "(21) 98888-7777"}]
            }
        }))
        .unwrap();

        assert_eq!(request.name, "Ana Souza");
        assert_eq!(request.cpf, "123.456.789-01");
        assert_eq!(request.birth_date.to_string(), "1975-04-02");
        assert_eq!(request.gender, Gender::Female);
        assert_eq!(request.email.as_deref(), Some("abc-123@example.com"));
        assert_eq!(request.phone.as_deref(), Some("(21) 98888-7777"));
    }

    #[test]
    fn test_fhir_defaults() {
        let request = item_to_request(json!({
            "resource": {
                "id": "x1",
                "name": [{"given": ["Carlos"], "family": "Lima"}],
                "identifier": [{"value": "98765432100"}]
            }
        }))
        .unwrap();

        assert_eq!(request.birth_date.to_string(), "2000-01-01");
        assert_eq!(request.gender, Gender::Other);
        assert_eq!(request.phone.as_deref(), Some("11999999999"));
    }

    #[test]
    fn test_plain_item_passes_through() {
        let request = item_to_request(json!({
            "name": "João Silva",
            "cpf": "12345678901",
            "birth_date": "1990-01-01",
            "gender": "M"
        }))
        .unwrap();

        assert_eq!(request.name, "João Silva");
    }

    #[test]
    fn test_unknown_fhir_gender_fails() {
        let result = item_to_request(json!({
            "resource": {"gender": "unknown", "identifier": [{"value": "98765432100"}]}
        }));
        assert!(result.is_err());
    }
}
