//! Normalization rules for Brazilian identifiers and contact fields.

use std::fmt::Display;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{de, Deserialize, Deserializer};
use thiserror::Error;
use validator::ValidationErrors;

static CEP_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d{5}-?\d{3}$").expect("CEP pattern is a valid regex")
});

/// A field value that failed a normalization rule
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{field}: {message}")]
pub struct InvalidField {
    pub field: &'static str,
    pub message: &'static str,
}

impl InvalidField {
    fn new(field: &'static str, message: &'static str) -> Self {
        Self { field, message }
    }
}

fn digits_only(raw: &str) -> String {
    raw.chars().filter(char::is_ascii_digit).collect()
}

/// Strip a CPF down to its digits.
///
/// Only the length and the repeated-digit rule are checked; check digits
/// are not verified.
pub fn normalize_cpf(raw: &str) -> Result<String, InvalidField> {
    let cpf = digits_only(raw);

    if cpf.len() != 11 {
        return Err(InvalidField::new("cpf", "CPF deve ter 11 dígitos"));
    }

    let first = cpf.as_bytes()[0];
    if cpf.bytes().all(|b| b == first) {
        return Err(InvalidField::new("cpf", "CPF inválido"));
    }

    Ok(cpf)
}

/// Validate a CEP (`NNNNN-NNN` or `NNNNNNNN`) and drop the dash
pub fn normalize_cep(raw: &str) -> Result<String, InvalidField> {
    if !CEP_PATTERN.is_match(raw) {
        return Err(InvalidField::new("zip_code", "CEP inválido"));
    }
    Ok(raw.replace('-', ""))
}

/// Strip a phone number to digits; landlines have 10, mobiles 11
pub fn normalize_phone(raw: &str) -> Result<String, InvalidField> {
    let phone = digits_only(raw);
    if !(10..=11).contains(&phone.len()) {
        return Err(InvalidField::new("phone", "Telefone inválido"));
    }
    Ok(phone)
}

/// Serde helper for query parameters: a blank value counts as absent,
/// anything else must parse as `T`.
pub fn empty_string_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: Display,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value.parse().map(Some).map_err(de::Error::custom),
    }
}

/// Flatten `validator` errors into one readable message
pub fn format_validation_errors(errors: &ValidationErrors) -> String {
    let mut messages: Vec<String> = errors
        .field_errors()
        .iter()
        .map(|(field, errors)| {
            let error_msgs: Vec<String> = errors
                .iter()
                .map(|err| match &err.message {
                    Some(msg) => msg.to_string(),
                    None => format!("Invalid {}", field),
                })
                .collect();
            format!("{}: {}", field, error_msgs.join(", "))
        })
        .collect();

    // field_errors() is a HashMap
    messages.sort();
    messages.join("; ")
}
