//! Aggregate statistics over the patient table.

use chrono::NaiveDate;
use indexmap::IndexMap;
use std::collections::HashMap;

use patient_registry_data::models::PatientRecord;

use crate::entities::conversions::age_on;
use crate::entities::patient::PatientStats;

const TOP_CONDITIONS: usize = 10;

fn age_bucket(age: i32) -> &'static str {
    match age {
        i32::MIN..=18 => "0-18",
        19..=30 => "19-30",
        31..=50 => "31-50",
        51..=70 => "51-70",
        _ => "70+",
    }
}

/// Summarize `records` with ages computed on `today`
pub fn summarize(records: &[PatientRecord], today: NaiveDate) -> PatientStats {
    if records.is_empty() {
        return PatientStats {
            total_patients: 0,
            age_distribution: IndexMap::new(),
            gender_distribution: IndexMap::new(),
            top_conditions: IndexMap::new(),
            average_age: 0.0,
        };
    }

    let ages: Vec<i32> = records.iter().map(|p| age_on(p.birth_date, today)).collect();

    let mut age_distribution: IndexMap<String, usize> = ["0-18", "19-30", "31-50", "51-70", "70+"]
        .into_iter()
        .map(|bucket| (bucket.to_string(), 0))
        .collect();
    for age in &ages {
        if let Some(count) = age_distribution.get_mut(age_bucket(*age)) {
            *count += 1;
        }
    }

    let mut gender_distribution: IndexMap<String, usize> = ["M", "F", "O"]
        .into_iter()
        .map(|code| (code.to_string(), 0))
        .collect();
    for record in records {
        if let Some(count) = gender_distribution.get_mut(record.gender.as_str()) {
            *count += 1;
        }
    }

    let mut condition_counts: HashMap<&str, usize> = HashMap::new();
    for condition in records.iter().flat_map(|p| p.medical_conditions.iter()) {
        *condition_counts.entry(condition.as_str()).or_insert(0) += 1;
    }
    let mut ranked: Vec<(&str, usize)> = condition_counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    let top_conditions = ranked
        .into_iter()
        .take(TOP_CONDITIONS)
        .map(|(name, count)| (name.to_string(), count))
        .collect();

    let average_age = ages.iter().map(|&a| f64::from(a)).sum::<f64>() / ages.len() as f64;

    PatientStats {
        total_patients: records.len(),
        age_distribution,
        gender_distribution,
        top_conditions,
        average_age,
    }
}
