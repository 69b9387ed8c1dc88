//! Text normalization and record matching used by session login.
//!
//! Free-text matching is substring containment: the caller's whole utterance
//! is searched for the record's fields. A short owner name such as "Li" will
//! therefore match any utterance containing those letters. That false
//! positive is accepted behavior for the demo desk.

use crate::types::PolicyRecord;

/// Lowercases and removes every whitespace character.
pub fn normalize(value: &str) -> String {
    value
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Maps a spoken cover type onto a `cover_details` key:
/// "Building Cover" -> "building_cover".
pub fn normalize_cover_key(cover_type: &str) -> String {
    cover_type.trim().to_lowercase().replace(' ', "_")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchReason {
    PolicyAndPostcode,
    OwnerName,
    NameAndDateOfBirth,
}

/// First record, in store order, whose fields occur in `free_text`.
pub fn match_free_text<'a>(
    records: &'a [PolicyRecord],
    free_text: &str,
) -> Option<(&'a PolicyRecord, MatchReason)> {
    let query = normalize(free_text);
    records.iter().find_map(|record| {
        let policy = normalize(&record.policy_number);
        let postcode = normalize(&record.postcode);
        let name = normalize(&record.full_name);

        if contains_field(&query, &policy) && contains_field(&query, &postcode) {
            return Some((record, MatchReason::PolicyAndPostcode));
        }
        if contains_field(&query, &name) {
            return Some((record, MatchReason::OwnerName));
        }
        None
    })
}

/// Structured login details. Every field is optional; a pair only counts
/// when both halves are present.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Deserialize)]
pub struct Credentials {
    pub policy_number: Option<String>,
    pub postcode: Option<String>,
    pub full_name: Option<String>,
    pub dob: Option<String>,
}

/// First record whose policy number and postcode, or full name and date of
/// birth, equal the supplied credentials after normalization.
pub fn match_credentials<'a>(
    records: &'a [PolicyRecord],
    credentials: &Credentials,
) -> Option<(&'a PolicyRecord, MatchReason)> {
    records.iter().find_map(|record| {
        if let (Some(policy), Some(postcode)) = (&credentials.policy_number, &credentials.postcode)
        {
            if equal_field(&record.policy_number, policy) && equal_field(&record.postcode, postcode)
            {
                return Some((record, MatchReason::PolicyAndPostcode));
            }
        }
        if let (Some(name), Some(dob)) = (&credentials.full_name, &credentials.dob) {
            if equal_field(&record.full_name, name) && equal_field(&record.dob, dob) {
                return Some((record, MatchReason::NameAndDateOfBirth));
            }
        }
        None
    })
}

// Blank fields never match, otherwise "" would be found in every query.
fn contains_field(query: &str, field: &str) -> bool {
    !field.is_empty() && query.contains(field)
}

fn equal_field(stored: &str, supplied: &str) -> bool {
    let stored = normalize(stored);
    !stored.is_empty() && stored == normalize(supplied)
}
