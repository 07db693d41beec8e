use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use super::extractor::{CandidateMember, ExtractionOutput};
use crate::entity::MemberKey;

/// Organization facts combined from every chunk of one processing run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergedRecord {
    pub description: Option<String>,
    pub founded_date: Option<String>,
    pub headquarters: Option<String>,
    pub ideology: Option<String>,
    pub source_url: Option<String>,
    pub attributes: BTreeMap<String, String>,
    pub members: Vec<CandidateMember>,
}

impl MergedRecord {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.description.is_none()
            && self.founded_date.is_none()
            && self.headquarters.is_none()
            && self.ideology.is_none()
            && self.source_url.is_none()
            && self.attributes.is_empty()
            && self.members.is_empty()
    }
}

/// Merge per-chunk outputs in order.
///
/// Scalars and attributes keep the first non-blank value. The description is
/// replaced only by a strictly longer one. Members are deduplicated on
/// [`MemberKey`]; the first occurrence wins.
#[must_use]
pub fn merge_results(outputs: &[ExtractionOutput]) -> MergedRecord {
    let mut merged = MergedRecord::default();
    let mut seen: HashSet<MemberKey> = HashSet::new();

    for output in outputs {
        if let Some(description) = non_blank(output.description.as_ref()) {
            let longer = merged
                .description
                .as_ref()
                .is_none_or(|current| description.chars().count() > current.chars().count());
            if longer {
                merged.description = Some(description.clone());
            }
        }

        first_wins(&mut merged.founded_date, output.founded_date.as_ref());
        first_wins(&mut merged.headquarters, output.headquarters.as_ref());
        first_wins(&mut merged.ideology, output.ideology.as_ref());
        first_wins(&mut merged.source_url, output.source_url.as_ref());

        for (key, value) in &output.attributes {
            if value.trim().is_empty() {
                continue;
            }
            merged
                .attributes
                .entry(key.clone())
                .or_insert_with(|| value.clone());
        }

        for member in &output.members {
            if member.name.trim().is_empty() || member.role.trim().is_empty() {
                continue;
            }
            if seen.insert(member.key()) {
                merged.members.push(member.clone());
            }
        }
    }

    merged
}

fn non_blank(value: Option<&String>) -> Option<&String> {
    value.filter(|v| !v.trim().is_empty())
}

fn first_wins(slot: &mut Option<String>, candidate: Option<&String>) {
    if slot.is_none() {
        if let Some(value) = non_blank(candidate) {
            *slot = Some(value.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(name: &str, role: &str) -> CandidateMember {
        CandidateMember::new(name.into(), role.into())
    }

    #[test]
    fn test_first_scalar_wins() {
        let outputs = vec![
            ExtractionOutput::new().with_founded_date("1990".into()),
            ExtractionOutput::new()
                .with_founded_date("1991".into())
                .with_headquarters("Springfield".into()),
        ];

        let merged = merge_results(&outputs);

        assert_eq!(merged.founded_date.as_deref(), Some("1990"));
        assert_eq!(merged.headquarters.as_deref(), Some("Springfield"));
    }

    #[test]
    fn test_blank_values_do_not_claim_slot() {
        let outputs = vec![
            ExtractionOutput::new().with_headquarters("  ".into()),
            ExtractionOutput::new().with_headquarters("Springfield".into()),
        ];

        assert_eq!(merge_results(&outputs).headquarters.as_deref(), Some("Springfield"));
    }

    #[test]
    fn test_longer_description_replaces() {
        let outputs = vec![
            ExtractionOutput::new().with_description("Short.".into()),
            ExtractionOutput::new().with_description("A much longer description.".into()),
            ExtractionOutput::new().with_description("Mid length.".into()),
        ];

        assert_eq!(
            merge_results(&outputs).description.as_deref(),
            Some("A much longer description.")
        );
    }

    #[test]
    fn test_equal_length_description_keeps_first() {
        let outputs = vec![
            ExtractionOutput::new().with_description("abc".into()),
            ExtractionOutput::new().with_description("xyz".into()),
        ];

        assert_eq!(merge_results(&outputs).description.as_deref(), Some("abc"));
    }

    #[test]
    fn test_attributes_first_wins_per_key() {
        let outputs = vec![
            ExtractionOutput::new().with_attribute("status", "Registered"),
            ExtractionOutput::new()
                .with_attribute("status", "Deregistered")
                .with_attribute("leader_title", "Party Leader"),
        ];

        let merged = merge_results(&outputs);

        assert_eq!(merged.attributes["status"], "Registered");
        assert_eq!(merged.attributes["leader_title"], "Party Leader");
    }

    #[test]
    fn test_member_dedupe_normalizes_case_and_punctuation() {
        let outputs = vec![
            ExtractionOutput::new().with_member(member("Jane Doe", "President")),
            ExtractionOutput::new()
                .with_member(member("jane  doe", "President."))
                .with_member(member("Jane Doe", "Treasurer")),
        ];

        let merged = merge_results(&outputs);
        let pairs: Vec<(&str, &str)> = merged
            .members
            .iter()
            .map(|m| (m.name.as_str(), m.role.as_str()))
            .collect();

        assert_eq!(pairs, vec![("Jane Doe", "President"), ("Jane Doe", "Treasurer")]);
    }

    #[test]
    fn test_merging_same_result_twice_changes_nothing() {
        let result = ExtractionOutput::new()
            .with_description("Acme Org is a party.".into())
            .with_founded_date("1990".into())
            .with_attribute("status", "Registered")
            .with_member(member("Jane Doe", "President"))
            .with_member(member("jane doe", "President."))
            .with_member(member("John Roe", "Chairman"));

        let once = merge_results(std::slice::from_ref(&result));
        let twice = merge_results(&[result.clone(), result.clone()]);

        assert_eq!(twice, once);
        assert_eq!(once.members.len(), 2);
        assert_eq!(once.description.as_deref(), Some("Acme Org is a party."));
    }

    #[test]
    fn test_deterministic() {
        let outputs = vec![
            ExtractionOutput::new()
                .with_description("Desc".into())
                .with_member(member("Jane Doe", "President")),
            ExtractionOutput::new().with_member(member("John Roe", "Chairman")),
        ];

        assert_eq!(merge_results(&outputs), merge_results(&outputs));
    }

    #[test]
    fn test_empty_input() {
        assert!(merge_results(&[]).is_empty());
    }
}
