use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextSpan {
    pub text: String,
    pub start: usize,
    pub end: usize,
}

impl TextSpan {
    #[must_use]
    pub const fn new(text: String, start: usize, end: usize) -> Self {
        Self { text, start, end }
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.end - self.start
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Finds spans of text that denote people
pub trait PersonRecognizer: Send + Sync {
    fn persons(&self, text: &str) -> Vec<TextSpan>;
}

const HONORIFICS: &[&str] = &["dr", "mr", "mrs", "ms", "prof", "sir", "dame"];

/// Capitalized words that never start or continue a personal name
const STOP_WORDS: &[&str] = &[
    "a", "an", "the", "in", "on", "at", "of", "for", "and", "or", "by", "he", "she", "they",
    "it", "his", "her", "their", "this", "that", "these", "those", "since", "after", "before",
    "during", "under", "while", "when", "january", "february", "march", "july", "september",
    "october", "november", "december", "monday", "tuesday",
    "wednesday", "thursday", "friday", "saturday", "sunday", "president", "vice", "chairman",
    "chairwoman", "chairperson", "chair", "leader", "secretary", "general", "minister",
    "director", "founder", "co-founder", "treasurer", "chief", "head", "coordinator",
    "spokesperson", "spokesman", "spokeswoman", "ceo", "former", "current", "deputy",
];

/// Words that mark a capitalized run as an institution rather than a person
const ORGANIZATION_WORDS: &[&str] = &[
    "party", "org", "organization", "organisation", "inc", "ltd", "llc", "corp", "corporation",
    "company", "association", "union", "committee", "council", "congress", "front", "movement",
    "league", "alliance", "federation", "foundation", "institute", "university", "society",
    "group", "coalition", "assembly", "bank", "government", "ministry", "department",
    "republic", "kingdom", "states", "nations", "commission", "parliament", "senate", "court",
    "church", "club", "network", "agency", "bureau", "office", "center", "centre", "trust",
];

/// Rule-of-thumb recognizer: a person is a run of two or more capitalized
/// words, optionally led by an honorific, containing no stop word and no
/// institutional word.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicPersonRecognizer;

impl HeuristicPersonRecognizer {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl PersonRecognizer for HeuristicPersonRecognizer {
    fn persons(&self, text: &str) -> Vec<TextSpan> {
        let mut spans = Vec::new();
        let mut run: Vec<(usize, &str)> = Vec::new();
        let mut institutional = false;

        for (offset, token) in tokens(text) {
            let bare = bare_word(token);
            let lower = bare.to_lowercase();

            if ORGANIZATION_WORDS.contains(&lower.as_str()) && starts_uppercase(bare) {
                institutional = true;
                run.push((offset, token));
                continue;
            }

            if starts_uppercase(bare) && !STOP_WORDS.contains(&lower.as_str()) {
                run.push((offset, token));
                continue;
            }

            flush_run(text, &mut run, &mut institutional, &mut spans);
        }
        flush_run(text, &mut run, &mut institutional, &mut spans);

        spans
    }
}

fn flush_run(
    text: &str,
    run: &mut Vec<(usize, &str)>,
    institutional: &mut bool,
    spans: &mut Vec<TextSpan>,
) {
    let name_words = run
        .iter()
        .filter(|(_, token)| !is_honorific(token))
        .count();

    if !*institutional && name_words >= 2 {
        if let (Some(&(start, _)), Some(&(last_start, last))) = (run.first(), run.last()) {
            let end = last_start + trim_name_end(last).len();
            spans.push(TextSpan::new(text[start..end].to_string(), start, end));
        }
    }

    run.clear();
    *institutional = false;
}

/// Drop clause punctuation after the last name word. A period stays only
/// when it closes an initial or an honorific.
fn trim_name_end(token: &str) -> &str {
    let token = token.trim_end_matches([',', ';', ':', '!', '?']);
    if bare_word(token).chars().count() == 1 || is_honorific(token) {
        return token;
    }
    token.trim_end_matches('.')
}

fn tokens(text: &str) -> Vec<(usize, &str)> {
    let mut out = Vec::new();
    let mut start = None;

    for (i, c) in text.char_indices() {
        if c.is_whitespace() {
            if let Some(s) = start.take() {
                out.push((s, &text[s..i]));
            }
        } else if start.is_none() {
            start = Some(i);
        }
    }
    if let Some(s) = start {
        out.push((s, &text[s..]));
    }

    out
}

fn bare_word(token: &str) -> &str {
    token.trim_matches(|c: char| !c.is_alphanumeric() && c != '-' && c != '\'')
}

fn starts_uppercase(word: &str) -> bool {
    word.chars().next().is_some_and(char::is_uppercase)
}

/// True for "Dr", "Dr.", "Prof." and similar
#[must_use]
pub fn is_honorific(token: &str) -> bool {
    HONORIFICS.contains(&bare_word(token).to_lowercase().as_str())
}

/// Remove leading honorifics ("Dr. Jane Doe" becomes "Jane Doe")
#[must_use]
pub fn strip_honorifics(name: &str) -> &str {
    let mut rest = name.trim_start();
    loop {
        let Some((first, remainder)) = rest.split_once(char::is_whitespace) else {
            return rest;
        };
        if !is_honorific(first) {
            return rest;
        }
        rest = remainder.trim_start();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(text: &str) -> Vec<String> {
        HeuristicPersonRecognizer::new()
            .persons(text)
            .into_iter()
            .map(|s| s.text)
            .collect()
    }

    #[test]
    fn test_recognizes_two_word_name() {
        assert_eq!(names("Jane Doe"), vec!["Jane Doe"]);
    }

    #[test]
    fn test_span_offsets_match_text() {
        let text = "met with Jane Doe yesterday";
        let spans = HeuristicPersonRecognizer::new().persons(text);

        assert_eq!(spans.len(), 1);
        assert_eq!(&text[spans[0].start..spans[0].end], "Jane Doe");
    }

    #[test]
    fn test_rejects_organizations() {
        assert!(names("Acme Org").is_empty());
        assert!(names("the Green Party").is_empty());
        assert!(names("Acme Workers Union").is_empty());
    }

    #[test]
    fn test_rejects_single_words_and_stop_words() {
        assert!(names("Madonna").is_empty());
        assert!(names("In March").is_empty());
        assert!(names("The President").is_empty());
    }

    #[test]
    fn test_honorific_needs_two_name_words() {
        assert!(names("Dr. Doe").is_empty());
        assert_eq!(names("Dr. Jane Doe"), vec!["Dr. Jane Doe"]);
    }

    #[test]
    fn test_multiple_people() {
        assert_eq!(
            names("Jane Doe and John Roe"),
            vec!["Jane Doe".to_string(), "John Roe".to_string()]
        );
    }

    #[test]
    fn test_sentence_period_is_not_part_of_name() {
        assert_eq!(names("led by Jane Doe."), vec!["Jane Doe"]);
        assert_eq!(names("chaired by John Q."), vec!["John Q."]);
        assert_eq!(names("Is it Jane Doe?"), vec!["Jane Doe"]);
    }

    #[test]
    fn test_strip_honorifics() {
        assert_eq!(strip_honorifics("Dr. Jane Doe"), "Jane Doe");
        assert_eq!(strip_honorifics("Prof. Sir John Roe"), "John Roe");
        assert_eq!(strip_honorifics("Jane Doe"), "Jane Doe");
        assert_eq!(strip_honorifics("Sir"), "Sir");
    }
}
