/// Words that end in a period without ending the sentence
const ABBREVIATIONS: &[&str] = &[
    "dr", "mr", "mrs", "ms", "prof", "st", "jr", "sr", "inc", "ltd", "co", "corp", "no", "vs",
    "etc", "gen", "gov", "sen", "rep", "lt", "col", "capt", "rev", "hon", "mt", "ft", "u.s",
];

/// Punctuation kept by `clean_text`; everything else non-alphanumeric becomes a space
const KEPT_PUNCTUATION: &[char] = &['.', ',', ';', ':', '!', '?', '\'', '-'];

/// Drop citation markers and symbols that only confuse the role patterns.
/// Line breaks survive so sentence splitting still sees section boundaries.
#[must_use]
pub fn clean_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(c) = rest.chars().next() {
        if c == '[' {
            if let Some(len) = citation_len(rest) {
                rest = &rest[len..];
                continue;
            }
        }
        rest = &rest[c.len_utf8()..];

        if c == '\n' || c.is_alphanumeric() || c == '_' || KEPT_PUNCTUATION.contains(&c) {
            out.push(c);
        } else if !out.ends_with(' ') {
            out.push(' ');
        }
    }

    out
}

/// Byte length of a leading `[123]` marker
fn citation_len(text: &str) -> Option<usize> {
    let digits = text[1..].bytes().take_while(u8::is_ascii_digit).count();
    (digits > 0 && text.as_bytes().get(1 + digits) == Some(&b']')).then_some(digits + 2)
}

#[must_use]
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[must_use]
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Split text into sentences.
///
/// Lines are always boundaries. Within a line, `.`, `!` and `?` end a
/// sentence when followed by whitespace and a character that is not
/// lowercase, unless the period closes a known abbreviation or an initial.
#[must_use]
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();

    for line in text.lines() {
        let chars: Vec<(usize, char)> = line.char_indices().collect();
        let mut start = 0;

        for (i, &(pos, c)) in chars.iter().enumerate() {
            if !matches!(c, '.' | '!' | '?') {
                continue;
            }

            if chars.get(i + 1).is_some_and(|&(_, next)| !next.is_whitespace()) {
                continue;
            }

            let following = chars[i + 1..]
                .iter()
                .map(|&(_, ch)| ch)
                .find(|ch| !ch.is_whitespace());
            if following.is_some_and(char::is_lowercase) {
                continue;
            }

            if c == '.' && ends_with_abbreviation(&line[start..pos]) {
                continue;
            }

            let end = pos + c.len_utf8();
            push_sentence(&mut sentences, &line[start..end]);
            start = end;
        }

        push_sentence(&mut sentences, &line[start..]);
    }

    sentences
}

fn ends_with_abbreviation(preceding: &str) -> bool {
    let word = preceding
        .rsplit(char::is_whitespace)
        .next()
        .unwrap_or_default();

    let mut letters = word.chars();
    if let (Some(first), None) = (letters.next(), letters.next()) {
        return first.is_uppercase();
    }

    ABBREVIATIONS.contains(&word.to_lowercase().as_str())
}

fn push_sentence(sentences: &mut Vec<String>, raw: &str) {
    let sentence = collapse_whitespace(raw);
    if !sentence.is_empty() {
        sentences.push(sentence);
    }
}

/// Truncate to at most `max_chars` characters on a char boundary
#[must_use]
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

/// Title-case each word, leaving short acronyms such as "CEO" untouched
#[must_use]
pub fn title_case(text: &str) -> String {
    text.split_inclusive([' ', '-']).map(title_case_word).collect()
}

fn title_case_word(word: &str) -> String {
    let letters = word.chars().filter(|c| c.is_alphabetic()).count();
    let all_upper = word
        .chars()
        .filter(|c| c.is_alphabetic())
        .all(char::is_uppercase);
    if (2..=4).contains(&letters) && all_upper {
        return word.to_string();
    }

    let mut out = String::with_capacity(word.len());
    let mut first = true;
    for c in word.chars() {
        if !c.is_alphabetic() {
            out.push(c);
        } else if first {
            out.extend(c.to_uppercase());
            first = false;
        } else {
            out.extend(c.to_lowercase());
        }
    }
    out
}
