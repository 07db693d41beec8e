const PARAGRAPH_BREAK: &str = "\n\n";

/// Splits long text into model-sized pieces on paragraph boundaries.
///
/// Paragraphs are packed greedily while a chunk stays within `max_chars`
/// characters. A paragraph longer than the limit becomes a chunk on its own.
/// Joining the chunks with `"\n\n"` gives back the input unchanged.
#[derive(Debug, Clone, Copy)]
pub struct Chunker {
    max_chars: usize,
}

impl Chunker {
    #[must_use]
    pub fn new(max_chars: usize) -> Self {
        Self {
            max_chars: max_chars.max(1),
        }
    }

    #[must_use]
    pub const fn max_chars(&self) -> usize {
        self.max_chars
    }

    #[must_use]
    pub fn chunk(&self, text: &str) -> Vec<String> {
        if text.is_empty() {
            return Vec::new();
        }

        let mut chunks = Vec::new();
        let mut current = String::new();
        let mut current_chars = 0;

        for (i, paragraph) in text.split(PARAGRAPH_BREAK).enumerate() {
            let paragraph_chars = paragraph.chars().count();

            if i == 0 {
                current.push_str(paragraph);
                current_chars = paragraph_chars;
                continue;
            }

            let joined = current_chars + PARAGRAPH_BREAK.len() + paragraph_chars;
            if joined <= self.max_chars {
                current.push_str(PARAGRAPH_BREAK);
                current.push_str(paragraph);
                current_chars = joined;
            } else {
                chunks.push(std::mem::take(&mut current));
                current.push_str(paragraph);
                current_chars = paragraph_chars;
            }
        }

        chunks.push(current);
        chunks
    }
}

impl Default for Chunker {
    fn default() -> Self {
        Self::new(4000)
    }
}
