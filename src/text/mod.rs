pub mod corpus;

pub use corpus::Corpus;

use crate::config::{Difficulty, TestMode, TextType};
use itertools::Itertools;
use rand::seq::SliceRandom;
use rand::Rng;
use std::error::Error;
use std::fmt;

/// The immutable target content of one test. Char-indexed, with a known word
/// segmentation. Guaranteed non-empty.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TestText {
    content: String,
    chars: Vec<char>,
    word_count: usize,
}

/// Refusing to start a test against nothing to type is a setup-time error,
/// not a runtime fault.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EmptyTextError;

impl fmt::Display for EmptyTextError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "test text must not be empty")
    }
}

impl Error for EmptyTextError {}

impl TestText {
    pub fn new(content: impl Into<String>) -> Result<Self, EmptyTextError> {
        let content = content.into();
        let chars: Vec<char> = content.chars().collect();
        if chars.is_empty() {
            return Err(EmptyTextError);
        }
        let word_count = content.split_whitespace().count();
        Ok(Self {
            content,
            chars,
            word_count,
        })
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    /// Length in characters (not bytes).
    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn char_at(&self, index: usize) -> char {
        self.chars[index]
    }

    pub fn chars(&self) -> &[char] {
        &self.chars
    }

    pub fn word_count(&self) -> usize {
        self.word_count
    }
}

/// Returns the text to type for a given difficulty/shape/length. Never fails:
/// a provider that cannot produce content falls back to a fixed local text so
/// the test can always start.
pub trait TextProvider {
    fn fetch_text(&self, difficulty: Difficulty, text_type: TextType, word_count: usize)
        -> TestText;
}

/// How many words to request for a test. Word mode asks for exactly the
/// target; time mode overshoots (fast-typist estimate plus a 50% buffer) so
/// the prompt outlasts the clock.
pub fn estimate_word_count(mode: TestMode, test_value: usize) -> usize {
    match mode {
        TestMode::Words => test_value,
        TestMode::Time => ((test_value as f64 / 60.0) * 80.0 * 1.5).ceil() as usize,
    }
}

const MIN_WORDS: usize = 10;
const MAX_WORDS: usize = 500;

const CODE_SNIPPETS: &[&str] = &[
    "const data = [];",
    "function processData(input) {",
    "  return input.filter(x => x > 0);",
    "}",
    "let count = 0;",
    "for (let i = 0; i < items.length; i++) {",
    "  count += items[i].value;",
    "}",
    "const result = await fetch(url);",
    "const json = await result.json();",
    "if (condition === true) {",
    "  handleSuccess();",
    "} else {",
    "  handleError();",
    "}",
    "class User {",
    "  constructor(name) {",
    "    this.name = name;",
    "  }",
    "}",
    "export default Component;",
    "try {",
    "  await saveData();",
    "} catch (error) {",
    "  console.error(error);",
    "}",
];

/// Prompt generator backed by the embedded corpora. The stand-in for the
/// remote text service; shares its fallback behavior.
#[derive(Debug, Default)]
pub struct BuiltinTextProvider;

impl BuiltinTextProvider {
    pub fn new() -> Self {
        Self
    }

    fn select_words(&self, difficulty: Difficulty, word_count: usize) -> Option<Vec<String>> {
        let corpus = Corpus::load(difficulty).ok()?;
        let mut rng = rand::thread_rng();

        let mut pool: Vec<String> = corpus.words.into_iter().unique().collect();
        if pool.is_empty() {
            return None;
        }
        pool.shuffle(&mut rng);

        let mut selected: Vec<String> = pool.iter().take(word_count).cloned().collect();
        while selected.len() < word_count {
            pool.shuffle(&mut rng);
            selected.extend(pool.iter().cloned());
            selected.truncate(word_count);
        }
        Some(selected)
    }

    fn build_sentences(words: &[String], difficulty: Difficulty) -> String {
        let mut rng = rand::thread_rng();
        let mut sentences: Vec<String> = Vec::new();
        let mut current: Vec<String> = Vec::new();
        let mut sentence_len = rng.gen_range(5..=12);

        for word in words {
            current.push(word.clone());
            if current.len() >= sentence_len {
                sentences.push(Self::finish_sentence(&mut current, difficulty, &mut rng));
                sentence_len = rng.gen_range(5..=12);
            }
        }
        if !current.is_empty() {
            sentences.push(Self::finish_sentence(&mut current, difficulty, &mut rng));
        }

        sentences.join(" ")
    }

    fn finish_sentence(
        words: &mut Vec<String>,
        difficulty: Difficulty,
        rng: &mut impl Rng,
    ) -> String {
        if let Some(first) = words.first_mut() {
            *first = capitalize(first);
        }
        let punctuation = if difficulty == Difficulty::Easy {
            "."
        } else {
            [".", ".", ".", "!", "?"].choose(rng).copied().unwrap_or(".")
        };
        let sentence = format!("{}{}", words.join(" "), punctuation);
        words.clear();
        sentence
    }

    fn build_paragraphs(words: &[String], difficulty: Difficulty) -> String {
        let mut rng = rand::thread_rng();
        let mut paragraphs: Vec<String> = Vec::new();
        let mut paragraph: Vec<String> = Vec::new();
        let mut current: Vec<String> = Vec::new();
        let mut sentence_len = rng.gen_range(5..=12);
        let mut paragraph_len = rng.gen_range(3..=5);

        for word in words {
            current.push(word.clone());
            if current.len() >= sentence_len {
                paragraph.push(Self::finish_sentence(&mut current, difficulty, &mut rng));
                sentence_len = rng.gen_range(5..=12);
                if paragraph.len() >= paragraph_len {
                    paragraphs.push(paragraph.join(" "));
                    paragraph.clear();
                    paragraph_len = rng.gen_range(3..=5);
                }
            }
        }
        if !current.is_empty() {
            paragraph.push(Self::finish_sentence(&mut current, difficulty, &mut rng));
        }
        if !paragraph.is_empty() {
            paragraphs.push(paragraph.join(" "));
        }

        paragraphs.join("\n\n")
    }

    fn build_code(word_count: usize) -> String {
        let mut rng = rand::thread_rng();
        let start = rng.gen_range(0..CODE_SNIPPETS.len());
        let mut lines: Vec<&str> = Vec::new();
        let mut words = 0;
        let mut i = start;
        while words < word_count {
            let snippet = CODE_SNIPPETS[i % CODE_SNIPPETS.len()];
            lines.push(snippet);
            words += snippet.split_whitespace().count();
            i += 1;
        }
        lines.join("\n")
    }

    /// Fixed local texts used when corpus loading fails, mirroring the
    /// degraded-but-working behavior of the original client.
    pub fn fallback_text(difficulty: Difficulty) -> &'static str {
        match difficulty {
            Difficulty::Easy => {
                "the be to of and a in that have it for not on with he as you do at this \
                 but his by from they we say her she or an will my one all would there"
            }
            Difficulty::Medium => {
                "The quick brown fox jumps over the lazy dog. Pack my box with five dozen \
                 liquor jugs. How vexingly quick daft zebras jump!"
            }
            Difficulty::Hard => {
                "function calculate() { return 42; } const API_URL = \"https://example.com/api\"; \
                 let total = price * quantity * 1.15;"
            }
        }
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

impl TextProvider for BuiltinTextProvider {
    fn fetch_text(
        &self,
        difficulty: Difficulty,
        text_type: TextType,
        word_count: usize,
    ) -> TestText {
        let word_count = word_count.clamp(MIN_WORDS, MAX_WORDS);

        let content = match self.select_words(difficulty, word_count) {
            Some(words) => match text_type {
                TextType::Words => words.join(" "),
                TextType::Sentences => Self::build_sentences(&words, difficulty),
                TextType::Paragraphs => Self::build_paragraphs(&words, difficulty),
                TextType::Code => Self::build_code(word_count),
            },
            None => Self::fallback_text(difficulty).to_string(),
        };

        match TestText::new(content) {
            Ok(text) => text,
            // Generated content is never empty, but the fallback guarantees it.
            Err(EmptyTextError) => {
                TestText::new(Self::fallback_text(difficulty)).expect("fallback text is non-empty")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_text_is_refused() {
        assert_eq!(TestText::new(""), Err(EmptyTextError));
    }

    #[test]
    fn test_text_exposes_chars_and_words() {
        let text = TestText::new("hello brave world").unwrap();
        assert_eq!(text.len(), 17);
        assert_eq!(text.char_at(0), 'h');
        assert_eq!(text.char_at(5), ' ');
        assert_eq!(text.word_count(), 3);
    }

    #[test]
    fn estimate_word_count_for_word_mode_is_exact() {
        assert_eq!(estimate_word_count(TestMode::Words, 25), 25);
    }

    #[test]
    fn estimate_word_count_for_time_mode_adds_buffer() {
        // 60s at 80 wpm plus 50%.
        assert_eq!(estimate_word_count(TestMode::Time, 60), 120);
        assert_eq!(estimate_word_count(TestMode::Time, 30), 60);
    }

    #[test]
    fn words_mode_produces_requested_count() {
        let provider = BuiltinTextProvider::new();
        let text = provider.fetch_text(Difficulty::Easy, TextType::Words, 40);
        assert_eq!(text.word_count(), 40);
    }

    #[test]
    fn word_count_is_clamped() {
        let provider = BuiltinTextProvider::new();
        let text = provider.fetch_text(Difficulty::Easy, TextType::Words, 1);
        assert_eq!(text.word_count(), MIN_WORDS);
    }

    #[test]
    fn sentences_are_capitalized_and_punctuated() {
        let provider = BuiltinTextProvider::new();
        let text = provider.fetch_text(Difficulty::Medium, TextType::Sentences, 30);
        let content = text.content();
        assert!(content.chars().next().unwrap().is_uppercase());
        let last = content.chars().last().unwrap();
        assert!(['.', '!', '?'].contains(&last));
    }

    #[test]
    fn easy_sentences_end_with_periods_only() {
        let provider = BuiltinTextProvider::new();
        let text = provider.fetch_text(Difficulty::Easy, TextType::Sentences, 60);
        assert!(!text.content().contains('!'));
        assert!(!text.content().contains('?'));
    }

    #[test]
    fn paragraphs_are_separated_by_blank_lines() {
        let provider = BuiltinTextProvider::new();
        let text = provider.fetch_text(Difficulty::Easy, TextType::Paragraphs, 200);
        assert!(text.content().contains("\n\n"));
    }

    #[test]
    fn code_mode_emits_snippet_lines() {
        let provider = BuiltinTextProvider::new();
        let text = provider.fetch_text(Difficulty::Hard, TextType::Code, 30);
        assert!(text.content().contains('\n'));
        assert!(text.word_count() >= 30);
    }

    #[test]
    fn fallback_texts_are_valid_prompts() {
        for difficulty in [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard] {
            assert!(TestText::new(BuiltinTextProvider::fallback_text(difficulty)).is_ok());
        }
    }
}
