use crate::text::TestText;
use std::collections::HashMap;

/// Judged state of one prompt slot. A slot the cursor has not passed (or has
/// vacated via backspace) carries no state at all.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CharState {
    Correct,
    Incorrect,
}

/// What a single keystroke did to the engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Keystroke {
    /// Cursor advanced; `index` is the judged slot.
    Advanced { index: usize, correct: bool },
    /// Same as `Advanced`, and the prompt is now fully typed.
    Finished { index: usize, correct: bool },
    /// Input after completion; nothing changed.
    Ignored,
}

/// Read-only projection of the engine's counters, fed to the metrics
/// calculator together with elapsed time supplied by the caller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineCounts {
    pub correct_chars: usize,
    pub incorrect_chars: usize,
    pub total_chars: usize,
    pub total_errors: usize,
    pub cursor: usize,
    pub text_len: usize,
    pub complete: bool,
}

/// The per-keystroke state machine. Strict linear scan over the prompt:
/// every keystroke judges exactly one slot and advances, matched or not, so a
/// mistake can only be revisited through backspace.
#[derive(Debug)]
pub struct TypingEngine {
    text: TestText,
    cursor: usize,
    char_states: Vec<Option<CharState>>,
    correct_chars: usize,
    incorrect_chars: usize,
    total_errors: usize,
    /// Lifetime miss counts keyed by the *expected* character. Deliberately
    /// never decremented, even when a backspace retracts the mistake: the
    /// post-test heatmap reflects every error made, not just the ones still
    /// standing at the end.
    error_frequency: HashMap<char, u32>,
    complete: bool,
}

impl TypingEngine {
    pub fn new(text: TestText) -> Self {
        let len = text.len();
        Self {
            text,
            cursor: 0,
            char_states: vec![None; len],
            correct_chars: 0,
            incorrect_chars: 0,
            total_errors: 0,
            error_frequency: HashMap::new(),
            complete: false,
        }
    }

    /// Discard all progress and start over against a new prompt.
    pub fn reset(&mut self, text: TestText) {
        *self = Self::new(text);
    }

    pub fn text(&self) -> &TestText {
        &self.text
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    pub fn char_state(&self, index: usize) -> Option<CharState> {
        self.char_states.get(index).copied().flatten()
    }

    pub fn error_frequency(&self) -> &HashMap<char, u32> {
        &self.error_frequency
    }

    /// Judge one typed character against the slot under the cursor.
    pub fn handle_input(&mut self, typed: char) -> Keystroke {
        if self.complete {
            return Keystroke::Ignored;
        }

        let index = self.cursor;
        let expected = self.text.char_at(index);
        let correct = typed == expected;

        if correct {
            self.char_states[index] = Some(CharState::Correct);
            self.correct_chars += 1;
        } else {
            self.char_states[index] = Some(CharState::Incorrect);
            self.incorrect_chars += 1;
            self.total_errors += 1;
            *self.error_frequency.entry(expected).or_insert(0) += 1;
        }

        self.cursor += 1;

        if self.cursor == self.text.len() {
            self.complete = true;
            Keystroke::Finished { index, correct }
        } else {
            Keystroke::Advanced { index, correct }
        }
    }

    /// Step the cursor back one slot, retracting its judgment. No-op at the
    /// start of the prompt and after completion (`Complete` is terminal).
    /// The lifetime error map is left untouched.
    pub fn handle_backspace(&mut self) -> bool {
        if self.cursor == 0 || self.complete {
            return false;
        }

        self.cursor -= 1;
        match self.char_states[self.cursor].take() {
            Some(CharState::Correct) => self.correct_chars -= 1,
            Some(CharState::Incorrect) => self.incorrect_chars -= 1,
            None => {}
        }
        true
    }

    pub fn counts(&self) -> EngineCounts {
        EngineCounts {
            correct_chars: self.correct_chars,
            incorrect_chars: self.incorrect_chars,
            total_chars: self.correct_chars + self.incorrect_chars,
            total_errors: self.total_errors,
            cursor: self.cursor,
            text_len: self.text.len(),
            complete: self.complete,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn engine(prompt: &str) -> TypingEngine {
        TypingEngine::new(TestText::new(prompt).unwrap())
    }

    #[test]
    fn perfect_run_matches_prompt_length() {
        let mut e = engine("hello world");
        for c in "hello world".chars() {
            e.handle_input(c);
        }
        let counts = e.counts();
        assert_eq!(counts.correct_chars, 11);
        assert_eq!(counts.incorrect_chars, 0);
        assert!(counts.complete);
        assert!(e.error_frequency().is_empty());
    }

    #[test]
    fn mismatch_advances_and_records_expected_char() {
        let mut e = engine("cat");
        assert_matches!(e.handle_input('c'), Keystroke::Advanced { index: 0, correct: true });
        assert_matches!(e.handle_input('a'), Keystroke::Advanced { index: 1, correct: true });
        assert_matches!(e.handle_input('x'), Keystroke::Finished { index: 2, correct: false });

        let counts = e.counts();
        assert_eq!(counts.correct_chars, 2);
        assert_eq!(counts.incorrect_chars, 1);
        assert_eq!(counts.total_errors, 1);
        assert!(counts.complete);
        assert_eq!(e.error_frequency().get(&'t'), Some(&1));
    }

    #[test]
    fn input_after_completion_is_ignored() {
        let mut e = engine("hi");
        e.handle_input('h');
        e.handle_input('i');
        assert!(e.is_complete());
        assert_matches!(e.handle_input('!'), Keystroke::Ignored);
        assert_eq!(e.counts().total_chars, 2);
    }

    #[test]
    fn backspace_after_completion_is_ignored() {
        let mut e = engine("hi");
        e.handle_input('h');
        e.handle_input('i');
        assert!(!e.handle_backspace());
        assert_eq!(e.counts().cursor, 2);
        assert!(e.is_complete());
    }

    #[test]
    fn backspace_at_start_is_a_noop() {
        let mut e = engine("test");
        assert!(!e.handle_backspace());
        let counts = e.counts();
        assert_eq!(counts.cursor, 0);
        assert_eq!(counts.correct_chars, 0);
        assert_eq!(counts.incorrect_chars, 0);
    }

    #[test]
    fn backspace_reverses_counts_but_not_error_map() {
        let mut e = engine("hi");
        e.handle_input('h');
        e.handle_input('x');
        assert_eq!(e.counts().incorrect_chars, 1);

        assert!(e.handle_backspace());
        let counts = e.counts();
        assert_eq!(counts.cursor, 1);
        assert_eq!(counts.correct_chars, 1);
        assert_eq!(counts.incorrect_chars, 0);
        assert_eq!(e.char_state(1), None);
        // Lifetime error survives the correction.
        assert_eq!(e.error_frequency().get(&'i'), Some(&1));

        e.handle_input('i');
        let counts = e.counts();
        assert_eq!(counts.correct_chars, 2);
        assert_eq!(counts.incorrect_chars, 0);
        assert!(counts.complete);
        assert_eq!(e.error_frequency().get(&'i'), Some(&1));
    }

    #[test]
    fn counts_stay_consistent_with_char_states() {
        let mut e = engine("abcd");
        e.handle_input('a');
        e.handle_input('x');
        e.handle_input('c');
        let judged = (0..4).filter(|&i| e.char_state(i).is_some()).count();
        let counts = e.counts();
        assert_eq!(counts.correct_chars + counts.incorrect_chars, judged);
    }

    #[test]
    fn repeated_misses_accumulate_per_expected_char() {
        let mut e = engine("tt");
        e.handle_input('x');
        e.handle_backspace();
        e.handle_input('y');
        e.handle_backspace();
        e.handle_input('t');
        assert_eq!(e.error_frequency().get(&'t'), Some(&2));
        assert_eq!(e.counts().total_errors, 2);
    }

    #[test]
    fn reset_clears_everything() {
        let mut e = engine("ab");
        e.handle_input('x');
        e.reset(TestText::new("cd").unwrap());
        let counts = e.counts();
        assert_eq!(counts.cursor, 0);
        assert_eq!(counts.total_chars, 0);
        assert_eq!(counts.total_errors, 0);
        assert!(e.error_frequency().is_empty());
        assert!(!e.is_complete());
    }
}
