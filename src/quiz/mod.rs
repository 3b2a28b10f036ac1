pub mod bonus;
pub mod catalog;

use catalog::{Bonus, Character, Question};

pub const WRONG_ANSWER_TEXT: &str = "Неправильно. Попробуй ещё раз.";

/// High-level state of a session, derived from the selected character and
/// the current stage. Sessions only ever move forward through these, except
/// for a full reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    NoCharacterSelected,
    NoQuestionsAvailable,
    InProgress(usize),
    Completed,
}

/// One user's walk through a character's quiz: the chosen character, the
/// index of the question being asked, how many were answered correctly and
/// the pending "wrong answer" message.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct QuizSession {
    character: Option<Character>,
    stage: usize,
    correct: usize,
    error: Option<String>,
}

impl QuizSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select_character(&mut self, character: Character) {
        self.character = Some(character);
        self.stage = 0;
        self.correct = 0;
        self.error = None;
    }

    /// Checks `selected` against the current question. A correct answer
    /// advances to the next question (or completion) and returns true;
    /// anything else, a missing text included, records the retry message and
    /// leaves the session where it was.
    ///
    /// Panics when there is no question to answer; callers are expected to
    /// only invoke this in the `InProgress` phase.
    pub fn submit_answer(&mut self, selected: Option<&str>) -> bool {
        let correct = {
            let question = self
                .current_question()
                .expect("submit_answer called outside of a running quiz");
            selected == Some(question.answer.as_str())
        };

        if correct {
            self.correct += 1;
            self.stage += 1;
            self.error = None;
        } else {
            self.error = Some(WRONG_ANSWER_TEXT.to_string());
        }
        correct
    }

    pub fn phase(&self) -> Phase {
        match &self.character {
            None => Phase::NoCharacterSelected,
            Some(character) if character.questions.is_empty() => Phase::NoQuestionsAvailable,
            Some(character) if self.stage < character.questions.len() => {
                Phase::InProgress(self.stage)
            }
            Some(_) => Phase::Completed,
        }
    }

    /// Back to the initial empty state, whatever the session was doing.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// The character's reward, revealed on the completion screen.
    ///
    /// Panics unless the quiz has been completed; the reward must not leak
    /// out before the last question is answered.
    pub fn resolve_bonus(&self) -> Option<Bonus> {
        assert_eq!(
            self.phase(),
            Phase::Completed,
            "resolve_bonus called before the quiz was completed"
        );
        let character = self
            .character
            .as_ref()
            .expect("a completed quiz has a character");
        bonus::resolve(character)
    }

    pub fn character(&self) -> Option<&Character> {
        self.character.as_ref()
    }

    pub fn stage(&self) -> usize {
        self.stage
    }

    pub fn correct_count(&self) -> usize {
        self.correct
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.character
            .as_ref()
            .and_then(|character| character.questions.get(self.stage))
    }

    /// The pending error message. Taking it clears it, so it is shown at
    /// most once.
    pub fn take_error(&mut self) -> Option<String> {
        self.error.take()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}
