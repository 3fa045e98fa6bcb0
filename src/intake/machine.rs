//! The intake state machine.
//!
//! One `IntakeSession` owns one draft and one state. `submit` validates the
//! latest reply, mutates at most one draft field, and returns a data-only
//! [`Effect`] describing what the UI should do next. The machine performs no
//! I/O of any kind — rendering, speech, file collection, and the network
//! submission all belong to the channel and flow layers.

use uuid::Uuid;

use super::draft::ApplicationDraft;
use super::parse;
use super::state::ConversationState;

/// Opening line of the intake dialogue.
pub const GREETING: &str =
    "Hello! Let's start your credit application. To begin, what is your full name?";

const GENDERS: [&str; 3] = ["Male", "Female", "Other"];
const PROPERTY_AREAS: [&str; 3] = ["Urban", "Semiurban", "Rural"];

/// What the UI layer should do after a `submit` call.
///
/// Every rejection is recoverable: the same question is re-asked until the
/// reply validates, with no retry limit and no data loss.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// The reply failed the current state's predicate; render the corrective
    /// message and keep the input open. State and draft are unchanged.
    Reject { message: String },
    /// The reply was accepted; render the next question.
    AdvanceAndPrompt { message: String },
    /// Every field is collected and the applicant confirmed. Render the
    /// message, then collect the required statement attachment and submit —
    /// the machine is done until the external layer acts.
    RequestExternalSubmission { message: String },
    /// The applicant declined confirmation; the draft was discarded. Render
    /// the message and clear any in-progress upload widgets.
    RestartAndPrompt { message: String },
}

/// A submission transition was requested from the wrong state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Cannot begin submission from state {0}")]
pub struct NotAwaitingStatement(pub ConversationState);

/// One applicant's intake dialogue: the draft being assembled plus the
/// state naming the field currently being collected.
///
/// Construct one per active chat session; discard it to abandon the intake.
#[derive(Debug, Clone)]
pub struct IntakeSession {
    id: Uuid,
    state: ConversationState,
    draft: ApplicationDraft,
}

impl Default for IntakeSession {
    fn default() -> Self {
        Self::new()
    }
}

impl IntakeSession {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            state: ConversationState::default(),
            draft: ApplicationDraft::default(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> ConversationState {
        self.state
    }

    pub fn draft(&self) -> &ApplicationDraft {
        &self.draft
    }

    /// Process one user-submitted chat line.
    ///
    /// Returns `None` in the terminal states (`AwaitingStatement`,
    /// `Submitting`), where free text has no handler and the next transition
    /// belongs to the external layer.
    pub fn submit(&mut self, raw_message: &str) -> Option<Effect> {
        use ConversationState::*;

        let message = raw_message.trim();
        let effect = match self.state {
            AskName => {
                if !parse::is_full_name(message) {
                    return Some(self.reject("Please enter your full name (first and last name)."));
                }
                self.draft.full_name = Some(message.to_string());
                self.advance(AskGender, format!(
                    "Thank you, {message}. What is your gender? (Male / Female / Other)"
                ))
            }
            AskGender => {
                if !parse::is_choice(message, &GENDERS) {
                    return Some(
                        self.reject("Please enter a valid gender: Male, Female, or Other."),
                    );
                }
                self.draft.gender = Some(message.to_string());
                self.advance_with_question(AskMarried)
            }
            AskMarried => match parse::yes_no(message) {
                Some(answer) => {
                    self.draft.married = Some(answer);
                    self.advance_with_question(AskDependents)
                }
                None => self.reject("Please answer with 'Yes' or 'No'. Are you married?"),
            },
            AskDependents => match parse::dependents(message) {
                Some(bucket) => {
                    self.draft.dependents = Some(bucket);
                    self.advance_with_question(AskEducation)
                }
                None => self.reject("Please choose from the options: 0, 1, 2, or 3+."),
            },
            AskEducation => match parse::education(message) {
                Some(level) => {
                    self.draft.education = Some(level);
                    self.advance_with_question(AskSelfEmployed)
                }
                None => self.reject("Please answer with 'Graduate' or 'Not Graduate'."),
            },
            AskSelfEmployed => match parse::yes_no(message) {
                Some(answer) => {
                    self.draft.self_employed = Some(answer);
                    self.advance_with_question(AskIncome)
                }
                None => self.reject("Please answer with 'Yes' or 'No'. Are you self-employed?"),
            },
            AskIncome => match parse::amount(message) {
                Some(income) if income > rust_decimal::Decimal::ZERO => {
                    self.draft.monthly_income = Some(income);
                    self.advance_with_question(AskCoapplicantIncome)
                }
                Some(_) => {
                    self.reject("Please enter a valid positive number for your income.")
                }
                None => {
                    self.reject("Please enter a valid number without any text or symbols.")
                }
            },
            AskCoapplicantIncome => match parse::amount(message) {
                Some(income) if income >= rust_decimal::Decimal::ZERO => {
                    self.draft.coapplicant_income = Some(income);
                    self.advance_with_question(AskLoanAmount)
                }
                Some(_) => self.reject("Please enter a valid number (0 or more)."),
                None => {
                    self.reject("Please enter a valid number without any text or symbols.")
                }
            },
            AskLoanAmount => match parse::amount(message) {
                Some(amount) if amount > rust_decimal::Decimal::ZERO => {
                    self.draft.loan_amount = Some(amount);
                    self.advance_with_question(AskLoanTerm)
                }
                Some(_) => {
                    self.reject("Please enter a valid positive number for the loan amount.")
                }
                None => {
                    self.reject("Please enter a valid number without any text or symbols.")
                }
            },
            AskLoanTerm => match parse::whole_number(message) {
                Some(term) if term > 0 => {
                    self.draft.loan_amount_term = Some(term);
                    self.advance_with_question(AskCreditHistory)
                }
                Some(_) => self.reject("Please enter a valid positive number of months."),
                None => {
                    self.reject("Please enter a whole number without any text or symbols.")
                }
            },
            AskCreditHistory => match parse::yes_no(message) {
                Some(answer) => {
                    self.draft.credit_history = Some(answer.as_flag());
                    self.advance_with_question(AskPropertyArea)
                }
                None => self.reject("This is a critical question. Please answer 'Yes' or 'No'."),
            },
            AskPropertyArea => {
                if !parse::is_choice(message, &PROPERTY_AREAS) {
                    return Some(
                        self.reject("Please choose from the options: Urban, Semiurban, or Rural."),
                    );
                }
                self.draft.property_area = Some(message.to_string());
                self.advance_with_question(ConfirmSubmit)
            }
            // Never rejects; branches on confirmation instead.
            ConfirmSubmit => {
                if message.to_lowercase().contains("yes") {
                    self.transition(AwaitingStatement);
                    Effect::RequestExternalSubmission {
                        message: "Great. As the final step, please upload your bank statement \
                                  PDF and click Submit."
                            .to_string(),
                    }
                } else {
                    self.draft.clear();
                    self.transition(AskName);
                    Effect::RestartAndPrompt {
                        message: "Okay, let's start over. What is your full name?".to_string(),
                    }
                }
            }
            AwaitingStatement | Submitting => return None,
        };
        Some(effect)
    }

    /// Mark the session as submitting. Called by the external layer once the
    /// statement attachment is in hand, immediately before the network call.
    ///
    /// A retry from `Submitting` is allowed so a fresh attachment can be
    /// re-submitted after an external failure — the machine defines no
    /// rollback for that case.
    pub fn begin_submission(&mut self) -> Result<(), NotAwaitingStatement> {
        use ConversationState::*;
        match self.state {
            AwaitingStatement => {
                self.transition(Submitting);
                Ok(())
            }
            Submitting => Ok(()),
            other => Err(NotAwaitingStatement(other)),
        }
    }

    fn reject(&self, message: &str) -> Effect {
        Effect::Reject {
            message: message.to_string(),
        }
    }

    fn advance_with_question(&mut self, next: ConversationState) -> Effect {
        let message = next.question().unwrap_or_default().to_string();
        self.advance(next, message)
    }

    fn advance(&mut self, next: ConversationState, message: String) -> Effect {
        self.transition(next);
        Effect::AdvanceAndPrompt { message }
    }

    fn transition(&mut self, next: ConversationState) {
        tracing::debug!(session = %self.id, from = %self.state, to = %next, "intake transition");
        self.state = next;
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;
    use crate::intake::draft::{Dependents, Education, YesNo};

    /// Drive a fresh session to the given state with the happy-path script.
    fn session_at(target: ConversationState) -> IntakeSession {
        let script = [
            "Jane Doe", "Female", "No", "2", "Graduate", "No", "55000", "0", "150", "360", "Yes",
            "Urban",
        ];
        let mut session = IntakeSession::new();
        for reply in script {
            if session.state() == target {
                return session;
            }
            match session.submit(reply) {
                Some(Effect::AdvanceAndPrompt { .. }) => {}
                other => panic!("script stalled at {}: {:?}", session.state(), other),
            }
        }
        assert_eq!(session.state(), target, "script never reached {target}");
        session
    }

    #[test]
    fn greeting_asks_for_the_name() {
        assert!(GREETING.contains("full name"));
        assert_eq!(IntakeSession::new().state(), ConversationState::AskName);
    }

    #[test]
    fn rejection_leaves_state_and_draft_unchanged() {
        let cases = [
            (ConversationState::AskName, "Jane"),
            (ConversationState::AskGender, "robot"),
            (ConversationState::AskMarried, "maybe"),
            (ConversationState::AskDependents, "3"),
            (ConversationState::AskEducation, "high school"),
            (ConversationState::AskSelfEmployed, "sometimes"),
            (ConversationState::AskIncome, "a lot"),
            (ConversationState::AskIncome, "0"),
            (ConversationState::AskCoapplicantIncome, "-5"),
            (ConversationState::AskLoanAmount, "free"),
            (ConversationState::AskLoanAmount, "0"),
            (ConversationState::AskLoanTerm, "1.5"),
            (ConversationState::AskLoanTerm, "0"),
            (ConversationState::AskCreditHistory, "unsure"),
            (ConversationState::AskPropertyArea, "suburban"),
        ];

        for (state, bad_input) in cases {
            let mut session = session_at(state);
            let draft_before = session.draft().clone();

            let effect = session.submit(bad_input).unwrap();
            assert!(
                matches!(effect, Effect::Reject { .. }),
                "{state} should reject {bad_input:?}, got {effect:?}"
            );
            assert_eq!(session.state(), state, "state drifted after reject at {state}");
            assert_eq!(
                session.draft(),
                &draft_before,
                "draft drifted after reject at {state}"
            );
        }
    }

    #[test]
    fn repeated_rejection_is_idempotent() {
        let mut session = session_at(ConversationState::AskIncome);
        let first = session.submit("not telling").unwrap();
        for _ in 0..3 {
            let again = session.submit("not telling").unwrap();
            assert_eq!(again, first);
        }
        assert_eq!(session.state(), ConversationState::AskIncome);
        assert!(session.draft().monthly_income.is_none());
    }

    #[test]
    fn valid_input_advances_and_mutates_exactly_one_field() {
        let mut session = session_at(ConversationState::AskMarried);
        let before = session.draft().clone();

        let effect = session.submit("Yes").unwrap();
        assert!(matches!(effect, Effect::AdvanceAndPrompt { .. }));
        assert_eq!(session.state(), ConversationState::AskDependents);

        let after = session.draft();
        assert_eq!(after.married, Some(YesNo::Yes));
        // Nothing else moved
        assert_eq!(after.full_name, before.full_name);
        assert_eq!(after.gender, before.gender);
        assert_eq!(after.dependents, None);
    }

    #[test]
    fn free_text_fields_are_stored_verbatim() {
        let mut session = IntakeSession::new();
        session.submit("  Jane Doe  ").unwrap();
        assert_eq!(session.draft().full_name.as_deref(), Some("Jane Doe"));

        // Case-insensitive validation, verbatim storage.
        let effect = session.submit("fEmAlE").unwrap();
        assert!(matches!(effect, Effect::AdvanceAndPrompt { .. }));
        assert_eq!(session.draft().gender.as_deref(), Some("fEmAlE"));
    }

    #[test]
    fn name_advance_prompt_echoes_the_name() {
        let mut session = IntakeSession::new();
        match session.submit("Jane Doe").unwrap() {
            Effect::AdvanceAndPrompt { message } => {
                assert!(message.starts_with("Thank you, Jane Doe."));
                assert!(message.contains("gender"));
            }
            other => panic!("expected advance, got {other:?}"),
        }
    }

    #[test]
    fn income_normalizes_thousands_separators() {
        let mut session = session_at(ConversationState::AskIncome);
        session.submit("1,50,000").unwrap();
        assert_eq!(session.draft().monthly_income, Some(dec!(150000)));
    }

    #[test]
    fn credit_history_maps_to_flag() {
        let mut session = session_at(ConversationState::AskCreditHistory);
        session.submit("Yes").unwrap();
        assert_eq!(session.draft().credit_history, Some(1));

        let mut session = session_at(ConversationState::AskCreditHistory);
        session.submit("no").unwrap();
        assert_eq!(session.draft().credit_history, Some(0));
    }

    #[test]
    fn confirm_yes_requests_external_submission_without_touching_the_draft() {
        let mut session = session_at(ConversationState::ConfirmSubmit);
        let draft_before = session.draft().clone();

        let effect = session.submit("Yes").unwrap();
        assert!(matches!(effect, Effect::RequestExternalSubmission { .. }));
        assert_eq!(session.state(), ConversationState::AwaitingStatement);
        assert_eq!(session.draft(), &draft_before);
    }

    #[test]
    fn confirm_decline_resets_draft_and_restarts() {
        let mut session = session_at(ConversationState::ConfirmSubmit);

        let effect = session.submit("no thanks").unwrap();
        match effect {
            Effect::RestartAndPrompt { message } => {
                assert!(message.contains("start over"));
            }
            other => panic!("expected restart, got {other:?}"),
        }
        assert_eq!(session.state(), ConversationState::AskName);
        assert_eq!(session.draft(), &ApplicationDraft::default());
    }

    #[test]
    fn confirm_favors_yes_when_both_words_appear() {
        let mut session = session_at(ConversationState::ConfirmSubmit);
        let effect = session.submit("no, wait, yes").unwrap();
        assert!(matches!(effect, Effect::RequestExternalSubmission { .. }));
    }

    #[test]
    fn terminal_states_ignore_free_text() {
        let mut session = session_at(ConversationState::ConfirmSubmit);
        session.submit("Yes").unwrap();

        assert_eq!(session.submit("hello?"), None);
        assert_eq!(session.state(), ConversationState::AwaitingStatement);

        session.begin_submission().unwrap();
        assert_eq!(session.submit("anyone there?"), None);
        assert_eq!(session.state(), ConversationState::Submitting);
    }

    #[test]
    fn begin_submission_requires_awaiting_statement() {
        let mut session = IntakeSession::new();
        assert_eq!(
            session.begin_submission(),
            Err(NotAwaitingStatement(ConversationState::AskName))
        );

        let mut session = session_at(ConversationState::ConfirmSubmit);
        session.submit("yes").unwrap();
        assert_eq!(session.begin_submission(), Ok(()));
        assert_eq!(session.state(), ConversationState::Submitting);
        // Retrying after an external failure is allowed.
        assert_eq!(session.begin_submission(), Ok(()));
    }

    #[test]
    fn happy_path_yields_the_expected_draft() {
        let mut session = IntakeSession::new();
        let script = [
            "Jane Doe", "Female", "No", "2", "Graduate", "No", "55000", "0", "150", "360", "Yes",
            "Urban",
        ];
        for reply in script {
            let effect = session.submit(reply).unwrap();
            assert!(
                matches!(effect, Effect::AdvanceAndPrompt { .. }),
                "unexpected effect for {reply:?}: {effect:?}"
            );
        }

        let effect = session.submit("Yes").unwrap();
        assert!(matches!(effect, Effect::RequestExternalSubmission { .. }));

        let draft = session.draft();
        assert_eq!(draft.full_name.as_deref(), Some("Jane Doe"));
        assert_eq!(draft.gender.as_deref(), Some("Female"));
        assert_eq!(draft.married, Some(YesNo::No));
        assert_eq!(draft.dependents, Some(Dependents::Two));
        assert_eq!(draft.education, Some(Education::Graduate));
        assert_eq!(draft.self_employed, Some(YesNo::No));
        assert_eq!(draft.monthly_income, Some(dec!(55000)));
        assert_eq!(draft.coapplicant_income, Some(dec!(0)));
        assert_eq!(draft.loan_amount, Some(dec!(150)));
        assert_eq!(draft.loan_amount_term, Some(360));
        assert_eq!(draft.credit_history, Some(1));
        assert_eq!(draft.property_area.as_deref(), Some("Urban"));

        // The record is submission-ready.
        assert!(draft.to_payload().is_ok());
    }
}
