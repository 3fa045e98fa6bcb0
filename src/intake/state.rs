//! Intake state machine states — tracks which field is being collected.

use serde::{Deserialize, Serialize};

/// The states of the intake conversation.
///
/// Progresses linearly through one state per application field, then
/// `ConfirmSubmit → AwaitingStatement → Submitting`. The last two are
/// meta-states: the machine itself asks no question there and the next
/// transition is triggered by the UI layer (statement upload, submission).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationState {
    AskName,
    AskGender,
    AskMarried,
    AskDependents,
    AskEducation,
    AskSelfEmployed,
    AskIncome,
    AskCoapplicantIncome,
    AskLoanAmount,
    AskLoanTerm,
    AskCreditHistory,
    AskPropertyArea,
    ConfirmSubmit,
    AwaitingStatement,
    Submitting,
}

impl ConversationState {
    /// Check if a transition from `self` to `target` is valid.
    pub fn can_transition_to(&self, target: ConversationState) -> bool {
        use ConversationState::*;
        // ConfirmSubmit may also restart the whole dialogue.
        if *self == ConfirmSubmit && target == AskName {
            return true;
        }
        self.next() == Some(target)
    }

    /// Whether this state is terminal for the machine (the external layer
    /// owns whatever happens next).
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::AwaitingStatement | Self::Submitting)
    }

    /// Get the next state in the linear progression, if any.
    pub fn next(&self) -> Option<ConversationState> {
        use ConversationState::*;
        match self {
            AskName => Some(AskGender),
            AskGender => Some(AskMarried),
            AskMarried => Some(AskDependents),
            AskDependents => Some(AskEducation),
            AskEducation => Some(AskSelfEmployed),
            AskSelfEmployed => Some(AskIncome),
            AskIncome => Some(AskCoapplicantIncome),
            AskCoapplicantIncome => Some(AskLoanAmount),
            AskLoanAmount => Some(AskLoanTerm),
            AskLoanTerm => Some(AskCreditHistory),
            AskCreditHistory => Some(AskPropertyArea),
            AskPropertyArea => Some(ConfirmSubmit),
            ConfirmSubmit => Some(AwaitingStatement),
            AwaitingStatement => Some(Submitting),
            Submitting => None,
        }
    }

    /// The question the bot asks on entering this state, if it asks one.
    pub fn question(&self) -> Option<&'static str> {
        use ConversationState::*;
        match self {
            AskName => Some("What is your full name?"),
            AskGender => Some("What is your gender? (Male / Female / Other)"),
            AskMarried => Some("Are you married? (Yes / No)"),
            AskDependents => Some("How many dependents do you have? (0, 1, 2, or 3+)"),
            AskEducation => Some("What is your education level? (Graduate / Not Graduate)"),
            AskSelfEmployed => Some("Are you self-employed? (Yes / No)"),
            AskIncome => Some("What is your monthly income (e.g., 50000)?"),
            AskCoapplicantIncome => {
                Some("What is your co-applicant's monthly income? (Enter 0 if none)")
            }
            AskLoanAmount => {
                Some("How much loan are you requesting (in thousands, e.g., 150 for 1,50,000)?")
            }
            AskLoanTerm => Some("What is the loan term in months? (e.g., 360 for 30 years)"),
            AskCreditHistory => {
                Some("Have you met all your previous credit guidelines? (Yes / No)")
            }
            AskPropertyArea => {
                Some("In what type of area is the property located? (Urban / Semiurban / Rural)")
            }
            ConfirmSubmit => {
                Some("Thank you. I have all the details. Shall I submit your application now? (Yes / No)")
            }
            AwaitingStatement | Submitting => None,
        }
    }
}

impl Default for ConversationState {
    fn default() -> Self {
        Self::AskName
    }
}

impl std::fmt::Display for ConversationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::AskName => "ask_name",
            Self::AskGender => "ask_gender",
            Self::AskMarried => "ask_married",
            Self::AskDependents => "ask_dependents",
            Self::AskEducation => "ask_education",
            Self::AskSelfEmployed => "ask_self_employed",
            Self::AskIncome => "ask_income",
            Self::AskCoapplicantIncome => "ask_coapplicant_income",
            Self::AskLoanAmount => "ask_loan_amount",
            Self::AskLoanTerm => "ask_loan_term",
            Self::AskCreditHistory => "ask_credit_history",
            Self::AskPropertyArea => "ask_property_area",
            Self::ConfirmSubmit => "confirm_submit",
            Self::AwaitingStatement => "awaiting_statement",
            Self::Submitting => "submitting",
        };
        write!(f, "{s}")
    }
}
