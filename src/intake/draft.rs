//! The application record assembled by the intake dialogue.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A yes/no answer, stored the way the portal expects it on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum YesNo {
    Yes,
    No,
}

impl YesNo {
    /// The portal encodes credit history as a 1/0 flag.
    pub fn as_flag(&self) -> u8 {
        match self {
            Self::Yes => 1,
            Self::No => 0,
        }
    }
}

impl std::fmt::Display for YesNo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Yes => write!(f, "Yes"),
            Self::No => write!(f, "No"),
        }
    }
}

/// Number of dependents, one of the four portal buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Dependents {
    #[serde(rename = "0")]
    Zero,
    #[serde(rename = "1")]
    One,
    #[serde(rename = "2")]
    Two,
    #[serde(rename = "3+")]
    ThreePlus,
}

impl std::fmt::Display for Dependents {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Zero => write!(f, "0"),
            Self::One => write!(f, "1"),
            Self::Two => write!(f, "2"),
            Self::ThreePlus => write!(f, "3+"),
        }
    }
}

/// Education level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Education {
    Graduate,
    #[serde(rename = "Not Graduate")]
    NotGraduate,
}

impl std::fmt::Display for Education {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Graduate => write!(f, "Graduate"),
            Self::NotGraduate => write!(f, "Not Graduate"),
        }
    }
}

/// The in-progress application record.
///
/// Every field starts unset and is filled exactly once by a successful
/// validation at its corresponding state. Free-text fields (`full_name`,
/// `gender`, `property_area`) keep the applicant's verbatim input; validation
/// is case-insensitive but storage is not normalized.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApplicationDraft {
    pub full_name: Option<String>,
    pub gender: Option<String>,
    pub married: Option<YesNo>,
    pub dependents: Option<Dependents>,
    pub education: Option<Education>,
    pub self_employed: Option<YesNo>,
    pub monthly_income: Option<Decimal>,
    pub coapplicant_income: Option<Decimal>,
    pub loan_amount: Option<Decimal>,
    pub loan_amount_term: Option<u32>,
    pub credit_history: Option<u8>,
    pub property_area: Option<String>,
}

/// A draft field required for submission is still unset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Application field not yet collected: {0}")]
pub struct MissingField(pub &'static str);

/// The complete, submission-ready record.
///
/// Serialized field names match the portal's `app_data` schema exactly; money
/// fields go out as JSON numbers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationPayload {
    pub full_name: String,
    pub gender: String,
    pub married: YesNo,
    pub dependents: Dependents,
    pub education: Education,
    pub self_employed: YesNo,
    #[serde(with = "rust_decimal::serde::float")]
    pub monthly_income: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub coapplicant_income: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub loan_amount: Decimal,
    pub loan_amount_term: u32,
    pub credit_history: u8,
    pub property_area: String,
}

impl ApplicationDraft {
    /// Reset every field, discarding whatever has been collected so far.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Convert into the flat submission payload.
    ///
    /// Fails with the first unset field — the machine only reaches
    /// `AwaitingStatement` once all fields are present, so a failure here
    /// means the caller skipped the dialogue.
    pub fn to_payload(&self) -> Result<ApplicationPayload, MissingField> {
        Ok(ApplicationPayload {
            full_name: self.full_name.clone().ok_or(MissingField("full_name"))?,
            gender: self.gender.clone().ok_or(MissingField("gender"))?,
            married: self.married.ok_or(MissingField("married"))?,
            dependents: self.dependents.ok_or(MissingField("dependents"))?,
            education: self.education.ok_or(MissingField("education"))?,
            self_employed: self.self_employed.ok_or(MissingField("self_employed"))?,
            monthly_income: self.monthly_income.ok_or(MissingField("monthly_income"))?,
            coapplicant_income: self
                .coapplicant_income
                .ok_or(MissingField("coapplicant_income"))?,
            loan_amount: self.loan_amount.ok_or(MissingField("loan_amount"))?,
            loan_amount_term: self
                .loan_amount_term
                .ok_or(MissingField("loan_amount_term"))?,
            credit_history: self.credit_history.ok_or(MissingField("credit_history"))?,
            property_area: self
                .property_area
                .clone()
                .ok_or(MissingField("property_area"))?,
        })
    }
}
