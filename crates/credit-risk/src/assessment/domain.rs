use std::fmt;

use serde::{Deserialize, Serialize};

/// A categorical applicant attribute that the prediction service consumes one-hot encoded.
pub trait Categorical {
    /// Name of the raw form field carrying this dimension.
    const FIELD: &'static str;
    /// Every indicator key the service expects for this dimension, in a fixed order.
    const INDICATORS: &'static [&'static str];

    /// Indicator key for the selected value, `None` when the raw value matched no label.
    fn indicator(&self) -> Option<&'static str>;
}

/// Highest completed education level.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Education {
    HighSchool,
    Bachelor,
    Master,
    PhD,
    /// Raw form value that matched none of the known labels.
    Unrecognized(String),
}

impl Education {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "HighSchool" => Self::HighSchool,
            "Bachelor" => Self::Bachelor,
            "Master" => Self::Master,
            "PhD" => Self::PhD,
            other => Self::Unrecognized(other.to_string()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Self::HighSchool => "HighSchool",
            Self::Bachelor => "Bachelor",
            Self::Master => "Master",
            Self::PhD => "PhD",
            Self::Unrecognized(raw) => raw,
        }
    }
}

impl Categorical for Education {
    const FIELD: &'static str = "education";
    const INDICATORS: &'static [&'static str] = &[
        "education_highschool",
        "education_bachelor",
        "education_master",
        "education_phd",
    ];

    fn indicator(&self) -> Option<&'static str> {
        match self {
            Self::HighSchool => Some("education_highschool"),
            Self::Bachelor => Some("education_bachelor"),
            Self::Master => Some("education_master"),
            Self::PhD => Some("education_phd"),
            Self::Unrecognized(_) => None,
        }
    }
}

impl From<String> for Education {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<Education> for String {
    fn from(value: Education) -> Self {
        value.label().to_string()
    }
}

/// Employment arrangement at the time of application.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EmploymentType {
    FullTime,
    PartTime,
    SelfEmployed,
    Unemployed,
    Unrecognized(String),
}

impl EmploymentType {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "FullTime" => Self::FullTime,
            "PartTime" => Self::PartTime,
            "SelfEmployed" => Self::SelfEmployed,
            "Unemployed" => Self::Unemployed,
            other => Self::Unrecognized(other.to_string()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Self::FullTime => "FullTime",
            Self::PartTime => "PartTime",
            Self::SelfEmployed => "SelfEmployed",
            Self::Unemployed => "Unemployed",
            Self::Unrecognized(raw) => raw,
        }
    }
}

impl Categorical for EmploymentType {
    const FIELD: &'static str = "employment_type";
    const INDICATORS: &'static [&'static str] = &[
        "employment_type_fulltime",
        "employment_type_parttime",
        "employment_type_selfemployed",
        "employment_type_unemployed",
    ];

    fn indicator(&self) -> Option<&'static str> {
        match self {
            Self::FullTime => Some("employment_type_fulltime"),
            Self::PartTime => Some("employment_type_parttime"),
            Self::SelfEmployed => Some("employment_type_selfemployed"),
            Self::Unemployed => Some("employment_type_unemployed"),
            Self::Unrecognized(_) => None,
        }
    }
}

impl From<String> for EmploymentType {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<EmploymentType> for String {
    fn from(value: EmploymentType) -> Self {
        value.label().to_string()
    }
}

/// Marital status. `Divorced` is emitted like the others even though the service schema
/// defaults it, so the feature vector keeps a fixed width.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MaritalStatus {
    Single,
    Married,
    Divorced,
    Unrecognized(String),
}

impl MaritalStatus {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "Single" => Self::Single,
            "Married" => Self::Married,
            "Divorced" => Self::Divorced,
            other => Self::Unrecognized(other.to_string()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Self::Single => "Single",
            Self::Married => "Married",
            Self::Divorced => "Divorced",
            Self::Unrecognized(raw) => raw,
        }
    }
}

impl Categorical for MaritalStatus {
    const FIELD: &'static str = "marital_status";
    const INDICATORS: &'static [&'static str] = &[
        "marital_status_married",
        "marital_status_single",
        "marital_status_divorced",
    ];

    fn indicator(&self) -> Option<&'static str> {
        match self {
            Self::Married => Some("marital_status_married"),
            Self::Single => Some("marital_status_single"),
            Self::Divorced => Some("marital_status_divorced"),
            Self::Unrecognized(_) => None,
        }
    }
}

impl From<String> for MaritalStatus {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<MaritalStatus> for String {
    fn from(value: MaritalStatus) -> Self {
        value.label().to_string()
    }
}

/// Numeric applicant attributes addressable by their wire key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumericField {
    Age,
    Income,
    LoanAmount,
    CreditScore,
    MonthsEmployed,
    NumCreditLines,
    InterestRate,
    LoanTerm,
    DtiRatio,
}

impl NumericField {
    pub const ALL: [NumericField; 9] = [
        NumericField::Age,
        NumericField::Income,
        NumericField::LoanAmount,
        NumericField::CreditScore,
        NumericField::MonthsEmployed,
        NumericField::NumCreditLines,
        NumericField::InterestRate,
        NumericField::LoanTerm,
        NumericField::DtiRatio,
    ];

    pub const fn key(self) -> &'static str {
        match self {
            NumericField::Age => "age",
            NumericField::Income => "income",
            NumericField::LoanAmount => "loan_amount",
            NumericField::CreditScore => "credit_score",
            NumericField::MonthsEmployed => "months_employed",
            NumericField::NumCreditLines => "num_credit_lines",
            NumericField::InterestRate => "interest_rate",
            NumericField::LoanTerm => "loan_term",
            NumericField::DtiRatio => "dti_ratio",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.key() == key)
    }
}

impl fmt::Display for NumericField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Applicant description as captured by the assessment form.
///
/// Numeric fields are finite by construction: raw input is coerced at the form boundary
/// (see [`super::form::RawInput::coerce`]) before a profile is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicantProfile {
    pub age: f64,
    pub income: f64,
    pub loan_amount: f64,
    pub credit_score: f64,
    pub months_employed: f64,
    pub num_credit_lines: f64,
    pub interest_rate: f64,
    pub loan_term: f64,
    pub dti_ratio: f64,
    pub education: Education,
    pub employment_type: EmploymentType,
    pub marital_status: MaritalStatus,
}

impl ApplicantProfile {
    pub fn numeric(&self, field: NumericField) -> f64 {
        match field {
            NumericField::Age => self.age,
            NumericField::Income => self.income,
            NumericField::LoanAmount => self.loan_amount,
            NumericField::CreditScore => self.credit_score,
            NumericField::MonthsEmployed => self.months_employed,
            NumericField::NumCreditLines => self.num_credit_lines,
            NumericField::InterestRate => self.interest_rate,
            NumericField::LoanTerm => self.loan_term,
            NumericField::DtiRatio => self.dti_ratio,
        }
    }

    pub fn set_numeric(&mut self, field: NumericField, value: f64) {
        let slot = match field {
            NumericField::Age => &mut self.age,
            NumericField::Income => &mut self.income,
            NumericField::LoanAmount => &mut self.loan_amount,
            NumericField::CreditScore => &mut self.credit_score,
            NumericField::MonthsEmployed => &mut self.months_employed,
            NumericField::NumCreditLines => &mut self.num_credit_lines,
            NumericField::InterestRate => &mut self.interest_rate,
            NumericField::LoanTerm => &mut self.loan_term,
            NumericField::DtiRatio => &mut self.dti_ratio,
        };
        *slot = value;
    }
}

impl Default for ApplicantProfile {
    /// Initial state of the assessment form.
    fn default() -> Self {
        Self {
            age: 30.0,
            income: 50_000.0,
            loan_amount: 10_000.0,
            credit_score: 650.0,
            months_employed: 24.0,
            num_credit_lines: 5.0,
            interest_rate: 10.0,
            loan_term: 36.0,
            dti_ratio: 0.3,
            education: Education::Bachelor,
            employment_type: EmploymentType::FullTime,
            marital_status: MaritalStatus::Single,
        }
    }
}
