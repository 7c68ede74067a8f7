//! Household inputs tracked by the preview
//!
//! `TrackedInputSet` is the caller-owned form state. Two sets compare
//! equal field by field, and that equality decides whether a new
//! computation is needed.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Marital / filing status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaritalStatus {
    /// Unmarried, no qualifying person
    Single,
    /// Married filing jointly
    Married,
    /// Married filing separately
    MarriedSeparately,
    /// Unmarried with a qualifying person
    HeadOfHousehold,
    /// Surviving spouse with a dependent child
    Widowed,
}

impl MaritalStatus {
    /// Stable identifier used in requests and hashing
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Single => "single",
            Self::Married => "married",
            Self::MarriedSeparately => "married_separately",
            Self::HeadOfHousehold => "head_of_household",
            Self::Widowed => "widowed",
        }
    }

    /// Whether a spouse is part of the tax household
    #[inline]
    #[must_use]
    pub fn has_spouse(self) -> bool {
        matches!(self, Self::Married)
    }
}

impl fmt::Display for MaritalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A dependent claimed by the household
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dependent {
    /// Date of birth
    pub date_of_birth: NaiveDate,
    /// Full-time student
    #[serde(default)]
    pub is_student: bool,
    /// Permanently and totally disabled
    #[serde(default)]
    pub is_disabled: bool,
}

impl Dependent {
    /// Dependent born on `date_of_birth`
    #[must_use]
    pub fn born(date_of_birth: NaiveDate) -> Self {
        Self {
            date_of_birth,
            is_student: false,
            is_disabled: false,
        }
    }

    /// Mark as full-time student
    #[must_use]
    pub fn student(mut self) -> Self {
        self.is_student = true;
        self
    }

    /// Mark as disabled
    #[must_use]
    pub fn disabled(mut self) -> Self {
        self.is_disabled = true;
        self
    }
}

/// Default tax year for new input sets
pub const DEFAULT_TAX_YEAR: i32 = 2024;

/// Caller-edited household facts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TrackedInputSet {
    /// Tax year being estimated
    pub tax_year: i32,
    /// Marital / filing status
    pub marital_status: Option<MaritalStatus>,
    /// Annual wages
    pub employment_income: Option<f64>,
    /// Annual net self-employment income
    pub self_employment_income: Option<f64>,
    /// Other taxable income (unemployment, interest)
    pub other_income: Option<f64>,
    /// County of residence
    pub county: Option<String>,
    /// Household size, when stated explicitly
    pub household_size: Option<u8>,
    /// Filer is blind
    pub is_blind: bool,
    /// Filer is disabled
    pub is_disabled: bool,
    /// Claimed dependents
    pub dependents: Vec<Dependent>,
}

impl Default for TrackedInputSet {
    fn default() -> Self {
        Self {
            tax_year: DEFAULT_TAX_YEAR,
            marital_status: None,
            employment_income: None,
            self_employment_income: None,
            other_income: None,
            county: None,
            household_size: None,
            is_blind: false,
            is_disabled: false,
            dependents: Vec::new(),
        }
    }
}

impl TrackedInputSet {
    /// Empty input set for the default tax year
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With marital status
    #[must_use]
    pub fn with_marital_status(mut self, status: MaritalStatus) -> Self {
        self.marital_status = Some(status);
        self
    }

    /// With wages
    #[must_use]
    pub fn with_employment_income(mut self, amount: f64) -> Self {
        self.employment_income = Some(amount);
        self
    }

    /// With self-employment income
    #[must_use]
    pub fn with_self_employment_income(mut self, amount: f64) -> Self {
        self.self_employment_income = Some(amount);
        self
    }

    /// With county
    #[must_use]
    pub fn with_county(mut self, county: impl Into<String>) -> Self {
        self.county = Some(county.into());
        self
    }

    /// With tax year
    #[must_use]
    pub fn with_tax_year(mut self, year: i32) -> Self {
        self.tax_year = year;
        self
    }

    /// With an additional dependent
    #[must_use]
    pub fn with_dependent(mut self, dependent: Dependent) -> Self {
        self.dependents.push(dependent);
        self
    }

    /// Field values in declaration order
    #[must_use]
    pub fn field_values(&self) -> Vec<(InputField, FieldValue)> {
        vec![
            (InputField::TaxYear, FieldValue::Number(f64::from(self.tax_year))),
            (
                InputField::MaritalStatus,
                self.marital_status
                    .map_or(FieldValue::Unset, |s| FieldValue::Choice(s.as_str())),
            ),
            (
                InputField::EmploymentIncome,
                FieldValue::amount(self.employment_income),
            ),
            (
                InputField::SelfEmploymentIncome,
                FieldValue::amount(self.self_employment_income),
            ),
            (InputField::OtherIncome, FieldValue::amount(self.other_income)),
            (
                InputField::County,
                self.county
                    .clone()
                    .map_or(FieldValue::Unset, FieldValue::Text),
            ),
            (
                InputField::HouseholdSize,
                self.household_size
                    .map_or(FieldValue::Unset, |n| FieldValue::Number(f64::from(n))),
            ),
            (InputField::IsBlind, FieldValue::Flag(self.is_blind)),
            (InputField::IsDisabled, FieldValue::Flag(self.is_disabled)),
            (
                InputField::Dependents,
                FieldValue::Dependents(self.dependents.clone()),
            ),
        ]
    }

    /// Fields whose values differ from `other`
    #[must_use]
    pub fn changed_fields(&self, other: &Self) -> Vec<InputField> {
        self.field_values()
            .into_iter()
            .zip(other.field_values())
            .filter(|((_, a), (_, b))| a != b)
            .map(|((field, _), _)| field)
            .collect()
    }
}

/// Named input field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputField {
    /// Tax year
    TaxYear,
    /// Marital / filing status
    MaritalStatus,
    /// Wages
    EmploymentIncome,
    /// Self-employment income
    SelfEmploymentIncome,
    /// Other income
    OtherIncome,
    /// County
    County,
    /// Explicit household size
    HouseholdSize,
    /// Blind flag
    IsBlind,
    /// Disabled flag
    IsDisabled,
    /// At least one dependent
    Dependents,
}

impl InputField {
    /// Whether the field carries a value in `inputs`.
    ///
    /// Flags and the tax year always count as present.
    #[must_use]
    pub fn is_present(self, inputs: &TrackedInputSet) -> bool {
        match self {
            Self::TaxYear | Self::IsBlind | Self::IsDisabled => true,
            Self::MaritalStatus => inputs.marital_status.is_some(),
            Self::EmploymentIncome => inputs.employment_income.is_some(),
            Self::SelfEmploymentIncome => inputs.self_employment_income.is_some(),
            Self::OtherIncome => inputs.other_income.is_some(),
            Self::County => inputs
                .county
                .as_deref()
                .is_some_and(|c| !c.trim().is_empty()),
            Self::HouseholdSize => inputs.household_size.is_some(),
            Self::Dependents => !inputs.dependents.is_empty(),
        }
    }
}

/// Value of a single field, for comparison and logging
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// No value entered
    Unset,
    /// Boolean flag
    Flag(bool),
    /// Numeric amount or count
    Number(f64),
    /// One of a fixed set of options
    Choice(&'static str),
    /// Free text
    Text(String),
    /// Dependents list
    Dependents(Vec<Dependent>),
}

impl FieldValue {
    fn amount(value: Option<f64>) -> Self {
        value.map_or(Self::Unset, Self::Number)
    }
}
