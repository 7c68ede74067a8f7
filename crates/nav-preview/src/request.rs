//! Normalized calculator request
//!
//! Built deterministically from a `TrackedInputSet`: the same inputs
//! always produce the same request and the same cache key. Dependent
//! ages are taken on December 31 of the tax year, never on "today".

use crate::error::{PreviewError, PreviewResult};
use crate::inputs::{MaritalStatus, TrackedInputSet};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Supported tax years
pub const TAX_YEAR_RANGE: std::ops::RangeInclusive<i32> = 2000..=2100;

/// Child tax credit: under this age at year end
const CTC_AGE_LIMIT: u32 = 17;
/// Earned income credit: under this age, or student under `EITC_STUDENT_AGE_LIMIT`
const EITC_AGE_LIMIT: u32 = 19;
const EITC_STUDENT_AGE_LIMIT: u32 = 24;

/// Income totals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomeSummary {
    /// Wages
    pub employment: f64,
    /// Net self-employment income
    pub self_employment: f64,
    /// Other income
    pub other: f64,
    /// Sum of the above
    pub total: f64,
}

/// Dependent facts relevant to credits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependentFacts {
    /// Age on December 31 of the tax year
    pub age: u32,
    /// Full-time student
    pub is_student: bool,
    /// Disabled
    pub is_disabled: bool,
}

impl DependentFacts {
    fn qualifies_for_ctc(self) -> bool {
        self.age < CTC_AGE_LIMIT
    }

    fn qualifies_for_eitc(self) -> bool {
        self.age < EITC_AGE_LIMIT
            || (self.is_student && self.age < EITC_STUDENT_AGE_LIMIT)
            || self.is_disabled
    }
}

/// Request body sent to the calculation service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EstimateRequest {
    /// Tax year
    pub tax_year: i32,
    /// Filing status
    pub filing_status: MaritalStatus,
    /// People in the tax household
    pub household_size: u32,
    /// County of residence
    pub county: Option<String>,
    /// Income totals
    pub income: IncomeSummary,
    /// Dependents born on or before year end
    pub dependents: Vec<DependentFacts>,
    /// Dependents qualifying for the child tax credit
    pub ctc_qualifying_children: u32,
    /// Dependents qualifying for the earned income credit
    pub eitc_qualifying_children: u32,
    /// Filer is blind
    pub is_blind: bool,
    /// Filer is disabled
    pub is_disabled: bool,
}

impl EstimateRequest {
    /// Normalize caller inputs.
    ///
    /// A missing marital status is treated as single; whether one is
    /// required at all is decided by the controller's configuration.
    ///
    /// # Errors
    /// - `PreviewError::InvalidInput` for a tax year outside
    ///   `TAX_YEAR_RANGE`, a non-finite amount, or a negative wage
    pub fn from_inputs(inputs: &TrackedInputSet) -> PreviewResult<Self> {
        if !TAX_YEAR_RANGE.contains(&inputs.tax_year) {
            return Err(PreviewError::invalid_input(format!(
                "tax year {} is not supported",
                inputs.tax_year
            )));
        }
        let year_end = NaiveDate::from_ymd_opt(inputs.tax_year, 12, 31).ok_or_else(|| {
            PreviewError::invalid_input(format!("no year end for {}", inputs.tax_year))
        })?;

        let employment = amount("employment income", inputs.employment_income)?;
        let self_employment = amount("self-employment income", inputs.self_employment_income)?;
        let other = amount("other income", inputs.other_income)?;
        if employment < 0.0 {
            return Err(PreviewError::invalid_input("employment income is negative"));
        }

        let dependents: Vec<DependentFacts> = inputs
            .dependents
            .iter()
            .filter_map(|d| {
                age_on(d.date_of_birth, year_end).map(|age| DependentFacts {
                    age,
                    is_student: d.is_student,
                    is_disabled: d.is_disabled,
                })
            })
            .collect();

        let filing_status = inputs.marital_status.unwrap_or(MaritalStatus::Single);
        let derived_size = 1 + u32::from(filing_status.has_spouse()) + count(&dependents, |_| true);
        let household_size = inputs
            .household_size
            .map_or(derived_size, u32::from)
            .max(1);

        Ok(Self {
            tax_year: inputs.tax_year,
            filing_status,
            household_size,
            county: inputs
                .county
                .as_deref()
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_string),
            income: IncomeSummary {
                employment,
                self_employment,
                other,
                total: employment + self_employment + other,
            },
            ctc_qualifying_children: count(&dependents, |d| d.qualifies_for_ctc()),
            eitc_qualifying_children: count(&dependents, |d| d.qualifies_for_eitc()),
            dependents,
            is_blind: inputs.is_blind,
            is_disabled: inputs.is_disabled,
        })
    }

    /// Stable key identifying this request, for memoizing responses
    #[must_use]
    pub fn cache_key(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&self.tax_year.to_le_bytes());
        hasher.update(self.filing_status.as_str().as_bytes());
        hasher.update(&[0]);
        hasher.update(&self.household_size.to_le_bytes());
        hasher.update(self.county.as_deref().unwrap_or_default().as_bytes());
        hasher.update(&[0]);
        for value in [
            self.income.employment,
            self.income.self_employment,
            self.income.other,
        ] {
            hasher.update(&value.to_bits().to_le_bytes());
        }
        hasher.update(&(self.dependents.len() as u64).to_le_bytes());
        for d in &self.dependents {
            hasher.update(&d.age.to_le_bytes());
            hasher.update(&[u8::from(d.is_student), u8::from(d.is_disabled)]);
        }
        hasher.update(&[u8::from(self.is_blind), u8::from(self.is_disabled)]);
        format!("estimate:{}", hasher.finalize().to_hex())
    }
}

fn amount(name: &str, value: Option<f64>) -> PreviewResult<f64> {
    let value = value.unwrap_or(0.0);
    if value.is_finite() {
        Ok(value)
    } else {
        Err(PreviewError::invalid_input(format!("{name} is not a finite number")))
    }
}

fn count(dependents: &[DependentFacts], pred: impl Fn(DependentFacts) -> bool) -> u32 {
    let n = dependents.iter().filter(|d| pred(**d)).count();
    u32::try_from(n).unwrap_or(u32::MAX)
}

/// Whole years between `dob` and `on`; `None` if born after `on`
fn age_on(dob: NaiveDate, on: NaiveDate) -> Option<u32> {
    if dob > on {
        return None;
    }
    let mut age = on.year() - dob.year();
    if (on.month(), on.day()) < (dob.month(), dob.day()) {
        age -= 1;
    }
    u32::try_from(age).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inputs::Dependent;

    fn dob(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn ages_taken_at_year_end() {
        let inputs = TrackedInputSet::new()
            .with_tax_year(2024)
            .with_marital_status(MaritalStatus::Married)
            .with_dependent(Dependent::born(dob(2008, 1, 1)))
            .with_dependent(Dependent::born(dob(2007, 12, 31)))
            .with_dependent(Dependent::born(dob(2025, 2, 1)));

        let request = EstimateRequest::from_inputs(&inputs).unwrap();
        let ages: Vec<u32> = request.dependents.iter().map(|d| d.age).collect();
        assert_eq!(ages, vec![16, 17]);
        assert_eq!(request.ctc_qualifying_children, 1);
        assert_eq!(request.eitc_qualifying_children, 2);
        assert_eq!(request.household_size, 4);
    }

    #[test]
    fn students_and_disabled_extend_eitc() {
        let inputs = TrackedInputSet::new()
            .with_marital_status(MaritalStatus::HeadOfHousehold)
            .with_dependent(Dependent::born(dob(2002, 5, 5)).student())
            .with_dependent(Dependent::born(dob(1990, 5, 5)).disabled())
            .with_dependent(Dependent::born(dob(1999, 5, 5)).student());

        let request = EstimateRequest::from_inputs(&inputs).unwrap();
        assert_eq!(request.eitc_qualifying_children, 2);
        assert_eq!(request.ctc_qualifying_children, 0);
    }

    #[test]
    fn explicit_household_size_wins() {
        let mut inputs = TrackedInputSet::new().with_marital_status(MaritalStatus::Single);
        inputs.household_size = Some(5);

        let request = EstimateRequest::from_inputs(&inputs).unwrap();
        assert_eq!(request.household_size, 5);
    }

    #[test]
    fn incomes_summed_and_county_trimmed() {
        let inputs = TrackedInputSet::new()
            .with_employment_income(30_000.0)
            .with_self_employment_income(-2_000.0)
            .with_county("  Howard ");

        let request = EstimateRequest::from_inputs(&inputs).unwrap();
        assert!((request.income.total - 28_000.0).abs() < 1e-9);
        assert_eq!(request.county.as_deref(), Some("Howard"));
        assert_eq!(request.filing_status, MaritalStatus::Single);
    }

    #[test]
    fn rejects_bad_amounts_and_years() {
        let inputs = TrackedInputSet::new().with_employment_income(f64::NAN);
        assert!(matches!(
            EstimateRequest::from_inputs(&inputs),
            Err(PreviewError::InvalidInput(_))
        ));

        let inputs = TrackedInputSet::new().with_employment_income(-1.0);
        assert!(EstimateRequest::from_inputs(&inputs).is_err());

        let inputs = TrackedInputSet::new().with_tax_year(1850);
        assert!(EstimateRequest::from_inputs(&inputs).is_err());
    }

    #[test]
    fn cache_key_is_deterministic() {
        let inputs = TrackedInputSet::new()
            .with_marital_status(MaritalStatus::Married)
            .with_employment_income(50_000.0);
        let a = EstimateRequest::from_inputs(&inputs).unwrap();
        let b = EstimateRequest::from_inputs(&inputs.clone()).unwrap();
        assert_eq!(a.cache_key(), b.cache_key());

        let c = EstimateRequest::from_inputs(&inputs.with_employment_income(50_001.0)).unwrap();
        assert_ne!(a.cache_key(), c.cache_key());
        assert!(a.cache_key().starts_with("estimate:"));
    }
}
