//! Academic terms and the results-upload filename check.
//!
//! A term value looks like `E2_S1`: a year token (`PUC1`, `PUC2`, `E1`..`E4`)
//! and a semester token (`S1`, `S2`). A results file must carry both tokens
//! in its name; the semester may also be spelled `SEM1`.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::file_check::ValidationError;
use crate::error::CoreError;

/// Pre-university years.
const PUC_YEARS: u8 = 2;

/// Engineering years.
const ENGINEERING_YEARS: u8 = 4;

const SEMESTERS_PER_YEAR: u8 = 2;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AcademicTerm {
    year: String,
    semester: u8,
}

impl AcademicTerm {
    /// Every selectable term, pre-university years first.
    pub fn all() -> Vec<AcademicTerm> {
        let puc = (1..=PUC_YEARS).map(|p| format!("PUC{p}"));
        let eng = (1..=ENGINEERING_YEARS).map(|e| format!("E{e}"));
        puc.chain(eng)
            .flat_map(|year| {
                (1..=SEMESTERS_PER_YEAR).map(move |semester| AcademicTerm {
                    year: year.clone(),
                    semester,
                })
            })
            .collect()
    }

    /// Year token, e.g. `E2`.
    pub fn year_token(&self) -> &str {
        &self.year
    }

    /// Semester token, e.g. `S1`.
    pub fn semester_token(&self) -> String {
        format!("S{}", self.semester)
    }

    /// Wire value sent as `year_sem`, e.g. `E2_S1`.
    pub fn value(&self) -> String {
        format!("{}_{}", self.year, self.semester_token())
    }

    /// Short label used in messages, e.g. `E2 S1`.
    pub fn label(&self) -> String {
        format!("{} {}", self.year, self.semester_token())
    }

    /// Menu label, e.g. `E-2 Semester 1`.
    pub fn menu_label(&self) -> String {
        let (prefix, number) = self.year.split_at(self.year.len() - 1);
        format!("{prefix}-{number} Semester {}", self.semester)
    }

    /// Check that a results filename belongs to this term.
    pub fn check_filename(&self, file_name: &str) -> Result<(), ValidationError> {
        let upper = file_name.to_uppercase();
        let semester = self.semester_token();
        let semester_long = format!("SEM{}", self.semester);

        let has_year = upper.contains(&self.year);
        let has_semester = upper.contains(&semester) || upper.contains(&semester_long);

        if has_year && has_semester {
            Ok(())
        } else {
            Err(ValidationError::FilenameMismatch {
                file_name: file_name.to_string(),
                term_label: self.label(),
                year_token: self.year.clone(),
                semester_token: semester,
            })
        }
    }
}

impl FromStr for AcademicTerm {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CoreError::Validation(format!("Unknown academic term '{s}'"));
        let upper = s.trim().to_uppercase();
        let (year, semester) = upper.split_once('_').ok_or_else(invalid)?;
        let semester: u8 = semester
            .strip_prefix('S')
            .and_then(|n| n.parse().ok())
            .ok_or_else(invalid)?;

        let term = AcademicTerm {
            year: year.to_string(),
            semester,
        };
        if Self::all().contains(&term) {
            Ok(term)
        } else {
            Err(invalid())
        }
    }
}

impl TryFrom<String> for AcademicTerm {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<AcademicTerm> for String {
    fn from(term: AcademicTerm) -> Self {
        term.value()
    }
}

impl std::fmt::Display for AcademicTerm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.value())
    }
}
