//! Data models for the gradebook.
//!
//! This module contains the records kept by the student store and the
//! value objects produced by grading.

use crate::grading::aggregator::{PERCENT_ROUNDING, PERCENT_SCALE};
use crate::grading::GradeThresholds;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Letter grade derived from a final percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LetterGrade {
    F,
    D,
    C,
    B,
    A,
}

impl LetterGrade {
    /// All letters, best first.
    pub const ALL: [LetterGrade; 5] = [
        LetterGrade::A,
        LetterGrade::B,
        LetterGrade::C,
        LetterGrade::D,
        LetterGrade::F,
    ];

    /// Returns the letter as a static string.
    pub fn as_str(&self) -> &'static str {
        match self {
            LetterGrade::A => "A",
            LetterGrade::B => "B",
            LetterGrade::C => "C",
            LetterGrade::D => "D",
            LetterGrade::F => "F",
        }
    }
}

impl fmt::Display for LetterGrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LetterGrade {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "A" => Ok(LetterGrade::A),
            "B" => Ok(LetterGrade::B),
            "C" => Ok(LetterGrade::C),
            "D" => Ok(LetterGrade::D),
            "F" => Ok(LetterGrade::F),
            other => Err(format!("unknown letter grade: {}", other)),
        }
    }
}

/// Scoring parameters of a gradable exam.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exam {
    /// Unique exam identifier.
    pub id: Uuid,
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Maximum achievable score. Exams with a non-positive maximum are not scored.
    pub max_score: Decimal,
    /// Relative weight of the exam in the final percentage.
    pub weight: Decimal,
}

/// One student's raw score on one exam.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExamResult {
    pub id: Uuid,
    pub student_id: Uuid,
    pub exam_id: Uuid,
    /// Raw score as entered; may fall outside `[0, max_score]`.
    pub score: Decimal,
}

/// A student's contact and enrollment details.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Student {
    pub id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub student_no: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

impl Student {
    /// Returns "First Last", falling back to the student number or id.
    pub fn display_name(&self) -> String {
        let parts: Vec<&str> = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .filter(|p| !p.is_empty())
            .collect();

        if !parts.is_empty() {
            parts.join(" ")
        } else if let Some(ref no) = self.student_no {
            no.clone()
        } else {
            self.id.to_string()
        }
    }
}

/// Fields accepted when enrolling a new student; the id is assigned by the store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewStudent {
    pub student_no: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// Fields accepted when defining a new exam.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewExam {
    pub name: Option<String>,
    pub max_score: Decimal,
    pub weight: Decimal,
}

/// An exam result paired with the exam it was scored against.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedResult {
    pub result: ExamResult,
    pub exam: Exam,
}

/// A student with its results and their exams eagerly loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct StudentRecord {
    pub student: Student,
    pub results: Vec<LoadedResult>,
}

impl StudentRecord {
    /// The student's raw results.
    pub fn exam_results(&self) -> Vec<ExamResult> {
        self.results.iter().map(|r| r.result.clone()).collect()
    }

    /// The distinct exams referenced by the student's results.
    pub fn exams(&self) -> Vec<Exam> {
        let mut exams: Vec<Exam> = Vec::new();
        for loaded in &self.results {
            if !exams.iter().any(|e| e.id == loaded.exam.id) {
                exams.push(loaded.exam.clone());
            }
        }
        exams
    }
}

/// Computed grade. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grade {
    /// Final weighted percentage, rounded to two decimal places.
    pub final_percent: Decimal,
    pub letter: LetterGrade,
}

impl Grade {
    /// The grade of a student with nothing to grade.
    pub fn zero() -> Self {
        Self {
            final_percent: Decimal::ZERO,
            letter: LetterGrade::F,
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}% ({})", self.final_percent, self.letter)
    }
}

/// A student together with their current grade.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentGrade {
    pub student: Student,
    pub grade: Grade,
    /// Number of results that counted toward the grade.
    pub graded_results: usize,
}

/// Domain events raised by student lifecycle operations.
#[derive(Debug, Clone, PartialEq)]
pub enum StudentEvent {
    Created(Student),
    Updated(Student),
    Deleted(Student),
    GradeChanged {
        student: Student,
        old: Grade,
        new: Grade,
    },
}

impl StudentEvent {
    /// The student the event concerns.
    pub fn student(&self) -> &Student {
        match self {
            StudentEvent::Created(s) | StudentEvent::Updated(s) | StudentEvent::Deleted(s) => s,
            StudentEvent::GradeChanged { student, .. } => student,
        }
    }

    /// Short event name for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            StudentEvent::Created(_) => "created",
            StudentEvent::Updated(_) => "updated",
            StudentEvent::Deleted(_) => "deleted",
            StudentEvent::GradeChanged { .. } => "grade_changed",
        }
    }
}

/// Grade distribution across a set of students.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GradeSummary {
    /// Number of students graded.
    pub total: usize,
    /// Students per letter grade.
    pub by_letter: BTreeMap<LetterGrade, usize>,
    /// Mean final percentage, rounded like individual grades.
    pub mean_percent: Option<Decimal>,
    pub highest_percent: Option<Decimal>,
    pub lowest_percent: Option<Decimal>,
}

impl GradeSummary {
    /// Creates a summary from graded students.
    pub fn from_grades(grades: &[StudentGrade]) -> Self {
        let mut summary = Self {
            total: grades.len(),
            ..Self::default()
        };

        for letter in LetterGrade::ALL {
            summary.by_letter.insert(letter, 0);
        }

        let mut sum = Decimal::ZERO;
        for graded in grades {
            *summary.by_letter.entry(graded.grade.letter).or_insert(0) += 1;

            let percent = graded.grade.final_percent;
            sum += percent;
            summary.highest_percent =
                Some(summary.highest_percent.map_or(percent, |p| p.max(percent)));
            summary.lowest_percent =
                Some(summary.lowest_percent.map_or(percent, |p| p.min(percent)));
        }

        if !grades.is_empty() {
            summary.mean_percent = Some(
                (sum / Decimal::from(grades.len()))
                    .round_dp_with_strategy(PERCENT_SCALE, PERCENT_ROUNDING),
            );
        }

        summary
    }

    /// Number of students with the given letter.
    pub fn count(&self, letter: LetterGrade) -> usize {
        self.by_letter.get(&letter).copied().unwrap_or(0)
    }
}

/// Metadata about a grade report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// Data file the students were read from.
    pub data_file: String,
    /// Date and time the report was generated.
    pub generated_at: DateTime<Utc>,
    /// Thresholds used for letter grades.
    pub thresholds: GradeThresholds,
    /// Number of students in the report.
    pub students_reported: usize,
}

/// A complete grade report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradeReport {
    pub metadata: ReportMetadata,
    pub students: Vec<StudentGrade>,
    pub summary: GradeSummary,
}

impl GradeReport {
    /// Builds a report and its summary from graded students.
    pub fn new(data_file: String, thresholds: GradeThresholds, students: Vec<StudentGrade>) -> Self {
        let summary = GradeSummary::from_grades(&students);
        Self {
            metadata: ReportMetadata {
                data_file,
                generated_at: Utc::now(),
                thresholds,
                students_reported: students.len(),
            },
            students,
            summary,
        }
    }

    /// Whether any student is graded below `letter`.
    pub fn has_grades_below(&self, letter: LetterGrade) -> bool {
        self.students.iter().any(|s| s.grade.letter < letter)
    }
}
