//! Grade calculation bound to a threshold policy.

use super::aggregator::{aggregate, weighted_totals, GradeThresholds};
use crate::models::{Exam, ExamResult, Grade, StudentGrade, StudentRecord};
use crate::store::StudentProvider;
use tracing::debug;
use uuid::Uuid;

/// Computes grades under a fixed set of thresholds.
///
/// Holds no mutable state, so one calculator can be shared across tasks.
#[derive(Debug, Clone, Default)]
pub struct GradeCalculator {
    thresholds: GradeThresholds,
}

impl GradeCalculator {
    pub fn new(thresholds: GradeThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &GradeThresholds {
        &self.thresholds
    }

    /// Aggregate results against exam definitions.
    pub fn aggregate(&self, results: &[ExamResult], exams: &[Exam]) -> Grade {
        aggregate(results, exams, &self.thresholds)
    }

    /// Grade an already-loaded student record.
    pub fn grade_record(&self, record: &StudentRecord) -> StudentGrade {
        let results = record.exam_results();
        let exams = record.exams();
        let totals = weighted_totals(&results, &exams);
        let percent = totals.percent();

        StudentGrade {
            student: record.student.clone(),
            grade: Grade {
                final_percent: percent,
                letter: self.thresholds.letter_for(percent),
            },
            graded_results: totals.counted,
        }
    }

    /// Fetch a student through the provider and grade them.
    ///
    /// An unknown student grades as 0 / F. Callers that need to tell the two
    /// apart must check existence first.
    pub async fn aggregate_for_student<P>(&self, provider: &P, student_id: Uuid) -> Grade
    where
        P: StudentProvider + ?Sized,
    {
        match provider.fetch_student_with_results(student_id).await {
            Some(record) => self.aggregate(&record.exam_results(), &record.exams()),
            None => {
                debug!("Student {} not found, returning zero grade", student_id);
                Grade::zero()
            }
        }
    }
}
