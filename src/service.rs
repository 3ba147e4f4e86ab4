//! Student operations with grading and notifications wired in.

use crate::grading::GradeCalculator;
use crate::models::{ExamResult, NewStudent, Student, StudentEvent, StudentGrade};
use crate::notify::NotificationService;
use crate::store::{StoreError, StudentStore};
use futures::future::join_all;
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

/// Composes the store, the grade calculator and the notifier.
pub struct StudentService {
    store: Arc<StudentStore>,
    calculator: GradeCalculator,
    notifier: NotificationService,
    /// Serializes score recording so each grade change sees the grade it replaced.
    recording: Mutex<()>,
}

impl StudentService {
    pub fn new(
        store: Arc<StudentStore>,
        calculator: GradeCalculator,
        notifier: NotificationService,
    ) -> Self {
        Self {
            store,
            calculator,
            notifier,
            recording: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &StudentStore {
        &self.store
    }

    pub fn calculator(&self) -> &GradeCalculator {
        &self.calculator
    }

    /// Enroll a student and send the welcome notification.
    pub async fn create_student(&self, new: NewStudent) -> Result<Student, StoreError> {
        let student = self.store.create_student(new).await?;
        info!("Enrolled student {}", student.display_name());
        self.notifier
            .notify(&StudentEvent::Created(student.clone()))
            .await;
        Ok(student)
    }

    /// Update a student's details and notify them.
    pub async fn update_student(&self, student: Student) -> Result<Student, StoreError> {
        let student = self.store.update_student(student).await?;
        self.notifier
            .notify(&StudentEvent::Updated(student.clone()))
            .await;
        Ok(student)
    }

    /// Remove a student and their results. `None` if the student was unknown.
    pub async fn delete_student(&self, id: Uuid) -> Option<Student> {
        let student = self.store.delete_student(id).await?;
        info!("Removed student {}", student.display_name());
        self.notifier
            .notify(&StudentEvent::Deleted(student.clone()))
            .await;
        Some(student)
    }

    /// Record a score and notify the student when their grade moves.
    pub async fn record_result(
        &self,
        student_id: Uuid,
        exam_id: Uuid,
        score: Decimal,
    ) -> Result<ExamResult, StoreError> {
        let _recording = self.recording.lock().await;

        let old = self
            .calculator
            .aggregate_for_student(self.store.as_ref(), student_id)
            .await;
        let result = self.store.record_result(student_id, exam_id, score).await?;
        let new = self
            .calculator
            .aggregate_for_student(self.store.as_ref(), student_id)
            .await;

        if old != new {
            info!("Grade for student {} changed: {} -> {}", student_id, old, new);
            if let Some(record) = self.store.get_student(student_id).await {
                self.notifier
                    .notify(&StudentEvent::GradeChanged {
                        student: record.student,
                        old,
                        new,
                    })
                    .await;
            }
        }

        Ok(result)
    }

    /// Grade one student, `None` if the student does not exist.
    pub async fn grade_student(&self, id: Uuid) -> Option<StudentGrade> {
        let record = self.store.get_student(id).await?;
        Some(self.calculator.grade_record(&record))
    }

    /// Grade every student, or only those listed in `only` when it is non-empty.
    pub async fn grade_all(&self, only: &[Uuid]) -> Vec<StudentGrade> {
        if only.is_empty() {
            return self
                .store
                .list_students()
                .await
                .iter()
                .map(|record| self.calculator.grade_record(record))
                .collect();
        }

        join_all(only.iter().map(|id| self.grade_student(*id)))
            .await
            .into_iter()
            .zip(only)
            .filter_map(|(graded, id)| {
                if graded.is_none() {
                    warn!("Student {} not found, skipping", id);
                }
                graded
            })
            .collect()
    }
}
