//! File-backed in-memory student store.
//!
//! The whole data set lives in memory behind an async `RwLock` and is read
//! from / written to a single JSON file.

use super::error::{StoreError, StoreResult};
use super::StudentProvider;
use crate::models::{
    Exam, ExamResult, LoadedResult, NewExam, NewStudent, Student, StudentRecord,
};
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// On-disk layout of the data file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DataFile {
    #[serde(default)]
    pub exams: Vec<Exam>,
    #[serde(default)]
    pub students: Vec<Student>,
    #[serde(default)]
    pub results: Vec<ExamResult>,
}

#[derive(Debug, Default)]
struct Tables {
    students: HashMap<Uuid, Student>,
    exams: HashMap<Uuid, Exam>,
    results: Vec<ExamResult>,
}

impl Tables {
    fn from_data(data: DataFile) -> StoreResult<Self> {
        for exam in &data.exams {
            check_weight(exam.id, exam.weight)?;
        }

        let mut tables = Tables {
            students: data.students.into_iter().map(|s| (s.id, s)).collect(),
            exams: data.exams.into_iter().map(|e| (e.id, e)).collect(),
            results: Vec::with_capacity(data.results.len()),
        };

        for result in data.results {
            if let Some(pos) = tables.result_position(result.student_id, result.exam_id) {
                warn!(
                    "Duplicate result for student {} on exam {}, keeping the later one",
                    result.student_id, result.exam_id
                );
                tables.results[pos] = result;
            } else {
                tables.results.push(result);
            }
        }

        Ok(tables)
    }

    fn to_data(&self) -> DataFile {
        let mut exams: Vec<Exam> = self.exams.values().cloned().collect();
        exams.sort_by_key(|e| e.id);

        DataFile {
            exams,
            students: self.sorted_students().into_iter().cloned().collect(),
            results: self.results.clone(),
        }
    }

    fn sorted_students(&self) -> Vec<&Student> {
        let mut students: Vec<&Student> = self.students.values().collect();
        students.sort_by(|a, b| {
            a.student_no
                .cmp(&b.student_no)
                .then_with(|| a.id.cmp(&b.id))
        });
        students
    }

    fn result_position(&self, student_id: Uuid, exam_id: Uuid) -> Option<usize> {
        self.results
            .iter()
            .position(|r| r.student_id == student_id && r.exam_id == exam_id)
    }

    fn record_for(&self, student: &Student) -> StudentRecord {
        let results = self
            .results
            .iter()
            .filter(|r| r.student_id == student.id)
            .filter_map(|r| match self.exams.get(&r.exam_id) {
                Some(exam) => Some(LoadedResult {
                    result: r.clone(),
                    exam: exam.clone(),
                }),
                None => {
                    debug!("Result {} references missing exam {}", r.id, r.exam_id);
                    None
                }
            })
            .collect();

        StudentRecord {
            student: student.clone(),
            results,
        }
    }

    fn check_unique(&self, candidate: &Student) -> StoreResult<()> {
        for other in self.students.values().filter(|s| s.id != candidate.id) {
            if let (Some(a), Some(b)) = (&candidate.student_no, &other.student_no) {
                if a == b {
                    return Err(StoreError::DuplicateStudentNo(a.clone()));
                }
            }
            if let (Some(a), Some(b)) = (&candidate.email, &other.email) {
                if a.eq_ignore_ascii_case(b) {
                    return Err(StoreError::DuplicateEmail(a.clone()));
                }
            }
        }
        Ok(())
    }
}

/// Reject negative exam weights. Non-positive max scores are kept; grading skips them.
fn check_weight(exam: Uuid, weight: Decimal) -> StoreResult<()> {
    if weight < Decimal::ZERO {
        return Err(StoreError::NegativeWeight { exam, weight });
    }
    Ok(())
}

/// In-memory store of students, exams and results.
#[derive(Debug, Default)]
pub struct StudentStore {
    tables: RwLock<Tables>,
}

impl StudentStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store from an already-parsed data file.
    pub fn from_data(data: DataFile) -> StoreResult<Self> {
        Ok(Self {
            tables: RwLock::new(Tables::from_data(data)?),
        })
    }

    /// Load the store from a JSON data file. A missing file yields an empty store.
    pub async fn load(path: &Path) -> StoreResult<Self> {
        let content = match tokio::fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("Data file {} not found, starting empty", path.display());
                return Ok(Self::new());
            }
            Err(source) => {
                return Err(StoreError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let data: DataFile = serde_json::from_str(&content).map_err(|source| StoreError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        info!(
            "Loaded {} students, {} exams, {} results from {}",
            data.students.len(),
            data.exams.len(),
            data.results.len(),
            path.display()
        );

        Self::from_data(data)
    }

    /// Write the store to a JSON data file.
    pub async fn save(&self, path: &Path) -> StoreResult<()> {
        let data = self.snapshot().await;
        let json = serde_json::to_string_pretty(&data).map_err(|source| StoreError::Serialize {
            path: path.to_path_buf(),
            source,
        })?;

        tokio::fs::write(path, json)
            .await
            .map_err(|source| StoreError::Io {
                path: path.to_path_buf(),
                source,
            })?;

        debug!("Saved data file {}", path.display());
        Ok(())
    }

    /// Copy of the current contents in data-file layout.
    pub async fn snapshot(&self) -> DataFile {
        self.tables.read().await.to_data()
    }

    /// Fetch a student with results and exams.
    pub async fn get_student(&self, id: Uuid) -> Option<StudentRecord> {
        let tables = self.tables.read().await;
        tables.students.get(&id).map(|s| tables.record_for(s))
    }

    /// All students with results, ordered by student number then id.
    pub async fn list_students(&self) -> Vec<StudentRecord> {
        let tables = self.tables.read().await;
        tables
            .sorted_students()
            .into_iter()
            .map(|s| tables.record_for(s))
            .collect()
    }

    /// Enroll a new student under a freshly generated id.
    pub async fn create_student(&self, new: NewStudent) -> StoreResult<Student> {
        let student = Student {
            id: Uuid::new_v4(),
            student_no: new.student_no,
            first_name: new.first_name,
            last_name: new.last_name,
            email: new.email,
            phone: new.phone,
        };

        let mut tables = self.tables.write().await;
        tables.check_unique(&student)?;
        tables.students.insert(student.id, student.clone());

        debug!("Created student {}", student.id);
        Ok(student)
    }

    /// Replace an existing student's details.
    pub async fn update_student(&self, student: Student) -> StoreResult<Student> {
        let mut tables = self.tables.write().await;
        if !tables.students.contains_key(&student.id) {
            return Err(StoreError::StudentNotFound(student.id));
        }
        tables.check_unique(&student)?;
        tables.students.insert(student.id, student.clone());

        debug!("Updated student {}", student.id);
        Ok(student)
    }

    /// Remove a student and every result they own.
    pub async fn delete_student(&self, id: Uuid) -> Option<Student> {
        let mut tables = self.tables.write().await;
        let removed = tables.students.remove(&id)?;

        let before = tables.results.len();
        tables.results.retain(|r| r.student_id != id);
        debug!(
            "Deleted student {} and {} results",
            id,
            before - tables.results.len()
        );

        Some(removed)
    }

    /// Define a new exam. The weight must not be negative.
    pub async fn create_exam(&self, new: NewExam) -> StoreResult<Exam> {
        let exam = Exam {
            id: Uuid::new_v4(),
            name: new.name,
            max_score: new.max_score,
            weight: new.weight,
        };

        check_weight(exam.id, exam.weight)?;

        self.tables
            .write()
            .await
            .exams
            .insert(exam.id, exam.clone());
        Ok(exam)
    }

    /// Remove an exam and every result scored against it.
    pub async fn delete_exam(&self, id: Uuid) -> Option<Exam> {
        let mut tables = self.tables.write().await;
        let removed = tables.exams.remove(&id)?;
        tables.results.retain(|r| r.exam_id != id);
        Some(removed)
    }

    /// Record a student's score on an exam, replacing any earlier score.
    pub async fn record_result(
        &self,
        student_id: Uuid,
        exam_id: Uuid,
        score: Decimal,
    ) -> StoreResult<ExamResult> {
        let mut tables = self.tables.write().await;
        if !tables.students.contains_key(&student_id) {
            return Err(StoreError::StudentNotFound(student_id));
        }
        if !tables.exams.contains_key(&exam_id) {
            return Err(StoreError::ExamNotFound(exam_id));
        }

        let result = match tables.result_position(student_id, exam_id) {
            Some(pos) => {
                tables.results[pos].score = score;
                tables.results[pos].clone()
            }
            None => {
                let result = ExamResult {
                    id: Uuid::new_v4(),
                    student_id,
                    exam_id,
                    score,
                };
                tables.results.push(result.clone());
                result
            }
        };

        debug!(
            "Recorded score {} for student {} on exam {}",
            score, student_id, exam_id
        );
        Ok(result)
    }
}

#[async_trait]
impl StudentProvider for StudentStore {
    async fn fetch_student_with_results(&self, student_id: Uuid) -> Option<StudentRecord> {
        self.get_student(student_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn new_student(no: &str, email: &str) -> NewStudent {
        NewStudent {
            student_no: Some(no.to_string()),
            first_name: Some("Test".to_string()),
            last_name: Some(no.to_string()),
            email: Some(email.to_string()),
            phone: None,
        }
    }

    fn new_exam(max: &str, weight: &str) -> NewExam {
        NewExam {
            name: None,
            max_score: d(max),
            weight: d(weight),
        }
    }

    #[tokio::test]
    async fn test_create_and_get_student() {
        let store = StudentStore::new();
        let student = store
            .create_student(new_student("S1", "s1@example.com"))
            .await
            .unwrap();

        let record = store.get_student(student.id).await.unwrap();
        assert_eq!(record.student, student);
        assert!(record.results.is_empty());
        assert!(store.get_student(Uuid::new_v4()).await.is_none());
    }

    #[tokio::test]
    async fn test_unique_student_no_and_email() {
        let store = StudentStore::new();
        store
            .create_student(new_student("S1", "s1@example.com"))
            .await
            .unwrap();

        let err = store
            .create_student(new_student("S1", "other@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateStudentNo(_)));

        let err = store
            .create_student(new_student("S2", "S1@EXAMPLE.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateEmail(_)));
    }

    #[tokio::test]
    async fn test_update_student() {
        let store = StudentStore::new();
        let mut student = store
            .create_student(new_student("S1", "s1@example.com"))
            .await
            .unwrap();

        student.phone = Some("555-0100".to_string());
        let updated = store.update_student(student.clone()).await.unwrap();
        assert_eq!(updated.phone.as_deref(), Some("555-0100"));

        let missing = Student {
            id: Uuid::new_v4(),
            ..Default::default()
        };
        assert!(matches!(
            store.update_student(missing).await,
            Err(StoreError::StudentNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_record_result_upserts() {
        let store = StudentStore::new();
        let student = store
            .create_student(new_student("S1", "s1@example.com"))
            .await
            .unwrap();
        let exam = store.create_exam(new_exam("100", "1")).await.unwrap();

        let first = store
            .record_result(student.id, exam.id, d("50"))
            .await
            .unwrap();
        let second = store
            .record_result(student.id, exam.id, d("75"))
            .await
            .unwrap();
        assert_eq!(first.id, second.id);

        let record = store.get_student(student.id).await.unwrap();
        assert_eq!(record.results.len(), 1);
        assert_eq!(record.results[0].result.score, d("75"));
        assert_eq!(record.results[0].exam, exam);
    }

    #[tokio::test]
    async fn test_record_result_rejects_unknown_ids() {
        let store = StudentStore::new();
        let student = store
            .create_student(new_student("S1", "s1@example.com"))
            .await
            .unwrap();
        let exam = store.create_exam(new_exam("100", "1")).await.unwrap();

        assert!(matches!(
            store.record_result(Uuid::new_v4(), exam.id, d("1")).await,
            Err(StoreError::StudentNotFound(_))
        ));
        assert!(matches!(
            store.record_result(student.id, Uuid::new_v4(), d("1")).await,
            Err(StoreError::ExamNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_student_cascades() {
        let store = StudentStore::new();
        let keep = store
            .create_student(new_student("S1", "s1@example.com"))
            .await
            .unwrap();
        let gone = store
            .create_student(new_student("S2", "s2@example.com"))
            .await
            .unwrap();
        let exam = store.create_exam(new_exam("100", "1")).await.unwrap();
        store.record_result(keep.id, exam.id, d("90")).await.unwrap();
        store.record_result(gone.id, exam.id, d("40")).await.unwrap();

        assert_eq!(store.delete_student(gone.id).await, Some(gone.clone()));
        assert!(store.delete_student(gone.id).await.is_none());

        let data = store.snapshot().await;
        assert_eq!(data.students.len(), 1);
        assert_eq!(data.results.len(), 1);
        assert_eq!(data.results[0].student_id, keep.id);
    }

    #[tokio::test]
    async fn test_delete_exam_cascades() {
        let store = StudentStore::new();
        let student = store
            .create_student(new_student("S1", "s1@example.com"))
            .await
            .unwrap();
        let exam = store.create_exam(new_exam("100", "1")).await.unwrap();
        store
            .record_result(student.id, exam.id, d("90"))
            .await
            .unwrap();

        assert!(store.delete_exam(exam.id).await.is_some());
        let record = store.get_student(student.id).await.unwrap();
        assert!(record.results.is_empty());
    }

    #[tokio::test]
    async fn test_list_students_is_ordered() {
        let store = StudentStore::new();
        store
            .create_student(new_student("S2", "s2@example.com"))
            .await
            .unwrap();
        store
            .create_student(new_student("S1", "s1@example.com"))
            .await
            .unwrap();

        let numbers: Vec<_> = store
            .list_students()
            .await
            .into_iter()
            .filter_map(|r| r.student.student_no)
            .collect();
        assert_eq!(numbers, vec!["S1", "S2"]);
    }

    #[tokio::test]
    async fn test_orphaned_results_are_not_loaded() {
        let student = Student {
            id: Uuid::new_v4(),
            ..Default::default()
        };
        let data = DataFile {
            exams: vec![],
            students: vec![student.clone()],
            results: vec![ExamResult {
                id: Uuid::new_v4(),
                student_id: student.id,
                exam_id: Uuid::new_v4(),
                score: d("10"),
            }],
        };

        let store = StudentStore::from_data(data).unwrap();
        let record = store.fetch_student_with_results(student.id).await.unwrap();
        assert!(record.results.is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_results_in_file_keep_last() {
        let student = Student {
            id: Uuid::new_v4(),
            ..Default::default()
        };
        let exam = Exam {
            id: Uuid::new_v4(),
            name: None,
            max_score: d("100"),
            weight: d("1"),
        };
        let result = |score: &str| ExamResult {
            id: Uuid::new_v4(),
            student_id: student.id,
            exam_id: exam.id,
            score: d(score),
        };

        let store = StudentStore::from_data(DataFile {
            exams: vec![exam.clone()],
            students: vec![student.clone()],
            results: vec![result("10"), result("20")],
        })
        .unwrap();

        let record = store.get_student(student.id).await.unwrap();
        assert_eq!(record.results.len(), 1);
        assert_eq!(record.results[0].result.score, d("20"));
    }

    #[tokio::test]
    async fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gradebook.json");

        let store = StudentStore::new();
        let student = store
            .create_student(new_student("S1", "s1@example.com"))
            .await
            .unwrap();
        let exam = store.create_exam(new_exam("50", "0.4")).await.unwrap();
        store
            .record_result(student.id, exam.id, d("40"))
            .await
            .unwrap();
        store.save(&path).await.unwrap();

        let loaded = StudentStore::load(&path).await.unwrap();
        assert_eq!(
            loaded.get_student(student.id).await,
            store.get_student(student.id).await
        );
    }

    #[tokio::test]
    async fn test_load_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = StudentStore::load(&dir.path().join("absent.json"))
            .await
            .unwrap();
        assert!(store.list_students().await.is_empty());
    }

    #[tokio::test]
    async fn test_load_invalid_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = StudentStore::load(&path).await.unwrap_err();
        assert!(matches!(err, StoreError::Parse { .. }));
    }

    #[tokio::test]
    async fn test_create_exam_rejects_negative_weight() {
        let store = StudentStore::new();

        let err = store.create_exam(new_exam("100", "-0.5")).await.unwrap_err();
        assert!(matches!(err, StoreError::NegativeWeight { .. }));
        assert!(store.snapshot().await.exams.is_empty());

        // Unscored exams are still accepted.
        let unscored = store.create_exam(new_exam("0", "1")).await.unwrap();
        assert_eq!(unscored.max_score, Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_load_rejects_negative_weight() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("negative.json");
        let exam_id = Uuid::new_v4();
        let data = DataFile {
            exams: vec![Exam {
                id: exam_id,
                name: None,
                max_score: d("100"),
                weight: d("-0.9999999999999999999999999999"),
            }],
            ..Default::default()
        };
        std::fs::write(&path, serde_json::to_string(&data).unwrap()).unwrap();

        let err = StudentStore::load(&path).await.unwrap_err();
        assert!(matches!(err, StoreError::NegativeWeight { exam, .. } if exam == exam_id));
    }
}
