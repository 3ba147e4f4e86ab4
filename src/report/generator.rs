//! Grade report generation.
//!
//! This module renders grade reports as Markdown or JSON.

use crate::models::{GradeReport, GradeSummary, LetterGrade, ReportMetadata, StudentGrade};
use anyhow::Result;

/// Number of students listed under "Needs Attention".
const ATTENTION_LIMIT: usize = 5;

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &GradeReport) -> String {
    let mut output = String::new();

    output.push_str("# Gradebook Report\n\n");
    output.push_str(&generate_metadata_section(&report.metadata));
    output.push_str(&generate_summary_section(&report.summary));
    output.push_str(&generate_students_section(&report.students));
    output.push_str(&generate_attention_section(&report.students));
    output.push_str(&generate_footer());

    output
}

/// Generate the metadata section.
fn generate_metadata_section(metadata: &ReportMetadata) -> String {
    let mut section = String::new();
    let t = &metadata.thresholds;

    section.push_str("## Metadata\n\n");
    section.push_str(&format!("- **Data File:** `{}`\n", metadata.data_file));
    section.push_str(&format!(
        "- **Generated:** {}\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!(
        "- **Thresholds:** A ≥ {} | B ≥ {} | C ≥ {} | D ≥ {}\n",
        t.a, t.b, t.c, t.d
    ));
    section.push_str(&format!(
        "- **Students:** {}\n\n",
        metadata.students_reported
    ));

    section
}

/// Generate the summary section.
fn generate_summary_section(summary: &GradeSummary) -> String {
    let mut section = String::new();

    section.push_str("## Summary\n\n");
    section.push_str("| A | B | C | D | F | **Total** |\n");
    section.push_str("|:---:|:---:|:---:|:---:|:---:|:---:|\n");
    section.push_str(&format!(
        "| {} | {} | {} | {} | {} | **{}** |\n\n",
        summary.count(LetterGrade::A),
        summary.count(LetterGrade::B),
        summary.count(LetterGrade::C),
        summary.count(LetterGrade::D),
        summary.count(LetterGrade::F),
        summary.total
    ));

    if let (Some(mean), Some(high), Some(low)) = (
        summary.mean_percent,
        summary.highest_percent,
        summary.lowest_percent,
    ) {
        section.push_str(&format!(
            "Mean: **{:.2}%** | Highest: {:.2}% | Lowest: {:.2}%\n\n",
            mean, high, low
        ));
    }

    section
}

/// Generate the per-student table.
fn generate_students_section(students: &[StudentGrade]) -> String {
    let mut section = String::new();

    section.push_str("## Students\n\n");

    if students.is_empty() {
        section.push_str("No students to report.\n\n");
        return section;
    }

    section.push_str("| Student No | Name | Results | Percentage | Grade |\n");
    section.push_str("|:---|:---|:---:|---:|:---:|\n");

    for graded in students {
        section.push_str(&format!(
            "| {} | {} | {} | {:.2}% | **{}** |\n",
            graded.student.student_no.as_deref().unwrap_or("-"),
            graded.student.display_name(),
            graded.graded_results,
            graded.grade.final_percent,
            graded.grade.letter
        ));
    }
    section.push('\n');

    section
}

/// Students with the lowest failing or near-failing grades.
fn students_needing_attention(students: &[StudentGrade], n: usize) -> Vec<&StudentGrade> {
    let mut flagged: Vec<&StudentGrade> = students
        .iter()
        .filter(|s| s.grade.letter <= LetterGrade::D)
        .collect();

    flagged.sort_by(|a, b| a.grade.final_percent.cmp(&b.grade.final_percent));
    flagged.truncate(n);
    flagged
}

/// Generate the attention section.
fn generate_attention_section(students: &[StudentGrade]) -> String {
    let flagged = students_needing_attention(students, ATTENTION_LIMIT);
    if flagged.is_empty() {
        return String::new();
    }

    let mut section = String::new();
    section.push_str("## Needs Attention\n\n");

    for graded in flagged {
        let note = if graded.graded_results == 0 {
            " (no graded results)"
        } else {
            ""
        };
        section.push_str(&format!(
            "- {} - {:.2}% ({}){}\n",
            graded.student.display_name(),
            graded.grade.final_percent,
            graded.grade.letter,
            note
        ));
    }
    section.push('\n');

    section
}

/// Generate the report footer.
fn generate_footer() -> String {
    "---\n\n*Report generated by Gradebook*\n".to_string()
}

/// Generate a JSON report.
pub fn generate_json_report(report: &GradeReport) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}
