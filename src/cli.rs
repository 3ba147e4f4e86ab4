//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::models::LetterGrade;
use clap::Parser;
use rust_decimal::Decimal;
use std::path::PathBuf;
use std::str::FromStr;
use uuid::Uuid;

/// Gradebook - weighted grade reports for student records
///
/// Reads students, exams and exam results from a JSON data file and
/// reports each student's weighted percentage and letter grade.
///
/// Examples:
///   gradebook --data class.json
///   gradebook --data class.json --student 5f0c...,9a1b... --format json
///   gradebook --data class.json --record 5f0c...:77aa...=88.5
///   gradebook --data class.json --fail-below D
///   gradebook --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Student data file (JSON)
    ///
    /// Falls back to the data_file setting in .gradebook.toml.
    #[arg(short, long, value_name = "FILE", env = "GRADEBOOK_DATA")]
    pub data: Option<PathBuf>,

    /// Only report these students (comma-separated ids)
    #[arg(short, long, value_name = "IDS", value_delimiter = ',')]
    pub student: Vec<Uuid>,

    /// Record a score before reporting
    ///
    /// Format: STUDENT_ID:EXAM_ID=SCORE. May be repeated. The data file
    /// is updated.
    #[arg(long, value_name = "ENTRY")]
    pub record: Vec<ScoreEntry>,

    /// Remove a student and their results before reporting
    ///
    /// May be repeated. The data file is updated.
    #[arg(long, value_name = "ID")]
    pub delete_student: Vec<Uuid>,

    /// Output file path for the report
    ///
    /// The report is printed to stdout when omitted.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output format (markdown, json)
    #[arg(long, default_value = "markdown", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Path to configuration file
    ///
    /// If not specified, looks for .gradebook.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Minimum percentage for an A
    #[arg(long, value_name = "PERCENT")]
    pub a_threshold: Option<Decimal>,

    /// Minimum percentage for a B
    #[arg(long, value_name = "PERCENT")]
    pub b_threshold: Option<Decimal>,

    /// Minimum percentage for a C
    #[arg(long, value_name = "PERCENT")]
    pub c_threshold: Option<Decimal>,

    /// Minimum percentage for a D
    #[arg(long, value_name = "PERCENT")]
    pub d_threshold: Option<Decimal>,

    /// Fail if any reported student is graded below this letter
    ///
    /// Useful for CI-style checks. Exit code 2 when a student falls below.
    /// Values: A, B, C, D
    #[arg(long, value_name = "LETTER")]
    pub fail_below: Option<LetterGrade>,

    /// Do not send notifications for changes
    #[arg(long)]
    pub no_notify: bool,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .gradebook.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

/// A score to record, parsed from `STUDENT_ID:EXAM_ID=SCORE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreEntry {
    pub student_id: Uuid,
    pub exam_id: Uuid,
    pub score: Decimal,
}

impl FromStr for ScoreEntry {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (ids, score) = s
            .split_once('=')
            .ok_or_else(|| format!("expected STUDENT_ID:EXAM_ID=SCORE, got '{}'", s))?;
        let (student, exam) = ids
            .split_once(':')
            .ok_or_else(|| format!("expected STUDENT_ID:EXAM_ID before '=', got '{}'", ids))?;

        Ok(Self {
            student_id: student
                .trim()
                .parse()
                .map_err(|e| format!("invalid student id '{}': {}", student, e))?,
            exam_id: exam
                .trim()
                .parse()
                .map_err(|e| format!("invalid exam id '{}': {}", exam, e))?,
            score: score
                .trim()
                .parse()
                .map_err(|e| format!("invalid score '{}': {}", score, e))?,
        })
    }
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Whether the run changes the data file.
    pub fn has_mutations(&self) -> bool {
        !self.record.is_empty() || !self.delete_student.is_empty()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if self.fail_below == Some(LetterGrade::F) {
            return Err("--fail-below F can never trigger; use A, B, C or D".to_string());
        }

        for (flag, value) in [
            ("--a-threshold", self.a_threshold),
            ("--b-threshold", self.b_threshold),
            ("--c-threshold", self.c_threshold),
            ("--d-threshold", self.d_threshold),
        ] {
            if let Some(v) = value {
                if v.is_sign_negative() {
                    return Err(format!("{} must not be negative", flag));
                }
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
