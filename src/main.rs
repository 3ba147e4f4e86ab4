//! Gradebook - weighted grade reports for student records
//!
//! Loads students, exams and results from a JSON data file, applies any
//! requested changes, and reports each student's weighted percentage and
//! letter grade.
//!
//! Exit codes:
//!   0 - Success (or no --fail-below set)
//!   1 - Runtime error (config, data file, unknown student or exam, etc.)
//!   2 - A reported student is graded below --fail-below

use anyhow::{Context, Result};
use gradebook::cli::{Args, OutputFormat};
use gradebook::config::{Config, CONFIG_FILE_NAME};
use gradebook::grading::GradeCalculator;
use gradebook::models::GradeReport;
use gradebook::notify::{NotificationService, NotifyPolicy};
use gradebook::report;
use gradebook::service::StudentService;
use gradebook::store::StudentStore;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    init_logging(&args);

    info!("Gradebook v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    match run(args).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Gradebook failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .gradebook.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(CONFIG_FILE_NAME);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            CONFIG_FILE_NAME
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", CONFIG_FILE_NAME))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE_NAME);
    println!("   Edit it to customize grade thresholds, data file and notifications.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Apply changes, grade and write the report. Returns exit code (0 or 2).
async fn run(args: Args) -> Result<i32> {
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);
    config.warn_on_unusual_thresholds();

    let data_file = config.general.data_file.clone();
    let store = StudentStore::load(&data_file)
        .await
        .with_context(|| format!("Failed to load student data from {}", data_file.display()))?;

    let calculator = GradeCalculator::new(config.grading.thresholds());
    let notifier = NotificationService::logging(NotifyPolicy::from(&config.notifications));
    let service = StudentService::new(Arc::new(store), calculator, notifier);

    if args.has_mutations() {
        apply_changes(&service, &args).await?;
        service
            .store()
            .save(&data_file)
            .await
            .with_context(|| format!("Failed to save student data to {}", data_file.display()))?;
        info!("Saved changes to {}", data_file.display());
    }

    let graded = service.grade_all(&args.student).await;
    let grade_report = GradeReport::new(
        data_file.display().to_string(),
        *service.calculator().thresholds(),
        graded,
    );

    let output = match args.format {
        OutputFormat::Json => report::generate_json_report(&grade_report)?,
        OutputFormat::Markdown => report::generate_markdown_report(&grade_report),
    };

    match config.general.output {
        Some(ref path) => {
            std::fs::write(path, &output)
                .with_context(|| format!("Failed to write report to {}", path.display()))?;
            if !args.quiet {
                println!(
                    "✅ Graded {} students. Report saved to: {}",
                    grade_report.metadata.students_reported,
                    path.display()
                );
            }
        }
        None => print!("{}", output),
    }

    if let Some(letter) = args.fail_below {
        if grade_report.has_grades_below(letter) {
            eprintln!(
                "\n⛔ Students graded below {} found. Failing (exit code 2).",
                letter
            );
            return Ok(2);
        }
    }

    Ok(0)
}

/// Apply --delete-student and --record in that order.
async fn apply_changes(service: &StudentService, args: &Args) -> Result<()> {
    for id in &args.delete_student {
        if service.delete_student(*id).await.is_none() {
            warn!("Student {} not found, nothing to delete", id);
        }
    }

    for entry in &args.record {
        service
            .record_result(entry.student_id, entry.exam_id, entry.score)
            .await
            .with_context(|| {
                format!(
                    "Failed to record score {} for student {} on exam {}",
                    entry.score, entry.student_id, entry.exam_id
                )
            })?;
    }

    Ok(())
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", CONFIG_FILE_NAME);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}
