use crate::demo::{run_demo, DemoArgs};
use crate::infra::{parse_cgpa, parse_score, LoggingSmsTransport};
use crate::server;
use clap::{Args, Parser, Subcommand};
use gradebook::config::AppConfig;
use gradebook::error::AppError;
use gradebook::records::{
    grade_for_score, ClassificationPreview, NotificationDispatcher, SqliteRecordStore,
};
use gradebook::telemetry;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(
    name = "Gradebook",
    about = "Run the student records service and its grading tools from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Print the letter grade and grade point for a score
    Grade {
        #[arg(value_parser = parse_score)]
        score: f64,
    },
    /// Print the honours classification for a CGPA
    Classify {
        #[arg(value_parser = parse_cgpa)]
        cgpa: f64,
    },
    /// Send SMS notifications for every pending result in the configured database
    Notify,
    /// Seed an in-memory gradebook and walk through grading, CGPA and notifications
    Demo(DemoArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Grade { score } => {
            let assignment = grade_for_score(score);
            println!(
                "Score {score} -> grade {} ({:.1} grade points)",
                assignment.grade, assignment.grade_point
            );
            Ok(())
        }
        Command::Classify { cgpa } => {
            let preview = ClassificationPreview::new(cgpa);
            println!("CGPA {:.2} -> {}", preview.cgpa, preview.label);
            Ok(())
        }
        Command::Notify => run_notify(),
        Command::Demo(args) => run_demo(args),
    }
}

fn run_notify() -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    let store = Arc::new(SqliteRecordStore::open(config.storage.require_database()?)?);
    let transport = Arc::new(LoggingSmsTransport::new(
        config.notifications.sms_sender.clone(),
    ));
    let dispatcher = NotificationDispatcher::with_access(store, transport, config.access.clone());

    let summary = dispatcher.notify_pending()?;
    println!(
        "Dispatched {} pending results: {}",
        summary.attempted,
        summary.message()
    );
    for failure in &summary.failures {
        println!("  - {} failed: {}", failure.result_id, failure.reason);
    }
    Ok(())
}
