//! pagequiz CLI: turn a paginated text document into a self-assessment exam.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

use pagequiz_core::model::{Difficulty, ExamType, PageSelection};

mod commands;

#[derive(Parser)]
#[command(name = "pagequiz", version, about = "Self-assessment exams from document pages")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect and list the document's chapters
    Chapters {
        /// Plain-text document, pages separated by form feeds
        #[arg(long)]
        document: PathBuf,

        /// Outline file: one `PAGE TITLE` entry per line
        #[arg(long)]
        outline: Option<PathBuf>,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Take an exam interactively
    Take {
        /// Plain-text document, pages separated by form feeds
        #[arg(long)]
        document: PathBuf,

        /// Outline file: one `PAGE TITLE` entry per line
        #[arg(long)]
        outline: Option<PathBuf>,

        /// Exam type: mcq, true-false, fill-blank, matching, short-answer, comprehensive
        #[arg(long = "type", default_value = "mcq")]
        exam_type: ExamType,

        /// Maximum number of questions
        #[arg(long, default_value = "10")]
        count: usize,

        /// easy, medium or hard
        #[arg(long, default_value = "medium")]
        difficulty: Difficulty,

        /// all, current:N, range:A-B, chapters or chapters:ID,ID
        #[arg(long, default_value = "all")]
        pages: PageSelection,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,

        /// Write the score as JSON to this path
        #[arg(long)]
        save: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    let mut filter = tracing_subscriber::EnvFilter::from_default_env();
    if let Ok(directive) = "pagequiz=info".parse() {
        filter = filter.add_directive(directive);
    }
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Chapters {
            document,
            outline,
            json,
        } => commands::chapters::execute(document, outline, json).await,
        Commands::Take {
            document,
            outline,
            exam_type,
            count,
            difficulty,
            pages,
            config,
            save,
        } => {
            commands::take::execute(commands::take::TakeArgs {
                document,
                outline,
                exam_type,
                count,
                difficulty,
                pages,
                config,
                save,
            })
            .await
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
