//! The `pagequiz take` command.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use comfy_table::{Cell, Table};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};

use pagequiz_core::generation::QuestionSource;
use pagequiz_core::model::{
    Answer, Difficulty, ExamConfig, ExamType, PageSelection, Question, OPTION_LETTERS,
};
use pagequiz_core::report::{format_elapsed, render_markdown};
use pagequiz_core::scoring::ScoreResult;
use pagequiz_core::session::ExamSession;
use pagequiz_providers::config::load_config_from;

const HELP: &str = "Type an answer to record it. Commands start with ':': :next (:n), :prev (:p), :go N, :pause, :resume, :submit, :help.";

pub struct TakeArgs {
    pub document: PathBuf,
    pub outline: Option<PathBuf>,
    pub exam_type: ExamType,
    pub count: usize,
    pub difficulty: Difficulty,
    pub pages: PageSelection,
    pub config: Option<PathBuf>,
    pub save: Option<PathBuf>,
}

pub async fn execute(args: TakeArgs) -> Result<()> {
    let document = super::load_document(&args.document, args.outline.as_deref())?;
    let config = load_config_from(args.config.as_deref())?;
    let client = config.build_client()?;
    if client.provider_names().is_empty() {
        eprintln!("No providers configured, questions will be built from the text directly.");
    }

    let mut session = ExamSession::new(client).with_document(Arc::new(document));
    session
        .start(ExamConfig {
            exam_type: args.exam_type,
            question_count: args.count,
            difficulty: args.difficulty,
            page_selection: args.pages,
        })
        .await
        .context("failed to start exam")?;

    let source = session
        .source()
        .map(QuestionSource::to_string)
        .unwrap_or_default();
    println!(
        "Exam ready: {} question(s) from {source}.",
        session.questions().len()
    );
    println!("{HELP}\n");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        run_exam(&mut session, &mut lines).await?;

        let result = session.submit()?.clone();
        print_summary(&result, &source);
        println!("{}", render_markdown(&result));
        if let Some(path) = &args.save {
            result.save_json(path)?;
            println!("Saved score to {}", path.display());
        }

        println!("Type 'retake' to try the same questions again, anything else to quit.");
        match lines.next_line().await? {
            Some(line) if line.trim().eq_ignore_ascii_case("retake") => session.retake()?,
            _ => break,
        }
    }
    Ok(())
}

/// One line of exam input. Commands start with `:` so any other text is an answer.
#[derive(Debug, PartialEq, Eq)]
enum Input<'a> {
    Blank,
    Answer(&'a str),
    Command(String),
}

fn classify(line: &str) -> Input<'_> {
    let line = line.trim();
    match line.strip_prefix(':') {
        _ if line.is_empty() => Input::Blank,
        Some(command) => Input::Command(command.trim().to_lowercase()),
        None => Input::Answer(line),
    }
}

/// Read commands and answers until `:submit` or end of input.
async fn run_exam<R>(session: &mut ExamSession, lines: &mut Lines<R>) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    show_question(session);

    while let Some(line) = lines.next_line().await? {
        let command = match classify(&line) {
            Input::Blank => continue,
            Input::Command(command) => command,
            Input::Answer(_) if session.is_paused() => {
                println!("Exam is paused. Type ':resume' to continue.");
                continue;
            }
            Input::Answer(answer) => {
                if record(session, answer) {
                    show_question(session);
                }
                continue;
            }
        };
        if session.is_paused() && command != "resume" {
            println!("Exam is paused. Type ':resume' to continue.");
            continue;
        }

        match command.as_str() {
            "submit" => return Ok(()),
            "next" | "n" => {
                session.next();
            }
            "prev" | "previous" | "p" => {
                session.previous();
            }
            "pause" => {
                if session.pause() {
                    println!(
                        "Paused at {}. Type ':resume' to continue.",
                        format_elapsed(session.elapsed().as_millis() as u64)
                    );
                }
                continue;
            }
            "resume" => {
                session.resume();
            }
            cmd if cmd.starts_with("go") => match cmd[2..].trim().parse::<usize>() {
                Ok(n) if n >= 1 => {
                    session.go_to(n - 1);
                }
                _ => {
                    println!("Usage: :go N (1-{})", session.questions().len());
                    continue;
                }
            },
            _ => {
                println!("{HELP}");
                continue;
            }
        }
        show_question(session);
    }
    Ok(())
}

/// Record `input` for the current question and advance. Returns `false` if rejected.
fn record(session: &mut ExamSession, input: &str) -> bool {
    let index = session.current_index();
    let Some(question) = session.current_question() else {
        return false;
    };
    let Some(answer) = Answer::parse_for(question, input) else {
        println!("{}", answer_hint(question));
        return false;
    };
    if !session.record_answer(index, answer) {
        return false;
    }

    let progress = session.progress();
    if index + 1 < progress.total {
        session.next();
    } else if progress.answered == progress.total {
        println!("All questions answered. Type ':submit' to finish.");
    }
    true
}

fn answer_hint(question: &Question) -> &'static str {
    match question {
        Question::Mcq { .. } => "Answer with a letter from A to D.",
        Question::TrueFalse { .. } => "Answer TRUE or FALSE.",
        Question::Matching { .. } => "Answer with pairs like 1-A, 2-C, 3-B.",
        Question::FillBlank { .. } | Question::ShortAnswer { .. } => "Type your answer.",
    }
}

fn show_question(session: &ExamSession) {
    let Some(question) = session.current_question() else {
        return;
    };
    let progress = session.progress();
    println!(
        "\nQuestion {}/{} ({}) [{} answered]",
        progress.current + 1,
        progress.total,
        question.exam_type(),
        progress.answered
    );
    println!("{}", question.prompt());

    match question {
        Question::Mcq { options, .. } => {
            for (letter, option) in OPTION_LETTERS.iter().zip(options) {
                println!("  {letter}) {option}");
            }
        }
        Question::TrueFalse { .. } => println!("  (TRUE / FALSE)"),
        Question::Matching {
            terms, definitions, ..
        } => {
            for (i, term) in terms.iter().enumerate() {
                println!("  {}. {term}", i + 1);
            }
            for (letter, definition) in ('A'..='Z').zip(definitions) {
                println!("  {letter}. {definition}");
            }
        }
        Question::FillBlank { .. } | Question::ShortAnswer { .. } => {}
    }

    if let Some(answer) = session.answers().get(&progress.current) {
        println!("  Your answer: {}", answer.display());
    }
}

fn print_summary(result: &ScoreResult, source: &str) {
    let mut table = Table::new();
    table.set_header(vec!["Correct", "Total", "Score", "Time", "Questions from"]);
    table.add_row(vec![
        Cell::new(result.correct),
        Cell::new(result.total),
        Cell::new(format!("{}%", result.percent)),
        Cell::new(format_elapsed(result.elapsed_ms)),
        Cell::new(source),
    ]);
    println!("\n{table}");
}
