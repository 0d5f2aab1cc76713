use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;
use transcript_wer::{
    render, render_batch, Grader, GraderBuilder, GraderConfig, PreprocessRule, RecognitionResponse,
    Report, ScoreInput,
};

#[path = "wer_report/html_report_formatter.rs"]
mod html_report_formatter;
#[path = "wer_report/json_report_formatter.rs"]
mod json_report_formatter;

#[derive(Debug, Parser)]
#[command(name = "wer_report")]
#[command(about = "Score recognizer transcripts against references and write a WER report")]
struct Args {
    /// Plain-text hypothesis transcript.
    #[arg(long, env = "WER_REPORT_HYPOTHESIS")]
    hypothesis: Option<PathBuf>,
    /// Recognizer JSON response; the hypothesis is its concatenated top alternatives.
    #[arg(long, env = "WER_REPORT_RESPONSE")]
    response: Option<PathBuf>,
    /// Plain-text reference transcript.
    #[arg(long, env = "WER_REPORT_REFERENCE")]
    reference: Option<PathBuf>,
    /// JSON array of `{id, hypothesis, reference, preprocess_rule?}` items.
    #[arg(long, env = "WER_REPORT_CASES")]
    cases: Option<PathBuf>,
    /// Repeatable. Each value is one phrase, commas included.
    #[arg(long = "key-phrase", env = "WER_REPORT_KEY_PHRASE")]
    key_phrases: Vec<String>,
    /// identity, normalize or remove-comments.
    #[arg(long, env = "WER_REPORT_PREPROCESS")]
    preprocess: Option<String>,
    #[arg(long, env = "WER_REPORT_CONFIG")]
    config: Option<PathBuf>,
    #[arg(long, env = "WER_REPORT_OUT")]
    out: Option<PathBuf>,
    #[arg(long, env = "WER_REPORT_JSON_OUT")]
    json_out: Option<PathBuf>,
    #[arg(long, env = "WER_REPORT_PRINT_TEXT", default_value_t = false)]
    print_text: bool,
}

enum Source {
    Pair { hypothesis: String, reference: String },
    Batch(Vec<ScoreInput>),
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    if let Err(err) = run() {
        tracing::error!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let args = Args::parse();
    let repo_root = PathBuf::from(env!("CARGO_MANIFEST_DIR"));

    let config = load_config(&args)?;
    let grader = GraderBuilder::new(config)
        .build()
        .map_err(|err| format!("Failed to build grader: {err}"))?;

    let mut report = match load_source(&args)? {
        Source::Pair {
            hypothesis,
            reference,
        } => {
            let scored = grader.score("utterance", &hypothesis, &reference);
            render(&scored.alignment, &scored.summary, &scored.summary.key_phrases)
        }
        Source::Batch(inputs) => score_cases(&grader, &inputs),
    };
    report.meta.generated_at = Some(Utc::now().to_rfc3339());
    report.meta.preprocess_rule = Some(grader.preprocess_rule().to_string());

    let out_path = resolve_out_path(&repo_root, args.out.as_ref());
    html_report_formatter::write_report(&out_path, &report)?;
    tracing::info!(path = %out_path.display(), "wrote HTML report");

    if let Some(json_path) = args.json_out.as_ref() {
        json_report_formatter::write_report(json_path, &report)?;
        tracing::info!(path = %json_path.display(), "wrote JSON report");
    }

    print_summary(&report, args.print_text);
    Ok(())
}

fn load_config(args: &Args) -> Result<GraderConfig, String> {
    let mut config = match args.config.as_ref() {
        Some(path) => GraderConfig::load(path)
            .map_err(|err| format!("Failed to load config '{}': {err}", path.display()))?,
        None => GraderConfig::default(),
    };
    if let Some(name) = args.preprocess.as_deref() {
        config.preprocess_rule = name
            .parse::<PreprocessRule>()
            .map_err(|err| err.to_string())?;
    }
    config.key_phrases.extend(
        args.key_phrases
            .iter()
            .filter(|phrase| !phrase.trim().is_empty())
            .cloned(),
    );
    Ok(config)
}

fn load_source(args: &Args) -> Result<Source, String> {
    if let Some(cases_path) = args.cases.as_ref() {
        if args.hypothesis.is_some() || args.response.is_some() || args.reference.is_some() {
            return Err(
                "--cases cannot be combined with --hypothesis, --response or --reference."
                    .to_string(),
            );
        }
        let inputs = load_cases(cases_path)?;
        if inputs.is_empty() {
            return Err(format!("No cases found in '{}'.", cases_path.display()));
        }
        return Ok(Source::Batch(inputs));
    }

    let hypothesis = match (args.hypothesis.as_ref(), args.response.as_ref()) {
        (Some(_), Some(_)) => {
            return Err("Use either --hypothesis or --response, not both.".to_string())
        }
        (Some(path), None) => read_text(path)?,
        (None, Some(path)) => RecognitionResponse::load(path)
            .map_err(|err| format!("Failed to load response '{}': {err}", path.display()))?
            .hypothesis_text(),
        (None, None) => {
            return Err("Missing input: pass --hypothesis or --response, or --cases.".to_string())
        }
    };
    let reference_path = args
        .reference
        .as_ref()
        .ok_or_else(|| "Missing --reference for single-pair scoring.".to_string())?;
    let reference = read_text(reference_path)?;
    Ok(Source::Pair {
        hypothesis,
        reference,
    })
}

fn load_cases(path: &Path) -> Result<Vec<ScoreInput>, String> {
    let data = read_text(path)?;
    serde_json::from_str(&data)
        .map_err(|err| format!("Failed to parse cases file '{}': {err}", path.display()))
}

fn score_cases(grader: &Grader, inputs: &[ScoreInput]) -> Report {
    let progress = ProgressBar::new(inputs.len() as u64);
    progress.set_style(
        ProgressStyle::with_template("[{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} ({eta}) {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-"),
    );
    progress.set_message("scoring...");

    let outcome = grader.score_batch_with_progress(inputs, |id| {
        progress.set_message(id.to_string());
        progress.inc(1);
    });
    progress.finish_with_message("done");

    render_batch(&outcome.items, &outcome.aggregate, &outcome.failures)
}

fn print_summary(report: &Report, full_text: bool) {
    if full_text {
        print!("{}", report.to_text());
        return;
    }
    for line in report.summary_lines() {
        println!("{line}");
    }
}

fn read_text(path: &Path) -> Result<String, String> {
    require_path_exists(path, "Missing input file.")?;
    fs::read_to_string(path).map_err(|err| format!("Failed to read '{}': {err}", path.display()))
}

fn resolve_out_path(repo_root: &Path, out: Option<&PathBuf>) -> PathBuf {
    if let Some(path) = out {
        return path.clone();
    }

    let run_id = Utc::now().format("%Y%m%dT%H%M%SZ");
    repo_root
        .join("target")
        .join("wer_reports")
        .join(format!("wer-report-{run_id}.html"))
}

fn require_path_exists(path: &Path, message: &str) -> Result<(), String> {
    if path.exists() {
        return Ok(());
    }
    Err(format!("{message} Missing path: {}", path.display()))
}
