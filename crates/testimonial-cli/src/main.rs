use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use testimonial_core::{Recommendation, BUILTIN_RECOMMENDATIONS, DEFAULT_STORAGE_KEY};
use testimonial_store::{LocalStore, DEFAULT_QUOTA_BYTES};
use testimonial_store_sqlite::SqliteKeyValueStore;
use testimonial_widget::{
    FormInput, HtmlSurface, RecommendationRepository, SubmissionOutcome, Widget,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const CLI_CONTRACT_VERSION: &str = "cli.v1";

type ProfileWidget = Widget<SqliteKeyValueStore, HtmlSurface>;

#[derive(Debug, Parser)]
#[command(name = "tw")]
#[command(about = "Testimonial widget backed by a local profile store")]
struct Cli {
    #[arg(long, env = "TW_PROFILE", default_value = "./testimonials.sqlite3")]
    profile: PathBuf,

    #[arg(long, env = "TW_STORAGE_KEY", default_value = DEFAULT_STORAGE_KEY)]
    storage_key: String,

    #[arg(long, env = "TW_QUOTA_BYTES", default_value_t = DEFAULT_QUOTA_BYTES)]
    quota_bytes: usize,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    List(ListArgs),
    Submit(SubmitArgs),
    Render(RenderArgs),
    Reset,
}

#[derive(Debug, Args)]
struct ListArgs {
    #[arg(long, default_value_t = false)]
    json: bool,
}

#[derive(Debug, Args)]
struct SubmitArgs {
    #[arg(long)]
    name: String,
    #[arg(long)]
    text: String,
}

#[derive(Debug, Args)]
struct RenderArgs {
    #[arg(long)]
    out: PathBuf,
}

/// Every JSON document `tw` prints.
#[derive(Debug, Serialize)]
struct Envelope<T> {
    contract_version: &'static str,
    payload: T,
}

#[derive(Debug, Serialize)]
struct SubmitOutput<'a> {
    feedback: &'a str,
    recommendation: &'a Recommendation,
}

#[derive(Debug, Serialize)]
struct RenderOutput {
    written: String,
}

#[derive(Debug, Serialize)]
struct ResetOutput<'a> {
    cleared: &'a str,
}

fn main() -> Result<ExitCode> {
    init_tracing();
    let cli = Cli::parse();
    let mut widget = open_widget(&cli)?;
    match cli.command {
        Command::List(args) => run_list(&args, &mut widget),
        Command::Submit(args) => run_submit(&args, &mut widget),
        Command::Render(args) => run_render(&args, &mut widget),
        Command::Reset => run_reset(&mut widget),
    }
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn open_widget(cli: &Cli) -> Result<ProfileWidget> {
    let backend = SqliteKeyValueStore::open(&cli.profile)
        .with_context(|| format!("failed to open profile {}", cli.profile.display()))?
        .with_quota(Some(cli.quota_bytes));
    let store = LocalStore::with_key(backend, cli.storage_key.clone());
    let repository = RecommendationRepository::new(BUILTIN_RECOMMENDATIONS, store);
    Ok(Widget::new(repository, HtmlSurface::default()))
}

fn run_list(args: &ListArgs, widget: &mut ProfileWidget) -> Result<ExitCode> {
    let recommendations = widget.repository_mut().all();
    if args.json {
        return print_envelope(&recommendations);
    }

    for record in &recommendations {
        println!("{}  [{}]  {}: \"{}\"", record.date, record.origin, record.name, record.text);
    }
    Ok(ExitCode::SUCCESS)
}

fn run_submit(args: &SubmitArgs, widget: &mut ProfileWidget) -> Result<ExitCode> {
    widget.on_load();
    widget.surface_mut().fill_form(&args.name, &args.text);
    let input: FormInput = widget.surface().form().clone();

    let feedback = match widget.on_submit(&input) {
        SubmissionOutcome::Submitted(record) => {
            return print_envelope(&SubmitOutput {
                feedback: widget.surface().dialog().message(),
                recommendation: &record,
            });
        }
        SubmissionOutcome::Rejected(_) | SubmissionOutcome::StoreFailed(_) => {
            widget.surface().dialog().message()
        }
        SubmissionOutcome::Ignored => "a submission is already in progress",
    };
    eprintln!("{feedback}");
    Ok(ExitCode::FAILURE)
}

fn run_render(args: &RenderArgs, widget: &mut ProfileWidget) -> Result<ExitCode> {
    widget.on_load();
    let page = widget.surface().to_page_html();
    fs::write(&args.out, page)
        .with_context(|| format!("failed to write page to {}", args.out.display()))?;
    info!(path = %args.out.display(), "page rendered");
    print_envelope(&RenderOutput { written: args.out.display().to_string() })
}

fn run_reset(widget: &mut ProfileWidget) -> Result<ExitCode> {
    let store = widget.repository_mut().store_mut();
    store.clear().with_context(|| format!("failed to clear storage key {}", store.key()))?;
    print_envelope(&ResetOutput { cleared: store.key() })
}

fn print_envelope<T: Serialize + ?Sized>(payload: &T) -> Result<ExitCode> {
    let envelope = Envelope { contract_version: CLI_CONTRACT_VERSION, payload };
    let body = serde_json::to_string_pretty(&envelope).context("failed to encode output")?;
    println!("{body}");
    Ok(ExitCode::SUCCESS)
}
