//! relay CLI: terminal front end to the refactor analysis backend.

use clap::{Parser, Subcommand, ValueEnum};
use refactor_relay::capture::Activity;
use refactor_relay::commands::{Commands, Feedback, FeedbackAction};
use refactor_relay::config::Config;
use refactor_relay::error::Result;
use refactor_relay::host::{Document, Notifier, Prompter, Workspace};
use refactor_relay::telemetry::{TelemetryConfig, init_telemetry};
use refactor_relay::timeline::view::{render_html, render_text, render_validation_text};
use refactor_relay::timeline::{TimelineController, TimelineRender, TimelineView};
use std::cell::RefCell;
use std::io::{BufRead, Write};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tokio::io::AsyncBufReadExt;
use tracing::warn;

#[derive(Parser)]
#[command(name = "relay", about = "Activity relay and audit timeline for the refactor backend")]
struct Cli {
    /// Workspace folder (defaults to the current directory)
    #[arg(long, global = true)]
    workspace: Option<PathBuf>,
    /// TOML config file (defaults to RELAY_* environment variables)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start capture and relay JSON activity lines read from stdin
    Watch,
    /// Request suggestions for a file
    Suggest { file: PathBuf },
    /// Run workspace-wide analysis
    Analyze,
    /// Apply new text to a file and record it on the timeline
    Apply {
        file: PathBuf,
        /// File holding the new text (prompted for when omitted)
        #[arg(long)]
        text_from: Option<PathBuf>,
    },
    /// Run a validation series
    Validate {
        #[arg(long)]
        domain: Option<String>,
        #[arg(long)]
        series: Option<String>,
    },
    /// Print the project timeline
    Timeline {
        /// Also write the timeline as HTML to this path
        #[arg(long)]
        html: Option<PathBuf>,
    },
    /// Flag a timeline row (1-based)
    Flag {
        row: NonZeroUsize,
        #[arg(long)]
        reason: Option<String>,
    },
    /// Revert a timeline row (1-based) to its backup
    Revert {
        row: NonZeroUsize,
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
    /// Enable or disable adaptive tuning
    Tuning { state: Option<TuningState> },
    /// Reset adaptive tuning
    TuningReset,
    /// Record feedback on a suggestion
    Feedback {
        file: String,
        suggestion: String,
        #[arg(value_enum)]
        action: FeedbackChoice,
        #[arg(long, default_value = "")]
        note: String,
        #[arg(long, default_value = "unknown")]
        user: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum TuningState {
    Enable,
    Disable,
}

#[derive(Clone, Copy, ValueEnum)]
enum FeedbackChoice {
    Accepted,
    Rejected,
    Edited,
}

impl From<FeedbackChoice> for FeedbackAction {
    fn from(choice: FeedbackChoice) -> Self {
        match choice {
            FeedbackChoice::Accepted => FeedbackAction::Accepted,
            FeedbackChoice::Rejected => FeedbackAction::Rejected,
            FeedbackChoice::Edited => FeedbackAction::Edited,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::from_env()?,
    };
    let _guard = init_telemetry(TelemetryConfig::from_config(&config, "relay"))?;

    let root = match cli.workspace {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };
    let mut host = TerminalHost::new(root);
    let commands = Commands::new(config);

    let result = match cli.command {
        Command::Watch => cmd_watch(&commands, &host).await,
        Command::Suggest { file } => {
            host.open(&file)?;
            commands.suggest(&host).await.map(drop)
        }
        Command::Analyze => commands.workspace_analysis(&host).await.map(drop),
        Command::Apply { file, text_from } => {
            host.open(&file)?;
            if let Some(path) = text_from {
                host.preset_text(std::fs::read_to_string(path)?);
            }
            commands.apply_patch(&host).await.map(drop)
        }
        Command::Validate { domain, series } => {
            if let Some(domain) = domain {
                host.preset_pick(domain);
            }
            if let Some(series) = series {
                host.preset_text(series);
            }
            commands
                .run_validation_pack(&host)
                .await
                .map(|report| print!("{}", render_validation_text(&report)))
        }
        Command::Timeline { html } => {
            let view = TerminalView { html_out: html };
            let controller =
                TimelineController::new(commands.client().clone(), host.project_path(), view);
            controller.refresh(&host).await
        }
        Command::Flag { row, reason } => {
            if let Some(reason) = reason {
                host.preset_text(reason);
            }
            let controller = commands.show_timeline(&host, TerminalView::default()).await;
            controller.on_flag(row.get() - 1, &host).await
        }
        Command::Revert { row, yes } => {
            host.assume_yes = yes;
            let controller = commands.show_timeline(&host, TerminalView::default()).await;
            controller.on_revert(row.get() - 1, &host).await
        }
        Command::Tuning { state } => {
            if let Some(state) = state {
                host.preset_pick(match state {
                    TuningState::Enable => "enable",
                    TuningState::Disable => "disable",
                });
            }
            commands.toggle_tuning(&host).await.map(drop)
        }
        Command::TuningReset => commands.reset_tuning(&host).await,
        Command::Feedback {
            file,
            suggestion,
            action,
            note,
            user,
        } => {
            let feedback = Feedback {
                feedback: if note.is_empty() {
                    capitalized(action)
                } else {
                    note
                },
                file,
                suggestion,
                action: action.into(),
                user,
            };
            commands.send_feedback(&host, &feedback).await
        }
    };

    // Failures were already shown to the user.
    Ok(match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if e.is_aborted() => ExitCode::SUCCESS,
        Err(_) => ExitCode::FAILURE,
    })
}

async fn cmd_watch(commands: &Commands, host: &TerminalHost) -> Result<()> {
    commands.start(host);
    let capture = commands.activity_capture();

    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    let mut pending = Vec::new();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<Activity>(&line) {
            Ok(activity) => pending.extend(capture.on_activity(activity)),
            Err(e) => warn!(error = %e, "skipping unreadable activity line"),
        }
        pending.retain(|handle: &tokio::task::JoinHandle<()>| !handle.is_finished());
    }

    // Let in-flight sends finish before the process exits.
    for handle in pending {
        let _ = handle.await;
    }
    Ok(())
}

fn capitalized(choice: FeedbackChoice) -> String {
    match choice {
        FeedbackChoice::Accepted => "Accepted",
        FeedbackChoice::Rejected => "Rejected",
        FeedbackChoice::Edited => "Edited",
    }
    .to_string()
}

/// Prompts on stderr/stdin; answers given as flags are used instead of
/// prompting.
struct TerminalHost {
    root: PathBuf,
    document: Option<Document>,
    preset_text: RefCell<Option<String>>,
    preset_pick: RefCell<Option<String>>,
    assume_yes: bool,
}

impl TerminalHost {
    fn new(root: PathBuf) -> Self {
        Self {
            root,
            document: None,
            preset_text: RefCell::new(None),
            preset_pick: RefCell::new(None),
            assume_yes: false,
        }
    }

    fn open(&mut self, file: &Path) -> std::io::Result<()> {
        let path = std::fs::canonicalize(file)?;
        let text = std::fs::read_to_string(&path)?;
        self.document = Some(Document {
            uri: format!("file://{}", path.display()),
            path: path.to_string_lossy().into_owned(),
            text,
        });
        Ok(())
    }

    fn preset_text(&self, answer: impl Into<String>) {
        *self.preset_text.borrow_mut() = Some(answer.into());
    }

    fn preset_pick(&self, answer: impl Into<String>) {
        *self.preset_pick.borrow_mut() = Some(answer.into());
    }
}

fn read_answer(prompt: &str) -> Option<String> {
    eprint!("{prompt} ");
    std::io::stderr().flush().ok();
    let mut line = String::new();
    match std::io::stdin().lock().read_line(&mut line) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(line.trim_end_matches(['\r', '\n']).to_string()),
    }
}

impl Prompter for TerminalHost {
    fn ask_text(&self, prompt: &str, default: Option<&str>) -> Option<String> {
        if let Some(answer) = self.preset_text.borrow_mut().take() {
            return Some(answer);
        }
        let shown = match default {
            Some(d) => format!("{prompt} [{d}]"),
            None => prompt.to_string(),
        };
        let answer = read_answer(&shown)?;
        match (answer.is_empty(), default) {
            (true, Some(d)) => Some(d.to_string()),
            (true, None) => None,
            (false, _) => Some(answer),
        }
    }

    fn confirm(&self, prompt: &str) -> bool {
        if self.assume_yes {
            return true;
        }
        read_answer(&format!("{prompt} [y/N]"))
            .is_some_and(|a| matches!(a.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
    }

    fn pick(&self, placeholder: &str, options: &[&str]) -> Option<String> {
        let answer = match self.preset_pick.borrow_mut().take() {
            Some(answer) => answer,
            None => {
                for (i, option) in options.iter().enumerate() {
                    eprintln!("  {}) {option}", i + 1);
                }
                read_answer(&format!("{placeholder}:"))?
            }
        };
        let answer = answer.trim();
        if let Ok(n) = answer.parse::<usize>() {
            return options.get(n.checked_sub(1)?).map(|o| (*o).to_string());
        }
        options
            .iter()
            .find(|o| o.eq_ignore_ascii_case(answer))
            .map(|o| (*o).to_string())
    }
}

impl Notifier for TerminalHost {
    fn info(&self, message: &str) {
        println!("{message}");
    }

    fn error(&self, message: &str) {
        eprintln!("error: {message}");
    }
}

impl Workspace for TerminalHost {
    fn active_document(&self) -> Option<Document> {
        self.document.clone()
    }

    fn root(&self) -> Option<PathBuf> {
        Some(self.root.clone())
    }
}

/// Prints each render as a text table, optionally mirroring it to HTML.
#[derive(Default)]
struct TerminalView {
    html_out: Option<PathBuf>,
}

impl TimelineView for TerminalView {
    fn show(&mut self, render: &TimelineRender) {
        print!("{}", render_text(render));
        if let Some(path) = &self.html_out {
            if let Err(e) = std::fs::write(path, render_html(render)) {
                warn!(path = %path.display(), error = %e, "failed to write timeline html");
            }
        }
    }
}
