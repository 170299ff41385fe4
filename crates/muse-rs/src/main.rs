//! Creative-writing mentor on the command line.
//!
//! Reads the API key from the `OPENAI_API_KEY` environment variable. Log
//! output goes to stderr and is filtered with `RUST_LOG`.
//!
//! # Examples
//!
//! ```sh
//! # Interactive storytelling in the current genre
//! muse chat
//!
//! # Critique in a different genre (clears the conversation)
//! muse chat --mode feedback --genre mystery
//!
//! # One turn, no REPL
//! muse ask "I discover a mysterious door in my attic"
//!
//! # Projects and goals
//! muse project create "Dragon's Call" --genre fantasy
//! muse project chapter <ID> "The Egg" --file ch1.md --words 1200
//! muse goal add "Finish draft" --due 2026-11-30
//! ```

use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use muse_rs::OpenAiClient;
use muse_rs::config::MuseConfig;
use muse_rs::conversation::Conversation;
use muse_rs::prompt::{Genre, Mode};
use muse_rs::store::{
    CompositeObserver, FnObserver, LoggingObserver, Message, ProjectUpdate, Role, Session,
    SessionStore, StoreEvent,
};
use std::io::Write;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Creative-writing mentor: interactive stories, critique, goals and
/// genre what-ifs, with a persisted session.
#[derive(Parser)]
#[command(name = "muse", version)]
struct Cli {
    /// Session file (default: ./creative-mentor-storage.json or $MUSE_STORAGE)
    #[arg(long, global = true)]
    storage: Option<PathBuf>,

    /// Chat model (default: gpt-4o or $MUSE_MODEL)
    #[arg(long, global = true)]
    model: Option<String>,

    /// Sampling temperature
    #[arg(long, global = true)]
    temperature: Option<f32>,

    /// Send only the most recent N messages with each turn
    #[arg(long, global = true)]
    history_window: Option<usize>,

    /// Print each session change to stderr
    #[arg(long, global = true)]
    trace_events: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start an interactive session
    Chat {
        /// story, feedback, goals or whatif
        #[arg(long, default_value = "story")]
        mode: Mode,
        /// Switch to this genre first (clears the conversation if it changes)
        #[arg(long)]
        genre: Option<Genre>,
    },
    /// Send a single turn and print the reply
    Ask {
        text: String,
        #[arg(long, default_value = "story")]
        mode: Mode,
    },
    /// Illustrate the latest messages
    Illustrate,
    /// Show the current genre, or switch to a new one
    Genre { genre: Option<Genre> },
    /// Print the conversation
    History,
    /// Clear the conversation
    Reset,
    /// Show suggested openings for a mode
    Starters {
        #[arg(long, default_value = "story")]
        mode: Mode,
    },
    /// Manage writing projects
    #[command(subcommand)]
    Project(ProjectCommand),
    /// Manage writing goals
    #[command(subcommand)]
    Goal(GoalCommand),
}

#[derive(Subcommand)]
enum ProjectCommand {
    /// Create an empty project
    Create {
        title: String,
        #[arg(long, default_value = "fantasy")]
        genre: Genre,
        #[arg(long, default_value = "")]
        description: String,
    },
    /// List projects
    List,
    /// Show a project and its chapters
    Show { id: String },
    /// Change a project's title, genre or description
    Update {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        genre: Option<Genre>,
        #[arg(long)]
        description: Option<String>,
    },
    /// Delete a project
    Delete { id: String },
    /// Append a chapter
    Chapter {
        id: String,
        title: String,
        /// Chapter text
        #[arg(long, conflicts_with = "file")]
        content: Option<String>,
        /// Read chapter text from a file
        #[arg(long)]
        file: Option<PathBuf>,
        /// Word count to record
        #[arg(long)]
        words: u32,
    },
    /// Make a project current, or clear the selection when no id is given
    Select { id: Option<String> },
}

#[derive(Subcommand)]
enum GoalCommand {
    /// Add a goal
    Add {
        title: String,
        #[arg(long, default_value = "")]
        description: String,
        /// Due date, YYYY-MM-DD or RFC 3339
        #[arg(long)]
        due: Option<String>,
    },
    /// List goals
    List,
    /// Flip a goal between open and done
    Toggle { id: String },
    /// Delete a goal
    Delete { id: String },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn build_config(cli: &Cli) -> MuseConfig {
    let mut config = MuseConfig::from_env();
    if let Some(path) = &cli.storage {
        config.storage_path = path.clone();
    }
    if let Some(model) = &cli.model {
        config.model = model.clone();
    }
    if let Some(t) = cli.temperature {
        config.temperature = t;
    }
    if let Some(window) = cli.history_window {
        config.history_window = (window > 0).then_some(window);
    }
    config
}

fn conversation(
    config: &MuseConfig,
    store: &Arc<SessionStore>,
) -> Result<Conversation<OpenAiClient>, String> {
    let client = OpenAiClient::from_config(config)
        .map_err(|e| format!("failed to create API client: {e}"))?;
    Ok(Conversation::new(client, store.clone(), config.clone()))
}

fn parse_due(raw: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc())
            .ok_or_else(|| format!("invalid due date '{raw}'"));
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| format!("invalid due date '{raw}': {e}"))
}

// ── Output ──────────────────────────────────────────────────────────

fn print_message(message: &Message) {
    let speaker = match message.role {
        Role::User => "you",
        Role::Assistant => "muse",
    };
    println!("[{speaker}] {}", message.content);
    if let Some(choices) = &message.choices {
        for (i, choice) in choices.iter().enumerate() {
            println!("  {}. {choice}", i + 1);
        }
    }
    if let Some(url) = &message.image_url {
        println!("  {url}");
    }
}

fn print_starters(mode: Mode) {
    println!("{} ({})", mode.label(), mode.description());
    for prompt in mode.starter_prompts() {
        println!("  - {prompt}");
    }
}

fn print_project_line(store: &SessionStore, id: &str) {
    let snapshot = store.snapshot();
    let Some(project) = snapshot.project(id) else {
        return;
    };
    let marker = if snapshot.current_project_id.as_deref() == Some(id) {
        "*"
    } else {
        " "
    };
    println!(
        "{marker} {}  {} [{}] {} chapter(s), {} words, updated {}",
        project.id,
        project.title,
        project.genre,
        project.chapters.len(),
        project.word_count(),
        project.updated_at.format("%Y-%m-%d %H:%M"),
    );
}

// ── REPL ────────────────────────────────────────────────────────────

const REPL_HELP: &str = "Commands: /mode <name>, /genre <name>, /image, /reset, /starters, /help, /exit
Type a number to pick one of the last suggested choices.";

async fn run_chat(
    convo: &Conversation<OpenAiClient>,
    mut mode: Mode,
    genre: Option<Genre>,
) -> Result<(), String> {
    if let Some(genre) = genre
        && convo.switch_genre(genre).await
    {
        println!("Switched to {}; starting a fresh story.", genre.label());
    }

    let history = convo.store().messages();
    if history.is_empty() {
        print_starters(mode);
    } else {
        history.iter().for_each(print_message);
    }
    println!("{REPL_HELP}");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("{}/{}> ", convo.store().genre(), mode);
        std::io::stdout()
            .flush()
            .map_err(|e| format!("failed to flush stdout: {e}"))?;

        let Some(line) = lines
            .next_line()
            .await
            .map_err(|e| format!("failed to read input: {e}"))?
        else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(command) = line.strip_prefix('/') {
            let (name, arg) = command
                .split_once(char::is_whitespace)
                .map_or((command, ""), |(n, a)| (n, a.trim()));
            match name {
                "exit" | "quit" => break,
                "help" => println!("{REPL_HELP}"),
                "starters" => print_starters(mode),
                "reset" => {
                    convo.reset().await;
                    println!("Conversation cleared.");
                }
                "image" => match convo.illustrate().await {
                    Some(message) => print_message(&message),
                    None => println!("Nothing to illustrate yet."),
                },
                "mode" => match arg.parse::<Mode>() {
                    Ok(m) => {
                        mode = m;
                        println!("Mode: {} ({})", mode.label(), mode.description());
                    }
                    Err(e) => println!("{e}"),
                },
                "genre" => match arg.parse::<Genre>() {
                    Ok(g) if convo.switch_genre(g).await => {
                        println!("Switched to {}; starting a fresh story.", g.label());
                    }
                    Ok(g) => println!("Already writing {}.", g.label()),
                    Err(e) => println!("{e}"),
                },
                other => println!("Unknown command '/{other}'. {REPL_HELP}"),
            }
            continue;
        }

        let text = pick_choice(&convo.store().messages(), line).unwrap_or_else(|| line.to_string());
        if let Some(reply) = convo.send(mode, &text).await {
            print_message(&reply);
        }
    }
    Ok(())
}

/// Resolve a bare number to the matching choice of the latest reply.
fn pick_choice(history: &[Message], input: &str) -> Option<String> {
    let index: usize = input.parse().ok()?;
    let choices = history.last()?.choices.as_ref()?;
    choices.get(index.checked_sub(1)?).cloned()
}

// ── Commands ────────────────────────────────────────────────────────

async fn run(cli: Cli) -> Result<(), String> {
    let config = build_config(&cli);
    let observer = CompositeObserver::new().with(LoggingObserver).with_if(
        cli.trace_events,
        FnObserver::new(|event: &StoreEvent, session: &Session| {
            eprintln!("[{}] {} messages", event.kind(), session.messages.len());
        }),
    );
    let store = Arc::new(SessionStore::open(&config.storage_path).with_observer(observer));

    match cli.command {
        Command::Chat { mode, genre } => {
            let convo = conversation(&config, &store)?;
            run_chat(&convo, mode, genre).await?;
        }
        Command::Ask { text, mode } => {
            let convo = conversation(&config, &store)?;
            match convo.send(mode, &text).await {
                Some(reply) => print_message(&reply),
                None => return Err("nothing to send".into()),
            }
        }
        Command::Illustrate => {
            let convo = conversation(&config, &store)?;
            match convo.illustrate().await {
                Some(message) => print_message(&message),
                None => println!("Nothing to illustrate yet."),
            }
        }
        Command::Genre { genre: None } => {
            let genre = store.genre();
            println!("{} ({genre})", genre.label());
        }
        Command::Genre { genre: Some(genre) } => {
            if store.switch_genre(genre) {
                println!("Switched to {}; conversation cleared.", genre.label());
            } else {
                println!("Already writing {}.", genre.label());
            }
        }
        Command::History => {
            store.messages().iter().for_each(print_message);
        }
        Command::Reset => {
            store.reset_messages();
            println!("Conversation cleared.");
        }
        Command::Starters { mode } => print_starters(mode),
        Command::Project(cmd) => run_project(&store, cmd)?,
        Command::Goal(cmd) => run_goal(&store, cmd)?,
    }

    store.close();
    Ok(())
}

fn run_project(store: &SessionStore, cmd: ProjectCommand) -> Result<(), String> {
    match cmd {
        ProjectCommand::Create {
            title,
            genre,
            description,
        } => {
            let project = store.create_project(title, genre, description);
            println!("{}", project.id);
        }
        ProjectCommand::List => {
            for project in &store.snapshot().projects {
                print_project_line(store, &project.id);
            }
        }
        ProjectCommand::Show { id } => {
            let project = store
                .project(&id)
                .ok_or_else(|| format!("no project with id {id}"))?;
            print_project_line(store, &id);
            if !project.description.is_empty() {
                println!("  {}", project.description);
            }
            for (i, chapter) in project.chapters.iter().enumerate() {
                println!("  {}. {} ({} words)", i + 1, chapter.title, chapter.word_count);
            }
        }
        ProjectCommand::Update {
            id,
            title,
            genre,
            description,
        } => {
            let update = ProjectUpdate {
                title,
                genre,
                description,
            };
            if update.is_empty() {
                return Err("nothing to update; pass --title, --genre or --description".into());
            }
            if !store.update_project(&id, update) {
                return Err(format!("no project with id {id}"));
            }
        }
        ProjectCommand::Delete { id } => {
            if !store.delete_project(&id) {
                return Err(format!("no project with id {id}"));
            }
        }
        ProjectCommand::Chapter {
            id,
            title,
            content,
            file,
            words,
        } => {
            let content = match (content, file) {
                (Some(text), _) => text,
                (None, Some(path)) => std::fs::read_to_string(&path)
                    .map_err(|e| format!("failed to read {}: {e}", path.display()))?,
                (None, None) => String::new(),
            };
            let chapter = store
                .add_chapter(&id, title, content, words)
                .ok_or_else(|| format!("no project with id {id}"))?;
            println!("{}", chapter.id);
        }
        ProjectCommand::Select { id } => {
            if !store.set_current_project(id.as_deref()) {
                return Err(format!("no project with id {}", id.unwrap_or_default()));
            }
        }
    }
    Ok(())
}

fn run_goal(store: &SessionStore, cmd: GoalCommand) -> Result<(), String> {
    match cmd {
        GoalCommand::Add {
            title,
            description,
            due,
        } => {
            let due_date = due.as_deref().map(parse_due).transpose()?;
            let goal = store.create_goal(title, description, due_date);
            println!("{}", goal.id);
        }
        GoalCommand::List => {
            for goal in &store.snapshot().goals {
                let check = if goal.completed { "x" } else { " " };
                let due = goal
                    .due_date
                    .map(|d| format!(" (due {})", d.format("%Y-%m-%d")))
                    .unwrap_or_default();
                println!("[{check}] {}  {}{due}", goal.id, goal.title);
            }
        }
        GoalCommand::Toggle { id } => {
            let completed = store
                .toggle_goal(&id)
                .ok_or_else(|| format!("no goal with id {id}"))?;
            println!("{}", if completed { "done" } else { "open" });
        }
        GoalCommand::Delete { id } => {
            if !store.delete_goal(&id) {
                return Err(format!("no goal with id {id}"));
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}
