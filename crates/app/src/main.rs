use std::fmt;
use std::path::PathBuf;

use lesson_core::model::{CompletionStatus, ExecutionStatus, LessonId};
use remote::HttpConfig;
use services::{AppServices, Clock, RunOutcome};
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
enum ArgsError {
    MissingCommand,
    UnknownCommand(String),
    UnknownArg(String),
    MissingValue { flag: &'static str },
    MissingLessonId,
    InvalidLessonId { raw: String },
    MissingArgument { what: &'static str },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingCommand => write!(f, "a subcommand is required"),
            ArgsError::UnknownCommand(cmd) => write!(f, "unknown subcommand: {cmd}"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingLessonId => write!(f, "a lesson id is required"),
            ArgsError::InvalidLessonId { raw } => write!(f, "invalid lesson id: {raw}"),
            ArgsError::MissingArgument { what } => write!(f, "{what} is required"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  app login --email <email> --password <password>");
    eprintln!("  app catalog");
    eprintln!("  app lesson <id>");
    eprintln!("  app run <id> --file <path>");
    eprintln!("  app notes <id> <text>...");
    eprintln!("  app bookmark <id>");
    eprintln!("  app reset <id>");
    eprintln!("  app reset-all");
    eprintln!();
    eprintln!("Common options:");
    eprintln!("  --api <url>           lesson platform base url");
    eprintln!("  --credentials <path>  credential file location");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  LESSONS_API_URL, LESSONS_CREDENTIALS_FILE, RUST_LOG");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Login,
    Catalog,
    Lesson,
    Run,
    Notes,
    Bookmark,
    Reset,
    ResetAll,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "login" => Some(Self::Login),
            "catalog" => Some(Self::Catalog),
            "lesson" => Some(Self::Lesson),
            "run" => Some(Self::Run),
            "notes" => Some(Self::Notes),
            "bookmark" => Some(Self::Bookmark),
            "reset" => Some(Self::Reset),
            "reset-all" => Some(Self::ResetAll),
            _ => None,
        }
    }
}

struct Args {
    api_url: String,
    credentials: PathBuf,
    email: Option<String>,
    password: Option<String>,
    file: Option<PathBuf>,
    positional: Vec<String>,
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut parsed = Self {
            api_url: HttpConfig::from_env().base_url,
            credentials: default_credentials_path(),
            email: None,
            password: None,
            file: None,
            positional: Vec::new(),
        };

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--api" => parsed.api_url = require_value(args, "--api")?,
                "--credentials" => {
                    parsed.credentials = PathBuf::from(require_value(args, "--credentials")?);
                }
                "--email" => parsed.email = Some(require_value(args, "--email")?),
                "--password" => parsed.password = Some(require_value(args, "--password")?),
                "--file" => parsed.file = Some(PathBuf::from(require_value(args, "--file")?)),
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                flag if flag.starts_with("--") => return Err(ArgsError::UnknownArg(arg)),
                _ => parsed.positional.push(arg),
            }
        }
        Ok(parsed)
    }

    fn lesson_id(&self) -> Result<LessonId, ArgsError> {
        let raw = self
            .positional
            .first()
            .ok_or(ArgsError::MissingLessonId)?;
        raw.parse()
            .map_err(|_| ArgsError::InvalidLessonId { raw: raw.clone() })
    }
}

fn default_credentials_path() -> PathBuf {
    std::env::var_os("LESSONS_CREDENTIALS_FILE")
        .map(PathBuf::from)
        .unwrap_or_else(|| {
            std::env::var_os("HOME")
                .map_or_else(|| PathBuf::from("."), PathBuf::from)
                .join(".lessons")
                .join("credentials.json")
        })
}

fn status_badge(status: CompletionStatus) -> &'static str {
    match status {
        CompletionStatus::NotStarted => "[ ]",
        CompletionStatus::Started => "[~]",
        CompletionStatus::Completed => "[x]",
    }
}

fn print_alert(services: &AppServices) {
    if let Some(alert) = services.session().current_alert() {
        eprintln!("{:?}: {}", alert.severity, alert.text);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv = std::env::args().skip(1);

    let cmd = match argv.next() {
        None => {
            print_usage();
            return Err(ArgsError::MissingCommand.into());
        }
        Some(first) if first == "--help" || first == "-h" => {
            print_usage();
            return Ok(());
        }
        Some(first) => Command::from_arg(&first).ok_or_else(|| {
            print_usage();
            ArgsError::UnknownCommand(first)
        })?,
    };

    let args = Args::parse(&mut argv).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let services = AppServices::new_http(
        HttpConfig::new(args.api_url.clone()),
        Clock::default_clock(),
        args.credentials.clone(),
    );

    // Every command except login starts from the persisted credential.
    if cmd != Command::Login {
        services.restore_session().await?;
    }

    match cmd {
        Command::Login => {
            let email = args
                .email
                .as_deref()
                .ok_or(ArgsError::MissingArgument { what: "--email" })?;
            let password = args
                .password
                .as_deref()
                .ok_or(ArgsError::MissingArgument { what: "--password" })?;
            let user = services.session().login(email, password).await?;
            println!("logged in as {}", user.display_name());
        }
        Command::Catalog => {
            let catalog = services.catalog();
            let mut records = Vec::new();
            if services.session().is_logged_in() {
                for entry in catalog.entries().await? {
                    if let Some(record) = services.progress().fetch(entry.id).await? {
                        records.push(record);
                    }
                }
            }
            for annotated in catalog.entries_with_status(&records).await? {
                println!(
                    "{} {:>4}  {}",
                    status_badge(annotated.status),
                    annotated.entry.id.value(),
                    annotated.entry.title
                );
            }
        }
        Command::Lesson => {
            let exercise = services.exercise();
            exercise.enter_lesson(args.lesson_id()?).await?;
            let state = exercise.state();
            if let Some(lesson) = state.lesson {
                println!("# {}", lesson.title());
                println!();
                println!("{}", lesson.content());
                if let Some(example) = lesson.code_example() {
                    println!();
                    println!("Example:");
                    println!("{example}");
                }
            }
            println!();
            println!("Your code:");
            println!("{}", state.code);
        }
        Command::Run => {
            let exercise = services.exercise();
            exercise.enter_lesson(args.lesson_id()?).await?;
            let code = match &args.file {
                Some(path) => std::fs::read_to_string(path)?,
                None => exercise.state().code,
            };
            match exercise.run_code(&code).await? {
                RunOutcome::Executed(result) => {
                    println!("{}", result.output);
                    if let Some(error) = &result.error {
                        eprintln!("{error}");
                    }
                    if let Some(lint) = &result.linter_output {
                        eprintln!("lint: {lint}");
                    }
                    print_alert(&services);
                    if result.status != ExecutionStatus::Success {
                        std::process::exit(1);
                    }
                }
                RunOutcome::AlreadyRunning => eprintln!("a run is already in progress"),
                RunOutcome::Superseded => eprintln!("run discarded: lesson changed"),
            }
        }
        Command::Notes => {
            let exercise = services.exercise();
            exercise.enter_lesson(args.lesson_id()?).await?;
            let text = args.positional[1..].join(" ");
            if text.is_empty() {
                return Err(ArgsError::MissingArgument { what: "note text" }.into());
            }
            exercise.save_notes(&text).await?;
            println!("notes saved");
        }
        Command::Bookmark => {
            let exercise = services.exercise();
            exercise.enter_lesson(args.lesson_id()?).await?;
            let bookmarked = exercise.toggle_bookmark().await?;
            println!(
                "{}",
                if bookmarked {
                    "bookmarked"
                } else {
                    "bookmark removed"
                }
            );
        }
        Command::Reset => {
            let exercise = services.exercise();
            exercise.enter_lesson(args.lesson_id()?).await?;
            exercise.reset_progress().await?;
            println!("progress reset");
        }
        Command::ResetAll => {
            services.progress().delete_all().await?;
            println!("all progress deleted");
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run().await {
        // At this layer, printing once is fine.
        eprintln!("{err}");
        std::process::exit(2);
    }
}
