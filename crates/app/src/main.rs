use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use learn_core::model::{CourseId, Lesson, LessonId, ProgressUpdate};
use learn_core::{Clock, EngineConfig, LessonProgressEngine};
use services::{CourseProgressService, LessonLoopService, LessonSession, SessionEvents};
use storage::repository::{CourseRepository, LessonRepository, Storage};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod sample;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidTick { raw: String },
    InvalidLessonId { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidTick { raw } => write!(f, "invalid --tick-secs value: {raw}"),
            ArgsError::InvalidLessonId { raw } => write!(f, "invalid --free-nav value: {raw}"),
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
    eprintln!("  cargo run -p app -- demo   [options]");
    eprintln!("  cargo run -p app -- replay --lesson <lesson.json> --updates <updates.json> [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --free-nav <lesson-id>   unlock every section of that lesson (repeatable)");
    eprintln!("  --tick-secs <n>          section time tracker period (default 10)");
    eprintln!("  --no-auto-advance        stay on a section after it completes");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  LEARN_FREE_NAV_LESSONS (comma separated), LEARN_TIME_TICK_SECS, RUST_LOG");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Demo,
    Replay,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "demo" => Some(Self::Demo),
            "replay" => Some(Self::Replay),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
struct Args {
    config: EngineConfig,
    lesson_path: Option<PathBuf>,
    updates_path: Option<PathBuf>,
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut config = EngineConfig::default();
        if let Ok(raw) = std::env::var("LEARN_FREE_NAV_LESSONS") {
            config.free_navigation_lessons = parse_lesson_list(&raw)?;
        }
        if let Ok(raw) = std::env::var("LEARN_TIME_TICK_SECS") {
            config.time_tick = parse_tick(raw)?;
        }

        let mut parsed = Self::default();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--free-nav" => {
                    let value = require_value(args, "--free-nav")?;
                    let id: LessonId = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidLessonId { raw: value.clone() })?;
                    config.free_navigation_lessons.insert(id);
                }
                "--tick-secs" => {
                    config.time_tick = parse_tick(require_value(args, "--tick-secs")?)?;
                }
                "--no-auto-advance" => config.auto_advance = false,
                "--lesson" => {
                    parsed.lesson_path = Some(require_value(args, "--lesson")?.into());
                }
                "--updates" => {
                    parsed.updates_path = Some(require_value(args, "--updates")?.into());
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        parsed.config = config;
        Ok(parsed)
    }
}

fn parse_tick(raw: String) -> Result<Duration, ArgsError> {
    match raw.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(ArgsError::InvalidTick { raw }),
    }
}

fn parse_lesson_list(raw: &str) -> Result<BTreeSet<LessonId>, ArgsError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse().map_err(|_| ArgsError::InvalidLessonId { raw: s.to_owned() })
        })
        .collect()
}

fn log_events(events: &SessionEvents) {
    for section_id in &events.completed_sections {
        info!(%section_id, "section completed");
    }
    for achievement in &events.new_achievements {
        info!(id = %achievement.id, points = achievement.points, "achievement unlocked: {}", achievement.title);
    }
    if events.lesson_completed {
        info!("lesson completed");
    }
}

async fn run_demo(config: EngineConfig) -> Result<(), Box<dyn std::error::Error>> {
    let clock = Clock::system();
    let storage = Storage::in_memory();
    let lesson = sample::sample_lesson()?;
    let course = sample::sample_course()?;
    storage.lessons.upsert_lesson(&lesson).await?;
    storage.courses.upsert_course(&course).await?;

    let lesson_loop = LessonLoopService::new(
        clock,
        config,
        storage.lessons.clone(),
        storage.progress.clone(),
    );
    let mut active = lesson_loop.start_lesson(lesson.id()).await?;

    log_events(&lesson_loop.perform(&mut active, LessonSession::request_manual_completion).await?);
    for interaction in ["orbit", "pan", "zoom"] {
        let events = lesson_loop
            .perform(&mut active, |s| Ok(s.record_interaction(interaction)))
            .await?;
        log_events(&events);
    }
    log_events(&lesson_loop.perform(&mut active, |s| s.record_quiz("checkpoint-1", 55.0)).await?);
    log_events(&lesson_loop.perform(&mut active, |s| s.record_quiz("checkpoint-1", 85.0)).await?);
    log_events(&lesson_loop.perform(&mut active, |s| Ok(s.record_time(120))).await?);

    let overview = active.session().overview();
    info!(
        completed = overview.completed_sections,
        total = overview.total_sections,
        points = overview.points,
        "lesson overview"
    );
    let progress = lesson_loop.finish(active).await?;

    let dashboard = CourseProgressService::new(storage.courses.clone(), storage.progress.clone())
        .dashboard(&CourseId::new(sample::SAMPLE_COURSE_ID))
        .await?;

    println!("{}", serde_json::to_string_pretty(&progress)?);
    println!("{}", serde_json::to_string_pretty(&dashboard)?);
    Ok(())
}

fn run_replay(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let (Some(lesson_path), Some(updates_path)) = (args.lesson_path, args.updates_path) else {
        return Err(ArgsError::MissingValue {
            flag: "--lesson/--updates",
        }
        .into());
    };
    let lesson: Lesson = serde_json::from_str(&std::fs::read_to_string(lesson_path)?)?;
    let updates: Vec<ProgressUpdate> =
        serde_json::from_str(&std::fs::read_to_string(updates_path)?)?;

    let engine = LessonProgressEngine::new(lesson, args.config);
    let mut session = LessonSession::start(engine, Clock::system());
    for update in updates {
        let kind = update.kind.name();
        let events = session.apply(update);
        if !events.applied {
            warn!(kind, "update ignored");
        }
        log_events(&events);
    }

    println!("{}", serde_json::to_string_pretty(session.progress())?);
    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv: Vec<String> = std::env::args().skip(1).collect();

    let cmd = match argv.first().map(String::as_str) {
        None => Command::Demo,
        Some("--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some(first) if first.starts_with("--") => Command::Demo,
        Some(first) => Command::from_arg(first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "unknown subcommand")
        })?,
    };
    if !argv.is_empty() && !argv[0].starts_with("--") {
        argv.remove(0);
    }

    let mut iter = argv.into_iter();
    let args = Args::parse(&mut iter).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;
    args.config.clone().validate()?;

    match cmd {
        Command::Demo => run_demo(args.config).await,
        Command::Replay => run_replay(args),
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
