use std::fmt;

use clap::{Parser, Subcommand, ValueEnum};
use practice_core::model::{
    DifficultyLevel, ExerciseSettings, LearnerId, ModuleId, ModuleKey, OperationKind, RewardType,
};
use rand::SeedableRng;
use rand::rngs::StdRng;
use services::{AppServices, Clock};

mod play;

#[derive(Debug)]
enum ArgsError {
    InvalidDbUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

#[derive(Parser)]
#[command(name = "practice", version, about = "Adaptive arithmetic practice in the terminal")]
struct Cli {
    /// SQLite database URL or path.
    #[arg(long, global = true, env = "PRACTICE_DB_URL", default_value = "sqlite://practice.sqlite3")]
    db: String,

    /// Learner profile id.
    #[arg(long, global = true, env = "PRACTICE_LEARNER", default_value_t = 1)]
    learner: u64,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Practice one session.
    Run {
        #[command(flatten)]
        target: Target,

        /// Seed for reproducible problems.
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Show results and rewards for a module.
    Progress {
        #[command(flatten)]
        target: Target,

        /// Recent sessions to list.
        #[arg(long, default_value_t = 5)]
        limit: u32,
    },
    /// Show or change a module's exercise settings.
    Settings {
        #[command(flatten)]
        target: Target,

        #[arg(long)]
        difficulty: Option<DifficultyLevel>,
        #[arg(long)]
        problems: Option<u32>,
        /// Seconds per problem, 0 for no limit.
        #[arg(long)]
        time: Option<u32>,
        /// Attempts per problem, 0 for unlimited.
        #[arg(long)]
        attempts: Option<u32>,
        #[arg(long)]
        adaptive: Option<bool>,
        #[arg(long)]
        rewards: Option<bool>,
        /// stars, medals or trophies.
        #[arg(long)]
        reward_type: Option<RewardType>,
        #[arg(long)]
        show_answer: Option<bool>,
        #[arg(long)]
        compensation: Option<bool>,
        /// Auto-advance delay in seconds, 0 to turn it off.
        #[arg(long)]
        auto_advance: Option<u32>,
    },
}

#[derive(clap::Args, Clone)]
struct Target {
    #[arg(long, value_enum, default_value_t = Operation::Addition)]
    operation: Operation,

    /// Module id, defaults to the operation name.
    #[arg(long)]
    module: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Operation {
    Addition,
    Subtraction,
}

impl From<Operation> for OperationKind {
    fn from(value: Operation) -> Self {
        match value {
            Operation::Addition => OperationKind::Addition,
            Operation::Subtraction => OperationKind::Subtraction,
        }
    }
}

impl Target {
    fn key(&self, learner: LearnerId) -> Result<ModuleKey, Box<dyn std::error::Error>> {
        let operation = OperationKind::from(self.operation);
        let module = ModuleId::new(self.module.as_deref().unwrap_or(operation.as_str()))?;
        Ok(ModuleKey::new(learner, module))
    }
}

fn normalize_sqlite_url(raw: &str) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw.to_string();
    }

    let trimmed = raw.trim();
    let path_str = trimmed.strip_prefix("sqlite:").unwrap_or(trimmed);
    let path = std::path::Path::new(path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| std::path::PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

async fn show_progress(
    services: &AppServices,
    key: &ModuleKey,
    limit: u32,
) -> Result<(), Box<dyn std::error::Error>> {
    let progress = services.progress();
    let overall = progress.module_progress(key).await?;
    println!("Module {key}");
    println!("  sessions completed: {}", overall.total_completed);
    println!("  best score:         {:.0}%", overall.best_score);
    println!("  average score:      {:.0}%", overall.average_score);
    println!("  average time:       {:.0}s", overall.average_time);
    if let Some(last) = overall.last_attempt {
        println!("  last attempt:       {last}");
    }

    let recent = progress.recent_results(key, limit).await?;
    if !recent.is_empty() {
        println!("\nRecent sessions:");
        for summary in &recent {
            println!(
                "  {}  {:>3}/{:<3} {:>5}s  {}",
                summary.completed_at().format("%Y-%m-%d %H:%M"),
                summary.score(),
                summary.total_problems(),
                summary.time_spent_secs(),
                summary.difficulty()
            );
        }
    }

    let ledger = services.reward_ledger(key).await?;
    println!(
        "\nRewards: {} earned, {} new",
        ledger.earned().len(),
        ledger.new_count()
    );
    for collection in ledger.collections() {
        let marker = if collection.is_complete { " (complete)" } else { "" };
        println!("  {:<20} {:>3}%{marker}", collection.id, collection.progress);
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn update_settings(
    services: &AppServices,
    key: &ModuleKey,
    difficulty: Option<DifficultyLevel>,
    problems: Option<u32>,
    time: Option<u32>,
    attempts: Option<u32>,
    adaptive: Option<bool>,
    rewards: Option<bool>,
    reward_type: Option<RewardType>,
    show_answer: Option<bool>,
    compensation: Option<bool>,
    auto_advance: Option<u32>,
) -> Result<(), Box<dyn std::error::Error>> {
    let current = services.settings(key).await?;
    let mut draft = current.to_draft();
    if let Some(value) = difficulty {
        draft.difficulty = value;
    }
    if let Some(value) = problems {
        draft.problem_count = value;
    }
    if let Some(value) = time {
        draft.time_value_per_problem = value;
    }
    if let Some(value) = attempts {
        draft.max_attempts = value;
    }
    if let Some(value) = adaptive {
        draft.enable_adaptive_difficulty = value;
    }
    if let Some(value) = rewards {
        draft.enable_rewards = value;
    }
    if let Some(value) = reward_type {
        draft.reward_type = value;
    }
    if let Some(value) = show_answer {
        draft.show_answer = value;
    }
    if let Some(value) = compensation {
        draft.enable_compensation = value;
    }
    if let Some(value) = auto_advance {
        draft.auto_advance = value > 0;
        if value > 0 {
            draft.auto_advance_delay_secs = value;
        }
    }

    let updated = ExerciseSettings::new(draft)?;
    if updated != current {
        services.save_settings(key, &updated).await?;
    }
    println!("{}", serde_json::to_string_pretty(&updated)?);
    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let learner = LearnerId::new(cli.learner);

    // Open + migrate SQLite at startup. Keep this in the binary glue so core/services stay pure.
    let db_url = normalize_sqlite_url(&cli.db);
    prepare_sqlite_file(&db_url)?;
    let services = AppServices::new_sqlite(&db_url, Clock::system()).await?;

    match cli.command.unwrap_or(Command::Run {
        target: Target {
            operation: Operation::Addition,
            module: None,
        },
        seed: None,
    }) {
        Command::Run { target, seed } => {
            let key = target.key(learner)?;
            let rng = seed.map_or_else(StdRng::from_os_rng, StdRng::seed_from_u64);
            play::play(&services, key, target.operation.into(), rng).await
        }
        Command::Progress { target, limit } => {
            show_progress(&services, &target.key(learner)?, limit).await
        }
        Command::Settings {
            target,
            difficulty,
            problems,
            time,
            attempts,
            adaptive,
            rewards,
            reward_type,
            show_answer,
            compensation,
            auto_advance,
        } => {
            update_settings(
                &services,
                &target.key(learner)?,
                difficulty,
                problems,
                time,
                attempts,
                adaptive,
                rewards,
                reward_type,
                show_answer,
                compensation,
                auto_advance,
            )
            .await
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    if let Err(err) = run().await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err}");
        std::process::exit(2);
    }
}
