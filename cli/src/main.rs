mod commands;
mod config;
mod logging;
mod server;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;

use crate::commands::{
    LogInput, ProfileInput, cmd_history, cmd_log, cmd_profile, cmd_summary, cmd_user_login,
    cmd_user_register,
};
use crate::config::Config;
use synclife_core::models::DailyMetrics;
use synclife_core::service::SyncLifeService;

#[derive(Parser)]
#[command(
    name = "synclife",
    version,
    about = "A local-first daily health tracker",
    long_about = "Log your day (weight, steps, sleep, food, mood) and see how it \
                  measures up against your goals."
)]
struct Cli {
    /// Account the entries belong to (email). Empty for single-user mode.
    #[arg(long, global = true, default_value = "")]
    user: String,
    /// Directory holding synclife.csv and users.csv
    #[arg(long, global = true, value_name = "PATH")]
    data_dir: Option<PathBuf>,
    /// More diagnostics on stderr (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
#[allow(clippy::large_enum_variant)]
enum Commands {
    /// Save the entry for a day, replacing any earlier one
    Log(LogArgs),
    /// Show the dashboard for a day (defaults to today)
    Summary {
        /// Date to show (YYYY-MM-DD or today/yesterday, default: today)
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List saved entries, newest first
    History {
        /// Only the last N days (default: all)
        #[arg(short, long, value_parser = clap::value_parser!(u32).range(1..))]
        days: Option<u32>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the current profile and goals
    Profile {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Manage accounts
    User {
        #[command(subcommand)]
        command: UserCommands,
    },
    /// Start the REST API server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "8080")]
        port: u16,
        /// Address to bind to (default: 127.0.0.1, use 0.0.0.0 to expose to network)
        #[arg(short, long, default_value = "127.0.0.1")]
        bind: String,
        /// Disable API key authentication (for development/testing)
        #[arg(long)]
        no_auth: bool,
    },
}

#[derive(Subcommand)]
enum UserCommands {
    /// Create an account. The password is read from stdin.
    Register {
        email: String,
        /// Display name
        name: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Check an account's password. The password is read from stdin.
    Login {
        email: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(clap::Args)]
struct LogArgs {
    /// Date to log for (YYYY-MM-DD or today/yesterday, default: today)
    #[arg(long)]
    date: Option<String>,

    /// Body weight in kg
    #[arg(long, default_value = "0")]
    weight: f64,
    #[arg(long, default_value = "0")]
    steps: i64,
    /// Whole hours slept
    #[arg(long, default_value = "0", value_parser = clap::value_parser!(i64).range(0..=24))]
    sleep_hours: i64,
    /// Extra minutes slept
    #[arg(long, default_value = "0", value_parser = clap::value_parser!(i64).range(0..=59))]
    sleep_minutes: i64,
    /// Calories eaten (kcal)
    #[arg(long, default_value = "0")]
    calories: i64,
    /// Protein (g)
    #[arg(long, default_value = "0")]
    protein: f64,
    /// Carbs (g)
    #[arg(long, default_value = "0")]
    carbs: f64,
    /// Fats (g)
    #[arg(long, default_value = "0")]
    fats: f64,
    /// Fiber (g)
    #[arg(long, default_value = "0")]
    fiber: f64,
    #[arg(long, default_value = "0")]
    tea_cups: i64,
    #[arg(long, default_value = "0")]
    toilet_visits: i64,
    #[arg(long, default_value = synclife_core::models::DEFAULT_WORKOUT)]
    workout: String,
    /// Supplement taken (repeatable)
    #[arg(long = "supplement", value_name = "NAME")]
    supplements: Vec<String>,
    /// Free-text supplement not in the list
    #[arg(long)]
    other_supplement: Option<String>,
    /// Fasting window, e.g. 16:8
    #[arg(long, default_value = synclife_core::models::DEFAULT_FASTING_WINDOW)]
    fasting: String,
    /// Journal entry (default: keep the day's existing notes)
    #[arg(long)]
    notes: Option<String>,
    #[arg(long, default_value = synclife_core::models::DEFAULT_MOOD)]
    mood: String,
    /// Photo or file to attach for this session (repeatable)
    #[arg(long, value_name = "PATH")]
    media: Vec<PathBuf>,

    /// Profile name (default: current profile)
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    age: Option<i64>,
    /// Male, Female or Other
    #[arg(long)]
    gender: Option<String>,
    /// Height in cm
    #[arg(long)]
    height: Option<f64>,
    /// Target weight in kg
    #[arg(long)]
    target_weight: Option<f64>,
    #[arg(long)]
    target_steps: Option<i64>,
    /// Target sleep in hours
    #[arg(long)]
    target_sleep: Option<f64>,
    /// Target water in litres
    #[arg(long)]
    target_water: Option<f64>,
    #[arg(long)]
    target_calories: Option<i64>,

    /// Output as JSON
    #[arg(long)]
    json: bool,
}

impl LogArgs {
    fn into_input(self) -> (LogInput, bool) {
        let input = LogInput {
            date: self.date,
            metrics: DailyMetrics {
                weight_kg: self.weight,
                steps: self.steps,
                sleep_hours: self.sleep_hours,
                sleep_minutes: self.sleep_minutes,
                calories: self.calories,
                protein_g: self.protein,
                carbs_g: self.carbs,
                fats_g: self.fats,
                fiber_g: self.fiber,
                tea_cups: self.tea_cups,
                toilet_visits: self.toilet_visits,
                workout: self.workout,
                supplements: self.supplements,
                other_supplement: self.other_supplement,
                fasting_window: self.fasting,
                notes: String::new(),
                mood: self.mood,
            },
            notes: self.notes,
            media: self.media,
            profile: ProfileInput {
                name: self.name,
                age: self.age,
                gender: self.gender,
                height: self.height,
                target_weight: self.target_weight,
                target_steps: self.target_steps,
                target_sleep: self.target_sleep,
                target_water: self.target_water,
                target_calories: self.target_calories,
            },
        };
        (input, self.json)
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let _logger = match logging::init(cli.verbose) {
        Ok(handle) => Some(handle),
        Err(e) => {
            eprintln!("Warning: {e:#}");
            None
        }
    };

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load(cli.data_dir)?;
    let mut svc = SyncLifeService::open(&config.data_dir);
    let user = cli.user.trim().to_lowercase();
    log::debug!("data directory {}", config.data_dir.display());

    match cli.command {
        Commands::Log(args) => {
            let (input, json) = args.into_input();
            cmd_log(&mut svc, &user, input, json)
        }
        Commands::Summary { date, json } => cmd_summary(&svc, &user, date, json),
        Commands::History { days, json } => cmd_history(&svc, &user, days, json),
        Commands::Profile { json } => cmd_profile(&svc, &user, json),
        Commands::User { command } => match command {
            UserCommands::Register { email, name, json } => {
                cmd_user_register(&svc, &email, &name, json)
            }
            UserCommands::Login { email, json } => cmd_user_login(&svc, &email, json),
        },
        Commands::Serve {
            port,
            bind,
            no_auth,
        } => {
            let (api_key, new_api_key) = if no_auth {
                (None, false)
            } else {
                let (key, new) = config.load_or_create_api_key()?;
                (Some(key), new)
            };
            server::start_server(svc, port, &bind, api_key, new_api_key).await
        }
    }
}
