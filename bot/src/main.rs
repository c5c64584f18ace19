use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use cavebot::control_api::{ApiState, resolve_api_addr, serve, stop_on};
use cavebot::{
    BotConfig, Bot, ChapterId, CsvStatistics, EnergyStrategy, HealingStrategy,
    Notifier, RunEnd, SettingsStore, SharedSettings, StatisticsSummary, StatusBoard, TierList,
};
use cavebot_engine::adb::AdbExecutor;
use cavebot_engine::helper::HelperClassifier;
use cavebot_engine::scripted::{RecordingExecutor, ScriptedClassifier};
use cavebot_engine::{
    ActionExecutor, CoordinateLibrary, CoordinateTable, FrameClassifier, ManualClock, Pacer,
    Resolution, RunSignal,
};
use clap::{Args, Parser, Subcommand};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "cavebot")]
#[command(about = "Farms dungeon chapters on an Android device over adb")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Start the run loop.
    Run(RunArgs),
    /// Summarise the statistics file.
    Stats {
        #[arg(long, default_value = ".")]
        data_dir: PathBuf,
        #[arg(long)]
        stats: Option<PathBuf>,
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    Settings {
        #[arg(long)]
        settings: Option<PathBuf>,
        #[command(subcommand)]
        action: SettingsAction,
    },
}

#[derive(Debug, Args)]
struct RunArgs {
    /// Folder holding coords/, abilities/ and datas/.
    #[arg(long, default_value = ".")]
    data_dir: PathBuf,
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    settings: Option<PathBuf>,
    #[arg(long)]
    stats: Option<PathBuf>,
    /// Switch to this chapter before starting; the choice is saved.
    #[arg(long)]
    chapter: Option<ChapterId>,
    /// Replay a classifier script instead of talking to a device.
    #[arg(long, value_name = "SCRIPT")]
    dry_run: Option<PathBuf>,
    #[arg(long)]
    adb_serial: Option<String>,
    #[arg(long, default_value = "cavebot-classifier")]
    classifier_cmd: String,
    /// Serve the control API. Without a value the address comes from
    /// CAVEBOT_API_ADDR / CAVEBOT_API_PORT.
    #[arg(long, value_name = "ADDR", num_args = 0..=1)]
    api: Option<Option<SocketAddr>>,
}

#[derive(Debug, Subcommand)]
enum SettingsAction {
    Show,
    Set { key: String, value: String },
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run(args) => cmd_run(args),
        Commands::Stats {
            data_dir,
            stats,
            json,
        } => {
            let statistics = match stats {
                Some(path) => CsvStatistics::new(path),
                None => CsvStatistics::in_data_dir(&data_dir),
            };
            cmd_stats(statistics, json)
        }
        Commands::Settings { settings, action } => cmd_settings(settings, action),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn settings_store(path: Option<PathBuf>) -> SettingsStore {
    path.map(SettingsStore::at)
        .unwrap_or_else(SettingsStore::from_env)
}

fn cmd_run(args: RunArgs) -> Result<()> {
    let config = BotConfig::load(args.config.as_deref())?;
    let notifier = Notifier::new();
    let status = StatusBoard::attach(&notifier);
    let store = settings_store(args.settings.clone());
    info!("settings at {}", store.path().display());
    let settings = SharedSettings::open(store, notifier);

    if let Some(chapter) = args.chapter {
        settings.set_chapter(chapter)?;
    }

    let statistics = match &args.stats {
        Some(path) => CsvStatistics::new(path.clone()),
        None => CsvStatistics::in_data_dir(&args.data_dir),
    };
    info!("statistics at {}", statistics.path().display());

    let tiers = TierList::load(&args.data_dir).unwrap_or_else(|e| {
        warn!("{e:#}; unknown abilities fall back to the left pick");
        TierList::default()
    });

    let signal = RunSignal::new();
    // Background tasks only; the run loop itself stays blocking on this thread.
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to build the tokio runtime")?;
    runtime.spawn(stop_on(tokio::signal::ctrl_c(), signal.clone()));

    if let Some(addr) = args.api {
        let addr = addr.unwrap_or_else(|| resolve_api_addr(|key| std::env::var(key).ok()));
        let state = ApiState {
            settings: settings.clone(),
            status,
            signal: signal.clone(),
        };
        runtime.spawn(async move {
            if let Err(e) = serve(addr, state).await {
                error!("{e:#}");
            }
        });
    }

    let (classifier, executor, pacer): (Box<dyn FrameClassifier>, Box<dyn ActionExecutor>, Pacer) =
        match &args.dry_run {
            Some(script) => {
                info!("dry run, replaying {}", script.display());
                let classifier: Box<dyn FrameClassifier> = Box::new(
                    ScriptedClassifier::from_file(script)
                        .with_context(|| format!("failed to load script {}", script.display()))?,
                );
                let executor: Box<dyn ActionExecutor> =
                    Box::new(RecordingExecutor::new(Resolution::default()).echoing());
                (classifier, executor, Pacer::new(ManualClock::new(), signal.clone()))
            }
            None => {
                if !AdbExecutor::available() {
                    warn!("adb did not answer; is it on PATH or set in CAVEBOT_ADB_BIN?");
                }
                let classifier: Box<dyn FrameClassifier> = Box::new(
                    HelperClassifier::spawn(&args.classifier_cmd)
                        .with_context(|| format!("failed to start '{}'", args.classifier_cmd))?,
                );
                let executor: Box<dyn ActionExecutor> =
                    Box::new(AdbExecutor::new(args.adb_serial.clone()));
                (classifier, executor, Pacer::system(signal.clone()))
            }
        };

    let mut bot = Bot::new(
        classifier,
        executor,
        CoordinateTable::default(),
        pacer,
        settings,
        statistics,
    )
    .with_config(config)
    .with_tier_list(tiers);

    bot.connect(&CoordinateLibrary::new(&args.data_dir))
        .context("failed to load coordinates")?;

    loop {
        match bot.run().context("run loop failed")? {
            RunEnd::Completed | RunEnd::Stopped => break,
            RunEnd::Paused => {
                info!("paused, waiting for start or stop");
                if !bot.pacer().wait_for_resume() {
                    info!("stopped while paused");
                    break;
                }
                info!("resuming");
            }
        }
    }
    Ok(())
}

fn cmd_stats(statistics: CsvStatistics, json: bool) -> Result<()> {
    let records = statistics.read_all()?;
    let summary = StatisticsSummary::from_records(&records);
    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("{}", statistics.path().display());
    println!(
        "{} sessions, {} won, best level {}, {}h{:02}m played",
        summary.sessions,
        summary.wins,
        summary.best_level,
        summary.total_seconds / 3600,
        (summary.total_seconds % 3600) / 60
    );
    for (outcome, count) in &summary.outcomes {
        println!("  {outcome:<18} {count}");
    }
    Ok(())
}

fn cmd_settings(path: Option<PathBuf>, action: SettingsAction) -> Result<()> {
    let settings = SharedSettings::open(settings_store(path), Notifier::new());
    if let SettingsAction::Set { key, value } = action {
        apply_setting(&settings, &key, &value)?;
    }
    println!("{}", serde_json::to_string_pretty(&settings.snapshot())?);
    Ok(())
}

fn apply_setting(settings: &SharedSettings, key: &str, value: &str) -> Result<()> {
    let flag = || {
        value
            .parse::<bool>()
            .with_context(|| format!("{key} expects true or false, got '{value}'"))
    };
    match key {
        "healing_strategy" => settings.set_healing_strategy(value.parse::<HealingStrategy>()?),
        "energy_strategy" => settings.set_energy_strategy(value.parse::<EnergyStrategy>()?),
        "vip_sub" => settings.set_vip_sub(flag()?),
        "battlepass_adv_sub" => settings.set_battlepass_adv_sub(flag()?),
        "revive_if_dead" => settings.set_revive_if_dead(flag()?),
        "selected_dungeon" | "chapter" => {
            let chapter: ChapterId = value
                .parse()
                .with_context(|| format!("'{value}' is not a chapter number"))?;
            settings.set_chapter(chapter)?;
        }
        "abilities_threshold" => settings.set_abilities_threshold(
            value
                .parse()
                .with_context(|| format!("'{value}' is not a number"))?,
        ),
        other => bail!("unknown setting '{other}'"),
    }
    Ok(())
}
