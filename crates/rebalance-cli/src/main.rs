//! Runs a balance session against a world fixture and prints what happened.
//!
//! The binary plays the host: it loads the world, connects the fixture's
//! participants, starts the controller, advances simulated time so queued
//! broadcasts go out, optionally runs operator commands and a reload, and
//! finally ends the session.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Deserialize;
use tracing::{info, warn};

use rebalance_core::host::{Participant, TeamId};
use rebalance_core::{
    ApplyReport, AuditLog, FileConfigSource, LifecycleController, LoopbackTransport, MemoryStore,
    OperatorCommand, Session, SyncStore, World,
};

type Controller = LifecycleController<FileConfigSource, MemoryStore, LoopbackTransport>;

const TICK: Duration = Duration::from_millis(100);

#[derive(Parser, Debug)]
#[command(author, version, about = "Apply a balance config to a world fixture", long_about = None)]
struct Cli {
    /// World fixture (units, shared assets, teams, participants).
    #[arg(long, default_value = "demos/world.json")]
    world: PathBuf,
    /// Balance configuration.
    #[arg(long, default_value = "demos/balance.json")]
    config: PathBuf,
    /// Operator command to run after start, e.g. "set Scout cost_mult 0.5".
    #[arg(long = "command", short = 'c')]
    commands: Vec<String>,
    /// Run `rebalance` after the commands.
    #[arg(long)]
    reload: bool,
    /// Simulated seconds to run after each transition.
    #[arg(long, default_value_t = 5.0)]
    seconds: f32,
    /// Start with the override store unavailable.
    #[arg(long)]
    direct: bool,
}

#[derive(Debug, Deserialize)]
struct Fixture {
    world: World,
    #[serde(default)]
    participants: Vec<String>,
    #[serde(default)]
    spawns: Vec<Spawn>,
}

#[derive(Debug, Deserialize)]
struct Spawn {
    unit: String,
    team: TeamId,
}

fn load_session(path: &Path) -> Result<Session> {
    let text = fs::read_to_string(path).with_context(|| format!("reading world fixture {}", path.display()))?;
    let fixture: Fixture =
        serde_json::from_str(&text).with_context(|| format!("parsing world fixture {}", path.display()))?;

    let mut session = Session::new(fixture.world);
    for spawn in &fixture.spawns {
        if session.world.spawn_live(&spawn.unit, spawn.team).is_none() {
            warn!(unit = %spawn.unit, team = %spawn.team, "fixture spawn names an unknown unit");
        }
    }
    session.join(Participant::server(0));
    for (id, name) in (1u64..).zip(fixture.participants) {
        session.join(Participant::remote(id, name));
    }
    Ok(session)
}

fn run_for(controller: &mut Controller, session: &Session, seconds: f32) {
    let ticks = (Duration::from_secs_f32(seconds.max(0.0)).as_millis() / TICK.as_millis()).max(1);
    for _ in 0..ticks {
        for (participant, report) in controller.update(TICK, session) {
            println!(
                "  t={:>5.1}s  sync -> {participant}: {}/{} targets{}",
                controller.elapsed().as_secs_f32(),
                report.sent,
                report.total,
                if report.failed.is_empty() { "" } else { " (some failed)" }
            );
        }
    }
}

fn print_report(title: &str, report: Option<&ApplyReport>) {
    println!("{title}");
    let Some(report) = report else {
        println!("  (nothing applied)");
        return;
    };
    for (label, counts) in report.labels() {
        println!(
            "  {label:<28} store {:>3}  direct {:>3}  skipped {:>3}",
            counts.via_store, counts.direct, counts.skipped
        );
    }
    println!(
        "  {:<28} store {:>3}  direct {:>3}  skipped {:>3}",
        "total",
        report.total_via_store(),
        report.total_direct(),
        report.total_skipped()
    );
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let mut session = load_session(&cli.world)?;
    let store = if cli.direct {
        MemoryStore::unavailable()
    } else {
        MemoryStore::from_world(&session.world)
    };
    let mut controller = Controller::new(
        FileConfigSource::new(&cli.config),
        store,
        LoopbackTransport::default(),
    );

    controller
        .on_session_start(&mut session)
        .with_context(|| format!("starting session with {}", cli.config.display()))?;
    print_report("Session start", controller.last_report());
    run_for(&mut controller, &session, cli.seconds);

    let operator = session
        .participants()
        .iter()
        .find(|p| !p.is_server)
        .or_else(|| session.participants().first())
        .cloned()
        .context("fixture has no participants")?;
    let mut audit = AuditLog::new();
    for line in &cli.commands {
        let command = OperatorCommand::parse(line).with_context(|| format!("parsing command {line:?}"))?;
        let reply = command
            .execute(&mut controller, &mut session, &operator, &mut audit)
            .with_context(|| format!("running command {line:?}"))?;
        println!("> {line}\n  {reply}");
        if matches!(command, OperatorCommand::Rebalance { .. }) {
            run_for(&mut controller, &session, cli.seconds);
        }
    }

    if cli.reload {
        controller.rebalance(&mut session, false).context("reloading balance")?;
        print_report("Reload", controller.last_report());
        run_for(&mut controller, &session, cli.seconds);
    }

    for line in audit.lines() {
        println!("audit {line}");
    }
    info!(
        overrides = controller.store().overrides().len(),
        direct_only = controller.is_direct_only(),
        "ending session"
    );
    controller.on_session_end(&mut session);
    Ok(())
}
