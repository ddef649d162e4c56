//! Headless voxel world server.
#![forbid(unsafe_code)]

mod config;
mod sink;
mod watch;

use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::Parser;
use crossbeam_channel::{Receiver, RecvTimeoutError, unbounded};
use strata_blocks::{BlockRegistry, SharedBlocks};
use strata_runtime::{ActionKind, ActionQueue, Scheduler, WorldRegistry};
use strata_world::ViewerSink;

use config::ServerConfig;
use sink::LogSink;
use watch::BlocksWatcher;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server config file
    #[arg(long, default_value = "strata.toml")]
    config: PathBuf,

    /// Override the data directory from the config
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Shut down after this many seconds instead of waiting for `stop`
    #[arg(long)]
    run_secs: Option<u64>,

    /// Debug logging
    #[arg(long)]
    verbose: bool,
}

enum Command {
    Stop,
    Save,
    Worlds,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let default_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let mut cfg = ServerConfig::load(&args.config)?;
    if let Some(dir) = args.data_dir {
        cfg.data_dir = dir;
    }
    let config_dir = args.config.parent().map(PathBuf::from).unwrap_or_default();
    let blocks_path = cfg.blocks_path(&config_dir);

    let blocks = match &blocks_path {
        Some(path) => SharedBlocks::new(
            BlockRegistry::load_from_path(path)
                .with_context(|| format!("loading block table {}", path.display()))?,
        ),
        None => SharedBlocks::default(),
    };
    log::info!("{} block types defined", blocks.current().defined_count());

    let registry = Arc::new(WorldRegistry::new(
        &cfg.data_dir,
        blocks.clone(),
        cfg.world_settings(),
    ));
    let list = registry.load_map_list().context("reading map list")?;
    for entry in &list.maps {
        if let Err(e) = registry.load_registered(entry.id) {
            log::error!("world {} '{}' failed to load: {e}", entry.id, entry.name);
        }
    }

    let sink = Arc::new(LogSink::new());
    let dyn_sink: Arc<dyn ViewerSink> = sink.clone();
    let mut scheduler = Scheduler::start(
        Arc::clone(&registry),
        Arc::clone(&dyn_sink),
        cfg.scheduler(),
    )
    .context("starting tick pool")?;
    let mut actions =
        ActionQueue::start(Arc::clone(&registry), dyn_sink).context("starting action worker")?;

    if list.maps.is_empty() {
        let id = registry.next_free_id();
        let world = registry.add(id, &cfg.default_world.name, cfg.default_dims())?;
        let interval = Duration::from_secs(cfg.autosave_secs);
        world.update_meta(|m| m.save_interval = interval);
        if !cfg.default_world.fill.is_empty() {
            actions.submit(
                id,
                ActionKind::Fill {
                    hook: cfg.default_world.fill.clone(),
                    args: String::new(),
                },
            );
        }
        actions.submit(id, ActionKind::Save { to: None });
        registry.save_map_list()?;
    }

    let watcher = match (&blocks_path, cfg.watch_blocks) {
        (Some(path), true) => match BlocksWatcher::start(path) {
            Ok(w) => Some(w),
            Err(e) => {
                log::warn!("block table watcher unavailable: {e}");
                None
            }
        },
        _ => None,
    };

    let commands = spawn_console();
    let deadline = args
        .run_secs
        .map(|s| Instant::now() + Duration::from_secs(s));
    let poll = Duration::from_millis(cfg.action_poll_ms.max(1));
    log::info!("server running; type `stop` to shut down");

    loop {
        for outcome in actions.drain_results() {
            if let Err(e) = outcome.result {
                log::warn!(
                    "world {}: {} failed: {e}",
                    outcome.world,
                    outcome.kind.label()
                );
            }
        }
        if let Some(w) = &watcher {
            w.poll(&blocks);
        }
        if deadline.is_some_and(|d| Instant::now() >= d) {
            break;
        }
        match commands.recv_timeout(poll) {
            Ok(Command::Stop) => break,
            Ok(Command::Save) => {
                let failed = registry.save_all();
                if failed > 0 {
                    log::error!("{failed} world(s) failed to save");
                }
            }
            Ok(Command::Worlds) => {
                for world in registry.loaded_worlds() {
                    let d = world.dims();
                    log::info!(
                        "world {} '{}' {}x{}x{} viewers={} dirty={}",
                        world.id(),
                        world.name(),
                        d.x,
                        d.y,
                        d.z,
                        world.viewer_count(),
                        world.is_dirty()
                    );
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => thread::sleep(poll),
        }
    }

    log::info!("shutting down");
    scheduler.stop();
    actions.shutdown();
    for outcome in actions.drain_results() {
        if let Err(e) = outcome.result {
            log::warn!("world {}: {} failed: {e}", outcome.world, outcome.kind.label());
        }
    }
    let failed = registry.save_all();
    registry.save_map_list()?;
    log::info!(
        "sent {} block update(s) and {} snapshot(s)",
        sink.updates_sent(),
        sink.snapshots_sent()
    );
    if failed > 0 {
        anyhow::bail!("{failed} world(s) failed to save");
    }
    Ok(())
}

/// Reads operator commands from stdin. EOF is ignored so the server keeps
/// running when detached.
fn spawn_console() -> Receiver<Command> {
    let (tx, rx) = unbounded();
    let spawned = thread::Builder::new()
        .name("strata-console".into())
        .spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                let Ok(line) = line else { break };
                let cmd = match line.trim() {
                    "stop" => Command::Stop,
                    "save" => Command::Save,
                    "worlds" => Command::Worlds,
                    "" => continue,
                    other => {
                        log::warn!("unknown command '{other}' (stop, save, worlds)");
                        continue;
                    }
                };
                if tx.send(cmd).is_err() {
                    break;
                }
            }
        });
    if let Err(e) = spawned {
        log::warn!("console unavailable: {e}");
    }
    rx
}
