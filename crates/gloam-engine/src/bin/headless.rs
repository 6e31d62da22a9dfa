//! Headless level runner: generate a level, run it for a number of ticks and
//! print the final state hash.
//!
//! Run with:
//!   cargo run -p gloam-engine --bin gloam-headless -- 600 --config sim.json
//!
//! Options:
//!   TICKS                 ticks to run (default 600)
//!   --config PATH         JSON `SimConfig`
//!   --templates DIR       entity templates (default: built-in Player/Lantern)
//!   --scripts DIR         *.wat / *.wasm modules (default: built-in `wander`)
//!
//! Logging follows `RUST_LOG` (default `warn`).

use std::path::PathBuf;

use anyhow::{bail, Context};
use gloam_engine::prelude::*;
use tracing_subscriber::EnvFilter;

const PLAYER_JSON: &str = include_str!("../../assets/templates/Player.json");
const LANTERN_JSON: &str = include_str!("../../assets/templates/Lantern.json");
const WANDER_WAT: &str = include_str!("../../assets/scripts/wander.wat");

#[derive(Debug)]
struct Args {
    ticks: u64,
    config: Option<PathBuf>,
    templates: Option<PathBuf>,
    scripts: Option<PathBuf>,
}

fn parse_args() -> anyhow::Result<Args> {
    let mut args = Args {
        ticks: 600,
        config: None,
        templates: None,
        scripts: None,
    };
    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        let mut value = |flag: &str| it.next().with_context(|| format!("{flag} needs a value"));
        match arg.as_str() {
            "--config" => args.config = Some(value("--config")?.into()),
            "--templates" => args.templates = Some(value("--templates")?.into()),
            "--scripts" => args.scripts = Some(value("--scripts")?.into()),
            flag if flag.starts_with("--") => bail!("unknown option {flag}"),
            n => args.ticks = n.parse().with_context(|| format!("invalid tick count {n:?}"))?,
        }
    }
    Ok(args)
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let args = parse_args()?;

    let config = match &args.config {
        Some(path) => SimConfig::load(path)?,
        None => SimConfig::default(),
    };

    let templates = match &args.templates {
        Some(dir) => TemplateLibrary::load_dir(dir)?,
        None => {
            let mut lib = TemplateLibrary::new();
            lib.insert_json("Player.json", PLAYER_JSON)?;
            lib.insert_json("Lantern.json", LANTERN_JSON)?;
            lib
        }
    };

    let mut runtime = ScriptRuntime::new(config.script.clone())?;
    match &args.scripts {
        Some(dir) => {
            let loaded = runtime.load_dir(dir)?;
            tracing::info!(loaded, dir = %dir.display(), "script modules loaded");
        }
        None => runtime.load("wander", WANDER_WAT.as_bytes())?,
    }

    let mut generator = RandomWalkGenerator::new(&config.world);
    let mut level = Level::new(&config, &mut generator, &templates, Some(Box::new(runtime)))?;

    let mut despawned = 0usize;
    for _ in 0..args.ticks {
        despawned += level
            .update()
            .iter()
            .filter(|a| matches!(a.outcome, Outcome::Despawned(..)))
            .count();
    }

    let sim = level.sim();
    let player = sim.world().get::<Physics>(level.player()).map(|p| p.pos);
    println!("ticks:      {}", sim.tick_count());
    println!("sim time:   {:.3}s", sim.sim_time());
    println!("entities:   {}", sim.world().entity_count());
    println!("despawned:  {despawned}");
    if let Some(pos) = player {
        println!("player:     ({:.1}, {:.1})", pos.x, pos.y);
    }
    println!("state hash: {}", sim.state_hash()?);
    Ok(())
}
