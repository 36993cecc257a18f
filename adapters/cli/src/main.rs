#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that runs headless Tower Duel matches and LAN duels.

mod autopilot;
mod config;

use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    path::PathBuf,
    thread,
    time::{Duration, Instant},
};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tower_duel_core::WELCOME_BANNER;
use tower_duel_multiplayer::Duel;
use tower_duel_network::{discovery, DiscoveryHost, Session, SessionStatus};
use tower_duel_simulation::{InputSource, Simulation};
use tower_duel_world::MatchState;
use tracing_subscriber::EnvFilter;

use crate::{autopilot::Autopilot, config::Config};

const MAX_DISCOVERED_SESSIONS: usize = 8;

#[derive(Parser, Debug)]
#[command(name = "tower-duel", version, about = "Headless Tower Duel matches and LAN duels")]
struct Cli {
    /// TOML file with `[session]` and `[simulation]` settings.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Seed for the match's random source; overrides the config file.
    #[arg(long, global = true)]
    seed: Option<u64>,
    /// Frames to simulate before exiting.
    #[arg(long, global = true, default_value_t = 3_600)]
    frames: u64,
    /// Frames per second of the fixed-step loop; overrides the config file.
    #[arg(long, global = true)]
    tick_rate: Option<u32>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Play a solo match as fast as possible
    Solo,
    /// Wait for an opponent, then duel
    Host,
    /// Connect to a host and duel
    Join {
        /// Host address, `ip` or `ip:port`.
        address: String,
    },
    /// List hosts answering on the local network
    Discover {
        /// Milliseconds to wait for answers.
        #[arg(long, default_value_t = 2_000)]
        timeout_ms: u64,
    },
}

fn main() -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;
    let seed = cli.seed.unwrap_or(config.simulation.seed);
    let tick_rate = cli.tick_rate.unwrap_or(config.simulation.tick_rate);
    if tick_rate == 0 {
        bail!("--tick-rate must be at least 1");
    }
    let dt = 1.0 / tick_rate as f32;

    println!("{WELCOME_BANNER}");
    match cli.command {
        Command::Solo => run_solo(seed, dt, cli.frames),
        Command::Host => host(&config, seed, dt, cli.frames),
        Command::Join { address } => {
            let address = resolve(&address, config.session.game_port)?;
            let session = Session::connect(address, config.session_config())
                .with_context(|| format!("could not join {address}"))?;
            run_duel(session, seed, dt, cli.frames)
        }
        Command::Discover { timeout_ms } => {
            let sessions = discovery::find_sessions(
                config.session.discovery_port,
                Duration::from_millis(timeout_ms),
                MAX_DISCOVERED_SESSIONS,
            )
            .context("session discovery failed")?;
            if sessions.is_empty() {
                println!("no sessions found");
            }
            for session in sessions {
                println!("{}\t{}", session.name, session.address());
            }
            Ok(())
        }
    }
}

fn resolve(address: &str, default_port: u16) -> Result<SocketAddr> {
    if let Ok(address) = address.parse::<SocketAddr>() {
        return Ok(address);
    }
    let ip: IpAddr = address
        .parse()
        .with_context(|| format!("'{address}' is not an ip or ip:port"))?;
    Ok(SocketAddr::new(ip, default_port))
}

fn run_solo(seed: u64, dt: f32, frames: u64) -> Result<()> {
    let mut simulation = Simulation::new(seed);
    let mut pilot = Autopilot::default();
    simulation.run(&mut pilot, dt, frames);
    println!("{}", summary("solo", simulation.world().state()));
    Ok(())
}

fn host(config: &Config, seed: u64, dt: f32, frames: u64) -> Result<()> {
    let port = config.session.game_port;
    let mut session = Session::host((Ipv4Addr::UNSPECIFIED, port), config.session_config())
        .context("could not host a duel")?;
    let mut announcer =
        match DiscoveryHost::bind(config.session.discovery_port, &config.session.host_name, port) {
            Ok(announcer) => Some(announcer),
            Err(error) => {
                tracing::warn!(%error, "not discoverable on the local network");
                None
            }
        };

    let frame = Duration::from_secs_f32(dt);
    loop {
        if let Some(host) = announcer.as_mut() {
            if let Err(error) = host.poll() {
                tracing::warn!(%error, "discovery stopped");
                announcer = None;
            }
        }
        match session.poll_accept() {
            SessionStatus::Connected => break,
            SessionStatus::Listening => thread::sleep(frame),
            status => bail!("no opponent joined ({status:?})"),
        }
    }
    drop(announcer);
    run_duel(session, seed, dt, frames)
}

fn run_duel(session: Session, seed: u64, dt: f32, frames: u64) -> Result<()> {
    let mut duel = Duel::new(session, seed);
    let mut pilot = Autopilot::duelist();
    let frame = Duration::from_secs_f32(dt);

    for _ in 0..frames {
        let started = Instant::now();
        let input = pilot.next_frame(duel.local().world(), dt);
        let report = duel.tick(&input);
        if let Some(tier) = report.gift {
            tracing::debug!(?tier, "gift bought");
        }
        if let Some(rest) = frame.checked_sub(started.elapsed()) {
            thread::sleep(rest);
        }
    }

    duel.leave();
    println!("{}", summary("you", duel.local().world().state()));
    println!("{}", summary("opponent", duel.remote().world().state()));
    Ok(())
}

fn summary(label: &str, state: &MatchState) -> String {
    let wave = state
        .current_wave
        .map_or_else(|| "-".to_owned(), |wave| wave.saturating_add(1).to_string());
    format!(
        "{label}: wave {wave}, lives {}, money {}, defeated {}, {:?}",
        state.lives, state.money, state.enemies_defeated, state.phase
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_address_defaults_to_the_game_port() {
        assert_eq!(
            resolve("192.168.1.20", 7777).expect("resolve"),
            "192.168.1.20:7777".parse().expect("addr")
        );
        assert_eq!(
            resolve("10.0.0.2:9000", 7777).expect("resolve"),
            "10.0.0.2:9000".parse().expect("addr")
        );
        assert!(resolve("not-an-address", 7777).is_err());
    }

    #[test]
    fn summary_reports_waves_from_one() {
        let state = MatchState {
            current_wave: Some(2),
            ..MatchState::default()
        };
        assert_eq!(
            summary("solo", &state),
            "solo: wave 3, lives 100, money 250, defeated 0, Start"
        );
    }

    #[test]
    fn cli_parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["tower-duel", "join", "10.0.0.2", "--seed", "5"])
            .expect("parse");
        assert_eq!(cli.seed, Some(5));
        assert_eq!(cli.frames, 3_600);
        assert!(matches!(cli.command, Command::Join { ref address } if address == "10.0.0.2"));
    }
}
