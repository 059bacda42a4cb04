mod input;
mod status;

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use treacherous::{
    ClientConfig, Clock, DisconnectOutcome, HexMap, InputSource, PacketLossSimulation, Session,
    SyncEngine, SystemClock, TickScheduler, UdpChannel,
};

use input::TerminalInput;
use status::StatusReporter;

const MAP_WIDTH: usize = 20;
const MAP_HEIGHT: usize = 20;
const SUMMARY_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Parser)]
#[command(name = "treacherous")]
#[command(about = "Treacherous terminal client")]
struct Args {
    #[arg(
        short,
        long,
        help = "Server address to connect to (e.g., 127.0.0.1:59243)"
    )]
    server: Option<String>,

    #[arg(short, long, help = "Player name to register with")]
    name: Option<String>,

    #[arg(short, long, help = "TOML config file")]
    config: Option<PathBuf>,

    #[arg(
        long,
        value_name = "PERCENT",
        help = "Drop this percentage of outgoing packets"
    )]
    simulate_loss: Option<f32>,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args = Args::parse();
    let config = load_config(&args)?;
    let server = args
        .server
        .clone()
        .unwrap_or_else(|| config.server_addr.to_string());

    let session = Session::connect_udp(server.as_str())?;
    let mut engine = SyncEngine::new(session, config.player_name.clone(), &config)?;

    say(&format!(
        "Connecting to {} as {:?}. WASD to move, arrows to turn, space to shoot, q to quit.",
        server, config.player_name
    ));

    let mut input = TerminalInput::new()?;
    run(&mut engine, &mut input, &config);
    input.restore()?;
    drop(input);

    let stats = engine.session().stats().clone();
    match engine.shutdown(&SystemClock) {
        DisconnectOutcome::Acknowledged => println!("Disconnected."),
        DisconnectOutcome::TimedOut => println!("Server did not acknowledge disconnect."),
        DisconnectOutcome::NotConnected => println!("Never connected."),
    }
    println!(
        "Sent {} packets ({} retransmitted, {} dropped), received {}.",
        stats.packets_sent, stats.retransmissions, stats.packets_dropped, stats.packets_received
    );

    Ok(())
}

fn load_config(args: &Args) -> anyhow::Result<ClientConfig> {
    let mut config = match &args.config {
        Some(path) => ClientConfig::load(path)?,
        None => ClientConfig::default(),
    };

    if let Some(name) = &args.name {
        config.player_name = name.clone();
    }
    if let Some(percent) = args.simulate_loss {
        config.packet_loss = PacketLossSimulation::with_loss(percent);
    }

    Ok(config)
}

fn run(engine: &mut SyncEngine<UdpChannel>, input: &mut TerminalInput, config: &ClientConfig) {
    let clock = SystemClock;
    let mut scheduler = TickScheduler::new(config.tick_interval());
    let mut map = HexMap::new(MAP_WIDTH, MAP_HEIGHT);
    let mut reporter = StatusReporter::new();
    let mut warned_timeout = false;
    log::info!(
        "Ticking every {:?} on a {}x{} map",
        scheduler.interval(),
        map.width(),
        map.height()
    );

    loop {
        let elapsed = scheduler.begin_tick(clock.now());
        let sample = input.sample();
        if input.quit_requested() {
            break;
        }

        engine.tick(elapsed, &sample, &mut map);

        for line in reporter.diff(engine.registry(), engine.current_player()) {
            say(&line);
        }

        if !warned_timeout
            && engine
                .connecting_elapsed()
                .is_some_and(|waited| waited >= config.connect_timeout())
        {
            warned_timeout = true;
            log::warn!("No response from server after {:?}", config.connect_timeout());
            say("Could not connect to server, still trying.");
        }

        if reporter.summary_due(elapsed, SUMMARY_INTERVAL) {
            let stats = engine.session().stats();
            let damaged = map.tiles().filter(|tile| tile.damage() > 0).count();
            say(&format!(
                "[{:?}] {} player(s), {} damaged tile(s), {} sent / {} received, charge {:.0}/{:.0}",
                engine.state(),
                engine.registry().len(),
                damaged,
                stats.packets_sent,
                stats.packets_received,
                engine.shots().charge().distance(),
                engine.shots().config().max_distance
            ));
        }

        clock.sleep(scheduler.time_until_next(clock.now()));
    }
}

/// Prints one line; raw mode needs the explicit carriage return.
fn say(line: &str) {
    print!("{}\r\n", line);
}
