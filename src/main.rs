use std::io;
use std::path::PathBuf;

use clap::Parser;

use zone_panel::bus::client_id;
use zone_panel::runtime::driver::cli::{TerminalGeometry, terminal_size};
use zone_panel::{
    AnsiSurface, CardMetrics, ClimateReading, ClimateSensor, CliDriver, FileSink, Logger,
    MemoryBus, MessageBus, NoClimateSensor, PanelConfig, PanelRenderer, PanelRuntime,
    RuntimeConfig, ScriptedClimate, StateSynchronizer, SurfaceView, TcpLineBus, TerminalTouch,
    TopicRouter, ZoneId,
};

const DEMO_ZONES: [(&str, bool); 5] = [
    ("Front Lawn", true),
    ("Back Yard", false),
    ("Vegetable Beds", false),
    ("Greenhouse", true),
    ("Drip Line", false),
];

/// Terminal front end for the zone panel.
#[derive(Parser, Debug)]
#[command(name = "zone-panel", version, about)]
struct Args {
    /// JSON configuration file; built-in defaults when omitted.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Bus bridge address as host:port, overriding the config file.
    #[arg(long)]
    bus: Option<String>,
    /// Write JSON-lines logs to this file.
    #[arg(long)]
    log: Option<PathBuf>,
    /// Run against an in-process bus with a few sample zones.
    #[arg(long)]
    demo: bool,
}

fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let mut config = match &args.config {
        Some(path) => PanelConfig::load(path)?,
        None => PanelConfig::default(),
    };
    if let Some(address) = &args.bus {
        config.bus.set_address(address)?;
    }

    let mut runtime_config = RuntimeConfig::from_panel_config(&config);
    let log_path = args
        .log
        .clone()
        .or_else(|| config.log.path.as_ref().map(PathBuf::from));
    if let Some(path) = log_path {
        let sink = FileSink::new(path, config.log.max_bytes)?;
        runtime_config.logger = Some(Logger::new(sink).with_min_level(config.log.level));
    }

    let router = TopicRouter::new(config.bus.base_topic.clone());
    let bus: Box<dyn MessageBus> = if args.demo {
        Box::new(demo_bus(&router))
    } else {
        Box::new(TcpLineBus::new(
            config.bus.address(),
            client_id(&config.bus.client_prefix),
        ))
    };
    let climate: Box<dyn ClimateSensor> = if args.demo {
        Box::new(demo_climate())
    } else {
        Box::new(NoClimateSensor)
    };

    // Terminal cells replace pixels; the configured panel geometry is scaled
    // onto the terminal.
    let size = terminal_size()?;
    let geometry = TerminalGeometry::from_config(&config);
    let grid = geometry.grid(size);
    let transform = geometry.touch_transform(size);
    let renderer = PanelRenderer::new(config.display.title.clone(), grid, CardMetrics::cells());
    let view = SurfaceView::new(AnsiSurface::new(io::stdout(), size), renderer);
    let sync = StateSynchronizer::new(router, grid, size, transform);

    let touch = TerminalTouch::new(transform);
    let runtime = PanelRuntime::new(
        runtime_config,
        sync,
        view,
        bus,
        Box::new(touch.clone()),
        climate,
    );
    CliDriver::new(runtime, touch, geometry).run()?;
    Ok(())
}

fn demo_bus(router: &TopicRouter) -> MemoryBus {
    let bus = MemoryBus::new();
    bus.echo_commands(true);
    for (number, (name, open)) in (1u32..).zip(DEMO_ZONES) {
        let Some(id) = ZoneId::new(number) else {
            continue;
        };
        bus.inject(router.name_topic(id), name);
        bus.inject(router.state_topic(id), if open { "ON" } else { "OFF" });
    }
    bus
}

fn demo_climate() -> ScriptedClimate {
    let readings = [(21.4, 48.0), (21.6, 47.0), (21.9, 46.0)]
        .into_iter()
        .filter_map(|(temperature, humidity)| ClimateReading::new(temperature, humidity))
        .collect();
    ScriptedClimate::new(readings)
}
