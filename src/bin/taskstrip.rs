use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use taskstrip::actor::{Panel, PanelState};
use taskstrip::common::config::{self, Config};
use taskstrip::common::log;
use taskstrip::layout_engine::items::has_clock;
use taskstrip::sys::event_sources::Triggers;
use taskstrip::sys::run_loop::RunLoop;
use taskstrip::sys::wayland::{SurfaceOptions, WaylandDisplay};
use taskstrip::ui::text::{FontDescription, FontdueText};
use tracing::{error, info};

#[derive(Parser)]
#[command(version, about = "A thin Wayland panel with a taskbar and a clock")]
struct Cli {
    /// Config file to read instead of the default location.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output (monitor) name to place the panel on.
    #[arg(long)]
    output: Option<String>,

    /// Item codes laid out left to right: T taskbar, C clock, S spacer.
    #[arg(long)]
    panel_items: Option<String>,

    /// Close the panel after this many seconds; 0 keeps it open.
    #[arg(long)]
    timeout: Option<u64>,

    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn load_config(&self) -> Config {
        let mut config = match self.config.clone().or_else(config::default_path) {
            Some(path) => Config::load_or_default(&path),
            None => Config::default(),
        };
        if let Some(output) = &self.output {
            config.output = Some(output.clone());
        }
        if let Some(items) = &self.panel_items {
            config.panel_items = items.clone();
        }
        if let Some(timeout) = self.timeout {
            config.close_timeout = timeout;
        }
        config
    }
}

fn run(config: &Config) -> anyhow::Result<()> {
    let font: FontDescription = config.font.parse().context("invalid font description")?;
    let text = FontdueText::load(&font).with_context(|| format!("loading font {:?}", config.font))?;

    let display = WaylandDisplay::connect(&SurfaceOptions::from_config(config))
        .context("setting up the panel surface")?;

    let panel = Panel::new(PanelState::from_config(config));
    let sources = Triggers::new(config.close_timeout(), has_clock(&panel.state.items))
        .context("creating timers and the signal descriptor")?;

    RunLoop::new(display, sources, text, panel).run();
    info!("panel closed");
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    log::init(cli.verbose);

    let config = cli.load_config();
    match run(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}
