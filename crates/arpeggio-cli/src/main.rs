//! arpeggio: play a sound back as a pitch-shifted arpeggio

mod app;

use anyhow::Context;
use app::{load_config, ArpApp};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> anyhow::Result<()> {
    let config = load_config();

    // Initialize logging
    let mut filter = tracing_subscriber::EnvFilter::from_default_env();
    for directive in config.log_filter.split(',').map(str::trim).filter(|d| !d.is_empty()) {
        filter = filter.add_directive(
            directive
                .parse()
                .with_context(|| format!("invalid log directive '{directive}'"))?,
        );
    }
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(filter.add_directive("cpal=warn".parse()?))
        .init();

    tracing::info!(default_sound = %config.default_sound, "Starting arpeggio");

    let mut app = ArpApp::with_devices(config);
    let stdin = std::io::stdin();
    app.run(stdin.lock(), std::io::stdout())
        .context("terminal I/O failed")?;

    Ok(())
}
