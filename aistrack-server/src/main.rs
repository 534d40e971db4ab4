use std::time::Duration;

use aistrack_server::{config, Cli, Session, VERSION};
use clap::Parser;
use miette::{IntoDiagnostic, Result};
use tokio_graceful_shutdown::{SubsystemBuilder, Toplevel};

mod web;

use web::Web;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    env_logger::Builder::new()
        .filter_level(args.verbose.log_level_filter())
        .parse_default_env()
        .init();

    log::info!("aistrack-server {} starting", VERSION);

    let settings = config::load_settings(args.config.as_deref()).into_diagnostic()?;

    Toplevel::new(|s| async move {
        let session = Session::new(&s, args, settings);
        let web = Web::new(session);
        s.start(SubsystemBuilder::new("Webserver", |a| web.run(a)));
    })
    .catch_signals()
    .handle_shutdown_requests(Duration::from_millis(1000))
    .await
    .map_err(Into::into)
}
