use dotenv::dotenv;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;
use tracing::{event, Level};
use tracing_subscriber::EnvFilter;

use todolist::config::Config;
use todolist::controller::TaskController;
use todolist::log;

fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let config = Config::load()?;
    let env_filter = EnvFilter::try_from_env(log::LOG_ENV);
    log::setup(env_filter, &config.log)?;

    event!(
        Level::INFO,
        "Starting todolist: {}",
        env!("CARGO_PKG_VERSION")
    );

    let term = Arc::new(AtomicBool::new(false));
    signal_hook::flag::register(signal_hook::consts::SIGTERM, term.clone())?;
    signal_hook::flag::register(signal_hook::consts::SIGINT, term.clone())?;

    let controller = TaskController::start(&config)?;
    event!(
        Level::INFO,
        "Backend server is running on {}",
        controller.local_addr()
    );

    while !term.load(Ordering::Acquire) {
        std::thread::sleep(Duration::from_millis(100));
    }
    controller.stop()?;
    Ok(())
}
