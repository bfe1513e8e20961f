//! minegen
//!
//! Main entry point that delegates to the app module.

mod app;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    tracing::info!("Starting minegen...");
    if let Err(e) = app::run() {
        tracing::error!("{} ({})", e, e.class());
        std::process::exit(1);
    }
}
