//! Headless lens lifecycle driver.
//!
//! Opens one lens over an in-memory form, edits it, and closes it the way a
//! table host would, printing the value the lens committed.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use popedit::{
    Config, FormState, FormValueProvider, LensHost, SessionPhase, TokioStable,
    LIFECYCLE_TRACE_TARGET,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const INIT_WAIT_LIMIT: Duration = Duration::from_secs(2);
const INIT_POLL_INTERVAL: Duration = Duration::from_millis(5);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "popedit=info,popedit_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.contains(&"--help".to_string()) {
        print_help();
        return Ok(());
    }

    let config = Config::from_env();
    let committed = run_demo(&config).await?;
    println!("Committed value: {}", committed);
    Ok(())
}

fn print_help() {
    println!("popedit lens lifecycle demo\n");
    println!("Usage: popedit [--help]\n");
    println!("Environment variables:");
    println!("  POPEDIT_RESET_POLICY   blank-is-absent | explicit-only (default: blank-is-absent)");
    println!("  POPEDIT_LIFECYCLE_LOG  Emit lifecycle traces at info level");
    println!("  POPEDIT_DEMO_INITIAL   Initial form value (default: foo)");
    println!("  POPEDIT_DEMO_PREVIOUS  Previously saved value restored on init");
    println!("  RUST_LOG               Tracing filter (default: popedit=info,popedit_core=info)");
}

fn lifecycle(config: &Config, step: &str, value: &str) {
    if config.lifecycle_log {
        tracing::info!(target: LIFECYCLE_TRACE_TARGET, step, value, "lens lifecycle");
    }
}

async fn run_demo(config: &Config) -> anyhow::Result<String> {
    let scheduler = TokioStable::current().context("demo requires a tokio runtime")?;
    let mut host = LensHost::<String>::new(config.reset_policy);
    let form = Arc::new(
        FormState::new(config.demo_initial.clone())
            .with_validator(|value: &String| !value.trim().is_empty()),
    );

    let id = host.open(form.clone())?;
    let session = host.session(&id).context("lens vanished after open")?;
    let finals = session.final_values();
    let blurs = session.blurs();
    lifecycle(config, "opened", &form.current_value());

    session.init(config.demo_previous.clone(), &scheduler)?;
    let deadline = tokio::time::Instant::now() + INIT_WAIT_LIMIT;
    while session.phase() == SessionPhase::Initializing {
        if tokio::time::Instant::now() >= deadline {
            anyhow::bail!("lens did not initialize within {:?}", INIT_WAIT_LIMIT);
        }
        tokio::time::sleep(INIT_POLL_INTERVAL).await;
    }
    lifecycle(config, "initialized", &form.current_value());

    form.set_value(format!("{} (edited)", form.current_value()));
    lifecycle(config, "edited", &form.current_value());
    if session.is_valid() == Some(false) {
        tracing::warn!("Form is invalid; reverting before close");
        session.reset(None)?;
    }

    session.blur()?;
    if blurs.try_next().is_some() {
        lifecycle(config, "blurred", &form.current_value());
    }
    session.close()?;

    let dismantled = host.pump()?;
    tracing::info!(lenses = dismantled.len(), "Lens host dismantled lenses");

    let committed = finals
        .try_next()
        .context("lens closed without publishing a final value")?;
    lifecycle(config, "committed", &committed);
    host.shutdown()?;
    Ok(committed)
}
