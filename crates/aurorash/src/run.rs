use anyhow::{Context, Result};
use aurora::ParameterFeed;
use tracing_subscriber::EnvFilter;

use crate::cli::RunArgs;
use crate::paths::AppPaths;
use crate::settings::{
    load_config, load_program, render_parameters, window_config, EffectOverrides,
};
use crate::watch::ConfigWatcher;

pub fn run(args: RunArgs) -> Result<()> {
    let paths = AppPaths::discover()?;
    let loaded = load_config(&paths, &args)?;
    tracing::debug!(
        config_dir = %paths.config_dir().display(),
        config_file = %loaded.path.display(),
        from_file = loaded.from_file,
        "resolved aurorash paths"
    );

    let config = &loaded.config;
    let program = load_program(&config.render).context("failed to load shader program")?;
    let params = render_parameters(&config.effect);
    let window = window_config(config);

    let feed: Option<Box<dyn ParameterFeed>> = if config.watch.enabled {
        tracing::debug!(
            interval = ?config.watch.interval,
            path = %loaded.path.display(),
            "watching config file"
        );
        Some(Box::new(ConfigWatcher::new(
            loaded.path.clone(),
            config.watch.interval,
            EffectOverrides::from_args(&args),
            config.effect.clone(),
        )))
    } else {
        None
    };

    tracing::info!(
        width = window.width,
        height = window.height,
        antialias = %config.render.antialias,
        "starting aurora window"
    );
    aurora::run_window(window, program, params, feed)
}

pub fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
