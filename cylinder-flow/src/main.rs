use anyhow::{bail, Context, Result};
use cylinder_flow::{compute_field, Config, QuiverRenderer, VelocityFunctions};
use log::info;
use std::env;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    // Optional parameter file, defaults otherwise
    let args: Vec<String> = env::args().collect();
    let config = match args.len() {
        1 => {
            let config = Config::default();
            config.validate()?;
            config
        }
        2 => Config::from_file(&args[1])?,
        _ => bail!("Usage: {} [CONFIG.toml]", args[0]),
    };
    config.log_summary();

    let psi = config.flow.stream_function();
    info!("{}", psi);
    let velocity = VelocityFunctions::derive(&psi).context("Failed to derive velocity field")?;

    let flow = compute_field(
        &velocity,
        config.grid.domain(),
        config.grid.rows,
        config.grid.cols,
        config.flow.radius,
    )
    .context("Failed to sample velocity field")?;
    let (rows, cols) = flow.grid.shape();
    info!(
        "Sampled {}x{} grid, {} of {} vectors visible",
        rows,
        cols,
        flow.field.u.visible_count(),
        rows * cols
    );

    let renderer = QuiverRenderer::new(config.style.style()?);
    let ctx = config.output.render_context();
    renderer
        .render(&ctx, &flow.grid, &flow.field, &config.flow.obstacle())
        .context("Failed to render figure")?;

    Ok(())
}
