use gt_stats::config::load_config;
use gt_stats::dataset::ModelStore;
use gt_stats::{SceneStatsDriver, StatsError};
use std::env;
use std::path::Path;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    if let Err(err) = run() {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), StatsError> {
    let config_path = env::args()
        .nth(1)
        .ok_or_else(|| StatsError::InvalidConfig(usage()))?;
    let config = load_config(Path::new(&config_path))?;

    let renderer = config
        .renderer
        .as_ref()
        .ok_or_else(|| StatsError::InvalidConfig("config has no renderer section".to_string()))?
        .build(&config.dataset.root)?;
    let models = ModelStore::load(&config.dataset)?;

    let driver = SceneStatsDriver::new(&config, &models, renderer.as_ref());
    let summaries = driver.run()?;

    for summary in &summaries {
        let mean = summary
            .mean_visible_fraction
            .map(|f| format!("{f:.3}"))
            .unwrap_or_else(|| "n/a".to_string());
        println!(
            "scene {:02}: {} images, {} instances ({} empty), mean visible fraction {}, {:.1} ms",
            summary.scene_id,
            summary.image_count,
            summary.instance_count,
            summary.degenerate_count,
            mean,
            summary.timing.total_ms
        );
    }
    Ok(())
}

fn usage() -> String {
    "Usage: gt_stats <config.json>".to_string()
}
