use memory_tree::AppConfig;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = AppConfig::from_env();
    log::info!(
        "Starting with {} photos from {}",
        config.photo_count,
        config.asset_dir.display()
    );
    memory_tree::run(config)
}
