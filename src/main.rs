use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use color_eyre::eyre::{Result, WrapErr, eyre};
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use webimage::application::WebImageUseCase;
use webimage::domain::ports::{CacheKeyProvider, ImageCachePort};
use webimage::infrastructure::{
    AppConfig, CliArgs, Command, HashedKeyProvider, HttpImageFetcher, ImageCache,
    SanitizingKeyProvider, StorageManager,
};

fn init_logging(config: &AppConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.to_string()));

    if let Some(log_path) = &config.log_path {
        if let Some(parent) = log_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)?;

        let file_layer = fmt::layer()
            .with_writer(file)
            .with_ansi(false)
            .with_target(true)
            .with_thread_ids(false);

        tracing_subscriber::registry()
            .with(filter)
            .with(file_layer)
            .init();

        info!(path = %log_path.display(), "Logging initialized");
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    Ok(())
}

fn load_config(args: &CliArgs) -> Result<AppConfig> {
    let mut config = if let Some(path) = &args.config {
        let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        StorageManager::with_dir(dir).load_config(Some(path))?
    } else if let Ok(storage) = StorageManager::new() {
        storage.load_config(None)?
    } else {
        AppConfig::default()
    };

    config.merge_with_args(args);
    Ok(config)
}

async fn build_cache(config: &AppConfig) -> Result<(Arc<ImageCache>, WebImageUseCase)> {
    let key_provider = Arc::new(SanitizingKeyProvider);
    let cache = Arc::new(ImageCache::new(&config.image_cache_config(), key_provider).await);
    let fetcher = Arc::new(HttpImageFetcher::new(&config.http_fetcher_config())?);
    let web_image = WebImageUseCase::new(cache.clone(), fetcher);
    Ok((cache, web_image))
}

async fn finish(cache: &ImageCache) -> Result<()> {
    cache.flush().await?;
    debug!(stats = %cache.stats(), "Done");
    Ok(())
}

async fn run(config: &AppConfig, command: Command) -> Result<()> {
    match command {
        Command::Key { url, hashed } => {
            let key = if hashed {
                HashedKeyProvider.cache_key(&url)?
            } else {
                SanitizingKeyProvider.cache_key(&url)?
            };
            println!("{key}");
        }
        Command::Get { url, output } => {
            let (cache, web_image) = build_cache(config).await?;
            let loaded = web_image
                .get_or_fetch(&url)
                .await
                .ok_or_else(|| eyre!("could not load image from {url}"))?;

            println!(
                "{} {}x{} ({})",
                loaded.key,
                loaded.image.width(),
                loaded.image.height(),
                loaded.source
            );

            if let Some(path) = output {
                let image = loaded.image.clone();
                let target = path.clone();
                tokio::task::spawn_blocking(move || image.save(&target))
                    .await?
                    .wrap_err_with(|| format!("failed to write {}", path.display()))?;
            }
            finish(&cache).await?;
        }
        Command::Remove { url } => {
            let (cache, web_image) = build_cache(config).await?;
            web_image.remove_from_cache(&url).await;
            finish(&cache).await?;
        }
        Command::Clear => {
            let (cache, _) = build_cache(config).await?;
            cache.clear().await;
            finish(&cache).await?;
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let args = CliArgs::parse();
    let config = load_config(&args)?;

    init_logging(&config)?;

    info!(version = webimage::VERSION, "Starting {}", webimage::NAME);

    run(&config, args.command).await
}
