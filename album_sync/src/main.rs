use std::path::PathBuf;

use anyhow::Context;
use clap::{ArgGroup, Parser};
use dotenv::dotenv;

use album_sync::config::Settings;
use album_sync::cover::{CoverPipeline, ImageResolver};
use album_sync::extract::AlbumSelectors;
use album_sync::merge::MergeMode;
use album_sync::render::render_posts;
use album_sync::source::{self, Source};
use album_sync::store::{CatalogStore, IgnoreList};
use album_sync::sync::synchronize;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Keeps a catalog of photo albums in sync with the albums page and renders a post per album",
    long_about = None
)]
#[command(group(ArgGroup::new("operation").required(true).multiple(true).args(["sync", "generate"])))]
struct Args {
    /// Synchronize the catalog with the albums page
    #[arg(short, long)]
    sync: bool,

    /// Generate a post for every catalogued album
    #[arg(short, long)]
    generate: bool,

    /// Saved page capture to read instead of driving a browser
    #[arg(short, long, requires = "sync")]
    capture: Option<PathBuf>,

    /// How new albums are told apart from catalogued ones
    #[arg(short, long, value_enum, default_value_t = MergeMode::Identity)]
    mode: MergeMode,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = Args::parse();
    let settings = Settings::from_env().context("reading settings")?;
    let store = CatalogStore::new(&settings.catalog_path);

    if args.sync {
        let selectors = AlbumSelectors::google_photos()?;
        let source = match args.capture {
            Some(path) => Source::Capture(path),
            None => Source::Live,
        };

        let acquired = source::acquire(&source, &settings, &selectors)
            .await
            .context("collecting albums")?;
        let ignore = IgnoreList::load(&settings.ignore_path).context("reading ignore list")?;
        let pipeline = CoverPipeline::new(
            ImageResolver::new(acquired.base)?,
            &settings.asset_dir,
            &settings.asset_mount,
        );

        let report = synchronize(&store, &ignore, &pipeline, acquired.batch, args.mode)
            .await
            .context("synchronizing catalog")?;
        println!(
            "Found {} albums, added {}, catalog holds {}",
            report.found, report.added, report.total
        );
    }

    if args.generate {
        let catalog = store.load().context("loading catalog")?;
        let report = render_posts(&catalog, &settings.posts_dir).context("rendering posts")?;
        println!("{} posts written", report.written);
    }

    println!("Success!");
    Ok(())
}
