mod dataset;
mod error;
mod fetch;
mod harness;
mod inference;
mod model;
mod reviews;
mod server;
mod settings;
mod text;

#[cfg(test)]
mod testutil;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{error, info};

use crate::inference::InferenceService;
use crate::model::ModelBundle;
use crate::settings::Settings;
use crate::text::TextNormalizer;

#[derive(Parser)]
#[command(name = "review_sentiment", about = "Review sentiment API and review page scraper")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load the model bundle and serve POST /predict and GET /health
    Serve {
        /// Listen address (overrides server.bind)
        #[arg(short, long)]
        bind: Option<String>,
    },
    /// Classify a single review and print the label
    Predict {
        #[arg(long, default_value = "")]
        title: String,
        #[arg(long, default_value = "")]
        text: String,
    },
    /// Fetch review pages 1..=N, extract them and write per-page and merged CSVs
    Scrape {
        /// Review URL of page 1; the `page` query parameter is rewritten per page
        #[arg(long)]
        url: String,
        /// Number of pages to fetch
        #[arg(short = 'n', long)]
        pages: u32,
        #[arg(long, default_value = "Product")]
        product: String,
        #[arg(long, default_value = "Site")]
        site: String,
        #[arg(long, default_value = "Author")]
        author: String,
        /// DDMMYY, defaults to today
        #[arg(long)]
        date: Option<String>,
        /// Output directory (overrides scrape.out_dir)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Re-run extraction over saved review_html_<N>.html files
    Extract {
        #[arg(short, long)]
        input: PathBuf,
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Concatenate review_csv_<N>.csv files in page order
    Merge {
        #[arg(short, long)]
        input: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
    },
}

/// Load linguistic resources and the model bundle. Any failure is fatal.
fn load_service(settings: &Settings) -> anyhow::Result<InferenceService> {
    let t0 = Instant::now();
    let normalizer = TextNormalizer::load(&settings.resources.dir)?;
    let bundle = ModelBundle::load(&settings.model)?;
    info!(
        features = bundle.classifier.n_features(),
        "Inference service ready in {:.2}s",
        t0.elapsed().as_secs_f64()
    );
    Ok(InferenceService::new(normalizer, bundle))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let mut settings = Settings::load()?;

    let result = match cli.command {
        Commands::Serve { bind } => {
            if let Some(bind) = bind {
                settings.server.bind = bind;
            }
            let svc = load_service(&settings).inspect_err(|e| error!("{:#}", e))?;
            server::serve(Arc::new(svc), &settings.server).await
        }
        Commands::Predict { title, text } => {
            let svc = load_service(&settings).inspect_err(|e| error!("{:#}", e))?;
            let prediction = svc.classify(&title, &text)?;
            println!("{}", prediction.label);
            Ok(())
        }
        Commands::Scrape {
            url,
            pages,
            product,
            site,
            author,
            date,
            out,
        } => {
            let root = out.unwrap_or_else(|| settings.scrape.out_dir.clone());
            let date = date.unwrap_or_else(|| chrono::Local::now().format("%d%m%y").to_string());
            let name = dataset::merged_file_name(&product, &site, pages, &date, &author);
            let layout = harness::OutputLayout::new(&root, &name);

            let source = fetch::HttpPages::new(&url, &settings.scrape)
                .with_context(|| format!("Invalid review URL {}", url))?;
            println!("Scraping {} pages into {}...", pages, root.display());
            let stats = harness::scrape(&source, pages, &layout).await?;
            stats.print();
            println!("Merged dataset: {}", layout.merged.display());
            Ok(())
        }
        Commands::Extract { input, out } => {
            let root = out.unwrap_or_else(|| settings.scrape.out_dir.clone());
            let layout = harness::OutputLayout::new(&root, "extracted_reviews.csv");
            let stats = harness::extract_saved(&input, &layout)?;
            stats.print();
            println!("Merged dataset: {}", layout.merged.display());
            Ok(())
        }
        Commands::Merge { input, output } => {
            let rows = dataset::merge_dir(&input, &output)?;
            println!("Merged {} reviews into {}", rows, output.display());
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
