use std::path::Path;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde_json::json;

mod config;
mod enrich;
mod links;
mod service;
#[cfg(test)]
mod tests;

use config::Config;
use enrich::EnrichmentInput;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch a page and print its title and verified icon URL, without
    /// writing anything to disk.
    Inspect {
        /// Page URL; scheme defaults to https
        url: String,
    },

    /// Run the full pipeline: fetch the page, locate the icon, download
    /// it to the icons root.
    Enrich {
        /// Page URL; scheme defaults to https
        url: String,

        /// Owner the stored icon is filed under
        #[clap(long, default_value_t = 0)]
        user_id: u64,

        /// Link identity the icon file is keyed by
        #[clap(long, default_value_t = 0)]
        link_id: u64,

        /// Override the configured icons root
        #[clap(long)]
        out_dir: Option<String>,
    },

    /// Create an ephemeral link record and run the create-then-enrich
    /// flow against it, printing the stored result.
    Add {
        /// Page URL; scheme defaults to https
        url: String,

        #[clap(long, default_value_t = 0)]
        user_id: u64,

        /// Title to keep; the page title only fills an empty one
        #[clap(short, long)]
        title: Option<String>,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = Config::load_with(&config::base_path());

    match args.command {
        Command::Inspect { url } => {
            let url = enrich::normalize::normalize_url(&url);
            let page_url = url::Url::parse(&url)?;

            let html = enrich::page::fetch_page(&page_url, &config.fetch)?;
            let title = enrich::title::extract_title(&html);
            let icon_url = enrich::favicon::locate_favicon(&html, &page_url, &config.fetch);

            println!(
                "{}",
                serde_json::to_string_pretty(&json!({
                    "url": url,
                    "title": title,
                    "icon_url": icon_url,
                }))
                .unwrap()
            );

            Ok(())
        }

        Command::Enrich {
            url,
            user_id,
            link_id,
            out_dir,
        } => {
            let favicons_dir = out_dir.unwrap_or_else(|| config.favicons_dir.clone());

            let input = EnrichmentInput {
                raw_url: url,
                user_id,
                link_id,
            };
            let outcome = enrich::enrich(&input, Path::new(&favicons_dir), &config.fetch);

            println!(
                "{}",
                serde_json::to_string_pretty(&json!({
                    "title": outcome.title,
                    "favicon_path": outcome.favicon_path,
                    "failure": outcome.failure.as_ref().map(|f| f.to_string()),
                }))
                .unwrap()
            );

            Ok(())
        }

        Command::Add {
            url,
            user_id,
            title,
        } => {
            let store = Arc::new(links::StoreMemory::new());
            let svc = service::LinkService::new(store, config.favicons_dir.clone(), config.fetch);

            let link = svc.create_link(links::LinkCreate {
                user_id,
                url,
                title,
                ..Default::default()
            })?;

            println!("{}", serde_json::to_string_pretty(&link).unwrap());

            Ok(())
        }
    }
}
