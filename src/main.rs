use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing::{error, info};

use domain_saver::agency::{
    load_agency_mapping, load_non_stakeholder_overrides, load_rewrites, AgencyResolver,
};
use domain_saver::config::Config;
use domain_saver::error::Result;
use domain_saver::feeds;
use domain_saver::logging::init_logging;
use domain_saver::ownership::DomainOwnershipIndex;
use domain_saver::pipeline::PipelineDriver;
use domain_saver::sld_mapping;
use domain_saver::store::{InMemoryCollection, ScanCollection};

#[derive(Parser)]
#[command(name = "saver")]
#[command(about = "Load federal domain scan results into the scan database")]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to the configuration file
    #[arg(long, default_value = "config.toml")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load the HTTPS configuration posture feed
    Https,
    /// Load the TLS/certificate posture feed
    Tls,
    /// Load the email-authentication posture feed
    Mail,
    /// Rebuild the domain -> agency mapping collection
    SldMapping,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let cli = Cli::parse();
    let config = Config::load(&cli.config)?;

    let run = match cli.command {
        Commands::Https => run_feed(&config, &feeds::HTTPS).await,
        Commands::Tls => run_feed(&config, &feeds::TLS).await,
        Commands::Mail => run_feed(&config, &feeds::MAIL).await,
        Commands::SldMapping => run_sld_mapping(&config).await,
    };

    if let Err(e) = &run {
        error!("run failed: {}", e);
    }
    run
}

/// Build the reference structures every job needs: the ownership index
/// (with its review artifacts) and the agency resolver.
fn load_references(config: &Config) -> Result<(DomainOwnershipIndex, AgencyResolver)> {
    let paths = &config.paths;

    let ownership = DomainOwnershipIndex::load(&paths.current_federal_file())?;
    ownership.write_artifacts(
        &paths.unique_agencies_file(),
        &paths.clean_current_federal_file(),
    )?;

    let mapping = load_agency_mapping(&paths.agencies_file())?;
    let mut resolver = AgencyResolver::new(mapping);

    let rewrites_path = paths.agency_rewrites_file();
    if rewrites_path.exists() {
        resolver = resolver.with_rewrites(load_rewrites(&rewrites_path)?);
    }
    let overrides_path = paths.non_stakeholders_file();
    if overrides_path.exists() {
        resolver =
            resolver.with_non_stakeholder_overrides(load_non_stakeholder_overrides(&overrides_path)?);
    }

    info!("reference tables loaded");
    Ok((ownership, resolver))
}

/// The scan database adapter is supplied by the deployment; development
/// runs use the in-memory collection.
fn open_collection(config: &Config, name: &str) -> Arc<dyn ScanCollection> {
    Arc::new(InMemoryCollection::new(
        name,
        &config.store.database,
        &config.store.host,
    ))
}

async fn run_feed(config: &Config, feed: &'static feeds::Feed) -> Result<()> {
    let (ownership, resolver) = load_references(config)?;
    let collection = open_collection(config, feed.collection);

    let driver = PipelineDriver::new(feed, &ownership, &resolver);
    let results_path = config.paths.feed_results_file(feed.results_file);
    let summary = driver.run(&results_path, collection.as_ref()).await?;

    summary.print();
    Ok(())
}

async fn run_sld_mapping(config: &Config) -> Result<()> {
    let (ownership, resolver) = load_references(config)?;
    let collection = open_collection(config, sld_mapping::COLLECTION);

    let summary = sld_mapping::run(&ownership, &resolver, collection.as_ref()).await?;

    summary.print();
    Ok(())
}
