//! `pokedex` binary entry point.
//!
//! Parses arguments, initializes logging, builds a `PokedexClient` and runs
//! one command. Results go to stdout; logs go to stderr.

mod cli;
mod output;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Command};
use pokedex_catalog::PokedexClient;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = cli.catalog_config();
    tracing::debug!(
        base_url = %config.base_url,
        concurrency = config.concurrency_limit,
        "configuration loaded"
    );

    let client = PokedexClient::new(config).context("failed to build catalog client")?;
    run(&client, &cli).await
}

async fn run(client: &PokedexClient, cli: &Cli) -> Result<()> {
    let out = output::Printer::new(cli.output);

    match &cli.command {
        Command::List { .. } => {
            let query = cli
                .command
                .page_query()
                .context("list command without a query")?;
            let page = client.query_page(&query).await?;
            out.page(&page)?;
        }
        Command::Show { pokemon } => {
            let record = match pokemon.parse::<u32>() {
                Ok(id) => client.get_pokemon(id).await?,
                Err(_) => client.get_pokemon_by_name(pokemon).await?,
            };
            out.pokemon(&record)?;
        }
        Command::Species { id, lang } => {
            let species = client.get_species(*id).await?;
            let languages: Vec<&str> = lang.iter().map(String::as_str).collect();
            out.species(&species, &languages)?;
        }
        Command::Evolution { id, line } => {
            let chain = client.get_evolution_chain(*id).await?;
            if *line {
                out.evolution_line(&chain.line())?;
            } else {
                out.json(&chain)?;
            }
        }
        Command::Generations => out.generations(client.generations())?,
        Command::Types => out.types(client.types())?,
        Command::Random { count, generation } => {
            let ids = client.random_ids(*count, *generation)?;
            out.ids(&ids)?;
        }
    }

    tracing::debug!(hit_rate = client.cache_stats().hit_rate(), "done");
    Ok(())
}
