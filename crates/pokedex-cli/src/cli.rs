//! Command line arguments
//!
//! Every catalog knob can be given as a flag or through the matching
//! `POKEDEX_*` environment variable.

use clap::{Parser, Subcommand, ValueEnum};
use pokedex_catalog::{CatalogConfig, PageQuery};
use std::time::Duration;

#[derive(Debug, Clone, Parser)]
#[command(
    name = "pokedex",
    about = "Browse the PokeAPI catalog through a caching, coalescing client",
    version
)]
pub struct Cli {
    /// Upstream API root
    #[arg(
        long,
        global = true,
        env = "POKEDEX_BASE_URL",
        default_value = pokedex_catalog::config::DEFAULT_BASE_URL
    )]
    pub base_url: String,

    /// Maximum concurrent upstream requests per page
    #[arg(
        long,
        global = true,
        env = "POKEDEX_CONCURRENCY_LIMIT",
        default_value_t = 6
    )]
    pub concurrency: usize,

    /// Request timeout in seconds
    #[arg(
        long,
        global = true,
        env = "POKEDEX_REQUEST_TIMEOUT",
        default_value_t = 30
    )]
    pub timeout: u64,

    /// Output format
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Json)]
    pub output: OutputFormat,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Text,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// List one page of the catalog
    List {
        /// Generation number (1-9)
        #[arg(short, long = "gen")]
        generation: Option<u32>,

        /// Type name, e.g. fire
        #[arg(short = 't', long = "type")]
        type_name: Option<String>,

        /// Name or number fragment
        #[arg(short, long)]
        search: Option<String>,

        #[arg(short, long, default_value_t = 1)]
        page: usize,

        /// Page size, clamped to 1..=60
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Show a single Pokemon by id or name
    Show { pokemon: String },

    /// Show species details
    Species {
        id: u32,

        /// Preferred languages for description and genus, in order
        #[arg(long, value_delimiter = ',', default_value = "en")]
        lang: Vec<String>,
    },

    /// Show an evolution chain
    Evolution {
        id: u32,

        /// Print only the linear evolution line
        #[arg(long)]
        line: bool,
    },

    /// List generations and their id ranges
    Generations,

    /// List the elemental types
    Types,

    /// Pick distinct random ids
    Random {
        #[arg(short, long, default_value_t = 1)]
        count: usize,

        #[arg(short, long = "gen")]
        generation: Option<u32>,
    },
}

impl Cli {
    /// Catalog configuration from environment defaults overridden by flags
    pub fn catalog_config(&self) -> CatalogConfig {
        CatalogConfig {
            concurrency_limit: self.concurrency,
            request_timeout: Duration::from_secs(self.timeout),
            ..CatalogConfig::from_env()
        }
        .with_base_url(self.base_url.as_str())
    }
}

impl Command {
    /// Page query for `list`, `None` for other commands
    pub fn page_query(&self) -> Option<PageQuery> {
        match self {
            Self::List {
                generation,
                type_name,
                search,
                page,
                limit,
            } => Some(PageQuery {
                generation: *generation,
                type_name: type_name.clone(),
                search: search.clone(),
                page: Some(*page),
                limit: *limit,
            }),
            _ => None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_list() {
        let cli = Cli::try_parse_from([
            "pokedex", "list", "--gen", "1", "--type", "fire", "--search", "char", "--limit", "10",
        ])
        .unwrap();

        let query = cli.command.page_query().unwrap();
        assert_eq!(
            query,
            PageQuery {
                generation: Some(1),
                type_name: Some("fire".to_string()),
                search: Some("char".to_string()),
                page: Some(1),
                limit: Some(10),
            }
        );
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "pokedex",
            "show",
            "pikachu",
            "--base-url",
            "http://127.0.0.1:9000/api/v2/",
            "--concurrency",
            "2",
            "--output",
            "text",
        ])
        .unwrap();

        assert_eq!(
            cli.command,
            Command::Show {
                pokemon: "pikachu".to_string()
            }
        );
        assert_eq!(cli.output, OutputFormat::Text);

        let config = cli.catalog_config();
        assert_eq!(config.base_url, "http://127.0.0.1:9000/api/v2");
        assert_eq!(config.concurrency_limit, 2);
    }

    #[test]
    fn test_species_languages() {
        let cli = Cli::try_parse_from(["pokedex", "species", "25", "--lang", "fr,en"]).unwrap();
        assert_eq!(
            cli.command,
            Command::Species {
                id: 25,
                lang: vec!["fr".to_string(), "en".to_string()],
            }
        );
    }

    #[test]
    fn test_rejects_non_numeric_generation() {
        let parsed = Cli::try_parse_from(["pokedex", "list", "--gen", "kanto"]);
        assert!(parsed.is_err());
    }
}
