//! CLI module for saved objects
//!
//! Every subcommand acts on one saved object type, chosen with `--type`
//! by registry title or service name (`templates`, `savedSearches`, ...).

mod objects;

use std::io::Write;
use std::path::PathBuf;

use anyhow::{anyhow, bail};
use clap::{Parser, Subcommand};

use crate::config::AppConfig;
use crate::domain::{SavedObjectRegistry, SavedObjectType, SavedSearch, SavedTemplate};
use crate::infrastructure::logging;
use crate::infrastructure::store::DEFAULT_SCAN_PAGE_SIZE;

pub use objects::execute;

/// Saved objects - inspect and manage saved templates and searches
#[derive(Parser, Debug)]
#[command(name = "saved-objects")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Saved object type, by title or service name
    #[arg(long = "type", global = true, default_value = "templates")]
    pub object_type: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// List registered saved object types
    Types,

    /// Print one object by id
    Get { id: String },

    /// Search titles and descriptions by prefix (empty lists everything)
    Find {
        #[arg(default_value = "")]
        search: String,
    },

    /// Delete one or more objects
    Delete {
        #[arg(required = true)]
        ids: Vec<String>,
    },

    /// Stream every matching object as JSON lines
    Export {
        #[arg(long, default_value = "")]
        query: String,

        #[arg(long, default_value_t = DEFAULT_SCAN_PAGE_SIZE)]
        page_size: usize,
    },

    /// Save every object from a JSON lines file
    Import { file: PathBuf },

    /// Print the client-side route of an object
    Url { id: String },
}

/// Loads configuration, resolves the type and runs the command against
/// the configured index
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load().unwrap_or_default();
    logging::init_logging(&config.logging);

    let registry = SavedObjectRegistry::default();
    let entry = registry
        .find_by_title(&cli.object_type)
        .ok_or_else(|| anyhow!("Unknown saved object type '{}'", cli.object_type))?;

    let mut out = std::io::BufWriter::new(std::io::stdout());

    if entry.object_type == SavedTemplate::TYPE {
        let service = crate::create_service::<SavedTemplate>(&config).await?;
        execute(&service, &registry, cli.command, &mut out).await?;
    } else if entry.object_type == SavedSearch::TYPE {
        let service = crate::create_service::<SavedSearch>(&config).await?;
        execute(&service, &registry, cli.command, &mut out).await?;
    } else {
        bail!("No service available for type '{}'", entry.object_type);
    }

    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_defaults() {
        let cli = Cli::try_parse_from(["saved-objects", "find"]).unwrap();

        assert_eq!(cli.object_type, "templates");
        assert_eq!(
            cli.command,
            Command::Find {
                search: String::new()
            }
        );
    }

    #[test]
    fn test_parse_type_after_subcommand() {
        let cli =
            Cli::try_parse_from(["saved-objects", "delete", "a", "b", "--type", "searches"])
                .unwrap();

        assert_eq!(cli.object_type, "searches");
        assert_eq!(
            cli.command,
            Command::Delete {
                ids: vec!["a".to_string(), "b".to_string()]
            }
        );
    }

    #[test]
    fn test_parse_export_options() {
        let cli = Cli::try_parse_from(["saved-objects", "export", "--page-size", "50"]).unwrap();

        assert_eq!(
            cli.command,
            Command::Export {
                query: String::new(),
                page_size: 50
            }
        );
    }

    #[test]
    fn test_delete_requires_ids() {
        assert!(Cli::try_parse_from(["saved-objects", "delete"]).is_err());
    }
}
