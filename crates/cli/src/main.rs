//! Marketplace CLI - Migrations, catalog and selection management.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! mkt migrate
//!
//! # List products awaiting validation
//! mkt products list --status draft
//!
//! # Add a product to the local boutique selection
//! mkt selection add boutique -n "Montre" -p 15000
//!
//! # Sales figures for a boutique
//! mkt sales stats --boutique 1
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `products` - List, toggle, validate, publish and delete catalog products
//! - `selection` - Manage the boutique and campaign selections
//! - `sales` - Sales journal figures

#![cfg_attr(not(test), forbid(unsafe_code))]

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use marketplace_client::admin::{ProductFilters, ProductForm};
use marketplace_client::{ApiClient, ClientConfig};
use marketplace_core::{ProductStatus, RawProduct, ValidationAction};
use rust_decimal::Decimal;

mod commands;

use commands::selection::SelectionArg;

#[derive(Parser)]
#[command(name = "mkt")]
#[command(author, version, about = "Marketplace CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage catalog products
    Products {
        #[command(subcommand)]
        action: ProductAction,
    },
    /// Manage the local product selections
    Selection {
        #[command(subcommand)]
        action: SelectionAction,
    },
    /// Sales journal
    Sales {
        #[command(subcommand)]
        action: SalesAction,
    },
}

#[derive(Subcommand)]
enum ProductAction {
    /// List products
    List {
        /// Only products with this status (`active`, `inactive`, `draft`)
        #[arg(short, long)]
        status: Option<ProductStatus>,

        /// Match against name, description and keywords
        #[arg(short = 'q', long)]
        search: Option<String>,

        /// Only products in this category
        #[arg(short, long)]
        categorie: Option<String>,

        /// Page to show (1-based)
        #[arg(short, long, default_value_t = 1)]
        page: u32,
    },
    /// Switch a product between active and inactive
    Toggle { id: String },
    /// Set a product's status
    Status { id: String, status: ProductStatus },
    /// Approve or reject a product (`publish`, `reject`)
    Validate { id: String, action: ValidationAction },
    /// Publish a product entered by hand
    Publish {
        #[arg(short, long)]
        nom: String,

        /// Price in FCFA
        #[arg(short, long, default_value = "")]
        prix: String,

        /// Price label shown instead of the amount
        #[arg(long, default_value = "")]
        prix_texte: String,

        /// Categories (repeatable)
        #[arg(short, long)]
        categorie: Vec<String>,

        #[arg(short, long, default_value = "")]
        marque: String,

        #[arg(short, long, default_value = "")]
        image: String,

        #[arg(short, long, default_value = "")]
        lien: String,

        /// Fill the SEO fields with generated copy before publishing
        #[arg(long)]
        seo: bool,
    },
    /// Delete a product
    Delete { id: String },
}

#[derive(Subcommand)]
enum SelectionAction {
    /// Add a product to a selection
    Add {
        #[arg(value_enum)]
        selection: SelectionArg,

        #[arg(short, long)]
        nom: String,

        #[arg(short, long)]
        prix: Option<Decimal>,

        #[arg(short, long)]
        lien: Option<String>,

        #[arg(short, long)]
        image: Option<String>,

        #[arg(short, long)]
        marque: Option<String>,

        #[arg(short, long)]
        categorie: Option<String>,

        /// Where the product was found (`Jumia`, `Alibaba`, ...)
        #[arg(short, long)]
        source: Option<String>,
    },
    /// Show a selection
    List {
        #[arg(value_enum)]
        selection: SelectionArg,
    },
    /// Remove the entry at an index shown by `list`
    Remove {
        #[arg(value_enum)]
        selection: SelectionArg,
        index: usize,
    },
    /// Empty a selection
    Clear {
        #[arg(value_enum)]
        selection: SelectionArg,
    },
    /// Publish every product of a selection to the marketplace
    Publish {
        #[arg(value_enum)]
        selection: SelectionArg,
    },
}

#[derive(Subcommand)]
enum SalesAction {
    /// Aggregated sales figures
    Stats {
        #[arg(short, long)]
        boutique: Option<i32>,

        /// First day included (YYYY-MM-DD)
        #[arg(long)]
        from: Option<NaiveDate>,

        /// Last day included (YYYY-MM-DD)
        #[arg(long)]
        to: Option<NaiveDate>,
    },
    /// Sales of a year or of one of its months
    Period {
        annee: i32,

        #[arg(short, long)]
        month: Option<u32>,

        #[arg(short, long)]
        boutique: Option<i32>,
    },
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = ClientConfig::from_env()?;

    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Products { action } => run_products(&config, action).await?,
        Commands::Selection { action } => run_selection(&config, action).await?,
        Commands::Sales { action } => {
            let client = ApiClient::new(&config)?;
            match action {
                SalesAction::Stats { boutique, from, to } => {
                    commands::sales::stats(&client, boutique, from, to).await?;
                }
                SalesAction::Period {
                    annee,
                    month,
                    boutique,
                } => commands::sales::period(&client, annee, month, boutique).await?,
            }
        }
    }
    Ok(())
}

async fn run_products(
    config: &ClientConfig,
    action: ProductAction,
) -> Result<(), Box<dyn std::error::Error>> {
    let client = ApiClient::new(config)?;
    match action {
        ProductAction::List {
            status,
            search,
            categorie,
            page,
        } => {
            let filters = ProductFilters {
                status,
                search,
                categorie,
            };
            commands::products::list(client, filters, page).await?;
        }
        ProductAction::Toggle { id } => {
            commands::products::toggle(client, &id).await?;
        }
        ProductAction::Status { id, status } => {
            commands::products::set_status(&client, &id, status).await?;
        }
        ProductAction::Validate { id, action } => {
            commands::products::validate(&client, &id, action).await?;
        }
        ProductAction::Publish {
            nom,
            prix,
            prix_texte,
            categorie,
            marque,
            image,
            lien,
            seo,
        } => {
            let mut form = ProductForm {
                nom,
                prix,
                prix_texte,
                image,
                categories: categorie,
                marque,
                lien,
                ..ProductForm::default()
            };
            if seo {
                form.fill_seo(&client).await?;
            }
            commands::products::publish(&client, &form).await?;
        }
        ProductAction::Delete { id } => commands::products::delete(&client, &id).await?,
    }
    Ok(())
}

async fn run_selection(
    config: &ClientConfig,
    action: SelectionAction,
) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        SelectionAction::Add {
            selection,
            nom,
            prix,
            lien,
            image,
            marque,
            categorie,
            source,
        } => {
            let store = commands::selection::open(config, selection)?;
            let product = RawProduct {
                nom: Some(nom),
                prix,
                lien,
                image,
                marque,
                categorie,
                source,
                ..RawProduct::default()
            };
            commands::selection::add(&store, product)?;
        }
        SelectionAction::List { selection } => {
            commands::selection::list(&commands::selection::open(config, selection)?);
        }
        SelectionAction::Remove { selection, index } => {
            commands::selection::remove(&commands::selection::open(config, selection)?, index)?;
        }
        SelectionAction::Clear { selection } => {
            commands::selection::clear(&commands::selection::open(config, selection)?)?;
        }
        SelectionAction::Publish { selection } => {
            let store = commands::selection::open(config, selection)?;
            let client = ApiClient::new(config)?;
            commands::selection::publish(&store, &client).await?;
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_product_list() {
        let cli = Cli::try_parse_from(["mkt", "products", "list", "-s", "draft", "-q", "montre"])
            .unwrap();
        let Commands::Products {
            action: ProductAction::List { status, search, .. },
        } = cli.command
        else {
            panic!("expected products list");
        };
        assert_eq!(status, Some(ProductStatus::Draft));
        assert_eq!(search.as_deref(), Some("montre"));
    }

    #[test]
    fn test_parse_selection_add() {
        let cli = Cli::try_parse_from([
            "mkt", "selection", "add", "campagne", "-n", "Montre", "-p", "15000.50",
        ])
        .unwrap();
        let Commands::Selection {
            action:
                SelectionAction::Add {
                    selection, prix, ..
                },
        } = cli.command
        else {
            panic!("expected selection add");
        };
        assert_eq!(selection, SelectionArg::Campagne);
        assert_eq!(prix, Some(Decimal::new(1_500_050, 2)));
    }

    #[test]
    fn test_rejects_unknown_status() {
        assert!(Cli::try_parse_from(["mkt", "products", "status", "abc", "archived"]).is_err());
    }
}
