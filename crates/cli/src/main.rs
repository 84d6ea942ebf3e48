//! Processing Time CLI - Migrations and operator tools.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! pt-cli migrate
//!
//! # Set a product's assembly time
//! pt-cli assembly-time set --shop demo.myshopify.com --product 632910392 --value 4
//!
//! # Recompute a product's processing time now
//! pt-cli recompute --shop demo.myshopify.com --product 632910392
//!
//! # Recreate the webhook subscriptions of a shop
//! pt-cli webhooks register --shop demo.myshopify.com
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `assembly-time` - Read or write the assembly time metafield
//! - `recompute` - Recompute a product's processing time
//! - `webhooks register` - Register webhook subscriptions

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "pt-cli")]
#[command(author, version, about = "Processing time CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage product assembly times
    AssemblyTime {
        #[command(subcommand)]
        action: AssemblyTimeAction,
    },
    /// Recompute the processing time of one product
    Recompute {
        /// Shop domain (`example.myshopify.com`)
        #[arg(short, long)]
        shop: String,

        /// Product id, numeric or `gid://shopify/Product/<id>`
        #[arg(short, long)]
        product: String,
    },
    /// Manage webhook subscriptions
    Webhooks {
        #[command(subcommand)]
        action: WebhooksAction,
    },
}

#[derive(Subcommand)]
enum AssemblyTimeAction {
    /// Show the current assembly and processing time
    Get {
        #[arg(short, long)]
        shop: String,

        #[arg(short, long)]
        product: String,
    },
    /// Set the assembly time of a product
    Set {
        #[arg(short, long)]
        shop: String,

        #[arg(short, long)]
        product: String,

        /// Assembly time, a non-negative integer
        #[arg(short, long)]
        value: String,
    },
}

#[derive(Subcommand)]
enum WebhooksAction {
    /// Register every webhook subscription the app needs
    Register {
        #[arg(short, long)]
        shop: String,
    },
}

#[tokio::main]
async fn main() {
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
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::AssemblyTime { action } => match action {
            AssemblyTimeAction::Get { shop, product } => {
                commands::metafields::show(&shop, &product).await?;
            }
            AssemblyTimeAction::Set {
                shop,
                product,
                value,
            } => {
                commands::metafields::set_assembly_time(&shop, &product, &value).await?;
            }
        },
        Commands::Recompute { shop, product } => {
            commands::metafields::recompute(&shop, &product).await?;
        }
        Commands::Webhooks { action } => match action {
            WebhooksAction::Register { shop } => commands::webhooks::register(&shop).await?,
        },
    }
    Ok(())
}
