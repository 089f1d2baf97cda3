//! Shopfront CLI - drive the session and cart stores against a live API.
//!
//! # Usage
//!
//! ```bash
//! # Log in as a merchant (password may also come from SHOPFRONT_PASSWORD)
//! shopfront login -r merchant -e m@example.com -p secret
//!
//! # Pick up a credential handed off by a federated login redirect
//! shopfront whoami --url "https://shop.example.com/customer/orders?token=..."
//!
//! # Ask the route guard about a navigation
//! shopfront navigate /merchant/dashboard --requires-auth --role merchant
//!
//! # Work with the cart
//! shopfront cart add 42 -q 2
//! shopfront cart show
//! ```
//!
//! # Commands
//!
//! - `login` / `logout` / `whoami` - Session transitions
//! - `navigate` - Route guard decision for a path
//! - `cart` - Cart operations
//!
//! The credential is kept in the JSON file named by `SHOPFRONT_STORAGE_PATH`.

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use shopfront_client::ClientConfig;
use shopfront_core::{ProductId, Role};

mod commands;

#[derive(Parser)]
#[command(name = "shopfront")]
#[command(author, version, about = "Shopfront storefront client")]
struct Cli {
    /// Current navigation URL (defaults to the API URL)
    #[arg(long, global = true)]
    url: Option<String>,

    /// Cookies visible to the page, as in `document.cookie`
    #[arg(long, global = true)]
    cookie: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in to a role namespace
    Login {
        /// Role namespace (`customer`, `merchant`, `admin`)
        #[arg(short, long, default_value = "customer")]
        role: Role,

        /// Account email
        #[arg(short, long)]
        email: String,

        /// Account password
        #[arg(short, long, env = "SHOPFRONT_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Log out and forget the stored credential
    Logout,
    /// Show the current identity
    Whoami,
    /// Show what the route guard decides for a path
    Navigate {
        /// Route path
        path: String,

        /// Route requires an authenticated session
        #[arg(long)]
        requires_auth: bool,

        /// Role the route is restricted to (implies --requires-auth)
        #[arg(short, long)]
        role: Option<Role>,
    },
    /// Work with the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
}

#[derive(Subcommand)]
enum CartAction {
    /// Fetch and print the cart
    Show,
    /// Add a product
    Add {
        product_id: ProductId,

        #[arg(short, long, default_value_t = 1)]
        quantity: u32,
    },
    /// Set a product's quantity (0 removes it)
    Set { product_id: ProductId, quantity: u32 },
    /// Remove a product
    Remove { product_id: ProductId },
    /// Empty the cart
    Clear,
    /// Print the server's cart summary
    Summary,
    /// Print the server's item count
    Count,
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &ClientConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match ClientConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing_subscriber::fmt::init();
            tracing::error!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    // Initialize Sentry (must be done before tracing subscriber)
    let _sentry_guard = init_sentry(&config);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "shopfront_client=info,shopfront_cli=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    if let Err(e) = run(cli, config).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: ClientConfig) -> Result<(), commands::CliError> {
    let ctx = commands::Context::new(config, cli.url.as_deref(), cli.cookie.as_deref())?;

    match cli.command {
        Commands::Login {
            role,
            email,
            password,
        } => commands::auth::login(&ctx, role, email, password).await?,
        Commands::Logout => commands::auth::logout(&ctx).await,
        Commands::Whoami => commands::auth::whoami(&ctx).await,
        Commands::Navigate {
            path,
            requires_auth,
            role,
        } => commands::auth::navigate(&ctx, path, requires_auth, role).await,
        Commands::Cart { action } => match action {
            CartAction::Show => commands::cart::show(&ctx).await?,
            CartAction::Add {
                product_id,
                quantity,
            } => commands::cart::add(&ctx, product_id, quantity).await?,
            CartAction::Set {
                product_id,
                quantity,
            } => commands::cart::set(&ctx, product_id, quantity).await?,
            CartAction::Remove { product_id } => commands::cart::remove(&ctx, product_id).await?,
            CartAction::Clear => commands::cart::clear(&ctx).await?,
            CartAction::Summary => commands::cart::summary(&ctx).await?,
            CartAction::Count => commands::cart::count(&ctx).await,
        },
    }
    Ok(())
}
