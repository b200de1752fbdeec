//! Maplecart CLI - drive a storefront backend from the terminal.
//!
//! # Usage
//!
//! ```bash
//! # Browse the catalog (no sign-in needed)
//! maple catalog products --search tote
//!
//! # Sign in and persist the session token
//! maple auth login -e ada@example.com -p hunter2
//!
//! # Inspect and mutate the cart
//! maple cart show
//! maple cart add --product p1 --inventory inv1 --quantity 2
//! maple cart coupon apply SAVE10
//!
//! # Order history
//! maple orders list --status delivered
//! maple orders cancel o123 --reason "ordered by mistake"
//!
//! # Run a checkout against the payment gateway
//! maple checkout --address a1
//! ```
//!
//! Configuration comes from `MAPLECART_*` environment variables (a `.env`
//! file is honored); see `maplecart_storefront::config`.

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

use commands::CliError;

#[derive(Parser)]
#[command(name = "maple")]
#[command(author, version, about = "Maplecart storefront CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage the session
    Auth {
        #[command(subcommand)]
        action: AuthAction,
    },
    /// Browse the product catalog (works without signing in)
    Catalog {
        #[command(subcommand)]
        action: CatalogAction,
    },
    /// Inspect and mutate the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Order history
    Orders {
        #[command(subcommand)]
        action: OrdersAction,
    },
    /// Check out the current cart
    Checkout {
        /// Saved address id to ship to
        #[arg(short, long)]
        address: String,

        /// Coupon code to apply before charging
        #[arg(short, long)]
        coupon: Option<String>,
    },
}

#[derive(Subcommand)]
enum AuthAction {
    /// Sign in and persist the session token
    Login {
        /// Account email address
        #[arg(short, long)]
        email: String,

        /// Account password
        #[arg(short, long)]
        password: String,
    },
    /// Create a new account (requires email verification before login)
    Register {
        /// Display name
        #[arg(short, long)]
        name: String,

        /// Account email address
        #[arg(short, long)]
        email: String,

        /// Account password
        #[arg(short, long)]
        password: String,
    },
    /// Drop the persisted session
    Logout,
    /// Show the signed-in user
    Whoami,
}

#[derive(Subcommand)]
enum CatalogAction {
    /// List products
    Products {
        /// Page number
        #[arg(long)]
        page: Option<u32>,

        /// Page size
        #[arg(long)]
        size: Option<u32>,

        /// Search term
        #[arg(short, long)]
        search: Option<String>,

        /// Filter by category id
        #[arg(short, long)]
        category: Option<String>,
    },
    /// Show one product
    Product {
        /// Product id
        product: String,
    },
    /// List categories
    Categories,
}

#[derive(Subcommand)]
enum CartAction {
    /// Show the cart with a price quote
    Show,
    /// Add a product variant to the cart
    Add {
        /// Product id
        #[arg(long)]
        product: String,

        /// Inventory (variant) id
        #[arg(long)]
        inventory: String,

        /// Units to add
        #[arg(short, long, default_value = "1")]
        quantity: u32,
    },
    /// Set the quantity of a cart line
    Update {
        /// Cart item id
        item: String,

        /// New quantity
        #[arg(short, long)]
        quantity: u32,
    },
    /// Remove a cart line
    Remove {
        /// Cart item id
        item: String,
    },
    /// Empty the cart
    Clear,
    /// Manage the applied coupon
    Coupon {
        #[command(subcommand)]
        action: CouponAction,
    },
}

#[derive(Subcommand)]
enum CouponAction {
    /// Validate and apply a coupon code
    Apply {
        /// Coupon code
        code: String,
    },
    /// Detach a coupon from the account
    Remove {
        /// Coupon id
        coupon: String,
    },
}

#[derive(Subcommand)]
enum OrdersAction {
    /// List past orders
    List {
        /// Page number
        #[arg(long)]
        page: Option<u32>,

        /// Page size
        #[arg(long)]
        limit: Option<u32>,

        /// Filter by status (pending, processing, shipped, delivered, cancelled)
        #[arg(short, long)]
        status: Option<String>,
    },
    /// Show one order
    Show {
        /// Order id
        order: String,
    },
    /// Cancel an order
    Cancel {
        /// Order id
        order: String,

        /// Cancellation reason
        #[arg(short, long)]
        reason: String,
    },
    /// Request a return for one item on a delivered order
    Return {
        /// Order id
        order: String,

        /// Order item id
        item: String,

        /// Return reason
        #[arg(short, long)]
        reason: String,

        /// Optional note for the merchant
        #[arg(long, default_value = "")]
        note: String,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Commands::Auth { action } => match action {
            AuthAction::Login { email, password } => {
                commands::auth::login(&email, &password).await?;
            }
            AuthAction::Register {
                name,
                email,
                password,
            } => commands::auth::register(&name, &email, &password).await?,
            AuthAction::Logout => commands::auth::logout()?,
            AuthAction::Whoami => commands::auth::whoami().await?,
        },
        Commands::Catalog { action } => match action {
            CatalogAction::Products {
                page,
                size,
                search,
                category,
            } => commands::catalog::products(page, size, search, category).await?,
            CatalogAction::Product { product } => commands::catalog::product(&product).await?,
            CatalogAction::Categories => commands::catalog::categories().await?,
        },
        Commands::Cart { action } => match action {
            CartAction::Show => commands::cart::show().await?,
            CartAction::Add {
                product,
                inventory,
                quantity,
            } => commands::cart::add(&product, &inventory, quantity).await?,
            CartAction::Update { item, quantity } => {
                commands::cart::update(&item, quantity).await?;
            }
            CartAction::Remove { item } => commands::cart::remove(&item).await?,
            CartAction::Clear => commands::cart::clear().await?,
            CartAction::Coupon { action } => match action {
                CouponAction::Apply { code } => commands::cart::apply_coupon(&code).await?,
                CouponAction::Remove { coupon } => commands::cart::remove_coupon(&coupon).await?,
            },
        },
        Commands::Orders { action } => match action {
            OrdersAction::List { page, limit, status } => {
                commands::orders::list(page, limit, status.as_deref()).await?;
            }
            OrdersAction::Show { order } => commands::orders::show(&order).await?,
            OrdersAction::Cancel { order, reason } => {
                commands::orders::cancel(&order, &reason).await?;
            }
            OrdersAction::Return {
                order,
                item,
                reason,
                note,
            } => commands::orders::request_return(&order, &item, &reason, &note).await?,
        },
        Commands::Checkout { address, coupon } => {
            commands::checkout::run(&address, coupon.as_deref()).await?;
        }
    }
    Ok(())
}
