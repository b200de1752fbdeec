//! Catalog commands: browse products and categories, signed in or not.

use maplecart_core::ProductId;
use maplecart_storefront::catalog::{CatalogApi, ProductFilter};

use super::{CliError, Context};

/// List products, paged and optionally searched.
pub async fn products(
    page: Option<u32>,
    size: Option<u32>,
    search: Option<String>,
    category: Option<String>,
) -> Result<(), CliError> {
    let ctx = Context::load()?;
    let filter = ProductFilter {
        page,
        size,
        search,
        category,
        sort: None,
    };

    let listing = ctx.client.list_products(&filter).await?;
    for product in &listing.products {
        match product.price {
            Some(price) => tracing::info!("{}  {} @ {}", product.id, product.name, price),
            None => tracing::info!("{}  {}", product.id, product.name),
        }
    }
    tracing::info!(
        "Page {} of {} ({} products)",
        listing.page,
        listing.pages,
        listing.total
    );
    Ok(())
}

/// Show one product.
pub async fn product(id: &str) -> Result<(), CliError> {
    let ctx = Context::load()?;
    let product = ctx.client.fetch_product(&ProductId::new(id)).await?;

    tracing::info!("{} ({})", product.name, product.id);
    if let Some(price) = product.price {
        tracing::info!("Price {}", price);
    }
    if let Some(stock) = product.stock {
        tracing::info!("Stock {stock}");
    }
    if !product.description.is_empty() {
        tracing::info!("{}", product.description);
    }
    Ok(())
}

/// List catalog categories.
pub async fn categories() -> Result<(), CliError> {
    let ctx = Context::load()?;
    for category in ctx.client.list_categories().await? {
        tracing::info!("{}  {}", category.id, category.name);
    }
    Ok(())
}
