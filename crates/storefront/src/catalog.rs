//! Catalog reads: products and categories.
//!
//! The catalog is browsable without a session. Each read picks the public
//! endpoint (under `/api/public/`, which never receives the bearer token)
//! when no token is held, and the authenticated endpoint otherwise, matching
//! the backend's split catalog surface.

use maplecart_core::ProductId;

use crate::api::ApiClient;
use crate::error::Result;
use crate::types::{Category, Product, ProductsPage};

/// Filters for the product listing.
#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    pub page: Option<u32>,
    pub size: Option<u32>,
    pub search: Option<String>,
    pub category: Option<String>,
    pub sort: Option<String>,
}

impl ProductFilter {
    /// Render the filter as a query string, empty when no filter is set.
    #[must_use]
    pub fn query_string(&self) -> String {
        let mut params = Vec::new();
        if let Some(page) = self.page {
            params.push(format!("page={page}"));
        }
        if let Some(size) = self.size {
            params.push(format!("size={size}"));
        }
        if let Some(search) = &self.search {
            params.push(format!("search={search}"));
        }
        if let Some(category) = &self.category {
            params.push(format!("category={category}"));
        }
        if let Some(sort) = &self.sort {
            params.push(format!("sort={sort}"));
        }

        if params.is_empty() {
            String::new()
        } else {
            format!("?{}", params.join("&"))
        }
    }
}

/// Backend surface for the browsable catalog.
pub trait CatalogApi {
    /// List products, paged and filtered.
    fn list_products(
        &self,
        filter: &ProductFilter,
    ) -> impl Future<Output = Result<ProductsPage>> + Send;

    /// Fetch a single product by id.
    fn fetch_product(&self, id: &ProductId) -> impl Future<Output = Result<Product>> + Send;

    /// List all categories.
    fn list_categories(&self) -> impl Future<Output = Result<Vec<Category>>> + Send;
}

impl CatalogApi for ApiClient {
    async fn list_products(&self, filter: &ProductFilter) -> Result<ProductsPage> {
        let base = if self.has_session() {
            "/api/products"
        } else {
            "/api/public/products"
        };
        self.fetch(&format!("{base}{}", filter.query_string()))
            .await
    }

    async fn fetch_product(&self, id: &ProductId) -> Result<Product> {
        let base = if self.has_session() {
            "/api/products"
        } else {
            "/api/public/products"
        };
        self.fetch(&format!("{base}/{id}")).await
    }

    async fn list_categories(&self) -> Result<Vec<Category>> {
        let path = if self.has_session() {
            "/api/categories"
        } else {
            "/api/public/categories"
        };
        self.fetch(path).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_filter_renders_no_query() {
        assert_eq!(ProductFilter::default().query_string(), "");
    }

    #[test]
    fn test_filter_query_string() {
        let filter = ProductFilter {
            page: Some(2),
            size: Some(20),
            search: Some("tote".to_string()),
            ..ProductFilter::default()
        };
        assert_eq!(filter.query_string(), "?page=2&size=20&search=tote");
    }

    #[test]
    fn test_products_page_from_wire() {
        let json = r#"{
            "products": [
                {"_id": "p1", "name": "Canvas Tote", "price": "25.00", "stock": 10},
                {"_id": "p2", "name": "Enamel Mug"}
            ],
            "page": 1,
            "pages": 3,
            "total": 42
        }"#;

        let page: ProductsPage = serde_json::from_str(json).unwrap();
        assert_eq!(page.products.len(), 2);
        assert_eq!(page.total, 42);
        assert_eq!(
            page.products[0].price,
            Some(rust_decimal::Decimal::new(2500, 2))
        );
        // Public listings may omit price and stock
        assert!(page.products[1].price.is_none());
    }
}
