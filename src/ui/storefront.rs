use futures::future::join_all;
use serde::Serialize;

use crate::api::client::ApiClient;
use crate::store::cache::QueryClient;
use crate::store::session::Session;
use crate::ui::product_card::{review_query_key, ProductCard, ProductCardView};

pub const STOREFRONT_TITLE: &str = "Shop Now!";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ProductGrid {
    Loading,
    /// Fallback shown instead of the grid when the listing failed
    Failed { message: String },
    Products { cards: Vec<ProductCardView> },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StorefrontView {
    pub title: &'static str,
    pub grid: ProductGrid,
}

/// The mounted product grid; cards live as long as their product stays listed
pub struct Storefront {
    client: ApiClient,
    queries: QueryClient,
    session: Session,
    cards: Vec<ProductCard>,
}

impl Storefront {
    pub fn mount(client: &ApiClient, queries: &QueryClient, session: &Session) -> Self {
        tracing::debug!("mounted storefront");
        Self {
            client: client.clone(),
            queries: queries.clone(),
            session: session.clone(),
            cards: Vec::new(),
        }
    }

    pub fn cards(&self) -> &[ProductCard] {
        &self.cards
    }

    /// Current view without fetching anything
    pub fn view(&self) -> StorefrontView {
        let state = self.session.products.state();
        let grid = match (&state.data, &state.error) {
            (_, Some(e)) => ProductGrid::Failed { message: e.to_string() },
            (Some(_), None) => ProductGrid::Products {
                cards: self.cards.iter().map(ProductCard::view).collect(),
            },
            (None, None) => ProductGrid::Loading,
        };
        StorefrontView {
            title: STOREFRONT_TITLE,
            grid,
        }
    }

    /// Load the listing, reconcile mounted cards with it, then load every card's reviews
    pub async fn render(&mut self) -> StorefrontView {
        let state = self.session.load_products().await;

        if let Some(e) = &state.error {
            tracing::warn!("Failed to load products: {}", e);
            return StorefrontView {
                title: STOREFRONT_TITLE,
                grid: ProductGrid::Failed { message: e.to_string() },
            };
        }

        let Some(products) = state.data else {
            return StorefrontView {
                title: STOREFRONT_TITLE,
                grid: ProductGrid::Loading,
            };
        };

        let mut previous = std::mem::take(&mut self.cards);
        for product in products.data {
            let card = match previous.iter().position(|card| card.product_id() == product.id) {
                Some(index) => {
                    let mut card = previous.swap_remove(index);
                    card.update_product(product);
                    card
                }
                None => ProductCard::mount(product, &self.client, &self.queries),
            };
            self.cards.push(card);
        }
        // Anything left was delisted: unmount it and forget its reviews
        for card in previous {
            self.queries.remove(&review_query_key(&card.product_id()));
        }

        let cards = join_all(self.cards.iter().map(|card| card.load())).await;
        tracing::debug!(count = cards.len(), cached_queries = self.queries.len(), "rendered storefront");

        StorefrontView {
            title: STOREFRONT_TITLE,
            grid: ProductGrid::Products { cards },
        }
    }
}
