use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;
use uuid::Uuid;

use crate::api::client::{ApiClient, ReviewsQuery};
use crate::reviews::{RatingSummary, ReviewAggregate, ReviewPage};
use crate::store::atom::SubscriptionId;
use crate::store::cache::QueryClient;
use crate::store::query::{QueryAtom, QueryKey, QueryState};
use crate::types::{Product, Reviews};

pub const PLACEHOLDER_IMAGE: &str = "/assets/product-placeholder.png";
const FALLBACK_BADGE_COLOR: &str = "gray";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Badge {
    pub label: String,
    /// Color token such as `orange.500`
    pub background: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductCardView {
    pub id: Uuid,
    pub name: String,
    pub price: String,
    pub image: String,
    pub badges: Vec<Badge>,
    /// Skeleton while the first review page is in flight
    pub loading: bool,
    pub rating: Option<RatingSummary>,
}

pub fn review_query_key(product_id: &Uuid) -> QueryKey {
    QueryKey::new(["reviews".to_string(), product_id.to_string()])
}

pub fn format_price(product: &Product) -> String {
    format!("${} {}", product.price, product.currency)
}

fn badges(product: &Product) -> Vec<Badge> {
    product
        .categories
        .iter()
        .map(|category| Badge {
            label: category.name.clone(),
            background: format!(
                "{}.500",
                category.color.as_deref().unwrap_or(FALLBACK_BADGE_COLOR)
            ),
        })
        .collect()
}

/// Fold a resolved review fetch into the card's aggregate
fn fold_reviews(aggregate: &Mutex<ReviewAggregate>, product_id: Uuid, state: &QueryState<Reviews>) {
    if !state.is_success() {
        return;
    }
    let Some(page) = state.data.as_ref() else {
        return;
    };
    aggregate
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .apply_page(ReviewPage {
            product_id,
            generation: state.generation,
            reviews: page.data.clone(),
        });
}

/// A mounted product card.
///
/// Owns the review aggregate for its product for as long as it stays
/// mounted; dropping the card unsubscribes from the review query and
/// discards the aggregate.
pub struct ProductCard {
    product: Product,
    reviews: QueryAtom<Reviews>,
    aggregate: Arc<Mutex<ReviewAggregate>>,
    subscription: SubscriptionId,
}

impl ProductCard {
    pub fn mount(product: Product, client: &ApiClient, queries: &QueryClient) -> Self {
        let product_id = product.id;
        let reviews = {
            let client = client.clone();
            queries.query(review_query_key(&product_id), move || {
                let client = client.clone();
                async move { client.read_reviews(ReviewsQuery::for_product(product_id)).await }
            })
        };

        let aggregate = Arc::new(Mutex::new(ReviewAggregate::new()));
        // A warm cache is folded right away, later fetches arrive through the subscription
        fold_reviews(&aggregate, product_id, &reviews.state());

        let subscription = {
            let aggregate = aggregate.clone();
            reviews.subscribe(move |state| fold_reviews(&aggregate, product_id, state))
        };

        tracing::trace!(product = %product_id, "mounted product card");
        Self {
            product,
            reviews,
            aggregate,
            subscription,
        }
    }

    pub fn product(&self) -> &Product {
        &self.product
    }

    pub fn product_id(&self) -> Uuid {
        self.product.id
    }

    /// Load reviews if needed and render
    pub async fn load(&self) -> ProductCardView {
        let state = self.reviews.load().await;
        if let Some(e) = &state.error {
            tracing::warn!(product = %self.product.id, "Failed to load reviews: {}", e);
        }
        self.view()
    }

    pub async fn refresh(&self) -> ProductCardView {
        self.reviews.refetch().await;
        self.view()
    }

    /// Replace the product shown by a re-rendered listing, keeping the aggregate
    pub fn update_product(&mut self, product: Product) {
        if product.id == self.product.id {
            self.product = product;
        }
    }

    pub fn rating(&self) -> Option<RatingSummary> {
        self.aggregate
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .summary(&self.product.id)
    }

    pub fn review_count(&self) -> usize {
        self.aggregate
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .reviews(&self.product.id)
            .len()
    }

    pub fn view(&self) -> ProductCardView {
        let state = self.reviews.state();
        let product = &self.product;
        ProductCardView {
            id: product.id,
            name: product.name.clone(),
            price: format_price(product),
            image: product
                .images
                .first()
                .cloned()
                .unwrap_or_else(|| PLACEHOLDER_IMAGE.to_string()),
            badges: badges(product),
            loading: state.is_loading && state.data.is_none(),
            rating: self.rating(),
        }
    }
}

impl Drop for ProductCard {
    fn drop(&mut self) {
        self.reviews.unsubscribe(self.subscription);
        tracing::trace!(product = %self.product.id, "unmounted product card");
    }
}
