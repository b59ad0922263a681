pub mod client;
pub mod middleware;
pub mod request;
pub mod transport;

pub use client::{ApiClient, ProductsQuery, ReviewsQuery};
pub use middleware::{AuthMiddleware, Middleware, MiddlewarePipeline, TokenSource};
pub use request::{ApiRequest, ApiResponse, RequestBody};
pub use transport::{HttpTransport, Transport};
