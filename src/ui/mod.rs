//! Headless presentation layer.
//!
//! Components render to plain view structs; the login form, storefront and
//! product cards drive the session and query atoms the same way a browser
//! front end would.

pub mod layout;
pub mod login;
pub mod product_card;
pub mod router;
pub mod storefront;
pub mod toaster;

pub use layout::{header_for, pick_palette, Avatar, HeaderView, MenuItem, APP_TITLE};
pub use login::{LoginContext, LoginForm, LoginPhase, LoginView};
pub use product_card::{ProductCard, ProductCardView};
pub use router::{Navigator, Route, HOME_PATH, LOGIN_PATH};
pub use storefront::{ProductGrid, Storefront, StorefrontView};
pub use toaster::{Toast, ToastKind, Toaster};
