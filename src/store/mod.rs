//! Reactive client state.
//!
//! - `Atom`: shared cell with subscribe/notify
//! - `PersistedAtom`: atom mirrored into a storage slot
//! - `QueryAtom`: lazily fetched, cached cell with `{data, error, is_loading}`
//! - `QueryClient`: key → query cache
//! - `Session`: the access token, current user, product listing and preferences

pub mod atom;
pub mod cache;
pub mod persisted;
pub mod query;
pub mod session;

pub use atom::{Atom, SubscriptionId};
pub use cache::QueryClient;
pub use persisted::{AtomUpdate, PersistedAtom};
pub use query::{QueryAtom, QueryKey, QueryState};
pub use session::{access_token_atom, AccessToken, Session};
