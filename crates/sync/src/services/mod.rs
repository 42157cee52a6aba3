//! Domain services built on the Shopify client.
//!
//! Each module is a set of free async functions taking the [`RestClient`]
//! as their first argument, mirroring how the resource-specific call sites
//! stay thin and the client stays generic.
//!
//! [`RestClient`]: crate::shopify::RestClient

pub mod events;
pub mod inventory;
pub mod products;
pub mod reconcile;
pub mod redirects;
pub mod scanner;
pub mod scheduler;
