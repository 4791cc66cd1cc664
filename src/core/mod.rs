//! Core inventory logic - framework-agnostic stores, name resolution and reporting.
//!
//! [`location::LocationStore`] and [`item::ItemStore`] own one collection each and
//! persist through either the local mirror or a [`crate::remote::RemoteStore`].
//! [`catalog::Catalog`] is the entry point for item writes because it resolves location
//! names with [`resolver::Resolver`] before an item is stored.

pub mod catalog;
pub mod item;
pub mod location;
pub mod report;
pub mod resolver;
pub mod tree;

pub(crate) mod sync;

pub use catalog::Catalog;
pub use item::{Inventory, ItemSort, ItemStore};
pub use location::LocationStore;
pub use report::LocationSummary;
pub use resolver::{NamePrecedence, ResolvedLocation, Resolver};
pub use tree::LocationTree;
