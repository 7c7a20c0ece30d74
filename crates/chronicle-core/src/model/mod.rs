//! Typed catalog model.
//!
//! An [`EventRecord`] is one entry of the `events` array; a [`Catalog`] is the
//! whole document with entries that failed to parse kept as
//! [`MalformedEntry`] values in their original positions.

mod catalog;
mod event;
mod slot;

pub use catalog::{Catalog, CatalogEntry, CatalogShapeError, MalformedEntry};
pub use event::{Coordinates, DECADE_SUFFIX, EventRecord, KeyLayout, decade_for_year};
pub use slot::Slot;
