//! In-process `DocumentStore` used as the reference backend and in tests.

mod aggregate;
mod core;
mod geo;
mod ops;

pub use core::MemoryCollection;
