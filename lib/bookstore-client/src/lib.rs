//! Client primitives for the books API.
//!
//! This crate provides the book entity as exchanged with the API, the [`BookstoreApi`] trait that abstracts over the
//! six endpoints, and [`HttpBookstore`], the HTTP implementation of that trait.
#![deny(missing_docs)]

mod api;
pub use self::api::BookstoreApi;

mod client;
pub use self::client::{HttpBookstore, HttpBookstoreBuilder};

mod error;
pub use self::error::ClientError;

mod model;
pub use self::model::Book;
