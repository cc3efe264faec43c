use async_trait::async_trait;

use crate::{Book, ClientError};

/// The books API.
///
/// Each method maps to exactly one request against the API. Implementations must be cheap to clone, as every actor
/// holds its own handle.
#[async_trait]
pub trait BookstoreApi: Clone + Send + Sync + 'static {
    /// Stores a new book. (`POST books`)
    async fn create(&self, book: &Book) -> Result<(), ClientError>;

    /// Lists every stored book, in the order the API returns them. (`GET books`)
    async fn list(&self) -> Result<Vec<Book>, ClientError>;

    /// Removes every stored book. (`DELETE books`)
    async fn clear(&self) -> Result<(), ClientError>;

    /// Replaces the book with the given identifier. (`PUT book/{id}`)
    async fn update(&self, id: &str, book: &Book) -> Result<(), ClientError>;

    /// Fetches the book with the given identifier. (`GET book/{id}`)
    async fn get(&self, id: &str) -> Result<Book, ClientError>;

    /// Removes the book with the given identifier. (`DELETE book/{id}`)
    async fn delete(&self, id: &str) -> Result<(), ClientError>;
}
