use bookstore_client::{Book, BookstoreApi, ClientError};
use tracing::debug;

use crate::operation::Operation;

/// Name given to books renamed by the update operation.
pub const UPDATED_NAME: &str = "Harry Potter 2.0";

/// Returns the sample book that the create operation stores.
pub fn sample_book() -> Book {
    Book::new(
        "Harry Potter and the Prisoner of Azkaban",
        "J K Rowling",
        "134238982734",
        "fantasy",
    )
}

/// Result of an operation that did not fail.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Outcome {
    /// Every request the operation needed was sent and succeeded.
    Completed,

    /// The operation needed an existing book, but there was none, so nothing was done beyond listing.
    Skipped,
}

/// Simulated user behavior against the books API.
///
/// Holds no state between operations: operations that need an existing book list the collection each time and use its
/// last element.
#[derive(Clone)]
pub struct Behavior<C> {
    client: C,
    sample: Book,
}

impl<C> Behavior<C>
where
    C: BookstoreApi,
{
    /// Creates a new `Behavior` that creates copies of [`sample_book`].
    pub fn new(client: C) -> Self {
        Self::with_sample(client, sample_book())
    }

    /// Creates a new `Behavior` that creates copies of the given book.
    pub fn with_sample(client: C, sample: Book) -> Self {
        Self { client, sample }
    }

    /// Runs the given operation.
    ///
    /// # Errors
    ///
    /// If any request made by the operation fails, the error is returned.
    pub async fn execute(&self, operation: Operation) -> Result<Outcome, ClientError> {
        match operation {
            Operation::Create => self.create().await.map(|()| Outcome::Completed),
            Operation::ListAll => self.list_all().await.map(|_| Outcome::Completed),
            Operation::ClearAll => self.clear_all().await.map(|()| Outcome::Completed),
            Operation::Update => self.update().await,
            Operation::GetById => self.get_by_id().await,
            Operation::Delete => self.delete().await,
        }
    }

    /// Stores the sample book.
    pub async fn create(&self) -> Result<(), ClientError> {
        self.client.create(&self.sample).await
    }

    /// Lists every book.
    pub async fn list_all(&self) -> Result<Vec<Book>, ClientError> {
        self.client.list().await
    }

    /// Removes every book.
    pub async fn clear_all(&self) -> Result<(), ClientError> {
        self.client.clear().await
    }

    /// Lists every book and returns the last one, or `None` if there are no books.
    pub async fn fetch_last(&self) -> Result<Option<Book>, ClientError> {
        let mut books = self.list_all().await?;
        Ok(books.pop())
    }

    /// Renames the last listed book to [`UPDATED_NAME`].
    pub async fn update(&self) -> Result<Outcome, ClientError> {
        let Some((id, mut book)) = self.fetch_last_addressable(Operation::Update).await? else {
            return Ok(Outcome::Skipped);
        };

        book.name = UPDATED_NAME.to_string();
        self.client.update(&id, &book).await?;
        Ok(Outcome::Completed)
    }

    /// Fetches the last listed book by its identifier.
    pub async fn get_by_id(&self) -> Result<Outcome, ClientError> {
        let Some((id, _)) = self.fetch_last_addressable(Operation::GetById).await? else {
            return Ok(Outcome::Skipped);
        };

        let _ = self.client.get(&id).await?;
        Ok(Outcome::Completed)
    }

    /// Removes the last listed book by its identifier.
    pub async fn delete(&self) -> Result<Outcome, ClientError> {
        let Some((id, _)) = self.fetch_last_addressable(Operation::Delete).await? else {
            return Ok(Outcome::Skipped);
        };

        self.client.delete(&id).await?;
        Ok(Outcome::Completed)
    }

    async fn fetch_last_addressable(&self, operation: Operation) -> Result<Option<(String, Book)>, ClientError> {
        let Some(book) = self.fetch_last().await? else {
            debug!(%operation, "No books available. Skipping.");
            return Ok(None);
        };

        match book.id() {
            Some(id) => Ok(Some((id.to_string(), book))),
            None => {
                debug!(%operation, "Last listed book has no identifier. Skipping.");
                Ok(None)
            }
        }
    }
}
