use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use bookstore_client::{Book, BookstoreApi, ClientError};
use http::StatusCode;

use crate::operation::{Operation, OperationWeights};

/// A request received by [`FakeBookstore`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Call {
    Create(Book),
    List,
    Clear,
    Update(String, Book),
    Get(String),
    Delete(String),
}

#[derive(Default)]
struct Inner {
    books: Vec<Book>,
    next_id: u64,
    calls: Vec<Call>,
    failure: Option<StatusCode>,
    latency: Option<Duration>,
}

/// In-memory books API that records every call it receives.
#[derive(Clone, Default)]
pub struct FakeBookstore {
    inner: Arc<Mutex<Inner>>,
}

impl FakeBookstore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a fake holding the given books, each assigned a fresh identifier.
    pub fn with_books(books: Vec<Book>) -> Self {
        let fake = Self::new();
        {
            let mut inner = fake.inner.lock().unwrap();
            for book in books {
                let id = inner.assign_id();
                inner.books.push(book.with_id(id));
            }
        }
        fake
    }

    /// Stores a book as-is, without assigning it an identifier.
    pub fn insert_raw(&self, book: Book) {
        self.inner.lock().unwrap().books.push(book);
    }

    pub fn books(&self) -> Vec<Book> {
        self.inner.lock().unwrap().books.clone()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.inner.lock().unwrap().calls.clone()
    }

    pub fn reset_calls(&self) {
        self.inner.lock().unwrap().calls.clear();
    }

    /// Makes every subsequent call fail with the given status.
    pub fn fail_with(&self, status: StatusCode) {
        self.inner.lock().unwrap().failure = Some(status);
    }

    /// Makes every subsequent call wait for the given duration before answering.
    pub fn with_latency(self, latency: Duration) -> Self {
        self.inner.lock().unwrap().latency = Some(latency);
        self
    }

    async fn begin(&self, call: Call) -> Result<(), ClientError> {
        let latency = self.inner.lock().unwrap().latency;
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(call);
        match inner.failure {
            Some(status) => Err(ClientError::NonSuccessStatus {
                path: "fake".to_string(),
                status,
                body: String::new(),
            }),
            None => Ok(()),
        }
    }
}

impl Inner {
    fn assign_id(&mut self) -> String {
        self.next_id += 1;
        format!("{:024x}", self.next_id)
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.books.iter().position(|b| b.id() == Some(id))
    }
}

fn not_found(id: &str) -> ClientError {
    ClientError::NonSuccessStatus {
        path: format!("book/{}", id),
        status: StatusCode::NOT_FOUND,
        body: String::new(),
    }
}

#[async_trait]
impl BookstoreApi for FakeBookstore {
    async fn create(&self, book: &Book) -> Result<(), ClientError> {
        self.begin(Call::Create(book.clone())).await?;

        let mut inner = self.inner.lock().unwrap();
        let id = inner.assign_id();
        let mut stored = book.clone();
        stored.id = Some(id);
        inner.books.push(stored);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<Book>, ClientError> {
        self.begin(Call::List).await?;
        Ok(self.books())
    }

    async fn clear(&self) -> Result<(), ClientError> {
        self.begin(Call::Clear).await?;
        self.inner.lock().unwrap().books.clear();
        Ok(())
    }

    async fn update(&self, id: &str, book: &Book) -> Result<(), ClientError> {
        self.begin(Call::Update(id.to_string(), book.clone())).await?;

        let mut inner = self.inner.lock().unwrap();
        let idx = inner.position(id).ok_or_else(|| not_found(id))?;
        inner.books[idx] = book.clone().with_id(id);
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Book, ClientError> {
        self.begin(Call::Get(id.to_string())).await?;

        let inner = self.inner.lock().unwrap();
        let idx = inner.position(id).ok_or_else(|| not_found(id))?;
        Ok(inner.books[idx].clone())
    }

    async fn delete(&self, id: &str) -> Result<(), ClientError> {
        self.begin(Call::Delete(id.to_string())).await?;

        let mut inner = self.inner.lock().unwrap();
        if let Some(idx) = inner.position(id) {
            inner.books.remove(idx);
        }
        Ok(())
    }
}

/// Returns weights under which only the given operation is ever picked.
pub fn weights_for(operation: Operation) -> OperationWeights {
    let mut weights = OperationWeights {
        create: 0,
        list_all: 0,
        clear_all: 0,
        update: 0,
        get_by_id: 0,
        delete: 0,
    };
    match operation {
        Operation::Create => weights.create = 1,
        Operation::ListAll => weights.list_all = 1,
        Operation::ClearAll => weights.clear_all = 1,
        Operation::Update => weights.update = 1,
        Operation::GetById => weights.get_by_id = 1,
        Operation::Delete => weights.delete = 1,
    }
    weights
}
