use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use snafu::{ensure, ResultExt as _};
use tracing::trace;
use url::Url;

use crate::{
    error::{Build, Decode, InvalidBaseUrl, InvalidPath, Network, NonSuccessStatus, UnsupportedBaseUrl},
    Book, BookstoreApi, ClientError,
};

const BOOKS_PATH: &str = "books";
const BOOK_PATH: &str = "book/";
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_ERROR_BODY_LEN: usize = 256;

/// Builder for [`HttpBookstore`].
pub struct HttpBookstoreBuilder {
    base_url: String,
    request_timeout: Duration,
}

impl HttpBookstoreBuilder {
    /// Sets the timeout applied to each request, from connecting until the response body has been read.
    ///
    /// Defaults to 10 seconds.
    pub fn with_request_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }

    /// Builds the client.
    ///
    /// # Errors
    ///
    /// If the base URL is not a valid `http`/`https` URL, or the underlying HTTP client cannot be created, an error is
    /// returned.
    pub fn build(self) -> Result<HttpBookstore, ClientError> {
        let base_url = normalize_base_url(&self.base_url)?;
        let inner = Client::builder()
            .timeout(self.request_timeout)
            .build()
            .context(Build)?;

        Ok(HttpBookstore { inner, base_url })
    }
}

/// HTTP client for the books API.
///
/// Paths are resolved relative to the base URL, so a base URL of `http://localhost:8080/api` sends list requests to
/// `http://localhost:8080/api/books`. Cloning is cheap: clones share the same connection pool.
#[derive(Clone, Debug)]
pub struct HttpBookstore {
    inner: Client,
    base_url: Url,
}

impl HttpBookstore {
    /// Creates a builder for a client targeting the given base URL.
    pub fn builder<S: Into<String>>(base_url: S) -> HttpBookstoreBuilder {
        HttpBookstoreBuilder {
            base_url: base_url.into(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Returns the base URL that request paths are resolved against.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn collection_url(&self) -> Result<Url, ClientError> {
        self.base_url.join(BOOKS_PATH).context(InvalidPath { path: BOOKS_PATH })
    }

    fn item_url(&self, id: &str) -> Result<Url, ClientError> {
        let mut url = self.base_url.join(BOOK_PATH).context(InvalidPath { path: BOOK_PATH })?;

        // The identifier is pushed as a single path segment so that it gets percent-encoded rather than interpreted.
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(id);
        }

        Ok(url)
    }

    async fn send(&self, path: &str, request: RequestBuilder) -> Result<Response, ClientError> {
        let response = request.send().await.context(Network { path })?;
        process_response(path, response).await
    }

    async fn read_body(&self, path: &str, response: Response) -> Result<Vec<u8>, ClientError> {
        let body = response.bytes().await.context(Network { path })?;
        Ok(body.to_vec())
    }
}

#[async_trait]
impl BookstoreApi for HttpBookstore {
    async fn create(&self, book: &Book) -> Result<(), ClientError> {
        let url = self.collection_url()?;
        let _ = self.send(BOOKS_PATH, self.inner.post(url).json(book)).await?;
        Ok(())
    }

    async fn list(&self) -> Result<Vec<Book>, ClientError> {
        let url = self.collection_url()?;
        let response = self.send(BOOKS_PATH, self.inner.get(url)).await?;
        let body = self.read_body(BOOKS_PATH, response).await?;

        decode_book_list(BOOKS_PATH, &body)
    }

    async fn clear(&self) -> Result<(), ClientError> {
        let url = self.collection_url()?;
        let _ = self.send(BOOKS_PATH, self.inner.delete(url)).await?;
        Ok(())
    }

    async fn update(&self, id: &str, book: &Book) -> Result<(), ClientError> {
        let url = self.item_url(id)?;
        let path = format!("{}{}", BOOK_PATH, id);
        let _ = self.send(&path, self.inner.put(url).json(book)).await?;
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Book, ClientError> {
        let url = self.item_url(id)?;
        let path = format!("{}{}", BOOK_PATH, id);
        let response = self.send(&path, self.inner.get(url)).await?;
        let body = self.read_body(&path, response).await?;

        serde_json::from_slice(&body).context(Decode { path })
    }

    async fn delete(&self, id: &str) -> Result<(), ClientError> {
        let url = self.item_url(id)?;
        let path = format!("{}{}", BOOK_PATH, id);
        let _ = self.send(&path, self.inner.delete(url)).await?;
        Ok(())
    }
}

fn normalize_base_url(raw: &str) -> Result<Url, ClientError> {
    let mut url = Url::parse(raw).context(InvalidBaseUrl { url: raw })?;
    ensure!(
        matches!(url.scheme(), "http" | "https") && !url.cannot_be_a_base(),
        UnsupportedBaseUrl { url: raw }
    );

    // `Url::join` replaces the last path segment unless the path ends with a slash.
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }

    Ok(url)
}

/// Decodes the body of a list response.
///
/// An empty body, or a JSON `null`, is an empty collection.
fn decode_book_list(path: &str, body: &[u8]) -> Result<Vec<Book>, ClientError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Vec::new());
    }

    let books: Option<Vec<Book>> = serde_json::from_slice(body).context(Decode { path })?;
    Ok(books.unwrap_or_default())
}

async fn process_response(path: &str, response: Response) -> Result<Response, ClientError> {
    let status = response.status();
    trace!(path, %status, "Received response.");

    if status.is_success() {
        return Ok(response);
    }

    let mut body = response.text().await.unwrap_or_else(|_| String::from("<no body>"));
    if body.len() > MAX_ERROR_BODY_LEN {
        let mut cut = MAX_ERROR_BODY_LEN;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
    }

    NonSuccessStatus { path, status, body }.fail()
}
