use std::{
    net::SocketAddr,
    sync::{Arc, Mutex},
};

use axum::{
    extract::{Path, State},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, put},
    Json, Router,
};
use bookstore_client::Book;
use tokio::net::TcpListener;

#[derive(Default)]
struct Inner {
    books: Vec<Book>,
    next_id: u64,
    requests: Vec<(Method, String)>,
    forced_status: Option<StatusCode>,
}

/// In-memory stand-in for the books API.
#[derive(Clone, Default)]
pub struct StubState {
    inner: Arc<Mutex<Inner>>,
}

impl StubState {
    pub fn books(&self) -> Vec<Book> {
        self.inner.lock().unwrap().books.clone()
    }

    /// Returns every request received so far, as `(method, path)` pairs.
    pub fn requests(&self) -> Vec<(Method, String)> {
        self.inner.lock().unwrap().requests.clone()
    }

    /// Makes every subsequent request fail with the given status.
    pub fn force_status(&self, status: StatusCode) {
        self.inner.lock().unwrap().forced_status = Some(status);
    }

    fn begin(&self, method: Method, path: String) -> Result<(), Response> {
        let mut inner = self.inner.lock().unwrap();
        inner.requests.push((method, path));
        match inner.forced_status {
            Some(status) => Err((status, "forced failure").into_response()),
            None => Ok(()),
        }
    }
}

async fn create_book(State(state): State<StubState>, Json(mut book): Json<Book>) -> Response {
    if let Err(response) = state.begin(Method::POST, "/books".to_string()) {
        return response;
    }

    let mut inner = state.inner.lock().unwrap();
    inner.next_id += 1;
    book.id = Some(format!("{:024x}", inner.next_id));
    inner.books.push(book);

    StatusCode::CREATED.into_response()
}

async fn list_books(State(state): State<StubState>) -> Response {
    if let Err(response) = state.begin(Method::GET, "/books".to_string()) {
        return response;
    }

    Json(state.books()).into_response()
}

async fn clear_books(State(state): State<StubState>) -> Response {
    if let Err(response) = state.begin(Method::DELETE, "/books".to_string()) {
        return response;
    }

    state.inner.lock().unwrap().books.clear();
    StatusCode::OK.into_response()
}

async fn update_book(State(state): State<StubState>, Path(id): Path<String>, Json(book): Json<Book>) -> Response {
    if let Err(response) = state.begin(Method::PUT, format!("/book/{}", id)) {
        return response;
    }

    let mut inner = state.inner.lock().unwrap();
    match inner.books.iter_mut().find(|b| b.id.as_deref() == Some(id.as_str())) {
        Some(existing) => {
            *existing = book.with_id(id);
            StatusCode::CREATED.into_response()
        }
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn get_book(State(state): State<StubState>, Path(id): Path<String>) -> Response {
    if let Err(response) = state.begin(Method::GET, format!("/book/{}", id)) {
        return response;
    }

    let inner = state.inner.lock().unwrap();
    match inner.books.iter().find(|b| b.id.as_deref() == Some(id.as_str())) {
        Some(book) => Json(book.clone()).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn delete_book(State(state): State<StubState>, Path(id): Path<String>) -> Response {
    if let Err(response) = state.begin(Method::DELETE, format!("/book/{}", id)) {
        return response;
    }

    state
        .inner
        .lock()
        .unwrap()
        .books
        .retain(|b| b.id.as_deref() != Some(id.as_str()));
    StatusCode::OK.into_response()
}

/// Spawns the stub API on an ephemeral port, with its routes mounted under `prefix` (use `""` for the root).
///
/// Returns the base URL to point a client at, and a handle on the stub's state.
pub async fn spawn_stub(prefix: &str) -> (String, StubState) {
    let state = StubState::default();

    let routes = Router::new()
        .route("/books", get(list_books).post(create_book).delete(clear_books))
        .route("/book/{id}", put(update_book).get(get_book).delete(delete_book));
    let app = if prefix.is_empty() {
        routes.with_state(state.clone())
    } else {
        Router::new().nest(prefix, routes).with_state(state.clone())
    };

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    (format!("http://{}{}", addr, prefix), state)
}

/// Returns a base URL that nothing is listening on.
pub async fn unreachable_base_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    format!("http://{}", addr)
}
