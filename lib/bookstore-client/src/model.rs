use serde::{Deserialize, Serialize};

/// A book record.
///
/// Field names on the wire are capitalized (`Name`, `Author`, `ISBN`, `Genre`, `ID`). The identifier is assigned by
/// the API when the book is created, so it is absent on books that have not been stored yet, and it is left out of
/// the serialized form in that case.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct Book {
    /// Title of the book.
    #[serde(rename = "Name", default)]
    pub name: String,

    /// Author of the book.
    #[serde(rename = "Author", default)]
    pub author: String,

    /// ISBN of the book.
    #[serde(rename = "ISBN", default)]
    pub isbn: String,

    /// Genre of the book.
    #[serde(rename = "Genre", default)]
    pub genre: String,

    /// Identifier assigned by the API.
    #[serde(rename = "ID", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl Book {
    /// Creates a new `Book` without an identifier.
    pub fn new<N, A, I, G>(name: N, author: A, isbn: I, genre: G) -> Self
    where
        N: Into<String>,
        A: Into<String>,
        I: Into<String>,
        G: Into<String>,
    {
        Self {
            name: name.into(),
            author: author.into(),
            isbn: isbn.into(),
            genre: genre.into(),
            id: None,
        }
    }

    /// Returns the identifier of this book, if it has been assigned one.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref().filter(|id| !id.is_empty())
    }

    /// Returns a copy of this book carrying the given identifier.
    pub fn with_id<S: Into<String>>(mut self, id: S) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Returns `true` if both books hold the same data, ignoring their identifiers.
    pub fn same_content(&self, other: &Book) -> bool {
        self.name == other.name && self.author == other.author && self.isbn == other.isbn && self.genre == other.genre
    }
}
