use include_dir::{include_dir, Dir};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

use crate::error::SnippetError;

static SNIPPET_DIR: Dir = include_dir!("$CARGO_MANIFEST_DIR/src/snippets");

/// One displayable code example.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snippet {
    pub id: String,
    pub title: String,
    pub language: String,
    pub code: String,
}

/// The ordered, validated set of snippets for a session.
///
/// Never empty, ids are unique and every snippet has code. Order is display order.
#[derive(Debug, Clone)]
pub struct SnippetDeck {
    snippets: Vec<Snippet>,
}

impl SnippetDeck {
    pub fn new(snippets: Vec<Snippet>) -> Result<Self, SnippetError> {
        if snippets.is_empty() {
            return Err(SnippetError::Empty);
        }

        let mut seen = HashSet::new();
        for snippet in &snippets {
            if !seen.insert(snippet.id.as_str()) {
                return Err(SnippetError::DuplicateId(snippet.id.clone()));
            }
            if snippet.code.is_empty() {
                return Err(SnippetError::EmptyCode {
                    id: snippet.id.clone(),
                });
            }
        }

        Ok(Self { snippets })
    }

    /// Snippets compiled into the binary, ordered by file name.
    pub fn bundled() -> Result<Self, SnippetError> {
        let mut files: Vec<_> = SNIPPET_DIR
            .files()
            .filter(|f| f.path().extension().is_some_and(|ext| ext == "json"))
            .collect();
        files.sort_by(|a, b| a.path().cmp(b.path()));

        let snippets = files
            .into_iter()
            .filter_map(|f| f.contents_utf8())
            .map(serde_json::from_str::<Snippet>)
            .collect::<Result<Vec<_>, _>>()?;

        Self::new(snippets)
    }

    /// Parse a JSON array of snippets.
    pub fn from_json_str(json: &str) -> Result<Self, SnippetError> {
        let snippets: Vec<Snippet> = serde_json::from_str(json)?;
        Self::new(snippets)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, SnippetError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| SnippetError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    pub fn len(&self) -> usize {
        self.snippets.len()
    }

    // A deck is never empty; kept for the usual len/is_empty pairing.
    pub fn is_empty(&self) -> bool {
        self.snippets.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Snippet> {
        self.snippets.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Snippet> {
        self.snippets.iter()
    }
}
