use std::cell::RefCell;
use std::rc::Rc;

use crate::error::SinkError;

/// Where typed text ends up.
pub trait OutputSink {
    fn set_text(&mut self, text: &str) -> Result<(), SinkError>;
    fn set_language_tag(&mut self, tag: &str) -> Result<(), SinkError>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Screen {
    pub text: String,
    pub language: String,
}

/// In-memory sink whose clones all see the same screen.
///
/// The engine writes through one handle while the UI (or a test) reads through another.
#[derive(Debug, Clone, Default)]
pub struct SharedScreen {
    inner: Rc<RefCell<Screen>>,
}

impl SharedScreen {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&self) -> String {
        self.inner.borrow().text.clone()
    }

    pub fn language(&self) -> String {
        self.inner.borrow().language.clone()
    }

    pub fn snapshot(&self) -> Screen {
        self.inner.borrow().clone()
    }
}

impl OutputSink for SharedScreen {
    fn set_text(&mut self, text: &str) -> Result<(), SinkError> {
        let mut screen = self.inner.borrow_mut();
        screen.text.clear();
        screen.text.push_str(text);
        Ok(())
    }

    fn set_language_tag(&mut self, tag: &str) -> Result<(), SinkError> {
        self.inner.borrow_mut().language = tag.to_string();
        Ok(())
    }
}
