//! Token streams for the brzo derivative parser.
//!
//! A stream is a forward cursor with value semantics: [`TokenStream::remaining`]
//! hands out an independent cursor over the unconsumed suffix, so the same
//! residual input can be re-entered from several call sites without the
//! cursors interfering with each other.

pub mod error;

pub use error::{StreamError, StreamResult};

/// A forward cursor over tokens.
pub trait TokenStream: Sized {
    /// The symbol type produced by the stream.
    type Token;

    /// Returns true if at least one more token can be pulled.
    fn has_next(&self) -> bool;

    /// Pulls the next token and advances the cursor.
    ///
    /// Fails with [`StreamError::EndOfStream`] when called on an exhausted stream.
    fn next_token(&mut self) -> StreamResult<Self::Token>;

    /// Returns an independent cursor over the unconsumed suffix.
    fn remaining(&self) -> Self;

    /// Number of tokens consumed so far by this cursor.
    fn position(&self) -> usize;
}

/// A stream over the characters of a string slice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrStream<'a> {
    source: &'a str,
    /// Byte offset of the next character.
    offset: usize,
    /// Characters consumed so far.
    position: usize,
}

impl<'a> StrStream<'a> {
    pub fn new(source: &'a str) -> Self {
        Self { source, offset: 0, position: 0 }
    }

    /// The full text this stream was created from.
    pub fn raw(&self) -> &'a str {
        self.source
    }

    /// The text not yet consumed.
    pub fn rest(&self) -> &'a str {
        &self.source[self.offset..]
    }
}

impl<'a> TokenStream for StrStream<'a> {
    type Token = char;

    fn has_next(&self) -> bool {
        self.offset < self.source.len()
    }

    fn next_token(&mut self) -> StreamResult<char> {
        let ch = self
            .rest()
            .chars()
            .next()
            .ok_or(StreamError::EndOfStream { position: self.position })?;
        self.offset += ch.len_utf8();
        self.position += 1;
        Ok(ch)
    }

    fn remaining(&self) -> Self {
        StrStream::new(self.rest())
    }

    fn position(&self) -> usize {
        self.position
    }
}

/// A stream over the items of a slice, for token types other than `char`.
#[derive(Debug, PartialEq, Eq)]
pub struct SliceStream<'a, T> {
    items: &'a [T],
    position: usize,
}

// Not derived: a derive would require `T: Clone` even though only the slice is copied.
impl<'a, T> Clone for SliceStream<'a, T> {
    fn clone(&self) -> Self {
        Self { items: self.items, position: self.position }
    }
}

impl<'a, T> SliceStream<'a, T> {
    pub fn new(items: &'a [T]) -> Self {
        Self { items, position: 0 }
    }

    pub fn rest(&self) -> &'a [T] {
        &self.items[self.position..]
    }
}

impl<'a, T: Clone> TokenStream for SliceStream<'a, T> {
    type Token = T;

    fn has_next(&self) -> bool {
        self.position < self.items.len()
    }

    fn next_token(&mut self) -> StreamResult<T> {
        let item = self
            .items
            .get(self.position)
            .cloned()
            .ok_or(StreamError::EndOfStream { position: self.position })?;
        self.position += 1;
        Ok(item)
    }

    fn remaining(&self) -> Self {
        SliceStream::new(self.rest())
    }

    fn position(&self) -> usize {
        self.position
    }
}
