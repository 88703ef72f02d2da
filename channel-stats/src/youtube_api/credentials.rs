//! Rotating pool of YouTube Data API keys.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Returned when trying to build a [`CredentialPool`] without any keys.
#[derive(Debug, thiserror::Error)]
#[error("credential pool needs at least one API key")]
pub struct EmptyPool;

/// A key handed out by [`CredentialPool::current`], along with the cursor position it was
/// read at.
///
/// The index is what [`CredentialPool::rotate_from`] compares against, so a caller that saw
/// this key fail can move the pool past it without clobbering a rotation someone else
/// already made.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Credential<'a> {
    pub index: usize,
    pub key: &'a str,
}

impl fmt::Debug for Credential<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("index", &self.index)
            .finish_non_exhaustive()
    }
}

/// An ordered, non-empty set of API keys with a shared circular cursor.
///
/// The pool lives for the whole process and is shared by every request. Rotation is a
/// compare-and-swap on the cursor, so concurrent requests never push the cursor out of
/// `[0, len)` and never double-rotate past a key that only failed once.
pub struct CredentialPool {
    keys: Box<[String]>,
    cursor: AtomicUsize,
}

impl fmt::Debug for CredentialPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // never log the keys themselves
        f.debug_struct("CredentialPool")
            .field("len", &self.keys.len())
            .field("cursor", &self.cursor.load(Ordering::Relaxed))
            .finish()
    }
}

#[allow(clippy::len_without_is_empty)]
impl CredentialPool {
    /// Creates a pool from the given keys, starting at the first one.
    pub fn new<I, S>(keys: I) -> Result<Self, EmptyPool>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let keys: Box<[String]> = keys.into_iter().map(Into::into).collect();
        if keys.is_empty() {
            return Err(EmptyPool);
        }
        Ok(Self {
            keys,
            cursor: AtomicUsize::new(0),
        })
    }

    /// Number of keys in the pool. Always at least 1.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// The key the cursor currently points at.
    pub fn current(&self) -> Credential<'_> {
        let index = self.cursor.load(Ordering::Acquire);
        Credential {
            index,
            key: &self.keys[index],
        }
    }

    /// Unconditionally advances the cursor to the next key, wrapping around.
    ///
    /// A pool with a single key stays where it is.
    pub fn rotate(&self) {
        let len = self.keys.len();
        // the closure always returns Some, so this cannot fail
        let _ = self
            .cursor
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |index| {
                Some((index + 1) % len)
            });
    }

    /// Advances the cursor past `observed`, but only if it still points there.
    ///
    /// Returns `true` if this call moved the cursor. If another request already rotated away
    /// from `observed`, the cursor is left alone and `false` is returned; the caller should
    /// simply use whatever [`Self::current`] now returns.
    pub fn rotate_from(&self, observed: usize) -> bool {
        let next = (observed + 1) % self.keys.len();
        self.cursor
            .compare_exchange(observed, next, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}
