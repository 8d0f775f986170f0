//! Reactive getters.
//!
//! A [`Getter`] is a cheap, clonable capability that reads the current value
//! of a reactive source. Getters are what dependency lists are made of.

use std::fmt;
use std::rc::{Rc, Weak};

use crate::error::{Error, Result};

/// Zero-argument accessor for the current value of a reactive source.
///
/// Reading a getter can fail when the source it points to is gone, e.g. a
/// property accessor whose component has been dropped. The failure surfaces
/// as [`Error::InvalidDependency`].
pub struct Getter<T> {
    read: Rc<dyn Fn() -> Result<T>>,
}

impl<T: 'static> Getter<T> {
    /// Creates a getter from an infallible read function.
    pub fn new<F>(read: F) -> Self
    where
        F: Fn() -> T + 'static,
    {
        Self {
            read: Rc::new(move || Ok(read())),
        }
    }

    /// Creates a getter from a read function that may fail.
    pub fn try_new<F>(read: F) -> Self
    where
        F: Fn() -> Result<T> + 'static,
    {
        Self {
            read: Rc::new(read),
        }
    }

    /// A getter that always yields `value`.
    pub fn constant(value: T) -> Self
    where
        T: Clone,
    {
        Self::new(move || value.clone())
    }

    /// Reads through a weak reference.
    ///
    /// Once `source` can no longer be upgraded the getter yields
    /// [`Error::InvalidDependency`].
    pub fn from_weak<S, F>(source: Weak<S>, read: F) -> Self
    where
        S: ?Sized + 'static,
        F: Fn(&S) -> T + 'static,
    {
        Self::try_new(move || {
            source
                .upgrade()
                .map(|source| read(&source))
                .ok_or_else(|| Error::invalid_dependency(0, "reactive source was dropped"))
        })
    }

    /// Reads the current value.
    pub fn get(&self) -> Result<T> {
        (self.read)()
    }

    /// Derives a getter that applies `f` to every read. Not memoized.
    pub fn map<U, F>(&self, f: F) -> Getter<U>
    where
        U: 'static,
        F: Fn(T) -> U + 'static,
    {
        let read = Rc::clone(&self.read);
        Getter::try_new(move || read().map(&f))
    }
}

impl<T> Clone for Getter<T> {
    fn clone(&self) -> Self {
        Self {
            read: Rc::clone(&self.read),
        }
    }
}

impl<T> fmt::Debug for Getter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Getter")
            .field("type", &std::any::type_name::<T>())
            .finish_non_exhaustive()
    }
}
