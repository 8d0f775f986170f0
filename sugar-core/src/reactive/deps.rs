//! Dependency Evaluation
//!
//! A dependency list is an ordered collection of [`Getter`]s. Evaluating it
//! invokes every getter in list order and collects the results positionally
//! into a snapshot. Snapshots are compared with [`ChangeDetect`], which for
//! tuples and vectors is the positional rule: same length and no index
//! changed.
//!
//! Two shapes are supported:
//!
//! - Tuples of getters with mixed types, `(Getter<A>, Getter<B>, ...)`, up to
//!   eight entries. The snapshot is the tuple of values.
//! - A homogeneous `Vec<Getter<T>>` whose snapshot is a `Vec<T>`.

use crate::error::{Error, Result};

use super::change::ChangeDetect;
use super::getter::Getter;

/// An ordered list of reactive getters.
pub trait Dependencies: 'static {
    /// The evaluated values, positionally aligned with the getters.
    type Snapshot: ChangeDetect + Clone + 'static;

    /// Invokes each getter in order and collects the results.
    fn evaluate(&self) -> Result<Self::Snapshot>;

    /// Number of getters in the list.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Evaluates `deps` into a snapshot.
pub fn evaluate_dependencies<D: Dependencies>(deps: &D) -> Result<D::Snapshot> {
    deps.evaluate()
}

/// Returns `true` if `snapshot` differs from `previous`, or if there is no
/// previous snapshot at all.
pub fn snapshot_changed<S: ChangeDetect>(snapshot: &S, previous: Option<&S>) -> bool {
    previous.map_or(true, |previous| snapshot.has_changed(previous))
}

/// Attaches the list position to a failed read.
fn at_index<T>(result: Result<T>, index: usize) -> Result<T> {
    result.map_err(|err| match err {
        Error::InvalidDependency { reason, .. } => Error::InvalidDependency { index, reason },
        other => other,
    })
}

macro_rules! impl_dependencies_tuple {
    ($len:expr; $($idx:tt $T:ident),*) => {
        impl<$($T),*> Dependencies for ($(Getter<$T>,)*)
        where
            $($T: ChangeDetect + Clone + 'static,)*
        {
            type Snapshot = ($($T,)*);

            fn evaluate(&self) -> Result<Self::Snapshot> {
                // Tuple expressions evaluate left to right.
                Ok(($(at_index(self.$idx.get(), $idx)?,)*))
            }

            fn len(&self) -> usize {
                $len
            }
        }
    };
}

impl_dependencies_tuple!(0;);
impl_dependencies_tuple!(1; 0 A);
impl_dependencies_tuple!(2; 0 A, 1 B);
impl_dependencies_tuple!(3; 0 A, 1 B, 2 C);
impl_dependencies_tuple!(4; 0 A, 1 B, 2 C, 3 D);
impl_dependencies_tuple!(5; 0 A, 1 B, 2 C, 3 D, 4 E);
impl_dependencies_tuple!(6; 0 A, 1 B, 2 C, 3 D, 4 E, 5 F);
impl_dependencies_tuple!(7; 0 A, 1 B, 2 C, 3 D, 4 E, 5 F, 6 G);
impl_dependencies_tuple!(8; 0 A, 1 B, 2 C, 3 D, 4 E, 5 F, 6 G, 7 H);

impl<T> Dependencies for Vec<Getter<T>>
where
    T: ChangeDetect + Clone + 'static,
{
    type Snapshot = Vec<T>;

    fn evaluate(&self) -> Result<Self::Snapshot> {
        self.iter()
            .enumerate()
            .map(|(index, getter)| at_index(getter.get(), index))
            .collect()
    }

    fn len(&self) -> usize {
        Vec::len(self)
    }
}
