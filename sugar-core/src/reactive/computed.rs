//! Memoized Computations
//!
//! [`use_computed`] derives a value from a dependency snapshot and caches it.
//! Suppression happens at two levels:
//!
//! 1. **Input.** If the evaluated snapshot equals the cached one, the cached
//!    output is returned and `compute` is not called.
//! 2. **Output.** If `compute` did run but the optional output predicate says
//!    the result did not change, the previous output is returned instead of
//!    the fresh one. The new input snapshot is still cached.
//!
//! The second level lets a computed value sit in the dependency list of other
//! computations and observers without causing downstream work when it is
//! recomputed to something equivalent.

use std::cell::RefCell;
use std::rc::Rc;

use super::change::{ChangeDetect, ChangeFn};
use super::deps::Dependencies;
use super::getter::Getter;

/// Options for [`use_computed`].
pub struct ComputedOptions<T> {
    /// Output-level change predicate, called as `has_changed(new, previous)`.
    pub has_changed: Option<ChangeFn<T>>,
}

impl<T> Default for ComputedOptions<T> {
    fn default() -> Self {
        Self { has_changed: None }
    }
}

/// The last evaluation of a computed value.
struct MemoEntry<S, T> {
    args: S,
    result: T,
}

/// Returns a getter for `compute(deps)` that only recomputes when `deps`
/// changes.
///
/// Each dependency should be built from reactive primitives, i.e. component
/// properties or values created with [`use_state`](super::use_state), so the
/// host re-renders when they change.
pub fn use_computed<T, D, F>(compute: F, deps: D, options: ComputedOptions<T>) -> Getter<T>
where
    T: Clone + 'static,
    D: Dependencies,
    F: Fn(&D::Snapshot) -> T + 'static,
{
    let cache: Rc<RefCell<Option<MemoEntry<D::Snapshot, T>>>> = Rc::new(RefCell::new(None));
    let has_changed = options.has_changed;

    Getter::try_new(move || {
        let args = deps.evaluate()?;

        if let Some(last) = cache.borrow().as_ref() {
            if !args.has_changed(&last.args) {
                return Ok(last.result.clone());
            }
        }

        // No borrow is held here, `compute` may read other computed values.
        let computed = compute(&args);

        let mut cache = cache.borrow_mut();
        let result = match (&has_changed, cache.as_ref()) {
            (Some(has_changed), Some(last)) if !has_changed(&computed, &last.result) => {
                last.result.clone()
            }
            _ => computed,
        };
        *cache = Some(MemoEntry {
            args,
            result: result.clone(),
        });

        Ok(result)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::change_fn;
    use std::cell::Cell;

    fn source(initial: i32) -> (Rc<Cell<i32>>, Getter<i32>) {
        let cell = Rc::new(Cell::new(initial));
        let getter = Getter::new({
            let cell = Rc::clone(&cell);
            move || cell.get()
        });
        (cell, getter)
    }

    #[test]
    fn unchanged_inputs_skip_compute() {
        let (_, a) = source(2);
        let runs = Rc::new(Cell::new(0));

        let doubled = use_computed(
            {
                let runs = Rc::clone(&runs);
                move |(a,): &(i32,)| {
                    runs.set(runs.get() + 1);
                    a * 2
                }
            },
            (a,),
            ComputedOptions::default(),
        );

        assert_eq!(doubled.get().unwrap(), 4);
        assert_eq!(doubled.get().unwrap(), 4);
        assert_eq!(runs.get(), 1);
    }

    #[test]
    fn changed_inputs_recompute() {
        let (a_cell, a) = source(1);
        let (_, b) = source(10);

        let sum = use_computed(|(a, b): &(i32, i32)| a + b, (a, b), ComputedOptions::default());

        assert_eq!(sum.get().unwrap(), 11);
        a_cell.set(5);
        assert_eq!(sum.get().unwrap(), 15);
    }

    #[test]
    fn cached_result_keeps_identity() {
        let (_, a) = source(3);
        let list = use_computed(|(a,): &(i32,)| Rc::new(vec![*a]), (a,), ComputedOptions::default());

        let first = list.get().unwrap();
        let second = list.get().unwrap();
        assert!(Rc::ptr_eq(&first, &second));
    }

    #[test]
    fn output_predicate_suppresses_equivalent_results() {
        let (a_cell, a) = source(1);
        let runs = Rc::new(Cell::new(0));

        let list = use_computed(
            {
                let runs = Rc::clone(&runs);
                move |(a,): &(i32,)| {
                    runs.set(runs.get() + 1);
                    Rc::new(vec![a % 2])
                }
            },
            (a,),
            ComputedOptions {
                has_changed: Some(change_fn(|new: &Rc<Vec<i32>>, old: &Rc<Vec<i32>>| new != old)),
            },
        );

        let first = list.get().unwrap();
        a_cell.set(3);
        let second = list.get().unwrap();
        assert_eq!(runs.get(), 2);
        assert!(Rc::ptr_eq(&first, &second));

        // The input snapshot was refreshed to 3, so this is a cache hit.
        let third = list.get().unwrap();
        assert_eq!(runs.get(), 2);
        assert!(Rc::ptr_eq(&first, &third));

        a_cell.set(4);
        let fourth = list.get().unwrap();
        assert_eq!(*fourth, vec![0]);
        assert!(!Rc::ptr_eq(&first, &fourth));
    }
}
