//! Change Detection
//!
//! Decides whether a new value counts as "different" from an old one. Every
//! reactive primitive funnels its comparisons through [`ChangeDetect`] unless
//! the caller supplies a custom [`ChangeFn`].
//!
//! The default rules are:
//!
//! - Scalars, strings and other plain values compare structurally.
//! - Floats treat `NaN` as equal to `NaN`, so a cell holding `NaN` does not
//!   request an update every time `NaN` is written again.
//! - `Rc<T>` compares by pointer identity. Two distinct allocations holding
//!   equal data are still "changed".
//! - Tuples and vectors compare positionally, and vectors of different
//!   lengths are always changed.

use std::rc::Rc;
use std::time::Duration;

/// Custom change predicate, called as `has_changed(value, old)`.
pub type ChangeFn<T> = Rc<dyn Fn(&T, &T) -> bool>;

/// Types that know whether they changed relative to a previous value.
pub trait ChangeDetect {
    /// Returns `true` if `self` should be treated as different from `old`.
    fn has_changed(&self, old: &Self) -> bool;
}

/// Default change predicate.
pub fn not_equal<T: ChangeDetect + ?Sized>(value: &T, old: &T) -> bool {
    value.has_changed(old)
}

/// Wraps a plain closure as a [`ChangeFn`].
pub fn change_fn<T, F>(f: F) -> ChangeFn<T>
where
    F: Fn(&T, &T) -> bool + 'static,
{
    Rc::new(f)
}

macro_rules! impl_change_detect_eq {
    ($($ty:ty),* $(,)?) => {
        $(
            impl ChangeDetect for $ty {
                #[inline]
                fn has_changed(&self, old: &Self) -> bool {
                    self != old
                }
            }
        )*
    };
}

impl_change_detect_eq!(
    bool, char, u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize, str, String,
    Duration,
);

macro_rules! impl_change_detect_float {
    ($($ty:ty),*) => {
        $(
            impl ChangeDetect for $ty {
                #[inline]
                fn has_changed(&self, old: &Self) -> bool {
                    self != old && !(self.is_nan() && old.is_nan())
                }
            }
        )*
    };
}

impl_change_detect_float!(f32, f64);

impl<T: ChangeDetect + ?Sized> ChangeDetect for &T {
    fn has_changed(&self, old: &Self) -> bool {
        (**self).has_changed(*old)
    }
}

impl<T: ?Sized> ChangeDetect for Rc<T> {
    fn has_changed(&self, old: &Self) -> bool {
        !Rc::ptr_eq(self, old)
    }
}

impl<T: ChangeDetect> ChangeDetect for Option<T> {
    fn has_changed(&self, old: &Self) -> bool {
        match (self, old) {
            (None, None) => false,
            (Some(value), Some(old)) => value.has_changed(old),
            _ => true,
        }
    }
}

impl<T: ChangeDetect> ChangeDetect for Vec<T> {
    fn has_changed(&self, old: &Self) -> bool {
        self.len() != old.len()
            || self
                .iter()
                .zip(old.iter())
                .any(|(value, old)| value.has_changed(old))
    }
}

macro_rules! impl_change_detect_tuple {
    ($($idx:tt $T:ident),*) => {
        impl<$($T: ChangeDetect),*> ChangeDetect for ($($T,)*) {
            #[allow(unused_variables)]
            fn has_changed(&self, old: &Self) -> bool {
                false $(|| self.$idx.has_changed(&old.$idx))*
            }
        }
    };
}

impl_change_detect_tuple!();
impl_change_detect_tuple!(0 A);
impl_change_detect_tuple!(0 A, 1 B);
impl_change_detect_tuple!(0 A, 1 B, 2 C);
impl_change_detect_tuple!(0 A, 1 B, 2 C, 3 D);
impl_change_detect_tuple!(0 A, 1 B, 2 C, 3 D, 4 E);
impl_change_detect_tuple!(0 A, 1 B, 2 C, 3 D, 4 E, 5 F);
impl_change_detect_tuple!(0 A, 1 B, 2 C, 3 D, 4 E, 5 F, 6 G);
impl_change_detect_tuple!(0 A, 1 B, 2 C, 3 D, 4 E, 5 F, 6 G, 7 H);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nan_equals_nan() {
        assert!(!not_equal(&f64::NAN, &f64::NAN));
        assert!(not_equal(&f64::NAN, &1.0));
        assert!(not_equal(&1.0_f32, &f32::NAN));
        assert!(!not_equal(&0.0, &-0.0));
    }

    #[test]
    fn rc_compares_by_identity() {
        let a = Rc::new(vec![1, 2, 3]);
        let b = Rc::new(vec![1, 2, 3]);

        assert!(!not_equal(&a, &a.clone()));
        assert!(not_equal(&a, &b));
    }

    #[test]
    fn vectors_of_different_length_changed() {
        assert!(not_equal(&vec![1, 2], &vec![1, 2, 3]));
        assert!(!not_equal(&vec![1, 2], &vec![1, 2]));
        assert!(not_equal(&vec![1, 3], &vec![1, 2]));
    }

    #[test]
    fn tuples_compare_positionally() {
        assert!(!not_equal(&(1, "a"), &(1, "a")));
        assert!(not_equal(&(1, "a"), &(1, "b")));
        assert!(!not_equal(&(), &()));
    }

    #[test]
    fn options_compare_inner_values() {
        assert!(!not_equal(&None::<i32>, &None));
        assert!(not_equal(&Some(1), &None));
        assert!(!not_equal(&Some(f64::NAN), &Some(f64::NAN)));
    }
}
