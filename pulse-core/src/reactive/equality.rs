//! Equality used to gate notifications.
//!
//! A write is dropped when the new value is indistinguishable from the
//! current one. The default is `PartialEq`, except that floating point NaN
//! is treated as equal to itself; otherwise writing NaN over NaN would
//! notify forever.

use std::any::Any;

/// Signature of a custom equality function.
pub type EqualsFn<T> = fn(&T, &T) -> bool;

/// Default equality: `==`, with `f32`/`f64` NaN equal to NaN.
pub fn same_value<T: PartialEq + 'static>(a: &T, b: &T) -> bool {
    if a == b {
        return true;
    }

    let (a, b) = (a as &dyn Any, b as &dyn Any);
    if let (Some(a), Some(b)) = (a.downcast_ref::<f64>(), b.downcast_ref::<f64>()) {
        return a.is_nan() && b.is_nan();
    }
    if let (Some(a), Some(b)) = (a.downcast_ref::<f32>(), b.downcast_ref::<f32>()) {
        return a.is_nan() && b.is_nan();
    }
    false
}

/// Equality that never matches, so every write notifies.
pub fn never_equal<T>(_: &T, _: &T) -> bool {
    false
}
