//! Assertion macros that print the comparison trace on failure.

/// Asserts that two [`Value`](crate::Value)s are deeply equal.
///
/// On failure the panic message carries both rendered values and the full
/// trace of the comparison.
///
/// ```
/// use traced_equal::{assert_deep_eq, Value};
///
/// assert_deep_eq!(Value::from("a"), Value::from("a"));
/// ```
#[macro_export]
macro_rules! assert_deep_eq {
    ($left:expr, $right:expr $(,)?) => {
        match (&$left, &$right) {
            (left_val, right_val) => {
                let (equal, trace) = $crate::deep_equal(left_val, right_val);
                if !equal {
                    panic!(
                        "deep equality assertion failed: `(left == right)`\n  left: `{}`,\n right: `{}`\ntrace:\n{}",
                        left_val, right_val, trace
                    );
                }
            }
        }
    };
}

/// Asserts that two [`Value`](crate::Value)s are not deeply equal.
#[macro_export]
macro_rules! assert_deep_ne {
    ($left:expr, $right:expr $(,)?) => {
        match (&$left, &$right) {
            (left_val, right_val) => {
                let (equal, trace) = $crate::deep_equal(left_val, right_val);
                if equal {
                    panic!(
                        "deep inequality assertion failed: `(left != right)`\n  left: `{}`,\n right: `{}`\ntrace:\n{}",
                        left_val, right_val, trace
                    );
                }
            }
        }
    };
}
