/// Assert that two floating point numbers are equal within the given epsilon.
#[cfg(test)]
macro_rules! assert_float_eq {
    ($a:expr, $b:expr, $eps:expr, $debug:expr) => {{
        // Bind once so the expressions are not evaluated twice.
        let a = $a;
        let b = $b;
        let eps = $eps;
        let error = (a - b).abs();
        if error > eps {
            eprintln!("{:?}", $debug);
        }
        assert!(
            error <= eps,
            "Assertion failed: |({}) - ({})| = {:e} <= {:e}",
            a,
            b,
            error,
            eps
        );
    }};
    ($a:expr, $b:expr, $eps:expr) => {
        $crate::macros::assert_float_eq!($a, $b, $eps, "")
    };
}

#[cfg(test)]
macro_rules! assert_f32_eq {
    ($a:expr, $b:expr, $eps:expr) => {
        $crate::macros::assert_float_eq!($a, $b, $eps)
    };
    ($a:expr, $b:expr) => {
        $crate::macros::assert_float_eq!($a, $b, f32::EPSILON)
    };
}

/// Assert that two glam vectors are equal within the given epsilon per
/// component.
#[cfg(test)]
macro_rules! assert_vec_eq {
    ($a:expr, $b:expr, $eps:expr) => {{
        let a = $a;
        let b = $b;
        assert!(a.abs_diff_eq(b, $eps), "Assertion failed: {:?} ~= {:?}", a, b);
    }};
    ($a:expr, $b:expr) => {
        $crate::macros::assert_vec_eq!($a, $b, 1e-5)
    };
}

#[cfg(test)]
pub(crate) use assert_f32_eq;
#[cfg(test)]
pub(crate) use assert_float_eq;
#[cfg(test)]
pub(crate) use assert_vec_eq;
