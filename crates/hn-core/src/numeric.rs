/// Floating point type used throughout the model.
pub type Real = f64;

/// Absolute/relative tolerance pair for float comparisons.
#[derive(Clone, Copy, Debug)]
pub struct Tolerances {
    pub abs: Real,
    pub rel: Real,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            abs: 1e-12,
            rel: 1e-9,
        }
    }
}

impl Tolerances {
    /// Looser tolerance for geometry that went through several conversions.
    pub fn geometric() -> Self {
        Self {
            abs: 1e-9,
            rel: 1e-9,
        }
    }
}

pub fn nearly_equal(a: Real, b: Real, tol: Tolerances) -> bool {
    let diff = (a - b).abs();
    if diff <= tol.abs {
        return true;
    }
    diff <= tol.rel * a.abs().max(b.abs())
}

/// True if every element is >= its predecessor. Empty and single-element
/// slices are non-decreasing.
pub fn is_non_decreasing(values: &[Real]) -> bool {
    values.windows(2).all(|w| w[1] >= w[0])
}

/// Running differences: `out[0] = values[0]`, `out[i] = values[i] - values[i-1]`.
pub fn prefix_difference(values: &[Real]) -> Vec<Real> {
    let mut out = Vec::with_capacity(values.len());
    let mut prev = 0.0;
    for (i, &v) in values.iter().enumerate() {
        out.push(if i == 0 { v } else { v - prev });
        prev = v;
    }
    out
}

/// Inverse of [`prefix_difference`].
pub fn prefix_sum(values: &[Real]) -> Vec<Real> {
    let mut acc = 0.0;
    values
        .iter()
        .map(|&v| {
            acc += v;
            acc
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nearly_equal_basic() {
        let tol = Tolerances::default();
        assert!(nearly_equal(1.0, 1.0 + 1e-12, tol));
        assert!(nearly_equal(0.0, 1e-13, tol));
        assert!(!nearly_equal(1.0, 1.0 + 1e-6, tol));
    }

    #[test]
    fn non_decreasing_accepts_plateaus() {
        assert!(is_non_decreasing(&[]));
        assert!(is_non_decreasing(&[3.0]));
        assert!(is_non_decreasing(&[0.0, 1.0, 1.0, 2.5]));
        assert!(!is_non_decreasing(&[0.0, 2.0, 1.0]));
    }

    #[test]
    fn difference_then_sum_is_identity() {
        let xs = [2.0, 5.0, 4.0, 10.0];
        let d = prefix_difference(&xs);
        assert_eq!(d, vec![2.0, 3.0, -1.0, 6.0]);
        assert_eq!(prefix_sum(&d), xs.to_vec());
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn prefix_sum_inverts_difference(xs in prop::collection::vec(-1.0e3_f64..1.0e3_f64, 0..20)) {
            let back = prefix_sum(&prefix_difference(&xs));
            prop_assert_eq!(back.len(), xs.len());
            for (a, b) in back.iter().zip(xs.iter()) {
                prop_assert!(nearly_equal(*a, *b, Tolerances::geometric()));
            }
        }
    }
}
