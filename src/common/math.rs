//! Small numeric helpers shared across the kernel

use nalgebra::DVector;

/// Wrap an angle into `(-pi, pi]`.
///
/// The upper bound is inclusive so that `diff` of two wrapped angles is
/// itself wrapped: `wrap_angle(pi) == pi`, `wrap_angle(-pi) == pi`.
pub fn wrap_angle(angle: f64) -> f64 {
    use std::f64::consts::PI;
    let mut a = angle;
    while a > PI {
        a -= 2.0 * PI;
    }
    while a <= -PI {
        a += 2.0 * PI;
    }
    a
}

/// Total violation of box bounds: the sum over components of how far `x`
/// lies outside `[lb, ub]`. Zero when `x` is inside the box.
pub fn bounds_distance(x: &DVector<f64>, lb: &DVector<f64>, ub: &DVector<f64>) -> f64 {
    assert_eq!(x.len(), lb.len());
    assert_eq!(x.len(), ub.len());
    let mut d = 0.0;
    for i in 0..x.len() {
        if x[i] < lb[i] {
            d += lb[i] - x[i];
        } else if x[i] > ub[i] {
            d += x[i] - ub[i];
        }
    }
    d
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn test_wrap_angle_range() {
        for &a in &[0.0, 3.0, -3.0, 4.0, -4.0, 10.0, -10.0, PI, -PI, 2.0 * PI] {
            let w = wrap_angle(a);
            assert!(w > -PI && w <= PI, "wrap_angle({}) = {}", a, w);
            // wrapping preserves the angle modulo 2*pi
            assert!((w.sin() - a.sin()).abs() < 1e-9);
            assert!((w.cos() - a.cos()).abs() < 1e-9);
        }
    }

    #[test]
    fn test_wrap_angle_boundary() {
        assert!((wrap_angle(PI) - PI).abs() < 1e-15);
        assert!((wrap_angle(-PI) - PI).abs() < 1e-15);
    }

    #[test]
    fn test_bounds_distance() {
        let lb = DVector::from_vec(vec![-1.0, -1.0]);
        let ub = DVector::from_vec(vec![1.0, 1.0]);

        let inside = DVector::from_vec(vec![0.5, -0.5]);
        assert_eq!(bounds_distance(&inside, &lb, &ub), 0.0);

        let outside = DVector::from_vec(vec![1.5, -2.0]);
        assert!((bounds_distance(&outside, &lb, &ub) - 1.5).abs() < 1e-12);
    }
}
