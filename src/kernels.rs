// 2D smoothing kernels and their normalization factors

use std::f32::consts::PI;

/// Kernel normalization factors precomputed for one smoothing radius.
///
/// Rebuilt once per frame when settings are refreshed, so the hot passes
/// never touch `powi` themselves.
#[derive(Clone, Copy, Debug)]
pub struct KernelScales {
    pub radius: f32,
    pub sqr_radius: f32,
    poly6_scale: f32,
    spiky_pow2_scale: f32,
    spiky_pow3_scale: f32,
    spiky_pow2_deriv_scale: f32,
    spiky_pow3_deriv_scale: f32,
}

impl KernelScales {
    pub fn new(radius: f32) -> Self {
        Self {
            radius,
            sqr_radius: radius * radius,
            poly6_scale: 4.0 / (PI * radius.powi(8)),
            spiky_pow2_scale: 6.0 / (PI * radius.powi(4)),
            spiky_pow3_scale: 10.0 / (PI * radius.powi(5)),
            spiky_pow2_deriv_scale: 12.0 / (PI * radius.powi(4)),
            spiky_pow3_deriv_scale: 30.0 / (PI * radius.powi(5)),
        }
    }

    /// Poly6 density kernel: `(h² − d²)³ · 4/(πh⁸)`.
    #[inline]
    pub fn poly6(&self, dst: f32) -> f32 {
        if dst >= self.radius {
            return 0.0;
        }
        let v = self.sqr_radius - dst * dst;
        v * v * v * self.poly6_scale
    }

    /// Near-density kernel: `(h − d)² · 6/(πh⁴)`.
    #[inline]
    pub fn spiky_pow2(&self, dst: f32) -> f32 {
        if dst >= self.radius {
            return 0.0;
        }
        let v = self.radius - dst;
        v * v * self.spiky_pow2_scale
    }

    /// Sharp spiky kernel: `(h − d)³ · 10/(πh⁵)`; its gradient drives the
    /// pressure force.
    #[inline]
    pub fn spiky_pow3(&self, dst: f32) -> f32 {
        if dst >= self.radius {
            return 0.0;
        }
        let v = self.radius - dst;
        v * v * v * self.spiky_pow3_scale
    }

    #[inline]
    pub fn spiky_pow2_derivative(&self, dst: f32) -> f32 {
        if dst >= self.radius {
            return 0.0;
        }
        -(self.radius - dst) * self.spiky_pow2_deriv_scale
    }

    #[inline]
    pub fn spiky_pow3_derivative(&self, dst: f32) -> f32 {
        if dst >= self.radius {
            return 0.0;
        }
        let v = self.radius - dst;
        -v * v * self.spiky_pow3_deriv_scale
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const H: f32 = 0.5;

    #[test]
    fn kernels_vanish_at_support_edge() {
        let k = KernelScales::new(H);
        assert_eq!(k.poly6(H), 0.0);
        assert_eq!(k.spiky_pow2(H), 0.0);
        assert_eq!(k.spiky_pow3(H), 0.0);
        assert_eq!(k.spiky_pow2_derivative(H), 0.0);
        assert_eq!(k.spiky_pow3_derivative(H), 0.0);
        assert_eq!(k.poly6(H * 2.0), 0.0);
    }

    #[test]
    fn poly6_self_value() {
        let k = KernelScales::new(H);
        let expected = 4.0 / (PI * H * H);
        assert!((k.poly6(0.0) - expected).abs() < expected * 1e-5);
    }

    #[test]
    fn kernels_positive_and_decreasing_inside_support() {
        let k = KernelScales::new(H);
        let mut prev = f32::INFINITY;
        for i in 0..10 {
            let d = H * i as f32 / 10.0;
            let w = k.poly6(d);
            assert!(w > 0.0);
            assert!(w < prev);
            prev = w;
        }
    }

    #[test]
    fn spiky_pow3_derivative_matches_finite_difference() {
        let k = KernelScales::new(H);
        let eps = 1e-4;
        for i in 1..9 {
            let d = H * i as f32 / 10.0;
            let numeric = (k.spiky_pow3(d + eps) - k.spiky_pow3(d - eps)) / (2.0 * eps);
            let analytic = k.spiky_pow3_derivative(d);
            assert!(
                (numeric - analytic).abs() < analytic.abs() * 1e-2 + 1e-3,
                "d={d}: numeric {numeric} vs analytic {analytic}"
            );
        }
    }

    #[test]
    fn derivatives_are_negative_inside_support() {
        let k = KernelScales::new(H);
        assert!(k.spiky_pow2_derivative(H * 0.5) < 0.0);
        assert!(k.spiky_pow3_derivative(H * 0.5) < 0.0);
    }
}
