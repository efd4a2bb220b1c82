// src/analytic.rs
//
// Closed-form demagnetising solution for a uniformly magnetised ball.
// Inside the ball the field is the constant -M/3; outside it is the field
// of a point dipole with the ball's total moment. This doubles as a solver
// for test meshes and as the reference in accuracy checks.

use crate::engine::FieldSolution;
use crate::vec3::{dot, scale};

pub struct UniformBall {
    pub radius_m: f64,
    /// Magnetisation inside the ball (A/m).
    pub m: [f64; 3],
}

impl UniformBall {
    pub fn new(radius_m: f64, m: [f64; 3]) -> Self {
        Self { radius_m, m }
    }

    fn r2(p: [f64; 3]) -> f64 {
        p[0] * p[0] + p[1] * p[1] + p[2] * p[2]
    }

    /// Demagnetising field at `p` (A/m).
    pub fn h_demag_at(&self, p: [f64; 3]) -> [f64; 3] {
        let r2 = Self::r2(p);
        if r2 <= self.radius_m * self.radius_m {
            return scale(self.m, -1.0 / 3.0);
        }
        let r = r2.sqrt();
        let r3 = r2 * r;
        let r5 = r3 * r2;
        let k = self.radius_m.powi(3) / 3.0;
        let mdotr = dot(self.m, p);
        [
            k * (3.0 * mdotr * p[0] / r5 - self.m[0] / r3),
            k * (3.0 * mdotr * p[1] / r5 - self.m[1] / r3),
            k * (3.0 * mdotr * p[2] / r5 - self.m[2] / r3),
        ]
    }

    /// Magnetic scalar potential at `p` (A). Continuous across the surface.
    pub fn phi_at(&self, p: [f64; 3]) -> f64 {
        let r2 = Self::r2(p);
        if r2 <= self.radius_m * self.radius_m {
            return dot(self.m, p) / 3.0;
        }
        let r3 = r2 * r2.sqrt();
        self.radius_m.powi(3) * dot(self.m, p) / (3.0 * r3)
    }

    /// Volume magnetic charge density -div M (A/m^2). Uniform M has none;
    /// the charge of this configuration sits on the surface, which nodal
    /// volume data does not carry.
    pub fn rho_at(&self, _p: [f64; 3]) -> f64 {
        0.0
    }
}

impl FieldSolution for UniformBall {
    fn h_demag(&self, pos_m: [f64; 3]) -> [f64; 3] {
        self.h_demag_at(pos_m)
    }

    fn rho(&self, pos_m: [f64; 3]) -> f64 {
        self.rho_at(pos_m)
    }

    fn phi(&self, pos_m: [f64; 3]) -> f64 {
        self.phi_at(pos_m)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vec3::norm;

    const MS: f64 = 1.0e6;

    fn ball() -> UniformBall {
        UniformBall::new(1.0, [MS, 0.0, 0.0])
    }

    #[test]
    fn field_inside_is_minus_a_third_of_m() {
        let b = ball();
        let h = b.h_demag_at([0.2, 0.1, -0.3]);
        assert!((h[0] + MS / 3.0).abs() < 1e-6 * MS);
        assert!(h[1].abs() < 1e-9 * MS);
        assert!(h[2].abs() < 1e-9 * MS);
    }

    #[test]
    fn potential_is_continuous_across_the_surface() {
        let b = ball();
        let u = [0.6, 0.48, 0.64];
        let just_in = scale(u, 1.0 - 1e-9);
        let just_out = scale(u, 1.0 + 1e-9);
        let phi_in = b.phi_at(just_in);
        let phi_out = b.phi_at(just_out);
        assert!(
            (phi_in - phi_out).abs() < 1e-6 * phi_in.abs().max(1.0),
            "phi jumps at the surface: {} vs {}",
            phi_in,
            phi_out
        );
    }

    #[test]
    fn external_field_decays_like_a_dipole() {
        let b = ball();
        let h2 = norm(b.h_demag_at([2.0, 0.0, 0.0]));
        let h4 = norm(b.h_demag_at([4.0, 0.0, 0.0]));
        let ratio = h2 / h4;
        assert!(
            (ratio - 8.0).abs() < 1e-9,
            "doubling the distance must cut the field by 8, got {}",
            ratio
        );
    }

    #[test]
    fn external_field_is_minus_grad_phi() {
        let b = ball();
        let p = [1.7, 0.3, -0.5];
        let h = b.h_demag_at(p);
        let step = 1e-6;
        for k in 0..3 {
            let mut hi = p;
            let mut lo = p;
            hi[k] += step;
            lo[k] -= step;
            let grad = (b.phi_at(hi) - b.phi_at(lo)) / (2.0 * step);
            assert!(
                (h[k] + grad).abs() < 1e-5 * MS,
                "component {}: h = {}, -grad phi = {}",
                k,
                h[k],
                -grad
            );
        }
    }
}
