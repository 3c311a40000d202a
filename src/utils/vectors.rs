use auto_ops::{impl_op_ex, impl_op_ex_commutative};
use nalgebra::{Vector3, Vector4};
use serde::{Deserialize, Serialize};

/// A three-momentum (or any spatial three-vector) with the angular vocabulary
/// needed by polarization analyses.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Vec3(Vector3<f64>);

impl Vec3 {
    /// Construct a [`Vec3`] from its Cartesian components.
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self(Vector3::new(x, y, z))
    }
    /// The unit vector along the lab-frame beam axis, $`\hat{z}`$.
    pub fn beam_axis() -> Self {
        Self::new(0.0, 0.0, 1.0)
    }
    pub fn x(&self) -> f64 {
        self.0.x
    }
    pub fn y(&self) -> f64 {
        self.0.y
    }
    pub fn z(&self) -> f64 {
        self.0.z
    }

    /// Promote to a four-momentum with the given invariant mass,
    /// $`E = \sqrt{m^2 + |\vec{p}|^2}`$.
    pub fn with_mass(&self, mass: f64) -> Vec4 {
        let e = (mass * mass + self.mag2()).sqrt();
        Vec4::new(self.x(), self.y(), self.z(), e)
    }
    /// Promote to a four-momentum with the given energy.
    pub fn with_energy(&self, energy: f64) -> Vec4 {
        Vec4::new(self.x(), self.y(), self.z(), energy)
    }

    pub fn dot(&self, other: &Self) -> f64 {
        self.0.dot(&other.0)
    }
    pub fn cross(&self, other: &Self) -> Self {
        Self(self.0.cross(&other.0))
    }
    pub fn mag2(&self) -> f64 {
        self.dot(self)
    }
    pub fn mag(&self) -> f64 {
        self.mag2().sqrt()
    }
    /// The transverse component, $`p_T = \sqrt{x^2 + y^2}`$.
    pub fn pt(&self) -> f64 {
        self.x().hypot(self.y())
    }
    pub fn costheta(&self) -> f64 {
        self.z() / self.mag()
    }
    pub fn theta(&self) -> f64 {
        self.costheta().acos()
    }
    pub fn phi(&self) -> f64 {
        self.y().atan2(self.x())
    }
    /// Pseudorapidity, $`\eta = \frac{1}{2}\ln\frac{|\vec{p}| + p_z}{|\vec{p}| - p_z}`$.
    pub fn eta(&self) -> f64 {
        let p = self.mag();
        0.5 * ((p + self.z()) / (p - self.z())).ln()
    }
    pub fn unit(&self) -> Self {
        let mag = self.mag();
        Self::new(self.x() / mag, self.y() / mag, self.z() / mag)
    }
}

impl_op_ex!(+ |a: &Vec3, b: &Vec3| -> Vec3 { Vec3(a.0 + b.0) });
impl_op_ex!(-|a: &Vec3, b: &Vec3| -> Vec3 { Vec3(a.0 - b.0) });
impl_op_ex!(-|a: &Vec3| -> Vec3 { Vec3(-a.0) });
impl_op_ex_commutative!(*|a: &Vec3, b: &f64| -> Vec3 { Vec3(a.0 * *b) });
impl_op_ex!(/ |a: &Vec3, b: &f64| -> Vec3 { Vec3(a.0 / *b) });

/// A four-momentum stored as $`(p_x, p_y, p_z, E)`$.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Vec4(Vector4<f64>);

impl Vec4 {
    /// Construct a [`Vec4`] directly from momentum components and energy.
    pub fn new(px: f64, py: f64, pz: f64, e: f64) -> Self {
        Self(Vector4::new(px, py, pz, e))
    }
    pub fn px(&self) -> f64 {
        self.0.x
    }
    pub fn py(&self) -> f64 {
        self.0.y
    }
    pub fn pz(&self) -> f64 {
        self.0.z
    }
    pub fn e(&self) -> f64 {
        self.0.w
    }
    /// The spatial part of the four-momentum.
    pub fn vec3(&self) -> Vec3 {
        Vec3::new(self.px(), self.py(), self.pz())
    }
    /// The velocity vector $`\vec{\beta} = \vec{p}/E`$.
    pub fn beta(&self) -> Vec3 {
        self.vec3() / self.e()
    }
    pub fn gamma(&self) -> f64 {
        self.e() / self.mag()
    }
    /// The invariant mass squared, $`m^2 = E^2 - |\vec{p}|^2`$.
    pub fn mag2(&self) -> f64 {
        self.e() * self.e() - self.vec3().mag2()
    }
    pub fn mag(&self) -> f64 {
        self.mag2().sqrt()
    }
    pub fn pt(&self) -> f64 {
        self.vec3().pt()
    }
    /// Rapidity, $`y = \frac{1}{2}\ln\frac{E + p_z}{E - p_z}`$.
    pub fn rapidity(&self) -> f64 {
        0.5 * ((self.e() + self.pz()) / (self.e() - self.pz())).ln()
    }
    /// Apply a pure Lorentz boost with velocity `beta`. Boosting a
    /// four-momentum by the negative of its own [`Vec4::beta`] takes it to
    /// its rest frame.
    pub fn boost(&self, beta: &Vec3) -> Self {
        let b2 = beta.mag2();
        if b2 == 0.0 {
            return *self;
        }
        let gamma = 1.0 / (1.0 - b2).sqrt();
        let p3 = self.vec3()
            + beta * ((gamma - 1.0) * self.vec3().dot(beta) / b2 + gamma * self.e());
        Self::new(
            p3.x(),
            p3.y(),
            p3.z(),
            gamma * (self.e() + beta.dot(&self.vec3())),
        )
    }
}

impl_op_ex!(+ |a: &Vec4, b: &Vec4| -> Vec4 { Vec4(a.0 + b.0) });
impl_op_ex!(-|a: &Vec4, b: &Vec4| -> Vec4 { Vec4(a.0 - b.0) });
impl_op_ex!(-|a: &Vec4| -> Vec4 { Vec4(-a.0) });

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_vec_sums() {
        let a = Vec3::new(1.0, 2.0, 3.0);
        let b = Vec3::new(4.0, 5.0, 6.0);
        let sum = a + b;
        assert_eq!(sum.x(), 5.0);
        assert_eq!(sum.y(), 7.0);
        assert_eq!(sum.z(), 9.0);
    }

    #[test]
    fn test_three_to_four_momentum_conversion() {
        let p3 = Vec3::new(1.0, 2.0, 3.0);
        let target = Vec4::new(1.0, 2.0, 3.0, 10.0);
        let from_mass = p3.with_mass(target.mag());
        let from_energy = p3.with_energy(target.e());
        assert_relative_eq!(from_mass.e(), target.e());
        assert_eq!(from_mass.vec3(), p3);
        assert_eq!(from_energy.e(), target.e());
        assert_eq!(from_energy.vec3(), p3);
    }

    #[test]
    fn test_four_momentum_basics() {
        let p = Vec4::new(3.0, 4.0, 5.0, 10.0);
        assert_relative_eq!(p.beta().x(), 0.3);
        assert_relative_eq!(p.beta().y(), 0.4);
        assert_relative_eq!(p.beta().z(), 0.5);
        assert_relative_eq!(p.mag(), 50.0_f64.sqrt());
        assert_relative_eq!(p.mag2(), 50.0);
        assert_relative_eq!(p.gamma(), 2.0_f64.sqrt());
        assert_relative_eq!(p.pt(), 5.0);
    }

    #[test]
    fn test_three_momentum_basics() {
        let p3 = Vec3::new(3.0, 4.0, 5.0);
        let q3 = Vec3::new(1.2, -3.4, 7.6);
        assert_relative_eq!(p3.mag(), 50.0_f64.sqrt());
        assert_relative_eq!(p3.mag2(), 50.0);
        assert_relative_eq!(p3.costheta(), 5.0 / 50.0_f64.sqrt());
        assert_relative_eq!(p3.theta(), (5.0 / 50.0_f64.sqrt()).acos());
        assert_relative_eq!(p3.phi(), 4.0_f64.atan2(3.0));
        assert_relative_eq!(p3.unit().x(), 3.0 / 50.0_f64.sqrt());
        let c = p3.cross(&q3);
        assert_relative_eq!(c.x(), 47.4);
        assert_relative_eq!(c.y(), -16.8);
        assert_relative_eq!(c.z(), -15.0);
    }

    #[test]
    fn test_boost_com() {
        let p = Vec4::new(3.0, 4.0, 5.0, 10.0);
        let rest = p.boost(&-p.beta());
        assert_relative_eq!(rest.px(), 0.0, epsilon = 1e-12);
        assert_relative_eq!(rest.py(), 0.0, epsilon = 1e-12);
        assert_relative_eq!(rest.pz(), 0.0, epsilon = 1e-12);
        assert_relative_eq!(rest.e(), p.mag(), epsilon = 1e-12);
    }

    #[test]
    fn test_boost() {
        let pa = Vec4::new(3.0, 4.0, 5.0, 10.0);
        let pb = Vec4::new(3.4, 2.3, 1.2, 9.0);
        let boosted = pa.boost(&-pb.beta());
        assert_relative_eq!(boosted.e(), 8.157632144622882);
        assert_relative_eq!(boosted.px(), -0.6489200627053444);
        assert_relative_eq!(boosted.py(), 1.5316128987581492);
        assert_relative_eq!(boosted.pz(), 3.712145860221643);
    }

    #[test]
    fn test_boost_preserves_mass() {
        let p = Vec4::new(0.05, 0.0, 0.0, 0.05_f64.hypot(0.1396));
        let boosted = p.boost(&Vec3::new(-0.4, 0.1, 0.2));
        assert_relative_eq!(boosted.mag(), p.mag(), epsilon = 1e-12);
    }

    #[test]
    fn test_eta() {
        // eta = 0 in the transverse plane, grows with |pz|
        assert_relative_eq!(Vec3::new(1.0, 0.0, 0.0).eta(), 0.0);
        let forward = Vec3::new(0.1, 0.0, 1.0);
        let backward = Vec3::new(0.1, 0.0, -1.0);
        assert_relative_eq!(forward.eta(), -backward.eta(), epsilon = 1e-12);
        assert!(forward.eta() > 2.0);
    }
}
