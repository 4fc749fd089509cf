use std::f64::consts::PI;
use std::fmt;
use std::fmt::Formatter;

use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};

/// Four-momentum in collider coordinates (transverse momentum,
/// pseudorapidity, azimuthal angle, energy).
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize, Encode, Decode)]
pub struct FourMomentum {
    pub pt: f64,
    pub eta: f64,
    pub phi: f64,
    pub energy: f64,
}

impl FourMomentum {
    /// Creates a new `FourMomentum`.
    ///
    /// # Arguments
    ///
    /// * `pt` - transverse momentum.
    /// * `eta` - pseudorapidity.
    /// * `phi` - azimuthal angle in radians.
    /// * `energy` - total energy.
    ///
    /// # Examples
    ///
    /// ```
    /// use recomb::data::kinematics::FourMomentum;
    ///
    /// let p4 = FourMomentum::new(50.0, 0.1, 1.2, 51.0);
    /// assert_eq!(p4.pt, 50.0);
    /// ```
    pub fn new(pt: f64, eta: f64, phi: f64, energy: f64) -> Self {
        FourMomentum { pt, eta, phi, energy }
    }

    pub fn px(&self) -> f64 {
        self.pt * self.phi.cos()
    }

    pub fn py(&self) -> f64 {
        self.pt * self.phi.sin()
    }

    pub fn pz(&self) -> f64 {
        self.pt * self.eta.sinh()
    }

    /// Invariant mass, clamped to zero for round-off below the light cone.
    pub fn mass(&self) -> f64 {
        let p2 = self.px().powi(2) + self.py().powi(2) + self.pz().powi(2);
        (self.energy.powi(2) - p2).max(0.0).sqrt()
    }

    /// Absolute pseudorapidity difference to another four-momentum.
    pub fn delta_eta(&self, other: &FourMomentum) -> f64 {
        (self.eta - other.eta).abs()
    }

    /// Azimuthal separation folded into [0, pi].
    ///
    /// # Examples
    ///
    /// ```
    /// use std::f64::consts::PI;
    /// use recomb::data::kinematics::FourMomentum;
    ///
    /// let a = FourMomentum::new(10.0, 0.0, 3.0, 10.0);
    /// let b = FourMomentum::new(10.0, 0.0, -3.0, 10.0);
    /// assert!((a.delta_phi(&b) - (2.0 * PI - 6.0)).abs() < 1e-12);
    /// ```
    pub fn delta_phi(&self, other: &FourMomentum) -> f64 {
        let d = (self.phi - other.phi).rem_euclid(2.0 * PI);
        if d > PI {
            2.0 * PI - d
        } else {
            d
        }
    }

    /// Angular separation combining pseudorapidity and azimuthal differences.
    ///
    /// # Examples
    ///
    /// ```
    /// use recomb::data::kinematics::FourMomentum;
    ///
    /// let a = FourMomentum::new(10.0, 0.0, 0.0, 10.0);
    /// let b = FourMomentum::new(10.0, 0.3, 0.4, 10.0);
    /// assert!((a.delta_r(&b) - 0.5).abs() < 1e-12);
    /// ```
    pub fn delta_r(&self, other: &FourMomentum) -> f64 {
        let deta = self.eta - other.eta;
        let dphi = self.delta_phi(other);
        (deta * deta + dphi * dphi).sqrt()
    }
}

impl fmt::Display for FourMomentum {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "FourMomentum(pt: {}, eta: {}, phi: {}, energy: {})",
            self.pt, self.eta, self.phi, self.energy
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delta_phi_wraps_across_pi() {
        let a = FourMomentum::new(1.0, 0.0, PI - 0.1, 1.0);
        let b = FourMomentum::new(1.0, 0.0, -PI + 0.1, 1.0);
        assert!((a.delta_phi(&b) - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_delta_r_symmetric() {
        let a = FourMomentum::new(30.0, 1.2, 0.4, 40.0);
        let b = FourMomentum::new(60.0, -0.7, 2.9, 80.0);
        assert!((a.delta_r(&b) - b.delta_r(&a)).abs() < 1e-12);
    }

    #[test]
    fn test_mass_of_massless_object() {
        // pt = E, eta = 0: purely transverse massless particle
        let p4 = FourMomentum::new(25.0, 0.0, 1.0, 25.0);
        assert!(p4.mass().abs() < 1e-9);
    }
}
