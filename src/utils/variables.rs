use serde::{Deserialize, Serialize};

use crate::{
    utils::vectors::{Vec3, Vec4},
    DstarPolError, DstarPolResult,
};

/// The polarization-sensitive angles of a soft daughter in its mother's rest
/// frame, measured against three lab-frame reference axes.
///
/// The cosines are absolute values (the spin-alignment observables are even
/// in cos θ*), so they lie in `[0, 1]`; `theta_beam` lies in `[0, π]` and
/// `phi_beam` in `(-π, π]`.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AngularObservables {
    /// |cos θ*| against the lab z-axis.
    pub cos_theta_beam: f64,
    /// |cos θ*| against the production-plane normal,
    /// $`(p_y/p_T, -p_x/p_T, 0)`$.
    pub cos_theta_production: f64,
    /// |cos θ*| against the mother flight direction.
    pub cos_theta_helicity: f64,
    /// Signed polar angle of the probe against the beam axis.
    pub theta_beam: f64,
    /// Azimuthal angle of the probe in the transverse plane.
    pub phi_beam: f64,
}

/// Boost the soft daughter into the mother's rest frame and measure its
/// direction (the probe vector) against the beam, production-plane-normal,
/// and helicity axes.
///
/// This routine is pure: it depends only on the two four-momenta. It serves
/// both the reconstructed path and the generation-level acceptance path,
/// which differ only in where the momenta come from.
///
/// # Errors
///
/// Candidates are required to carry strictly positive transverse and total
/// momentum; a non-positive denominator (including a vanishing probe
/// momentum, which happens when the daughter is at rest in the mother frame)
/// yields [`DstarPolError::DegenerateMomentum`] rather than NaN observables.
pub fn polarization_observables(
    mother: &Vec4,
    soft: &Vec4,
) -> DstarPolResult<AngularObservables> {
    let pt = mother.pt();
    if pt <= 0.0 {
        return Err(DstarPolError::DegenerateMomentum {
            quantity: "mother pT",
            value: pt,
        });
    }
    let p = mother.vec3().mag();
    if p <= 0.0 {
        return Err(DstarPolError::DegenerateMomentum {
            quantity: "mother |p|",
            value: p,
        });
    }

    let probe = soft.boost(&-mother.beta()).vec3();
    let probe_mag = probe.mag();
    if probe_mag <= 0.0 {
        return Err(DstarPolError::DegenerateMomentum {
            quantity: "probe |p|",
            value: probe_mag,
        });
    }

    let normal = Vec3::new(mother.py() / pt, -mother.px() / pt, 0.0);
    let helicity = mother.vec3() / p;
    let beam = Vec3::beam_axis();

    Ok(AngularObservables {
        cos_theta_beam: (beam.dot(&probe) / probe_mag).abs(),
        cos_theta_production: (normal.dot(&probe) / probe_mag).abs(),
        cos_theta_helicity: (helicity.dot(&probe) / probe_mag).abs(),
        theta_beam: (beam.dot(&probe) / probe_mag).acos(),
        phi_beam: probe.y().atan2(probe.x()),
    })
}
