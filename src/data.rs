use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::utils::{enums::Origin, vectors::Vec3};

/// PDG code of the charged pion.
pub const PDG_PI: i32 = 211;
/// PDG code of the charged kaon.
pub const PDG_K: i32 = 321;
/// PDG code of the D0.
pub const PDG_D0: i32 = 421;
/// PDG code of the D*+.
pub const PDG_DSTAR: i32 = 413;

/// An injected, read-only particle-mass lookup keyed by PDG code.
///
/// The kinematic transform takes masses from here rather than from a global
/// particle database, so the host controls exactly which mass hypotheses are
/// in play. The default table carries the four species the D* pipeline needs.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MassTable(IndexMap<u32, f64>);

impl Default for MassTable {
    fn default() -> Self {
        let mut table = IndexMap::new();
        table.insert(PDG_PI as u32, 0.13957039);
        table.insert(PDG_K as u32, 0.493677);
        table.insert(PDG_D0 as u32, 1.86484);
        table.insert(PDG_DSTAR as u32, 2.01026);
        Self(table)
    }
}

impl MassTable {
    /// An empty table; every lookup fails until entries are inserted.
    pub fn empty() -> Self {
        Self(IndexMap::new())
    }
    /// Look up a mass in GeV/c² by PDG code (sign-insensitive).
    pub fn mass(&self, pdg: i32) -> Option<f64> {
        self.0.get(&pdg.unsigned_abs()).copied()
    }
    /// Add or override an entry.
    pub fn insert(&mut self, pdg: i32, mass: f64) {
        self.0.insert(pdg.unsigned_abs(), mass);
    }
}

/// A resolved detector track as seen by the pre-selection.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Track {
    /// Lab-frame three-momentum.
    pub p: Vec3,
}

/// A primary-vertex snapshot. Cloneable so the recompute path can back it up
/// and restore it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    /// Number of tracks contributing to the fit.
    pub n_contributors: u32,
}

/// The two-body D0 → Kπ sub-decay owned by a [`Candidate`].
///
/// `own_primary_vtx` is the mutable vertex association the selector manages:
/// it is either unset or holds exactly one owner at a time, and whoever set
/// it must clear it (through [`VertexScope::release`](crate::VertexScope))
/// before the candidate is discarded or reused.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TwoBody {
    /// The two prong momenta (kaon, pion).
    pub prongs: [Vec3; 2],
    /// Borrowed or recomputed primary-vertex association.
    pub own_primary_vtx: Option<Vertex>,
}

impl TwoBody {
    /// The reconstructed D0 momentum (sum of the prongs).
    pub fn p(&self) -> Vec3 {
        self.prongs[0] + self.prongs[1]
    }
}

/// A reconstructed D* → D0 π decay hypothesis.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    /// Lab-frame three-momentum of the D* hypothesis.
    pub p: Vec3,
    /// Invariant-mass difference M(Kππ) − M(Kπ).
    pub delta_mass: f64,
    /// Momentum of the soft-pion track.
    pub soft_p: Vec3,
    /// Index of the two-body sub-decay in the event's parallel list.
    pub two_body: usize,
    /// Whether the derived quantities survived the slimming of the input;
    /// when false, [`RecoFiller::fill_cascade`](crate::RecoFiller) must
    /// complete them before the full selection runs.
    pub is_filled: bool,
    /// MC labels of the three prongs (soft pion, kaon, pion), negative when
    /// unmatched.
    pub prong_labels: [i32; 3],
}

impl Candidate {
    /// The invariant-mass difference M(Kππ) − M(Kπ).
    pub fn delta_inv_mass(&self) -> f64 {
        self.delta_mass
    }
    /// Transverse momentum.
    pub fn pt(&self) -> f64 {
        self.p.pt()
    }
    /// Rapidity under the given mass hypothesis.
    pub fn rapidity(&self, mass: f64) -> f64 {
        self.p.with_mass(mass).rapidity()
    }
}

/// A generated truth particle. `pileup` marks particles produced in an
/// out-of-bunch pileup collision, precomputed by the host from its event
/// header.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GenParticle {
    /// Signed PDG code.
    pub pdg: i32,
    /// Generated three-momentum.
    pub p: Vec3,
    /// Generated mass.
    pub mass: f64,
    /// Indices of the daughters in the truth list.
    pub daughters: Vec<usize>,
    /// Index of the mother, if any.
    pub mother: Option<usize>,
    /// Whether this particle comes from an out-of-bunch pileup collision.
    pub pileup: bool,
}

/// Event-level truth header.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct McHeader {
    /// z-coordinate of the generated primary vertex.
    pub vtx_z: f64,
}

/// The truth side of a Monte-Carlo event: the generated particle list plus
/// its header. Zero-or-one record per event; absent for real data.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TruthRecord {
    pub particles: Vec<GenParticle>,
    pub header: McHeader,
}

/// One event's worth of host-supplied containers: the candidate list, the
/// parallel two-body list it indexes into, the event primary vertex, and the
/// (optional) truth record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub candidates: Vec<Candidate>,
    pub two_bodies: Vec<TwoBody>,
    pub primary_vtx: Vertex,
    /// Solenoid field in kG, forwarded to the classifier.
    pub magnetic_field: f64,
    /// Centrality percentile, when the host provides multiplicity selection.
    pub centrality: Option<f64>,
    pub truth: Option<TruthRecord>,
}

/// Maps a reconstructed candidate to a generated particle and classifies the
/// particle's origin.
pub trait TruthMatcher {
    /// Find the truth particle matching this candidate, if any.
    fn match_candidate(&self, cand: &Candidate, particles: &[GenParticle]) -> Option<usize>;
    /// Classify the origin of the particle at `label`.
    fn origin(&self, particles: &[GenParticle], label: usize) -> Origin;
}

/// Default daughter-label truth matching.
///
/// A candidate matches a generated D* when the candidate's prong labels are
/// exactly the labels of the generated decay chain (soft pion plus the two
/// D0 daughters, in any order). Origin classification walks the mother chain
/// looking for a beauty hadron; out-of-bunch pileup takes precedence over
/// everything else.
#[derive(Copy, Clone, Debug, Default)]
pub struct LabelMatcher;

impl TruthMatcher for LabelMatcher {
    fn match_candidate(&self, cand: &Candidate, particles: &[GenParticle]) -> Option<usize> {
        if cand.prong_labels.iter().any(|&l| l < 0) {
            return None;
        }
        particles.iter().enumerate().find_map(|(i, part)| {
            if part.pdg.abs() != PDG_DSTAR {
                return None;
            }
            let labels = dstar_decay_labels(part, particles)?;
            let mut expected = [labels[0] as i32, labels[1] as i32, labels[2] as i32];
            let mut got = cand.prong_labels;
            expected.sort_unstable();
            got.sort_unstable();
            (expected == got).then_some(i)
        })
    }

    fn origin(&self, particles: &[GenParticle], label: usize) -> Origin {
        let Some(part) = particles.get(label) else {
            return Origin::Background;
        };
        if part.pileup {
            return Origin::OutOfBunchPileup;
        }
        let mut current = part.mother;
        while let Some(idx) = current {
            let Some(mother) = particles.get(idx) else {
                break;
            };
            if is_beauty(mother.pdg) {
                return Origin::FeedDown;
            }
            current = mother.mother;
        }
        Origin::Prompt
    }
}

fn is_beauty(pdg: i32) -> bool {
    let code = pdg.unsigned_abs();
    code == 5 || code / 100 % 10 == 5 || code / 1000 % 10 == 5
}

/// Check that `part` is a D* with the expected D0 π / Kπ decay chain and
/// return the truth-list labels of (soft pion, kaon, pion).
pub fn dstar_decay_labels(part: &GenParticle, particles: &[GenParticle]) -> Option<[usize; 3]> {
    if part.pdg.abs() != PDG_DSTAR || part.daughters.len() != 2 {
        return None;
    }
    let get = |i: usize| particles.get(i);
    let (d0_idx, soft_idx) = match (get(part.daughters[0]), get(part.daughters[1])) {
        (Some(a), Some(b)) if a.pdg.abs() == PDG_D0 && b.pdg.abs() == PDG_PI => {
            (part.daughters[0], part.daughters[1])
        }
        (Some(a), Some(b)) if a.pdg.abs() == PDG_PI && b.pdg.abs() == PDG_D0 => {
            (part.daughters[1], part.daughters[0])
        }
        _ => return None,
    };
    let d0 = get(d0_idx)?;
    if d0.daughters.len() != 2 {
        return None;
    }
    let (k_idx, pi_idx) = match (get(d0.daughters[0]), get(d0.daughters[1])) {
        (Some(a), Some(b)) if a.pdg.abs() == PDG_K && b.pdg.abs() == PDG_PI => {
            (d0.daughters[0], d0.daughters[1])
        }
        (Some(a), Some(b)) if a.pdg.abs() == PDG_PI && b.pdg.abs() == PDG_K => {
            (d0.daughters[1], d0.daughters[0])
        }
        _ => return None,
    };
    Some([soft_idx, k_idx, pi_idx])
}

/// A well-formed single-candidate event that can be used to exercise the
/// pipeline in tests. The candidate sits at pT ≈ 4.2 GeV/c with a mass
/// difference inside the D* signal window.
pub fn test_event() -> EventRecord {
    let soft_p = Vec3::new(0.21, 0.05, 0.11);
    let prongs = [Vec3::new(2.4, 0.5, 1.1), Vec3::new(1.4, 0.31, 0.64)];
    let p = soft_p + prongs[0] + prongs[1];
    EventRecord {
        candidates: vec![Candidate {
            p,
            delta_mass: 0.1455,
            soft_p,
            two_body: 0,
            is_filled: false,
            prong_labels: [3, 4, 5],
        }],
        two_bodies: vec![TwoBody {
            prongs,
            own_primary_vtx: None,
        }],
        primary_vtx: Vertex {
            x: 0.01,
            y: -0.02,
            z: 1.4,
            n_contributors: 24,
        },
        magnetic_field: 5.0,
        centrality: Some(30.0),
        truth: None,
    }
}

/// The truth record matching [`test_event`]: a prompt generated D* whose
/// decay labels line up with the test candidate's prongs.
pub fn test_truth() -> TruthRecord {
    let soft_p = Vec3::new(0.21, 0.05, 0.11);
    let k_p = Vec3::new(2.4, 0.5, 1.1);
    let pi_p = Vec3::new(1.4, 0.31, 0.64);
    let dstar_p = soft_p + k_p + pi_p;
    TruthRecord {
        particles: vec![
            // 0: charm quark placeholder mother
            GenParticle {
                pdg: 4,
                p: dstar_p,
                mass: 1.27,
                daughters: vec![1],
                mother: None,
                pileup: false,
            },
            // 1: the D*
            GenParticle {
                pdg: PDG_DSTAR,
                p: dstar_p,
                mass: 2.01026,
                daughters: vec![2, 3],
                mother: Some(0),
                pileup: false,
            },
            // 2: the D0
            GenParticle {
                pdg: PDG_D0,
                p: k_p + pi_p,
                mass: 1.86484,
                daughters: vec![4, 5],
                mother: Some(1),
                pileup: false,
            },
            // 3: the soft pion
            GenParticle {
                pdg: PDG_PI,
                p: soft_p,
                mass: 0.13957039,
                daughters: vec![],
                mother: Some(1),
                pileup: false,
            },
            // 4: the kaon
            GenParticle {
                pdg: -PDG_K,
                p: k_p,
                mass: 0.493677,
                daughters: vec![],
                mother: Some(2),
                pileup: false,
            },
            // 5: the D0 pion
            GenParticle {
                pdg: PDG_PI,
                p: pi_p,
                mass: 0.13957039,
                daughters: vec![],
                mother: Some(2),
                pileup: false,
            },
        ],
        header: McHeader { vtx_z: 1.4 },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mass_table_lookup() {
        let table = MassTable::default();
        assert_eq!(table.mass(PDG_PI), Some(0.13957039));
        assert_eq!(table.mass(-PDG_K), Some(0.493677));
        assert_eq!(table.mass(9999), None);
        let mut table = table;
        table.insert(-511, 5.27966);
        assert_eq!(table.mass(511), Some(5.27966));
    }

    #[test]
    fn test_decay_chain_labels() {
        let truth = test_truth();
        let labels = dstar_decay_labels(&truth.particles[1], &truth.particles).unwrap();
        assert_eq!(labels, [3, 4, 5]);
        // a D0 with a broken chain is rejected
        assert!(dstar_decay_labels(&truth.particles[2], &truth.particles).is_none());
    }

    #[test]
    fn test_label_matching() {
        let truth = test_truth();
        let event = test_event();
        let matcher = LabelMatcher;
        assert_eq!(
            matcher.match_candidate(&event.candidates[0], &truth.particles),
            Some(1)
        );
        let mut unmatched = event.candidates[0].clone();
        unmatched.prong_labels = [3, 4, 7];
        assert_eq!(matcher.match_candidate(&unmatched, &truth.particles), None);
        let mut unlabeled = event.candidates[0].clone();
        unlabeled.prong_labels = [-1, -1, -1];
        assert_eq!(matcher.match_candidate(&unlabeled, &truth.particles), None);
    }

    #[test]
    fn test_origin_classification() {
        let mut truth = test_truth();
        let matcher = LabelMatcher;
        assert_eq!(matcher.origin(&truth.particles, 1), Origin::Prompt);
        // swap the quark mother for a B meson
        truth.particles[0].pdg = -511;
        assert_eq!(matcher.origin(&truth.particles, 1), Origin::FeedDown);
        // pileup takes precedence
        truth.particles[1].pileup = true;
        assert_eq!(matcher.origin(&truth.particles, 1), Origin::OutOfBunchPileup);
    }
}
