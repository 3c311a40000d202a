use serde::{Deserialize, Serialize};

use crate::data::{
    dstar_decay_labels, EventRecord, GenParticle, MassTable, TruthMatcher, PDG_DSTAR, PDG_PI,
};
use crate::router::{
    AccSparseSet, BinningConfig, GenObservables, RecoObservables, RecoSparseSet, TruthStatus,
};
use crate::selection::{
    select_candidate, Classifier, CutConfig, RecoFiller, SelectionCounters, SelectionStatus,
};
use crate::utils::enums::Origin;
use crate::utils::variables::polarization_observables;
use crate::{DstarPolError, DstarPolResult};

/// Pseudorapidity window of the tracking acceptance.
const DAUGHTER_MAX_ABS_ETA: f64 = 0.9;
/// Minimum pT of the soft pion at generator level, in GeV/c.
const SOFT_PION_MIN_PT: f64 = 0.06;
/// Minimum pT of the D0 daughters at generator level, in GeV/c.
const DAUGHTER_MIN_PT: f64 = 0.1;
/// Centrality sentinel when the host provides no multiplicity selection;
/// lands in the centrality underflow bin.
const CENTRALITY_UNSET: f64 = -999.0;

/// Static analysis configuration, fixed for the lifetime of one [`Analysis`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Whether events carry truth records (Monte-Carlo mode).
    pub read_mc: bool,
    /// Whether the generator-level fill requires full daughter acceptance
    /// (true) or only the |y| < 1 window (false).
    pub fill_acceptance_level: bool,
    /// Shared sparse binning.
    pub binning: BinningConfig,
}

impl AnalysisConfig {
    /// Data-mode configuration over the given pT bin edges.
    pub fn new(pt_edges: &[f64], fine_pt: bool) -> DstarPolResult<Self> {
        Ok(Self {
            read_mc: false,
            fill_acceptance_level: true,
            binning: BinningConfig::new(pt_edges, fine_pt)?,
        })
    }

    /// Monte-Carlo configuration over the given pT bin edges.
    pub fn new_mc(pt_edges: &[f64], fine_pt: bool) -> DstarPolResult<Self> {
        let mut config = Self::new(pt_edges, fine_pt)?;
        config.read_mc = true;
        Ok(config)
    }
}

/// Run-level counters across events.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counters {
    /// Events processed.
    pub events: u64,
    /// Monte-Carlo events skipped for a missing truth record or matcher.
    pub missing_truth: u64,
    /// Accepted candidates skipped for degenerate angular kinematics.
    pub degenerate: u64,
    /// Per-candidate selection counters.
    pub selection: SelectionCounters,
}

/// The analysis state: configuration, the two sparse sets, the run counters,
/// and the injected mass table.
#[derive(Clone, Debug)]
pub struct Analysis {
    config: AnalysisConfig,
    reco: RecoSparseSet,
    acc: AccSparseSet,
    counters: Counters,
    masses: MassTable,
}

impl Analysis {
    pub fn new(config: AnalysisConfig) -> Self {
        let reco = RecoSparseSet::new(&config.binning);
        let acc = AccSparseSet::new(&config.binning);
        Self {
            config,
            reco,
            acc,
            counters: Counters::default(),
            masses: MassTable::default(),
        }
    }

    /// Replace the default mass table, for hosts carrying their own.
    pub fn with_mass_table(mut self, masses: MassTable) -> Self {
        self.masses = masses;
        self
    }

    pub fn reco(&self) -> &RecoSparseSet {
        &self.reco
    }

    pub fn acc(&self) -> &AccSparseSet {
        &self.acc
    }

    pub fn counters(&self) -> &Counters {
        &self.counters
    }

    /// Process one event: the generator-level acceptance fill first (MC
    /// mode), then the candidate loop of select, transform, and deposit.
    ///
    /// Per-candidate defects (degenerate kinematics, rejections) are counted
    /// and skipped; an [`Err`] means a configuration-level defect and leaves
    /// the sparses untouched for this candidate.
    pub fn process_event(
        &mut self,
        event: &mut EventRecord,
        cuts: &dyn CutConfig,
        filler: &dyn RecoFiller,
        classifier: Option<&dyn Classifier>,
        matcher: Option<&dyn TruthMatcher>,
    ) -> DstarPolResult<()> {
        self.counters.events += 1;
        let EventRecord {
            candidates,
            two_bodies,
            primary_vtx,
            magnetic_field,
            centrality,
            truth,
        } = event;
        let centrality = centrality.unwrap_or(CENTRALITY_UNSET);

        let truth = if self.config.read_mc {
            let (Some(truth), Some(matcher)) = (truth.as_ref(), matcher) else {
                log::warn!("Monte-Carlo event without a truth record or matcher, skipping");
                self.counters.missing_truth += 1;
                return Ok(());
            };
            self.fill_gen_acceptance(truth.header.vtx_z, &truth.particles, cuts, matcher, centrality)?;
            Some((truth, matcher))
        } else {
            None
        };

        let dstar_mass = self
            .masses
            .mass(PDG_DSTAR)
            .ok_or(DstarPolError::MissingMass { pdg: PDG_DSTAR })?;
        let pion_mass = self
            .masses
            .mass(PDG_PI)
            .ok_or(DstarPolError::MissingMass { pdg: PDG_PI })?;

        for cand in candidates.iter_mut() {
            let tb_idx = cand.two_body;
            let (status, scope) = select_candidate(
                cand,
                two_bodies.get_mut(tb_idx),
                primary_vtx,
                *magnetic_field,
                cuts,
                filler,
                classifier,
                &mut self.counters.selection,
            );
            // release on every path once selection has run
            let release = |two_bodies: &mut [crate::data::TwoBody]| {
                if let Some(tb) = two_bodies.get_mut(tb_idx) {
                    scope.clone().release(tb);
                }
            };
            if !matches!(status, SelectionStatus::Accepted { .. }) {
                release(two_bodies);
                continue;
            }

            let soft4 = cand.soft_p.with_mass(pion_mass);
            let mother4 = cand.p.with_mass(dstar_mass);
            let angles = match polarization_observables(&mother4, &soft4) {
                Ok(angles) => angles,
                Err(err) => {
                    log::warn!("skipping candidate with degenerate kinematics: {err}");
                    self.counters.degenerate += 1;
                    release(two_bodies);
                    continue;
                }
            };

            let truth_status = match truth {
                None => TruthStatus::NotRequested,
                Some((record, matcher)) => {
                    match matcher.match_candidate(cand, &record.particles) {
                        Some(label) => {
                            TruthStatus::Matched(matcher.origin(&record.particles, label))
                        }
                        None => TruthStatus::Unmatched,
                    }
                }
            };

            let obs = RecoObservables {
                delta_mass: cand.delta_inv_mass(),
                pt: cand.pt(),
                y: cand.rapidity(dstar_mass),
                angles,
                centrality,
            };
            self.reco.deposit(truth_status, &obs)?;
            release(two_bodies);
        }
        Ok(())
    }

    /// Fill the generator-level acceptance sparses from the truth record.
    fn fill_gen_acceptance(
        &mut self,
        vtx_z: f64,
        particles: &[GenParticle],
        cuts: &dyn CutConfig,
        matcher: &dyn TruthMatcher,
        centrality: f64,
    ) -> DstarPolResult<()> {
        if vtx_z.abs() > cuts.max_vtx_z() {
            return Ok(());
        }
        for (index, part) in particles.iter().enumerate() {
            if part.pdg.abs() != PDG_DSTAR {
                continue;
            }
            let Some(labels) = dstar_decay_labels(part, particles) else {
                continue;
            };
            let origin = matcher.origin(particles, index);
            if matches!(origin, Origin::Background | Origin::OutOfBunchPileup) {
                continue;
            }

            let mother4 = part.p.with_mass(part.mass);
            let pt = part.p.pt();
            let y = mother4.rapidity();
            let accepted = if self.config.fill_acceptance_level {
                cuts.is_in_fiducial_acceptance(pt, y)
                    && daughters_in_acceptance(particles, &labels)
            } else {
                y.abs() < 1.0
            };
            if !accepted {
                continue;
            }

            let soft = &particles[labels[0]];
            let soft4 = soft.p.with_mass(soft.mass);
            let angles = match polarization_observables(&mother4, &soft4) {
                Ok(angles) => angles,
                Err(err) => {
                    log::warn!("skipping generated particle with degenerate kinematics: {err}");
                    self.counters.degenerate += 1;
                    continue;
                }
            };
            let obs = GenObservables {
                pt,
                y,
                angles,
                centrality,
            };
            self.acc.deposit(origin, &obs)?;
        }
        Ok(())
    }
}

/// Generator-level daughter acceptance: every daughter inside |η| < 0.9 with
/// a lowered pT threshold for the soft pion.
fn daughters_in_acceptance(particles: &[GenParticle], labels: &[usize; 3]) -> bool {
    labels.iter().enumerate().all(|(i, &label)| {
        let daughter = &particles[label];
        let min_pt = if i == 0 {
            SOFT_PION_MIN_PT
        } else {
            DAUGHTER_MIN_PT
        };
        daughter.p.eta().abs() <= DAUGHTER_MAX_ABS_ETA && daughter.p.pt() >= min_pt
    })
}
