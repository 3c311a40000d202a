use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::utils::enums::{AccChannel, Origin, RecoChannel};
use crate::utils::variables::AngularObservables;
use crate::{DstarPolError, DstarPolResult};

/// One histogram axis with uniform binning over `(min, max)`.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Axis {
    pub bins: usize,
    pub min: f64,
    pub max: f64,
}

impl Axis {
    pub const fn new(bins: usize, min: f64, max: f64) -> Self {
        Self { bins, min, max }
    }

    /// Map a value to its bin: 0 is the underflow bin, `bins + 1` the
    /// overflow bin, `1..=bins` the in-range bins.
    pub fn index(&self, value: f64) -> u16 {
        if value < self.min {
            return 0;
        }
        match crate::utils::bin_index(value, self.bins, (self.min, self.max)) {
            Some(bin) => (bin + 1) as u16,
            None => (self.bins + 1) as u16,
        }
    }

    /// The bin edges, underflow and overflow excluded.
    pub fn edges(&self) -> Vec<f64> {
        crate::utils::bin_edges(self.bins, (self.min, self.max))
    }
}

/// A sparse n-dimensional histogram: only touched bins take memory, and
/// under/overflow bins exist on every axis so a fill never silently drops.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SparseHist {
    axes: Vec<Axis>,
    counts: IndexMap<Box<[u16]>, f64>,
    entries: u64,
}

impl SparseHist {
    pub fn new(axes: Vec<Axis>) -> Self {
        Self {
            axes,
            counts: IndexMap::default(),
            entries: 0,
        }
    }

    pub fn dim(&self) -> usize {
        self.axes.len()
    }

    /// Deposit unit weight at the bin containing `coords`.
    pub fn fill(&mut self, coords: &[f64]) -> DstarPolResult<()> {
        if coords.len() != self.axes.len() {
            return Err(DstarPolError::DimensionMismatch {
                expected: self.axes.len(),
                got: coords.len(),
            });
        }
        let key: Box<[u16]> = coords
            .iter()
            .zip(self.axes.iter())
            .map(|(&value, axis)| axis.index(value))
            .collect();
        *self.counts.entry(key).or_insert(0.0) += 1.0;
        self.entries += 1;
        Ok(())
    }

    /// Number of fills received.
    pub fn entries(&self) -> u64 {
        self.entries
    }

    /// Content of the bin holding `coords`, zero if untouched.
    pub fn count_for(&self, coords: &[f64]) -> f64 {
        let key: Box<[u16]> = coords
            .iter()
            .zip(self.axes.iter())
            .map(|(&value, axis)| axis.index(value))
            .collect();
        self.counts.get(&key).copied().unwrap_or(0.0)
    }

    /// Sum over all bins, under/overflow included.
    pub fn total(&self) -> f64 {
        self.counts.values().sum()
    }

    /// Number of distinct touched bins.
    pub fn occupied_bins(&self) -> usize {
        self.counts.len()
    }
}

/// The binning shared by every sparse in the set. The pT axis is derived
/// from the analysis bin edges: one unit bin per GeV/c up to the last edge,
/// tenfold finer when requested.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BinningConfig {
    pt_edges: Vec<f64>,
    n_pt_bins: usize,
    pt_max: f64,
}

impl BinningConfig {
    const MASS: Axis = Axis::new(500, 0.138, 0.160);
    const COS: Axis = Axis::new(5, 0.0, 1.0);
    const RAPIDITY: Axis = Axis::new(100, -1.0, 1.0);
    const CENTRALITY: Axis = Axis::new(100, 0.0, 100.0);
    const ANGLE: Axis = Axis::new(100, 0.0, std::f64::consts::PI);

    /// Build the shared binning from the analysis pT bin edges. `fine_pt`
    /// requests ten pT bins per GeV/c instead of one.
    pub fn new(pt_edges: &[f64], fine_pt: bool) -> DstarPolResult<Self> {
        if pt_edges.len() < 2 {
            return Err(DstarPolError::InvalidBinning {
                reason: format!("need at least two pT edges, got {}", pt_edges.len()),
            });
        }
        if pt_edges.windows(2).any(|e| e[0] >= e[1]) {
            return Err(DstarPolError::InvalidBinning {
                reason: "pT edges must be strictly ascending".to_string(),
            });
        }
        let pt_max = pt_edges[pt_edges.len() - 1];
        let mut n_pt_bins = pt_max as usize;
        if fine_pt {
            n_pt_bins *= 10;
        }
        if n_pt_bins == 0 {
            return Err(DstarPolError::InvalidBinning {
                reason: format!("last pT edge {pt_max} yields an empty pT axis"),
            });
        }
        Ok(Self {
            pt_edges: pt_edges.to_vec(),
            n_pt_bins,
            pt_max,
        })
    }

    pub fn pt_edges(&self) -> &[f64] {
        &self.pt_edges
    }

    fn pt_axis(&self) -> Axis {
        Axis::new(self.n_pt_bins, 0.0, self.pt_max)
    }

    /// {ΔM, pT, y, |cos θ*|_beam, |cos θ*|_prod, |cos θ*|_hel, centrality}
    fn reco_axes(&self) -> Vec<Axis> {
        vec![
            Self::MASS,
            self.pt_axis(),
            Self::RAPIDITY,
            Self::COS,
            Self::COS,
            Self::COS,
            Self::CENTRALITY,
        ]
    }

    /// {ΔM, pT, θ, φ}
    fn reco_angle_axes(&self) -> Vec<Axis> {
        vec![Self::MASS, self.pt_axis(), Self::ANGLE, Self::ANGLE]
    }

    /// {pT, y, |cos θ*|_beam, |cos θ*|_prod, |cos θ*|_hel, centrality}
    fn gen_axes(&self) -> Vec<Axis> {
        vec![
            self.pt_axis(),
            Self::RAPIDITY,
            Self::COS,
            Self::COS,
            Self::COS,
            Self::CENTRALITY,
        ]
    }

    /// {pT, θ, φ}
    fn gen_angle_axes(&self) -> Vec<Axis> {
        vec![self.pt_axis(), Self::ANGLE, Self::ANGLE]
    }
}

/// Truth information available for one reconstructed candidate at deposit
/// time.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TruthStatus {
    /// Data mode: no truth was requested.
    NotRequested,
    /// The candidate matched a generated D* with the given origin.
    Matched(Origin),
    /// Truth was requested but no generated D* matched.
    Unmatched,
}

/// The full coordinate set of one accepted candidate.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RecoObservables {
    pub delta_mass: f64,
    pub pt: f64,
    pub y: f64,
    pub angles: AngularObservables,
    /// Out-of-range sentinel values land in the centrality overflow bin.
    pub centrality: f64,
}

impl RecoObservables {
    fn sparse_coords(&self) -> [f64; 7] {
        [
            self.delta_mass,
            self.pt,
            self.y,
            self.angles.cos_theta_beam,
            self.angles.cos_theta_production,
            self.angles.cos_theta_helicity,
            self.centrality,
        ]
    }

    fn theta_phi_coords(&self) -> [f64; 4] {
        [
            self.delta_mass,
            self.pt,
            self.angles.theta_beam,
            self.angles.phi_beam,
        ]
    }
}

/// The coordinate set of one generated D* accepted at generator level.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct GenObservables {
    pub pt: f64,
    pub y: f64,
    pub angles: AngularObservables,
    pub centrality: f64,
}

impl GenObservables {
    fn sparse_coords(&self) -> [f64; 6] {
        [
            self.pt,
            self.y,
            self.angles.cos_theta_beam,
            self.angles.cos_theta_production,
            self.angles.cos_theta_helicity,
            self.centrality,
        ]
    }

    fn theta_phi_coords(&self) -> [f64; 3] {
        [self.pt, self.angles.theta_beam, self.angles.phi_beam]
    }
}

/// One pair of reconstruction-level sparses per channel: the 7-D main shape
/// and the 4-D (θ, φ) companion, always filled together.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RecoSparseSet {
    main: Vec<SparseHist>,
    angle: Vec<SparseHist>,
}

impl RecoSparseSet {
    pub fn new(binning: &BinningConfig) -> Self {
        let main = RecoChannel::ALL
            .iter()
            .map(|_| SparseHist::new(binning.reco_axes()))
            .collect();
        let angle = RecoChannel::ALL
            .iter()
            .map(|_| SparseHist::new(binning.reco_angle_axes()))
            .collect();
        Self { main, angle }
    }

    /// Route one accepted candidate to its channel and deposit both shapes.
    /// Returns the channel filled, or [`None`] when the truth origin maps to
    /// no channel (background and out-of-bunch pileup matches).
    pub fn deposit(
        &mut self,
        truth: TruthStatus,
        obs: &RecoObservables,
    ) -> DstarPolResult<Option<RecoChannel>> {
        let channel = match truth {
            TruthStatus::NotRequested => RecoChannel::All,
            TruthStatus::Matched(Origin::Prompt) => RecoChannel::FromC,
            TruthStatus::Matched(Origin::FeedDown) => RecoChannel::FromB,
            TruthStatus::Matched(Origin::Background | Origin::OutOfBunchPileup) => {
                return Ok(None)
            }
            TruthStatus::Unmatched => RecoChannel::Bkg,
        };
        self.main[channel.index()].fill(&obs.sparse_coords())?;
        self.angle[channel.index()].fill(&obs.theta_phi_coords())?;
        Ok(Some(channel))
    }

    pub fn main(&self, channel: RecoChannel) -> &SparseHist {
        &self.main[channel.index()]
    }

    pub fn angle(&self, channel: RecoChannel) -> &SparseHist {
        &self.angle[channel.index()]
    }
}

/// The generator-acceptance counterpart: a 6-D main shape and a 3-D (θ, φ)
/// companion for the two physical origins.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AccSparseSet {
    main: Vec<SparseHist>,
    angle: Vec<SparseHist>,
}

impl AccSparseSet {
    pub fn new(binning: &BinningConfig) -> Self {
        let main = AccChannel::ALL
            .iter()
            .map(|_| SparseHist::new(binning.gen_axes()))
            .collect();
        let angle = AccChannel::ALL
            .iter()
            .map(|_| SparseHist::new(binning.gen_angle_axes()))
            .collect();
        Self { main, angle }
    }

    /// Deposit one generated D* into the channel of its origin; background
    /// and pileup origins fill nothing.
    pub fn deposit(
        &mut self,
        origin: Origin,
        obs: &GenObservables,
    ) -> DstarPolResult<Option<AccChannel>> {
        let channel = match origin {
            Origin::Prompt => AccChannel::FromC,
            Origin::FeedDown => AccChannel::FromB,
            Origin::Background | Origin::OutOfBunchPileup => return Ok(None),
        };
        self.main[channel.index()].fill(&obs.sparse_coords())?;
        self.angle[channel.index()].fill(&obs.theta_phi_coords())?;
        Ok(Some(channel))
    }

    pub fn main(&self, channel: AccChannel) -> &SparseHist {
        &self.main[channel.index()]
    }

    pub fn angle(&self, channel: AccChannel) -> &SparseHist {
        &self.angle[channel.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn observables() -> RecoObservables {
        RecoObservables {
            delta_mass: 0.1455,
            pt: 4.1,
            y: 0.2,
            angles: AngularObservables {
                cos_theta_beam: 0.3,
                cos_theta_production: 0.5,
                cos_theta_helicity: 0.9,
                theta_beam: 1.2,
                phi_beam: 2.0,
            },
            centrality: 30.0,
        }
    }

    #[test]
    fn test_axis_under_and_overflow() {
        let axis = Axis::new(5, 0.0, 1.0);
        assert_eq!(axis.index(-0.1), 0);
        assert_eq!(axis.index(0.0), 1);
        assert_eq!(axis.index(0.999), 5);
        assert_eq!(axis.index(1.0), 6);
        assert_eq!(axis.index(17.0), 6);
        assert_eq!(
            Axis::new(4, 0.0, 2.0).edges(),
            vec![0.0, 0.5, 1.0, 1.5, 2.0]
        );
    }

    #[test]
    fn test_sparse_fill_and_lookup() {
        let mut hist = SparseHist::new(vec![Axis::new(10, 0.0, 1.0), Axis::new(4, -1.0, 1.0)]);
        hist.fill(&[0.25, 0.1]).unwrap();
        hist.fill(&[0.26, 0.11]).unwrap(); // same bin
        hist.fill(&[0.95, -0.9]).unwrap();
        assert_eq!(hist.entries(), 3);
        assert_eq!(hist.occupied_bins(), 2);
        assert_eq!(hist.count_for(&[0.21, 0.05]), 2.0);
        assert_eq!(hist.total(), 3.0);
    }

    #[test]
    fn test_sparse_never_drops_out_of_range_fills() {
        let mut hist = SparseHist::new(vec![Axis::new(100, 0.0, 100.0)]);
        hist.fill(&[-999.0]).unwrap();
        hist.fill(&[250.0]).unwrap();
        assert_eq!(hist.total(), 2.0);
    }

    #[test]
    fn test_dimension_mismatch() {
        let mut hist = SparseHist::new(vec![Axis::new(10, 0.0, 1.0)]);
        let err = hist.fill(&[0.5, 0.5]).unwrap_err();
        assert_eq!(
            err,
            crate::DstarPolError::DimensionMismatch {
                expected: 1,
                got: 2
            }
        );
    }

    #[test]
    fn test_binning_validation() {
        assert!(BinningConfig::new(&[1.0], false).is_err());
        assert!(BinningConfig::new(&[2.0, 1.0], false).is_err());
        let coarse = BinningConfig::new(&[0.0, 4.0, 36.0], false).unwrap();
        assert_eq!(coarse.pt_axis(), Axis::new(36, 0.0, 36.0));
        let fine = BinningConfig::new(&[0.0, 4.0, 36.0], true).unwrap();
        assert_eq!(fine.pt_axis(), Axis::new(360, 0.0, 36.0));
    }

    #[test]
    fn test_reco_routing_table() {
        let binning = BinningConfig::new(&[0.0, 4.0, 36.0], false).unwrap();
        let mut set = RecoSparseSet::new(&binning);
        let obs = observables();
        assert_eq!(
            set.deposit(TruthStatus::NotRequested, &obs).unwrap(),
            Some(RecoChannel::All)
        );
        assert_eq!(
            set.deposit(TruthStatus::Matched(Origin::Prompt), &obs).unwrap(),
            Some(RecoChannel::FromC)
        );
        assert_eq!(
            set.deposit(TruthStatus::Matched(Origin::FeedDown), &obs).unwrap(),
            Some(RecoChannel::FromB)
        );
        assert_eq!(
            set.deposit(TruthStatus::Unmatched, &obs).unwrap(),
            Some(RecoChannel::Bkg)
        );
        assert_eq!(
            set.deposit(TruthStatus::Matched(Origin::Background), &obs).unwrap(),
            None
        );
        assert_eq!(
            set.deposit(TruthStatus::Matched(Origin::OutOfBunchPileup), &obs)
                .unwrap(),
            None
        );
        for channel in RecoChannel::ALL {
            assert_eq!(set.main(channel).entries(), 1);
            assert_eq!(set.angle(channel).entries(), 1);
        }
    }

    #[test]
    fn test_both_shapes_deposited_together() {
        let binning = BinningConfig::new(&[0.0, 4.0, 36.0], false).unwrap();
        let mut set = RecoSparseSet::new(&binning);
        let mut obs = observables();
        obs.centrality = -999.0; // sentinel lands in underflow, never dropped
        set.deposit(TruthStatus::Matched(Origin::FeedDown), &obs)
            .unwrap();
        assert_eq!(set.main(RecoChannel::FromB).total(), 1.0);
        assert_eq!(set.angle(RecoChannel::FromB).total(), 1.0);
    }

    #[test]
    fn test_acc_routing() {
        let binning = BinningConfig::new(&[0.0, 4.0, 36.0], false).unwrap();
        let mut set = AccSparseSet::new(&binning);
        let obs = GenObservables {
            pt: 4.1,
            y: 0.2,
            angles: observables().angles,
            centrality: 30.0,
        };
        assert_eq!(
            set.deposit(Origin::Prompt, &obs).unwrap(),
            Some(AccChannel::FromC)
        );
        assert_eq!(
            set.deposit(Origin::FeedDown, &obs).unwrap(),
            Some(AccChannel::FromB)
        );
        assert_eq!(set.deposit(Origin::Background, &obs).unwrap(), None);
        assert_eq!(set.main(AccChannel::FromC).entries(), 1);
        assert_eq!(set.angle(AccChannel::FromB).entries(), 1);
    }

    #[test]
    fn test_reco_set_dimensions() {
        let binning = BinningConfig::new(&[0.0, 2.0, 8.0], false).unwrap();
        let set = RecoSparseSet::new(&binning);
        assert_eq!(set.main(RecoChannel::All).dim(), 7);
        assert_eq!(set.angle(RecoChannel::All).dim(), 4);
        let acc = AccSparseSet::new(&binning);
        assert_eq!(acc.main(AccChannel::FromC).dim(), 6);
        assert_eq!(acc.angle(AccChannel::FromC).dim(), 3);
    }
}
