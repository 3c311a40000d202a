use serde::{Deserialize, Serialize};

use crate::data::{Candidate, Track, TwoBody, Vertex};

/// Why a candidate was turned away. Every variant maps onto one counter in
/// [`SelectionCounters`]; none of them is an error.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rejection {
    /// A required sub-object was missing (null two-body daughter).
    MalformedInput,
    /// An unresolvable daughter track or a failed cheap pre-selection.
    Preselection,
    /// The cascade-filling step could not complete the derived quantities.
    RecoFill,
    /// The candidate's pT maps to no configured bin.
    OutOfPtRange,
    /// The combined cut-configuration predicate rejected the candidate.
    CutFailure,
    /// The classifier overwrote the cut verdict with a rejection.
    Classifier,
}

/// The selector's verdict: an accepted candidate carries the pT bin its cuts
/// were looked up in.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SelectionStatus {
    Accepted { pt_bin: usize },
    Rejected(Rejection),
}

/// The vertex-ownership obligation a call to [`select_candidate`] leaves
/// behind.
///
/// At most one obligation is outstanding per candidate, and it must be
/// resolved by the caller through exactly one [`VertexScope::release`] on
/// every exit path (acceptance or rejection) before the candidate is
/// discarded or reused.
#[derive(Clone, Debug, PartialEq)]
pub enum VertexScope {
    /// The selector never touched the vertex association.
    Untouched,
    /// The event primary vertex was lent to the two-body daughter; release
    /// clears the association.
    Borrowed,
    /// The primary vertex was recomputed; release restores the snapshot
    /// taken beforehand (`None` when the daughter had no vertex of its own).
    Recomputed(Option<Vertex>),
}

impl VertexScope {
    /// Resolve the obligation: clear a borrow, or restore the pre-recompute
    /// snapshot. Idempotence is not required — call exactly once.
    pub fn release(self, two_body: &mut TwoBody) {
        match self {
            VertexScope::Untouched => {}
            VertexScope::Borrowed => two_body.own_primary_vtx = None,
            VertexScope::Recomputed(snapshot) => two_body.own_primary_vtx = snapshot,
        }
    }
}

/// Per-candidate counters mirroring the conventional event-histogram bins of
/// heavy-flavor selection tasks. Append-only; a snapshot serializes cleanly
/// for run summaries.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionCounters {
    /// Candidates handed to the selector.
    pub candidates: u64,
    /// Rejected for a missing required sub-object.
    pub malformed: u64,
    /// Rejected by track resolution or the cheap pre-selection.
    pub not_preselected: u64,
    /// Rejected because the reconstruction fill failed.
    pub reco_fill_failed: u64,
    /// Survived the fill (pre-cut population).
    pub filtered: u64,
    /// Rejected for pT outside the configured bins.
    pub out_of_pt_range: u64,
    /// Rejected by the combined selection predicate.
    pub cut_rejected: u64,
    /// Rejected by the classifier gate.
    pub classifier_rejected: u64,
    /// Accepted by the full cascade, counted before any truth routing.
    pub selected: u64,
}

/// The externally owned cut configuration: pT binning, fiducial acceptance,
/// the named selection predicates, and the primary-vertex recomputation
/// policy. Implementations must be immutable for the duration of one event.
pub trait CutConfig {
    /// The pT bin edges, ascending, at least two entries.
    fn pt_bin_edges(&self) -> &[f64];

    /// Map a transverse momentum to its configured bin, or [`None`] outside
    /// the binning.
    fn pt_bin(&self, pt: f64) -> Option<usize> {
        let edges = self.pt_bin_edges();
        edges
            .windows(2)
            .position(|edge| pt >= edge[0] && pt < edge[1])
    }

    /// Whether the candidate kinematics fall inside the fiducial acceptance.
    fn is_in_fiducial_acceptance(&self, pt: f64, y: f64) -> bool;

    /// The cheap early predicate over resolved daughter tracks, designed to
    /// reject the bulk of the combinatorics before the full reconstruction.
    fn pre_select(&self, tracks: &[Track]) -> bool;

    /// The combined full selection over the reconstructed candidate.
    fn is_selected(&self, cand: &Candidate, two_body: &TwoBody) -> bool;

    /// Whether the primary vertex should be recomputed without the candidate
    /// daughters after the cut selection.
    fn recompute_primary_vertex(&self) -> bool {
        false
    }

    /// Attempt the recomputation, mutating the daughter's vertex
    /// association in place. Returns false on failure (the selector restores
    /// the previous association).
    fn recalc_own_primary_vtx(&self, _two_body: &mut TwoBody, _event_vtx: &Vertex) -> bool {
        false
    }

    /// Maximum |z| of the generated vertex for the acceptance fill.
    fn max_vtx_z(&self) -> f64 {
        10.0
    }
}

/// The reconstruction-utility seam: resolves daughter tracks and refills
/// derived candidate quantities dropped by input slimming.
pub trait RecoFiller {
    /// Resolve the detector track behind prong `idx` (0 = soft pion,
    /// 1–2 = the two-body prongs). [`None`] means the candidate is not
    /// pre-selectable.
    fn resolve_track(&self, cand: &Candidate, two_body: &TwoBody, idx: usize) -> Option<Track>;

    /// Complete the candidate's derived quantities (secondary-vertex refit
    /// and friends). Returns false when the refit fails.
    fn fill_cascade(&self, cand: &mut Candidate, two_body: &TwoBody) -> bool;
}

/// An optional pre-trained classifier whose binary verdict overwrites the
/// cut-based one.
pub trait Classifier {
    /// Score the candidate; `true` keeps it.
    fn select(&self, cand: &Candidate, two_body: &TwoBody, magnetic_field: f64) -> bool;
}

/// Evaluate the full selection cascade for one candidate.
///
/// The stages run in a fixed order with early exit; the first failing stage
/// determines the [`Rejection`] reason and later stages never run. The
/// returned [`VertexScope`] is the caller's obligation: it must be released
/// on this candidate's two-body daughter on every path, acceptance and
/// rejection alike.
#[allow(clippy::too_many_arguments)]
pub fn select_candidate(
    cand: &mut Candidate,
    two_body: Option<&mut TwoBody>,
    event_vtx: &Vertex,
    magnetic_field: f64,
    cuts: &dyn CutConfig,
    filler: &dyn RecoFiller,
    classifier: Option<&dyn Classifier>,
    counters: &mut SelectionCounters,
) -> (SelectionStatus, VertexScope) {
    counters.candidates += 1;

    // 1. null-safety: the only rejection treated as a logic error
    let Some(two_body) = two_body else {
        log::warn!("candidate without a two-body daughter, skipping");
        counters.malformed += 1;
        return (
            SelectionStatus::Rejected(Rejection::MalformedInput),
            VertexScope::Untouched,
        );
    };

    // 2.-3. resolve the three daughter tracks, then the cheap pre-selection
    let mut tracks = Vec::with_capacity(3);
    for idx in 0..3 {
        match filler.resolve_track(cand, two_body, idx) {
            Some(track) => tracks.push(track),
            None => {
                counters.not_preselected += 1;
                return (
                    SelectionStatus::Rejected(Rejection::Preselection),
                    VertexScope::Untouched,
                );
            }
        }
    }
    if !cuts.pre_select(&tracks) {
        counters.not_preselected += 1;
        return (
            SelectionStatus::Rejected(Rejection::Preselection),
            VertexScope::Untouched,
        );
    }

    // 4. complete the derived quantities
    if !filler.fill_cascade(cand, two_body) {
        counters.reco_fill_failed += 1;
        return (
            SelectionStatus::Rejected(Rejection::RecoFill),
            VertexScope::Untouched,
        );
    }
    counters.filtered += 1;

    // 5. lend the event primary vertex if the daughter has none of its own
    let mut scope = VertexScope::Untouched;
    if two_body.own_primary_vtx.is_none() {
        two_body.own_primary_vtx = Some(event_vtx.clone());
        scope = VertexScope::Borrowed;
    }

    // 6. pT-bin lookup
    let Some(pt_bin) = cuts.pt_bin(cand.pt()) else {
        counters.out_of_pt_range += 1;
        return (SelectionStatus::Rejected(Rejection::OutOfPtRange), scope);
    };

    // 7. combined cut selection
    if !cuts.is_selected(cand, two_body) {
        counters.cut_rejected += 1;
        return (SelectionStatus::Rejected(Rejection::CutFailure), scope);
    }

    // 8. optional vertex recomputation with snapshot/restore
    if cuts.recompute_primary_vertex() {
        let before = two_body.own_primary_vtx.clone();
        if cuts.recalc_own_primary_vtx(two_body, event_vtx) {
            // a borrow that got recomputed resolves into a single
            // restore-to-unset obligation
            let snapshot = match scope {
                VertexScope::Borrowed => None,
                _ => before,
            };
            scope = VertexScope::Recomputed(snapshot);
        } else {
            two_body.own_primary_vtx = before;
        }
    }

    // 9. optional classifier gate overwrites the cut verdict
    if let Some(classifier) = classifier {
        if !classifier.select(cand, two_body, magnetic_field) {
            counters.classifier_rejected += 1;
            return (SelectionStatus::Rejected(Rejection::Classifier), scope);
        }
    }

    counters.selected += 1;
    (SelectionStatus::Accepted { pt_bin }, scope)
}

/// A reference cut configuration: pT binning, a symmetric rapidity fiducial
/// window, a minimum daughter-track pT, and a ΔM signal window.
///
/// Real analyses inject their own [`CutConfig`] with the full topological
/// selection; this one covers tests and simple hosts.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StandardCuts {
    /// Ascending pT bin edges in GeV/c.
    pub pt_edges: Vec<f64>,
    /// Minimum pT of any daughter track.
    pub min_track_pt: f64,
    /// Half-width of the rapidity fiducial window.
    pub max_abs_y: f64,
    /// Accepted ΔM window in GeV/c².
    pub delta_mass_window: (f64, f64),
    /// Whether to ask for primary-vertex recomputation.
    pub recompute_vertex: bool,
    /// Maximum |z| of the generated primary vertex, in cm.
    pub max_vtx_z: f64,
}

impl Default for StandardCuts {
    fn default() -> Self {
        Self {
            pt_edges: vec![0.0, 1.0, 2.0, 4.0, 6.0, 8.0, 12.0, 16.0, 24.0, 36.0],
            min_track_pt: 0.1,
            max_abs_y: 0.8,
            delta_mass_window: (0.138, 0.160),
            recompute_vertex: false,
            max_vtx_z: 10.0,
        }
    }
}

impl CutConfig for StandardCuts {
    fn pt_bin_edges(&self) -> &[f64] {
        &self.pt_edges
    }

    fn is_in_fiducial_acceptance(&self, _pt: f64, y: f64) -> bool {
        y.abs() < self.max_abs_y
    }

    fn pre_select(&self, tracks: &[Track]) -> bool {
        tracks.iter().all(|t| t.p.pt() >= self.min_track_pt)
    }

    fn is_selected(&self, cand: &Candidate, _two_body: &TwoBody) -> bool {
        let (lo, hi) = self.delta_mass_window;
        cand.delta_inv_mass() >= lo && cand.delta_inv_mass() < hi
    }

    fn recompute_primary_vertex(&self) -> bool {
        self.recompute_vertex
    }

    fn max_vtx_z(&self) -> f64 {
        self.max_vtx_z
    }

    fn recalc_own_primary_vtx(&self, two_body: &mut TwoBody, event_vtx: &Vertex) -> bool {
        // reference behavior: refit succeeds whenever enough contributors
        // remain after removing the three daughters
        if event_vtx.n_contributors > 3 {
            two_body.own_primary_vtx = Some(Vertex {
                n_contributors: event_vtx.n_contributors - 3,
                ..event_vtx.clone()
            });
            true
        } else {
            false
        }
    }
}

/// A [`RecoFiller`] for hosts whose candidates already carry complete
/// kinematics: tracks resolve straight from the stored momenta and the fill
/// step only flips the `is_filled` flag.
#[derive(Copy, Clone, Debug, Default)]
pub struct PassthroughFiller;

impl RecoFiller for PassthroughFiller {
    fn resolve_track(&self, cand: &Candidate, two_body: &TwoBody, idx: usize) -> Option<Track> {
        let p = match idx {
            0 => cand.soft_p,
            1 | 2 => two_body.prongs[idx - 1],
            _ => return None,
        };
        Some(Track { p })
    }

    fn fill_cascade(&self, cand: &mut Candidate, _two_body: &TwoBody) -> bool {
        cand.is_filled = true;
        true
    }
}
