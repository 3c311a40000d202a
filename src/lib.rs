//! # dstar-pol
//!
//! A per-candidate selection-and-kinematics pipeline for D*+ polarization
//! analyses. Given a reconstructed D* → D0 π decay hypothesis and its daughter
//! tracks, the crate decides whether the candidate passes a cascade of
//! quality cuts (optionally including a machine-learned classifier), computes
//! a fixed set of invariant kinematic and angular observables in the mother's
//! rest frame, and deposits them into multi-dimensional sparse histograms
//! partitioned by truth-level origin (prompt / feed-down / background).
//!
//! The host analysis framework owns event I/O and scheduling; this crate only
//! consumes per-event candidate lists and a handful of injected collaborators
//! (a [`CutConfig`], a [`RecoFiller`], an optional [`Classifier`], and an
//! optional [`TruthMatcher`]) and exposes [`Analysis::process_event`] as its
//! entry point.
#![warn(clippy::perf, clippy::style)]

use thiserror::Error;

/// Candidate, daughter, vertex, and truth-record data structures.
pub mod data;
/// The per-event driver which ties the selector, the angular transform, and
/// the deposit router together.
pub mod event;
/// Sparse n-dimensional histograms and the channel deposit router.
pub mod router;
/// The candidate selection cascade and its collaborator seams.
pub mod selection;
/// Utility functions, enums, vectors, and the angular transform.
pub mod utils;

pub use crate::data::{
    Candidate, EventRecord, GenParticle, LabelMatcher, MassTable, McHeader, Track, TruthMatcher,
    TruthRecord, TwoBody, Vertex,
};
pub use crate::event::{Analysis, AnalysisConfig, Counters};
pub use crate::router::{
    AccSparseSet, Axis, BinningConfig, GenObservables, RecoObservables, RecoSparseSet, SparseHist,
    TruthStatus,
};
pub use crate::selection::{
    select_candidate, Classifier, CutConfig, PassthroughFiller, RecoFiller, Rejection,
    SelectionCounters, SelectionStatus, StandardCuts, VertexScope,
};
pub use crate::utils::enums::{AccChannel, Origin, RecoChannel};
pub use crate::utils::variables::{polarization_observables, AngularObservables};
pub use crate::utils::vectors::{Vec3, Vec4};

pub type DstarPolResult<T> = Result<T, DstarPolError>;

/// The error type used by all `dstar-pol` internal methods.
///
/// Selection rejections are deliberately *not* errors; they are routing
/// outcomes tracked through [`SelectionCounters`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DstarPolError {
    /// A zero or negative denominator in the angular transform. Candidates
    /// are expected to carry strictly positive transverse and total momentum;
    /// violating that precondition is reported here instead of propagating
    /// NaN into the histograms.
    #[error("degenerate momentum in angular transform: {quantity} = {value}")]
    DegenerateMomentum {
        /// The quantity which was found to be non-positive.
        quantity: &'static str,
        /// Its offending value.
        value: f64,
    },
    /// A coordinate vector whose length does not match the histogram
    /// dimensionality.
    #[error("histogram fill expected {expected} coordinates but got {got}")]
    DimensionMismatch {
        /// The number of axes of the histogram.
        expected: usize,
        /// The number of coordinates supplied.
        got: usize,
    },
    /// A pT binning with fewer than two edges or non-ascending edges.
    #[error("invalid pT binning: {reason}")]
    InvalidBinning {
        /// What was wrong with the supplied edges.
        reason: String,
    },
    /// A particle mass required by the kinematic transform is missing from
    /// the injected [`MassTable`].
    #[error("no mass entry for PDG code {pdg} in the injected mass table")]
    MissingMass {
        /// The PDG code which failed lookup.
        pdg: i32,
    },
    /// An error which occurs when the user tries to parse an invalid string
    /// of text, typically into an enum variant.
    #[error("Failed to parse string: \"{name}\" does not correspond to a valid \"{object}\"!")]
    ParseError {
        /// The string which was parsed.
        name: String,
        /// The name of the object it failed to parse into.
        object: String,
    },
}
