//! Phase descriptions and the read-only views handed to other components.

use tf_core::SegmentId;

/// One signal phase as written in a scenario file.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PhaseSpec {
    pub label: String,
    /// Approaches that have green during this phase.
    pub green: Vec<SegmentId>,
    /// Green time for fixed controllers.  Ignored by adaptive ones.
    #[cfg_attr(feature = "serde", serde(default))]
    pub duration_ticks: u64,
}

impl PhaseSpec {
    pub fn new(label: impl Into<String>, green: Vec<SegmentId>, duration_ticks: u64) -> Self {
        let mut phase = Self { label: label.into(), green, duration_ticks };
        phase.normalise();
        phase
    }

    /// Sort and dedup `green`; lookups binary-search it.
    pub(crate) fn normalise(&mut self) {
        self.green.sort_unstable();
        self.green.dedup();
    }

    /// `true` if some approach green here is red in `next`.
    pub(crate) fn loses_green_to(&self, next: &PhaseSpec) -> bool {
        self.green.iter().any(|s| next.green.binary_search(s).is_err())
    }
}

/// Signal state seen from one approach.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SignalState {
    Green,
    Red,
    /// No controller at this junction.
    Uncontrolled,
}

impl SignalState {
    #[inline]
    pub fn may_proceed(self) -> bool {
        !matches!(self, SignalState::Red)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SignalState::Green        => "green",
            SignalState::Red          => "red",
            SignalState::Uncontrolled => "uncontrolled",
        }
    }
}

/// The approaches allowed to proceed at one junction and tick.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Allowed<'a> {
    /// Uncontrolled junction.
    All,
    /// Sorted green approaches; empty during all-red clearance.
    Only(&'a [SegmentId]),
}

impl Allowed<'_> {
    #[inline]
    pub fn contains(&self, approach: SegmentId) -> bool {
        match self {
            Allowed::All => true,
            Allowed::Only(green) => green.binary_search(&approach).is_ok(),
        }
    }
}

/// Snapshot of a controlled junction's current phase, for output and
/// observation.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SignalPhase {
    /// `None` during all-red clearance.
    pub label:     Option<String>,
    pub green:     Vec<SegmentId>,
    pub clearance: bool,
}
