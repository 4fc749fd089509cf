use tracing::debug;

use crate::data::candidates::Lepton;
use crate::data::event::TriggerCollection;
use crate::error::{Error, Result};

/// Memoized trigger-match state for one lepton.
///
/// The state is monotonic: once resolved it is never re-evaluated within the
/// event, and the cache never survives the event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MatchState {
    Unresolved,
    Resolved(Option<u16>),
}

/// Nearest-neighbour matcher between offline leptons and online trigger
/// objects.
///
/// A candidate online object must pass the configured deltaR and relative
/// |deltaPt|/pt ceilings; among the survivors the one at minimum deltaR wins,
/// with ties going to the first object seen in collection order. A missing
/// trigger collection, an event with no fired path, and an empty survivor
/// set all resolve to no-match, which is a normal condition.
#[derive(Clone, Debug)]
pub struct TriggerMatcher {
    dr_cut: f64,
    dpt_over_pt_cut: f64,
    states: Vec<MatchState>,
}

impl TriggerMatcher {
    /// Creates a matcher with one unresolved cache slot per lepton.
    ///
    /// # Arguments
    ///
    /// * `dr_cut` - maximum angular separation for a match candidate.
    /// * `dpt_over_pt_cut` - maximum relative transverse-momentum difference.
    /// * `lepton_count` - size of the lepton pool to be matched.
    pub fn new(dr_cut: f64, dpt_over_pt_cut: f64, lepton_count: usize) -> Self {
        TriggerMatcher {
            dr_cut,
            dpt_over_pt_cut,
            states: vec![MatchState::Unresolved; lepton_count],
        }
    }

    pub fn state(&self, lepton_index: usize) -> MatchState {
        self.states
            .get(lepton_index)
            .copied()
            .unwrap_or(MatchState::Unresolved)
    }

    /// Resolves the match for one lepton, memoizing the result.
    ///
    /// Repeated calls for the same lepton are O(1) and return the identical
    /// result.
    pub fn resolve(
        &mut self,
        lepton_index: usize,
        lepton: &Lepton,
        trigger: Option<&TriggerCollection>,
    ) -> Result<Option<u16>> {
        if lepton_index >= self.states.len() {
            return Err(Error::IndexOutOfRange {
                kind: "lepton",
                index: lepton_index,
                len: self.states.len(),
            });
        }
        if let MatchState::Resolved(matched) = self.states[lepton_index] {
            return Ok(matched);
        }

        let matched = match trigger {
            None => None,
            Some(collection) if collection.paths.is_empty() => None,
            Some(collection) => self.scan(lepton, collection),
        };

        self.states[lepton_index] = MatchState::Resolved(matched);
        Ok(matched)
    }

    /// Resolves every lepton in pool order and returns the per-lepton
    /// results.
    pub fn resolve_all(
        &mut self,
        leptons: &[Lepton],
        trigger: Option<&TriggerCollection>,
    ) -> Result<Vec<Option<u16>>> {
        let mut matches = Vec::with_capacity(leptons.len());
        for (index, lepton) in leptons.iter().enumerate() {
            matches.push(self.resolve(index, lepton, trigger)?);
        }
        debug!(
            matched = matches.iter().filter(|m| m.is_some()).count(),
            total = matches.len(),
            "trigger matching done"
        );
        Ok(matches)
    }

    fn scan(&self, lepton: &Lepton, collection: &TriggerCollection) -> Option<u16> {
        let mut min_dr = f64::MAX;
        let mut best = None;

        for (index, object_p4) in collection.object_p4.iter().enumerate() {
            let dr = lepton.p4.delta_r(object_p4);
            let dpt_over_pt = (lepton.p4.pt - object_p4.pt).abs() / lepton.p4.pt;

            if dr > self.dr_cut || dpt_over_pt > self.dpt_over_pt_cut {
                continue;
            }
            if dr < min_dr {
                min_dr = dr;
                best = Some(index as u16);
            }
        }

        best
    }
}
