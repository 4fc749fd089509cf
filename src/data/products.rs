use std::fmt;
use std::fmt::Formatter;

use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};

use crate::data::candidates::{DiJet, DiLepDiJet, DiLepton, Jet, Lepton};

/// All arrays produced for one event, handed to the persistence collaborator.
///
/// Object pools (`leptons`, `sel_jets`, `di_leptons`, `di_jets`,
/// `di_lep_di_jets`) hold the reconstructed records; every other array is an
/// index view into one of those pools. Views keyed by a lepton-quality
/// combination have [`LeptonQuality::COUNT`] outer slots, views keyed by a
/// quality x b-tag working point combination have [`BtagCombination::COUNT`],
/// addressed through the respective `index()` mapping. An empty inner vector
/// means no candidate for that combination, which is a valid result.
///
/// [`LeptonQuality::COUNT`]: crate::data::quality::LeptonQuality
/// [`BtagCombination::COUNT`]: crate::data::quality::BtagCombination
#[derive(Clone, Debug, Default, Serialize, Deserialize, Encode, Decode)]
pub struct EventProducts {
    /// Isolated-lepton pool, electrons first, then muons, in source order.
    pub leptons: Vec<Lepton>,
    /// Per lepton: slot indices of the quality combinations it satisfies.
    pub leptons_id_iso: Vec<Vec<u16>>,
    /// Per lepton: matched online-object index, `None` when unmatched.
    pub hlt_matches: Vec<Option<u16>>,

    /// Lepton-pair pool.
    pub di_leptons: Vec<DiLepton>,
    /// Per pair: slot indices of the quality combinations both legs satisfy.
    pub di_leptons_id_iso: Vec<Vec<u16>>,

    /// Selected-jet pool (kinematic cuts plus global jet-lepton cleaning).
    pub sel_jets: Vec<Jet>,
    /// Per jet: bitmask of jet-identification tiers passed.
    pub sel_jets_sel_id: Vec<u16>,
    /// Pool indices of selected jets passing the medium b-tag working point.
    pub sel_b_jets_m: Vec<u16>,
    /// Per quality: cleaned jets passing the configured jet ID, pool order.
    pub sel_jets_sel_id_dr_cut: Vec<Vec<u16>>,
    /// Per quality x working point: b-tagged cleaned jets, pt descending.
    pub sel_b_jets_dr_cut_wp_pt_ordered: Vec<Vec<u16>>,
    /// Per quality x working point: b-tagged cleaned jets, discriminant
    /// descending.
    pub sel_b_jets_dr_cut_wp_btag_ordered: Vec<Vec<u16>>,

    /// Jet-pair pool.
    pub di_jets: Vec<DiJet>,
    /// Per quality: jet pairs with both legs cleaned under that quality.
    pub di_jets_dr_cut: Vec<Vec<u16>>,
    /// Per quality x working point: best b-jet pair, legs pt-ordered.
    pub di_b_jets_dr_cut_wp_pt_ordered: Vec<Vec<u16>>,
    /// Per quality x working point: best b-jet pair, legs discriminant-ordered.
    pub di_b_jets_dr_cut_wp_btag_ordered: Vec<Vec<u16>>,

    /// Quadruple pool (lepton pair + jet pair).
    pub di_lep_di_jets: Vec<DiLepDiJet>,
    /// Per quality: quadruples whose dilepton satisfies it, jets cleaned
    /// under the pair's governing quality.
    pub di_lep_di_jets_dr_cut: Vec<Vec<u16>>,
    /// Per quality x working point: quadruples with the best b-jet pair,
    /// legs pt-ordered.
    pub di_lep_di_b_jets_dr_cut_wp_pt_ordered: Vec<Vec<u16>>,
    /// Per quality x working point: quadruples with the best b-jet pair,
    /// legs discriminant-ordered.
    pub di_lep_di_b_jets_dr_cut_wp_btag_ordered: Vec<Vec<u16>>,
}

impl fmt::Display for EventProducts {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "EventProducts(leptons: {}, diLeptons: {}, selJets: {}, diJets: {}, diLepDiJets: {})",
            self.leptons.len(),
            self.di_leptons.len(),
            self.sel_jets.len(),
            self.di_jets.len(),
            self.di_lep_di_jets.len()
        )
    }
}
