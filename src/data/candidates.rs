use std::fmt;
use std::fmt::Formatter;

use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};

use crate::data::kinematics::FourMomentum;
use crate::data::quality::{BtagWp, IdTier, IsoTier, JetIdTier, LeptonQuality};

/// A selected lepton (electron or muon) after the kinematic cuts.
///
/// Immutable after construction; the trigger-match state lives in the
/// matcher's cache, not on the record.
#[derive(Clone, Debug, Serialize, Deserialize, Encode, Decode)]
pub struct Lepton {
    pub p4: FourMomentum,
    /// Index into the source electron or muon collection.
    pub idx: u16,
    pub charge: i8,
    pub is_electron: bool,
    pub is_muon: bool,
    pub id_veto: bool,
    pub id_loose: bool,
    pub id_medium: bool,
    pub id_tight: bool,
    pub isolation: f64,
    pub iso_loose: bool,
    pub iso_tight: bool,
}

impl Lepton {
    pub fn passes_id(&self, tier: IdTier) -> bool {
        match tier {
            IdTier::Veto => self.id_veto,
            IdTier::Loose => self.id_loose,
            IdTier::Medium => self.id_medium,
            IdTier::Tight => self.id_tight,
        }
    }

    /// Electrons carry no separate isolation cut (their identification
    /// working points already fold isolation in), so they satisfy every
    /// isolation tier. Muons use the pre-resolved booleans.
    pub fn passes_iso(&self, tier: IsoTier) -> bool {
        if self.is_electron {
            return true;
        }
        match tier {
            IsoTier::Loose => self.iso_loose,
            IsoTier::Tight => self.iso_tight,
        }
    }

    pub fn passes(&self, quality: &LeptonQuality) -> bool {
        self.passes_id(quality.id) && self.passes_iso(quality.iso)
    }

    /// Tightest quality combination this lepton satisfies, if any.
    pub fn best_quality(&self) -> Option<LeptonQuality> {
        let id = IdTier::all().into_iter().rev().find(|&t| self.passes_id(t))?;
        let iso = IsoTier::all().into_iter().rev().find(|&t| self.passes_iso(t))?;
        Some(LeptonQuality::new(id, iso))
    }
}

impl fmt::Display for Lepton {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let flavour = if self.is_electron { "e" } else { "mu" };
        write!(
            f,
            "Lepton({}, pt: {}, eta: {}, charge: {})",
            flavour, self.p4.pt, self.p4.eta, self.charge
        )
    }
}

/// A selected jet after kinematic cuts and jet-lepton cleaning.
#[derive(Clone, Debug, Serialize, Deserialize, Encode, Decode)]
pub struct Jet {
    pub p4: FourMomentum,
    /// Index into the source jet collection.
    pub idx: u16,
    pub is_id_loose: bool,
    pub is_id_tight: bool,
    pub is_id_tight_lepton_veto: bool,
    /// B-tag discriminant value.
    pub btag: f64,
    pub is_wp_loose: bool,
    pub is_wp_medium: bool,
    pub is_wp_tight: bool,
    /// Minimum angular separation to any lepton in the union of the
    /// isolated and veto-eligible pools.
    pub min_dr_jl: f64,
}

impl Jet {
    pub fn passes_id(&self, tier: JetIdTier) -> bool {
        match tier {
            JetIdTier::Loose => self.is_id_loose,
            JetIdTier::Tight => self.is_id_tight,
            JetIdTier::TightLeptonVeto => self.is_id_tight_lepton_veto,
        }
    }

    pub fn passes_wp(&self, wp: BtagWp) -> bool {
        match wp {
            BtagWp::Loose => self.is_wp_loose,
            BtagWp::Medium => self.is_wp_medium,
            BtagWp::Tight => self.is_wp_tight,
        }
    }

    /// Bitmask of identification tiers passed (loose = 1, tight = 2,
    /// tight-lepton-veto = 4).
    pub fn id_bitmask(&self) -> u16 {
        (self.is_id_loose as u16)
            | (self.is_id_tight as u16) << 1
            | (self.is_id_tight_lepton_veto as u16) << 2
    }
}

impl fmt::Display for Jet {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Jet(pt: {}, eta: {}, btag: {}, minDRjl: {})",
            self.p4.pt, self.p4.eta, self.btag, self.min_dr_jl
        )
    }
}

/// A lepton pair with derived flavour and charge flags.
///
/// Holds copies of both legs plus their positions in the lepton pool.
#[derive(Clone, Debug, Serialize, Deserialize, Encode, Decode)]
pub struct DiLepton {
    pub idx1: u16,
    pub idx2: u16,
    pub lepton1: Lepton,
    pub lepton2: Lepton,
    pub is_elel: bool,
    pub is_elmu: bool,
    pub is_muel: bool,
    pub is_mumu: bool,
    /// Opposite-sign charges.
    pub is_os: bool,
    /// Same flavour (ee or mumu).
    pub is_sf: bool,
}

impl DiLepton {
    /// Builds a lepton pair; derives the flags by boolean combination of the
    /// inputs and performs no re-validation of kinematic cuts.
    ///
    /// # Arguments
    ///
    /// * `idx1`, `lepton1` - pool position and record of the first leg.
    /// * `idx2`, `lepton2` - pool position and record of the second leg.
    pub fn new(idx1: u16, lepton1: &Lepton, idx2: u16, lepton2: &Lepton) -> Self {
        DiLepton {
            idx1,
            idx2,
            lepton1: lepton1.clone(),
            lepton2: lepton2.clone(),
            is_elel: lepton1.is_electron && lepton2.is_electron,
            is_elmu: lepton1.is_electron && lepton2.is_muon,
            is_muel: lepton1.is_muon && lepton2.is_electron,
            is_mumu: lepton1.is_muon && lepton2.is_muon,
            is_os: lepton1.charge != lepton2.charge,
            is_sf: (lepton1.is_electron && lepton2.is_electron)
                || (lepton1.is_muon && lepton2.is_muon),
        }
    }

    /// A pair satisfies a quality combination when both legs do.
    pub fn passes(&self, quality: &LeptonQuality) -> bool {
        self.lepton1.passes(quality) && self.lepton2.passes(quality)
    }

    /// Governing quality of the pair: the meet of the legs' tightest
    /// combinations, i.e. the weaker of the two legs.
    pub fn governing_quality(&self) -> Option<LeptonQuality> {
        let q1 = self.lepton1.best_quality()?;
        let q2 = self.lepton2.best_quality()?;
        Some(q1.meet(&q2))
    }

    /// The legs by descending pt, pool position as tie-break. The stored
    /// leg order is pool order, which need not be pt order across flavours.
    pub fn pt_ordered_legs(&self) -> (&Lepton, &Lepton) {
        if self.lepton2.p4.pt > self.lepton1.p4.pt {
            (&self.lepton2, &self.lepton1)
        } else {
            (&self.lepton1, &self.lepton2)
        }
    }
}

impl fmt::Display for DiLepton {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let flavour = match (self.is_elel, self.is_elmu, self.is_muel, self.is_mumu) {
            (true, _, _, _) => "ee",
            (_, true, _, _) => "emu",
            (_, _, true, _) => "mue",
            _ => "mumu",
        };
        write!(f, "DiLepton({}, os: {}, legs: [{}, {}])", flavour, self.is_os, self.idx1, self.idx2)
    }
}

/// A jet pair. Leg order is fixed at construction, reflecting the ordering
/// rule under which the pair was selected.
#[derive(Clone, Debug, Serialize, Deserialize, Encode, Decode)]
pub struct DiJet {
    pub idx1: u16,
    pub idx2: u16,
    pub jet1: Jet,
    pub jet2: Jet,
}

impl DiJet {
    pub fn new(idx1: u16, jet1: &Jet, idx2: u16, jet2: &Jet) -> Self {
        DiJet {
            idx1,
            idx2,
            jet1: jet1.clone(),
            jet2: jet2.clone(),
        }
    }
}

impl fmt::Display for DiJet {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "DiJet(legs: [{}, {}])", self.idx1, self.idx2)
    }
}

/// An event-level candidate: one lepton pair and one jet pair, with the
/// elementwise extrema of the four lepton-jet leg separations.
#[derive(Clone, Debug, Serialize, Deserialize, Encode, Decode)]
pub struct DiLepDiJet {
    /// Index into the dilepton pool.
    pub di_lepton_idx: u16,
    /// Index into the dijet pool.
    pub di_jet_idx: u16,
    pub min_dr_jl: f64,
    pub max_dr_jl: f64,
    pub min_deta_jl: f64,
    pub max_deta_jl: f64,
    pub min_dphi_jl: f64,
    pub max_dphi_jl: f64,
}

impl DiLepDiJet {
    /// Builds a quadruple candidate from a lepton pair and a jet pair.
    ///
    /// Evaluates deltaR, deltaEta and deltaPhi for the four lepton-jet leg
    /// combinations and stores the minimum and maximum of each metric.
    pub fn new(di_lepton_idx: u16, di_lepton: &DiLepton, di_jet_idx: u16, di_jet: &DiJet) -> Self {
        let leptons = [&di_lepton.lepton1.p4, &di_lepton.lepton2.p4];
        let jets = [&di_jet.jet1.p4, &di_jet.jet2.p4];

        let mut min_dr = f64::MAX;
        let mut max_dr = f64::MIN;
        let mut min_deta = f64::MAX;
        let mut max_deta = f64::MIN;
        let mut min_dphi = f64::MAX;
        let mut max_dphi = f64::MIN;

        for lepton in leptons {
            for jet in jets {
                let dr = lepton.delta_r(jet);
                let deta = lepton.delta_eta(jet);
                let dphi = lepton.delta_phi(jet);
                min_dr = min_dr.min(dr);
                max_dr = max_dr.max(dr);
                min_deta = min_deta.min(deta);
                max_deta = max_deta.max(deta);
                min_dphi = min_dphi.min(dphi);
                max_dphi = max_dphi.max(dphi);
            }
        }

        DiLepDiJet {
            di_lepton_idx,
            di_jet_idx,
            min_dr_jl: min_dr,
            max_dr_jl: max_dr,
            min_deta_jl: min_deta,
            max_deta_jl: max_deta,
            min_dphi_jl: min_dphi,
            max_dphi_jl: max_dphi,
        }
    }
}

impl fmt::Display for DiLepDiJet {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "DiLepDiJet(dilepton: {}, dijet: {}, minDRjl: {})",
            self.di_lepton_idx, self.di_jet_idx, self.min_dr_jl
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lepton(is_electron: bool, pt: f64, eta: f64, phi: f64, charge: i8) -> Lepton {
        Lepton {
            p4: FourMomentum::new(pt, eta, phi, pt * eta.cosh()),
            idx: 0,
            charge,
            is_electron,
            is_muon: !is_electron,
            id_veto: true,
            id_loose: true,
            id_medium: false,
            id_tight: false,
            isolation: 0.1,
            iso_loose: true,
            iso_tight: false,
        }
    }

    fn jet(pt: f64, eta: f64, phi: f64, btag: f64) -> Jet {
        Jet {
            p4: FourMomentum::new(pt, eta, phi, pt * eta.cosh()),
            idx: 0,
            is_id_loose: true,
            is_id_tight: true,
            is_id_tight_lepton_veto: false,
            btag,
            is_wp_loose: btag > 0.605,
            is_wp_medium: btag > 0.89,
            is_wp_tight: btag > 0.97,
            min_dr_jl: 1.0,
        }
    }

    #[test]
    fn test_dilepton_flavour_and_charge_flags() {
        let el = lepton(true, 50.0, 0.1, 0.0, -1);
        let mu = lepton(false, 40.0, -0.3, 1.0, 1);
        let pair = DiLepton::new(0, &el, 1, &mu);
        assert!(pair.is_elmu);
        assert!(!pair.is_elel && !pair.is_muel && !pair.is_mumu);
        assert!(pair.is_os);
        assert!(!pair.is_sf);
    }

    #[test]
    fn test_governing_quality_is_weaker_leg() {
        let mut el = lepton(true, 50.0, 0.1, 0.0, -1);
        el.id_medium = true;
        el.id_tight = true;
        let mu = lepton(false, 40.0, -0.3, 1.0, 1);
        let pair = DiLepton::new(0, &el, 1, &mu);
        // electron is (tight, iso-tight), muon only (loose, iso-loose)
        let governing = pair.governing_quality().unwrap();
        assert_eq!(governing, LeptonQuality::new(IdTier::Loose, IsoTier::Loose));
    }

    #[test]
    fn test_pt_ordered_legs() {
        let el = lepton(true, 40.0, 0.1, 0.0, -1);
        let mu = lepton(false, 50.0, -0.3, 1.0, 1);
        // stored in pool order (electron first) with the softer leg leading
        let pair = DiLepton::new(0, &el, 1, &mu);
        let (lead, trail) = pair.pt_ordered_legs();
        assert!(lead.is_muon);
        assert!(trail.is_electron);
        assert!(lead.p4.pt >= trail.p4.pt);

        // equal pt keeps pool order
        let el2 = lepton(true, 50.0, 0.5, 2.0, 1);
        let tie = DiLepton::new(0, &mu, 1, &el2);
        let (lead, _) = tie.pt_ordered_legs();
        assert!(lead.is_muon);
    }

    #[test]
    fn test_quadruple_extrema_round_trip() {
        let l1 = lepton(true, 50.0, 0.1, 0.0, -1);
        let l2 = lepton(false, 40.0, -0.3, 2.0, 1);
        let j1 = jet(60.0, 1.0, -1.5, 0.95);
        let j2 = jet(55.0, -1.2, 0.7, 0.5);
        let pair = DiLepton::new(0, &l1, 1, &l2);
        let dijet = DiJet::new(0, &j1, 1, &j2);
        let quad = DiLepDiJet::new(0, &pair, 0, &dijet);

        let mut drs = vec![];
        for lepton in [&l1.p4, &l2.p4] {
            for jet in [&j1.p4, &j2.p4] {
                drs.push(lepton.delta_r(jet));
            }
        }
        let min = drs.iter().cloned().fold(f64::MAX, f64::min);
        let max = drs.iter().cloned().fold(f64::MIN, f64::max);
        assert_eq!(quad.min_dr_jl, min);
        assert_eq!(quad.max_dr_jl, max);
        assert!(quad.min_dr_jl <= quad.max_dr_jl);
        assert!(quad.min_deta_jl <= quad.max_deta_jl);
        assert!(quad.min_dphi_jl <= quad.max_dphi_jl);
    }

    #[test]
    fn test_jet_id_bitmask() {
        let j = jet(40.0, 0.0, 0.0, 0.3);
        assert_eq!(j.id_bitmask(), 0b011);
    }
}
