use tracing::debug;

use crate::config::ResolvedConfig;
use crate::data::candidates::{Jet, Lepton};
use crate::data::event::{ElectronCollection, JetCollection, MuonCollection};
use crate::data::quality::{IdTier, JetIdTier};
use crate::error::Result;

/// Per-event lepton pools filled by the object builders.
///
/// Every accepted lepton lands in exactly one of the two pools; objects
/// failing even the veto-tier criteria are discarded.
#[derive(Clone, Debug, Default)]
pub struct LeptonPools {
    /// Leptons passing the loose identification (and, for muons, the loose
    /// isolation cut). These are the analysis leptons.
    pub isolated: Vec<Lepton>,
    /// Leptons good enough only for vetoing: veto-tier electrons, loose
    /// muons failing the loose isolation cut.
    pub veto_eligible: Vec<Lepton>,
}

impl LeptonPools {
    /// Iterates the union of both pools, isolated first.
    pub fn union(&self) -> impl Iterator<Item = &Lepton> {
        self.isolated.iter().chain(self.veto_eligible.iter())
    }
}

/// Builds the per-event lepton pools from the raw electron and muon
/// collections, electrons first, preserving source order within each
/// flavour.
///
/// Electrons are routed by named identification working points: an object
/// passing the loose working point goes to the isolated pool, one passing
/// only the veto working point to the veto-eligible pool, anything else is
/// discarded. An unknown working-point name aborts the event. Muons are
/// routed by the loose identification flag combined with the configured
/// loose relative-isolation cut; both isolation booleans are pre-resolved
/// and stored on the record.
pub fn build_leptons(
    config: &ResolvedConfig,
    electrons: &ElectronCollection,
    muons: &MuonCollection,
) -> Result<LeptonPools> {
    let cuts = &config.selection;
    let mut pools = LeptonPools::default();

    for index in 0..electrons.len() {
        let p4 = electrons.p4[index];
        if p4.pt <= cuts.electron_pt_cut || p4.eta.abs() >= cuts.electron_eta_cut {
            continue;
        }

        let id_veto = electrons.id(index, &cuts.electron_veto_id_name)?;
        let id_loose = electrons.id(index, &cuts.electron_loose_id_name)?;
        let id_medium = electrons.id(index, &cuts.electron_medium_id_name)?;
        let id_tight = electrons.id(index, &cuts.electron_tight_id_name)?;

        let lepton = Lepton {
            p4,
            idx: index as u16,
            charge: electrons.charge[index],
            is_electron: true,
            is_muon: false,
            id_veto,
            id_loose,
            id_medium,
            id_tight,
            isolation: electrons.relative_isolation[index],
            // no isolation cut for electrons
            iso_loose: true,
            iso_tight: true,
        };

        if id_loose {
            pools.isolated.push(lepton);
        } else if id_veto {
            pools.veto_eligible.push(lepton);
        }
    }

    for index in 0..muons.len() {
        let p4 = muons.p4[index];
        if p4.pt <= cuts.muon_pt_cut || p4.eta.abs() >= cuts.muon_eta_cut {
            continue;
        }

        let isolation = muons.relative_isolation[index];
        let iso_loose = isolation < cuts.muon_loose_iso_cut;
        let iso_tight = isolation < cuts.muon_tight_iso_cut;
        let id_loose = muons.id(index, IdTier::Loose)?;

        let lepton = Lepton {
            p4,
            idx: index as u16,
            charge: muons.charge[index],
            is_electron: false,
            is_muon: true,
            // muons have no dedicated veto working point, reuse loose
            id_veto: id_loose,
            id_loose,
            id_medium: muons.id(index, IdTier::Medium)?,
            id_tight: muons.id(index, IdTier::Tight)?,
            isolation,
            iso_loose,
            iso_tight,
        };

        if id_loose && iso_loose {
            pools.isolated.push(lepton);
        } else if id_loose {
            pools.veto_eligible.push(lepton);
        }
    }

    debug!(
        isolated = pools.isolated.len(),
        veto_eligible = pools.veto_eligible.len(),
        "lepton pools built"
    );
    Ok(pools)
}

/// The selected-jet pool together with the medium-working-point
/// convenience view filled alongside it.
#[derive(Clone, Debug, Default)]
pub struct SelectedJets {
    pub jets: Vec<Jet>,
    /// Pool indices of selected jets passing the medium b-tag working point.
    pub medium_b: Vec<u16>,
}

/// Builds the selected-jet pool from the raw jet collection.
///
/// For each jet passing the kinematic cuts, looks up the configured b-tag
/// discriminant (unknown discriminant names abort the event), resolves the
/// three working-point flags and computes `min_dr_jl`, the minimum angular
/// separation to any lepton in the union of the isolated and veto-eligible
/// pools. Jets with `min_dr_jl` at or below the cleaning cut are dropped
/// from the pool and from every downstream view. Retained jets passing the
/// medium working point are additionally tracked in `medium_b`.
pub fn build_jets(
    config: &ResolvedConfig,
    jets: &JetCollection,
    pools: &LeptonPools,
) -> Result<SelectedJets> {
    let cuts = &config.selection;
    let mut selected = SelectedJets::default();

    for index in 0..jets.len() {
        let p4 = jets.p4[index];
        if p4.eta.abs() >= cuts.jet_eta_cut || p4.pt <= cuts.jet_pt_cut {
            continue;
        }

        let btag = jets.btag_discriminant(index, &cuts.btag_name)?;

        let min_dr_jl = pools
            .union()
            .map(|lepton| p4.delta_r(&lepton.p4))
            .fold(f64::MAX, f64::min);

        if min_dr_jl <= cuts.jet_dr_lepton_cut {
            continue;
        }

        let jet = Jet {
            p4,
            idx: index as u16,
            is_id_loose: jets.id(index, JetIdTier::Loose)?,
            is_id_tight: jets.id(index, JetIdTier::Tight)?,
            is_id_tight_lepton_veto: jets.id(index, JetIdTier::TightLeptonVeto)?,
            btag,
            is_wp_loose: btag > cuts.btag_loose_cut,
            is_wp_medium: btag > cuts.btag_medium_cut,
            is_wp_tight: btag > cuts.btag_tight_cut,
            min_dr_jl,
        };
        if jet.is_wp_medium {
            selected.medium_b.push(selected.jets.len() as u16);
        }
        selected.jets.push(jet);
    }

    debug!(
        selected = selected.jets.len(),
        medium_b = selected.medium_b.len(),
        "jet pool built"
    );
    Ok(selected)
}
