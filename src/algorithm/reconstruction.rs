use rayon::prelude::*;
use tracing::debug;

use crate::algorithm::combinatorics::CombinationEngine;
use crate::algorithm::selection::{build_jets, build_leptons};
use crate::algorithm::trigger::TriggerMatcher;
use crate::config::ResolvedConfig;
use crate::data::event::EventInput;
use crate::data::products::EventProducts;
use crate::error::Result;

/// Per-event reconstruction driver.
///
/// Owns the resolved configuration and nothing else; every call to
/// [`EventReconstructor::reconstruct`] creates all per-event state fresh and
/// discards it, so independent events can be processed by the same instance
/// from parallel workers.
#[derive(Clone, Debug)]
pub struct EventReconstructor {
    config: ResolvedConfig,
}

impl EventReconstructor {
    pub fn new(config: ResolvedConfig) -> Self {
        EventReconstructor { config }
    }

    pub fn config(&self) -> &ResolvedConfig {
        &self.config
    }

    /// Reconstructs one event: object builders, trigger matching, the
    /// combination index engine and the quadruple builder, in that order.
    ///
    /// Outputs are fully materialized before being returned; a fatal error
    /// (unknown working-point name, malformed input collection) aborts the
    /// event with no partial products. Data absence — no trigger collection,
    /// no surviving candidate for some combination — produces empty arrays
    /// and is not an error.
    pub fn reconstruct(&self, input: &EventInput) -> Result<EventProducts> {
        input.validate()?;

        let pools = build_leptons(&self.config, &input.electrons, &input.muons)?;
        let selected = build_jets(&self.config, &input.jets, &pools)?;

        let mut matcher = TriggerMatcher::new(
            self.config.selection.trigger_dr_cut,
            self.config.selection.trigger_dpt_over_pt_cut,
            pools.isolated.len(),
        );
        let hlt_matches = matcher.resolve_all(&pools.isolated, input.trigger.as_ref())?;

        let views = CombinationEngine::new(&self.config, &pools, &selected.jets, &hlt_matches).build();

        let sel_jets_sel_id = selected.jets.iter().map(|jet| jet.id_bitmask()).collect();

        let products = EventProducts {
            leptons: pools.isolated,
            leptons_id_iso: views.leptons_id_iso,
            hlt_matches,
            di_leptons: views.di_leptons,
            di_leptons_id_iso: views.di_leptons_id_iso,
            sel_jets: selected.jets,
            sel_jets_sel_id,
            sel_b_jets_m: selected.medium_b,
            sel_jets_sel_id_dr_cut: views.sel_jets_sel_id_dr_cut,
            sel_b_jets_dr_cut_wp_pt_ordered: views.sel_b_jets_dr_cut_wp_pt_ordered,
            sel_b_jets_dr_cut_wp_btag_ordered: views.sel_b_jets_dr_cut_wp_btag_ordered,
            di_jets: views.di_jets,
            di_jets_dr_cut: views.di_jets_dr_cut,
            di_b_jets_dr_cut_wp_pt_ordered: views.di_b_jets_dr_cut_wp_pt_ordered,
            di_b_jets_dr_cut_wp_btag_ordered: views.di_b_jets_dr_cut_wp_btag_ordered,
            di_lep_di_jets: views.di_lep_di_jets,
            di_lep_di_jets_dr_cut: views.di_lep_di_jets_dr_cut,
            di_lep_di_b_jets_dr_cut_wp_pt_ordered: views.di_lep_di_b_jets_dr_cut_wp_pt_ordered,
            di_lep_di_b_jets_dr_cut_wp_btag_ordered: views
                .di_lep_di_b_jets_dr_cut_wp_btag_ordered,
        };

        debug!(%products, "event reconstructed");
        Ok(products)
    }

    /// Reconstructs a batch of independent events in parallel.
    ///
    /// Each event is processed by the single-event path with no shared
    /// mutable state; the first fatal error aborts the batch.
    pub fn reconstruct_batch(&self, inputs: &[EventInput]) -> Result<Vec<EventProducts>> {
        inputs.par_iter().map(|input| self.reconstruct(input)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SelectionConfig;
    use crate::data::event::{
        ElectronCollection, JetCollection, MuonCollection, TriggerCollection,
    };
    use crate::data::kinematics::FourMomentum;
    use crate::data::quality::{BtagCombination, BtagWp, IdTier, IsoTier, LeptonQuality};
    use std::collections::HashMap;

    fn p4(pt: f64, eta: f64, phi: f64) -> FourMomentum {
        FourMomentum::new(pt, eta, phi, pt * eta.cosh())
    }

    fn btag_row(value: f64) -> HashMap<String, f64> {
        HashMap::from([(
            "pfCombinedInclusiveSecondaryVertexV2BJetTags".to_string(),
            value,
        )])
    }

    /// One electron at pt 50 passing loose but not tight ID, one muon at
    /// pt 40 passing tight ID and loose isolation, two clean jets at
    /// pt 60 (btag 0.95) and pt 55 (btag 0.5).
    fn scenario_input(with_trigger: bool) -> EventInput {
        let electrons = ElectronCollection {
            p4: vec![p4(50.0, 0.1, 0.0)],
            charge: vec![-1],
            ids: vec![HashMap::from([
                ("veto".to_string(), true),
                ("loose".to_string(), true),
                ("medium".to_string(), false),
                ("tight".to_string(), false),
            ])],
            relative_isolation: vec![0.03],
        };
        let muons = MuonCollection {
            p4: vec![p4(40.0, -0.3, 2.0)],
            charge: vec![1],
            is_loose: vec![true],
            is_medium: vec![true],
            is_tight: vec![true],
            relative_isolation: vec![0.1],
        };
        let jets = JetCollection {
            p4: vec![p4(60.0, 1.5, -1.5), p4(55.0, -1.2, 0.7)],
            pass_loose_id: vec![true, true],
            pass_tight_id: vec![true, true],
            pass_tight_lepton_veto_id: vec![false, false],
            btags: vec![btag_row(0.95), btag_row(0.5)],
        };
        let trigger = with_trigger.then(|| TriggerCollection {
            paths: vec!["HLT_TestPath_v1".to_string()],
            object_p4: vec![p4(50.5, 0.12, 0.01), p4(39.5, -0.29, 2.01)],
            object_pdg_id: vec![11, 13],
        });
        EventInput { electrons, muons, jets, trigger }
    }

    fn reconstructor() -> EventReconstructor {
        EventReconstructor::new(SelectionConfig::default().resolve().unwrap())
    }

    #[test]
    fn test_end_to_end_scenario() {
        let products = reconstructor().reconstruct(&scenario_input(true)).unwrap();

        // both leptons isolated
        assert_eq!(products.leptons.len(), 2);
        assert!(products.leptons[0].is_electron);
        assert!(products.leptons[1].is_muon);
        assert_eq!(products.hlt_matches, vec![Some(0), Some(1)]);

        // both jets clean and selected, only the first above the medium cut
        assert_eq!(products.sel_jets.len(), 2);
        for jet in &products.sel_jets {
            assert!(jet.min_dr_jl > 0.3);
        }
        assert_eq!(products.sel_b_jets_m, vec![0]);

        // highest-discriminant jet leads the btag-ordered view
        let combo = BtagCombination::new(
            LeptonQuality::new(IdTier::Loose, IsoTier::Loose),
            BtagWp::Medium,
        )
        .index();
        let btag_view = &products.sel_b_jets_dr_cut_wp_btag_ordered[combo];
        assert_eq!(btag_view.first(), Some(&0));
        assert_eq!(products.sel_jets[0].p4.pt, 60.0);

        // one dilepton, quadruples exist under its governing quality
        assert_eq!(products.di_leptons.len(), 1);
        let governing = products.di_leptons[0].governing_quality().unwrap();
        assert_eq!(governing, LeptonQuality::new(IdTier::Loose, IsoTier::Tight));
        assert!(!products.di_lep_di_jets.is_empty());
        assert!(!products.di_lep_di_jets_dr_cut[governing.index()].is_empty());
    }

    #[test]
    fn test_absent_trigger_collection_yields_no_quadruples() {
        let products = reconstructor().reconstruct(&scenario_input(false)).unwrap();

        assert_eq!(products.leptons.len(), 2);
        assert_eq!(products.hlt_matches, vec![None, None]);
        assert!(products.di_leptons.is_empty());
        assert!(products.di_lep_di_jets.is_empty());
        for quality in LeptonQuality::all() {
            assert!(products.di_lep_di_jets_dr_cut[quality.index()].is_empty());
        }
        // the jet-side arrays are unaffected by the missing trigger
        assert_eq!(products.sel_jets.len(), 2);
    }

    #[test]
    fn test_quadruple_extrema_round_trip() {
        let products = reconstructor().reconstruct(&scenario_input(true)).unwrap();
        for quad in &products.di_lep_di_jets {
            let pair = &products.di_leptons[quad.di_lepton_idx as usize];
            let dijet = &products.di_jets[quad.di_jet_idx as usize];
            let mut drs = vec![];
            for lepton in [&pair.lepton1.p4, &pair.lepton2.p4] {
                for jet in [&dijet.jet1.p4, &dijet.jet2.p4] {
                    drs.push(lepton.delta_r(jet));
                }
            }
            let min = drs.iter().cloned().fold(f64::MAX, f64::min);
            let max = drs.iter().cloned().fold(f64::MIN, f64::max);
            assert_eq!(quad.min_dr_jl, min);
            assert_eq!(quad.max_dr_jl, max);
        }
    }

    #[test]
    fn test_cleaning_is_global_across_quality_views() {
        // a single loose-only muon (fails medium/tight ID and tight iso)
        let muons = MuonCollection {
            p4: vec![p4(40.0, 0.0, 0.0)],
            charge: vec![1],
            is_loose: vec![true],
            is_medium: vec![false],
            is_tight: vec![false],
            relative_isolation: vec![0.15],
        };
        let jets = JetCollection {
            p4: vec![p4(60.0, 0.1, 0.1), p4(55.0, 1.5, 2.0)],
            pass_loose_id: vec![true, true],
            pass_tight_id: vec![true, true],
            pass_tight_lepton_veto_id: vec![false, false],
            btags: vec![btag_row(0.95), btag_row(0.5)],
        };
        let input = EventInput {
            electrons: ElectronCollection::default(),
            muons,
            jets,
            trigger: None,
        };
        let products = reconstructor().reconstruct(&input).unwrap();

        // the adjacent jet is dropped once, for every view, even for the
        // qualities the muon itself does not pass
        assert_eq!(products.sel_jets.len(), 1);
        assert_eq!(products.sel_jets[0].idx, 1);
        for quality in LeptonQuality::all() {
            assert_eq!(products.sel_jets_sel_id_dr_cut[quality.index()], vec![0]);
        }
    }

    #[test]
    fn test_fatal_error_produces_no_products() {
        let mut input = scenario_input(true);
        input.jets.btags[1].clear(); // second jet loses the configured discriminant
        let result = reconstructor().reconstruct(&input);
        assert!(result.is_err());
    }

    #[test]
    fn test_batch_matches_single_event_path() {
        let reconstructor = reconstructor();
        let inputs = vec![scenario_input(true), scenario_input(false)];
        let batch = reconstructor.reconstruct_batch(&inputs).unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0].di_leptons.len(), 1);
        assert!(batch[1].di_leptons.is_empty());

        let single = reconstructor.reconstruct(&inputs[0]).unwrap();
        assert_eq!(batch[0].sel_jets_sel_id_dr_cut, single.sel_jets_sel_id_dr_cut);
        assert_eq!(batch[0].hlt_matches, single.hlt_matches);
    }
}
