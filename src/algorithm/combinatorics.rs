use std::cmp::Reverse;
use std::collections::HashMap;

use itertools::Itertools;
use ordered_float::OrderedFloat;
use tracing::debug;

use crate::algorithm::selection::LeptonPools;
use crate::config::ResolvedConfig;
use crate::data::candidates::{DiJet, DiLepDiJet, DiLepton, Jet};
use crate::data::quality::{BtagCombination, BtagWp, JetOrdering, LeptonQuality};

/// Sorts a set of jet-pool indices under an explicit ordering strategy.
///
/// The order is strictly total: descending in the strategy's floating-point
/// key, with the pool index ascending as tie-break, so equal key values
/// resolve identically on every run.
///
/// # Arguments
///
/// * `jets` - the jet pool the indices point into.
/// * `candidates` - pool indices to order.
/// * `ordering` - the ordering strategy to apply.
///
/// # Examples
///
/// ```
/// use recomb::algorithm::combinatorics::ordered_jet_indices;
/// use recomb::data::candidates::Jet;
/// use recomb::data::kinematics::FourMomentum;
/// use recomb::data::quality::JetOrdering;
///
/// let jet = |pt: f64, btag: f64| Jet {
///     p4: FourMomentum::new(pt, 0.0, 0.0, pt),
///     idx: 0,
///     is_id_loose: true, is_id_tight: true, is_id_tight_lepton_veto: false,
///     btag,
///     is_wp_loose: false, is_wp_medium: false, is_wp_tight: false,
///     min_dr_jl: 1.0,
/// };
/// let pool = vec![jet(55.0, 0.95), jet(60.0, 0.5)];
/// let by_pt = ordered_jet_indices(&pool, &[0, 1], JetOrdering::PtDescending);
/// let by_btag = ordered_jet_indices(&pool, &[0, 1], JetOrdering::BtagDescending);
/// assert_eq!(by_pt, vec![1, 0]);
/// assert_eq!(by_btag, vec![0, 1]);
/// ```
pub fn ordered_jet_indices(jets: &[Jet], candidates: &[u16], ordering: JetOrdering) -> Vec<u16> {
    let mut indices = candidates.to_vec();
    match ordering {
        JetOrdering::PtDescending => {
            indices.sort_by_key(|&i| (Reverse(OrderedFloat(jets[i as usize].p4.pt)), i));
        }
        JetOrdering::BtagDescending => {
            indices.sort_by_key(|&i| (Reverse(OrderedFloat(jets[i as usize].btag)), i));
        }
    }
    indices
}

/// Every combination-keyed index view produced for one event.
///
/// Pools referenced by the views (`di_leptons`, `di_jets`, `di_lep_di_jets`)
/// are owned here and handed over to the event products unchanged.
#[derive(Clone, Debug, Default)]
pub struct CombinationViews {
    pub leptons_id_iso: Vec<Vec<u16>>,
    pub di_leptons: Vec<DiLepton>,
    pub di_leptons_id_iso: Vec<Vec<u16>>,
    pub sel_jets_sel_id_dr_cut: Vec<Vec<u16>>,
    pub sel_b_jets_dr_cut_wp_pt_ordered: Vec<Vec<u16>>,
    pub sel_b_jets_dr_cut_wp_btag_ordered: Vec<Vec<u16>>,
    pub di_jets: Vec<DiJet>,
    pub di_jets_dr_cut: Vec<Vec<u16>>,
    pub di_b_jets_dr_cut_wp_pt_ordered: Vec<Vec<u16>>,
    pub di_b_jets_dr_cut_wp_btag_ordered: Vec<Vec<u16>>,
    pub di_lep_di_jets: Vec<DiLepDiJet>,
    pub di_lep_di_jets_dr_cut: Vec<Vec<u16>>,
    pub di_lep_di_b_jets_dr_cut_wp_pt_ordered: Vec<Vec<u16>>,
    pub di_lep_di_b_jets_dr_cut_wp_btag_ordered: Vec<Vec<u16>>,
}

/// The combination index engine.
///
/// For every lepton-quality combination (and, where b-tagging enters, every
/// quality x working-point combination) the engine produces ordered index
/// views into the shared object pools. Objects are never copied into views,
/// only positions.
pub struct CombinationEngine<'a> {
    config: &'a ResolvedConfig,
    pools: &'a LeptonPools,
    jets: &'a [Jet],
    hlt_matches: &'a [Option<u16>],
}

impl<'a> CombinationEngine<'a> {
    /// # Arguments
    ///
    /// * `config` - resolved selection configuration.
    /// * `pools` - lepton pools from the object builders.
    /// * `jets` - selected-jet pool (already globally cleaned).
    /// * `hlt_matches` - per-isolated-lepton trigger-match results.
    pub fn new(
        config: &'a ResolvedConfig,
        pools: &'a LeptonPools,
        jets: &'a [Jet],
        hlt_matches: &'a [Option<u16>],
    ) -> Self {
        CombinationEngine { config, pools, jets, hlt_matches }
    }

    /// Runs the engine and materializes every view.
    pub fn build(&self) -> CombinationViews {
        let mut views = CombinationViews::default();

        let cleaned = self.build_jet_views(&mut views);
        self.build_di_jets(&cleaned, &mut views);
        self.build_di_leptons(&mut views);
        self.build_quadruples(&mut views);

        debug!(
            di_leptons = views.di_leptons.len(),
            di_jets = views.di_jets.len(),
            di_lep_di_jets = views.di_lep_di_jets.len(),
            "combination views built"
        );
        views
    }

    /// Per-lepton quality membership and the per-quality / per-combination
    /// jet views. Returns the per-quality cleaned-jet sets (pool order) for
    /// reuse by the pair stages.
    ///
    /// Jet-lepton cleaning happens once, globally, in the jet builder
    /// against the union of both lepton pools; the leptons passing any
    /// single quality are a subset of that union, so re-cleaning per quality
    /// could never drop another jet. Every quality slot therefore carries
    /// the same set: the pool jets passing the configured jet ID.
    fn build_jet_views(&self, views: &mut CombinationViews) -> Vec<Vec<u16>> {
        views.leptons_id_iso = self
            .pools
            .isolated
            .iter()
            .map(|lepton| {
                LeptonQuality::all()
                    .filter(|q| lepton.passes(q))
                    .map(|q| q.index() as u16)
                    .collect()
            })
            .collect();

        let set: Vec<u16> = self
            .jets
            .iter()
            .enumerate()
            .filter(|(_, jet)| jet.passes_id(self.config.jet_id))
            .map(|(slot, _)| slot as u16)
            .collect();
        let cleaned: Vec<Vec<u16>> = vec![set; LeptonQuality::COUNT];
        views.sel_jets_sel_id_dr_cut = cleaned.clone();

        for combo in BtagCombination::all() {
            let wp_jets: Vec<u16> = cleaned[combo.quality.index()]
                .iter()
                .copied()
                .filter(|&slot| self.jets[slot as usize].passes_wp(combo.wp))
                .collect();
            views
                .sel_b_jets_dr_cut_wp_pt_ordered
                .push(ordered_jet_indices(self.jets, &wp_jets, JetOrdering::PtDescending));
            views
                .sel_b_jets_dr_cut_wp_btag_ordered
                .push(ordered_jet_indices(self.jets, &wp_jets, JetOrdering::BtagDescending));
        }

        cleaned
    }

    /// Builds the shared jet-pair pool and its combination views.
    ///
    /// The base pool holds every unordered pair once, legs pt-ordered. Best
    /// b-jet pairs whose discriminant ordering disagrees with the pt
    /// ordering are interned as additional entries rather than copied.
    fn build_di_jets(&self, cleaned: &[Vec<u16>], views: &mut CombinationViews) {
        let mut slots: HashMap<(u16, u16), u16> = HashMap::new();

        let base_pairs: Vec<(u16, u16)> = (0..self.jets.len() as u16)
            .tuple_combinations()
            .map(|(a, b)| self.pt_ordered_legs(a, b))
            .collect();
        for &(first, second) in &base_pairs {
            Self::intern_di_jet(self.jets, &mut views.di_jets, &mut slots, first, second);
        }
        let base_count = views.di_jets.len();

        for quality_cleaned in cleaned {
            let members: Vec<bool> = {
                let mut mask = vec![false; self.jets.len()];
                for &slot in quality_cleaned {
                    mask[slot as usize] = true;
                }
                mask
            };
            let view: Vec<u16> = (0..base_count as u16)
                .filter(|&slot| {
                    let pair = &views.di_jets[slot as usize];
                    members[pair.idx1 as usize] && members[pair.idx2 as usize]
                })
                .collect();
            views.di_jets_dr_cut.push(view);
        }

        for combo in BtagCombination::all() {
            match self.best_b_pair(&cleaned[combo.quality.index()], combo.wp) {
                Some((x, y)) => {
                    // selection order is discriminant-descending
                    let (pt_first, pt_second) = self.pt_ordered_legs(x, y);
                    let pt_slot = Self::intern_di_jet(
                        self.jets,
                        &mut views.di_jets,
                        &mut slots,
                        pt_first,
                        pt_second,
                    );
                    let btag_slot =
                        Self::intern_di_jet(self.jets, &mut views.di_jets, &mut slots, x, y);
                    views.di_b_jets_dr_cut_wp_pt_ordered.push(vec![pt_slot]);
                    views.di_b_jets_dr_cut_wp_btag_ordered.push(vec![btag_slot]);
                }
                None => {
                    views.di_b_jets_dr_cut_wp_pt_ordered.push(Vec::new());
                    views.di_b_jets_dr_cut_wp_btag_ordered.push(Vec::new());
                }
            }
        }
    }

    /// The two highest-discriminant jets among a cleaned set passing a
    /// working point: discriminant descending, pt descending as secondary
    /// key, pool index as final tie-break. Returns the legs in that order.
    fn best_b_pair(&self, cleaned: &[u16], wp: BtagWp) -> Option<(u16, u16)> {
        let mut candidates: Vec<u16> = cleaned
            .iter()
            .copied()
            .filter(|&slot| self.jets[slot as usize].passes_wp(wp))
            .collect();
        if candidates.len() < 2 {
            return None;
        }
        candidates.sort_by_key(|&i| {
            let jet = &self.jets[i as usize];
            (Reverse(OrderedFloat(jet.btag)), Reverse(OrderedFloat(jet.p4.pt)), i)
        });
        Some((candidates[0], candidates[1]))
    }

    fn pt_ordered_legs(&self, a: u16, b: u16) -> (u16, u16) {
        let key = |i: u16| (Reverse(OrderedFloat(self.jets[i as usize].p4.pt)), i);
        if key(a) <= key(b) {
            (a, b)
        } else {
            (b, a)
        }
    }

    fn intern_di_jet(
        jets: &[Jet],
        pool: &mut Vec<DiJet>,
        slots: &mut HashMap<(u16, u16), u16>,
        first: u16,
        second: u16,
    ) -> u16 {
        *slots.entry((first, second)).or_insert_with(|| {
            let slot = pool.len() as u16;
            pool.push(DiJet::new(
                first,
                &jets[first as usize],
                second,
                &jets[second as usize],
            ));
            slot
        })
    }

    /// Builds the lepton-pair pool from the isolated leptons. Only pairs
    /// where both legs resolved to a trigger match become candidates; with
    /// no trigger collection for the event every view downstream stays
    /// empty.
    fn build_di_leptons(&self, views: &mut CombinationViews) {
        for (i, j) in (0..self.pools.isolated.len()).tuple_combinations() {
            if self.hlt_matches[i].is_none() || self.hlt_matches[j].is_none() {
                continue;
            }
            let pair = DiLepton::new(
                i as u16,
                &self.pools.isolated[i],
                j as u16,
                &self.pools.isolated[j],
            );
            views.di_leptons_id_iso.push(
                LeptonQuality::all()
                    .filter(|q| pair.passes(q))
                    .map(|q| q.index() as u16)
                    .collect(),
            );
            views.di_leptons.push(pair);
        }
    }

    /// Builds the quadruple pool and its views. The governing quality of a
    /// lepton pair (the meet of its legs) selects which cleaned jet-pair
    /// set and which best b-jet pair the quadruple is built against.
    fn build_quadruples(&self, views: &mut CombinationViews) {
        let mut slots: HashMap<(u16, u16), u16> = HashMap::new();

        let mut intern = |pool: &mut Vec<DiLepDiJet>,
                          di_leptons: &[DiLepton],
                          di_jets: &[DiJet],
                          dl_slot: u16,
                          dj_slot: u16| {
            *slots.entry((dl_slot, dj_slot)).or_insert_with(|| {
                let slot = pool.len() as u16;
                pool.push(DiLepDiJet::new(
                    dl_slot,
                    &di_leptons[dl_slot as usize],
                    dj_slot,
                    &di_jets[dj_slot as usize],
                ));
                slot
            })
        };

        for quality in LeptonQuality::all() {
            let mut dr_view = Vec::new();
            let mut pt_views: Vec<Vec<u16>> = vec![Vec::new(); BtagWp::COUNT];
            let mut btag_views: Vec<Vec<u16>> = vec![Vec::new(); BtagWp::COUNT];

            for (dl_slot, pair) in views.di_leptons.iter().enumerate() {
                if !pair.passes(&quality) {
                    continue;
                }
                let Some(governing) = pair.governing_quality() else {
                    continue;
                };

                for &dj_slot in &views.di_jets_dr_cut[governing.index()] {
                    let slot = intern(
                        &mut views.di_lep_di_jets,
                        &views.di_leptons,
                        &views.di_jets,
                        dl_slot as u16,
                        dj_slot,
                    );
                    dr_view.push(slot);
                }

                for wp in BtagWp::all() {
                    let combo = BtagCombination::new(governing, wp).index();
                    if let Some(&dj_slot) =
                        views.di_b_jets_dr_cut_wp_pt_ordered[combo].first()
                    {
                        let slot = intern(
                            &mut views.di_lep_di_jets,
                            &views.di_leptons,
                            &views.di_jets,
                            dl_slot as u16,
                            dj_slot,
                        );
                        pt_views[wp as usize].push(slot);
                    }
                    if let Some(&dj_slot) =
                        views.di_b_jets_dr_cut_wp_btag_ordered[combo].first()
                    {
                        let slot = intern(
                            &mut views.di_lep_di_jets,
                            &views.di_leptons,
                            &views.di_jets,
                            dl_slot as u16,
                            dj_slot,
                        );
                        btag_views[wp as usize].push(slot);
                    }
                }
            }

            views.di_lep_di_jets_dr_cut.push(dr_view);
            views.di_lep_di_b_jets_dr_cut_wp_pt_ordered.append(&mut pt_views);
            views.di_lep_di_b_jets_dr_cut_wp_btag_ordered.append(&mut btag_views);
        }
    }
}
