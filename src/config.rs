use serde::{Deserialize, Serialize};

use crate::data::quality::JetIdTier;
use crate::error::Result;

/// Selection thresholds and working-point names, as supplied by the
/// configuration collaborator. Every field is optional in serialized form
/// and falls back to the reference default.
///
/// # Examples
///
/// ```
/// use recomb::config::SelectionConfig;
///
/// let config = SelectionConfig::default();
/// assert_eq!(config.electron_pt_cut, 20.0);
/// assert_eq!(config.jet_dr_lepton_cut, 0.3);
/// let resolved = config.resolve().unwrap();
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    pub electron_pt_cut: f64,
    pub electron_eta_cut: f64,
    pub electron_veto_id_name: String,
    pub electron_loose_id_name: String,
    pub electron_medium_id_name: String,
    pub electron_tight_id_name: String,

    pub muon_pt_cut: f64,
    pub muon_eta_cut: f64,
    pub muon_loose_iso_cut: f64,
    pub muon_tight_iso_cut: f64,

    pub jet_pt_cut: f64,
    pub jet_eta_cut: f64,
    /// Minimum jet-lepton angular separation for a jet to stay selected.
    pub jet_dr_lepton_cut: f64,
    /// Named jet identification tier, resolved once by [`SelectionConfig::resolve`].
    pub jet_id_name: String,
    /// Name of the b-tag discriminant to look up on each jet.
    pub btag_name: String,
    pub btag_loose_cut: f64,
    pub btag_medium_cut: f64,
    pub btag_tight_cut: f64,

    pub trigger_dr_cut: f64,
    pub trigger_dpt_over_pt_cut: f64,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        SelectionConfig {
            electron_pt_cut: 20.0,
            electron_eta_cut: 2.5,
            electron_veto_id_name: "veto".to_string(),
            electron_loose_id_name: "loose".to_string(),
            electron_medium_id_name: "medium".to_string(),
            electron_tight_id_name: "tight".to_string(),

            muon_pt_cut: 20.0,
            muon_eta_cut: 2.4,
            muon_loose_iso_cut: 0.2,
            muon_tight_iso_cut: 0.12,

            jet_pt_cut: 30.0,
            jet_eta_cut: 2.5,
            jet_dr_lepton_cut: 0.3,
            jet_id_name: "tight".to_string(),
            btag_name: "pfCombinedInclusiveSecondaryVertexV2BJetTags".to_string(),
            btag_loose_cut: 0.605,
            btag_medium_cut: 0.89,
            btag_tight_cut: 0.97,

            trigger_dr_cut: f64::MAX,
            trigger_dpt_over_pt_cut: f64::MAX,
        }
    }
}

impl SelectionConfig {
    /// Validates the named working points once, at configuration-load time.
    ///
    /// An unrecognized jet-ID name is rejected here rather than at first use
    /// per object. Electron working-point names and the b-tag discriminant
    /// name can only be checked against the per-object maps, so those are
    /// validated at first lookup and still abort the event.
    pub fn resolve(self) -> Result<ResolvedConfig> {
        let jet_id = JetIdTier::from_name(&self.jet_id_name)?;
        Ok(ResolvedConfig { selection: self, jet_id })
    }
}

/// A validated configuration with named working points resolved to closed
/// enumerations.
#[derive(Clone, Debug)]
pub struct ResolvedConfig {
    pub selection: SelectionConfig,
    pub jet_id: JetIdTier,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_defaults_match_reference() {
        let config = SelectionConfig::default();
        assert_eq!(config.muon_eta_cut, 2.4);
        assert_eq!(config.muon_tight_iso_cut, 0.12);
        assert_eq!(config.btag_medium_cut, 0.89);
        assert_eq!(config.trigger_dr_cut, f64::MAX);
    }

    #[test]
    fn test_unknown_jet_id_rejected_at_load() {
        let config = SelectionConfig {
            jet_id_name: "medium".to_string(),
            ..SelectionConfig::default()
        };
        let err = config.resolve().unwrap_err();
        assert!(matches!(err, Error::UnknownWorkingPoint { .. }));
    }

    #[test]
    fn test_resolve_keeps_tier() {
        let resolved = SelectionConfig::default().resolve().unwrap();
        assert_eq!(resolved.jet_id, JetIdTier::Tight);
    }
}
