use std::collections::HashMap;

use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};

use crate::data::kinematics::FourMomentum;
use crate::data::quality::{IdTier, JetIdTier};
use crate::error::{Error, Result};

fn check_len(
    collection: &'static str,
    field: &'static str,
    got: usize,
    expected: usize,
) -> Result<()> {
    if got != expected {
        return Err(Error::LengthMismatch { collection, field, got, expected });
    }
    Ok(())
}

/// Raw electron collection as delivered by the producer collaborator.
///
/// All per-object attributes are parallel arrays indexed by electron number.
/// Identification decisions are keyed by working-point name, looked up with
/// [`ElectronCollection::id`].
#[derive(Clone, Debug, Default, Serialize, Deserialize, Encode, Decode)]
pub struct ElectronCollection {
    pub p4: Vec<FourMomentum>,
    pub charge: Vec<i8>,
    pub ids: Vec<HashMap<String, bool>>,
    pub relative_isolation: Vec<f64>,
}

impl ElectronCollection {
    pub fn len(&self) -> usize {
        self.p4.len()
    }

    pub fn is_empty(&self) -> bool {
        self.p4.is_empty()
    }

    pub fn validate(&self) -> Result<()> {
        check_len("electron", "charge", self.charge.len(), self.p4.len())?;
        check_len("electron", "ids", self.ids.len(), self.p4.len())?;
        check_len(
            "electron",
            "relative_isolation",
            self.relative_isolation.len(),
            self.p4.len(),
        )?;
        Ok(())
    }

    /// Identification decision for one electron under a named working point.
    ///
    /// An unknown working-point name is a configuration error and aborts the
    /// event; an out-of-range index is a programming error in the core.
    pub fn id(&self, index: usize, working_point: &str) -> Result<bool> {
        let row = self.ids.get(index).ok_or(Error::IndexOutOfRange {
            kind: "electron",
            index,
            len: self.ids.len(),
        })?;
        row.get(working_point)
            .copied()
            .ok_or_else(|| Error::UnknownWorkingPoint {
                kind: "electron identification",
                name: working_point.to_string(),
            })
    }
}

/// Raw muon collection as delivered by the producer collaborator.
#[derive(Clone, Debug, Default, Serialize, Deserialize, Encode, Decode)]
pub struct MuonCollection {
    pub p4: Vec<FourMomentum>,
    pub charge: Vec<i8>,
    pub is_loose: Vec<bool>,
    pub is_medium: Vec<bool>,
    pub is_tight: Vec<bool>,
    pub relative_isolation: Vec<f64>,
}

impl MuonCollection {
    pub fn len(&self) -> usize {
        self.p4.len()
    }

    pub fn is_empty(&self) -> bool {
        self.p4.is_empty()
    }

    pub fn validate(&self) -> Result<()> {
        check_len("muon", "charge", self.charge.len(), self.p4.len())?;
        check_len("muon", "is_loose", self.is_loose.len(), self.p4.len())?;
        check_len("muon", "is_medium", self.is_medium.len(), self.p4.len())?;
        check_len("muon", "is_tight", self.is_tight.len(), self.p4.len())?;
        check_len(
            "muon",
            "relative_isolation",
            self.relative_isolation.len(),
            self.p4.len(),
        )?;
        Ok(())
    }

    /// Identification decision for one muon at a given tier.
    ///
    /// Muons carry no dedicated veto working point; the veto tier reuses the
    /// loose decision.
    pub fn id(&self, index: usize, tier: IdTier) -> Result<bool> {
        if index >= self.len() {
            return Err(Error::IndexOutOfRange { kind: "muon", index, len: self.len() });
        }
        Ok(match tier {
            IdTier::Veto | IdTier::Loose => self.is_loose[index],
            IdTier::Medium => self.is_medium[index],
            IdTier::Tight => self.is_tight[index],
        })
    }
}

/// Raw jet collection as delivered by the producer collaborator.
///
/// B-tag discriminants are keyed by discriminant name, looked up with
/// [`JetCollection::btag_discriminant`].
#[derive(Clone, Debug, Default, Serialize, Deserialize, Encode, Decode)]
pub struct JetCollection {
    pub p4: Vec<FourMomentum>,
    pub pass_loose_id: Vec<bool>,
    pub pass_tight_id: Vec<bool>,
    pub pass_tight_lepton_veto_id: Vec<bool>,
    pub btags: Vec<HashMap<String, f64>>,
}

impl JetCollection {
    pub fn len(&self) -> usize {
        self.p4.len()
    }

    pub fn is_empty(&self) -> bool {
        self.p4.is_empty()
    }

    pub fn validate(&self) -> Result<()> {
        check_len("jet", "pass_loose_id", self.pass_loose_id.len(), self.p4.len())?;
        check_len("jet", "pass_tight_id", self.pass_tight_id.len(), self.p4.len())?;
        check_len(
            "jet",
            "pass_tight_lepton_veto_id",
            self.pass_tight_lepton_veto_id.len(),
            self.p4.len(),
        )?;
        check_len("jet", "btags", self.btags.len(), self.p4.len())?;
        Ok(())
    }

    pub fn id(&self, index: usize, tier: JetIdTier) -> Result<bool> {
        if index >= self.len() {
            return Err(Error::IndexOutOfRange { kind: "jet", index, len: self.len() });
        }
        Ok(match tier {
            JetIdTier::Loose => self.pass_loose_id[index],
            JetIdTier::Tight => self.pass_tight_id[index],
            JetIdTier::TightLeptonVeto => self.pass_tight_lepton_veto_id[index],
        })
    }

    /// B-tag discriminant value of one jet under a named discriminant.
    pub fn btag_discriminant(&self, index: usize, name: &str) -> Result<f64> {
        let row = self.btags.get(index).ok_or(Error::IndexOutOfRange {
            kind: "jet",
            index,
            len: self.btags.len(),
        })?;
        row.get(name).copied().ok_or_else(|| Error::UnknownWorkingPoint {
            kind: "b-tag discriminant",
            name: name.to_string(),
        })
    }
}

/// Online trigger objects for one event, absent entirely for some events.
#[derive(Clone, Debug, Default, Serialize, Deserialize, Encode, Decode)]
pub struct TriggerCollection {
    /// Names of the trigger paths that fired.
    pub paths: Vec<String>,
    pub object_p4: Vec<FourMomentum>,
    pub object_pdg_id: Vec<i32>,
}

impl TriggerCollection {
    pub fn validate(&self) -> Result<()> {
        check_len(
            "trigger",
            "object_pdg_id",
            self.object_pdg_id.len(),
            self.object_p4.len(),
        )?;
        Ok(())
    }
}

/// All raw inputs for one event.
#[derive(Clone, Debug, Default, Serialize, Deserialize, Encode, Decode)]
pub struct EventInput {
    pub electrons: ElectronCollection,
    pub muons: MuonCollection,
    pub jets: JetCollection,
    pub trigger: Option<TriggerCollection>,
}

impl EventInput {
    pub fn validate(&self) -> Result<()> {
        self.electrons.validate()?;
        self.muons.validate()?;
        self.jets.validate()?;
        if let Some(trigger) = &self.trigger {
            trigger.validate()?;
        }
        Ok(())
    }
}
