use std::fmt;
use std::fmt::{Display, Formatter};

use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Lepton identification tier, ordered loosest to tightest.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Encode, Decode)]
pub enum IdTier {
    Veto,
    Loose,
    Medium,
    Tight,
}

impl IdTier {
    pub const COUNT: usize = 4;

    pub fn all() -> [IdTier; Self::COUNT] {
        [IdTier::Veto, IdTier::Loose, IdTier::Medium, IdTier::Tight]
    }
}

impl Display for IdTier {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            IdTier::Veto => write!(f, "veto"),
            IdTier::Loose => write!(f, "loose"),
            IdTier::Medium => write!(f, "medium"),
            IdTier::Tight => write!(f, "tight"),
        }
    }
}

/// Lepton isolation tier, ordered loosest to tightest.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Encode, Decode)]
pub enum IsoTier {
    Loose,
    Tight,
}

impl IsoTier {
    pub const COUNT: usize = 2;

    pub fn all() -> [IsoTier; Self::COUNT] {
        [IsoTier::Loose, IsoTier::Tight]
    }
}

impl Display for IsoTier {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            IsoTier::Loose => write!(f, "iso-loose"),
            IsoTier::Tight => write!(f, "iso-tight"),
        }
    }
}

/// One lepton-quality combination: identification tier x isolation tier.
///
/// The combinations form a lattice under the componentwise tier order;
/// [`LeptonQuality::meet`] yields the loosest common combination of two
/// elements, which is the quality that governs jet cleaning and b-tag
/// categorization for a lepton pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Encode, Decode)]
pub struct LeptonQuality {
    pub id: IdTier,
    pub iso: IsoTier,
}

impl LeptonQuality {
    pub const COUNT: usize = IdTier::COUNT * IsoTier::COUNT;

    pub fn new(id: IdTier, iso: IsoTier) -> Self {
        LeptonQuality { id, iso }
    }

    /// Storage slot of this combination in quality-keyed view arrays.
    ///
    /// The mapping is total and reviewable: `id * 2 + iso`, with tiers in
    /// their loosest-to-tightest declaration order.
    ///
    /// # Examples
    ///
    /// ```
    /// use recomb::data::quality::{IdTier, IsoTier, LeptonQuality};
    ///
    /// let q = LeptonQuality::new(IdTier::Loose, IsoTier::Tight);
    /// assert_eq!(q.index(), 3);
    /// assert_eq!(LeptonQuality::from_index(3), Some(q));
    /// ```
    pub fn index(&self) -> usize {
        self.id as usize * IsoTier::COUNT + self.iso as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        if index >= Self::COUNT {
            return None;
        }
        let id = IdTier::all()[index / IsoTier::COUNT];
        let iso = IsoTier::all()[index % IsoTier::COUNT];
        Some(LeptonQuality { id, iso })
    }

    /// Iterates every combination in slot order.
    pub fn all() -> impl Iterator<Item = LeptonQuality> {
        (0..Self::COUNT).map(|i| Self::from_index(i).unwrap())
    }

    /// Pairwise lattice meet: the loosest of two combinations, componentwise.
    ///
    /// # Examples
    ///
    /// ```
    /// use recomb::data::quality::{IdTier, IsoTier, LeptonQuality};
    ///
    /// let a = LeptonQuality::new(IdTier::Tight, IsoTier::Loose);
    /// let b = LeptonQuality::new(IdTier::Loose, IsoTier::Tight);
    /// let m = a.meet(&b);
    /// assert_eq!(m, LeptonQuality::new(IdTier::Loose, IsoTier::Loose));
    /// ```
    pub fn meet(&self, other: &LeptonQuality) -> LeptonQuality {
        LeptonQuality {
            id: self.id.min(other.id),
            iso: self.iso.min(other.iso),
        }
    }
}

impl Display for LeptonQuality {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.id, self.iso)
    }
}

/// B-tagging working point, ordered loosest to tightest.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Encode, Decode)]
pub enum BtagWp {
    Loose,
    Medium,
    Tight,
}

impl BtagWp {
    pub const COUNT: usize = 3;

    pub fn all() -> [BtagWp; Self::COUNT] {
        [BtagWp::Loose, BtagWp::Medium, BtagWp::Tight]
    }
}

impl Display for BtagWp {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            BtagWp::Loose => write!(f, "btag-loose"),
            BtagWp::Medium => write!(f, "btag-medium"),
            BtagWp::Tight => write!(f, "btag-tight"),
        }
    }
}

/// Ordering strategy applied to jet and jet-pair index views.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Encode, Decode)]
pub enum JetOrdering {
    /// Descending transverse momentum, pool index ascending on ties.
    PtDescending,
    /// Descending b-tag discriminant, pool index ascending on ties.
    BtagDescending,
}

/// One lepton-quality combination paired with a b-tag working point.
///
/// Keys the `*_wp_*` view arrays; slot order nests the working point inside
/// the lepton-quality slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Encode, Decode)]
pub struct BtagCombination {
    pub quality: LeptonQuality,
    pub wp: BtagWp,
}

impl BtagCombination {
    pub const COUNT: usize = LeptonQuality::COUNT * BtagWp::COUNT;

    pub fn new(quality: LeptonQuality, wp: BtagWp) -> Self {
        BtagCombination { quality, wp }
    }

    pub fn index(&self) -> usize {
        self.quality.index() * BtagWp::COUNT + self.wp as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        if index >= Self::COUNT {
            return None;
        }
        let quality = LeptonQuality::from_index(index / BtagWp::COUNT)?;
        let wp = BtagWp::all()[index % BtagWp::COUNT];
        Some(BtagCombination { quality, wp })
    }

    pub fn all() -> impl Iterator<Item = BtagCombination> {
        (0..Self::COUNT).map(|i| Self::from_index(i).unwrap())
    }
}

impl Display for BtagCombination {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.quality, self.wp)
    }
}

/// Jet identification tier, resolved once from its configured name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Encode, Decode)]
pub enum JetIdTier {
    Loose,
    Tight,
    TightLeptonVeto,
}

impl JetIdTier {
    /// Resolves a configured jet-ID name, rejecting unknown names immediately.
    ///
    /// # Examples
    ///
    /// ```
    /// use recomb::data::quality::JetIdTier;
    ///
    /// assert_eq!(JetIdTier::from_name("tight").unwrap(), JetIdTier::Tight);
    /// assert!(JetIdTier::from_name("ultratight").is_err());
    /// ```
    pub fn from_name(name: &str) -> Result<Self> {
        match name {
            "loose" => Ok(JetIdTier::Loose),
            "tight" => Ok(JetIdTier::Tight),
            "tightLeptonVeto" => Ok(JetIdTier::TightLeptonVeto),
            _ => Err(Error::UnknownWorkingPoint {
                kind: "jet identification",
                name: name.to_string(),
            }),
        }
    }
}

impl Display for JetIdTier {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            JetIdTier::Loose => write!(f, "loose"),
            JetIdTier::Tight => write!(f, "tight"),
            JetIdTier::TightLeptonVeto => write!(f, "tightLeptonVeto"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quality_slot_mapping_is_a_bijection() {
        for (slot, quality) in LeptonQuality::all().enumerate() {
            assert_eq!(quality.index(), slot);
            assert_eq!(LeptonQuality::from_index(slot), Some(quality));
        }
        assert_eq!(LeptonQuality::from_index(LeptonQuality::COUNT), None);
    }

    #[test]
    fn test_combination_slot_mapping_is_a_bijection() {
        for (slot, combo) in BtagCombination::all().enumerate() {
            assert_eq!(combo.index(), slot);
            assert_eq!(BtagCombination::from_index(slot), Some(combo));
        }
        assert_eq!(BtagCombination::from_index(BtagCombination::COUNT), None);
    }

    #[test]
    fn test_meet_is_commutative_and_idempotent() {
        for a in LeptonQuality::all() {
            assert_eq!(a.meet(&a), a);
            for b in LeptonQuality::all() {
                assert_eq!(a.meet(&b), b.meet(&a));
                let m = a.meet(&b);
                assert!(m.id <= a.id && m.id <= b.id);
                assert!(m.iso <= a.iso && m.iso <= b.iso);
            }
        }
    }

    #[test]
    fn test_unknown_jet_id_name_is_fatal() {
        let err = JetIdTier::from_name("medium").unwrap_err();
        assert!(matches!(err, Error::UnknownWorkingPoint { kind: "jet identification", .. }));
    }
}
