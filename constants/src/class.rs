//! Closed set of semantic classes assigned to points.
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum ClassLabel {
    Tree = 0,
    Building = 1,
    Pool = 2,
}

pub struct ClassInfo {
    pub label: ClassLabel,
    pub name: &'static str,
    pub artifact_name: &'static str,
}

pub const CLASS_MAP: &[ClassInfo] = &[
    ClassInfo {
        label: ClassLabel::Tree,
        name: "trees",
        artifact_name: "trees",
    },
    ClassInfo {
        label: ClassLabel::Building,
        name: "buildings",
        artifact_name: "buildings",
    },
    ClassInfo {
        label: ClassLabel::Pool,
        name: "pools",
        artifact_name: "pools",
    },
];

/// Number of classes in the closed set.
pub const CLASS_COUNT: usize = 3;

impl ClassLabel {
    pub const ALL: [ClassLabel; CLASS_COUNT] =
        [ClassLabel::Tree, ClassLabel::Building, ClassLabel::Pool];

    pub fn id(self) -> u8 {
        self as u8
    }

    /// Position of the class in per-class arrays.
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        CLASS_MAP[self.index()].name
    }

    /// Stable token used when naming output artifacts.
    pub fn artifact_name(self) -> &'static str {
        CLASS_MAP[self.index()].artifact_name
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }
}

impl fmt::Display for ClassLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Raised when a raw class id falls outside the closed set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnknownClassId(pub u8);

impl fmt::Display for UnknownClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown class id {}", self.0)
    }
}

impl std::error::Error for UnknownClassId {}

impl TryFrom<u8> for ClassLabel {
    type Error = UnknownClassId;

    fn try_from(id: u8) -> Result<Self, Self::Error> {
        Self::from_index(id as usize).ok_or(UnknownClassId(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_match_map_order() {
        for (idx, info) in CLASS_MAP.iter().enumerate() {
            assert_eq!(info.label.index(), idx);
            assert_eq!(ClassLabel::try_from(idx as u8), Ok(info.label));
        }
    }

    #[test]
    fn rejects_ids_outside_closed_set() {
        assert_eq!(ClassLabel::try_from(3), Err(UnknownClassId(3)));
        assert_eq!(ClassLabel::try_from(200), Err(UnknownClassId(200)));
        assert_eq!(ClassLabel::from_index(2), Some(ClassLabel::Pool));
    }
}
