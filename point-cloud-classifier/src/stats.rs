//! Per-class point tallies used in logs, summaries and the manifest.
use constants::class::{CLASS_COUNT, ClassLabel};
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::fmt;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClassCounts {
    counts: [u64; CLASS_COUNT],
}

impl ClassCounts {
    pub fn from_labels(labels: &[ClassLabel]) -> Self {
        let mut counts = Self::default();
        for &label in labels {
            counts.add(label, 1);
        }
        counts
    }

    pub fn add(&mut self, label: ClassLabel, n: u64) {
        self.counts[label.index()] += n;
    }

    pub fn get(&self, label: ClassLabel) -> u64 {
        self.counts[label.index()]
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    /// Classes with at least one point, in id order.
    pub fn present(&self) -> impl Iterator<Item = ClassLabel> + '_ {
        ClassLabel::ALL.into_iter().filter(|&l| self.get(l) > 0)
    }

    pub fn merge(&mut self, other: &ClassCounts) {
        for label in ClassLabel::ALL {
            self.add(label, other.get(label));
        }
    }
}

impl fmt::Display for ClassCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = ClassLabel::ALL
            .iter()
            .map(|&l| format!("{}={}", l.name(), self.get(l)))
            .collect();
        f.write_str(&parts.join(", "))
    }
}

impl Serialize for ClassCounts {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(CLASS_COUNT))?;
        for label in ClassLabel::ALL {
            map.serialize_entry(label.name(), &self.get(label))?;
        }
        map.end()
    }
}
