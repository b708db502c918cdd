//! Derived vote counts.

use serde::{Deserialize, Serialize};

use crate::Category;

/// Accepted votes per category. Never stored; recomputed from the ledger on
/// every query.
///
/// Serialized with the category wire names as keys so both fields are always
/// present, even at zero.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tally {
    #[serde(rename = "jjajang")]
    pub count_a: u64,
    #[serde(rename = "jjamppong")]
    pub count_b: u64,
}

impl Tally {
    pub fn new(count_a: u64, count_b: u64) -> Self {
        Self { count_a, count_b }
    }

    pub fn count(&self, category: Category) -> u64 {
        match category {
            Category::Jjajang => self.count_a,
            Category::Jjamppong => self.count_b,
        }
    }

    /// Count one more vote for `category`.
    pub fn add(&mut self, category: Category) {
        match category {
            Category::Jjajang => self.count_a += 1,
            Category::Jjamppong => self.count_b += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.count_a + self.count_b
    }
}

impl FromIterator<Category> for Tally {
    fn from_iter<I: IntoIterator<Item = Category>>(iter: I) -> Self {
        let mut tally = Tally::default();
        for category in iter {
            tally.add(category);
        }
        tally
    }
}
