//! Display-level reductions of a tally: winner and percentages.

use serde::Serialize;

use poll_types::Tally;

/// Which category leads.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Winner {
    Jjajang,
    Jjamppong,
    Tie,
}

/// Strictly more votes wins; equal counts (including `0 vs 0`) tie.
pub fn classify_winner(tally: &Tally) -> Winner {
    use std::cmp::Ordering;

    match tally.count_a.cmp(&tally.count_b) {
        Ordering::Greater => Winner::Jjajang,
        Ordering::Less => Winner::Jjamppong,
        Ordering::Equal => Winner::Tie,
    }
}

/// `count` as a whole percentage of `total`, rounded half up.
///
/// An empty total yields 0. The two percentages of a tally are rounded
/// independently and need not sum to 100.
pub fn percentage(count: u64, total: u64) -> u8 {
    if total == 0 {
        return 0;
    }
    // round(100 * count / total) == floor((200 * count + total) / (2 * total))
    let count = count.min(total) as u128;
    let total = total as u128;
    ((200 * count + total) / (2 * total)) as u8
}

/// Everything the results page shows.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct TallySummary {
    pub votes: Tally,
    pub total: u64,
    pub percent_jjajang: u8,
    pub percent_jjamppong: u8,
    pub winner: Winner,
}

impl From<Tally> for TallySummary {
    fn from(votes: Tally) -> Self {
        let total = votes.total();
        Self {
            votes,
            total,
            percent_jjajang: percentage(votes.count_a, total),
            percent_jjamppong: percentage(votes.count_b, total),
            winner: classify_winner(&votes),
        }
    }
}
