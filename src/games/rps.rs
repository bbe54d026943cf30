//! Rock-paper-scissors against the house's shape stock.
//!
//! The house's answer is drawn from the ledger's resource counts,
//! weighted by remaining stock per shape. Once the three ordinary
//! shapes are exhausted the house may play its wildcard, which beats
//! every ordinary shape unconditionally.

use rand::Rng;

use super::types::{GameOutcome, HandShape, HouseThrow, RoundView};
use crate::ledger::ResourceCounts;

/// Standard precedence: rock crushes scissors, paper wraps rock,
/// scissors cut paper.
pub fn beats(a: HandShape, b: HandShape) -> bool {
    matches!(
        (a, b),
        (HandShape::Rock, HandShape::Scissors)
            | (HandShape::Paper, HandShape::Rock)
            | (HandShape::Scissors, HandShape::Paper)
    )
}

/// Draw the house's answer from its remaining stock.
///
/// Ordinary shapes are drawn with probability proportional to their
/// remaining count. With all three exhausted the wildcard comes out if
/// any is stocked; failing that the house improvises an unweighted
/// ordinary shape (there is no counter left to consume).
pub fn house_response<R: Rng>(stock: &ResourceCounts, rng: &mut R) -> HouseThrow {
    let total = stock.ordinary_total();
    if total > 0 {
        let mut roll = rng.gen_range(0..total);
        for shape in HandShape::ALL {
            let count = stock.of_shape(shape);
            if roll < count {
                return HouseThrow::Shape { shape };
            }
            roll -= count;
        }
    }
    if stock.wildcard > 0 {
        return HouseThrow::Wildcard;
    }
    let shape = HandShape::ALL[rng.gen_range(0..HandShape::ALL.len())];
    HouseThrow::Shape { shape }
}

/// Which counter the played throw consumes. `None` when the house
/// improvised from an empty stock.
pub fn stock_delta(stock: &ResourceCounts, response: HouseThrow) -> Option<ResourceCounts> {
    match response {
        HouseThrow::Shape { shape } if stock.of_shape(shape) > 0 => {
            let mut delta = ResourceCounts::default();
            match shape {
                HandShape::Rock => delta.rock = -1,
                HandShape::Paper => delta.paper = -1,
                HandShape::Scissors => delta.scissors = -1,
            }
            Some(delta)
        }
        HouseThrow::Wildcard if stock.wildcard > 0 => Some(ResourceCounts {
            wildcard: -1,
            ..Default::default()
        }),
        _ => None,
    }
}

/// Resolve the duel. The wildcard is a strict house win.
pub fn duel(player: HandShape, house: HouseThrow) -> GameOutcome {
    match house {
        HouseThrow::Wildcard => GameOutcome::Lose,
        HouseThrow::Shape { shape } if shape == player => GameOutcome::Push,
        HouseThrow::Shape { shape } => {
            if beats(player, shape) {
                GameOutcome::Win
            } else {
                GameOutcome::Lose
            }
        }
    }
}

/// Per-session RPS state: empty until the single throw resolves it.
#[derive(Debug, Clone, Default)]
pub struct RpsState {
    pub(crate) thrown: Option<HandShape>,
    pub(crate) house: Option<HouseThrow>,
}

impl RpsState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, player: HandShape, house: HouseThrow) {
        self.thrown = Some(player);
        self.house = Some(house);
    }

    pub fn view(&self) -> RoundView {
        RoundView::Rps {
            thrown: self.thrown,
            house: self.house,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    #[test]
    fn precedence_matrix() {
        assert!(beats(HandShape::Rock, HandShape::Scissors));
        assert!(beats(HandShape::Paper, HandShape::Rock));
        assert!(beats(HandShape::Scissors, HandShape::Paper));
        assert!(!beats(HandShape::Scissors, HandShape::Rock));
        assert!(!beats(HandShape::Rock, HandShape::Rock));
    }

    #[test]
    fn wildcard_beats_every_shape() {
        for shape in HandShape::ALL {
            assert_eq!(duel(shape, HouseThrow::Wildcard), GameOutcome::Lose);
        }
    }

    #[test]
    fn matching_shapes_push() {
        for shape in HandShape::ALL {
            assert_eq!(duel(shape, HouseThrow::Shape { shape }), GameOutcome::Push);
        }
    }

    #[test]
    fn ordinary_duels_follow_precedence() {
        assert_eq!(
            duel(
                HandShape::Rock,
                HouseThrow::Shape {
                    shape: HandShape::Scissors
                }
            ),
            GameOutcome::Win
        );
        assert_eq!(
            duel(
                HandShape::Rock,
                HouseThrow::Shape {
                    shape: HandShape::Paper
                }
            ),
            GameOutcome::Lose
        );
    }

    #[test]
    fn draw_is_weighted_by_remaining_stock() {
        let stock = ResourceCounts {
            rock: 5,
            paper: 0,
            scissors: 0,
            wildcard: 1,
        };
        for seed in 0..30 {
            let mut rng = StdRng::seed_from_u64(seed);
            assert_eq!(
                house_response(&stock, &mut rng),
                HouseThrow::Shape {
                    shape: HandShape::Rock
                }
            );
        }
    }

    #[test]
    fn every_stocked_shape_shows_up() {
        let stock = ResourceCounts {
            rock: 1,
            paper: 1,
            scissors: 1,
            wildcard: 1,
        };
        let mut seen = HashSet::new();
        for seed in 0..60 {
            let mut rng = StdRng::seed_from_u64(seed);
            if let HouseThrow::Shape { shape } = house_response(&stock, &mut rng) {
                seen.insert(shape);
            } else {
                panic!("wildcard played while ordinary stock remains");
            }
        }
        assert_eq!(seen.len(), 3);
    }

    #[test]
    fn wildcard_comes_out_only_when_shapes_are_exhausted() {
        let stock = ResourceCounts {
            rock: 0,
            paper: 0,
            scissors: 0,
            wildcard: 1,
        };
        let mut rng = StdRng::seed_from_u64(5);
        assert_eq!(house_response(&stock, &mut rng), HouseThrow::Wildcard);
    }

    #[test]
    fn empty_house_improvises_an_ordinary_shape() {
        let stock = ResourceCounts::default();
        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            let response = house_response(&stock, &mut rng);
            assert!(matches!(response, HouseThrow::Shape { .. }));
            assert_eq!(stock_delta(&stock, response), None);
        }
    }

    #[test]
    fn stock_delta_consumes_the_played_counter() {
        let stock = ResourceCounts::default_stock();
        let delta = stock_delta(
            &stock,
            HouseThrow::Shape {
                shape: HandShape::Paper,
            },
        )
        .unwrap();
        assert_eq!(delta.paper, -1);
        assert_eq!(delta.rock, 0);

        let wildcard_delta = stock_delta(&stock, HouseThrow::Wildcard).unwrap();
        assert_eq!(wildcard_delta.wildcard, -1);
    }
}
