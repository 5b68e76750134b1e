//! Hidden letter payload for word games.
//!
//! Every player in a session plays against the same bag of tiles, so the
//! payload is generated once at game creation and stored with the game.
//! It is never returned through the public API before play.

use rand::RngExt;
use serde::{Deserialize, Serialize};

/// One drawable tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LetterTile {
    pub letter: char,
    pub point: u32,
}

/// English letter frequencies (per ten thousand) with tile point values.
const LETTER_TABLE: &[(char, u32, u32)] = &[
    ('A', 817, 1),
    ('B', 149, 3),
    ('C', 278, 3),
    ('D', 425, 2),
    ('E', 1270, 1),
    ('F', 223, 4),
    ('G', 202, 2),
    ('H', 609, 4),
    ('I', 697, 1),
    ('J', 15, 8),
    ('K', 77, 5),
    ('L', 403, 1),
    ('M', 241, 3),
    ('N', 675, 1),
    ('O', 751, 1),
    ('P', 193, 3),
    ('Q', 10, 10),
    ('R', 599, 1),
    ('S', 633, 1),
    ('T', 906, 1),
    ('U', 276, 1),
    ('V', 98, 4),
    ('W', 236, 4),
    ('X', 15, 8),
    ('Y', 197, 4),
    ('Z', 7, 10),
];

pub const TILES_PER_GAME: usize = 16;

/// Draw a frequency-weighted bag of tiles.
pub fn generate_letter_tiles() -> Vec<LetterTile> {
    let total: u32 = LETTER_TABLE.iter().map(|(_, weight, _)| weight).sum();
    let mut rng = rand::rng();
    (0..TILES_PER_GAME)
        .map(|_| {
            let mut roll = rng.random_range(0..total);
            for &(letter, weight, point) in LETTER_TABLE {
                if roll < weight {
                    return LetterTile { letter, point };
                }
                roll -= weight;
            }
            // Unreachable: the roll is bounded by the table's total weight.
            let &(letter, _, point) = &LETTER_TABLE[0];
            LetterTile { letter, point }
        })
        .collect()
}
