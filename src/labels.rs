//! Human-readable default labels, e.g. `quirky_hopper`

use rand::seq::IndexedRandom;

const ADJECTIVES: &[&str] = &[
    "admiring", "bold", "brave", "clever", "dazzling", "eager", "elated", "festive", "focused",
    "gallant", "gifted", "happy", "hopeful", "jolly", "keen", "loving", "modest", "nifty",
    "optimistic", "peaceful", "quirky", "relaxed", "serene", "sharp", "stoic", "tender",
    "upbeat", "vibrant", "wizardly", "zealous",
];

const SURNAMES: &[&str] = &[
    "babbage", "bohr", "curie", "darwin", "einstein", "euler", "fermi", "franklin", "galileo",
    "goodall", "hopper", "hypatia", "johnson", "kepler", "lamarr", "lovelace", "meitner",
    "newton", "noether", "pasteur", "ramanujan", "shannon", "tesla", "turing", "wozniak",
];

/// Generate a fresh `<adjective>_<surname>` label. Never empty, always within label bounds.
pub fn generate() -> String {
    let mut rng = rand::rng();
    let adjective = ADJECTIVES.choose(&mut rng).copied().unwrap_or("nameless");
    let surname = SURNAMES.choose(&mut rng).copied().unwrap_or("image");
    format!("{}_{}", adjective, surname)
}
