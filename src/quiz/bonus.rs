use rand::seq::SliceRandom;

use crate::quiz::catalog::{Bonus, Character};

// Character files come in two shapes: the current ones carry a single fixed
// bonus, the older ones carry a pool of rewards that is drawn from anew on
// every reveal. The fixed bonus wins when a file has both.
pub fn resolve(character: &Character) -> Option<Bonus> {
    if let Some(bonus) = &character.bonus {
        return Some(bonus.clone());
    }
    character
        .bonus_pool
        .choose(&mut rand::thread_rng())
        .cloned()
}
