//! # Password module
//!
//! This module provide the generation of master user passwords accepted by
//! documentdb

use rand::{distributions::Uniform, Rng};

// -----------------------------------------------------------------------------
// Constants

pub const DEFAULT_LENGTH: usize = 27;
pub const MIN_LENGTH: usize = 8;
pub const MAX_LENGTH: usize = 100;

/// characters refused by documentdb in a master user password
pub const FORBIDDEN: [char; 3] = ['/', '"', '@'];

// -----------------------------------------------------------------------------
// Helpers

/// returns a random password made of printable ascii characters, the length
/// is clamped between [`MIN_LENGTH`] and [`MAX_LENGTH`]
pub fn generate(length: usize) -> String {
    let length = length.clamp(MIN_LENGTH, MAX_LENGTH);
    let alphabet: Vec<char> = ('!'..='~').filter(|c| !FORBIDDEN.contains(c)).collect();
    let range = Uniform::from(0..alphabet.len());

    rand::thread_rng()
        .sample_iter(range)
        .take(length)
        .map(|idx| alphabet[idx])
        .collect()
}
