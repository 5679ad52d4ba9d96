// Library modules for birdmedia
// The binary and the tests both go through this crate root

pub mod config;
pub mod db;
pub mod error;
pub mod media;
pub mod models;
pub mod species;
pub mod spellcheck;

#[cfg(test)]
pub mod test_utils;
