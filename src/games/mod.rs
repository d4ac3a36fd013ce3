//! Game implementations for the CFR engine.
//!
//! ## Available Games
//!
//! - [`gin_rummy`]: two-player Gin Rummy with knocking, gin and undercut scoring

pub mod gin_rummy;
