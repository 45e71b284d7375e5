//! Whole-History Rating: Bayesian rating trajectories fitted to a full
//! corpus of two-player game outcomes.
//!
//! Each player's rating over time follows a Brownian-motion prior; each game
//! is a Bradley-Terry observation, optionally with an Elo handicap on black.
//! Fitting is a block-coordinate Newton method: one sweep updates every
//! player's whole trajectory against the opponents' current ratings, and
//! sweeps repeat until the rounded Elo fingerprint stops moving.
//!
//! ```
//! use whr::{Base, Winner};
//!
//! let mut base = Base::new();
//! base.create_game("alice", "bob", Winner::Black, 0, 0.0)?;
//! base.create_game("alice", "bob", Winner::White, 1, 0.0)?;
//! base.iterate_until_converge(false);
//!
//! for point in base.ratings_for_player("alice") {
//!     println!("{}: {:.0} ± {:.0}", point.time_step, point.elo, point.stddev_elo);
//! }
//! # Ok::<_, whr::SelfPlayError>(())
//! ```

mod base;
mod evaluate;
mod game;
mod player;
mod player_day;
mod rating;
mod tridiagonal;

pub use base::{Base, BaseBuilder, RatingPoint, SelfPlayError};
pub use evaluate::Evaluate;
pub use game::{Game, GameRecord, InvalidWinner, Winner};
pub use player::Player;
pub use player_day::PlayerDay;
