use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::player::{Player, PlayerId};
use crate::rating::gamma_from_elo;

/// Outcome of a game, named by the winning color.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Winner {
    White,
    Black,
    Draw,
}

#[derive(Debug, Error)]
#[error("invalid winner code")]
pub struct InvalidWinner;

impl FromStr for Winner {
    type Err = InvalidWinner;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "W" => Winner::White,
            "B" => Winner::Black,
            "D" => Winner::Draw,
            _ => return Err(InvalidWinner),
        })
    }
}

impl fmt::Display for Winner {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Winner::White => "W",
            Winner::Black => "B",
            Winner::Draw => "D",
        })
    }
}

/// The side of the board a player held in a particular game.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub(crate) enum Color {
    White,
    Black,
}

/// Index of a game in the `Base` arena.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub(crate) struct GameId(pub(crate) usize);

/// A game in host marshalling form, before any wiring into a registry. Also
/// the shape in which held-out games are handed to [`Evaluate`].
///
/// [`Evaluate`]: crate::Evaluate
#[derive(Debug, Clone)]
pub struct GameRecord {
    pub black: String,
    pub white: String,
    pub winner: Winner,
    pub time_step: i32,
    pub handicap: f64,
}

/// A single observation: two distinct players at one time step, an outcome,
/// and a handicap in Elo points added to black's effective strength.
#[derive(Debug, Clone)]
pub struct Game {
    pub(crate) time_step: i32,
    pub(crate) winner: Winner,
    pub(crate) handicap: f64,
    pub(crate) white: PlayerId,
    pub(crate) black: PlayerId,
    // Back-references into each player's day sequence, wired when the game
    // is recorded under the day representing its time step.
    pub(crate) white_day: usize,
    pub(crate) black_day: usize,
}

impl Game {
    pub(crate) fn new(
        black: PlayerId,
        white: PlayerId,
        winner: Winner,
        time_step: i32,
        handicap: f64,
    ) -> Game {
        Game {
            time_step,
            winner,
            handicap,
            white,
            black,
            white_day: 0,
            black_day: 0,
        }
    }

    pub fn time_step(&self) -> i32 {
        self.time_step
    }

    pub fn winner(&self) -> Winner {
        self.winner
    }

    pub fn handicap(&self) -> f64 {
        self.handicap
    }

    pub(crate) fn color_of(&self, player: PlayerId) -> Color {
        if player == self.white {
            Color::White
        } else {
            Color::Black
        }
    }

    /// Bradley-Terry strength of the viewer's opponent, read from the
    /// opponent's bound day and adjusted by the handicap.
    pub(crate) fn opponents_adjusted_gamma(&self, viewer: Color, players: &[Player]) -> f64 {
        let opponent_elo = match viewer {
            Color::White => players[self.black.0].days()[self.black_day].elo() + self.handicap,
            Color::Black => players[self.white.0].days()[self.white_day].elo() - self.handicap,
        };
        gamma_from_elo(opponent_elo)
    }

    /// Bradley-Terry probability of a white win at the current ratings.
    /// `players` must be the player table of the [`Base`] that recorded this
    /// game, as returned by [`Base::players`].
    ///
    /// [`Base`]: crate::Base
    /// [`Base::players`]: crate::Base::players
    pub fn white_win_probability(&self, players: &[Player]) -> f64 {
        let gamma = players[self.white.0].days()[self.white_day].gamma();
        gamma / (gamma + self.opponents_adjusted_gamma(Color::White, players))
    }

    /// Bradley-Terry probability of a black win at the current ratings; same
    /// `players` contract as [`Game::white_win_probability`].
    pub fn black_win_probability(&self, players: &[Player]) -> f64 {
        let gamma = players[self.black.0].days()[self.black_day].gamma();
        gamma / (gamma + self.opponents_adjusted_gamma(Color::Black, players))
    }

    /// Probability the model assigns to the recorded outcome. Draws score as
    /// the geometric mean of the two win probabilities.
    pub fn likelihood(&self, players: &[Player]) -> f64 {
        match self.winner {
            Winner::White => self.white_win_probability(players),
            Winner::Black => self.black_win_probability(players),
            Winner::Draw => {
                (self.white_win_probability(players) * self.black_win_probability(players)).sqrt()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    #[test]
    fn winner_codes_round_trip() {
        for winner in [Winner::White, Winner::Black, Winner::Draw] {
            assert_eq!(winner.to_string().parse::<Winner>().unwrap(), winner);
        }
        assert!("X".parse::<Winner>().is_err());
        assert!("".parse::<Winner>().is_err());
    }

    fn wired_pair(winner: Winner, handicap: f64, black_elo: f64, white_elo: f64) -> (Vec<Player>, Game) {
        let mut players = vec![Player::new("black", 300.0, 2), Player::new("white", 300.0, 2)];
        let mut game = Game::new(PlayerId(0), PlayerId(1), winner, 0, handicap);
        players[0].add_game(GameId(0), &mut game, Color::Black);
        players[1].add_game(GameId(0), &mut game, Color::White);
        players[0].days_mut()[0].set_elo(black_elo);
        players[1].days_mut()[0].set_elo(white_elo);
        (players, game)
    }

    #[test]
    fn win_probabilities_with_handicap() {
        let (players, game) = wired_pair(Winner::White, 37.0, 120.0, -80.0);
        assert_abs_diff_eq!(
            game.white_win_probability(&players),
            0.20354530028827425,
            epsilon = 1e-12
        );
        assert_abs_diff_eq!(
            game.black_win_probability(&players),
            0.7964546997117258,
            epsilon = 1e-12
        );
        assert_abs_diff_eq!(game.likelihood(&players), 0.20354530028827425, epsilon = 1e-12);
    }

    #[test]
    fn draw_likelihood_is_color_symmetric() {
        let (players, game) = wired_pair(Winner::Draw, 37.0, 120.0, -80.0);
        assert_abs_diff_eq!(game.likelihood(&players), 0.4026345874596847, epsilon = 1e-12);

        // Swapped colors with the handicap sign flipped.
        let (mirrored_players, mirrored) = wired_pair(Winner::Draw, -37.0, -80.0, 120.0);
        assert_abs_diff_eq!(
            mirrored.likelihood(&mirrored_players),
            game.likelihood(&players),
            epsilon = 1e-12
        );
    }
}
