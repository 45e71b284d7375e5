use rustc_hash::FxHashMap;

use crate::base::Base;
use crate::game::{GameRecord, Winner};
use crate::rating::gamma_from_elo;

/// A frozen snapshot of fitted ratings, indexed by player and time step, for
/// scoring held-out games against the fit.
#[derive(Debug, Clone)]
pub struct Evaluate {
    ratings_by_player: FxHashMap<Box<str>, Vec<(i32, f64)>>,
}

impl Evaluate {
    /// Copies every player's `(time_step, elo)` history out of `base`.
    pub fn new(base: &Base) -> Evaluate {
        let mut ratings_by_player = FxHashMap::default();
        for player in base.players() {
            let mut ratings: Vec<(i32, f64)> = player
                .days()
                .iter()
                .map(|day| (day.time_step(), day.elo()))
                .collect();
            ratings.sort_by_key(|&(time_step, _)| time_step);
            ratings_by_player.insert(Box::from(player.name()), ratings);
        }
        Evaluate { ratings_by_player }
    }

    /// Rating at `time_step`, linearly interpolated between the nearest
    /// fitted days and held flat beyond the ends. Names never seen return
    /// NaN, or 0 when `ignore_null_players` is unset.
    pub fn get_rating(&self, name: &str, time_step: i32, ignore_null_players: bool) -> f64 {
        let Some(ratings) = self.ratings_by_player.get(name) else {
            return if ignore_null_players { f64::NAN } else { 0.0 };
        };
        let mut below: Option<(i32, f64)> = None;
        let mut above: Option<(i32, f64)> = None;
        for &(step, elo) in ratings {
            if step <= time_step && below.map_or(true, |(s, _)| step >= s) {
                below = Some((step, elo));
            }
            if step >= time_step && above.map_or(true, |(s, _)| step <= s) {
                above = Some((step, elo));
            }
        }
        match (below, above) {
            (None, above) => above.map_or(0.0, |(_, elo)| elo),
            (Some((_, below_elo)), None) => below_elo,
            (Some((below_step, below_elo)), Some((above_step, above_elo))) => {
                if above_step <= below_step {
                    above_elo
                } else {
                    (f64::from(above_step - time_step) * below_elo
                        + f64::from(time_step - below_step) * above_elo)
                        / f64::from(above_step - below_step)
                }
            }
        }
    }

    fn evaluate_single_game(&self, game: &GameRecord, ignore_null_players: bool) -> f64 {
        let black_rating = self.get_rating(&game.black, game.time_step, ignore_null_players);
        let white_rating = self.get_rating(&game.white, game.time_step, ignore_null_players);
        if !black_rating.is_finite() || !white_rating.is_finite() {
            return f64::NAN;
        }
        let white_gamma = gamma_from_elo(white_rating);
        let black_adjusted_gamma = gamma_from_elo(black_rating + game.handicap);
        match game.winner {
            Winner::White => white_gamma / (white_gamma + black_adjusted_gamma),
            Winner::Black => black_adjusted_gamma / (white_gamma + black_adjusted_gamma),
            Winner::Draw => {
                (white_gamma * black_adjusted_gamma).sqrt() / (white_gamma + black_adjusted_gamma)
            }
        }
    }

    /// Mean log-likelihood over the games whose likelihood is finite; 0 when
    /// none are.
    pub fn evaluate_ave_log_likelihood_games(
        &self,
        games: &[GameRecord],
        ignore_null_players: bool,
    ) -> f64 {
        let mut sum = 0.0;
        let mut counted: u32 = 0;
        for game in games {
            let likelihood = self.evaluate_single_game(game, ignore_null_players);
            if likelihood.is_finite() {
                sum += likelihood.ln();
                counted += 1;
            }
        }
        if counted == 0 {
            0.0
        } else {
            sum / f64::from(counted)
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    fn seeded(histories: &[(&str, &[(i32, f64)])]) -> Evaluate {
        let mut ratings_by_player = FxHashMap::default();
        for &(name, history) in histories {
            ratings_by_player.insert(Box::from(name), history.to_vec());
        }
        Evaluate { ratings_by_player }
    }

    #[test]
    fn interpolates_between_days() {
        let evaluate = seeded(&[("P", &[(0, 100.0), (10, 200.0)])]);
        assert_abs_diff_eq!(evaluate.get_rating("P", 4, true), 140.0, epsilon = 1e-9);
        assert_abs_diff_eq!(evaluate.get_rating("P", 0, true), 100.0, epsilon = 1e-9);
        assert_abs_diff_eq!(evaluate.get_rating("P", 10, true), 200.0, epsilon = 1e-9);
        // Held flat outside the fitted range.
        assert_abs_diff_eq!(evaluate.get_rating("P", -5, true), 100.0, epsilon = 1e-9);
        assert_abs_diff_eq!(evaluate.get_rating("P", 99, true), 200.0, epsilon = 1e-9);
    }

    #[test]
    fn unknown_names_follow_the_null_flag() {
        let evaluate = seeded(&[("P", &[(0, 100.0)])]);
        assert!(evaluate.get_rating("Q", 4, true).is_nan());
        assert_eq!(evaluate.get_rating("Q", 4, false), 0.0);
        // A known name with an empty history degenerates to 0 either way.
        let empty = seeded(&[("R", &[])]);
        assert_eq!(empty.get_rating("R", 4, true), 0.0);
    }

    #[test]
    fn snapshot_agrees_with_the_fitted_base() {
        let mut base = Base::new();
        base.create_games(&[
            GameRecord {
                black: "A".to_owned(),
                white: "B".to_owned(),
                winner: Winner::Black,
                time_step: 0,
                handicap: 0.0,
            },
            GameRecord {
                black: "A".to_owned(),
                white: "B".to_owned(),
                winner: Winner::White,
                time_step: 6,
                handicap: 0.0,
            },
        ]);
        base.iterate(20);
        let evaluate = Evaluate::new(&base);
        for point in base.ratings_for_player("A") {
            assert_abs_diff_eq!(
                evaluate.get_rating("A", point.time_step, true),
                point.elo,
                epsilon = 1e-9
            );
        }
    }

    #[test]
    fn scores_a_held_out_game() {
        let evaluate = seeded(&[("A", &[(0, 100.0)]), ("B", &[(0, -100.0)])]);
        let game = GameRecord {
            black: "B".to_owned(),
            white: "A".to_owned(),
            winner: Winner::White,
            time_step: 0,
            handicap: 0.0,
        };
        assert_abs_diff_eq!(
            evaluate.evaluate_single_game(&game, true),
            0.759746926647958,
            epsilon = 1e-12
        );
        assert_abs_diff_eq!(
            evaluate.evaluate_ave_log_likelihood_games(std::slice::from_ref(&game), true),
            -0.27476989240834515,
            epsilon = 1e-12
        );
    }

    #[test]
    fn games_against_unknown_players_are_skipped() {
        let evaluate = seeded(&[("A", &[(0, 100.0)])]);
        let game = GameRecord {
            black: "ghost".to_owned(),
            white: "A".to_owned(),
            winner: Winner::White,
            time_step: 0,
            handicap: 0.0,
        };
        assert_eq!(
            evaluate.evaluate_ave_log_likelihood_games(std::slice::from_ref(&game), true),
            0.0
        );
        // With nulls scored as 0 Elo the game contributes.
        let scored = evaluate.evaluate_ave_log_likelihood_games(std::slice::from_ref(&game), false);
        assert!(scored < 0.0 && scored.is_finite());
    }
}
