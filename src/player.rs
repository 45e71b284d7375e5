use std::fmt;

use crate::game::{Color, Game, GameId};
use crate::player_day::{DayTerms, PlayerDay};
use crate::rating::natural_variance_from_elo;
use crate::tridiagonal::Tridiagonal;

/// Index of a player in the `Base` arena.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct PlayerId(pub(crate) usize);

/// A player's full rating trajectory: one [`PlayerDay`] per time step
/// played, tied together by a Brownian prior on the natural rating.
#[derive(Debug, Clone)]
pub struct Player {
    name: Box<str>,
    // Variance of the Brownian prior per unit time step, natural scale.
    w2: f64,
    virtual_games: u32,
    days: Vec<PlayerDay>,
}

impl Player {
    pub(crate) fn new(name: &str, w2_elo: f64, virtual_games: u32) -> Player {
        Player {
            name: Box::from(name),
            w2: natural_variance_from_elo(w2_elo),
            virtual_games,
            days: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn days(&self) -> &[PlayerDay] {
        &self.days
    }

    #[cfg(test)]
    pub(crate) fn days_mut(&mut self) -> &mut [PlayerDay] {
        &mut self.days
    }

    pub(crate) fn virtual_games(&self) -> u32 {
        self.virtual_games
    }

    /// Records a game under the day representing its time step, appending a
    /// fresh day seeded from the previous one when the step is new, and
    /// wires the game's back-reference for `color`.
    pub(crate) fn add_game(&mut self, id: GameId, game: &mut Game, color: Color) {
        if self.days.last().map_or(true, |day| day.time_step() != game.time_step) {
            let mut day = PlayerDay::new(game.time_step);
            match self.days.last() {
                None => {
                    day.is_first_day = true;
                    day.set_gamma(1.0);
                }
                Some(previous) => day.set_gamma(previous.gamma()),
            }
            self.days.push(day);
        }
        let index = self.days.len() - 1;
        match color {
            Color::White => game.white_day = index,
            Color::Black => game.black_day = index,
        }
        self.days[index].record_game(id, game.winner, color);
    }

    /// Prior variance between consecutive days, proportional to the gap in
    /// time steps.
    fn sigma2(&self) -> Vec<f64> {
        self.days
            .windows(2)
            .map(|pair| f64::from((pair[1].time_step() - pair[0].time_step()).abs()) * self.w2)
            .collect()
    }

    fn gradient(&self, r: &[f64], sigma2: &[f64], terms: &[DayTerms]) -> Vec<f64> {
        let n = self.days.len();
        (0..n)
            .map(|i| {
                let mut prior = 0.0;
                if i < n - 1 {
                    prior -= (r[i] - r[i + 1]) / sigma2[i];
                }
                if i > 0 {
                    prior -= (r[i] - r[i - 1]) / sigma2[i - 1];
                }
                terms[i].log_likelihood_derivative(self.days[i].gamma()) + prior
            })
            .collect()
    }

    fn hessian(&self, sigma2: &[f64], terms: &[DayTerms]) -> Tridiagonal {
        let n = self.days.len();
        let diag = (0..n)
            .map(|i| {
                let mut prior = 0.0;
                if i < n - 1 {
                    prior -= 1.0 / sigma2[i];
                }
                if i > 0 {
                    prior -= 1.0 / sigma2[i - 1];
                }
                terms[i].log_likelihood_second_derivative(self.days[i].gamma()) + prior
                    - DIAGONAL_DAMPING
            })
            .collect();
        let coupling: Vec<f64> = sigma2.iter().map(|s2| 1.0 / s2).collect();
        Tridiagonal {
            diag,
            sub: coupling.clone(),
            sup: coupling,
        }
    }

    /// One block Newton update of the whole trajectory. `terms` must have
    /// been computed from the opponents' current ratings, one entry per day.
    pub(crate) fn run_one_newton_iteration(&mut self, terms: &[DayTerms]) {
        match self.days.len() {
            0 => {}
            1 => self.days[0].update_by_1d_newton(&terms[0]),
            _ => self.update_by_ndim_newton(terms),
        }
    }

    fn update_by_ndim_newton(&mut self, terms: &[DayTerms]) {
        let r: Vec<f64> = self.days.iter().map(PlayerDay::r).collect();
        let sigma2 = self.sigma2();
        let hessian = self.hessian(&sigma2, terms);
        let gradient = self.gradient(&r, &sigma2, terms);
        // Unclamped step; no line search.
        let step = hessian.solve(&gradient);
        for (i, day) in self.days.iter_mut().enumerate() {
            day.r = r[i] - step[i];
        }
    }

    /// Per-day variance of the fitted rating, from the diagonal of the
    /// negated inverse Hessian. A single-day trajectory keeps uncertainty 0.
    pub(crate) fn update_uncertainty(&mut self, terms: &[DayTerms]) {
        if self.days.len() < 2 {
            return;
        }
        let sigma2 = self.sigma2();
        let variances = self.hessian(&sigma2, terms).negated_inverse_diagonal();
        for (day, variance) in self.days.iter_mut().zip(variances) {
            day.uncertainty = variance;
        }
    }

    /// Joint log-posterior of the trajectory: per-day game likelihoods plus
    /// the Gaussian transition densities to the neighboring days. A day
    /// whose transition densities underflow to zero contributes its game
    /// likelihood alone.
    pub(crate) fn log_likelihood(&self, terms: &[DayTerms]) -> f64 {
        let n = self.days.len();
        let sigma2 = self.sigma2();
        let mut sum = 0.0;
        for i in 0..n {
            let mut prior = 0.0;
            if i < n - 1 {
                prior += transition_density(self.days[i].r() - self.days[i + 1].r(), sigma2[i]);
            }
            if i > 0 {
                prior += transition_density(self.days[i].r() - self.days[i - 1].r(), sigma2[i - 1]);
            }
            sum += terms[i].log_likelihood(self.days[i].gamma());
            if prior != 0.0 {
                sum += prior.ln();
            }
        }
        sum
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Player({})", self.name)
    }
}

fn transition_density(difference: f64, sigma2: f64) -> f64 {
    f64::exp(-difference * difference / (2.0 * sigma2)) / f64::sqrt(2.0 * std::f64::consts::PI * sigma2)
}

/// Subtracted from every Hessian diagonal entry; keeps the unpivoted solve
/// away from exactly singular pivots.
const DIAGONAL_DAMPING: f64 = 0.001;

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;
    use crate::game::Winner;

    fn player_with_days(steps: &[i32]) -> Player {
        let mut player = Player::new("p", 300.0, 2);
        for (i, &step) in steps.iter().enumerate() {
            let mut game = Game::new(PlayerId(0), PlayerId(1), Winner::White, step, 0.0);
            player.add_game(GameId(i), &mut game, Color::Black);
        }
        player
    }

    #[test]
    fn days_are_created_per_distinct_step() {
        let player = player_with_days(&[0, 0, 3, 10, 10]);
        let steps: Vec<i32> = player.days().iter().map(PlayerDay::time_step).collect();
        assert_eq!(steps, vec![0, 3, 10]);
        assert!(player.days()[0].is_first_day());
        assert!(!player.days()[1].is_first_day());
        let games: Vec<usize> = player.days().iter().map(PlayerDay::games_played).collect();
        assert_eq!(games, vec![2, 1, 2]);
    }

    #[test]
    fn new_days_inherit_the_previous_rating() {
        let mut player = player_with_days(&[0]);
        player.days_mut()[0].set_elo(150.0);
        let mut game = Game::new(PlayerId(0), PlayerId(1), Winner::Draw, 7, 0.0);
        player.add_game(GameId(9), &mut game, Color::Black);
        assert_abs_diff_eq!(player.days()[1].elo(), 150.0, epsilon = 1e-12);
    }

    #[test]
    fn sigma2_scales_with_step_gaps() {
        let player = player_with_days(&[0, 3, 10]);
        let sigma2 = player.sigma2();
        assert_abs_diff_eq!(sigma2[0], 0.029823176871440996, epsilon = 1e-15);
        assert_abs_diff_eq!(sigma2[1], 0.06958741270002898, epsilon = 1e-15);
    }

    #[test]
    fn single_day_keeps_zero_uncertainty() {
        let mut player = player_with_days(&[0]);
        let terms = vec![DayTerms::default()];
        player.update_uncertainty(&terms);
        assert_eq!(player.days()[0].uncertainty(), 0.0);
    }
}
