use crate::game::{Color, Game, GameId, Winner};
use crate::player::{Player, PlayerId};
use crate::rating::{elo_from_natural, natural_from_elo};

/// One game's contribution to a day's likelihood, summarized as the four
/// coefficients `(a, b, c, d)` over the day's own gamma.
#[derive(Debug, Copy, Clone)]
pub(crate) struct GameTerm {
    pub(crate) a: f64,
    pub(crate) b: f64,
    pub(crate) c: f64,
    pub(crate) d: f64,
}

impl GameTerm {
    pub(crate) fn won(opponent_gamma: f64) -> GameTerm {
        GameTerm {
            a: 1.0,
            b: 0.0,
            c: 1.0,
            d: opponent_gamma,
        }
    }

    pub(crate) fn drawn(opponent_gamma: f64) -> GameTerm {
        GameTerm {
            a: 0.5,
            b: 0.5 * opponent_gamma,
            c: 1.0,
            d: opponent_gamma,
        }
    }

    pub(crate) fn lost(opponent_gamma: f64) -> GameTerm {
        GameTerm {
            a: 0.0,
            b: opponent_gamma,
            c: 1.0,
            d: opponent_gamma,
        }
    }

    /// A drawn game against a phantom unit-strength opponent, anchoring a
    /// player's first day.
    pub(crate) fn virtual_draw() -> GameTerm {
        GameTerm {
            a: 0.5,
            b: 0.5,
            c: 1.0,
            d: 1.0,
        }
    }
}

/// The game terms of one day, rebuilt at the top of every Newton step so
/// that opponent ratings moved by earlier block updates are picked up.
#[derive(Debug, Default)]
pub(crate) struct DayTerms {
    pub(crate) won: Vec<GameTerm>,
    pub(crate) drawn: Vec<GameTerm>,
    pub(crate) lost: Vec<GameTerm>,
}

impl DayTerms {
    pub(crate) fn log_likelihood_derivative(&self, gamma: f64) -> f64 {
        let mut tally = 0.0;
        for term in self.all() {
            tally += term.c / (term.c * gamma + term.d);
        }
        self.won.len() as f64 + 0.5 * self.drawn.len() as f64 - gamma * tally
    }

    pub(crate) fn log_likelihood_second_derivative(&self, gamma: f64) -> f64 {
        let mut sum = 0.0;
        for term in self.all() {
            sum += (term.c * term.d) / (term.c * gamma + term.d).powi(2);
        }
        -gamma * sum
    }

    pub(crate) fn log_likelihood(&self, gamma: f64) -> f64 {
        let mut tally = 0.0;
        for term in &self.won {
            tally += (term.a * gamma).ln() - (term.c * gamma + term.d).ln();
        }
        for term in &self.drawn {
            tally += 0.5 * (term.a * 2.0 * gamma).ln() + 0.5 * (term.b * 2.0).ln()
                - (term.c * gamma + term.d).ln();
        }
        for term in &self.lost {
            tally += term.b.ln() - (term.c * gamma + term.d).ln();
        }
        tally
    }

    fn all(&self) -> impl Iterator<Item = &GameTerm> {
        self.won.iter().chain(&self.drawn).chain(&self.lost)
    }
}

/// The latent rating of one player at one time step; the atomic variable of
/// the optimization.
#[derive(Debug, Clone)]
pub struct PlayerDay {
    pub(crate) time_step: i32,
    pub(crate) r: f64,
    pub(crate) uncertainty: f64,
    pub(crate) is_first_day: bool,
    pub(crate) won_games: Vec<GameId>,
    pub(crate) drawn_games: Vec<GameId>,
    pub(crate) lost_games: Vec<GameId>,
}

impl PlayerDay {
    pub(crate) fn new(time_step: i32) -> PlayerDay {
        PlayerDay {
            time_step,
            r: 0.0,
            uncertainty: 0.0,
            is_first_day: false,
            won_games: Vec::new(),
            drawn_games: Vec::new(),
            lost_games: Vec::new(),
        }
    }

    pub fn time_step(&self) -> i32 {
        self.time_step
    }

    /// Rating in the natural (log-gamma) scale.
    pub fn r(&self) -> f64 {
        self.r
    }

    /// Variance of `r`, populated once the fit has converged.
    pub fn uncertainty(&self) -> f64 {
        self.uncertainty
    }

    pub fn is_first_day(&self) -> bool {
        self.is_first_day
    }

    pub fn gamma(&self) -> f64 {
        self.r.exp()
    }

    pub fn set_gamma(&mut self, gamma: f64) {
        self.r = gamma.ln();
    }

    pub fn elo(&self) -> f64 {
        elo_from_natural(self.r)
    }

    pub fn set_elo(&mut self, elo: f64) {
        self.r = natural_from_elo(elo);
    }

    /// Number of games recorded under this day, over all three buckets.
    pub fn games_played(&self) -> usize {
        self.won_games.len() + self.drawn_games.len() + self.lost_games.len()
    }

    pub(crate) fn record_game(&mut self, id: GameId, winner: Winner, color: Color) {
        match (winner, color) {
            (Winner::Draw, _) => self.drawn_games.push(id),
            (Winner::White, Color::White) | (Winner::Black, Color::Black) => {
                self.won_games.push(id)
            }
            _ => self.lost_games.push(id),
        }
    }

    /// Builds the won/drawn/lost term buckets from the opponents' current
    /// ratings, appending the first day's virtual draws to the drawn bucket.
    pub(crate) fn compute_game_terms(
        &self,
        me: PlayerId,
        virtual_games: u32,
        players: &[Player],
        games: &[Game],
    ) -> DayTerms {
        let adjusted = |id: &GameId| {
            let game = &games[id.0];
            game.opponents_adjusted_gamma(game.color_of(me), players)
        };
        let mut terms = DayTerms {
            won: self.won_games.iter().map(|id| GameTerm::won(adjusted(id))).collect(),
            drawn: self.drawn_games.iter().map(|id| GameTerm::drawn(adjusted(id))).collect(),
            lost: self.lost_games.iter().map(|id| GameTerm::lost(adjusted(id))).collect(),
        };
        if self.is_first_day {
            terms
                .drawn
                .extend((0..virtual_games).map(|_| GameTerm::virtual_draw()));
        }
        terms
    }

    pub(crate) fn update_by_1d_newton(&mut self, terms: &DayTerms) {
        let gamma = self.gamma();
        self.r -= terms.log_likelihood_derivative(gamma) / terms.log_likelihood_second_derivative(gamma);
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    fn sample_terms() -> DayTerms {
        DayTerms {
            won: vec![GameTerm::won(1.4)],
            drawn: vec![GameTerm::drawn(0.8), GameTerm::virtual_draw(), GameTerm::virtual_draw()],
            lost: vec![GameTerm::lost(2.5)],
        }
    }

    #[test]
    fn derivatives_match_finite_differences() {
        let terms = sample_terms();
        let h = 1e-6;
        for r in [-0.9_f64, -0.2, 0.0, 0.4, 1.1] {
            let numeric_first =
                (terms.log_likelihood((r + h).exp()) - terms.log_likelihood((r - h).exp())) / (2.0 * h);
            assert_abs_diff_eq!(
                terms.log_likelihood_derivative(r.exp()),
                numeric_first,
                epsilon = 1e-6
            );

            let numeric_second = (terms.log_likelihood_derivative((r + h).exp())
                - terms.log_likelihood_derivative((r - h).exp()))
                / (2.0 * h);
            assert_abs_diff_eq!(
                terms.log_likelihood_second_derivative(r.exp()),
                numeric_second,
                epsilon = 1e-6
            );
        }
    }

    #[test]
    fn one_dimensional_newton_finds_the_stationary_point() {
        // One win against a unit opponent plus two virtual draws: the
        // stationary point of the day likelihood is gamma = 2.
        let mut day = PlayerDay::new(0);
        day.is_first_day = true;
        let terms = DayTerms {
            won: vec![GameTerm::won(1.0)],
            drawn: vec![GameTerm::virtual_draw(), GameTerm::virtual_draw()],
            lost: vec![],
        };
        for _ in 0..30 {
            day.update_by_1d_newton(&terms);
        }
        assert_abs_diff_eq!(day.gamma(), 2.0, epsilon = 1e-9);
        assert_abs_diff_eq!(terms.log_likelihood_derivative(day.gamma()), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn elo_and_gamma_setters_round_trip() {
        let mut day = PlayerDay::new(3);
        day.set_elo(250.0);
        assert_abs_diff_eq!(day.elo(), 250.0, epsilon = 1e-12);
        day.set_gamma(3.5);
        assert_abs_diff_eq!(day.gamma(), 3.5, epsilon = 1e-12);
    }
}
