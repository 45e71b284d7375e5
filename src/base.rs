use std::cmp::Reverse;
use std::io::{self, Write};

use log::{debug, info, warn};
use ordered_float::OrderedFloat;
use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::game::{Color, Game, GameId, GameRecord, Winner};
use crate::player::{Player, PlayerId};
use crate::player_day::DayTerms;
use crate::rating::elo_from_natural;

/// Attempt to record a game of a player against themselves.
#[derive(Debug, Error)]
#[error("game players cannot be equal: {0}")]
pub struct SelfPlayError(pub String);

/// One row of a player's fitted rating history.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct RatingPoint {
    pub time_step: i32,
    pub elo: f64,
    pub stddev_elo: f64,
}

#[derive(Debug, Clone)]
pub struct BaseBuilder {
    w2: f64,
    virtual_games: u32,
}

impl Default for BaseBuilder {
    fn default() -> BaseBuilder {
        BaseBuilder::new()
    }
}

impl BaseBuilder {
    pub fn new() -> BaseBuilder {
        BaseBuilder {
            w2: 300.0,
            virtual_games: 2,
        }
    }

    /// Variance of the Brownian rating prior per unit time step, in
    /// Elo-squared.
    pub fn w2(&mut self, w2: f64) -> &mut Self {
        assert!(w2 > 0.0);
        self.w2 = w2;
        self
    }

    /// Number of first-day virtual draws against a unit-strength opponent.
    pub fn virtual_games(&mut self, virtual_games: u32) -> &mut Self {
        self.virtual_games = virtual_games;
        self
    }

    pub fn build(&self) -> Base {
        Base {
            w2: self.w2,
            virtual_games: self.virtual_games,
            players: Vec::new(),
            ids: FxHashMap::default(),
            games: Vec::new(),
        }
    }
}

/// Registry of players and games, and the block-coordinate Newton driver
/// that fits all rating trajectories jointly.
#[derive(Debug, Clone)]
pub struct Base {
    w2: f64,
    virtual_games: u32,
    // Insertion order doubles as the sweep order.
    players: Vec<Player>,
    ids: FxHashMap<Box<str>, PlayerId>,
    games: Vec<Game>,
}

impl Default for Base {
    fn default() -> Base {
        Base::new()
    }
}

impl Base {
    pub fn builder() -> BaseBuilder {
        BaseBuilder::new()
    }

    /// A base with the default prior (`w2 = 300`, `virtual_games = 2`).
    pub fn new() -> Base {
        BaseBuilder::new().build()
    }

    /// Looks a player up by name, creating an empty-history entry on first
    /// sight.
    fn player_by_name(&mut self, name: &str) -> PlayerId {
        if let Some(&id) = self.ids.get(name) {
            return id;
        }
        let id = PlayerId(self.players.len());
        self.players
            .push(Player::new(name, self.w2, self.virtual_games));
        self.ids.insert(Box::from(name), id);
        id
    }

    pub fn player(&self, name: &str) -> Option<&Player> {
        self.ids.get(name).map(|&PlayerId(index)| &self.players[index])
    }

    /// The player table, in registration order. Indexable by the day
    /// back-references carried on [`Game`] and accepted by its probability
    /// methods.
    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn games(&self) -> &[Game] {
        &self.games
    }

    /// Records one game. The two player names must differ.
    pub fn create_game(
        &mut self,
        black: &str,
        white: &str,
        winner: Winner,
        time_step: i32,
        handicap: f64,
    ) -> Result<(), SelfPlayError> {
        if black == white {
            return Err(SelfPlayError(black.to_owned()));
        }
        // White is registered first; registration order is the sweep order.
        let white_id = self.player_by_name(white);
        let black_id = self.player_by_name(black);
        let id = GameId(self.games.len());
        self.games
            .push(Game::new(black_id, white_id, winner, time_step, handicap));
        self.players[white_id.0].add_game(id, &mut self.games[id.0], Color::White);
        self.players[black_id.0].add_game(id, &mut self.games[id.0], Color::Black);
        Ok(())
    }

    /// Records a batch of games in time-step order. Self-play records are
    /// dropped with a diagnostic.
    pub fn create_games(&mut self, records: &[GameRecord]) {
        let mut records: Vec<&GameRecord> = records.iter().collect();
        records.sort_by_key(|record| record.time_step);
        for record in records {
            if let Err(err) = self.create_game(
                &record.black,
                &record.white,
                record.winner,
                record.time_step,
                record.handicap,
            ) {
                warn!("dropping game: {err}");
            }
        }
    }

    fn day_terms(&self, id: PlayerId) -> Vec<DayTerms> {
        let player = &self.players[id.0];
        player
            .days()
            .iter()
            .map(|day| day.compute_game_terms(id, player.virtual_games(), &self.players, &self.games))
            .collect()
    }

    /// One sweep of per-player Newton updates in insertion order. Later
    /// players in the sweep see the earlier players' fresh ratings.
    fn run_one_iteration(&mut self) {
        for index in 0..self.players.len() {
            let terms = self.day_terms(PlayerId(index));
            self.players[index].run_one_newton_iteration(&terms);
        }
    }

    fn update_uncertainties(&mut self) {
        for index in 0..self.players.len() {
            let terms = self.day_terms(PlayerId(index));
            self.players[index].update_uncertainty(&terms);
        }
    }

    /// Runs a fixed number of sweeps, then computes per-day uncertainties.
    pub fn iterate(&mut self, count: usize) {
        for _ in 0..count {
            self.run_one_iteration();
        }
        self.update_uncertainties();
    }

    /// Sweeps until the centi-Elo fingerprint of all ratings has been stable
    /// for ten consecutive sweeps, then computes per-day uncertainties.
    /// Returns the number of sweeps run.
    pub fn iterate_until_converge(&mut self, verbose: bool) -> usize {
        let mut order: Vec<usize> = (0..self.players.len()).collect();
        order.sort_by(|&a, &b| self.players[a].name().cmp(self.players[b].name()));

        let mut count = 0;
        let mut best_iteration = 0;
        let mut last_fingerprint: Vec<i64> = Vec::new();
        loop {
            let fingerprint: Vec<i64> = order
                .iter()
                .flat_map(|&index| {
                    self.players[index]
                        .days()
                        .iter()
                        .map(|day| (day.elo() * 100.0).round() as i64)
                })
                .collect();
            if count > 0 {
                let delta: i64 = fingerprint
                    .iter()
                    .zip(&last_fingerprint)
                    .map(|(new, old)| (new - old).abs())
                    .sum();
                if verbose {
                    info!("iteration {count}: delta {delta}");
                } else {
                    debug!("iteration {count}: delta {delta}");
                }
                if delta > 0 {
                    best_iteration = count;
                }
                if count - best_iteration >= 10 {
                    break;
                }
            }
            last_fingerprint = fingerprint;
            self.run_one_iteration();
            count += 1;
        }
        self.update_uncertainties();
        count
    }

    fn history(&self, player: &Player) -> Vec<RatingPoint> {
        player
            .days()
            .iter()
            .map(|day| RatingPoint {
                time_step: day.time_step(),
                elo: day.elo(),
                stddev_elo: elo_from_natural(day.uncertainty().sqrt()),
            })
            .collect()
    }

    /// Fitted history of one player, creating an empty-history entry for
    /// unknown names.
    pub fn ratings_for_player(&mut self, name: &str) -> Vec<RatingPoint> {
        let PlayerId(index) = self.player_by_name(name);
        self.history(&self.players[index])
    }

    /// Players with at least one day, most recently strongest first.
    fn rated_players(&self) -> Vec<&Player> {
        let mut rated: Vec<&Player> = self
            .players
            .iter()
            .filter(|player| !player.days().is_empty())
            .collect();
        rated.sort_by_key(|player| {
            Reverse(player.days().last().map(|day| OrderedFloat(day.gamma())))
        });
        rated
    }

    /// Every rated player's history, ordered by final gamma descending.
    pub fn get_ordered_ratings(&self) -> Vec<(String, Vec<RatingPoint>)> {
        self.rated_players()
            .into_iter()
            .map(|player| (player.name().to_owned(), self.history(player)))
            .collect()
    }

    /// Joint log-posterior over all rated players at the current ratings.
    pub fn log_likelihood(&self) -> f64 {
        let mut sum = 0.0;
        for (index, player) in self.players.iter().enumerate() {
            if player.days().is_empty() {
                continue;
            }
            let terms = self.day_terms(PlayerId(index));
            sum += player.log_likelihood(&terms);
        }
        sum
    }

    /// One line per rated player: `name\tt0,e0;t1,e1;...`, Elo to two
    /// decimals, strongest first.
    pub fn write_ordered_ratings<W: Write>(&self, mut writer: W) -> io::Result<()> {
        for player in self.rated_players() {
            write!(writer, "{}\t", player.name())?;
            for (i, day) in player.days().iter().enumerate() {
                if i > 0 {
                    write!(writer, ";")?;
                }
                write!(writer, "{},{:.2}", day.time_step(), day.elo())?;
            }
            writeln!(writer)?;
        }
        Ok(())
    }

    pub fn print_ordered_ratings(&self) -> io::Result<()> {
        let stdout = io::stdout();
        self.write_ordered_ratings(stdout.lock())
    }

    /// Probability the current fit assigns to the recorded outcome of
    /// `games()[index]`. Panics if the index is out of bounds.
    pub fn game_likelihood(&self, index: usize) -> f64 {
        self.games[index].likelihood(&self.players)
    }
}
