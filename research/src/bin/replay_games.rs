use std::{error::Error as StdError, io};

use clap::Parser as _;
use ordered_float::OrderedFloat;
use rayon::prelude::*;
use whr::{Base, Evaluate, GameRecord};
use whr_research::record::RawGame;

#[derive(clap::Parser)]
struct Opt {
    /// Brownian variance per time step, in Elo squared.
    #[clap(long, value_delimiter = ',', num_args = 1.., default_value = "300")]
    w2: Vec<f64>,
    /// First-day virtual draws against a unit-strength opponent.
    #[clap(long, value_delimiter = ',', num_args = 1.., default_value = "2")]
    virtual_games: Vec<u32>,
    /// Fraction of the latest games held out for evaluation.
    #[clap(long, default_value = "0.1")]
    holdout: f64,
}

struct Experiment {
    w2: f64,
    virtual_games: u32,
    sweeps: usize,
    log_likelihood: f64,
    holdout_avg_log_likelihood: f64,
}

impl Experiment {
    fn run(w2: f64, virtual_games: u32, train: &[GameRecord], holdout: &[GameRecord]) -> Experiment {
        let mut base = Base::builder().w2(w2).virtual_games(virtual_games).build();
        base.create_games(train);
        let sweeps = base.iterate_until_converge(false);
        let evaluate = Evaluate::new(&base);
        Experiment {
            w2,
            virtual_games,
            sweeps,
            log_likelihood: base.log_likelihood(),
            holdout_avg_log_likelihood: evaluate.evaluate_ave_log_likelihood_games(holdout, true),
        }
    }

    fn sort_key(&self) -> impl Ord {
        OrderedFloat(self.holdout_avg_log_likelihood)
    }
}

fn main() -> Result<(), Box<dyn StdError>> {
    env_logger::init();
    let opt = Opt::parse();

    let mut reader = csv::Reader::from_reader(io::stdin().lock());
    let mut games: Vec<GameRecord> = Vec::new();
    for raw in reader.deserialize() {
        let raw: RawGame = raw?;
        games.push(raw.into());
    }
    games.sort_by_key(|game| game.time_step);

    let holdout_len = (games.len() as f64 * opt.holdout) as usize;
    let (train, holdout) = games.split_at(games.len() - holdout_len);

    let mut grid: Vec<(f64, u32)> = Vec::new();
    for &w2 in &opt.w2 {
        for &virtual_games in &opt.virtual_games {
            grid.push((w2, virtual_games));
        }
    }

    // Each experiment owns an independent Base, so the grid is free to fan
    // out across threads.
    let mut experiments: Vec<Experiment> = grid
        .par_iter()
        .map(|&(w2, virtual_games)| Experiment::run(w2, virtual_games, train, holdout))
        .collect();

    experiments.sort_by_key(Experiment::sort_key);

    println!("# Experiments: {}", experiments.len());
    println!("# Train games: {}, holdout games: {}", train.len(), holdout.len());
    println!("w2,virtual_games,sweeps,log_likelihood,holdout_avg_log_likelihood");
    for experiment in &experiments {
        println!(
            "{},{},{},{},{}",
            experiment.w2,
            experiment.virtual_games,
            experiment.sweeps,
            experiment.log_likelihood,
            experiment.holdout_avg_log_likelihood
        );
    }

    Ok(())
}
