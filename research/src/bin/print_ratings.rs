use std::{error::Error as StdError, io};

use clap::Parser as _;
use whr::{Base, GameRecord};
use whr_research::record::RawGame;

#[derive(clap::Parser)]
struct Opt {
    /// Brownian variance per time step, in Elo squared.
    #[clap(long, default_value = "300")]
    w2: f64,
    /// First-day virtual draws against a unit-strength opponent.
    #[clap(long, default_value = "2")]
    virtual_games: u32,
    /// Fixed sweep count; sweeps until convergence when absent.
    #[clap(long)]
    iterations: Option<usize>,
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

    let mut base = Base::builder()
        .w2(opt.w2)
        .virtual_games(opt.virtual_games)
        .build();
    base.create_games(&games);

    match opt.iterations {
        Some(count) => base.iterate(count),
        None => {
            let sweeps = base.iterate_until_converge(true);
            eprintln!("# Converged after {sweeps} sweeps");
        }
    }

    base.print_ordered_ratings()?;
    Ok(())
}
