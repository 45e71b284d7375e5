use serde::Deserialize;
use serde_with::{serde_as, DisplayFromStr};
use whr::{GameRecord, Winner};

/// One game row of the input CSV: `black,white,winner,time_step[,handicap]`,
/// with the winner given as `W`, `B` or `D`.
#[serde_as]
#[derive(Debug, Deserialize)]
pub struct RawGame {
    pub black: String,
    pub white: String,
    #[serde_as(as = "DisplayFromStr")]
    pub winner: Winner,
    pub time_step: i32,
    #[serde(default)]
    pub handicap: f64,
}

impl From<RawGame> for GameRecord {
    fn from(raw: RawGame) -> GameRecord {
        GameRecord {
            black: raw.black,
            white: raw.white,
            winner: raw.winner,
            time_step: raw.time_step,
            handicap: raw.handicap,
        }
    }
}
