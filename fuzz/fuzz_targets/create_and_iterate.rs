#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use whr::{Base, Evaluate, Winner};

#[derive(Arbitrary)]
struct ArbitraryGame {
    black: u8,
    white: u8,
    winner: u8,
    time_step: i8,
    handicap: i16,
}

impl ArbitraryGame {
    fn winner(&self) -> Winner {
        match self.winner % 3 {
            0 => Winner::White,
            1 => Winner::Black,
            _ => Winner::Draw,
        }
    }
}

fuzz_target!(|games: Vec<ArbitraryGame>| {
    let mut base = Base::new();
    for game in &games {
        let _ = base.create_game(
            &format!("p{}", game.black % 16),
            &format!("p{}", game.white % 16),
            game.winner(),
            i32::from(game.time_step),
            f64::from(game.handicap),
        );
    }
    base.iterate(3);
    let _ = base.log_likelihood();
    let evaluate = Evaluate::new(&base);
    let _ = evaluate.get_rating("p0", 0, true);
});
