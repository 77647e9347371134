//! Drives the UCI client from the command line at a few depths, printing the
//! chosen move, evaluation and wall time for each. Handy for checking an
//! engine binary before pointing the game at it.

use std::env;
use std::time::Instant;

use futures::executor::block_on;
use grandmaster::engine::uci::UciEngine;
use grandmaster::engine::{MoveProvider, SearchRequest};
use grandmaster::rules::Arbiter;

fn main() {
    env_logger::init();

    let command = env::args().nth(1).unwrap_or_else(|| "stockfish".to_string());
    probe(&command, 4);
    probe(&command, 8);
    probe(&command, 12);
}

fn probe(command: &str, depth: u32) {
    let arbiter = Arbiter::new();
    let engine = UciEngine::new(command.to_string(), depth);
    let request = SearchRequest {
        fen: arbiter.fen(),
        side_to_move: arbiter.turn(),
        legal_moves: arbiter.legal_moves_uci(),
    };

    let start = Instant::now();
    let reply = block_on(engine.request_move(request));
    let elapsed = start.elapsed();

    match reply {
        Ok(Ok(reply)) => println!(
            "depth {depth}: {} ({}) in {elapsed:?}",
            reply.best_move, reply.evaluation
        ),
        Ok(Err(error)) => println!("depth {depth}: request failed: {error:#}"),
        Err(_) => println!("depth {depth}: the engine worker went away"),
    }
}
