use std::fmt;

use futures::channel::oneshot;
use shakmaty::Color;

use crate::Result;

/// An external component that recommends a move for a position.
///
/// The provider answers asynchronously through a oneshot channel; the first
/// request may pay a one-time initialization cost. A provider is free to fail
/// or to answer with a move the rules oracle rejects; callers must treat both
/// as a failed request rather than retry.
pub trait MoveProvider {
    fn request_move(&self, request: SearchRequest) -> oneshot::Receiver<Result<SearchReply>>;
}

#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub fen: String,
    pub side_to_move: Color,
    pub legal_moves: Vec<String>,
}

/// The provider's answer: a move in coordinate notation plus a line of
/// evaluation text for display.
#[derive(Debug, Clone)]
pub struct SearchReply {
    pub best_move: String,
    pub evaluation: String,
}

/// Search evaluation as reported on the engine's info lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Score {
    Centipawns(i32),
    MateIn(i32),
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Score::Centipawns(cp) => {
                let sign = if cp > 0 { "+" } else { "" };
                write!(f, "Score: {}{}", sign, cp as f64 / 100.0)
            }
            Score::MateIn(moves) => write!(f, "Mate in {}", moves.abs()),
        }
    }
}

pub mod uci;

#[cfg(test)]
mod test {
    use super::Score;

    #[test]
    fn score_formatting() {
        assert_eq!(Score::Centipawns(50).to_string(), "Score: +0.5");
        assert_eq!(Score::Centipawns(-125).to_string(), "Score: -1.25");
        assert_eq!(Score::Centipawns(0).to_string(), "Score: 0");
        assert_eq!(Score::MateIn(3).to_string(), "Mate in 3");
        assert_eq!(Score::MateIn(-2).to_string(), "Mate in 2");
    }
}
