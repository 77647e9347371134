pub mod engine;
pub mod rules;
pub mod selection;
pub mod session;

pub type Result<T> = anyhow::Result<T>;

pub const START_POSITION_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";
