//! Turn and game orchestration.
//!
//! [`GameSession`] is the single owner of the authoritative position. It
//! decides whose turn it is, when an engine move is wanted, and how the
//! asynchronous engine exchange resolves back into the game. Everything the
//! panels display (status line, evaluation, error banner, last-move
//! highlight) is derived from or stored here.

use shakmaty::{Color, Square};

use crate::engine::{SearchReply, SearchRequest};
use crate::rules::{Actor, Arbiter, Candidate, GameOutcome, MoveRecord};

/// Which side, if any, the engine plays. Fixed for the duration of a game;
/// picking a different assignment starts a new game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opponent {
    /// Both sides are controlled at the board (pass and play).
    Human,
    /// The engine plays the side opposite `human`.
    Engine { human: Color },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    AwaitingEngine { ticket: u64 },
}

/// How a finished engine exchange was classified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineOutcome {
    /// The reply was applied as a move.
    Applied(MoveRecord),
    /// The provider failed or answered with an illegal move; the error is
    /// stored for display and the turn is left unresolved.
    Failed,
    /// The reply belongs to a position that no longer exists and was
    /// discarded without touching any state.
    Stale,
}

pub struct GameSession {
    arbiter: Arbiter,
    start: Arbiter,
    opponent: Opponent,
    phase: Phase,
    /// Bumped whenever the position changes; outstanding engine requests
    /// carry the generation they were issued under.
    generation: u64,
    evaluation: Option<String>,
    error: Option<String>,
    last_move: Option<(Square, Square)>,
}

impl GameSession {
    pub fn new(opponent: Opponent) -> Self {
        Self::from_arbiter(Arbiter::new(), opponent)
    }

    pub fn with_start_fen(opponent: Opponent, fen: &str) -> crate::Result<Self> {
        Ok(Self::from_arbiter(Arbiter::from_fen(fen)?, opponent))
    }

    fn from_arbiter(arbiter: Arbiter, opponent: Opponent) -> Self {
        GameSession {
            start: arbiter.clone(),
            arbiter,
            opponent,
            phase: Phase::Idle,
            generation: 0,
            evaluation: None,
            error: None,
            last_move: None,
        }
    }

    pub fn arbiter(&self) -> &Arbiter {
        &self.arbiter
    }

    pub fn opponent(&self) -> Opponent {
        self.opponent
    }

    pub fn outcome(&self) -> GameOutcome {
        self.arbiter.outcome()
    }

    pub fn is_over(&self) -> bool {
        self.arbiter.is_game_over()
    }

    pub fn awaiting_engine(&self) -> bool {
        matches!(self.phase, Phase::AwaitingEngine { .. })
    }

    pub fn evaluation(&self) -> Option<&str> {
        self.evaluation.as_deref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn last_move(&self) -> Option<(Square, Square)> {
        self.last_move
    }

    /// Whether board input should currently be honored: the game is running,
    /// no engine request is pending, and the side to move is human-controlled.
    pub fn human_can_move(&self) -> bool {
        if self.is_over() || self.awaiting_engine() {
            return false;
        }
        match self.opponent {
            Opponent::Human => true,
            Opponent::Engine { human } => self.arbiter.turn() == human,
        }
    }

    /// Submits a human move. Returns `false` without touching any state when
    /// the move is illegal, it is not the human's turn, an engine request is
    /// pending, or the game is over.
    pub fn submit(&mut self, candidate: Candidate) -> bool {
        if !self.human_can_move() {
            return false;
        }
        match self.arbiter.try_play(&candidate, Actor::Human) {
            Some(record) => {
                self.note_applied(&record);
                true
            }
            None => false,
        }
    }

    fn note_applied(&mut self, record: &MoveRecord) {
        self.last_move = Some((record.from, record.to));
        self.error = None;
        self.generation += 1;
    }

    /// True when it is the engine's turn, the game is running, and no request
    /// is already in flight.
    pub fn wants_engine_move(&self) -> bool {
        if self.is_over() || self.awaiting_engine() {
            return false;
        }
        match self.opponent {
            Opponent::Human => false,
            Opponent::Engine { human } => self.arbiter.turn() != human,
        }
    }

    /// Opens an engine exchange. Returns the request ticket and payload, or
    /// `None` when no engine move is wanted right now (including while a
    /// previous request is still pending).
    pub fn begin_engine_request(&mut self) -> Option<(u64, SearchRequest)> {
        if !self.wants_engine_move() {
            return None;
        }
        let ticket = self.generation;
        self.phase = Phase::AwaitingEngine { ticket };
        Some((
            ticket,
            SearchRequest {
                fen: self.arbiter.fen(),
                side_to_move: self.arbiter.turn(),
                legal_moves: self.arbiter.legal_moves_uci(),
            },
        ))
    }

    /// Resolves an engine exchange. Replies whose ticket no longer matches
    /// the pending request are stale — the position moved on through undo,
    /// reset, or a newer exchange — and are discarded silently.
    pub fn finish_engine_request(
        &mut self,
        ticket: u64,
        result: Result<SearchReply, String>,
    ) -> EngineOutcome {
        match self.phase {
            Phase::AwaitingEngine { ticket: pending } if pending == ticket => {}
            _ => return EngineOutcome::Stale,
        }
        self.phase = Phase::Idle;

        match result {
            Ok(reply) => match self.arbiter.play_uci(&reply.best_move, Actor::Engine) {
                Ok(record) => {
                    self.note_applied(&record);
                    self.evaluation = Some(reply.evaluation);
                    EngineOutcome::Applied(record)
                }
                Err(error) => {
                    self.error = Some(format!(
                        "Engine played an invalid move ({}): {error:#}",
                        reply.best_move
                    ));
                    EngineOutcome::Failed
                }
            },
            Err(message) => {
                self.error = Some(message);
                EngineOutcome::Failed
            }
        }
    }

    /// Reverts to the most recent state in which it was the human's turn.
    ///
    /// Automated replies on top of the history are peeled off first (their
    /// actor tag proves they were engine moves), then one human move is
    /// taken back. A pending engine request is abandoned; its reply will be
    /// detected as stale.
    pub fn undo(&mut self) {
        if self.arbiter.history().is_empty() {
            return;
        }
        self.phase = Phase::Idle;
        if matches!(self.opponent, Opponent::Engine { .. }) {
            while self.arbiter.history().last().map(|r| r.actor) == Some(Actor::Engine) {
                self.arbiter.undo();
            }
        }
        self.arbiter.undo();

        self.last_move = self.arbiter.history().last().map(|r| (r.from, r.to));
        self.evaluation = None;
        self.error = None;
        self.generation += 1;
    }

    /// Starts over from the initial position. Clears every piece of derived
    /// state and invalidates any in-flight engine request.
    pub fn reset(&mut self) {
        self.arbiter = self.start.clone();
        self.phase = Phase::Idle;
        self.evaluation = None;
        self.error = None;
        self.last_move = None;
        self.generation += 1;
    }

    /// The status banner text: empty while the game simply continues.
    pub fn status_line(&self) -> String {
        match self.arbiter.outcome() {
            GameOutcome::Checkmate { winner } => {
                format!("Checkmate! {} wins.", side_name(winner))
            }
            GameOutcome::Draw | GameOutcome::Stalemate => "Draw!".to_string(),
            GameOutcome::Check => "Check!".to_string(),
            GameOutcome::Ongoing => String::new(),
        }
    }
}

pub fn side_name(color: Color) -> &'static str {
    match color {
        Color::White => "White",
        Color::Black => "Black",
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::START_POSITION_FEN;
    use shakmaty::Square;

    fn reply(best_move: &str) -> SearchReply {
        SearchReply {
            best_move: best_move.to_string(),
            evaluation: "Score: -0.3".to_string(),
        }
    }

    fn candidate(from: Square, to: Square) -> Candidate {
        Candidate::new(from, to)
    }

    #[test]
    fn history_parity_matches_side_to_move() {
        let mut session = GameSession::new(Opponent::Human);
        for (from, to) in [
            (Square::E2, Square::E4),
            (Square::E7, Square::E5),
            (Square::G1, Square::F3),
            (Square::B8, Square::C6),
        ] {
            let history = session.arbiter().history().len();
            let white_to_move = session.arbiter().turn() == Color::White;
            assert_eq!(history % 2 == 0, white_to_move);
            assert!(session.submit(candidate(from, to)));
        }
    }

    #[test]
    fn illegal_rejection_is_idempotent() {
        let mut session = GameSession::new(Opponent::Human);
        let before = session.arbiter().fen();
        let from_empty = candidate(Square::E4, Square::E5);

        assert!(!session.submit(from_empty));
        assert_eq!(session.arbiter().fen(), before);
        assert!(!session.submit(from_empty));
        assert_eq!(session.arbiter().fen(), before);
        assert!(session.arbiter().history().is_empty());
    }

    #[test]
    fn undo_after_reset_is_a_no_op() {
        let mut session = GameSession::new(Opponent::Human);
        assert!(session.submit(candidate(Square::E2, Square::E4)));
        session.reset();
        let before = session.arbiter().fen();
        session.undo();
        assert_eq!(session.arbiter().fen(), before);
        assert!(session.arbiter().history().is_empty());
    }

    #[test]
    fn human_move_triggers_exactly_one_engine_move() {
        let mut session = GameSession::new(Opponent::Engine {
            human: Color::White,
        });
        assert!(!session.wants_engine_move());
        assert!(session.submit(candidate(Square::E2, Square::E4)));
        assert!(session.wants_engine_move());

        let (ticket, request) = session.begin_engine_request().expect("engine turn");
        assert_eq!(request.side_to_move, Color::Black);
        assert!(request.legal_moves.contains(&"e7e5".to_string()));
        // a second trigger while the request is pending is suppressed
        assert!(session.begin_engine_request().is_none());
        // and so is board input
        assert!(!session.submit(candidate(Square::D2, Square::D4)));

        let outcome = session.finish_engine_request(ticket, Ok(reply("e7e5")));
        assert!(matches!(outcome, EngineOutcome::Applied(_)));
        let sans: Vec<&str> = session
            .arbiter()
            .history()
            .iter()
            .map(|r| r.san.as_str())
            .collect();
        assert_eq!(sans, vec!["e4", "e5"]);
        assert_eq!(session.evaluation(), Some("Score: -0.3"));
        assert!(!session.wants_engine_move());
        assert!(session.human_can_move());
    }

    #[test]
    fn undo_after_a_full_round_reverts_both_moves() {
        let mut session = GameSession::new(Opponent::Engine {
            human: Color::White,
        });
        assert!(session.submit(candidate(Square::E2, Square::E4)));
        let (ticket, _) = session.begin_engine_request().unwrap();
        session.finish_engine_request(ticket, Ok(reply("e7e5")));

        session.undo();
        assert!(session.arbiter().history().is_empty());
        assert_eq!(session.arbiter().fen(), START_POSITION_FEN);
        assert!(session.evaluation().is_none());
        assert!(session.human_can_move());
    }

    #[test]
    fn undo_while_awaiting_reverts_only_the_human_move() {
        let mut session = GameSession::new(Opponent::Engine {
            human: Color::White,
        });
        assert!(session.submit(candidate(Square::E2, Square::E4)));
        let (ticket, _) = session.begin_engine_request().unwrap();

        session.undo();
        assert!(session.arbiter().history().is_empty());
        assert!(!session.awaiting_engine());

        // the abandoned reply arrives late and is discarded
        let outcome = session.finish_engine_request(ticket, Ok(reply("e7e5")));
        assert_eq!(outcome, EngineOutcome::Stale);
        assert_eq!(session.arbiter().fen(), START_POSITION_FEN);
    }

    #[test]
    fn in_pass_and_play_undo_reverts_one_move() {
        let mut session = GameSession::new(Opponent::Human);
        assert!(session.submit(candidate(Square::E2, Square::E4)));
        assert!(session.submit(candidate(Square::E7, Square::E5)));
        session.undo();
        assert_eq!(session.arbiter().history().len(), 1);
        assert_eq!(session.arbiter().turn(), Color::Black);
    }

    #[test]
    fn provider_error_surfaces_and_clears_the_flag() {
        let mut session = GameSession::new(Opponent::Engine {
            human: Color::White,
        });
        assert!(session.submit(candidate(Square::E2, Square::E4)));
        let (ticket, _) = session.begin_engine_request().unwrap();

        let outcome =
            session.finish_engine_request(ticket, Err("Engine failed to initialize".to_string()));
        assert_eq!(outcome, EngineOutcome::Failed);
        assert_eq!(session.error(), Some("Engine failed to initialize"));
        assert!(!session.awaiting_engine());
        // turn left unresolved: still black to move, history unchanged
        assert_eq!(session.arbiter().turn(), Color::Black);
        assert_eq!(session.arbiter().history().len(), 1);
        // no automatic retry: a fresh request has to be opened explicitly
        assert!(session.wants_engine_move());
    }

    #[test]
    fn illegal_engine_reply_fails_the_request() {
        let mut session = GameSession::new(Opponent::Engine {
            human: Color::White,
        });
        assert!(session.submit(candidate(Square::E2, Square::E4)));
        let (ticket, _) = session.begin_engine_request().unwrap();
        let fen_before = session.arbiter().fen();

        // a white move while black is to play
        let outcome = session.finish_engine_request(ticket, Ok(reply("d2d4")));
        assert_eq!(outcome, EngineOutcome::Failed);
        assert!(session.error().is_some());
        assert!(!session.awaiting_engine());
        assert_eq!(session.arbiter().fen(), fen_before);
        assert_eq!(session.arbiter().turn(), Color::Black);
    }

    #[test]
    fn replies_after_reset_are_stale() {
        let mut session = GameSession::new(Opponent::Engine {
            human: Color::White,
        });
        assert!(session.submit(candidate(Square::E2, Square::E4)));
        let (ticket, _) = session.begin_engine_request().unwrap();

        session.reset();
        let outcome = session.finish_engine_request(ticket, Ok(reply("e7e5")));
        assert_eq!(outcome, EngineOutcome::Stale);
        assert_eq!(session.arbiter().fen(), START_POSITION_FEN);
        assert!(session.arbiter().history().is_empty());
        assert!(session.error().is_none());
    }

    #[test]
    fn checkmate_is_terminal_until_reset() {
        let mut session = GameSession::new(Opponent::Engine {
            human: Color::White,
        });
        // fool's mate, with the engine delivering the blow
        assert!(session.submit(candidate(Square::F2, Square::F3)));
        let (ticket, _) = session.begin_engine_request().unwrap();
        session.finish_engine_request(ticket, Ok(reply("e7e5")));
        assert!(session.submit(candidate(Square::G2, Square::G4)));
        let (ticket, _) = session.begin_engine_request().unwrap();
        session.finish_engine_request(ticket, Ok(reply("d8h4")));

        assert_eq!(
            session.outcome(),
            GameOutcome::Checkmate {
                winner: Color::Black
            }
        );
        assert_eq!(session.status_line(), "Checkmate! Black wins.");

        let fen = session.arbiter().fen();
        assert!(!session.submit(candidate(Square::A2, Square::A3)));
        assert!(!session.wants_engine_move());
        assert!(session.begin_engine_request().is_none());
        assert_eq!(session.arbiter().fen(), fen);

        session.reset();
        assert_eq!(session.outcome(), GameOutcome::Ongoing);
        assert!(session.human_can_move());
    }

    #[test]
    fn engine_opens_when_the_human_plays_black() {
        let mut session = GameSession::new(Opponent::Engine {
            human: Color::Black,
        });
        assert!(session.wants_engine_move());
        assert!(!session.human_can_move());

        let (ticket, request) = session.begin_engine_request().unwrap();
        assert_eq!(request.side_to_move, Color::White);
        session.finish_engine_request(ticket, Ok(reply("e2e4")));
        assert!(session.human_can_move());
        assert!(session.submit(candidate(Square::E7, Square::E5)));
    }

    #[test]
    fn pass_and_play_never_wants_an_engine_move() {
        let mut session = GameSession::new(Opponent::Human);
        assert!(!session.wants_engine_move());
        assert!(session.begin_engine_request().is_none());
        assert!(session.submit(candidate(Square::E2, Square::E4)));
        assert!(!session.wants_engine_move());
        assert!(session.submit(candidate(Square::E7, Square::E5)));
    }

    #[test]
    fn status_line_reports_check_and_draw() {
        let mut session = GameSession::new(Opponent::Human);
        assert!(session.submit(candidate(Square::E2, Square::E4)));
        assert!(session.submit(candidate(Square::D7, Square::D5)));
        assert!(session.submit(candidate(Square::F1, Square::B5)));
        assert_eq!(session.status_line(), "Check!");

        let session = GameSession::with_start_fen(Opponent::Human, "k7/8/1Q6/8/8/8/8/7K b - - 0 1")
            .unwrap();
        assert_eq!(session.status_line(), "Draw!");
        assert!(session.is_over());
    }
}
