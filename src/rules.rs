//! Thin wrapper around the chess rules library.
//!
//! All legality, check and draw knowledge lives in [`shakmaty`]; this module
//! only adds the bookkeeping the rest of the crate needs: a position stack
//! for undo, SAN move records tagged with the actor that produced them, and
//! the derived game outcome.

use anyhow::Context;
use shakmaty::{
    fen::{Epd, Fen},
    san::SanPlus,
    uci::UciMove,
    CastlingMode, Chess, Color, EnPassantMode, Move, Piece, Position, Role, Square,
};

/// Who authored a move. Undo uses this to tell an automated reply apart from
/// a move the player made themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actor {
    Human,
    Engine,
}

/// A move request as it comes from the board: origin, destination and an
/// optional promotion piece. Not validated until submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate {
    pub from: Square,
    pub to: Square,
    pub promotion: Option<Role>,
}

impl Candidate {
    pub fn new(from: Square, to: Square) -> Self {
        Candidate {
            from,
            to,
            promotion: None,
        }
    }

    fn uci_string(&self) -> String {
        match self.promotion {
            Some(role) => format!("{}{}{}", self.from, self.to, role.char()),
            None => format!("{}{}", self.from, self.to),
        }
    }
}

/// An accepted move. `from`/`to` are normalized to the king's travel for
/// castling, matching what the board highlights.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveRecord {
    pub san: String,
    pub from: Square,
    pub to: Square,
    pub capture: Option<Role>,
    pub en_passant: bool,
    pub castle: bool,
    pub promotion: Option<Role>,
    pub actor: Actor,
}

/// Game outcome, derived from the position on demand. Checkmate and draw are
/// mutually exclusive; checkmate wins the tie-break.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameOutcome {
    Ongoing,
    Check,
    Checkmate { winner: Color },
    Stalemate,
    Draw,
}

/// The rules oracle: owns the authoritative position plus the stacks that
/// make undo and repetition detection possible.
#[derive(Debug, Clone)]
pub struct Arbiter {
    position: Chess,
    stack: Vec<Chess>,
    records: Vec<MoveRecord>,
}

impl Default for Arbiter {
    fn default() -> Self {
        Self::new()
    }
}

impl Arbiter {
    pub fn new() -> Self {
        Arbiter {
            position: Chess::default(),
            stack: Vec::new(),
            records: Vec::new(),
        }
    }

    pub fn from_fen(fen: &str) -> crate::Result<Self> {
        let fen: Fen = fen
            .parse()
            .with_context(|| format!("invalid FEN \"{fen}\""))?;
        let position = fen
            .into_position(CastlingMode::Standard)
            .context("FEN does not describe a playable position")?;
        Ok(Arbiter {
            position,
            stack: Vec::new(),
            records: Vec::new(),
        })
    }

    pub fn fen(&self) -> String {
        Fen::from_position(self.position.clone(), EnPassantMode::Legal).to_string()
    }

    pub fn turn(&self) -> Color {
        self.position.turn()
    }

    pub fn piece_at(&self, square: Square) -> Option<Piece> {
        self.position.board().piece_at(square)
    }

    pub fn history(&self) -> &[MoveRecord] {
        &self.records
    }

    /// All legal moves in coordinate notation, the shape the engine provider
    /// is handed alongside the position.
    pub fn legal_moves_uci(&self) -> Vec<String> {
        self.position
            .legal_moves()
            .iter()
            .map(|m| m.to_uci(CastlingMode::Standard).to_string())
            .collect()
    }

    /// Destination squares for the piece on `from`, deduplicated, with a flag
    /// marking destinations that require a promotion choice. Castling shows
    /// up as the king's target square.
    pub fn destinations_from(&self, from: Square) -> Vec<(Square, bool)> {
        let mut out: Vec<(Square, bool)> = Vec::new();
        for m in self.position.legal_moves() {
            if m.from() != Some(from) {
                continue;
            }
            let (to, promotes) = match m.to_uci(CastlingMode::Standard) {
                UciMove::Normal { to, promotion, .. } => (to, promotion.is_some()),
                _ => continue,
            };
            if !out.iter().any(|(seen, _)| *seen == to) {
                out.push((to, promotes));
            }
        }
        out
    }

    /// Validates a candidate against the current position. `None` means the
    /// move is illegal (or it is not that piece's turn); the position is
    /// untouched either way.
    pub fn candidate_move(&self, candidate: &Candidate) -> Option<Move> {
        let uci = UciMove::from_ascii(candidate.uci_string().as_bytes()).ok()?;
        uci.to_move(&self.position).ok()
    }

    pub fn try_play(&mut self, candidate: &Candidate, actor: Actor) -> Option<MoveRecord> {
        let m = self.candidate_move(candidate)?;
        Some(self.play(&m, actor))
    }

    /// Applies a move given in coordinate notation, the format the engine
    /// answers in. Errors if the notation is malformed or the move is not
    /// legal in the current position.
    pub fn play_uci(&mut self, uci: &str, actor: Actor) -> crate::Result<MoveRecord> {
        let parsed = UciMove::from_ascii(uci.as_bytes())
            .with_context(|| format!("malformed move notation \"{uci}\""))?;
        let m = parsed
            .to_move(&self.position)
            .with_context(|| format!("move \"{uci}\" is not legal here"))?;
        Ok(self.play(&m, actor))
    }

    fn play(&mut self, m: &Move, actor: Actor) -> MoveRecord {
        let san = SanPlus::from_move(self.position.clone(), m).to_string();
        let (from, to) = match m.to_uci(CastlingMode::Standard) {
            UciMove::Normal { from, to, .. } => (from, to),
            _ => (m.from().unwrap_or_else(|| m.to()), m.to()),
        };
        let record = MoveRecord {
            san,
            from,
            to,
            capture: m.capture(),
            en_passant: matches!(m, Move::EnPassant { .. }),
            castle: matches!(m, Move::Castle { .. }),
            promotion: m.promotion(),
            actor,
        };

        self.stack.push(self.position.clone());
        self.position.play_unchecked(m);
        self.records.push(record.clone());
        record
    }

    /// Reverts the latest move. Returns `None` when there is nothing to undo.
    pub fn undo(&mut self) -> Option<MoveRecord> {
        let previous = self.stack.pop()?;
        self.position = previous;
        self.records.pop()
    }

    pub fn is_check(&self) -> bool {
        self.position.is_check()
    }

    /// Square of the king currently in check, if any.
    pub fn checked_king(&self) -> Option<Square> {
        if self.position.is_check() {
            self.position.board().king_of(self.position.turn())
        } else {
            None
        }
    }

    pub fn is_draw(&self) -> bool {
        !self.position.is_checkmate()
            && (self.position.is_stalemate()
                || self.position.is_insufficient_material()
                || self.position.halfmoves() >= 100
                || self.repetition_count() >= 3)
    }

    pub fn is_game_over(&self) -> bool {
        self.position.is_checkmate() || self.is_draw()
    }

    pub fn outcome(&self) -> GameOutcome {
        if self.position.is_checkmate() {
            GameOutcome::Checkmate {
                winner: self.position.turn().other(),
            }
        } else if self.position.is_stalemate() {
            GameOutcome::Stalemate
        } else if self.is_draw() {
            GameOutcome::Draw
        } else if self.position.is_check() {
            GameOutcome::Check
        } else {
            GameOutcome::Ongoing
        }
    }

    /// How often the current position has occurred, counting the current one.
    fn repetition_count(&self) -> usize {
        let key = Epd::from_position(self.position.clone(), EnPassantMode::Legal).to_string();
        let earlier = self
            .stack
            .iter()
            .filter(|p| Epd::from_position((*p).clone(), EnPassantMode::Legal).to_string() == key)
            .count();
        earlier + 1
    }

    /// Pieces each side has lost, derived from a census of the board against
    /// the starting piece counts.
    pub fn captured(&self) -> CapturedPieces {
        const STARTING: [(Role, usize); 5] = [
            (Role::Pawn, 8),
            (Role::Knight, 2),
            (Role::Bishop, 2),
            (Role::Rook, 2),
            (Role::Queen, 1),
        ];

        let board = self.position.board();
        let mut captured = CapturedPieces::default();
        for color in [Color::White, Color::Black] {
            for (role, start_count) in STARTING {
                let on_board = Square::ALL
                    .iter()
                    .filter(|sq| board.piece_at(**sq) == Some(Piece { color, role }))
                    .count();
                let lost = start_count.saturating_sub(on_board);
                let list = match color {
                    Color::White => &mut captured.white,
                    Color::Black => &mut captured.black,
                };
                for _ in 0..lost {
                    list.push(role);
                }
            }
        }
        captured
    }
}

/// Pieces lost per side, in pawn-to-queen order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapturedPieces {
    pub white: Vec<Role>,
    pub black: Vec<Role>,
}
