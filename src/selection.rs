//! Selection cursor over the board.
//!
//! Tracks at most one selected square and the legal destinations for it.
//! The cursor never owns game state; it reads the session and produces a
//! [`Candidate`] when a click completes a move. Promotions resolve to a
//! queen instead of prompting.

use shakmaty::{Role, Square};

use crate::rules::Candidate;
use crate::session::GameSession;

#[derive(Debug, Default)]
pub struct Cursor {
    selected: Option<Selected>,
}

#[derive(Debug)]
struct Selected {
    square: Square,
    destinations: Vec<(Square, bool)>,
}

impl Cursor {
    /// Must be called whenever the authoritative position changes for any
    /// reason (engine moves, undo, reset): the stored destinations would
    /// otherwise refer to a position that no longer exists.
    pub fn clear(&mut self) {
        self.selected = None;
    }

    pub fn selected_square(&self) -> Option<Square> {
        self.selected.as_ref().map(|s| s.square)
    }

    pub fn is_destination(&self, square: Square) -> bool {
        self.selected
            .as_ref()
            .map(|s| s.destinations.iter().any(|(to, _)| *to == square))
            .unwrap_or(false)
    }

    /// Handles a square click. Returns a candidate move when the click
    /// completes one; input is ignored entirely while it is not the human's
    /// turn, an engine request is pending, or the game is over.
    pub fn click(&mut self, square: Square, session: &GameSession) -> Option<Candidate> {
        if !session.human_can_move() {
            return None;
        }

        if self.selected_square() == Some(square) {
            self.clear();
            return None;
        }

        if let Some(selected) = &self.selected {
            if let Some((to, promotes)) = selected
                .destinations
                .iter()
                .copied()
                .find(|(to, _)| *to == square)
            {
                let candidate = Candidate {
                    from: selected.square,
                    to,
                    promotion: promotes.then_some(Role::Queen),
                };
                self.clear();
                return Some(candidate);
            }
        }

        // select or re-target when clicking an own piece, otherwise deselect
        let arbiter = session.arbiter();
        let own_piece = arbiter
            .piece_at(square)
            .map(|piece| piece.color == arbiter.turn())
            .unwrap_or(false);
        if own_piece {
            let destinations = arbiter.destinations_from(square);
            if destinations.is_empty() {
                self.clear();
            } else {
                self.selected = Some(Selected {
                    square,
                    destinations,
                });
            }
        } else {
            self.clear();
        }
        None
    }
}
