//! Move-token extraction from free-form model output.
//!
//! Models are asked for a bare coordinate move but routinely wrap it in
//! prose. The parser scans for the first substring shaped like a coordinate
//! move and discards everything around it.

use shakmaty::{File, Rank, Role, Square};

/// A proposed move parsed out of raw text.
///
/// Transient: produced once per attempt and discarded after validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveCandidate {
    from: Square,
    to: Square,
    promotion: Option<Role>,
}

impl MoveCandidate {
    /// The origin square.
    pub fn from(&self) -> Square {
        self.from
    }

    /// The destination square.
    pub fn to(&self) -> Square {
        self.to
    }

    /// The promotion piece, if one was written.
    pub fn promotion(&self) -> Option<Role> {
        self.promotion
    }

    /// The candidate in coordinate notation, e.g. `e2e4` or `e7e8q`.
    pub fn uci(&self) -> String {
        let mut out = format!("{}{}", self.from, self.to);
        if let Some(role) = self.promotion {
            out.push(role.char());
        }
        out
    }
}

impl std::fmt::Display for MoveCandidate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.uci())
    }
}

/// Extracts the first coordinate-move token from arbitrary text.
///
/// The pattern is two squares (`[a-h][1-8]` each) with an optional trailing
/// promotion letter from `qrbn`. Matching is case-insensitive, takes the
/// first occurrence, and requires no word boundaries. Returns `None` when
/// the text contains no such substring.
pub fn extract_move(text: &str) -> Option<MoveCandidate> {
    let lower = text.to_lowercase();
    let bytes = lower.as_bytes();
    if bytes.len() < 4 {
        return None;
    }
    for i in 0..=bytes.len() - 4 {
        let (from, to) = match (
            square_at(bytes[i], bytes[i + 1]),
            square_at(bytes[i + 2], bytes[i + 3]),
        ) {
            (Some(from), Some(to)) => (from, to),
            _ => continue,
        };
        // Greedy on the promotion letter when one follows directly.
        let promotion = bytes.get(i + 4).copied().and_then(promotion_role);
        return Some(MoveCandidate {
            from,
            to,
            promotion,
        });
    }
    None
}

fn square_at(file: u8, rank: u8) -> Option<Square> {
    if !(b'a'..=b'h').contains(&file) || !(b'1'..=b'8').contains(&rank) {
        return None;
    }
    Some(Square::from_coords(
        File::new((file - b'a') as u32),
        Rank::new((rank - b'1') as u32),
    ))
}

fn promotion_role(letter: u8) -> Option<Role> {
    match letter {
        b'q' => Some(Role::Queen),
        b'r' => Some(Role::Rook),
        b'b' => Some(Role::Bishop),
        b'n' => Some(Role::Knight),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_token_from_surrounding_prose() {
        let candidate = extract_move("I'll play e2e4 to open.").expect("token present");
        assert_eq!(candidate.uci(), "e2e4");
    }

    #[test]
    fn bare_token_parses() {
        let candidate = extract_move("e2e4").expect("token present");
        assert_eq!(candidate.uci(), "e2e4");
        assert_eq!(candidate.promotion(), None);
    }

    #[test]
    fn first_of_multiple_tokens_wins() {
        let candidate = extract_move("either e2e4 or d2d4 looks fine").expect("token present");
        assert_eq!(candidate.uci(), "e2e4");
    }

    #[test]
    fn promotion_letter_is_captured() {
        let candidate = extract_move("the best move is e7e8q!").expect("token present");
        assert_eq!(candidate.uci(), "e7e8q");
        assert_eq!(candidate.promotion(), Some(Role::Queen));
    }

    #[test]
    fn uppercase_input_is_normalized() {
        let candidate = extract_move("E2E4").expect("token present");
        assert_eq!(candidate.uci(), "e2e4");
    }

    #[test]
    fn token_embedded_in_noise_is_found() {
        let candidate = extract_move("xxa7a8nyy").expect("token present");
        assert_eq!(candidate.uci(), "a7a8n");
    }

    #[test]
    fn no_token_means_no_candidate() {
        assert!(extract_move("z9z9").is_none());
        assert!(extract_move("I resign, you play too well").is_none());
        assert!(extract_move("").is_none());
        assert!(extract_move("e2e").is_none());
    }

    #[test]
    fn non_promotion_trailer_is_ignored() {
        let candidate = extract_move("e2e4, obviously").expect("token present");
        assert_eq!(candidate.uci(), "e2e4");
        assert_eq!(candidate.promotion(), None);
    }
}
