use crate::models::round::Round;

/// Successor of `current` in the interview sequence.
///
/// Total and case-insensitive: the empty round and anything unrecognized
/// start at r1, and r3 leads to the terminal `Final` marker. All round
/// advancement goes through here.
pub fn next_round(current: &str) -> Round {
    match Round::parse(current) {
        Some(Round::R1) => Round::R2,
        Some(Round::R2) => Round::R3,
        Some(Round::R3) => Round::Final,
        _ => Round::R1,
    }
}

/// The round a candidate currently at `round` would be scheduled for.
pub fn successor(round: Round) -> Round {
    next_round(round.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn follows_the_linear_sequence() {
        assert_eq!(next_round(""), Round::R1);
        assert_eq!(next_round("r1"), Round::R2);
        assert_eq!(next_round("r2"), Round::R3);
        assert_eq!(next_round("r3"), Round::Final);
    }

    #[test]
    fn is_case_insensitive() {
        assert_eq!(next_round("R1"), Round::R2);
        assert_eq!(next_round("R3"), Round::Final);
    }

    #[test]
    fn unrecognized_input_starts_over_at_r1() {
        assert_eq!(next_round("round-7"), Round::R1);
        assert_eq!(next_round("final"), Round::R1);
        assert_eq!(successor(Round::None), Round::R1);
        assert_eq!(successor(Round::R2), Round::R3);
    }
}
