//! Position clamping and pre-computed append slots.

use std::collections::HashMap;

use crate::scope::Scope;
use crate::types::Sequence;

/// Clamp an insert position into `[1, count + 1]`.
///
/// Out-of-range targets are tolerated rather than rejected so that clients
/// holding a stale count still land at the nearest end of the list.
pub fn clamp_insert_position(desired: Sequence, count: Sequence) -> Sequence {
    desired.clamp(1, count.max(0) + 1)
}

/// Clamp a move target into `[1, count]`. `count` must be at least 1: the
/// moved row is itself active.
pub fn clamp_move_position(desired: Sequence, count: Sequence) -> Sequence {
    desired.clamp(1, count.max(1))
}

/// Next free end-of-list slot per scope, seeded from one batched
/// max-sequence query.
///
/// Successive [`take`](NextSlots::take) calls for the same scope hand out
/// consecutive sequences, so a batch of appends needs no further reads.
#[derive(Debug, Default, Clone)]
pub struct NextSlots {
    next: HashMap<Scope, Sequence>,
}

impl NextSlots {
    /// Build from `(scope, max active sequence)` pairs. Scopes absent from
    /// the input are treated as empty.
    pub fn from_max(max: impl IntoIterator<Item = (Scope, Sequence)>) -> Self {
        Self {
            next: max.into_iter().map(|(scope, m)| (scope, m + 1)).collect(),
        }
    }

    /// Claim the next slot of `scope`.
    pub fn take(&mut self, scope: Scope) -> Sequence {
        let slot = self.next.entry(scope).or_insert(1);
        let claimed = *slot;
        *slot += 1;
        claimed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::{EntityKind, LinkKind};

    #[test]
    fn insert_position_clamps_to_one_past_end() {
        assert_eq!(clamp_insert_position(0, 3), 1);
        assert_eq!(clamp_insert_position(-4, 3), 1);
        assert_eq!(clamp_insert_position(2, 3), 2);
        assert_eq!(clamp_insert_position(4, 3), 4);
        assert_eq!(clamp_insert_position(99, 3), 4);
        assert_eq!(clamp_insert_position(5, 0), 1);
    }

    #[test]
    fn move_position_clamps_to_last() {
        assert_eq!(clamp_move_position(0, 5), 1);
        assert_eq!(clamp_move_position(6, 5), 5);
        assert_eq!(clamp_move_position(3, 5), 3);
        assert_eq!(clamp_move_position(3, 1), 1);
    }

    #[test]
    fn next_slots_hand_out_consecutive_sequences() {
        let a = Scope::PerOwner(LinkKind::CategoryWorkout, 1);
        let b = Scope::PerOwner(LinkKind::CategoryWorkout, 2);
        let mut slots = NextSlots::from_max([(a, 3)]);
        assert_eq!(slots.take(a), 4);
        assert_eq!(slots.take(a), 5);
        assert_eq!(slots.take(b), 1);
        assert_eq!(slots.take(b), 2);
        assert_eq!(slots.take(Scope::Global(EntityKind::Workout)), 1);
    }
}
