//! Shared fixtures for contract unit tests.

use jdao_types::primitives::Address;

// ─── Test Addresses ──────────────────────────────────────────────────────

/// Test address constant for the first actor.
pub const ALICE: Address = Address::basechain([1u8; 32]);
/// Test address constant for the second actor.
pub const BOB: Address = Address::basechain([2u8; 32]);
/// Test address constant for the third actor.
pub const CHARLIE: Address = Address::basechain([3u8; 32]);
/// Test address constant for the fourth actor.
pub const DAVE: Address = Address::basechain([4u8; 32]);

/// Basechain address whose hash is `n` repeated.
pub fn addr(n: u8) -> Address {
    Address::basechain([n; 32])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_actors_are_distinct() {
        let all = [ALICE, BOB, CHARLIE, DAVE];
        for (i, a) in all.iter().enumerate() {
            for b in &all[i + 1..] {
                assert_ne!(a, b);
            }
        }
        assert_eq!(addr(2), BOB);
    }
}
