use jdao_types::account::StateInit;
use jdao_types::primitives::{Address, Hash};

use crate::hash::blake3_hash_domain_multi;

const STATE_INIT_CONTEXT: &str = "jdao 2024 state init address";

/// Hash of a contract's initial state: code hash followed by the data bytes.
pub fn state_init_hash(init: &StateInit) -> Hash {
    let code_hash = init.code.repr_hash();
    let data_len = (init.data.len() as u64).to_le_bytes();
    blake3_hash_domain_multi(STATE_INIT_CONTEXT, &[&code_hash, &data_len, &init.data])
}

/// Derive the address a contract with this initial state is deployed at.
pub fn contract_address(workchain: i8, init: &StateInit) -> Address {
    Address::new(workchain, state_init_hash(init))
}

#[cfg(test)]
mod tests {
    use super::*;
    use jdao_types::cell::Cell;
    use jdao_types::primitives::BASECHAIN;
    use proptest::prelude::*;

    fn init(code: &[u8], data: &[u8]) -> StateInit {
        StateInit::new(Cell::from_bytes(code).unwrap(), data.to_vec())
    }

    #[test]
    fn test_address_derivation_deterministic() {
        let a = contract_address(BASECHAIN, &init(b"wallet", &[1, 2, 3]));
        let b = contract_address(BASECHAIN, &init(b"wallet", &[1, 2, 3]));
        assert_eq!(a, b);
    }

    #[test]
    fn test_code_changes_address() {
        let a = contract_address(BASECHAIN, &init(b"wallet", &[1]));
        let b = contract_address(BASECHAIN, &init(b"voting", &[1]));
        assert_ne!(a, b);
    }

    #[test]
    fn test_workchain_is_kept() {
        let addr = contract_address(-1, &init(b"x", &[]));
        assert_eq!(addr.workchain, -1);
    }

    proptest! {
        #[test]
        fn prop_distinct_data_distinct_address(a in any::<Vec<u8>>(), b in any::<Vec<u8>>()) {
            prop_assume!(a != b);
            let code = b"keeper";
            prop_assert_ne!(
                contract_address(BASECHAIN, &init(code, &a)),
                contract_address(BASECHAIN, &init(code, &b))
            );
        }
    }
}
