use crate::primitives::{Coins, ONE_COIN};

// ─── Jetton Operation Codes ──────────────────────────────────────────────────

pub mod op {
    pub const TRANSFER: u32 = 0x0f8a_7ea5;
    pub const TRANSFER_NOTIFICATION: u32 = 0x7362_d09c;
    pub const INTERNAL_TRANSFER: u32 = 0x178d_4519;
    pub const EXCESSES: u32 = 0xd532_76db;
    pub const BURN: u32 = 0x595f_07bc;
    pub const BURN_NOTIFICATION: u32 = 0x7bdd_97de;
    pub const WITHDRAW_TONS: u32 = 0x6d8e_5e3c;
    pub const WITHDRAW_JETTONS: u32 = 0x768a_50b2;

    pub const MINT: u32 = 21;
    pub const CHANGE_ADMIN: u32 = 3;
    pub const CHANGE_CONTENT: u32 = 4;
    pub const UPGRADE_CODES: u32 = 0x3d5a_b4d7;

    // ─── Governance ──────────────────────────────────────────────────────

    pub const CREATE_VOTING: u32 = 0x1c7f_9a1a;
    pub const INIT_VOTING: u32 = 0x182d_8ddd;
    pub const VOTING_INITIATED: u32 = 0x8e2a_bb23;
    pub const VOTING_CREATED: u32 = 0xc39f_0be6;
    pub const VOTE: u32 = 0x69fb_306c;
    pub const REQUEST_VOTE: u32 = 0x4ee4_a4b1;
    pub const SUBMIT_VOTES: u32 = 0x6edb_1889;
    pub const END_VOTING: u32 = 0x6617_3a45;
    pub const EXECUTE_VOTE_RESULT: u32 = 0x4f0f_7510;
    pub const CONFIRM_VOTING: u32 = 0x39a9_f4d2;
    pub const CONFIRM_VOTE: u32 = 0x6d7f_0c3a;
    pub const VOTE_CONFIRMATION: u32 = 0x5fe9_b8ca;
}

// ─── Exit Codes ──────────────────────────────────────────────────────────────

pub mod exit_code {
    pub const INTEGER_OVERFLOW: u32 = 4;
    pub const INTEGER_OUT_OF_RANGE: u32 = 5;
    pub const CELL_OVERFLOW: u32 = 8;
    pub const CELL_UNDERFLOW: u32 = 9;
    pub const NOT_ENOUGH_VALUE: u32 = 37;

    pub const NOT_ADMIN: u32 = 73;
    pub const UNAUTHORIZED_BURN: u32 = 74;
    pub const UNAUTHORIZED_ROUTING: u32 = 78;
    pub const UPGRADE_NOT_ADMIN: u32 = 79;

    pub const NOT_OWNER: u32 = 705;
    pub const NOT_ENOUGH_JETTONS: u32 = 706;
    pub const UNAUTHORIZED_INCOMING: u32 = 707;

    pub const NOT_FROM_DAO: u32 = 0xf2;
    pub const ALREADY_INITIALIZED: u32 = 0xf3;
    pub const NOT_INITIALIZED: u32 = 0xf4;
    pub const NOT_FROM_KEEPER: u32 = 0xf5;
    pub const VOTING_NOT_FINISHED: u32 = 0xf6;
    pub const EXECUTION_VALUE_TOO_LOW: u32 = 0xf7;
    pub const ALREADY_EXECUTED: u32 = 0xf8;
    pub const VOTING_FINISHED: u32 = 0xf9;
    pub const EXPIRATION_MISMATCH: u32 = 0xf32;
    pub const KEEPER_NOT_FROM_WALLET: u32 = 0x1f4;
    pub const NOTHING_NEW_TO_VOTE: u32 = 0x1f5;
    pub const UNKNOWN_OP: u32 = 0xffff;
}

// ─── Cell Limits ─────────────────────────────────────────────────────────────

/// Maximum number of data bits in a single cell.
pub const MAX_CELL_BITS: usize = 1023;

/// Maximum number of references from a single cell.
pub const MAX_CELL_REFS: usize = 4;

/// Encoded width of an internal address (`addr_std` without anycast).
pub const ADDRESS_BITS: usize = 267;

// ─── Message Values ──────────────────────────────────────────────────────────

/// Value a holder attaches to a vote intent.
pub const VOTE_VALUE: Coins = 100_000_000;

/// Value attached to voting-creation and voting-init messages.
pub const VOTING_DEPLOY_VALUE: Coins = 100_000_000;

/// Default value attached to end-voting requests.
pub const END_VOTING_VALUE: Coins = 100_000_000;

/// Value used for administrative and notification messages.
pub const NOTIFICATION_VALUE: Coins = 10_000_000;

/// Value attached to mint and transfer requests.
pub const JETTON_MSG_VALUE: Coins = ONE_COIN / 10;

/// Forward amount used for transfer notifications.
pub const FORWARD_VALUE: Coins = ONE_COIN / 20;

/// Native balance a wallet keeps when its owner withdraws.
pub const MIN_STORAGE_RESERVE: Coins = 10_000_000;

/// Voting kind used by the minter for proposal-relay votings.
pub const PROPOSAL_VOTING_KIND: u64 = 0;
