//! Message bodies exchanged between the DAO actors.
//!
//! Every body starts with `op:uint32 query_id:uint64`, followed by the
//! fields listed on each struct in wire order.

use crate::cell::{Cell, CellBuilder, CellSlice};
use crate::constants::op;
use crate::error::DaoError;
use crate::primitives::{check_timestamp, Address, Coins, QueryId, Timestamp, VotingId};

/// A typed message body with a fixed operation code.
pub trait MessageBody: Sized {
    const OP: u32;

    /// Write the fields that follow `op` and `query_id`.
    fn store_fields(&self, b: &mut CellBuilder) -> Result<(), DaoError>;

    /// Read the fields that follow `op` and `query_id`.
    fn load_fields(query_id: QueryId, s: &mut CellSlice<'_>) -> Result<Self, DaoError>;

    fn query_id(&self) -> QueryId;

    /// Encode the full body including the op code and query id.
    fn to_cell(&self) -> Result<Cell, DaoError> {
        let mut b = CellBuilder::new();
        b.store_uint(Self::OP as u128, 32)?;
        b.store_uint(self.query_id() as u128, 64)?;
        self.store_fields(&mut b)?;
        Ok(b.build())
    }
}

fn store_timestamp(b: &mut CellBuilder, ts: Timestamp) -> Result<(), DaoError> {
    b.store_uint(check_timestamp(ts)? as u128, 48)?;
    Ok(())
}

// ─── Jetton Plumbing ─────────────────────────────────────────────────────────

/// `transfer query_id amount destination response_destination
/// custom_payload:(Maybe ^Cell) forward_ton_amount forward_payload:(Maybe ^Cell)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transfer {
    pub query_id: QueryId,
    pub amount: Coins,
    pub destination: Address,
    pub response_destination: Option<Address>,
    pub custom_payload: Option<Cell>,
    pub forward_ton_amount: Coins,
    pub forward_payload: Option<Cell>,
}

impl MessageBody for Transfer {
    const OP: u32 = op::TRANSFER;

    fn store_fields(&self, b: &mut CellBuilder) -> Result<(), DaoError> {
        b.store_coins(self.amount)?
            .store_address(&self.destination)?
            .store_maybe_address(self.response_destination.as_ref())?
            .store_maybe_ref(self.custom_payload.clone())?
            .store_coins(self.forward_ton_amount)?
            .store_maybe_ref(self.forward_payload.clone())?;
        Ok(())
    }

    fn load_fields(query_id: QueryId, s: &mut CellSlice<'_>) -> Result<Self, DaoError> {
        Ok(Self {
            query_id,
            amount: s.load_coins()?,
            destination: s.load_address()?,
            response_destination: s.load_maybe_address()?,
            custom_payload: s.load_maybe_ref()?,
            forward_ton_amount: s.load_coins()?,
            forward_payload: s.load_maybe_ref()?,
        })
    }

    fn query_id(&self) -> QueryId {
        self.query_id
    }
}

/// `internal_transfer query_id amount from response_address
/// forward_ton_amount forward_payload:(Maybe ^Cell)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InternalTransfer {
    pub query_id: QueryId,
    pub amount: Coins,
    pub from: Address,
    pub response_address: Option<Address>,
    pub forward_ton_amount: Coins,
    pub forward_payload: Option<Cell>,
}

impl MessageBody for InternalTransfer {
    const OP: u32 = op::INTERNAL_TRANSFER;

    fn store_fields(&self, b: &mut CellBuilder) -> Result<(), DaoError> {
        b.store_coins(self.amount)?
            .store_address(&self.from)?
            .store_maybe_address(self.response_address.as_ref())?
            .store_coins(self.forward_ton_amount)?
            .store_maybe_ref(self.forward_payload.clone())?;
        Ok(())
    }

    fn load_fields(query_id: QueryId, s: &mut CellSlice<'_>) -> Result<Self, DaoError> {
        Ok(Self {
            query_id,
            amount: s.load_coins()?,
            from: s.load_address()?,
            response_address: s.load_maybe_address()?,
            forward_ton_amount: s.load_coins()?,
            forward_payload: s.load_maybe_ref()?,
        })
    }

    fn query_id(&self) -> QueryId {
        self.query_id
    }
}

/// `transfer_notification query_id amount sender forward_payload:(Maybe ^Cell)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferNotification {
    pub query_id: QueryId,
    pub amount: Coins,
    pub sender: Address,
    pub forward_payload: Option<Cell>,
}

impl MessageBody for TransferNotification {
    const OP: u32 = op::TRANSFER_NOTIFICATION;

    fn store_fields(&self, b: &mut CellBuilder) -> Result<(), DaoError> {
        b.store_coins(self.amount)?
            .store_address(&self.sender)?
            .store_maybe_ref(self.forward_payload.clone())?;
        Ok(())
    }

    fn load_fields(query_id: QueryId, s: &mut CellSlice<'_>) -> Result<Self, DaoError> {
        Ok(Self {
            query_id,
            amount: s.load_coins()?,
            sender: s.load_address()?,
            forward_payload: s.load_maybe_ref()?,
        })
    }

    fn query_id(&self) -> QueryId {
        self.query_id
    }
}

/// `excesses query_id`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Excesses {
    pub query_id: QueryId,
}

impl MessageBody for Excesses {
    const OP: u32 = op::EXCESSES;

    fn store_fields(&self, _b: &mut CellBuilder) -> Result<(), DaoError> {
        Ok(())
    }

    fn load_fields(query_id: QueryId, _s: &mut CellSlice<'_>) -> Result<Self, DaoError> {
        Ok(Self { query_id })
    }

    fn query_id(&self) -> QueryId {
        self.query_id
    }
}

/// `burn query_id amount response_destination custom_payload:(Maybe ^Cell)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Burn {
    pub query_id: QueryId,
    pub amount: Coins,
    pub response_destination: Option<Address>,
    pub custom_payload: Option<Cell>,
}

impl MessageBody for Burn {
    const OP: u32 = op::BURN;

    fn store_fields(&self, b: &mut CellBuilder) -> Result<(), DaoError> {
        b.store_coins(self.amount)?
            .store_maybe_address(self.response_destination.as_ref())?
            .store_maybe_ref(self.custom_payload.clone())?;
        Ok(())
    }

    fn load_fields(query_id: QueryId, s: &mut CellSlice<'_>) -> Result<Self, DaoError> {
        Ok(Self {
            query_id,
            amount: s.load_coins()?,
            response_destination: s.load_maybe_address()?,
            custom_payload: s.load_maybe_ref()?,
        })
    }

    fn query_id(&self) -> QueryId {
        self.query_id
    }
}

/// `burn_notification query_id amount sender response_destination`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BurnNotification {
    pub query_id: QueryId,
    pub amount: Coins,
    pub sender: Address,
    pub response_destination: Option<Address>,
}

impl MessageBody for BurnNotification {
    const OP: u32 = op::BURN_NOTIFICATION;

    fn store_fields(&self, b: &mut CellBuilder) -> Result<(), DaoError> {
        b.store_coins(self.amount)?
            .store_address(&self.sender)?
            .store_maybe_address(self.response_destination.as_ref())?;
        Ok(())
    }

    fn load_fields(query_id: QueryId, s: &mut CellSlice<'_>) -> Result<Self, DaoError> {
        Ok(Self {
            query_id,
            amount: s.load_coins()?,
            sender: s.load_address()?,
            response_destination: s.load_maybe_address()?,
        })
    }

    fn query_id(&self) -> QueryId {
        self.query_id
    }
}

/// `mint query_id to_address jetton_amount forward_ton_amount`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mint {
    pub query_id: QueryId,
    pub to_address: Address,
    pub jetton_amount: Coins,
    pub forward_ton_amount: Coins,
}

impl MessageBody for Mint {
    const OP: u32 = op::MINT;

    fn store_fields(&self, b: &mut CellBuilder) -> Result<(), DaoError> {
        b.store_address(&self.to_address)?
            .store_coins(self.jetton_amount)?
            .store_coins(self.forward_ton_amount)?;
        Ok(())
    }

    fn load_fields(query_id: QueryId, s: &mut CellSlice<'_>) -> Result<Self, DaoError> {
        Ok(Self {
            query_id,
            to_address: s.load_address()?,
            jetton_amount: s.load_coins()?,
            forward_ton_amount: s.load_coins()?,
        })
    }

    fn query_id(&self) -> QueryId {
        self.query_id
    }
}

/// `change_admin query_id new_admin`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeAdmin {
    pub query_id: QueryId,
    pub new_admin: Address,
}

impl MessageBody for ChangeAdmin {
    const OP: u32 = op::CHANGE_ADMIN;

    fn store_fields(&self, b: &mut CellBuilder) -> Result<(), DaoError> {
        b.store_address(&self.new_admin)?;
        Ok(())
    }

    fn load_fields(query_id: QueryId, s: &mut CellSlice<'_>) -> Result<Self, DaoError> {
        Ok(Self {
            query_id,
            new_admin: s.load_address()?,
        })
    }

    fn query_id(&self) -> QueryId {
        self.query_id
    }
}

/// `change_content query_id content:^Cell`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeContent {
    pub query_id: QueryId,
    pub content: Cell,
}

impl MessageBody for ChangeContent {
    const OP: u32 = op::CHANGE_CONTENT;

    fn store_fields(&self, b: &mut CellBuilder) -> Result<(), DaoError> {
        b.store_ref(self.content.clone())?;
        Ok(())
    }

    fn load_fields(query_id: QueryId, s: &mut CellSlice<'_>) -> Result<Self, DaoError> {
        Ok(Self {
            query_id,
            content: s.load_ref()?,
        })
    }

    fn query_id(&self) -> QueryId {
        self.query_id
    }
}

/// `upgrade_codes query_id new_code:^Cell new_voting_code:(Maybe ^Cell)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpgradeCodes {
    pub query_id: QueryId,
    pub new_code: Cell,
    pub new_voting_code: Option<Cell>,
}

impl MessageBody for UpgradeCodes {
    const OP: u32 = op::UPGRADE_CODES;

    fn store_fields(&self, b: &mut CellBuilder) -> Result<(), DaoError> {
        b.store_ref(self.new_code.clone())?
            .store_maybe_ref(self.new_voting_code.clone())?;
        Ok(())
    }

    fn load_fields(query_id: QueryId, s: &mut CellSlice<'_>) -> Result<Self, DaoError> {
        Ok(Self {
            query_id,
            new_code: s.load_ref()?,
            new_voting_code: s.load_maybe_ref()?,
        })
    }

    fn query_id(&self) -> QueryId {
        self.query_id
    }
}

// ─── Voting Lifecycle ────────────────────────────────────────────────────────

/// `create_voting query_id expiration_date:uint48 minimal_execution_amount
/// payload:^Cell`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateVoting {
    pub query_id: QueryId,
    pub expiration_date: Timestamp,
    pub minimal_execution_amount: Coins,
    pub payload: Cell,
}

impl MessageBody for CreateVoting {
    const OP: u32 = op::CREATE_VOTING;

    fn store_fields(&self, b: &mut CellBuilder) -> Result<(), DaoError> {
        store_timestamp(b, self.expiration_date)?;
        b.store_coins(self.minimal_execution_amount)?
            .store_ref(self.payload.clone())?;
        Ok(())
    }

    fn load_fields(query_id: QueryId, s: &mut CellSlice<'_>) -> Result<Self, DaoError> {
        Ok(Self {
            query_id,
            expiration_date: s.load_u48()?,
            minimal_execution_amount: s.load_coins()?,
            payload: s.load_ref()?,
        })
    }

    fn query_id(&self) -> QueryId {
        self.query_id
    }
}

/// `init_voting query_id expiration_date:uint48 voting_kind:uint64
/// wallet_code:^Cell keeper_code:^Cell proposal:^Cell initiator`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitVoting {
    pub query_id: QueryId,
    pub expiration_date: Timestamp,
    pub voting_kind: u64,
    pub wallet_code: Cell,
    pub keeper_code: Cell,
    pub proposal: Cell,
    pub initiator: Address,
}

impl MessageBody for InitVoting {
    const OP: u32 = op::INIT_VOTING;

    fn store_fields(&self, b: &mut CellBuilder) -> Result<(), DaoError> {
        store_timestamp(b, self.expiration_date)?;
        b.store_uint(self.voting_kind as u128, 64)?
            .store_ref(self.wallet_code.clone())?
            .store_ref(self.keeper_code.clone())?
            .store_ref(self.proposal.clone())?
            .store_address(&self.initiator)?;
        Ok(())
    }

    fn load_fields(query_id: QueryId, s: &mut CellSlice<'_>) -> Result<Self, DaoError> {
        Ok(Self {
            query_id,
            expiration_date: s.load_u48()?,
            voting_kind: s.load_u64()?,
            wallet_code: s.load_ref()?,
            keeper_code: s.load_ref()?,
            proposal: s.load_ref()?,
            initiator: s.load_address()?,
        })
    }

    fn query_id(&self) -> QueryId {
        self.query_id
    }
}

/// `voting_initiated query_id voting_id:uint64 expiration_date:uint48 initiator`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VotingInitiated {
    pub query_id: QueryId,
    pub voting_id: VotingId,
    pub expiration_date: Timestamp,
    pub initiator: Address,
}

impl MessageBody for VotingInitiated {
    const OP: u32 = op::VOTING_INITIATED;

    fn store_fields(&self, b: &mut CellBuilder) -> Result<(), DaoError> {
        b.store_uint(self.voting_id as u128, 64)?;
        store_timestamp(b, self.expiration_date)?;
        b.store_address(&self.initiator)?;
        Ok(())
    }

    fn load_fields(query_id: QueryId, s: &mut CellSlice<'_>) -> Result<Self, DaoError> {
        Ok(Self {
            query_id,
            voting_id: s.load_u64()?,
            expiration_date: s.load_u48()?,
            initiator: s.load_address()?,
        })
    }

    fn query_id(&self) -> QueryId {
        self.query_id
    }
}

/// `voting_created query_id voting_address`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VotingCreated {
    pub query_id: QueryId,
    pub voting_address: Address,
}

impl MessageBody for VotingCreated {
    const OP: u32 = op::VOTING_CREATED;

    fn store_fields(&self, b: &mut CellBuilder) -> Result<(), DaoError> {
        b.store_address(&self.voting_address)?;
        Ok(())
    }

    fn load_fields(query_id: QueryId, s: &mut CellSlice<'_>) -> Result<Self, DaoError> {
        Ok(Self {
            query_id,
            voting_address: s.load_address()?,
        })
    }

    fn query_id(&self) -> QueryId {
        self.query_id
    }
}

/// `vote query_id voting_address expiration_date:uint48 vote:Bool
/// need_confirmation:Bool`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vote {
    pub query_id: QueryId,
    pub voting_address: Address,
    pub expiration_date: Timestamp,
    pub vote_for: bool,
    pub need_confirmation: bool,
}

impl MessageBody for Vote {
    const OP: u32 = op::VOTE;

    fn store_fields(&self, b: &mut CellBuilder) -> Result<(), DaoError> {
        b.store_address(&self.voting_address)?;
        store_timestamp(b, self.expiration_date)?;
        b.store_bit(self.vote_for)?
            .store_bit(self.need_confirmation)?;
        Ok(())
    }

    fn load_fields(query_id: QueryId, s: &mut CellSlice<'_>) -> Result<Self, DaoError> {
        Ok(Self {
            query_id,
            voting_address: s.load_address()?,
            expiration_date: s.load_u48()?,
            vote_for: s.load_bit()?,
            need_confirmation: s.load_bit()?,
        })
    }

    fn query_id(&self) -> QueryId {
        self.query_id
    }
}

/// Shared layout of `request_vote` and `submit_votes`:
/// `query_id voter expiration_date:uint48 weight:Coins vote_for:Bool confirm:Bool`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteWeight {
    pub query_id: QueryId,
    pub voter: Address,
    pub expiration_date: Timestamp,
    pub weight: Coins,
    pub vote_for: bool,
    pub confirm: bool,
}

impl VoteWeight {
    fn store(&self, b: &mut CellBuilder) -> Result<(), DaoError> {
        b.store_address(&self.voter)?;
        store_timestamp(b, self.expiration_date)?;
        b.store_coins(self.weight)?
            .store_bit(self.vote_for)?
            .store_bit(self.confirm)?;
        Ok(())
    }

    fn load(query_id: QueryId, s: &mut CellSlice<'_>) -> Result<Self, DaoError> {
        Ok(Self {
            query_id,
            voter: s.load_address()?,
            expiration_date: s.load_u48()?,
            weight: s.load_coins()?,
            vote_for: s.load_bit()?,
            confirm: s.load_bit()?,
        })
    }
}

/// Wallet to keeper: the voter's full current weight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestVote(pub VoteWeight);

impl MessageBody for RequestVote {
    const OP: u32 = op::REQUEST_VOTE;

    fn store_fields(&self, b: &mut CellBuilder) -> Result<(), DaoError> {
        self.0.store(b)
    }

    fn load_fields(query_id: QueryId, s: &mut CellSlice<'_>) -> Result<Self, DaoError> {
        VoteWeight::load(query_id, s).map(Self)
    }

    fn query_id(&self) -> QueryId {
        self.0.query_id
    }
}

/// Keeper to voting: only the increase over the previously recorded weight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitVotes(pub VoteWeight);

impl MessageBody for SubmitVotes {
    const OP: u32 = op::SUBMIT_VOTES;

    fn store_fields(&self, b: &mut CellBuilder) -> Result<(), DaoError> {
        self.0.store(b)
    }

    fn load_fields(query_id: QueryId, s: &mut CellSlice<'_>) -> Result<Self, DaoError> {
        VoteWeight::load(query_id, s).map(Self)
    }

    fn query_id(&self) -> QueryId {
        self.0.query_id
    }
}

/// `end_voting query_id`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndVoting {
    pub query_id: QueryId,
}

impl MessageBody for EndVoting {
    const OP: u32 = op::END_VOTING;

    fn store_fields(&self, _b: &mut CellBuilder) -> Result<(), DaoError> {
        Ok(())
    }

    fn load_fields(query_id: QueryId, _s: &mut CellSlice<'_>) -> Result<Self, DaoError> {
        Ok(Self { query_id })
    }

    fn query_id(&self) -> QueryId {
        self.query_id
    }
}

/// `execute_vote_result query_id voting_id:uint64 expiration_date:uint48
/// voted_for:Coins voted_against:Coins payload:^Cell`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecuteVoteResult {
    pub query_id: QueryId,
    pub voting_id: VotingId,
    pub expiration_date: Timestamp,
    pub voted_for: Coins,
    pub voted_against: Coins,
    pub payload: Cell,
}

impl MessageBody for ExecuteVoteResult {
    const OP: u32 = op::EXECUTE_VOTE_RESULT;

    fn store_fields(&self, b: &mut CellBuilder) -> Result<(), DaoError> {
        b.store_uint(self.voting_id as u128, 64)?;
        store_timestamp(b, self.expiration_date)?;
        b.store_coins(self.voted_for)?
            .store_coins(self.voted_against)?
            .store_ref(self.payload.clone())?;
        Ok(())
    }

    fn load_fields(query_id: QueryId, s: &mut CellSlice<'_>) -> Result<Self, DaoError> {
        Ok(Self {
            query_id,
            voting_id: s.load_u64()?,
            expiration_date: s.load_u48()?,
            voted_for: s.load_coins()?,
            voted_against: s.load_coins()?,
            payload: s.load_ref()?,
        })
    }

    fn query_id(&self) -> QueryId {
        self.query_id
    }
}

/// `confirm_voting query_id voting_id:uint64 voter`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmVoting {
    pub query_id: QueryId,
    pub voting_id: VotingId,
    pub voter: Address,
}

impl MessageBody for ConfirmVoting {
    const OP: u32 = op::CONFIRM_VOTING;

    fn store_fields(&self, b: &mut CellBuilder) -> Result<(), DaoError> {
        b.store_uint(self.voting_id as u128, 64)?
            .store_address(&self.voter)?;
        Ok(())
    }

    fn load_fields(query_id: QueryId, s: &mut CellSlice<'_>) -> Result<Self, DaoError> {
        Ok(Self {
            query_id,
            voting_id: s.load_u64()?,
            voter: s.load_address()?,
        })
    }

    fn query_id(&self) -> QueryId {
        self.query_id
    }
}

/// `confirm_vote query_id`, minter to the voter's wallet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfirmVote {
    pub query_id: QueryId,
}

impl MessageBody for ConfirmVote {
    const OP: u32 = op::CONFIRM_VOTE;

    fn store_fields(&self, _b: &mut CellBuilder) -> Result<(), DaoError> {
        Ok(())
    }

    fn load_fields(query_id: QueryId, _s: &mut CellSlice<'_>) -> Result<Self, DaoError> {
        Ok(Self { query_id })
    }

    fn query_id(&self) -> QueryId {
        self.query_id
    }
}

/// `vote_confirmation query_id`, wallet to its owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoteConfirmation {
    pub query_id: QueryId,
}

impl MessageBody for VoteConfirmation {
    const OP: u32 = op::VOTE_CONFIRMATION;

    fn store_fields(&self, _b: &mut CellBuilder) -> Result<(), DaoError> {
        Ok(())
    }

    fn load_fields(query_id: QueryId, _s: &mut CellSlice<'_>) -> Result<Self, DaoError> {
        Ok(Self { query_id })
    }

    fn query_id(&self) -> QueryId {
        self.query_id
    }
}

// ─── Wallet Maintenance ──────────────────────────────────────────────────────

/// `withdraw_tons query_id`, owner to wallet: return surplus native value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WithdrawTons {
    pub query_id: QueryId,
}

impl MessageBody for WithdrawTons {
    const OP: u32 = op::WITHDRAW_TONS;

    fn store_fields(&self, _b: &mut CellBuilder) -> Result<(), DaoError> {
        Ok(())
    }

    fn load_fields(query_id: QueryId, _s: &mut CellSlice<'_>) -> Result<Self, DaoError> {
        Ok(Self { query_id })
    }

    fn query_id(&self) -> QueryId {
        self.query_id
    }
}

/// `withdraw_jettons query_id wallet amount custom_payload:(Maybe ^Cell)`
///
/// Owner to wallet: move jettons that some other jetton wallet holds on
/// behalf of this wallet back to the owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WithdrawJettons {
    pub query_id: QueryId,
    pub wallet: Address,
    pub amount: Coins,
    pub custom_payload: Option<Cell>,
}

impl MessageBody for WithdrawJettons {
    const OP: u32 = op::WITHDRAW_JETTONS;

    fn store_fields(&self, b: &mut CellBuilder) -> Result<(), DaoError> {
        b.store_address(&self.wallet)?
            .store_coins(self.amount)?
            .store_maybe_ref(self.custom_payload.clone())?;
        Ok(())
    }

    fn load_fields(query_id: QueryId, s: &mut CellSlice<'_>) -> Result<Self, DaoError> {
        Ok(Self {
            query_id,
            wallet: s.load_address()?,
            amount: s.load_coins()?,
            custom_payload: s.load_maybe_ref()?,
        })
    }

    fn query_id(&self) -> QueryId {
        self.query_id
    }
}

// ─── Dispatch ────────────────────────────────────────────────────────────────

macro_rules! bodies {
    ($($variant:ident),* $(,)?) => {
        /// Any inbound body, decoded by its op code.
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub enum Body {
            /// A body with no bits and no refs (plain value transfer).
            Empty,
            /// A well-formed op the receiver does not know.
            Unknown { op: u32 },
            $($variant($variant),)*
        }

        impl Body {
            /// Decode a body. Known ops with malformed fields are a cell underflow.
            pub fn parse(cell: &Cell) -> Result<Body, DaoError> {
                if cell.is_empty() {
                    return Ok(Body::Empty);
                }
                let mut s = cell.parse();
                let op = s.load_u32()?;
                match op {
                    $(<$variant as MessageBody>::OP => {
                        let query_id = s.load_u64()?;
                        Ok(Body::$variant(<$variant>::load_fields(query_id, &mut s)?))
                    })*
                    other => Ok(Body::Unknown { op: other }),
                }
            }

            /// Operation code, if the body carries one.
            pub fn op(&self) -> Option<u32> {
                match self {
                    Body::Empty => None,
                    Body::Unknown { op } => Some(*op),
                    $(Body::$variant(_) => Some(<$variant as MessageBody>::OP),)*
                }
            }

            /// Human-readable name used in transaction logs.
            pub fn name(&self) -> &'static str {
                match self {
                    Body::Empty => "empty",
                    Body::Unknown { .. } => "unknown",
                    $(Body::$variant(_) => stringify!($variant),)*
                }
            }

            pub fn to_cell(&self) -> Result<Cell, DaoError> {
                match self {
                    Body::Empty => Ok(Cell::empty()),
                    Body::Unknown { op } => {
                        let mut b = CellBuilder::new();
                        b.store_uint(*op as u128, 32)?;
                        Ok(b.build())
                    }
                    $(Body::$variant(m) => m.to_cell(),)*
                }
            }
        }

        $(impl From<$variant> for Body {
            fn from(m: $variant) -> Body {
                Body::$variant(m)
            }
        })*
    };
}

bodies!(
    Transfer,
    InternalTransfer,
    TransferNotification,
    Excesses,
    Burn,
    BurnNotification,
    Mint,
    ChangeAdmin,
    ChangeContent,
    UpgradeCodes,
    CreateVoting,
    InitVoting,
    VotingInitiated,
    VotingCreated,
    Vote,
    RequestVote,
    SubmitVotes,
    EndVoting,
    ExecuteVoteResult,
    ConfirmVoting,
    ConfirmVote,
    VoteConfirmation,
    WithdrawTons,
    WithdrawJettons,
);

// ─── Relayed Messages ────────────────────────────────────────────────────────

/// An internal message carried inside a proposal and sent verbatim by the
/// minter once the proposal passes.
///
/// Layout follows `int_msg_info$0` with an empty source, zero fees, no
/// state init and the body in a reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InternalMessage {
    pub bounce: bool,
    pub dest: Address,
    pub value: Coins,
    pub body: Cell,
}

impl InternalMessage {
    pub fn to_cell(&self) -> Result<Cell, DaoError> {
        let mut b = CellBuilder::new();
        b.store_bit(false)? // int_msg_info$0
            .store_bit(true)? // ihr_disabled
            .store_bit(self.bounce)?
            .store_bit(false)? // bounced
            .store_maybe_address(None)?
            .store_address(&self.dest)?
            .store_coins(self.value)?
            .store_bit(false)? // no extra currencies
            .store_coins(0)? // ihr_fee
            .store_coins(0)? // fwd_fee
            .store_uint(0, 64)? // created_lt
            .store_uint(0, 32)? // created_at
            .store_bit(false)? // no state init
            .store_bit(true)?
            .store_ref(self.body.clone())?;
        Ok(b.build())
    }

    pub fn parse(cell: &Cell) -> Result<Self, DaoError> {
        let mut s = cell.parse();
        if s.load_bit()? {
            return Err(DaoError::underflow("relayed message is not internal"));
        }
        let _ihr_disabled = s.load_bit()?;
        let bounce = s.load_bit()?;
        let _bounced = s.load_bit()?;
        let _src = s.load_maybe_address()?;
        let dest = s.load_address()?;
        let value = s.load_coins()?;
        if s.load_bit()? {
            return Err(DaoError::underflow("extra currencies are not supported"));
        }
        let _ihr_fee = s.load_coins()?;
        let _fwd_fee = s.load_coins()?;
        let _created_lt = s.load_u64()?;
        let _created_at = s.load_u32()?;
        if s.load_bit()? {
            return Err(DaoError::underflow("state init in relayed message"));
        }
        let body = if s.load_bit()? {
            s.load_ref()?
        } else {
            s.load_remainder()?
        };
        Ok(Self {
            bounce,
            dest,
            value,
            body,
        })
    }
}

/// Bounceable internal message a passed proposal relays from the minter.
pub fn relay_payload(dest: Address, value: Coins, body: Cell) -> Result<Cell, DaoError> {
    InternalMessage {
        bounce: true,
        dest,
        value,
        body,
    }
    .to_cell()
}

/// What a voting decides on: the minimal value `end_voting` must carry and
/// the message the DAO relays on success.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Proposal {
    pub minimal_execution_amount: Coins,
    pub payload: Cell,
}

impl Proposal {
    pub fn to_cell(&self) -> Result<Cell, DaoError> {
        let mut b = CellBuilder::new();
        b.store_coins(self.minimal_execution_amount)?
            .store_ref(self.payload.clone())?;
        Ok(b.build())
    }

    pub fn parse(cell: &Cell) -> Result<Self, DaoError> {
        let mut s = cell.parse();
        Ok(Self {
            minimal_execution_amount: s.load_coins()?,
            payload: s.load_ref()?,
        })
    }
}
