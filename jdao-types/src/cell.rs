//! Bit-level cell codec used for every message body and code reference.
//!
//! A [`Cell`] holds up to 1023 data bits and up to 4 references to child
//! cells. [`CellBuilder`] appends fields most-significant-bit first and
//! [`CellSlice`] reads them back in the same order, so a body written as
//! `op:uint32 query_id:uint64 ...` has exactly that bit layout.

use std::fmt;

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use crate::constants::{MAX_CELL_BITS, MAX_CELL_REFS};
use crate::error::DaoError;
use crate::primitives::{Address, Coins, Hash, MAX_COINS};

/// An immutable bag of bits with child references.
#[derive(
    Debug,
    Clone,
    Default,
    PartialEq,
    Eq,
    Hash,
    BorshSerialize,
    BorshDeserialize,
    Serialize,
    Deserialize,
)]
pub struct Cell {
    data: Vec<u8>,
    bit_len: u16,
    refs: Vec<Cell>,
}

impl Cell {
    /// The empty cell (no bits, no refs).
    pub fn empty() -> Self {
        Self::default()
    }

    /// A cell holding the given bytes as data bits.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DaoError> {
        let mut b = CellBuilder::new();
        b.store_bytes(bytes)?;
        Ok(b.build())
    }

    /// A 256-bit cell holding a hash. Used for code identifiers.
    pub fn from_hash(hash: Hash) -> Self {
        Cell {
            data: hash.to_vec(),
            bit_len: 256,
            refs: Vec::new(),
        }
    }

    /// Number of data bits.
    pub fn bit_len(&self) -> usize {
        self.bit_len as usize
    }

    /// Child references.
    pub fn refs(&self) -> &[Cell] {
        &self.refs
    }

    /// True when the cell carries neither bits nor refs.
    pub fn is_empty(&self) -> bool {
        self.bit_len == 0 && self.refs.is_empty()
    }

    /// Start reading the cell from its first bit.
    pub fn parse(&self) -> CellSlice<'_> {
        CellSlice {
            cell: self,
            bit_pos: 0,
            ref_pos: 0,
        }
    }

    /// Representation hash over the bit length, data and child hashes.
    pub fn repr_hash(&self) -> Hash {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&self.bit_len.to_be_bytes());
        hasher.update(&self.data);
        hasher.update(&[self.refs.len() as u8]);
        for r in &self.refs {
            hasher.update(&r.repr_hash());
        }
        *hasher.finalize().as_bytes()
    }

    fn bit_at(&self, pos: usize) -> bool {
        (self.data[pos / 8] >> (7 - pos % 8)) & 1 == 1
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "x{{{}}}", hex::encode(&self.data))?;
        if !self.refs.is_empty() {
            write!(f, "+{}refs", self.refs.len())?;
        }
        Ok(())
    }
}

/// Appends fields to a new cell.
#[derive(Debug, Clone, Default)]
pub struct CellBuilder {
    data: Vec<u8>,
    bit_len: usize,
    refs: Vec<Cell>,
}

impl CellBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bits still available in this cell.
    pub fn remaining_bits(&self) -> usize {
        MAX_CELL_BITS - self.bit_len
    }

    fn reserve_bits(&self, bits: usize) -> Result<(), DaoError> {
        if self.bit_len + bits > MAX_CELL_BITS {
            return Err(DaoError::CellOverflow {
                bits: self.bit_len + bits,
                refs: self.refs.len(),
            });
        }
        Ok(())
    }

    fn push_bit(&mut self, bit: bool) {
        if self.bit_len % 8 == 0 {
            self.data.push(0);
        }
        if bit {
            self.data[self.bit_len / 8] |= 0x80 >> (self.bit_len % 8);
        }
        self.bit_len += 1;
    }

    pub fn store_bit(&mut self, bit: bool) -> Result<&mut Self, DaoError> {
        self.reserve_bits(1)?;
        self.push_bit(bit);
        Ok(self)
    }

    /// Store an unsigned integer in exactly `bits` bits (at most 128).
    pub fn store_uint(&mut self, value: u128, bits: usize) -> Result<&mut Self, DaoError> {
        if bits > 128 || (bits < 128 && value >> bits != 0) {
            return Err(DaoError::IntegerOutOfRange { value, bits });
        }
        self.reserve_bits(bits)?;
        for i in (0..bits).rev() {
            self.push_bit((value >> i) & 1 == 1);
        }
        Ok(self)
    }

    /// Store a signed 8-bit integer in two's complement.
    pub fn store_i8(&mut self, value: i8) -> Result<&mut Self, DaoError> {
        self.store_uint(value as u8 as u128, 8)
    }

    pub fn store_bytes(&mut self, bytes: &[u8]) -> Result<&mut Self, DaoError> {
        self.reserve_bits(bytes.len() * 8)?;
        for &byte in bytes {
            for i in (0..8).rev() {
                self.push_bit((byte >> i) & 1 == 1);
            }
        }
        Ok(self)
    }

    /// `VarUInteger 16`: 4-bit byte length followed by the big-endian value.
    pub fn store_coins(&mut self, value: Coins) -> Result<&mut Self, DaoError> {
        if value > MAX_COINS {
            return Err(DaoError::IntegerOutOfRange { value, bits: 120 });
        }
        let len = (128 - value.leading_zeros() as usize).div_ceil(8);
        self.store_uint(len as u128, 4)?;
        self.store_uint(value, len * 8)
    }

    /// `addr_std$10 anycast:(Maybe Anycast) workchain_id:int8 address:bits256`.
    pub fn store_address(&mut self, addr: &Address) -> Result<&mut Self, DaoError> {
        self.reserve_bits(crate::constants::ADDRESS_BITS)?;
        self.store_uint(0b10, 2)?;
        self.store_bit(false)?;
        self.store_i8(addr.workchain)?;
        self.store_bytes(&addr.hash)
    }

    /// `addr_none$00` for `None`, otherwise a standard address.
    pub fn store_maybe_address(&mut self, addr: Option<&Address>) -> Result<&mut Self, DaoError> {
        match addr {
            Some(a) => self.store_address(a),
            None => self.store_uint(0, 2),
        }
    }

    pub fn store_ref(&mut self, cell: Cell) -> Result<&mut Self, DaoError> {
        if self.refs.len() >= MAX_CELL_REFS {
            return Err(DaoError::CellOverflow {
                bits: self.bit_len,
                refs: self.refs.len() + 1,
            });
        }
        self.refs.push(cell);
        Ok(self)
    }

    /// One presence bit, then the reference when present.
    pub fn store_maybe_ref(&mut self, cell: Option<Cell>) -> Result<&mut Self, DaoError> {
        match cell {
            Some(c) => {
                self.store_bit(true)?;
                self.store_ref(c)
            }
            None => self.store_bit(false),
        }
    }

    pub fn build(self) -> Cell {
        Cell {
            data: self.data,
            bit_len: self.bit_len as u16,
            refs: self.refs,
        }
    }
}

/// Sequential reader over a cell's bits and references.
#[derive(Debug, Clone)]
pub struct CellSlice<'a> {
    cell: &'a Cell,
    bit_pos: usize,
    ref_pos: usize,
}

impl<'a> CellSlice<'a> {
    pub fn remaining_bits(&self) -> usize {
        self.cell.bit_len() - self.bit_pos
    }

    pub fn remaining_refs(&self) -> usize {
        self.cell.refs.len() - self.ref_pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining_bits() == 0 && self.remaining_refs() == 0
    }

    fn need_bits(&self, bits: usize, what: &str) -> Result<(), DaoError> {
        if self.remaining_bits() < bits {
            return Err(DaoError::underflow(format!(
                "{}: need {} bits, {} left",
                what,
                bits,
                self.remaining_bits()
            )));
        }
        Ok(())
    }

    pub fn load_bit(&mut self) -> Result<bool, DaoError> {
        self.need_bits(1, "bit")?;
        let bit = self.cell.bit_at(self.bit_pos);
        self.bit_pos += 1;
        Ok(bit)
    }

    pub fn load_uint(&mut self, bits: usize) -> Result<u128, DaoError> {
        if bits > 128 {
            return Err(DaoError::IntegerOutOfRange { value: 0, bits });
        }
        self.need_bits(bits, "uint")?;
        let mut value = 0u128;
        for _ in 0..bits {
            value = (value << 1) | self.cell.bit_at(self.bit_pos) as u128;
            self.bit_pos += 1;
        }
        Ok(value)
    }

    /// Read without consuming.
    pub fn preload_uint(&self, bits: usize) -> Result<u128, DaoError> {
        self.clone().load_uint(bits)
    }

    pub fn load_u32(&mut self) -> Result<u32, DaoError> {
        Ok(self.load_uint(32)? as u32)
    }

    pub fn load_u64(&mut self) -> Result<u64, DaoError> {
        Ok(self.load_uint(64)? as u64)
    }

    /// A 48-bit timestamp field.
    pub fn load_u48(&mut self) -> Result<u64, DaoError> {
        Ok(self.load_uint(48)? as u64)
    }

    pub fn load_i8(&mut self) -> Result<i8, DaoError> {
        Ok(self.load_uint(8)? as u8 as i8)
    }

    pub fn load_bytes(&mut self, len: usize) -> Result<Vec<u8>, DaoError> {
        self.need_bits(len * 8, "bytes")?;
        let mut out = Vec::with_capacity(len);
        for _ in 0..len {
            out.push(self.load_uint(8)? as u8);
        }
        Ok(out)
    }

    pub fn load_coins(&mut self) -> Result<Coins, DaoError> {
        let len = self.load_uint(4)? as usize;
        self.load_uint(len * 8)
    }

    pub fn load_maybe_address(&mut self) -> Result<Option<Address>, DaoError> {
        let tag = self.load_uint(2)?;
        match tag {
            0b00 => Ok(None),
            0b10 => {
                if self.load_bit()? {
                    return Err(DaoError::InvalidAddress {
                        reason: "anycast is not supported".to_string(),
                    });
                }
                let workchain = self.load_i8()?;
                let bytes = self.load_bytes(32)?;
                let mut hash = [0u8; 32];
                hash.copy_from_slice(&bytes);
                Ok(Some(Address { workchain, hash }))
            }
            other => Err(DaoError::InvalidAddress {
                reason: format!("unsupported address tag {:02b}", other),
            }),
        }
    }

    pub fn load_address(&mut self) -> Result<Address, DaoError> {
        self.load_maybe_address()?
            .ok_or_else(|| DaoError::InvalidAddress {
                reason: "expected an address, got addr_none".to_string(),
            })
    }

    pub fn load_ref(&mut self) -> Result<Cell, DaoError> {
        let cell = self
            .cell
            .refs
            .get(self.ref_pos)
            .cloned()
            .ok_or_else(|| DaoError::underflow("missing reference"))?;
        self.ref_pos += 1;
        Ok(cell)
    }

    pub fn load_maybe_ref(&mut self) -> Result<Option<Cell>, DaoError> {
        if self.load_bit()? {
            Ok(Some(self.load_ref()?))
        } else {
            Ok(None)
        }
    }

    /// Consume every remaining bit and reference into a new cell.
    pub fn load_remainder(&mut self) -> Result<Cell, DaoError> {
        let mut b = CellBuilder::new();
        while self.remaining_bits() > 0 {
            let bit = self.load_bit()?;
            b.store_bit(bit)?;
        }
        while self.remaining_refs() > 0 {
            let r = self.load_ref()?;
            b.store_ref(r)?;
        }
        Ok(b.build())
    }
}
