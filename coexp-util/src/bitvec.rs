//! Bit-vector codec over a [`DatasetOrder`].
//!
//! Layout contract: bit `i` lives in byte `i / 8` at bit `i % 8`,
//! least-significant bit first. Padding bits past the ordering length are
//! kept zero by the encoder and ignored by the decoder. This layout must
//! not change; stored vectors depend on it byte for byte.

use crate::dataset_order::DatasetOrder;
use crate::errors::CoexError;

#[inline]
fn set_bit(bytes: &mut [u8], i: usize) {
    bytes[i / 8] |= 1u8 << (i % 8);
}

#[inline]
fn clear_bit(bytes: &mut [u8], i: usize) {
    bytes[i / 8] &= !(1u8 << (i % 8));
}

#[inline]
fn get_bit(bytes: &[u8], i: usize) -> bool {
    bytes[i / 8] & (1u8 << (i % 8)) != 0
}

/// Encode a set of dataset ids into a bitmap over the ordering.
///
/// Fails with [`CoexError::InvalidMembership`] if any id is not part of
/// the ordering; ids are never silently dropped. Duplicate ids in the
/// input are harmless. Post-condition: the popcount of the result equals
/// the number of distinct input ids.
pub fn encode<I>(order: &DatasetOrder, member_ids: I) -> Result<Vec<u8>, CoexError>
where
    I: IntoIterator<Item = u64>,
{
    let mut bytes = vec![0u8; order.num_bytes()];
    for id in member_ids {
        let pos = order
            .position_of(id)
            .map_err(|_| CoexError::InvalidMembership(id))?;
        set_bit(&mut bytes, pos);
    }
    Ok(bytes)
}

/// A bitmap with every position of the ordering set.
///
/// Used as the starting point for specificity masks: start all-specific,
/// then clear the positions known to be non-specific.
pub fn encode_all(order: &DatasetOrder) -> Vec<u8> {
    let mut bytes = vec![0u8; order.num_bytes()];
    for i in 0..order.len() {
        set_bit(&mut bytes, i);
    }
    bytes
}

/// Clear the bits for the given ids on an existing bitmap.
pub fn clear_ids<I>(order: &DatasetOrder, bytes: &mut [u8], ids: I) -> Result<(), CoexError>
where
    I: IntoIterator<Item = u64>,
{
    check_len(order, bytes)?;
    for id in ids {
        let pos = order
            .position_of(id)
            .map_err(|_| CoexError::InvalidMembership(id))?;
        clear_bit(bytes, pos);
    }
    Ok(())
}

/// Decode a bitmap back into the ascending list of member dataset ids.
///
/// Only the first `order.len()` bits are read; padding bits are ignored.
/// Fails with [`CoexError::LengthMismatch`] if the vector is too short
/// for the ordering.
pub fn decode(order: &DatasetOrder, bytes: &[u8]) -> Result<Vec<u64>, CoexError> {
    check_len(order, bytes)?;
    let mut ids = Vec::with_capacity(count_bits(bytes));
    for (pos, &id) in order.ids().iter().enumerate() {
        if get_bit(bytes, pos) {
            ids.push(id);
        }
    }
    Ok(ids)
}

/// Byte-wise AND of two vectors from the same ordering.
///
/// The main use is computing "tested in both genes" from two per-gene
/// tested-in vectors. Requires equal lengths; differing lengths mean the
/// vectors came from different orderings.
pub fn intersect(v1: &[u8], v2: &[u8]) -> Result<Vec<u8>, CoexError> {
    if v1.len() != v2.len() {
        return Err(CoexError::LengthMismatch {
            got: v2.len(),
            need: v1.len(),
        });
    }
    Ok(v1.iter().zip(v2.iter()).map(|(a, b)| a & b).collect())
}

/// Number of set bits.
pub fn count_bits(bytes: &[u8]) -> usize {
    bytes.iter().map(|b| b.count_ones() as usize).sum()
}

/// Whether the bit for `id` is set.
pub fn is_member(order: &DatasetOrder, bytes: &[u8], id: u64) -> Result<bool, CoexError> {
    check_len(order, bytes)?;
    Ok(get_bit(bytes, order.position_of(id)?))
}

/// Lowercase hex rendering, for the TSV interchange files.
pub fn to_hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        out.push_str(&format!("{:02x}", b));
    }
    out
}

/// Parse the hex rendering produced by [`to_hex`].
pub fn from_hex(hex: &str) -> anyhow::Result<Vec<u8>> {
    if hex.len() % 2 != 0 {
        return Err(anyhow::anyhow!("odd-length hex bit vector: {}", hex));
    }
    (0..hex.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&hex[i..i + 2], 16)
                .map_err(|e| anyhow::anyhow!("bad hex byte in bit vector: {}", e))
        })
        .collect()
}

fn check_len(order: &DatasetOrder, bytes: &[u8]) -> Result<(), CoexError> {
    if bytes.len() < order.num_bytes() {
        return Err(CoexError::LengthMismatch {
            got: bytes.len(),
            need: order.num_bytes(),
        });
    }
    Ok(())
}
