//! Calldata encoding for the two token transfer functions.

use sendpay_types::{Address, BigUint, Result, SendError};
use sha3::{Digest, Keccak256};

pub const TRANSFER_SIGNATURE: &str = "transfer(address,uint256)";
pub const TRANSFER_WITH_COMMENT_SIGNATURE: &str = "transferWithComment(address,uint256,string)";

/// First four bytes of the keccak hash of a function signature.
pub fn selector(signature: &str) -> [u8; 4] {
    let digest = Keccak256::digest(signature.as_bytes());
    [digest[0], digest[1], digest[2], digest[3]]
}

fn encode_address(address: &Address) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[12..].copy_from_slice(address.as_bytes());
    word
}

fn encode_uint(value: &BigUint) -> Result<[u8; 32]> {
    let bytes = value.to_bytes_be();
    if bytes.len() > 32 {
        return Err(SendError::InvalidAmount(format!("{} overflows uint256", value)));
    }
    let mut word = [0u8; 32];
    word[32 - bytes.len()..].copy_from_slice(&bytes);
    Ok(word)
}

fn encode_usize(value: usize) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[24..].copy_from_slice(&(value as u64).to_be_bytes());
    word
}

/// `transfer(address,uint256)`
pub fn encode_transfer(recipient: &Address, amount: &BigUint) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(4 + 64);
    out.extend_from_slice(&selector(TRANSFER_SIGNATURE));
    out.extend_from_slice(&encode_address(recipient));
    out.extend_from_slice(&encode_uint(amount)?);
    Ok(out)
}

/// `transferWithComment(address,uint256,string)`
pub fn encode_transfer_with_comment(
    recipient: &Address,
    amount: &BigUint,
    comment: &str,
) -> Result<Vec<u8>> {
    let data = comment.as_bytes();
    let padded_len = data.len().div_ceil(32) * 32;

    let mut out = Vec::with_capacity(4 + 128 + padded_len);
    out.extend_from_slice(&selector(TRANSFER_WITH_COMMENT_SIGNATURE));
    out.extend_from_slice(&encode_address(recipient));
    out.extend_from_slice(&encode_uint(amount)?);
    // offset of the string tail, after three head words
    out.extend_from_slice(&encode_usize(3 * 32));
    out.extend_from_slice(&encode_usize(data.len()));
    out.extend_from_slice(data);
    out.resize(out.len() + (padded_len - data.len()), 0);
    Ok(out)
}
