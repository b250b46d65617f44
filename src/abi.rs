//! Call-data layout introspection.
//!
//! Turns canonical function signatures (`name(type,type,...)`) into a head layout so
//! that an argument position can be turned into a byte offset at configuration time.
//! Types are parsed by `alloy-dyn-abi`; only the head of the encoding is modelled here.
//! Static values occupy their full width in the head, dynamic values (`bytes`, `string`,
//! `T[]`, tuples holding any of those) occupy a single offset word.

use crate::types::Selector;
use alloy_dyn_abi::DynSolType;
use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

pub const WORD: usize = 32;
pub const SELECTOR_LEN: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AbiError {
    #[error("Malformed signature: {0}")]
    MalformedSignature(String),

    #[error("Invalid parameter types in {signature}: {reason}")]
    InvalidTypes { signature: String, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Param {
    /// Canonical type string, e.g. `uint256` or `(bytes,uint256)`.
    pub ty: String,
    pub dynamic: bool,
    /// Words taken in the head. Dynamic params always take one (the tail offset).
    pub head_words: usize,
}

impl Param {
    fn from_type(ty: &DynSolType) -> Self {
        Self {
            ty: ty.sol_type_name().into_owned(),
            dynamic: ty.is_dynamic(),
            head_words: head_words(ty),
        }
    }

    pub fn is_uint256(&self) -> bool {
        !self.dynamic && self.ty == "uint256"
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionLayout {
    pub name: String,
    pub signature: String,
    pub selector: Selector,
    pub params: Vec<Param>,
}

impl FunctionLayout {
    pub fn parse(signature: &str) -> Result<Self, AbiError> {
        let open = signature
            .find('(')
            .ok_or_else(|| AbiError::MalformedSignature(signature.to_string()))?;
        if !signature.ends_with(')') || open == 0 {
            return Err(AbiError::MalformedSignature(signature.to_string()));
        }
        let name = &signature[..open];

        // the parameter list parses as one tuple type
        let params = match &signature[open..] {
            "()" => Vec::new(),
            list => match DynSolType::parse(list) {
                Ok(DynSolType::Tuple(types)) => types.iter().map(Param::from_type).collect(),
                Ok(_) => return Err(AbiError::MalformedSignature(signature.to_string())),
                Err(err) => {
                    return Err(AbiError::InvalidTypes {
                        signature: signature.to_string(),
                        reason: err.to_string(),
                    })
                }
            },
        };

        Ok(Self {
            name: name.to_string(),
            signature: signature.to_string(),
            selector: Selector::from_signature(signature),
            params,
        })
    }

    /// Byte offset of the head word of the parameter at `index`, selector included.
    pub fn head_offset(&self, index: usize) -> Option<usize> {
        if index >= self.params.len() {
            return None;
        }
        let words: usize = self.params[..index].iter().map(|p| p.head_words).sum();
        Some(SELECTOR_LEN + words * WORD)
    }

    /// Minimum payload length: selector plus the full head.
    pub fn head_len(&self) -> usize {
        SELECTOR_LEN + self.params.iter().map(|p| p.head_words).sum::<usize>() * WORD
    }
}

/// Big-endian word at `offset`, None when the payload is too short.
pub fn word_at(calldata: &[u8], offset: usize) -> Option<U256> {
    let end = offset.checked_add(WORD)?;
    U256::try_from_be_slice(calldata.get(offset..end)?)
}

// static tuples and fixed arrays are laid out inline in the head
fn head_words(ty: &DynSolType) -> usize {
    if ty.is_dynamic() {
        return 1;
    }
    match ty {
        DynSolType::FixedArray(element, len) => head_words(element) * len,
        DynSolType::Tuple(components) => components.iter().map(head_words).sum(),
        _ => 1,
    }
}
