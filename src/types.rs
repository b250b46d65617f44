// 1.0: all the primitives live here. nothing in the layer works without these types.
// addresses, selectors, quote ids, amounts, roles, timestamps. newtypes so the compiler catches mixups.

use alloy_primitives::{keccak256, B256, U256};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;

pub use alloy_primitives::Address;

// 18-decimal fixed point on the wire, same as the collateral token.
const WIRE_SCALE: u32 = 18;
const WIRE_UNIT: Decimal = dec!(1_000_000_000_000_000_000);

// 1.1: 4-byte function selector. first four bytes of keccak256(signature).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Selector(pub [u8; 4]);

impl Selector {
    pub fn from_signature(signature: &str) -> Self {
        let hash = keccak256(signature.as_bytes());
        Self([hash[0], hash[1], hash[2], hash[3]])
    }

    /// Leading selector of a call payload, if the payload is long enough to carry one.
    pub fn of(calldata: &[u8]) -> Option<Self> {
        let head: [u8; 4] = calldata.get(..4)?.try_into().ok()?;
        Some(Self(head))
    }

    pub fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }
}

impl From<[u8; 4]> for Selector {
    fn from(bytes: [u8; 4]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x")?;
        for b in self.0 {
            write!(f, "{b:02x}")?;
        }
        Ok(())
    }
}

// 1.2: quote identifier minted by the external protocol. a full uint256 word, ids start at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct QuoteId(pub U256);

impl QuoteId {
    pub const fn new(id: u64) -> Self {
        Self(U256::from_limbs([id, 0, 0, 0]))
    }

    pub fn to_word(&self) -> U256 {
        self.0
    }
}

impl From<U256> for QuoteId {
    fn from(word: U256) -> Self {
        Self(word)
    }
}

impl fmt::Display for QuoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// 1.3: collateral amount in whole units. converted to 18-decimal base units at the ABI edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Amount(Decimal);

impl Amount {
    #[must_use]
    pub fn new(value: Decimal) -> Option<Self> {
        if value >= Decimal::ZERO {
            Some(Self(value))
        } else {
            None
        }
    }

    pub fn new_unchecked(value: Decimal) -> Self {
        debug_assert!(value >= Decimal::ZERO);
        Self(value)
    }

    pub fn zero() -> Self {
        Self(Decimal::ZERO)
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    // 100 → 100e18. sub-wei precision is truncated.
    /// None when the scaled value no longer fits a Decimal (about 7.9e10 whole units).
    pub fn to_wire(&self) -> Option<U256> {
        let scaled = self.0.checked_mul(WIRE_UNIT)?.trunc();
        scaled.to_u128().map(U256::from)
    }

    /// Read an 18-decimal base-unit word back. None when it overflows a Decimal.
    pub fn from_wire(word: U256) -> Option<Self> {
        if word > U256::from(i128::MAX as u128) {
            return None;
        }
        let raw = word.to_be_bytes::<32>();
        let mut low = [0u8; 16];
        low.copy_from_slice(&raw[16..]);
        let units = i128::from_be_bytes(low);
        Decimal::try_from_i128_with_scale(units, WIRE_SCALE)
            .ok()
            .map(|d| Self(d.normalize()))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// 1.4: role identifier. keccak256 of the role name, default admin is all zeros.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Role(pub B256);

impl Role {
    pub const DEFAULT_ADMIN: Role = Role(B256::ZERO);

    pub fn named(name: &str) -> Self {
        Self(keccak256(name.as_bytes()))
    }

    pub fn pauser() -> Self {
        Self::named("PAUSER_ROLE")
    }

    pub fn unpauser() -> Self {
        Self::named("UNPAUSER_ROLE")
    }

    pub fn setter() -> Self {
        Self::named("SETTER_ROLE")
    }

    pub fn party_b_manager() -> Self {
        Self::named("PARTY_B_MANAGER_ROLE")
    }

    /// Every role the initializer receives.
    pub fn builtin() -> [Role; 5] {
        [
            Self::DEFAULT_ADMIN,
            Self::pauser(),
            Self::unpauser(),
            Self::setter(),
            Self::party_b_manager(),
        ]
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// 1.5: millisecond timestamp. the layer's clock is set explicitly, like a block timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(pub i64);

impl Timestamp {
    pub fn now() -> Self {
        Self(chrono::Utc::now().timestamp_millis())
    }

    pub fn from_millis(ms: i64) -> Self {
        Self(ms)
    }

    pub fn as_millis(&self) -> i64 {
        self.0
    }

    pub fn as_secs(&self) -> u64 {
        (self.0.max(0) / 1000) as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selector_matches_known_erc20_transfer() {
        // transfer(address,uint256) → 0xa9059cbb
        let sel = Selector::from_signature("transfer(address,uint256)");
        assert_eq!(sel.0, [0xa9, 0x05, 0x9c, 0xbb]);
        assert_eq!(sel.to_string(), "0xa9059cbb");
    }

    #[test]
    fn selector_of_short_payload() {
        assert_eq!(Selector::of(&[1, 2, 3]), None);
        assert_eq!(Selector::of(&[1, 2, 3, 4, 5]), Some(Selector([1, 2, 3, 4])));
    }

    #[test]
    fn quote_id_keeps_full_word() {
        assert_eq!(QuoteId::from(U256::from(7u64)), QuoteId::new(7));

        let wide = U256::from(u64::MAX) + U256::from(1u64);
        assert_eq!(QuoteId::from(wide).to_word(), wide);
        assert!(QuoteId::from(wide) > QuoteId::new(u64::MAX));
        assert_eq!(QuoteId::new(3).to_string(), "#3");
    }

    #[test]
    fn amount_wire_conversion() {
        let hundred = Amount::new(dec!(100)).unwrap();
        assert_eq!(hundred.to_wire(), Some(U256::from(100u128 * 10u128.pow(18))));
        assert_eq!(Amount::from_wire(hundred.to_wire().unwrap()), Some(hundred));

        let half = Amount::new(dec!(0.5)).unwrap();
        assert_eq!(Amount::from_wire(half.to_wire().unwrap()).unwrap().value(), dec!(0.5));

        assert!(Amount::new(dec!(-1)).is_none());
    }

    #[test]
    fn amount_too_large_for_wire() {
        let limit = Amount::new(dec!(79_000_000_000)).unwrap();
        assert!(limit.to_wire().is_some());

        let huge = Amount::new(dec!(100_000_000_000)).unwrap();
        assert_eq!(huge.to_wire(), None);
    }

    #[test]
    fn builtin_roles_are_distinct() {
        let roles = Role::builtin();
        for (i, a) in roles.iter().enumerate() {
            for b in &roles[i + 1..] {
                assert_ne!(a, b);
            }
        }
        assert_eq!(Role::DEFAULT_ADMIN.0, B256::ZERO);
    }
}
