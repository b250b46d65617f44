// 2.0: the external collaborators. the layer never looks inside the trading protocol; it only
// knows the call shapes below and a Host that can dispatch raw call data from one address to another.

use crate::abi::{word_at, AbiError, FunctionLayout};
use crate::types::{Address, QuoteId, Selector};
use alloy_primitives::{Bytes, I256, U256};
use alloy_sol_types::{sol, SolCall};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

sol! {
    struct SchnorrSign {
        uint256 signature;
        address owner;
        address nonce;
    }

    struct SingleUpnlSig {
        bytes reqId;
        uint256 timestamp;
        int256 upnl;
        bytes gatewaySignature;
        SchnorrSign sigs;
    }

    struct SingleUpnlAndPriceSig {
        bytes reqId;
        uint256 timestamp;
        int256 upnl;
        uint256 price;
        bytes gatewaySignature;
        SchnorrSign sigs;
    }

    interface ISymmio {
        function sendQuote(
            address[] partyBsWhiteList,
            uint256 symbolId,
            uint8 positionType,
            uint8 orderType,
            uint256 price,
            uint256 quantity,
            uint256 cva,
            uint256 lf,
            uint256 partyAmm,
            uint256 partyBmm,
            uint256 maxFundingRate,
            uint256 deadline,
            SingleUpnlAndPriceSig upnlSig
        ) external returns (uint256);
        function requestToCancelQuote(uint256 quoteId) external;
        function requestToClosePosition(
            uint256 quoteId,
            uint256 closePrice,
            uint256 quantityToClose,
            uint8 orderType,
            uint256 deadline
        ) external;
        function lockQuote(uint256 quoteId, SingleUpnlSig upnlSig) external;
        function unlockQuote(uint256 quoteId) external;
        function openPosition(
            uint256 quoteId,
            uint256 filledAmount,
            uint256 openedPrice,
            SingleUpnlAndPriceSig upnlSig
        ) external;
        function fillCloseRequest(
            uint256 quoteId,
            uint256 filledAmount,
            uint256 closedPrice,
            SingleUpnlAndPriceSig upnlSig
        ) external;
        function deposit(uint256 amount) external;
        function depositFor(address user, uint256 amount) external;
        function withdraw(uint256 amount) external;
        function withdrawTo(address user, uint256 amount) external;
        function allocate(uint256 amount) external;
        function deallocate(uint256 amount, SingleUpnlSig upnlSig) external;
        function depositAndAllocate(uint256 amount) external;
        function allocateForPartyB(uint256 amount, address partyA) external;
        function registerPartyB(address partyB) external;
        function getCollateral() external view returns (address);
        function balanceOf(address user) external view returns (uint256);
        function allocatedBalanceOf(address user) external view returns (uint256);
    }

    interface IERC20 {
        function approve(address spender, uint256 amount) external returns (bool);
        function transfer(address to, uint256 amount) external returns (bool);
        function transferFrom(address from, address to, uint256 amount) external returns (bool);
        function balanceOf(address account) external view returns (uint256);
    }
}

/// A failed external call. The reason travels back to the layer's caller unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Revert {
    pub reason: String,
}

impl Revert {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl fmt::Display for Revert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.reason)
    }
}

impl std::error::Error for Revert {}

impl From<alloy_sol_types::Error> for Revert {
    fn from(err: alloy_sol_types::Error) -> Self {
        Self::new(format!("abi decode failed: {err}"))
    }
}

/// 2.1: the chain's call primitive. `sender` is the msg.sender the target observes.
pub trait Host {
    fn call(&mut self, sender: Address, target: Address, calldata: &[u8]) -> Result<Vec<u8>, Revert>;
}

/// Fresh quote id out of a sendQuote return payload.
pub fn returned_quote_id(output: &[u8]) -> Option<QuoteId> {
    word_at(output, 0).map(QuoteId)
}

/// Address out of a single-word return payload.
pub fn returned_address(output: &[u8]) -> Option<Address> {
    let word = output.get(..32)?;
    if word[..12].iter().any(|b| *b != 0) {
        return None;
    }
    Some(Address::from_slice(&word[12..]))
}

// 2.2: catalogue of call shapes the protocol actually exposes. policy configuration is
// validated against these layouts instead of trusting raw offsets.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProtocolInterface {
    functions: BTreeMap<Selector, FunctionLayout>,
}

impl ProtocolInterface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn symmio() -> Self {
        let mut interface = Self::new();
        for signature in [
            ISymmio::sendQuoteCall::SIGNATURE,
            ISymmio::requestToCancelQuoteCall::SIGNATURE,
            ISymmio::requestToClosePositionCall::SIGNATURE,
            ISymmio::lockQuoteCall::SIGNATURE,
            ISymmio::unlockQuoteCall::SIGNATURE,
            ISymmio::openPositionCall::SIGNATURE,
            ISymmio::fillCloseRequestCall::SIGNATURE,
            ISymmio::depositCall::SIGNATURE,
            ISymmio::depositForCall::SIGNATURE,
            ISymmio::withdrawCall::SIGNATURE,
            ISymmio::withdrawToCall::SIGNATURE,
            ISymmio::allocateCall::SIGNATURE,
            ISymmio::deallocateCall::SIGNATURE,
            ISymmio::depositAndAllocateCall::SIGNATURE,
            ISymmio::allocateForPartyBCall::SIGNATURE,
            IERC20::approveCall::SIGNATURE,
            IERC20::transferFromCall::SIGNATURE,
        ] {
            // signatures come from sol! and are canonical
            if let Ok(layout) = FunctionLayout::parse(signature) {
                interface.functions.insert(layout.selector, layout);
            }
        }
        interface
    }

    pub fn register(&mut self, signature: &str) -> Result<Selector, AbiError> {
        let layout = FunctionLayout::parse(signature)?;
        let selector = layout.selector;
        self.functions.insert(selector, layout);
        Ok(selector)
    }

    pub fn get(&self, selector: &Selector) -> Option<&FunctionLayout> {
        self.functions.get(selector)
    }

    pub fn by_name(&self, name: &str) -> Option<&FunctionLayout> {
        self.functions.values().find(|f| f.name == name)
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

// 2.3: payload builders for the common lifecycle calls. signatures are zeroed; a real
// deployment fills them from the oracle gateway before forwarding.

fn empty_schnorr() -> SchnorrSign {
    SchnorrSign {
        signature: U256::ZERO,
        owner: Address::ZERO,
        nonce: Address::ZERO,
    }
}

fn empty_upnl_sig() -> SingleUpnlSig {
    SingleUpnlSig {
        reqId: Bytes::new(),
        timestamp: U256::ZERO,
        upnl: I256::ZERO,
        gatewaySignature: Bytes::new(),
        sigs: empty_schnorr(),
    }
}

fn empty_upnl_and_price_sig(price: U256) -> SingleUpnlAndPriceSig {
    SingleUpnlAndPriceSig {
        reqId: Bytes::new(),
        timestamp: U256::ZERO,
        upnl: I256::ZERO,
        price,
        gatewaySignature: Bytes::new(),
        sigs: empty_schnorr(),
    }
}

/// Market sendQuote restricted to `party_bs` (empty = anyone may lock).
pub fn send_quote_payload(party_bs: Vec<Address>, symbol_id: u64, quantity: U256, price: U256) -> Vec<u8> {
    ISymmio::sendQuoteCall {
        partyBsWhiteList: party_bs,
        symbolId: U256::from(symbol_id),
        positionType: 0,
        orderType: 1,
        price,
        quantity,
        cva: U256::ZERO,
        lf: U256::ZERO,
        partyAmm: U256::ZERO,
        partyBmm: U256::ZERO,
        maxFundingRate: U256::ZERO,
        deadline: U256::MAX,
        upnlSig: empty_upnl_and_price_sig(price),
    }
    .abi_encode()
}

pub fn lock_quote_payload(id: QuoteId) -> Vec<u8> {
    ISymmio::lockQuoteCall {
        quoteId: id.to_word(),
        upnlSig: empty_upnl_sig(),
    }
    .abi_encode()
}

pub fn unlock_quote_payload(id: QuoteId) -> Vec<u8> {
    ISymmio::unlockQuoteCall { quoteId: id.to_word() }.abi_encode()
}

pub fn cancel_quote_payload(id: QuoteId) -> Vec<u8> {
    ISymmio::requestToCancelQuoteCall { quoteId: id.to_word() }.abi_encode()
}

pub fn open_position_payload(id: QuoteId, filled: U256, price: U256) -> Vec<u8> {
    ISymmio::openPositionCall {
        quoteId: id.to_word(),
        filledAmount: filled,
        openedPrice: price,
        upnlSig: empty_upnl_and_price_sig(price),
    }
    .abi_encode()
}

pub fn close_position_payload(id: QuoteId, price: U256, quantity: U256) -> Vec<u8> {
    ISymmio::requestToClosePositionCall {
        quoteId: id.to_word(),
        closePrice: price,
        quantityToClose: quantity,
        orderType: 1,
        deadline: U256::MAX,
    }
    .abi_encode()
}

pub fn fill_close_payload(id: QuoteId, filled: U256, price: U256) -> Vec<u8> {
    ISymmio::fillCloseRequestCall {
        quoteId: id.to_word(),
        filledAmount: filled,
        closedPrice: price,
        upnlSig: empty_upnl_and_price_sig(price),
    }
    .abi_encode()
}
