// 9.0 mock.rs: MOCKED. an in-memory chain with a collateral token and a cut-down trading protocol.
// just enough state machine for the layer to be exercised end to end. no margin, no pricing,
// no signature checks: signatures are decoded and ignored.

use crate::protocol::{Host, Revert, IERC20, ISymmio};
use crate::types::{Address, Amount, QuoteId};
use alloy_primitives::U256;
use alloy_sol_types::SolInterface;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

pub const SYMMIO_ADDRESS: Address = Address::new([0x51; 20]);
pub const COLLATERAL_ADDRESS: Address = Address::new([0xC0; 20]);

fn word(value: U256) -> Vec<u8> {
    value.to_be_bytes::<32>().to_vec()
}

fn bool_word(value: bool) -> Vec<u8> {
    word(U256::from(value as u8))
}

// 9.1: ERC-20 style collateral.
#[derive(Debug, Clone, Default)]
pub struct MockCollateral {
    balances: HashMap<Address, U256>,
    allowances: HashMap<(Address, Address), U256>,
}

impl MockCollateral {
    pub fn mint(&mut self, to: Address, amount: U256) {
        *self.balances.entry(to).or_default() += amount;
    }

    pub fn balance_of(&self, owner: Address) -> U256 {
        self.balances.get(&owner).copied().unwrap_or_default()
    }

    pub fn allowance(&self, owner: Address, spender: Address) -> U256 {
        self.allowances.get(&(owner, spender)).copied().unwrap_or_default()
    }

    fn move_balance(&mut self, from: Address, to: Address, amount: U256) -> Result<(), Revert> {
        let available = self.balance_of(from);
        if available < amount {
            return Err(Revert::new("ERC20: transfer amount exceeds balance"));
        }
        self.balances.insert(from, available - amount);
        *self.balances.entry(to).or_default() += amount;
        Ok(())
    }

    pub fn transfer_from(&mut self, spender: Address, from: Address, to: Address, amount: U256) -> Result<(), Revert> {
        let allowed = self.allowance(from, spender);
        if allowed < amount {
            return Err(Revert::new("ERC20: insufficient allowance"));
        }
        self.move_balance(from, to, amount)?;
        if allowed != U256::MAX {
            self.allowances.insert((from, spender), allowed - amount);
        }
        Ok(())
    }

    fn handle(&mut self, sender: Address, calldata: &[u8]) -> Result<Vec<u8>, Revert> {
        match IERC20::IERC20Calls::abi_decode(calldata)? {
            IERC20::IERC20Calls::approve(call) => {
                self.allowances.insert((sender, call.spender), call.amount);
                Ok(bool_word(true))
            }
            IERC20::IERC20Calls::transfer(call) => {
                self.move_balance(sender, call.to, call.amount)?;
                Ok(bool_word(true))
            }
            IERC20::IERC20Calls::transferFrom(call) => {
                self.transfer_from(sender, call.from, call.to, call.amount)?;
                Ok(bool_word(true))
            }
            IERC20::IERC20Calls::balanceOf(call) => Ok(word(self.balance_of(call.account))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuoteStatus {
    Pending,
    Locked,
    Opened,
    CloseRequested,
    Closed,
    Canceled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockQuote {
    pub id: QuoteId,
    pub party_a: Address,
    pub party_b: Option<Address>,
    pub whitelist: Vec<Address>,
    pub quantity: U256,
    pub status: QuoteStatus,
}

// 9.2: the trading protocol. balances are free collateral, allocated is what backs quotes.
#[derive(Debug, Clone)]
pub struct MockSymmio {
    admin: Address,
    balances: HashMap<Address, U256>,
    allocated: HashMap<Address, U256>,
    party_bs: HashSet<Address>,
    quotes: BTreeMap<QuoteId, MockQuote>,
    next_quote_id: U256,
}

impl MockSymmio {
    fn new(admin: Address) -> Self {
        Self {
            admin,
            balances: HashMap::new(),
            allocated: HashMap::new(),
            party_bs: HashSet::new(),
            quotes: BTreeMap::new(),
            next_quote_id: U256::from(1u64),
        }
    }

    pub fn balance_of(&self, user: Address) -> U256 {
        self.balances.get(&user).copied().unwrap_or_default()
    }

    pub fn allocated_of(&self, user: Address) -> U256 {
        self.allocated.get(&user).copied().unwrap_or_default()
    }

    pub fn quote(&self, id: QuoteId) -> Option<&MockQuote> {
        self.quotes.get(&id)
    }

    pub fn quote_count(&self) -> usize {
        self.quotes.len()
    }

    /// Id the next sendQuote will mint.
    pub fn set_next_quote_id(&mut self, id: U256) {
        self.next_quote_id = id;
    }

    fn debit(&mut self, user: Address, amount: U256) -> Result<(), Revert> {
        let available = self.balance_of(user);
        if available < amount {
            return Err(Revert::new("AccountFacet: Insufficient balance"));
        }
        self.balances.insert(user, available - amount);
        Ok(())
    }

    fn credit(&mut self, user: Address, amount: U256) {
        *self.balances.entry(user).or_default() += amount;
    }

    fn allocate(&mut self, user: Address, amount: U256) -> Result<(), Revert> {
        self.debit(user, amount)?;
        *self.allocated.entry(user).or_default() += amount;
        Ok(())
    }

    fn deallocate(&mut self, user: Address, amount: U256) -> Result<(), Revert> {
        let allocated = self.allocated_of(user);
        if allocated < amount {
            return Err(Revert::new("AccountFacet: Insufficient allocated balance"));
        }
        self.allocated.insert(user, allocated - amount);
        self.credit(user, amount);
        Ok(())
    }

    fn quote_mut(&mut self, id: U256) -> Result<&mut MockQuote, Revert> {
        self.quotes
            .get_mut(&QuoteId(id))
            .ok_or_else(|| Revert::new("LibQuote: Quote not found"))
    }

    // moves a quote forward if the sender plays the given side and the quote is in `from`
    fn transition(
        &mut self,
        id: U256,
        sender: Address,
        side: Side,
        from: QuoteStatus,
        to: QuoteStatus,
    ) -> Result<(), Revert> {
        let quote = self.quote_mut(id)?;
        let allowed = match side {
            Side::A => quote.party_a == sender,
            Side::B => quote.party_b == Some(sender),
        };
        if !allowed {
            return Err(Revert::new(match side {
                Side::A => "Accessibility: Should be partyA of quote",
                Side::B => "Accessibility: Should be partyB of quote",
            }));
        }
        if quote.status != from {
            return Err(Revert::new("Quote: Invalid state"));
        }
        quote.status = to;
        Ok(())
    }

    fn handle(
        &mut self,
        self_address: Address,
        collateral: &mut MockCollateral,
        sender: Address,
        calldata: &[u8],
    ) -> Result<Vec<u8>, Revert> {
        use ISymmio::ISymmioCalls as Call;

        match Call::abi_decode(calldata)? {
            Call::sendQuote(call) => {
                if call.quantity.is_zero() {
                    return Err(Revert::new("PartyAFacet: Quantity should be bigger than zero"));
                }
                if self.allocated_of(sender).is_zero() {
                    return Err(Revert::new("PartyAFacet: insufficient available balance"));
                }
                let id = QuoteId(self.next_quote_id);
                self.next_quote_id += U256::from(1u64);
                self.quotes.insert(
                    id,
                    MockQuote {
                        id,
                        party_a: sender,
                        party_b: None,
                        whitelist: call.partyBsWhiteList,
                        quantity: call.quantity,
                        status: QuoteStatus::Pending,
                    },
                );
                Ok(word(id.to_word()))
            }
            Call::requestToCancelQuote(call) => {
                let quote = self.quote_mut(call.quoteId)?;
                if quote.party_a != sender {
                    return Err(Revert::new("Accessibility: Should be partyA of quote"));
                }
                if !matches!(quote.status, QuoteStatus::Pending | QuoteStatus::Locked) {
                    return Err(Revert::new("PartyAFacet: Invalid state"));
                }
                quote.status = QuoteStatus::Canceled;
                Ok(Vec::new())
            }
            Call::lockQuote(call) => {
                if !self.party_bs.contains(&sender) {
                    return Err(Revert::new("Accessibility: Should be partyB"));
                }
                let quote = self.quote_mut(call.quoteId)?;
                if quote.status != QuoteStatus::Pending {
                    return Err(Revert::new("PartyBFacet: Invalid state"));
                }
                if !quote.whitelist.is_empty() && !quote.whitelist.contains(&sender) {
                    return Err(Revert::new("PartyBFacet: Sender isn't whitelisted"));
                }
                quote.party_b = Some(sender);
                quote.status = QuoteStatus::Locked;
                Ok(Vec::new())
            }
            Call::unlockQuote(call) => {
                self.transition(call.quoteId, sender, Side::B, QuoteStatus::Locked, QuoteStatus::Pending)?;
                self.quote_mut(call.quoteId)?.party_b = None;
                Ok(Vec::new())
            }
            Call::openPosition(call) => {
                self.transition(call.quoteId, sender, Side::B, QuoteStatus::Locked, QuoteStatus::Opened)?;
                Ok(Vec::new())
            }
            Call::requestToClosePosition(call) => {
                self.transition(call.quoteId, sender, Side::A, QuoteStatus::Opened, QuoteStatus::CloseRequested)?;
                Ok(Vec::new())
            }
            Call::fillCloseRequest(call) => {
                self.transition(call.quoteId, sender, Side::B, QuoteStatus::CloseRequested, QuoteStatus::Closed)?;
                Ok(Vec::new())
            }
            Call::deposit(call) => {
                collateral.transfer_from(self_address, sender, self_address, call.amount)?;
                self.credit(sender, call.amount);
                Ok(Vec::new())
            }
            Call::depositFor(call) => {
                collateral.transfer_from(self_address, sender, self_address, call.amount)?;
                self.credit(call.user, call.amount);
                Ok(Vec::new())
            }
            Call::withdraw(call) => {
                self.debit(sender, call.amount)?;
                collateral.move_balance(self_address, sender, call.amount)?;
                Ok(Vec::new())
            }
            Call::withdrawTo(call) => {
                self.debit(sender, call.amount)?;
                collateral.move_balance(self_address, call.user, call.amount)?;
                Ok(Vec::new())
            }
            Call::allocate(call) => {
                self.allocate(sender, call.amount)?;
                Ok(Vec::new())
            }
            Call::deallocate(call) => {
                self.deallocate(sender, call.amount)?;
                Ok(Vec::new())
            }
            Call::depositAndAllocate(call) => {
                collateral.transfer_from(self_address, sender, self_address, call.amount)?;
                self.credit(sender, call.amount);
                self.allocate(sender, call.amount)?;
                Ok(Vec::new())
            }
            Call::allocateForPartyB(call) => {
                if !self.party_bs.contains(&sender) {
                    return Err(Revert::new("Accessibility: Should be partyB"));
                }
                self.allocate(sender, call.amount)?;
                Ok(Vec::new())
            }
            Call::registerPartyB(call) => {
                if sender != self.admin {
                    return Err(Revert::new("LibAccessibility: Must has role"));
                }
                self.party_bs.insert(call.partyB);
                Ok(Vec::new())
            }
            Call::getCollateral(_) => Ok(COLLATERAL_ADDRESS.into_word().to_vec()),
            Call::balanceOf(call) => Ok(word(self.balance_of(call.user))),
            Call::allocatedBalanceOf(call) => Ok(word(self.allocated_of(call.user))),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Side {
    A,
    B,
}

// 9.3: the chain. dispatches by target address, like CALL.
#[derive(Debug, Clone)]
pub struct SimulatedChain {
    pub collateral: MockCollateral,
    pub symmio: MockSymmio,
}

impl SimulatedChain {
    /// `admin` may register PartyBs on the protocol.
    pub fn new(admin: Address) -> Self {
        Self {
            collateral: MockCollateral::default(),
            symmio: MockSymmio::new(admin),
        }
    }

    /// Mint whole collateral units to `to`.
    pub fn fund(&mut self, to: Address, amount: Amount) -> Result<(), Revert> {
        let wire = amount
            .to_wire()
            .ok_or_else(|| Revert::new(format!("amount {amount} out of range")))?;
        self.collateral.mint(to, wire);
        Ok(())
    }

    /// Unlimited collateral allowance from `owner` to `spender`.
    pub fn approve_max(&mut self, owner: Address, spender: Address) {
        self.collateral.allowances.insert((owner, spender), U256::MAX);
    }

    /// Register a hedger on the protocol directly, as its admin would.
    pub fn register_party_b(&mut self, party_b: Address) {
        self.symmio.party_bs.insert(party_b);
    }

    pub fn symmio_balance(&self, user: Address) -> Amount {
        Amount::from_wire(self.symmio.balance_of(user)).unwrap_or_else(Amount::zero)
    }

    pub fn symmio_allocated(&self, user: Address) -> Amount {
        Amount::from_wire(self.symmio.allocated_of(user)).unwrap_or_else(Amount::zero)
    }

    pub fn collateral_balance(&self, owner: Address) -> Amount {
        Amount::from_wire(self.collateral.balance_of(owner)).unwrap_or_else(Amount::zero)
    }
}

impl Host for SimulatedChain {
    fn call(&mut self, sender: Address, target: Address, calldata: &[u8]) -> Result<Vec<u8>, Revert> {
        if target == SYMMIO_ADDRESS {
            self.symmio
                .handle(SYMMIO_ADDRESS, &mut self.collateral, sender, calldata)
        } else if target == COLLATERAL_ADDRESS {
            self.collateral.handle(sender, calldata)
        } else {
            Err(Revert::new(format!("call to non-contract {target}")))
        }
    }
}
