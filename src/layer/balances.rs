// 6.5 layer/balances.rs: deposit and withdrawal wrappers. same authorization as the forwarder,
// no pairing. deposits route collateral through the layer: pull from caller, approve the
// protocol, credit the account with depositFor.

use super::core::PairTradingLayer;
use super::results::LayerError;
use crate::events::{BalanceForwardedEvent, EventPayload};
use crate::protocol::{returned_address, Host, IERC20, ISymmio};
use crate::registry::{AccountKind, RegistryError};
use crate::types::{Address, Amount};
use alloy_primitives::U256;
use alloy_sol_types::SolCall;
use tracing::info;

impl<H: Host + Clone> PairTradingLayer<H> {
    /// Collateral token the protocol settles in, as it reports it.
    pub fn collateral_address(&mut self) -> Result<Address, LayerError> {
        let calldata = ISymmio::getCollateralCall {}.abi_encode();
        let (layer, symmio) = (self.address, self.symmio);
        let output = self.host.call(layer, symmio, &calldata)?;
        returned_address(&output).ok_or(LayerError::BadReturn("getCollateral"))
    }

    pub fn deposit_for_account(&mut self, caller: Address, account: Address, amount: Amount) -> Result<(), LayerError> {
        self.atomic(|layer| {
            layer.require_not_paused()?;
            layer.registry.authorize_any(account, caller)?;
            layer.deposit_into(caller, account, amount)
        })
    }

    /// Deposit, then allocate the same amount as the account so it can back quotes.
    pub fn deposit_and_allocate_for_party_a_account(
        &mut self,
        caller: Address,
        account: Address,
        amount: Amount,
    ) -> Result<(), LayerError> {
        self.atomic(|layer| {
            layer.require_not_paused()?;
            layer.registry.authorize(AccountKind::PartyA, account, caller)?;
            layer.deposit_into(caller, account, amount)?;

            let allocate = ISymmio::allocateCall {
                amount: wire_amount(amount)?,
            }
            .abi_encode();
            layer.relay(account, &allocate)?;
            Ok(())
        })
    }

    /// Withdraw from a PartyA account. Funds always go to the owner.
    pub fn withdraw_from_account_party_a(
        &mut self,
        caller: Address,
        account: Address,
        amount: Amount,
    ) -> Result<(), LayerError> {
        self.atomic(|layer| {
            layer.require_not_paused()?;
            layer.registry.authorize(AccountKind::PartyA, account, caller)?;
            let owner = layer
                .registry
                .party_a_owner(account)
                .ok_or(RegistryError::UnknownAccount(account))?;
            layer.withdraw_to(account, owner, amount)
        })
    }

    pub fn withdraw_from_account_party_b(
        &mut self,
        caller: Address,
        account: Address,
        amount: Amount,
        to: Address,
    ) -> Result<(), LayerError> {
        self.atomic(|layer| {
            layer.require_not_paused()?;
            layer.registry.authorize(AccountKind::PartyB, account, caller)?;
            layer.withdraw_to(account, to, amount)
        })
    }

    fn deposit_into(&mut self, funder: Address, account: Address, amount: Amount) -> Result<(), LayerError> {
        let wire = wire_amount(amount)?;
        let collateral = self.collateral_address()?;
        let (layer, symmio) = (self.address, self.symmio);

        let pull = IERC20::transferFromCall {
            from: funder,
            to: layer,
            amount: wire,
        }
        .abi_encode();
        self.host.call(layer, collateral, &pull)?;

        let approve = IERC20::approveCall {
            spender: symmio,
            amount: wire,
        }
        .abi_encode();
        self.host.call(layer, collateral, &approve)?;

        let deposit = ISymmio::depositForCall {
            user: account,
            amount: wire,
        }
        .abi_encode();
        self.host.call(layer, symmio, &deposit)?;

        self.emit_event(EventPayload::DepositForwarded(BalanceForwardedEvent {
            account,
            counterparty: funder,
            amount,
        }));
        info!(account = %account, funder = %funder, amount = %amount, "deposit forwarded");
        Ok(())
    }

    fn withdraw_to(&mut self, account: Address, recipient: Address, amount: Amount) -> Result<(), LayerError> {
        let withdraw = ISymmio::withdrawToCall {
            user: recipient,
            amount: wire_amount(amount)?,
        }
        .abi_encode();
        self.relay(account, &withdraw)?;

        self.emit_event(EventPayload::WithdrawalForwarded(BalanceForwardedEvent {
            account,
            counterparty: recipient,
            amount,
        }));
        info!(account = %account, recipient = %recipient, amount = %amount, "withdrawal forwarded");
        Ok(())
    }
}

fn wire_amount(amount: Amount) -> Result<U256, LayerError> {
    amount.to_wire().ok_or(LayerError::AmountOutOfRange(amount))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{SimulatedChain, COLLATERAL_ADDRESS, SYMMIO_ADDRESS};
    use rust_decimal_macros::dec;

    fn admin() -> Address {
        Address::repeat_byte(0xAD)
    }

    fn alice() -> Address {
        Address::repeat_byte(0x0A)
    }

    fn layer_address() -> Address {
        Address::repeat_byte(0xF0)
    }

    fn funded_layer() -> PairTradingLayer<SimulatedChain> {
        let mut layer = PairTradingLayer::with_defaults(
            layer_address(),
            admin(),
            SYMMIO_ADDRESS,
            SimulatedChain::new(admin()),
        );
        layer.host_mut().fund(alice(), Amount::new_unchecked(dec!(1000))).unwrap();
        let approve = IERC20::approveCall {
            spender: layer_address(),
            amount: U256::MAX,
        }
        .abi_encode();
        layer.host_mut().call(alice(), COLLATERAL_ADDRESS, &approve).unwrap();
        layer
    }

    #[test]
    fn collateral_is_read_from_protocol() {
        let mut layer = funded_layer();
        assert_eq!(layer.collateral_address().unwrap(), COLLATERAL_ADDRESS);
    }

    #[test]
    fn deposit_then_withdraw() {
        let mut layer = funded_layer();
        let account = layer.create_party_a_account(alice(), "main").unwrap();

        layer
            .deposit_for_account(alice(), account, Amount::new_unchecked(dec!(100)))
            .unwrap();
        assert_eq!(layer.host().symmio_balance(account).value(), dec!(100));
        assert_eq!(layer.host().collateral_balance(alice()).value(), dec!(900));

        layer
            .withdraw_from_account_party_a(alice(), account, Amount::new_unchecked(dec!(50)))
            .unwrap();
        assert_eq!(layer.host().symmio_balance(account).value(), dec!(50));
        assert_eq!(layer.host().collateral_balance(alice()).value(), dec!(950));
    }

    #[test]
    fn deposit_and_allocate() {
        let mut layer = funded_layer();
        let account = layer.create_party_a_account(alice(), "main").unwrap();
        layer
            .deposit_and_allocate_for_party_a_account(alice(), account, Amount::new_unchecked(dec!(40)))
            .unwrap();
        assert_eq!(layer.host().symmio_allocated(account).value(), dec!(40));
        assert!(layer.host().symmio_balance(account).is_zero());
    }

    #[test]
    fn failed_deposit_rolls_back_chain() {
        let mut layer = funded_layer();
        let account = layer.create_party_a_account(alice(), "main").unwrap();

        let err = layer
            .deposit_for_account(alice(), account, Amount::new_unchecked(dec!(5000)))
            .unwrap_err();
        assert!(matches!(err, LayerError::External(_)));
        assert_eq!(layer.host().collateral_balance(alice()).value(), dec!(1000));
        assert!(layer.host().symmio_balance(account).is_zero());
    }

    #[test]
    fn oversized_amounts_are_rejected_not_truncated() {
        let mut layer = funded_layer();
        let account = layer.create_party_a_account(alice(), "main").unwrap();
        layer
            .deposit_for_account(alice(), account, Amount::new_unchecked(dec!(100)))
            .unwrap();
        let events = layer.events().len();

        let huge = Amount::new_unchecked(dec!(100_000_000_000));
        let expected = Err(LayerError::AmountOutOfRange(huge));
        assert_eq!(layer.deposit_for_account(alice(), account, huge), expected);
        assert_eq!(layer.deposit_and_allocate_for_party_a_account(alice(), account, huge), expected);
        assert_eq!(layer.withdraw_from_account_party_a(alice(), account, huge), expected);

        assert_eq!(layer.host().symmio_balance(account).value(), dec!(100));
        assert_eq!(layer.host().collateral_balance(alice()).value(), dec!(900));
        assert_eq!(layer.events().len(), events);
    }
}
