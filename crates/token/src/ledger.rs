//! Token ledger interface used by the distribution contracts
//!
//! Provides a narrow, deterministic view of a fixed-supply fungible token:
//! balances, allowances and the two transfer primitives the crowdsale and the
//! airdrop need (pull with allowance, push from their own holdings).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use tracing::debug;
use tranche_primitives::{Address, Amount, ErrorKind};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("insufficient balance for {account}: has {available}, needs {required}")]
    InsufficientBalance {
        account: Address,
        available: Amount,
        required: Amount,
    },
    #[error("insufficient allowance from {owner} to {spender}: has {available}, needs {required}")]
    InsufficientAllowance {
        owner: Address,
        spender: Address,
        available: Amount,
        required: Amount,
    },
    #[error("token operations cannot involve the zero address")]
    ZeroAddress,
    #[error("token supply is fixed; minting is renounced")]
    MintingRenounced,
    #[error("transfer rejected by token: {0}")]
    Rejected(String),
}

impl TokenError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TokenError::ZeroAddress => ErrorKind::Validation,
            _ => ErrorKind::Token,
        }
    }
}

/// Interface for fungible token operations.
pub trait TokenLedger {
    /// Address of the token contract itself.
    fn address(&self) -> Address;

    /// Fixed total supply.
    fn total_supply(&self) -> Amount;

    /// Balance held by `account`.
    fn balance_of(&self, account: &Address) -> Amount;

    /// Amount `spender` may still pull from `owner`.
    fn allowance(&self, owner: &Address, spender: &Address) -> Amount;

    /// Set the amount `spender` may pull from `owner`.
    fn approve(&mut self, owner: &Address, spender: &Address, amount: Amount) -> Result<(), TokenError>;

    /// Move `amount` from `from` to `to`; `from` is the acting account.
    fn transfer(&mut self, from: &Address, to: &Address, amount: Amount) -> Result<(), TokenError>;

    /// Move `amount` from `owner` to `to` on behalf of `spender`, consuming allowance.
    fn transfer_from(
        &mut self,
        spender: &Address,
        owner: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<(), TokenError>;
}

// -----------------------------------------------------------------------------
// In-memory implementation (simulation and tests)
// -----------------------------------------------------------------------------

/// Fixed-supply token: the whole supply is minted once to the fundkeeper at
/// construction and minting is renounced immediately after.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InMemoryTokenLedger {
    address: Address,
    symbol: String,
    balances: HashMap<Address, Amount>,
    allowances: HashMap<Address, HashMap<Address, Amount>>,
    total_supply: Amount,
}

impl InMemoryTokenLedger {
    pub fn new(address: Address, symbol: impl Into<String>, fundkeeper: Address, total_supply: Amount) -> Self {
        let mut balances = HashMap::new();
        balances.insert(fundkeeper, total_supply);
        debug!(
            target: "token",
            token = %address,
            %fundkeeper,
            total_supply,
            "Minted fixed supply to fundkeeper"
        );
        Self {
            address,
            symbol: symbol.into(),
            balances,
            allowances: HashMap::new(),
            total_supply,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Always fails: the supply was minted once at construction.
    pub fn mint(&mut self, _to: &Address, _amount: Amount) -> Result<(), TokenError> {
        Err(TokenError::MintingRenounced)
    }

    fn debit(&mut self, account: &Address, amount: Amount) -> Result<(), TokenError> {
        let available = self.balance_of(account);
        if available < amount {
            return Err(TokenError::InsufficientBalance {
                account: *account,
                available,
                required: amount,
            });
        }
        self.balances.insert(*account, available - amount);
        Ok(())
    }

    fn credit(&mut self, account: &Address, amount: Amount) {
        let balance = self.balances.entry(*account).or_insert(0);
        *balance = balance.saturating_add(amount);
    }
}

impl TokenLedger for InMemoryTokenLedger {
    fn address(&self) -> Address {
        self.address
    }

    fn total_supply(&self) -> Amount {
        self.total_supply
    }

    fn balance_of(&self, account: &Address) -> Amount {
        self.balances.get(account).copied().unwrap_or(0)
    }

    fn allowance(&self, owner: &Address, spender: &Address) -> Amount {
        self.allowances
            .get(owner)
            .and_then(|granted| granted.get(spender))
            .copied()
            .unwrap_or(0)
    }

    fn approve(&mut self, owner: &Address, spender: &Address, amount: Amount) -> Result<(), TokenError> {
        if owner.is_zero() || spender.is_zero() {
            return Err(TokenError::ZeroAddress);
        }
        self.allowances.entry(*owner).or_default().insert(*spender, amount);
        Ok(())
    }

    fn transfer(&mut self, from: &Address, to: &Address, amount: Amount) -> Result<(), TokenError> {
        if to.is_zero() {
            return Err(TokenError::ZeroAddress);
        }
        self.debit(from, amount)?;
        self.credit(to, amount);
        debug!(target: "token", %from, %to, amount, "Transfer");
        Ok(())
    }

    fn transfer_from(
        &mut self,
        spender: &Address,
        owner: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<(), TokenError> {
        let allowed = self.allowance(owner, spender);
        if allowed < amount {
            return Err(TokenError::InsufficientAllowance {
                owner: *owner,
                spender: *spender,
                available: allowed,
                required: amount,
            });
        }
        self.transfer(owner, to, amount)?;
        self.allowances
            .entry(*owner)
            .or_default()
            .insert(*spender, allowed - amount);
        Ok(())
    }
}

// -----------------------------------------------------------------------------
// Mock ledger (call recording and injected failures)
// -----------------------------------------------------------------------------

/// Wraps an [`InMemoryTokenLedger`], records every successful movement and
/// can be told to reject transfers to exercise rollback paths.
#[derive(Debug, Clone)]
pub struct MockTokenLedger {
    inner: InMemoryTokenLedger,
    transfer_calls: Vec<(Address, Address, Amount)>,
    reject_transfers: bool,
}

impl MockTokenLedger {
    pub fn new(address: Address, fundkeeper: Address, total_supply: Amount) -> Self {
        Self {
            inner: InMemoryTokenLedger::new(address, "MOCK", fundkeeper, total_supply),
            transfer_calls: Vec::new(),
            reject_transfers: false,
        }
    }

    /// Recorded `(from, to, amount)` movements, including allowance pulls.
    pub fn get_transfer_calls(&self) -> &[(Address, Address, Amount)] {
        &self.transfer_calls
    }

    pub fn clear_calls(&mut self) {
        self.transfer_calls.clear();
    }

    pub fn set_reject_transfers(&mut self, reject: bool) {
        self.reject_transfers = reject;
    }
}

impl TokenLedger for MockTokenLedger {
    fn address(&self) -> Address {
        self.inner.address()
    }

    fn total_supply(&self) -> Amount {
        self.inner.total_supply()
    }

    fn balance_of(&self, account: &Address) -> Amount {
        self.inner.balance_of(account)
    }

    fn allowance(&self, owner: &Address, spender: &Address) -> Amount {
        self.inner.allowance(owner, spender)
    }

    fn approve(&mut self, owner: &Address, spender: &Address, amount: Amount) -> Result<(), TokenError> {
        self.inner.approve(owner, spender, amount)
    }

    fn transfer(&mut self, from: &Address, to: &Address, amount: Amount) -> Result<(), TokenError> {
        if self.reject_transfers {
            return Err(TokenError::Rejected("mock configured to reject".into()));
        }
        self.inner.transfer(from, to, amount)?;
        self.transfer_calls.push((*from, *to, amount));
        Ok(())
    }

    fn transfer_from(
        &mut self,
        spender: &Address,
        owner: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<(), TokenError> {
        if self.reject_transfers {
            return Err(TokenError::Rejected("mock configured to reject".into()));
        }
        self.inner.transfer_from(spender, owner, to, amount)?;
        self.transfer_calls.push((*owner, *to, amount));
        Ok(())
    }
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------
#[cfg(test)]
mod tests {
    use super::*;
    use tranche_primitives::units;

    fn token(fundkeeper: Address) -> InMemoryTokenLedger {
        InMemoryTokenLedger::new(Address::derive("token"), "TRN", fundkeeper, units(380_000_000))
    }

    #[test]
    fn supply_is_minted_to_fundkeeper_once() {
        let owner = Address::derive("owner");
        let mut ledger = token(owner);
        assert_eq!(ledger.balance_of(&owner), units(380_000_000));
        assert_eq!(ledger.total_supply(), units(380_000_000));
        assert_eq!(
            ledger.mint(&Address::derive("x"), 1),
            Err(TokenError::MintingRenounced)
        );
    }

    #[test]
    fn transfer_moves_balance() {
        let owner = Address::derive("owner");
        let alice = Address::derive("alice");
        let mut ledger = token(owner);

        ledger.transfer(&owner, &alice, units(10)).unwrap();
        assert_eq!(ledger.balance_of(&alice), units(10));
        assert_eq!(ledger.balance_of(&owner), units(380_000_000 - 10));
    }

    #[test]
    fn insufficient_balance_leaves_state_untouched() {
        let owner = Address::derive("owner");
        let alice = Address::derive("alice");
        let mut ledger = token(owner);

        let err = ledger.transfer(&alice, &owner, 1).unwrap_err();
        assert!(matches!(err, TokenError::InsufficientBalance { .. }));
        assert_eq!(err.kind(), ErrorKind::Token);
        assert_eq!(ledger.balance_of(&owner), units(380_000_000));
    }

    #[test]
    fn transfer_from_consumes_allowance() {
        let owner = Address::derive("owner");
        let spender = Address::derive("sale");
        let mut ledger = token(owner);

        ledger.approve(&owner, &spender, units(100)).unwrap();
        ledger.transfer_from(&spender, &owner, &spender, units(60)).unwrap();
        assert_eq!(ledger.allowance(&owner, &spender), units(40));
        assert_eq!(ledger.balance_of(&spender), units(60));

        let err = ledger
            .transfer_from(&spender, &owner, &spender, units(41))
            .unwrap_err();
        assert!(matches!(err, TokenError::InsufficientAllowance { .. }));
    }

    #[test]
    fn zero_address_rejected() {
        let owner = Address::derive("owner");
        let mut ledger = token(owner);
        assert_eq!(
            ledger.transfer(&owner, &Address::ZERO, 1),
            Err(TokenError::ZeroAddress)
        );
    }

    #[test]
    fn mock_records_and_rejects() {
        let owner = Address::derive("owner");
        let alice = Address::derive("alice");
        let mut mock = MockTokenLedger::new(Address::derive("mock"), owner, 1_000);

        mock.transfer(&owner, &alice, 300).unwrap();
        assert_eq!(mock.get_transfer_calls(), &[(owner, alice, 300)]);

        mock.set_reject_transfers(true);
        assert!(matches!(
            mock.transfer(&owner, &alice, 1),
            Err(TokenError::Rejected(_))
        ));
        assert_eq!(mock.balance_of(&alice), 300);
        assert_eq!(mock.get_transfer_calls().len(), 1);
    }

    #[test]
    fn ledger_snapshot_serializes() {
        let owner = Address::derive("owner");
        let ledger = token(owner);
        let json = serde_json::to_string(&ledger).unwrap();
        assert!(json.contains("TRN"));
    }
}
