use crate::domain::errors::BankError;
use crate::domain::value_objects::{Address, Coin, Reserve};
use crate::ports::outbound::{Bank, LedgerOp};
use std::collections::BTreeMap;

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum Holder {
    Account(Address),
    Reserve(Reserve),
}

impl Holder {
    fn label(&self) -> String {
        match self {
            Holder::Account(addr) => format!("{addr:?}"),
            Holder::Reserve(reserve) => reserve.to_string(),
        }
    }
}

/// In-memory bank for tests and embedders.
///
/// `apply` stages every op on a copy of the touched balances and only
/// commits when all of them succeed.
#[derive(Default, Clone, Debug, PartialEq, Eq)]
pub struct InMemoryBank {
    balances: BTreeMap<(Holder, String), u128>,
}

impl InMemoryBank {
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit `coin` to an account out of thin air.
    pub fn mint(&mut self, account: Address, coin: Coin) {
        let balance = self
            .balances
            .entry((Holder::Account(account), coin.denom))
            .or_insert(0);
        *balance = balance.saturating_add(coin.amount);
    }

    /// Full balance of an account.
    pub fn balance(&self, account: &Address, denom: &str) -> u128 {
        self.get(&Holder::Account(*account), denom)
    }

    fn get(&self, holder: &Holder, denom: &str) -> u128 {
        self.balances
            .get(&(holder.clone(), denom.to_string()))
            .copied()
            .unwrap_or(0)
    }
}

impl Bank for InMemoryBank {
    fn spendable(&self, account: &Address, denom: &str) -> u128 {
        self.balance(account, denom)
    }

    fn reserve_balance(&self, reserve: &Reserve, denom: &str) -> u128 {
        self.get(&Holder::Reserve(*reserve), denom)
    }

    fn apply(&mut self, ops: &[LedgerOp]) -> Result<(), BankError> {
        let mut staged: BTreeMap<(Holder, String), u128> = BTreeMap::new();

        for op in ops {
            let (from, to, coin) = match op {
                LedgerOp::Escrow { from, into, coin } => {
                    (Holder::Account(*from), Holder::Reserve(*into), coin)
                }
                LedgerOp::Release { from, to, coin } => {
                    (Holder::Reserve(*from), Holder::Account(*to), coin)
                }
            };

            let from_key = (from.clone(), coin.denom.clone());
            let available = staged
                .get(&from_key)
                .copied()
                .unwrap_or_else(|| self.get(&from, &coin.denom));
            let debited = available
                .checked_sub(coin.amount)
                .ok_or_else(|| BankError::InsufficientFunds {
                    account: from.label(),
                    required: coin.amount,
                    available,
                })?;
            staged.insert(from_key, debited);

            let to_key = (to.clone(), coin.denom.clone());
            let current = staged
                .get(&to_key)
                .copied()
                .unwrap_or_else(|| self.get(&to, &coin.denom));
            let credited = current
                .checked_add(coin.amount)
                .ok_or_else(|| BankError::Overflow { account: to.label() })?;
            staged.insert(to_key, credited);
        }

        self.balances.extend(staged);
        Ok(())
    }
}
