use rust_decimal::Decimal;
use crate::actor_framework::Entity;
use crate::domain::{Account, UserId};

#[derive(Debug, Clone)]
pub enum AccountAction {
    /// Overwrites the balance. Negative balances are rejected.
    SetBalance(Decimal),
}

impl Entity for Account {
    type Id = UserId;
    type Action = AccountAction;
    type ActionResult = Decimal;

    fn id(&self) -> &UserId { &self.id }

    fn on_insert(&mut self) -> Result<(), String> {
        if self.balance.is_sign_negative() {
            return Err(format!("Account {} opened with a negative balance", self.id));
        }
        Ok(())
    }

    fn handle_action(&mut self, action: AccountAction) -> Result<Decimal, String> {
        match action {
            AccountAction::SetBalance(balance) if balance.is_sign_negative() => {
                Err(format!("Balance of account {} cannot go negative: {}", self.id, balance))
            }
            AccountAction::SetBalance(balance) => {
                self.balance = balance;
                Ok(self.balance)
            }
        }
    }
}
