use rust_decimal::Decimal;
use super::UserId;

/// A buyer account with a prepaid balance.
#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    pub id: UserId,
    pub name: String,
    pub balance: Decimal,
}

impl Account {
    pub fn new(id: impl Into<UserId>, name: impl Into<String>, balance: Decimal) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            balance,
        }
    }
}
