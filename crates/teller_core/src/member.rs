//! Member domain type.

/// A row of the `member` table.
///
/// Balances are plain integers and may go negative; enforcing a floor is
/// left to business validation, not the data layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    member_id: String,
    money: i64,
}

impl Member {
    /// Creates a member with the given id and balance.
    pub fn new(member_id: impl Into<String>, money: i64) -> Self {
        Self {
            member_id: member_id.into(),
            money,
        }
    }

    /// The member's unique id.
    #[must_use]
    pub fn member_id(&self) -> &str {
        &self.member_id
    }

    /// The member's current balance.
    #[must_use]
    pub fn money(&self) -> i64 {
        self.money
    }
}
