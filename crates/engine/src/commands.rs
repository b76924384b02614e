//! Command structs for engine operations.
//!
//! These types group parameters for write operations (expense recording,
//! settlement), keeping call sites readable and avoiding long argument lists.

use chrono::{DateTime, Utc};

/// One member's share of an expense being recorded.
#[derive(Clone, Debug)]
pub struct SplitShare {
    pub user_id: String,
    pub amount_minor: i64,
}

/// Record a shared expense with its per-member splits.
#[derive(Clone, Debug)]
pub struct RecordExpenseCmd {
    pub group_id: String,
    /// Who paid. Defaults to the caller.
    pub payer_id: String,
    pub description: String,
    pub amount_minor: i64,
    pub category: Option<String>,
    pub splits: Vec<SplitShare>,
    /// When the money was spent; defaults to the recording instant.
    pub spent_at: Option<DateTime<Utc>>,
    pub user_id: String,
}

impl RecordExpenseCmd {
    #[must_use]
    pub fn new(
        group_id: impl Into<String>,
        user_id: impl Into<String>,
        description: impl Into<String>,
        amount_minor: i64,
    ) -> Self {
        let user_id = user_id.into();
        Self {
            group_id: group_id.into(),
            payer_id: user_id.clone(),
            description: description.into(),
            amount_minor,
            category: None,
            splits: Vec::new(),
            spent_at: None,
            user_id,
        }
    }

    #[must_use]
    pub fn payer_id(mut self, payer_id: impl Into<String>) -> Self {
        self.payer_id = payer_id.into();
        self
    }

    #[must_use]
    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    #[must_use]
    pub fn split(mut self, user_id: impl Into<String>, amount_minor: i64) -> Self {
        self.splits.push(SplitShare {
            user_id: user_id.into(),
            amount_minor,
        });
        self
    }

    #[must_use]
    pub fn spent_at(mut self, spent_at: DateTime<Utc>) -> Self {
        self.spent_at = Some(spent_at);
        self
    }
}

/// Apply a payment from a debtor to a creditor against their unsettled splits.
#[derive(Clone, Debug)]
pub struct SettleDebtCmd {
    pub group_id: String,
    /// The debtor whose splits get retired.
    pub from_user_id: String,
    /// The creditor who paid the underlying expenses.
    pub to_user_id: String,
    pub amount_minor: i64,
    pub note: Option<String>,
    pub user_id: String,
}

impl SettleDebtCmd {
    #[must_use]
    pub fn new(
        group_id: impl Into<String>,
        user_id: impl Into<String>,
        from_user_id: impl Into<String>,
        to_user_id: impl Into<String>,
        amount_minor: i64,
    ) -> Self {
        Self {
            group_id: group_id.into(),
            from_user_id: from_user_id.into(),
            to_user_id: to_user_id.into(),
            amount_minor,
            note: None,
            user_id: user_id.into(),
        }
    }

    #[must_use]
    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}
