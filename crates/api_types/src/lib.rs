use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod group {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct GroupNew {
        pub name: String,
        /// Currency code (`INR`, `EUR`, `USD`, `GBP`); defaults to `INR`.
        pub currency: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct GroupCreated {
        pub id: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct GroupView {
        pub id: String,
        pub name: String,
        pub currency: String,
        pub owner_id: String,
        pub created_at: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct GroupsResponse {
        pub groups: Vec<GroupView>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct GroupOverviewResponse {
        pub group: GroupView,
        pub members: Vec<super::membership::MemberView>,
    }
}

pub mod membership {
    use super::*;

    /// Role of a user in a group.
    ///
    /// - `owner`: the creator; invites, revokes and deletes.
    /// - `member`: joined through an invitation; full ledger access.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum GroupRole {
        Owner,
        Member,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct MemberView {
        pub user_id: String,
        pub email: String,
        pub display_name: String,
        pub role: GroupRole,
        pub joined_at: DateTime<Utc>,
    }
}

pub mod invitation {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum InvitationStatus {
        Pending,
        Accepted,
        Expired,
        Revoked,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct InvitationNew {
        pub email: String,
    }

    /// Returned to the inviter; the token travels out of band to the invitee.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct InvitationCreated {
        pub id: Uuid,
        pub token: String,
        pub invitee_email: String,
        pub expires_at: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct InvitationView {
        pub id: Uuid,
        pub invitee_email: String,
        pub status: InvitationStatus,
        pub created_at: DateTime<Utc>,
        pub expires_at: DateTime<Utc>,
        pub accepted_at: Option<DateTime<Utc>>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct InvitationsResponse {
        pub invitations: Vec<InvitationView>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct InvitationAccept {
        pub token: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct InvitationAccepted {
        pub group_id: String,
    }
}

pub mod expense {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct SplitNew {
        pub user_id: String,
        pub amount_minor: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ExpenseNew {
        pub description: String,
        pub amount_minor: i64,
        /// Defaults to the caller.
        pub payer_id: Option<String>,
        pub category: Option<String>,
        pub splits: Vec<SplitNew>,
        /// When the money was spent; defaults to now.
        pub spent_at: Option<DateTime<Utc>>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ExpenseCreated {
        pub id: Uuid,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct SplitView {
        pub id: Uuid,
        pub user_id: String,
        pub amount_minor: i64,
        pub settled: bool,
        pub settled_at: Option<DateTime<Utc>>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ExpenseView {
        pub id: Uuid,
        pub payer_id: String,
        pub description: String,
        pub amount_minor: i64,
        pub category: Option<String>,
        pub spent_at: DateTime<Utc>,
        pub created_at: DateTime<Utc>,
        pub splits: Vec<SplitView>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ExpenseList {
        pub limit: Option<u64>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ExpensesResponse {
        pub expenses: Vec<ExpenseView>,
    }
}

pub mod balance {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct BalanceView {
        pub user_id: String,
        /// What others owe this user, in minor units.
        pub amount_owed_minor: i64,
        /// What this user owes others, in minor units.
        pub amount_owes_minor: i64,
        pub net_minor: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct BalancesResponse {
        pub balances: Vec<BalanceView>,
    }
}

pub mod settlement {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct SettlementNew {
        pub from_user_id: String,
        pub to_user_id: String,
        pub amount_minor: i64,
        pub note: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct SettlementResult {
        pub settled_split_ids: Vec<Uuid>,
        pub settled_amount_minor: i64,
        /// Unapplied remainder of the requested amount; informational.
        pub remaining_amount_minor: i64,
        pub receipt_id: Option<Uuid>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct SettlementView {
        pub id: Uuid,
        pub payer_id: String,
        pub receiver_id: String,
        pub amount_minor: i64,
        pub description: Option<String>,
        pub created_at: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct SettlementList {
        pub limit: Option<u64>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct SettlementsResponse {
        pub settlements: Vec<SettlementView>,
    }
}
