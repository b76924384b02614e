pub use commands::{RecordExpenseCmd, SettleDebtCmd, SplitShare};
pub use currency::Currency;
pub use error::EngineError;
pub use expense_splits::ExpenseSplit;
pub use expenses::Expense;
pub use group_memberships::GroupRole;
pub use groups::Group;
pub use invitations::{Invitation, InvitationStatus};
pub use money::MoneyCents;
pub use ops::{
    BalanceSummary, Engine, EngineBuilder, GroupMember, GroupOverview, InvitationCreated,
    SettlementOutcome,
};
pub use settlements::Settlement;

mod commands;
mod currency;
mod error;
mod expense_splits;
mod expenses;
mod group_memberships;
mod groups;
mod invitations;
mod locks;
mod money;
mod ops;
mod settlements;
mod users;
mod util;

type ResultEngine<T> = Result<T, EngineError>;
