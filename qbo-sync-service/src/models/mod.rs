//! Domain models shared by the stores and reconcilers.

pub mod account;
pub mod connection;
pub mod product;
pub mod profit_loss;

pub use account::{AccountType, AccountUpsert, LedgerAccount};
pub use connection::{QboConnectionStatus, QboTokens};
pub use product::{Product, ProductType, ProductUpsert};
pub use profit_loss::{FiscalPeriod, ProfitLossEntry};
