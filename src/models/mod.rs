//! Data models for Medinventory

pub mod item;
pub mod loan;
pub mod user;

// Re-export commonly used types
pub use item::{CreateInventoryItem, InventoryItem, ItemShort, UpdateInventoryItem};
pub use loan::{CreateLoan, Loan, LoanDetails, LoanQuery, LoanStatus};
pub use user::{CallerIdentity, CreateUser, User, UserRole, UserShort};
