//! Loan model, status enumeration and related types

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Decode, Encode, FromRow, Postgres};
use utoipa::{IntoParams, ToSchema};

use super::item::ItemShort;
use super::user::{UserRole, UserShort};
use crate::error::AppError;

/// Loan status, stored and transmitted as its Indonesian label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum LoanStatus {
    #[serde(rename = "Sedang Dipinjam")]
    Borrowed,
    #[serde(rename = "Belum Dikembalikan")]
    Overdue,
    #[serde(rename = "Sudah Dikembalikan")]
    Returned,
}

impl LoanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoanStatus::Borrowed => "Sedang Dipinjam",
            LoanStatus::Overdue => "Belum Dikembalikan",
            LoanStatus::Returned => "Sudah Dikembalikan",
        }
    }

    /// `Returned` is terminal
    pub fn is_terminal(&self) -> bool {
        *self == LoanStatus::Returned
    }
}

impl std::fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for LoanStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Sedang Dipinjam" => Ok(LoanStatus::Borrowed),
            "Belum Dikembalikan" => Ok(LoanStatus::Overdue),
            "Sudah Dikembalikan" => Ok(LoanStatus::Returned),
            "" => Err(AppError::InvalidValue("Loan status can't be empty".to_string())),
            other => Err(AppError::InvalidValue(format!("Invalid loan status: {}", other))),
        }
    }
}

// SQLx conversion for LoanStatus (stored as TEXT)
impl sqlx::Type<Postgres> for LoanStatus {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<Postgres>>::compatible(ty)
    }
}

impl<'r> Decode<'r, Postgres> for LoanStatus {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s: String = Decode::<Postgres>::decode(value)?;
        s.parse().map_err(|e: AppError| e.to_string().into())
    }
}

impl Encode<'_, Postgres> for LoanStatus {
    fn encode_by_ref(&self, buf: &mut sqlx::postgres::PgArgumentBuffer) -> sqlx::encode::IsNull {
        <&str as Encode<Postgres>>::encode(self.as_str(), buf)
    }
}

/// Calendar date of an instant in the lending timezone
pub fn calendar_date(instant: DateTime<Utc>, tz: &FixedOffset) -> NaiveDate {
    instant.with_timezone(tz).date_naive()
}

/// Loan model from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Loan {
    pub id: i32,
    pub id_item: i32,
    pub id_user: i32,
    pub date_loan: DateTime<Utc>,
    pub date_return: DateTime<Utc>,
    pub quantity: i32,
    pub status: LoanStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Loan {
    /// A still-borrowed loan whose due date lies before `today`
    pub fn is_past_due(&self, today: NaiveDate, tz: &FixedOffset) -> bool {
        self.status == LoanStatus::Borrowed
            && self.deleted_at.is_none()
            && calendar_date(self.date_return, tz) < today
    }
}

/// Loan with its item and borrower, for display
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoanDetails {
    #[serde(flatten)]
    pub loan: Loan,
    pub item: ItemShort,
    pub user: UserShort,
}

/// Flat row returned by the joined loan queries
#[derive(Debug, Clone, FromRow)]
pub struct LoanDetailsRow {
    id: i32,
    id_item: i32,
    id_user: i32,
    date_loan: DateTime<Utc>,
    date_return: DateTime<Utc>,
    quantity: i32,
    status: LoanStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
    item_name: String,
    category: String,
    location: String,
    user_name: String,
    role: UserRole,
}

impl From<LoanDetailsRow> for LoanDetails {
    fn from(row: LoanDetailsRow) -> Self {
        LoanDetails {
            item: ItemShort {
                id: row.id_item,
                item_name: row.item_name,
                category: row.category,
                location: row.location,
            },
            user: UserShort {
                id: row.id_user,
                user_name: row.user_name,
                role: row.role,
            },
            loan: Loan {
                id: row.id,
                id_item: row.id_item,
                id_user: row.id_user,
                date_loan: row.date_loan,
                date_return: row.date_return,
                quantity: row.quantity,
                status: row.status,
                created_at: row.created_at,
                updated_at: row.updated_at,
                deleted_at: row.deleted_at,
            },
        }
    }
}

/// Create loan request
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateLoan {
    pub id_user: i32,
    pub id_item: i32,
    pub date_loan: DateTime<Utc>,
    pub date_return: DateTime<Utc>,
    pub quantity: i32,
}

/// Loan listing query parameters
#[derive(Debug, Clone, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct LoanQuery {
    /// Page size; all matching loans when absent
    pub limit: Option<i64>,
    /// 1-based page number, used with `limit`
    pub page: Option<i64>,
    /// Case-insensitive match on the item name
    pub search: Option<String>,
}
