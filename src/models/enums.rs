//! Shared domain enums stored as upper-case text

use serde::{Deserialize, Serialize};
use sqlx::{Decode, Encode, Postgres};
use utoipa::ToSchema;

/// Implements `as_str`, `Display`, `FromStr` and the Postgres text codec for
/// a fieldless enum. Decoding an unknown label is an error, never a default.
macro_rules! text_enum {
    ($name:ident { $($variant:ident => $label:literal $(| $alias:literal)*),+ $(,)? }) => {
        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $label,)+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_uppercase().as_str() {
                    $($label $(| $alias)* => Ok($name::$variant),)+
                    _ => Err(format!("Invalid {}: {}", stringify!($name), s)),
                }
            }
        }

        impl sqlx::Type<Postgres> for $name {
            fn type_info() -> sqlx::postgres::PgTypeInfo {
                <String as sqlx::Type<Postgres>>::type_info()
            }

            fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
                <String as sqlx::Type<Postgres>>::compatible(ty)
            }
        }

        impl<'r> Decode<'r, Postgres> for $name {
            fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
                let s: String = Decode::<Postgres>::decode(value)?;
                s.parse().map_err(|e: String| e.into())
            }
        }

        impl Encode<'_, Postgres> for $name {
            fn encode_by_ref(&self, buf: &mut sqlx::postgres::PgArgumentBuffer) -> sqlx::encode::IsNull {
                <&str as Encode<Postgres>>::encode(self.as_str(), buf)
            }
        }
    };
}

// ---------------------------------------------------------------------------
// MemberType
// ---------------------------------------------------------------------------

/// Borrower category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum MemberType {
    Student,
    #[serde(alias = "FACULTY")]
    Teacher,
    Staff,
    Public,
}

text_enum!(MemberType {
    Student => "STUDENT",
    Teacher => "TEACHER" | "FACULTY",
    Staff => "STAFF",
    Public => "PUBLIC",
});

impl Default for MemberType {
    fn default() -> Self {
        MemberType::Student
    }
}

// ---------------------------------------------------------------------------
// MemberStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum MemberStatus {
    Active,
    Suspended,
    Inactive,
}

text_enum!(MemberStatus {
    Active => "ACTIVE",
    Suspended => "SUSPENDED",
    Inactive => "INACTIVE",
});

impl Default for MemberStatus {
    fn default() -> Self {
        MemberStatus::Active
    }
}

// ---------------------------------------------------------------------------
// LoanStatus
// ---------------------------------------------------------------------------

/// Ledger entry state. A loan moves from `Issued` to `Returned` exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum LoanStatus {
    Issued,
    Returned,
}

text_enum!(LoanStatus {
    Issued => "ISSUED",
    Returned => "RETURNED",
});
