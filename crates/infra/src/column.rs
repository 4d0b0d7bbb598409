//! Argument lists as a stored database column.
//!
//! The column is `TEXT NULL`: an empty list is written as SQL `NULL` and read
//! back as an empty list; anything else holds the versioned encoding from
//! [`ArgumentList::encode`].
//!
//! ```sql
//! CREATE TABLE jobs (
//!     id      UUID PRIMARY KEY,
//!     name    TEXT NOT NULL,
//!     args    TEXT NULL
//! );
//! ```

use sqlx::encode::IsNull;
use sqlx::error::BoxDynError;
use sqlx::postgres::{PgArgumentBuffer, PgTypeInfo, PgValueRef};
use sqlx::{Decode, Encode, Postgres, Type, ValueRef};

use jobsd_core::{ArgumentList, DecodeError, EncodeError};

/// [`ArgumentList`] wrapper implementing the storage driver's value traits.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoredArgs(pub ArgumentList);

impl StoredArgs {
    /// Produce the stored representation (`None` for an empty list).
    pub fn to_column(&self) -> Result<Option<String>, EncodeError> {
        self.0.encode()
    }

    /// Scan a stored representation back into a list.
    pub fn from_column(value: Option<&str>) -> Result<Self, DecodeError> {
        ArgumentList::decode(value).map(Self)
    }

    pub fn into_inner(self) -> ArgumentList {
        self.0
    }
}

impl From<ArgumentList> for StoredArgs {
    fn from(args: ArgumentList) -> Self {
        Self(args)
    }
}

impl From<StoredArgs> for ArgumentList {
    fn from(stored: StoredArgs) -> Self {
        stored.0
    }
}

impl Type<Postgres> for StoredArgs {
    fn type_info() -> PgTypeInfo {
        <String as Type<Postgres>>::type_info()
    }

    fn compatible(ty: &PgTypeInfo) -> bool {
        <String as Type<Postgres>>::compatible(ty)
    }
}

impl<'q> Encode<'q, Postgres> for StoredArgs {
    fn encode_by_ref(&self, buf: &mut PgArgumentBuffer) -> Result<IsNull, BoxDynError> {
        match self.to_column()? {
            None => Ok(IsNull::Yes),
            Some(encoded) => <String as Encode<'q, Postgres>>::encode_by_ref(&encoded, buf),
        }
    }
}

impl<'r> Decode<'r, Postgres> for StoredArgs {
    fn decode(value: PgValueRef<'r>) -> Result<Self, BoxDynError> {
        if value.is_null() {
            return Ok(Self::default());
        }
        let raw = <&str as Decode<'r, Postgres>>::decode(value)?;
        Ok(Self::from_column(Some(raw))?)
    }
}
