//! Binary serialization for parse tables using postcard.

use crate::ParseTable;

/// Magic bytes identifying an Alder table blob.
pub const MAGIC: [u8; 4] = *b"ALDT";

/// Current table blob format version.
pub const VERSION: u32 = 1;

/// Errors raised while decoding a table blob.
#[derive(Debug, thiserror::Error)]
pub enum TableError {
    /// The blob does not start with the table magic.
    #[error("not an alder table: bad magic")]
    BadMagic,

    /// The blob was written by an incompatible format version.
    #[error("unsupported table version {0}")]
    Version(u32),

    /// The blob body does not decode.
    #[error("malformed table data")]
    Binary(#[from] postcard::Error),

    /// The JSON form does not decode.
    #[error("malformed table JSON")]
    Json(#[from] serde_json::Error),
}

impl ParseTable {
    /// Deserialize a table from binary format.
    pub fn from_binary(bytes: &[u8]) -> Result<Self, TableError> {
        let Some((header, body)) = bytes.split_at_checked(8) else {
            return Err(TableError::BadMagic);
        };
        if header[..4] != MAGIC {
            return Err(TableError::BadMagic);
        }
        let version = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);
        if version != VERSION {
            return Err(TableError::Version(version));
        }
        postcard::from_bytes(body).map_err(TableError::Binary)
    }

    /// Serialize a table to binary format.
    pub fn to_binary(&self) -> Vec<u8> {
        let mut out = Vec::from(MAGIC);
        out.extend(VERSION.to_le_bytes());
        out.extend(postcard::to_allocvec(self).expect("serialization should not fail"));
        out
    }
}
