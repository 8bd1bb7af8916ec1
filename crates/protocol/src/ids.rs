//! Opaque identifiers.
//!
//! All three identifiers are random 128-bit UUIDv4 values. They are compared
//! for equality only; nothing is derived from their contents.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ProtocolError;

macro_rules! opaque_id {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Generates a fresh random value.
            pub fn generate() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = ProtocolError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s.trim())
                    .map(Self)
                    .map_err(|e| ProtocolError::InvalidIdentifier {
                        kind: $label,
                        reason: e.to_string(),
                    })
            }
        }
    };
}

opaque_id!(
    /// Identifier of a download request; doubles as the one-time approval token.
    RequestId,
    "request id"
);

opaque_id!(
    /// Server-wide session epoch. Replacing it invalidates every session
    /// issued against the previous value.
    SessionEpoch,
    "session epoch"
);

opaque_id!(
    /// Version of the shared-root configuration. Replaced whenever the root
    /// folder changes so clients know to refresh cached listings.
    ConfigVersion,
    "config version"
);
