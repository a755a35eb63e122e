use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! sid_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(raw: impl Into<String>) -> Self {
                Self(raw.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(raw: &str) -> Self {
                Self(raw.to_string())
            }
        }
    };
}

sid_newtype!(ConversationSid);
sid_newtype!(MessageSid);
sid_newtype!(ParticipantSid);
sid_newtype!(MediaSid);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinState {
    Joined,
    NotJoined,
}

impl JoinState {
    pub fn is_joined(self) -> bool {
        matches!(self, JoinState::Joined)
    }
}
