//! Shared identifier newtypes and async primitives for workspace crates.
//!
//! ```rust
//! use qcommon::{ConversationId, MetadataMap, TurnId, UserId};
//!
//! let owner = UserId::from("user-7");
//! let conversation = ConversationId::new("conv-1");
//! let turn = TurnId::new("turn-1");
//! let mut metadata = MetadataMap::new();
//! metadata.insert("jurisdiction".to_string(), "CA".to_string());
//!
//! assert_eq!(owner.as_str(), "user-7");
//! assert_eq!(conversation.to_string(), "conv-1");
//! assert_eq!(turn.as_str(), "turn-1");
//! ```

pub mod future {
    //! Shared async future aliases.
    //!
    //! ```rust
    //! use qcommon::BoxFuture;
    //!
    //! fn str_len<'a>(value: &'a str) -> BoxFuture<'a, usize> {
    //!     Box::pin(async move { value.len() })
    //! }
    //!
    //! let _future = str_len("hello");
    //! ```

    use std::future::Future;
    use std::pin::Pin;

    pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
}

pub mod context {
    //! Identifier newtypes shared across the store, ledger, and session crates.

    use std::collections::HashMap;
    use std::fmt::{Display, Formatter};

    /// Free-form conversation metadata (jurisdiction, role, case description).
    pub type MetadataMap = HashMap<String, String>;

    /// Verified user identity supplied by the authentication collaborator.
    #[derive(Debug, Clone, PartialEq, Eq, Hash)]
    pub struct UserId(String);

    impl UserId {
        pub fn new(value: impl Into<String>) -> Self {
            Self(value.into())
        }

        pub fn as_str(&self) -> &str {
            self.0.as_str()
        }
    }

    impl Display for UserId {
        fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
            f.write_str(&self.0)
        }
    }

    impl From<String> for UserId {
        fn from(value: String) -> Self {
            Self(value)
        }
    }

    impl From<&str> for UserId {
        fn from(value: &str) -> Self {
            Self(value.to_string())
        }
    }

    /// Opaque conversation identifier minted by the store.
    #[derive(Debug, Clone, PartialEq, Eq, Hash)]
    pub struct ConversationId(String);

    impl ConversationId {
        pub fn new(value: impl Into<String>) -> Self {
            Self(value.into())
        }

        pub fn as_str(&self) -> &str {
            self.0.as_str()
        }
    }

    impl Display for ConversationId {
        fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
            f.write_str(&self.0)
        }
    }

    impl From<String> for ConversationId {
        fn from(value: String) -> Self {
            Self(value)
        }
    }

    impl From<&str> for ConversationId {
        fn from(value: &str) -> Self {
            Self(value.to_string())
        }
    }

    /// Opaque turn identifier minted by the store.
    #[derive(Debug, Clone, PartialEq, Eq, Hash)]
    pub struct TurnId(String);

    impl TurnId {
        pub fn new(value: impl Into<String>) -> Self {
            Self(value.into())
        }

        pub fn as_str(&self) -> &str {
            self.0.as_str()
        }
    }

    impl Display for TurnId {
        fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
            f.write_str(&self.0)
        }
    }

    impl From<String> for TurnId {
        fn from(value: String) -> Self {
            Self(value)
        }
    }

    impl From<&str> for TurnId {
        fn from(value: &str) -> Self {
            Self(value.to_string())
        }
    }
}

pub use context::{ConversationId, MetadataMap, TurnId, UserId};
pub use future::BoxFuture;
