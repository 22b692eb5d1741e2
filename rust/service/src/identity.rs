use std::collections::HashSet;
use std::sync::RwLock;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("Identity directory unavailable")]
    Unavailable,
}

/// The slice of the identity collaborator the match lifecycle consumes.
///
/// Credential checks and session issuance happen upstream; operations here
/// receive already-verified handles and only need to know whether a handle
/// refers to a registered user.
pub trait IdentityDirectory: Send + Sync {
    fn is_registered(&self, handle: &str) -> Result<bool, IdentityError>;
}

/// Directory over a fixed handle set, for embedding and tests.
#[derive(Debug, Default)]
pub struct StaticDirectory {
    handles: RwLock<HashSet<String>>,
}

impl StaticDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_handles<I, S>(handles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            handles: RwLock::new(handles.into_iter().map(Into::into).collect()),
        }
    }

    pub fn register(&self, handle: impl Into<String>) -> Result<(), IdentityError> {
        let mut handles = self.handles.write().map_err(|_| IdentityError::Unavailable)?;
        handles.insert(handle.into());
        Ok(())
    }
}

impl IdentityDirectory for StaticDirectory {
    fn is_registered(&self, handle: &str) -> Result<bool, IdentityError> {
        let handles = self.handles.read().map_err(|_| IdentityError::Unavailable)?;
        Ok(handles.contains(handle))
    }
}
