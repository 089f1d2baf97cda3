//! Browser environment adapters.
//!
//! The token resolver reads the credential from three places a browser
//! offers: durable local storage, a readable cookie, and the current
//! navigation URL. Each is a trait here so the session state machine runs the
//! same against a real environment, a file on disk, or a test double.

mod cookie;
mod location;
mod storage;

pub use cookie::CookieJar;
pub use location::NavigationUrl;
pub use storage::{FileStorage, MemoryStorage, StorageError};

/// Durable key/value storage that survives restarts (`localStorage`).
pub trait DurableStorage: Send + Sync {
    /// Read a value.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backing store cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Write a value, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backing store cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Delete a value. Deleting a missing key succeeds.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backing store cannot be written.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Read access to the cookies visible to the page.
pub trait CookieSource: Send + Sync {
    /// The value of the named cookie, if set.
    fn cookie(&self, name: &str) -> Option<String>;
}

/// The current navigation URL.
pub trait Location: Send + Sync {
    /// The value of a query parameter in the current URL.
    fn query_param(&self, name: &str) -> Option<String>;

    /// Remove a query parameter from the visible URL without navigating.
    fn strip_query_param(&self, name: &str);

    /// The full current URL.
    fn href(&self) -> String;
}
