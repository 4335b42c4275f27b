//! SQL text kept outside the code: scripts embedded in the binary, keyed resource bundles,
//! and plain files on disk.

use std::collections::HashMap;
use std::path::Path;

use crate::error::SqlSessionError;

/// Register scripts compiled into the binary with `include_str!`.
///
/// ```rust,ignore
/// let store = embed_scripts! {
///     "schema/create.sql" => "../sql/create.sql",
/// };
/// ```
#[macro_export]
macro_rules! embed_scripts {
    ($($path:literal => $file:literal),* $(,)?) => {{
        let mut store = $crate::resources::ScriptStore::new();
        $(store.add_script($path, include_str!($file));)*
        store
    }};
}

/// Embedded scripts and resource bundles available to a session.
#[derive(Debug, Clone, Default)]
pub struct ScriptStore {
    scripts: HashMap<String, &'static str>,
    bundles: HashMap<String, HashMap<String, String>>,
}

impl ScriptStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an embedded script under `path`.
    pub fn add_script(&mut self, path: impl Into<String>, contents: &'static str) -> &mut Self {
        self.scripts.insert(path.into(), contents);
        self
    }

    /// Register a resource bundle: named strings looked up by key.
    pub fn add_bundle<K, V, I>(&mut self, path: impl Into<String>, items: I) -> &mut Self
    where
        K: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        let items = items.into_iter().map(|(k, v)| (k.into(), v.into())).collect();
        self.bundles.insert(path.into(), items);
        self
    }

    /// Contents of the embedded script registered under `path`.
    ///
    /// # Errors
    ///
    /// Returns `SqlSessionError::NotFound` if no script is registered under `path`.
    pub fn read_embedded(&self, path: &str) -> Result<String, SqlSessionError> {
        self.scripts
            .get(path)
            .map(|s| (*s).to_string())
            .ok_or_else(|| {
                SqlSessionError::NotFound(format!("Resource script '{path}' couldn't be found."))
            })
    }

    /// Item `key` of the resource bundle `path`.
    ///
    /// # Errors
    ///
    /// Returns `SqlSessionError::NotFound` if the bundle or the item is missing.
    pub fn read_resource(&self, path: &str, key: &str) -> Result<String, SqlSessionError> {
        let bundle = self.bundles.get(path).ok_or_else(|| {
            SqlSessionError::NotFound(format!("Resource file '{path}' couldn't be found."))
        })?;
        bundle.get(key).cloned().ok_or_else(|| {
            SqlSessionError::NotFound(format!(
                "Resource '{path}' file doesn't contain item '{key}'."
            ))
        })
    }
}

/// Contents of the file at `path`.
///
/// # Errors
///
/// Returns `SqlSessionError::NotFound` if the file does not exist, or the I/O error if it
/// cannot be read.
pub fn read_file(path: impl AsRef<Path>) -> Result<String, SqlSessionError> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(SqlSessionError::NotFound(format!(
            "File '{}' couldn't be found.",
            path.display()
        )));
    }
    Ok(std::fs::read_to_string(path)?)
}
