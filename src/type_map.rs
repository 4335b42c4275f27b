use std::collections::HashMap;

use crate::error::SqlSessionError;
use crate::types::SqlType;

/// Read-only mapping from declared parameter types to a provider's binding type.
///
/// Each backend builds one table at first use (`LazyLock`) and never mutates it afterwards.
#[derive(Debug)]
pub struct TypeMap<P> {
    provider: &'static str,
    entries: HashMap<SqlType, P>,
}

impl<P: Clone> TypeMap<P> {
    pub fn new(provider: &'static str, entries: impl IntoIterator<Item = (SqlType, P)>) -> Self {
        Self {
            provider,
            entries: entries.into_iter().collect(),
        }
    }

    /// Look up the provider type for `sql_type`.
    ///
    /// # Errors
    ///
    /// Returns `SqlSessionError::ConfigError` if the declared type has no mapping.
    pub fn resolve(&self, sql_type: &SqlType) -> Result<P, SqlSessionError> {
        self.entries.get(sql_type).cloned().ok_or_else(|| {
            SqlSessionError::ConfigError(format!(
                "declared type '{sql_type}' has no {} type mapping",
                self.provider
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unmapped_type_is_a_config_error() {
        let map = TypeMap::new("test", [(SqlType::Int, 1u8)]);
        assert_eq!(map.resolve(&SqlType::Int).unwrap(), 1);
        let err = map.resolve(&SqlType::Other("money".into())).unwrap_err();
        assert!(matches!(err, SqlSessionError::ConfigError(msg) if msg.contains("money")));
    }
}
