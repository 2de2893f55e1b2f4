// Static token table (development TokenVerifier)

use courier_core::domain::UserId;
use courier_core::port::{AuthError, Claims, TokenVerifier};
use courier_core::AppError;
use std::collections::HashMap;

/// Maps opaque access tokens to user ids
#[derive(Debug, Clone, Default)]
pub struct TokenTable {
    tokens: HashMap<String, UserId>,
}

impl TokenTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(mut self, token: impl Into<String>, user_id: UserId) -> Self {
        self.tokens.insert(token.into(), user_id);
        self
    }

    /// Parse `token:user_id` pairs separated by commas, e.g. `alice:1,bob:2`
    pub fn parse(entries: &str) -> Result<Self, AppError> {
        let mut table = Self::new();
        for entry in entries.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (token, user_id) = entry
                .rsplit_once(':')
                .ok_or_else(|| AppError::Config(format!("token entry '{}' is not token:user_id", entry)))?;
            let token = token.trim();
            if token.is_empty() {
                return Err(AppError::Config(format!("empty token in entry '{}'", entry)));
            }
            let user_id: UserId = user_id
                .trim()
                .parse()
                .map_err(|_| AppError::Config(format!("invalid user id in entry '{}'", entry)))?;
            table.tokens.insert(token.to_string(), user_id);
        }
        Ok(table)
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl TokenVerifier for TokenTable {
    fn verify_access_token(&self, token: &str) -> Result<Claims, AuthError> {
        if token.trim().is_empty() {
            return Err(AuthError::MissingToken);
        }
        self.tokens
            .get(token)
            .map(|&user_id| Claims { user_id })
            .ok_or(AuthError::InvalidToken)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_verify() {
        let table = TokenTable::parse("alice:1, bob:2,,").unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.verify_access_token("alice"), Ok(Claims { user_id: 1 }));
        assert_eq!(table.verify_access_token("bob"), Ok(Claims { user_id: 2 }));
        assert_eq!(table.verify_access_token("carol"), Err(AuthError::InvalidToken));
        assert_eq!(table.verify_access_token(""), Err(AuthError::MissingToken));
    }

    #[test]
    fn test_parse_rejects_bad_entries() {
        assert!(TokenTable::parse("alice").is_err());
        assert!(TokenTable::parse(":1").is_err());
        assert!(TokenTable::parse("alice:one").is_err());
        assert!(TokenTable::parse("").unwrap().is_empty());
    }

    #[test]
    fn test_builder() {
        let table = TokenTable::new().with_token("t", 9);
        assert_eq!(table.verify_access_token("t").unwrap().user_id, 9);
    }
}
