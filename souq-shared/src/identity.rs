use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Authenticated customer identity, produced by the (external) auth layer.
///
/// The engine only uses it to attribute orders to a user, to fall back to
/// profile contact details when the request omits them, and to decide whether
/// per-user flash-sale limits apply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerIdentity {
    pub id: Uuid,
    pub email: Option<String>,
    pub mobile: Option<String>,
    /// Full display name, split on first whitespace for first/last fallback.
    pub name: Option<String>,
}

impl CustomerIdentity {
    pub fn from_id(id: Uuid) -> Self {
        Self {
            id,
            email: None,
            mobile: None,
            name: None,
        }
    }

    pub fn first_name(&self) -> Option<String> {
        self.name
            .as_deref()
            .and_then(|n| n.split_whitespace().next())
            .map(str::to_string)
    }

    pub fn last_name(&self) -> Option<String> {
        self.name.as_deref().and_then(|n| {
            let rest: Vec<&str> = n.split_whitespace().skip(1).collect();
            if rest.is_empty() {
                None
            } else {
                Some(rest.join(" "))
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_split() {
        let identity = CustomerIdentity {
            id: Uuid::new_v4(),
            email: None,
            mobile: None,
            name: Some("Lina Abu Khadra".to_string()),
        };
        assert_eq!(identity.first_name().as_deref(), Some("Lina"));
        assert_eq!(identity.last_name().as_deref(), Some("Abu Khadra"));

        let single = CustomerIdentity {
            name: Some("Lina".to_string()),
            ..identity
        };
        assert_eq!(single.last_name(), None);
    }
}
