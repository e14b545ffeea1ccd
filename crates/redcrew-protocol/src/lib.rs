//! The delegation protocol codec: the structured-call format used to hand
//! work from the manager to a named specialist and back.
//!
//! The wire shape is a JSON object with exactly three string-valued keys —
//! `coworker`, `task`, `context` — and nothing else. Upstream LLM planning
//! output is unreliable: planners routinely attach extraneous keys
//! (`name`, `description`, `args_schema`, …) or emit a bare string instead
//! of an object. [`Delegation::decode`] rejects all of those
//! deterministically rather than coercing; silent coercion is exactly what
//! used to break role resolution.

use redcrew_core::ProtocolError;
use serde::Serialize;
use serde_json::Value;

/// The three recognized keys, in wire order.
pub const RECOGNIZED_KEYS: [&str; 3] = ["coworker", "task", "context"];

/// A validated delegation message addressed to one specialist role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Delegation {
    /// Specialist role name; must exactly match a registered role.
    pub coworker: String,
    /// Natural-language task description.
    pub task: String,
    /// Natural-language or structured context string.
    pub context: String,
}

impl Delegation {
    /// Builds a delegation, validating the role name.
    ///
    /// Fails with [`ProtocolError::InvalidRole`] when `coworker` is empty
    /// or not an identifier.
    pub fn encode(
        coworker: impl Into<String>,
        task: impl Into<String>,
        context: impl Into<String>,
    ) -> Result<Self, ProtocolError> {
        let coworker = coworker.into();
        if !is_role_identifier(&coworker) {
            return Err(ProtocolError::InvalidRole(coworker));
        }
        Ok(Self {
            coworker,
            task: task.into(),
            context: context.into(),
        })
    }

    /// Validates a raw wire value into a delegation.
    ///
    /// Fails with [`ProtocolError::SchemaViolation`] unless `raw` is a JSON
    /// object carrying exactly the three recognized keys with string
    /// values. Extra keys are rejected, never stripped.
    pub fn decode(raw: &Value) -> Result<Self, ProtocolError> {
        let map = raw.as_object().ok_or_else(|| {
            ProtocolError::SchemaViolation(format!(
                "expected an object with keys {RECOGNIZED_KEYS:?}, got {}",
                json_kind(raw)
            ))
        })?;

        for key in map.keys() {
            if !RECOGNIZED_KEYS.contains(&key.as_str()) {
                return Err(ProtocolError::SchemaViolation(format!(
                    "unrecognized key {key:?}"
                )));
            }
        }

        let field = |key: &'static str| -> Result<&str, ProtocolError> {
            let value = map
                .get(key)
                .ok_or_else(|| ProtocolError::SchemaViolation(format!("missing key {key:?}")))?;
            value.as_str().ok_or_else(|| {
                ProtocolError::SchemaViolation(format!(
                    "key {key:?} must be a string, got {}",
                    json_kind(value)
                ))
            })
        };

        let coworker = field("coworker")?;
        let task = field("task")?;
        let context = field("context")?;

        if !is_role_identifier(coworker) {
            return Err(ProtocolError::InvalidRole(coworker.to_string()));
        }

        Ok(Self {
            coworker: coworker.to_string(),
            task: task.to_string(),
            context: context.to_string(),
        })
    }

    /// Serializes to the wire shape.
    pub fn to_value(&self) -> Value {
        serde_json::json!({
            "coworker": self.coworker,
            "task": self.task,
            "context": self.context,
        })
    }
}

/// Whether `s` is a valid role identifier: non-empty, starts with a letter
/// or underscore, continues with letters, digits or underscores.
pub fn is_role_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_encode_decode_roundtrip() {
        let msg = Delegation::encode("chief_market_analyst", "analyze trends", "account=a1")
            .unwrap();
        let decoded = Delegation::decode(&msg.to_value()).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn test_encode_rejects_empty_role() {
        assert_eq!(
            Delegation::encode("", "t", "c"),
            Err(ProtocolError::InvalidRole(String::new()))
        );
    }

    #[test]
    fn test_encode_rejects_non_identifier_role() {
        assert!(matches!(
            Delegation::encode("market analyst", "t", "c"),
            Err(ProtocolError::InvalidRole(_))
        ));
        assert!(matches!(
            Delegation::encode("3rd_analyst", "t", "c"),
            Err(ProtocolError::InvalidRole(_))
        ));
    }

    #[test]
    fn test_decode_rejects_extra_key() {
        let raw = json!({
            "coworker": "chief_market_analyst",
            "task": "t",
            "context": "c",
            "name": "extra",
        });
        let err = Delegation::decode(&raw).unwrap_err();
        assert!(matches!(err, ProtocolError::SchemaViolation(_)));
        assert!(err.to_string().contains("name"));
    }

    #[test]
    fn test_decode_rejects_planner_noise_keys() {
        for noise in ["description", "args_schema", "return_direct"] {
            let mut raw = json!({"coworker": "creator", "task": "t", "context": "c"});
            raw.as_object_mut()
                .unwrap()
                .insert(noise.to_string(), json!("x"));
            assert!(matches!(
                Delegation::decode(&raw),
                Err(ProtocolError::SchemaViolation(_))
            ));
        }
    }

    #[test]
    fn test_decode_rejects_non_object() {
        let err = Delegation::decode(&json!("coworker: analyst")).unwrap_err();
        assert!(matches!(err, ProtocolError::SchemaViolation(_)));
        assert!(err.to_string().contains("a string"));
    }

    #[test]
    fn test_decode_rejects_missing_key() {
        let raw = json!({"coworker": "creator", "task": "t"});
        let err = Delegation::decode(&raw).unwrap_err();
        assert!(err.to_string().contains("context"));
    }

    #[test]
    fn test_decode_rejects_non_string_value() {
        let raw = json!({"coworker": "creator", "task": 42, "context": "c"});
        let err = Delegation::decode(&raw).unwrap_err();
        assert!(err.to_string().contains("task"));
    }

    #[test]
    fn test_decode_rejects_empty_coworker() {
        let raw = json!({"coworker": "", "task": "t", "context": "c"});
        assert_eq!(
            Delegation::decode(&raw),
            Err(ProtocolError::InvalidRole(String::new()))
        );
    }

    #[test]
    fn test_role_identifier() {
        assert!(is_role_identifier("chief_market_analyst"));
        assert!(is_role_identifier("_private"));
        assert!(!is_role_identifier(""));
        assert!(!is_role_identifier("with space"));
        assert!(!is_role_identifier("dash-role"));
    }
}
