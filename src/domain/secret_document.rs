//! Database secret document
//!
//! The JSON payload stored in each secret version:
//!
//! ```json
//! {
//!   "username": "<required>",
//!   "password": "<required: static password or auth token>",
//!   "host": "<required: cluster endpoint>",
//!   "engine": "postgres",
//!   "port": 5432,
//!   "dbname": "postgres"
//! }
//! ```
//!
//! Keys outside this set are kept as-is and written back unchanged when a new
//! version is derived from an existing one.

use serde_json::{Map, Value};
use std::fmt;

use crate::errors::{Result, RotationError};
use crate::secrets::SecretString;
use crate::storage::ConnectionTarget;

/// The only engine this handler can rotate.
pub const SUPPORTED_ENGINE: &str = "postgres";

pub const DEFAULT_PORT: u16 = 5432;

pub const DEFAULT_DBNAME: &str = "postgres";

const REQUIRED_FIELDS: [&str; 3] = ["username", "password", "host"];

/// A validated secret document.
#[derive(Clone, PartialEq)]
pub struct SecretDocument {
    username: String,
    password: SecretString,
    host: String,
    engine: String,
    port: u16,
    /// Port exactly as stored, so a derived version round-trips it.
    raw_port: Option<Value>,
    dbname: Option<String>,
    extra: Map<String, Value>,
}

impl SecretDocument {
    /// Parse and validate a secret string.
    ///
    /// The engine is checked first, then the required fields in the order
    /// `username`, `password`, `host`.
    ///
    /// # Errors
    ///
    /// [`RotationError::SecretShape`] if the JSON is not an object, the engine
    /// is missing or unsupported, a required field is missing or not a
    /// string, or `port`/`dbname` are malformed.
    pub fn parse(secret_string: &SecretString) -> Result<Self> {
        let value: Value = serde_json::from_str(secret_string.expose_secret()).map_err(|e| {
            RotationError::secret_shape(format!("Secret string is not valid JSON: {}", e))
        })?;
        let Value::Object(mut fields) = value else {
            return Err(RotationError::secret_shape("Secret string must be a JSON object"));
        };

        match fields.get("engine") {
            Some(Value::String(engine)) if engine == SUPPORTED_ENGINE => {}
            _ => {
                return Err(RotationError::secret_shape(format!(
                    "Database engine must be set to '{}' in order to use this rotation handler",
                    SUPPORTED_ENGINE
                )))
            }
        }

        for field in REQUIRED_FIELDS {
            match fields.get(field) {
                None => {
                    return Err(RotationError::secret_shape(format!(
                        "{} key is missing from secret JSON",
                        field
                    )))
                }
                Some(Value::String(_)) => {}
                Some(_) => {
                    return Err(RotationError::secret_shape(format!("{} must be a string", field)))
                }
            }
        }

        let raw_port = fields.remove("port").filter(|v| !v.is_null());
        let port = match &raw_port {
            None => DEFAULT_PORT,
            Some(value) => parse_port(value)?,
        };

        let dbname = match fields.remove("dbname") {
            None | Some(Value::Null) => None,
            Some(Value::String(name)) => Some(name),
            Some(_) => return Err(RotationError::secret_shape("dbname must be a string")),
        };

        let username = take_string(&mut fields, "username");
        if username.trim().is_empty() {
            return Err(RotationError::secret_shape("username must not be empty"));
        }
        let password = SecretString::new(take_string(&mut fields, "password"));
        let host = take_string(&mut fields, "host");
        let engine = take_string(&mut fields, "engine");

        Ok(Self { username, password, host, engine, port, raw_port, dbname, extra: fields })
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &SecretString {
        &self.password
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn engine(&self) -> &str {
        &self.engine
    }

    /// Port, defaulting to 5432.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Database name, defaulting to `postgres`.
    pub fn dbname(&self) -> &str {
        self.dbname.as_deref().unwrap_or(DEFAULT_DBNAME)
    }

    /// Fields beyond the known six, preserved verbatim.
    pub fn extra_fields(&self) -> &Map<String, Value> {
        &self.extra
    }

    /// Copy of this document with only the password replaced.
    pub fn with_password(&self, password: SecretString) -> Self {
        Self { password, ..self.clone() }
    }

    pub fn connection_target(&self) -> ConnectionTarget {
        ConnectionTarget {
            host: self.host.clone(),
            port: self.port,
            dbname: self.dbname().to_string(),
            username: self.username.clone(),
            password: self.password.clone(),
        }
    }

    /// Serialize back to a secret string, including the real password.
    pub fn to_secret_string(&self) -> Result<SecretString> {
        let mut fields = self.extra.clone();
        fields.insert("username".to_string(), Value::String(self.username.clone()));
        fields.insert(
            "password".to_string(),
            Value::String(self.password.expose_secret().to_string()),
        );
        fields.insert("host".to_string(), Value::String(self.host.clone()));
        fields.insert("engine".to_string(), Value::String(self.engine.clone()));
        if let Some(port) = &self.raw_port {
            fields.insert("port".to_string(), port.clone());
        }
        if let Some(dbname) = &self.dbname {
            fields.insert("dbname".to_string(), Value::String(dbname.clone()));
        }

        serde_json::to_string(&Value::Object(fields)).map(SecretString::from).map_err(|e| {
            RotationError::secret_shape(format!("Failed to serialize secret document: {}", e))
        })
    }
}

impl fmt::Debug for SecretDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretDocument")
            .field("username", &self.username)
            .field("password", &self.password)
            .field("host", &self.host)
            .field("engine", &self.engine)
            .field("port", &self.port)
            .field("dbname", &self.dbname())
            .field("extra_keys", &self.extra.keys().collect::<Vec<_>>())
            .finish()
    }
}

fn take_string(fields: &mut Map<String, Value>, key: &str) -> String {
    match fields.remove(key) {
        Some(Value::String(s)) => s,
        _ => String::new(),
    }
}

/// Accepts a JSON integer, a float with no fractional part, or a numeric string.
fn parse_port(value: &Value) -> Result<u16> {
    let port = match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0 && *f >= 0.0).map(|f| f as u64))
            .and_then(|p| u16::try_from(p).ok()),
        Value::String(s) => s.trim().parse::<u16>().ok(),
        _ => None,
    };
    port.filter(|p| *p != 0).ok_or_else(|| {
        RotationError::secret_shape(format!("port must be a valid TCP port, got {}", value))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: Value) -> Result<SecretDocument> {
        SecretDocument::parse(&SecretString::new(value.to_string()))
    }

    fn valid() -> Value {
        json!({
            "username": "app",
            "password": "static-password",
            "host": "abc.dsql.us-east-1.on.aws",
            "engine": "postgres"
        })
    }

    #[test]
    fn test_parse_applies_defaults() {
        let doc = parse(valid()).unwrap();
        assert_eq!(doc.username(), "app");
        assert_eq!(doc.host(), "abc.dsql.us-east-1.on.aws");
        assert_eq!(doc.port(), DEFAULT_PORT);
        assert_eq!(doc.dbname(), DEFAULT_DBNAME);
        assert_eq!(doc.password().expose_secret(), "static-password");
    }

    #[test]
    fn test_engine_must_be_postgres() {
        let mut missing = valid();
        missing.as_object_mut().unwrap().remove("engine");
        assert!(matches!(parse(missing), Err(RotationError::SecretShape { .. })));

        let mut mysql = valid();
        mysql["engine"] = json!("mysql");
        let err = parse(mysql).unwrap_err();
        assert!(err.to_string().contains("'postgres'"));
    }

    #[test]
    fn test_engine_checked_before_required_fields() {
        let err = parse(json!({ "engine": "mysql" })).unwrap_err();
        assert!(err.to_string().contains("engine"));
    }

    #[test]
    fn test_required_fields_reported_by_name() {
        for field in REQUIRED_FIELDS {
            let mut doc = valid();
            doc.as_object_mut().unwrap().remove(field);
            let err = parse(doc).unwrap_err();
            assert!(matches!(err, RotationError::SecretShape { .. }));
            assert_eq!(
                err.to_string(),
                format!("Secret shape error: {} key is missing from secret JSON", field)
            );
        }
    }

    #[test]
    fn test_rejects_blank_username_and_non_object() {
        let mut doc = valid();
        doc["username"] = json!("   ");
        assert!(parse(doc).is_err());

        assert!(parse(json!(["not", "an", "object"])).is_err());
        assert!(SecretDocument::parse(&SecretString::new("not json")).is_err());
    }

    #[test]
    fn test_port_accepts_number_or_numeric_string() {
        let mut doc = valid();
        doc["port"] = json!(6543);
        assert_eq!(parse(doc).unwrap().port(), 6543);

        let mut doc = valid();
        doc["port"] = json!("6544");
        assert_eq!(parse(doc).unwrap().port(), 6544);

        let mut doc = valid();
        doc["port"] = json!("not-a-port");
        assert!(parse(doc).is_err());

        let mut doc = valid();
        doc["port"] = json!(70000);
        assert!(parse(doc).is_err());
    }

    #[test]
    fn test_port_accepts_whole_float() {
        let mut doc = valid();
        doc["port"] = json!(5432.0);
        let parsed = parse(doc).unwrap();
        assert_eq!(parsed.port(), 5432);

        let written: Value =
            serde_json::from_str(parsed.to_secret_string().unwrap().expose_secret()).unwrap();
        assert_eq!(written["port"], json!(5432.0));

        let mut doc = valid();
        doc["port"] = json!(5432.5);
        assert!(matches!(parse(doc), Err(RotationError::SecretShape { .. })));

        let mut doc = valid();
        doc["port"] = json!(-5432.0);
        assert!(parse(doc).is_err());
    }

    #[test]
    fn test_with_password_preserves_everything_else() {
        let mut source = valid();
        source["port"] = json!("5432");
        source["dbname"] = json!("orders");
        source["dbInstanceIdentifier"] = json!("cluster-1");
        let doc = parse(source).unwrap();

        let rotated = doc.with_password(SecretString::new("new-token"));
        let written: Value =
            serde_json::from_str(rotated.to_secret_string().unwrap().expose_secret()).unwrap();

        assert_eq!(written["password"], "new-token");
        assert_eq!(written["username"], "app");
        assert_eq!(written["port"], "5432");
        assert_eq!(written["dbname"], "orders");
        assert_eq!(written["engine"], "postgres");
        assert_eq!(written["dbInstanceIdentifier"], "cluster-1");
        assert_eq!(rotated.extra_fields().len(), 1);
    }

    #[test]
    fn test_defaults_not_written_back() {
        let doc = parse(valid()).unwrap();
        let written: Value =
            serde_json::from_str(doc.to_secret_string().unwrap().expose_secret()).unwrap();
        assert!(written.get("port").is_none());
        assert!(written.get("dbname").is_none());
    }

    #[test]
    fn test_debug_redacts_password() {
        let doc = parse(valid()).unwrap();
        let rendered = format!("{:?}", doc);
        assert!(!rendered.contains("static-password"));
        assert!(rendered.contains("[REDACTED]"));
    }

    #[test]
    fn test_connection_target_uses_defaults() {
        let target = parse(valid()).unwrap().connection_target();
        assert_eq!(target.port, 5432);
        assert_eq!(target.dbname, "postgres");
        assert_eq!(target.username, "app");
    }
}
