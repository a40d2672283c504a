use serde::{Deserialize, Serialize};

use crate::ConnectError;

/// ADO.NET-style connection string builder for SQL Server.
///
/// Holds the mutable connection descriptor edited by the dialog and renders
/// it as a `Key=Value;` string. Credentials are only emitted when integrated
/// security is off.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionStringBuilder {
    /// Target host/instance name (`Data Source`).
    pub data_source: String,

    /// Use the caller's OS identity instead of explicit credentials.
    pub integrated_security: bool,

    /// Explicit login name (`User ID`). Ignored when integrated security is on.
    pub user_id: String,

    /// Explicit password. Ignored when integrated security is on.
    pub password: String,
}

impl Default for ConnectionStringBuilder {
    /// Local default instance over Windows authentication.
    fn default() -> Self {
        Self {
            data_source: ".".to_string(),
            integrated_security: true,
            user_id: String::new(),
            password: String::new(),
        }
    }
}

impl ConnectionStringBuilder {
    pub fn new(data_source: impl Into<String>) -> Self {
        Self {
            data_source: data_source.into(),
            ..Self::default()
        }
    }

    /// Switches to SQL Server authentication with the given credentials.
    pub fn with_credentials(
        mut self,
        user_id: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.integrated_security = false;
        self.user_id = user_id.into();
        self.password = password.into();
        self
    }

    /// Renders the descriptor as an ADO-style connection string.
    ///
    /// Values containing `;`, `=`, or quote characters, or with leading or
    /// trailing whitespace, are wrapped in single quotes with embedded
    /// quotes doubled.
    pub fn connection_string(&self) -> String {
        let mut parts = vec![format!("Data Source={}", quote_value(&self.data_source))];

        if self.integrated_security {
            parts.push("Integrated Security=True".to_string());
        } else {
            parts.push(format!("User ID={}", quote_value(&self.user_id)));
            parts.push(format!("Password={}", quote_value(&self.password)));
        }

        parts.join(";")
    }

    /// Parses an ADO-style connection string back into a builder.
    ///
    /// Accepts the common key aliases (`Server`, `UID`, `PWD`,
    /// `Trusted_Connection`). Unrecognized keys are rejected.
    pub fn parse(input: &str) -> Result<Self, ConnectError> {
        let mut builder = Self {
            data_source: String::new(),
            integrated_security: false,
            user_id: String::new(),
            password: String::new(),
        };

        for (key, value) in split_pairs(input)? {
            match key.to_ascii_lowercase().as_str() {
                "data source" | "server" | "address" | "addr" => builder.data_source = value,
                "user id" | "uid" | "user" => builder.user_id = value,
                "password" | "pwd" => builder.password = value,
                "integrated security" | "trusted_connection" => {
                    builder.integrated_security = parse_flag(&value)?;
                }
                other => {
                    return Err(ConnectError::InvalidDescriptor(format!(
                        "Unrecognized key: {}",
                        other
                    )));
                }
            }
        }

        Ok(builder)
    }
}

fn quote_value(value: &str) -> String {
    let needs_quoting = value.contains(';')
        || value.contains('=')
        || value.contains('\'')
        || value.contains('"')
        || value.chars().next().is_some_and(char::is_whitespace)
        || value.chars().last().is_some_and(char::is_whitespace);

    if needs_quoting {
        format!("'{}'", value.replace('\'', "''"))
    } else {
        value.to_string()
    }
}

/// Boolean keywords accepted by ADO for `Integrated Security`.
fn parse_flag(value: &str) -> Result<bool, ConnectError> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "yes" | "sspi" => Ok(true),
        "false" | "no" => Ok(false),
        other => Err(ConnectError::InvalidDescriptor(format!(
            "Invalid boolean value: {}",
            other
        ))),
    }
}

/// Splits `Key=Value;` pairs, honoring single- or double-quoted values
/// with doubled-quote escapes.
fn split_pairs(input: &str) -> Result<Vec<(String, String)>, ConnectError> {
    let mut pairs = Vec::new();
    let mut chars = input.chars().peekable();

    loop {
        while let Some(&c) = chars.peek() {
            if c == ';' || c.is_whitespace() {
                chars.next();
            } else {
                break;
            }
        }

        if chars.peek().is_none() {
            break;
        }

        let mut key = String::new();
        let mut found_eq = false;
        for c in chars.by_ref() {
            if c == '=' {
                found_eq = true;
                break;
            }
            key.push(c);
        }

        let key = key.trim().to_string();
        if !found_eq || key.is_empty() {
            return Err(ConnectError::InvalidDescriptor(
                "Expected 'Key=Value' pair".to_string(),
            ));
        }

        while let Some(&c) = chars.peek() {
            if c.is_whitespace() {
                chars.next();
            } else {
                break;
            }
        }

        let mut value = String::new();
        let quote = match chars.peek() {
            Some(&c) if c == '\'' || c == '"' => {
                chars.next();
                Some(c)
            }
            _ => None,
        };

        if let Some(quote) = quote {
            loop {
                match chars.next() {
                    Some(c) if c == quote => {
                        // Doubled quote is an escaped literal quote
                        if chars.peek() == Some(&quote) {
                            value.push(quote);
                            chars.next();
                        } else {
                            break;
                        }
                    }
                    Some(c) => value.push(c),
                    None => {
                        return Err(ConnectError::InvalidDescriptor(
                            "Unterminated quoted value".to_string(),
                        ));
                    }
                }
            }
        } else {
            while let Some(&c) = chars.peek() {
                if c == ';' {
                    break;
                }
                value.push(c);
                chars.next();
            }
            value = value.trim_end().to_string();
        }

        pairs.push((key, value));
    }

    Ok(pairs)
}
