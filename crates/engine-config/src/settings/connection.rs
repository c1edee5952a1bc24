use super::{
    error::SettingsError,
    validator::{SettingsValidator, Validate},
};

pub const DEFAULT_ENDPOINT: &str = "http://localhost:8529";
pub const DEFAULT_USERNAME: &str = "root";

#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    Basic { username: String, password: String },
    Jwt(String),
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credentials::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"***")
                .finish(),
            Credentials::Jwt(_) => f.debug_tuple("Jwt").field(&"***").finish(),
        }
    }
}

impl Credentials {
    /// A JWT wins over username/password when both are present.
    pub fn resolve(jwt: Option<String>, username: Option<String>, password: Option<String>) -> Self {
        match jwt.filter(|t| !t.is_empty()) {
            Some(token) => Credentials::Jwt(token),
            None => Credentials::Basic {
                username: username.unwrap_or_else(|| DEFAULT_USERNAME.to_string()),
                password: password.unwrap_or_default(),
            },
        }
    }

    pub fn is_jwt(&self) -> bool {
        matches!(self, Credentials::Jwt(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionSettings {
    pub endpoints: Vec<String>,
    pub credentials: Credentials,
}

impl ConnectionSettings {
    pub fn new(endpoints: &[String], credentials: Credentials) -> Self {
        Self {
            endpoints: split_endpoints(endpoints),
            credentials,
        }
    }
}

impl Validate for ConnectionSettings {
    fn validate(&self) -> Result<(), SettingsError> {
        SettingsValidator::new()
            .check(!self.endpoints.is_empty(), "at least one endpoint is required")
            .finish()
    }
}

/// Flattens repeated and comma separated endpoint values.
pub fn split_endpoints(values: &[String]) -> Vec<String> {
    values
        .iter()
        .flat_map(|v| v.split(','))
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_are_split_and_trimmed() {
        let values = vec![
            "http://a:8529, http://b:8529".to_string(),
            "http://c:8529".to_string(),
            "".to_string(),
        ];
        assert_eq!(
            split_endpoints(&values),
            vec!["http://a:8529", "http://b:8529", "http://c:8529"]
        );
    }

    #[test]
    fn jwt_takes_precedence() {
        let creds = Credentials::resolve(Some("tok".into()), Some("u".into()), None);
        assert_eq!(creds, Credentials::Jwt("tok".into()));

        let creds = Credentials::resolve(Some(String::new()), None, None);
        assert_eq!(
            creds,
            Credentials::Basic {
                username: "root".into(),
                password: String::new()
            }
        );
    }

    #[test]
    fn empty_endpoint_list_is_rejected() {
        let settings = ConnectionSettings::new(&[], Credentials::Jwt("t".into()));
        assert!(settings.validate().is_err());
    }
}
