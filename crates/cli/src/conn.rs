use crate::error::CliError;
use async_trait::async_trait;
use connectors::{
    api::ClusterApi,
    http::{Auth, HttpCluster},
};
use engine_config::settings::connection::{ConnectionSettings, Credentials};
use std::sync::Arc;
use tracing::{error, info};

/// Request authentication for a set of credentials.
pub fn auth(credentials: &Credentials) -> Auth {
    match credentials {
        Credentials::Basic { username, password } => Auth::Basic {
            username: username.clone(),
            password: password.clone(),
        },
        Credentials::Jwt(token) => Auth::Jwt(token.clone()),
    }
}

/// Builds the HTTP client for one cluster.
pub fn connect(settings: &ConnectionSettings) -> Result<Arc<dyn ClusterApi>, CliError> {
    let cluster = HttpCluster::connect(&settings.endpoints, auth(&settings.credentials))?;
    Ok(Arc::new(cluster))
}

/// Trait for "pinging" a cluster
#[async_trait]
pub trait ConnectionPinger {
    /// Attempts to ping; returns Err if unreachable
    async fn ping(&self) -> Result<(), CliError>;
}

/// Lists databases to prove the endpoint answers and accepts the credentials.
pub struct ClusterPinger {
    pub label: &'static str,
    pub cluster: Arc<dyn ClusterApi>,
}

#[async_trait]
impl ConnectionPinger for ClusterPinger {
    async fn ping(&self) -> Result<(), CliError> {
        info!("Pinging {} cluster", self.label);
        match self.cluster.database_names().await {
            Ok(names) => {
                info!(databases = names.len(), "{} cluster is reachable", self.label);
                Ok(())
            }
            Err(e) => {
                error!("{} cluster ping failed: {e}", self.label);
                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use connectors::memory::MemoryCluster;

    #[test]
    fn credentials_map_to_auth() {
        assert!(matches!(auth(&Credentials::Jwt("tok".into())), Auth::Jwt(t) if t == "tok"));

        assert!(matches!(
            auth(&Credentials::resolve(None, None, Some("pw".into()))),
            Auth::Basic { username, password } if username == "root" && password == "pw"
        ));
    }

    #[tokio::test]
    async fn ping_reports_listing_failures() {
        let cluster = MemoryCluster::new();
        let pinger = ClusterPinger {
            label: "target",
            cluster: Arc::new(cluster.clone()),
        };
        assert!(pinger.ping().await.is_ok());

        cluster.fail_database_listing().await;
        assert!(matches!(pinger.ping().await, Err(CliError::Connect(_))));
    }
}
