//! Configuration check.
//!
//! Loads the site configuration exactly as the server does and prints a
//! summary without secrets.

use std::io::Write;

use thiserror::Error;

use yard_patrol_site::config::{ConfigError, SiteConfig};
use yard_patrol_site::state::{AppState, StateError};

/// Errors reported by `config check`.
#[derive(Debug, Error)]
pub enum ConfigCheckError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    State(#[from] StateError),

    #[error("Identity provider at {0} is not reachable")]
    IdentityUnreachable(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Load the configuration and print a summary to `output`.
///
/// # Errors
///
/// Returns an error if the configuration is invalid or, with `probe`, the
/// identity provider does not answer its health check.
pub async fn check(probe: bool, mut output: impl Write) -> Result<(), ConfigCheckError> {
    let config = SiteConfig::from_env()?;
    write_summary(&config, &mut output)?;

    if probe {
        let identity_url = config.identity.url.to_string();
        let state = AppState::new(config)?;
        if !state.identity().is_healthy().await {
            return Err(ConfigCheckError::IdentityUnreachable(identity_url));
        }
        writeln!(output, "identity provider: reachable")?;
    }

    writeln!(output, "configuration OK")?;
    Ok(())
}

fn write_summary(config: &SiteConfig, output: &mut impl Write) -> std::io::Result<()> {
    writeln!(output, "listen:            {}", config.socket_addr())?;
    writeln!(output, "base url:          {}", config.base_url)?;
    writeln!(output, "identity provider: {}", config.identity.url)?;
    writeln!(output, "admin username:    {}", config.admin.username)?;
    match &config.admin.api_url {
        Some(url) => writeln!(output, "admin login api:   {url}")?,
        None => writeln!(output, "admin login api:   in-process")?,
    }
    match config.billing.publishable_key() {
        Some(key) if key.is_test_mode() => writeln!(output, "stripe:            test mode")?,
        Some(_) => writeln!(output, "stripe:            live mode")?,
        None => writeln!(output, "stripe:            no publishable key")?,
    }
    for plan in config.billing.plans() {
        writeln!(
            output,
            "  plan {:<13} {:<16} {}",
            plan.id.as_str(),
            plan.price_label(),
            plan.stripe_price_id.as_str()
        )?;
    }
    writeln!(
        output,
        "sentry:            {}",
        if config.sentry_dsn.is_some() {
            "enabled"
        } else {
            "disabled"
        }
    )?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    use std::net::{IpAddr, Ipv4Addr};

    use secrecy::SecretString;
    use yard_patrol_core::billing::BillingCatalog;
    use yard_patrol_site::config::{AdminCredentialsConfig, IdentityConfig};

    fn config() -> SiteConfig {
        SiteConfig {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 3000,
            base_url: "http://localhost:3000".to_string(),
            identity: IdentityConfig {
                url: "https://auth.yardpatrol.test".parse().unwrap(),
                anon_key: SecretString::from("kX9#mQ2$vL7@pR4!"),
            },
            admin: AdminCredentialsConfig {
                username: "operator".to_string(),
                password_hash: SecretString::from("$argon2id$v=19$m=19456,t=2,p=1$c2FsdA$aGFzaA"),
                api_url: None,
            },
            billing: BillingCatalog::new(),
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 1.0,
        }
    }

    #[test]
    fn test_summary_lists_plans_without_secrets() {
        let mut output = Vec::new();
        write_summary(&config(), &mut output).unwrap();
        let text = String::from_utf8(output).unwrap();

        assert!(text.contains("listen:            127.0.0.1:3000"));
        assert!(text.contains("admin login api:   in-process"));
        assert!(text.contains("price_1PYardWeekly"));
        assert!(text.contains("$25.00 / week"));
        assert!(!text.contains("kX9#"));
        assert!(!text.contains("$argon2id"));
    }
}
