use tiberius::{AuthMethod, Config as TiberiusConfig, EncryptionLevel};

use crate::config::TargetConfig;

/// Translate a validated target configuration into a tiberius client config.
#[must_use]
pub fn build_tiberius_config(target: &TargetConfig) -> TiberiusConfig {
    let mut config = TiberiusConfig::new();
    config.host(&target.server);
    config.port(target.port);
    config.database(&target.database);
    config.authentication(AuthMethod::sql_server(&target.user, &target.password));
    if let Some(instance) = &target.instance_name {
        config.instance_name(instance);
    }
    config.encryption(if target.encrypt {
        EncryptionLevel::Required
    } else {
        EncryptionLevel::Off
    });
    if target.trust_server_certificate {
        config.trust_cert();
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Target;

    #[test]
    fn address_comes_from_server_and_port() {
        let target =
            TargetConfig::builder(Target::Primary, "db.internal", "dashboard", "app", "s3cret")
                .port(14330)
                .build()
                .unwrap();
        let config = build_tiberius_config(&target);
        assert_eq!(config.get_addr(), "db.internal:14330");
    }
}
