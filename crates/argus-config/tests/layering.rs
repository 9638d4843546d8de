//! Layering tests for config loading.
//!
//! Uses `figment::Jail` for sandboxed env var and file manipulation.

use argus_config::{ArgusConfig, ConfigError};
use figment::{
    Figment, Jail,
    providers::{Env, Format, Serialized, Toml},
};
use pretty_assertions::assert_eq;

#[test]
fn loads_sections_from_toml() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "config.toml",
            r#"
[dispatch]
timeout_secs = 3
max_retries = 4
max_concurrency = 2

[selector]
oracle_weight = 0.8

[oracle]
endpoint = "http://localhost:9100/rank"
"#,
        )?;

        let config: ArgusConfig = Figment::from(Serialized::defaults(ArgusConfig::default()))
            .merge(Toml::file("config.toml"))
            .extract()?;

        assert_eq!(config.dispatch.timeout_secs, 3);
        assert_eq!(config.dispatch.max_retries, 4);
        assert_eq!(config.dispatch.max_concurrency, 2);
        // Untouched fields keep their defaults.
        assert_eq!(config.dispatch.backoff_base_ms, 250);
        assert!((config.selector.oracle_weight - 0.8).abs() < f64::EPSILON);
        assert!(config.oracle.is_configured());
        Ok(())
    });
}

#[test]
fn env_overrides_toml() {
    Jail::expect_with(|jail| {
        jail.create_file("config.toml", "[dispatch]\ntimeout_secs = 3\n")?;
        jail.set_env("ARGUS_DISPATCH__TIMEOUT_SECS", "30");
        jail.set_env("ARGUS_STORE__ROOT", "/var/lib/argus");

        let config: ArgusConfig = Figment::from(Serialized::defaults(ArgusConfig::default()))
            .merge(Toml::file("config.toml"))
            .merge(Env::prefixed("ARGUS_").split("__"))
            .extract()?;

        assert_eq!(config.dispatch.timeout_secs, 30);
        assert_eq!(config.store.root, "/var/lib/argus");
        Ok(())
    });
}

#[test]
fn project_config_is_picked_up() {
    Jail::expect_with(|jail| {
        jail.create_dir(".argus")?;
        jail.create_file(".argus/config.toml", "[selector]\ndefault_limit = 3\n")?;

        let config = ArgusConfig::load_for(jail.directory()).expect("config loads");
        assert_eq!(config.selector.default_limit, 3);
        Ok(())
    });
}

#[test]
fn out_of_range_weight_is_rejected() {
    Jail::expect_with(|jail| {
        jail.set_env("ARGUS_SELECTOR__ORACLE_WEIGHT", "1.5");

        let err = ArgusConfig::load_for(jail.directory()).unwrap_err();
        assert!(
            matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "selector.oracle_weight"),
            "{err}"
        );
        Ok(())
    });
}
