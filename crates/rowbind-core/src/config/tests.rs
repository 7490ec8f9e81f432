use super::*;

#[test]
fn defaults_are_valid() {
    let config = MappingConfig::default();

    assert_eq!(config.routine_cache_capacity, 10_000);
    assert_eq!(config.conversion_cache_capacity, 5_000);
    assert_eq!(config.enum_cache_capacity, 1_000);
    assert_eq!(config.validate(), Ok(()));
}

#[test]
fn missing_fields_take_defaults() {
    let config: MappingConfig =
        serde_json::from_str(r#"{ "routine_cache_capacity": 64 }"#).unwrap();

    assert_eq!(config.routine_cache_capacity, 64);
    assert_eq!(
        config.conversion_cache_capacity,
        MappingConfig::DEFAULT_CONVERSION_CACHE_CAPACITY
    );
}

#[test]
fn unknown_fields_are_rejected() {
    let result = serde_json::from_str::<MappingConfig>(r#"{ "routine_capacity": 64 }"#);

    assert!(result.is_err());
}

#[test]
fn zero_capacities_are_rejected() {
    let config = MappingConfig {
        enum_cache_capacity: 0,
        ..MappingConfig::default()
    };

    let err = config.validate().unwrap_err();

    assert_eq!(err.to_string(), "enum_cache_capacity must be greater than zero");
}

#[test]
fn config_survives_json() {
    let config = MappingConfig {
        routine_cache_capacity: 12,
        conversion_cache_capacity: 34,
        enum_cache_capacity: 56,
    };

    let json = serde_json::to_string(&config).unwrap();

    assert_eq!(serde_json::from_str::<MappingConfig>(&json).unwrap(), config);
}
