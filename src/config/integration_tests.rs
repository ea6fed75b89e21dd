// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

#[cfg(test)]
mod integration_tests {
    use crate::config::consts::DEFAULT_CONFIG_PATH;
    use crate::config::load_and_validate_config;

    /// The shipped YAML config loads and validates
    #[test]
    fn test_runtime_yaml_loading() {
        let config = load_and_validate_config(DEFAULT_CONFIG_PATH).unwrap();

        assert_eq!(config.transform.threshold_min, 20);
        assert_eq!(config.transform.threshold_max, 100);
        assert_eq!(config.transform.max_per_turn, Some(64));
        assert_eq!(config.logging.filter, "streamwork=info");
    }

    /// The TOML variant carries the same settings
    #[test]
    fn test_runtime_toml_matches_yaml() {
        let yaml = load_and_validate_config("configs/runtime.yaml").unwrap();
        let toml = load_and_validate_config("configs/runtime.toml").unwrap();

        assert_eq!(yaml.transform, toml.transform);
        assert_eq!(yaml.logging.filter, toml.logging.filter);
    }
}
