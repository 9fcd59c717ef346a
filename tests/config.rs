use gaswatch::config::RuntimeConfig;

#[test]
fn test_shipped_config_matches_defaults() {
    let config = RuntimeConfig::from_yaml(include_str!("../gaswatch.yml")).unwrap();
    assert_eq!(config, RuntimeConfig::default());
    // No sound file ships with the crate; alarms are silent until one is set
    assert!(config.monitor.alarm_sound.is_none());
    assert!(config.monitor.test_reading_ppm > config.monitor.threshold_ppm);
}
