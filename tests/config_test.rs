use std::time::Duration;

use websearch_relay::{SearchConfigBuilder, ToolkitConfig};

#[test]
fn defaults_match_the_documented_policy() {
    let config = ToolkitConfig::default();

    assert_eq!(config.search.engines, ["google", "bing"]);
    assert_eq!(config.search.failure_threshold, 3);
    assert_eq!(config.search.cooldown, Duration::from_secs(300));
    assert_eq!(config.search.max_retries, 2);
    assert_eq!(config.fetch.default_max_length, 5000);
    assert!(config.browser.headless);
    assert!(config.browser.pacing_min <= config.browser.pacing_max);
}

#[test]
fn full_document_round_trips_through_json() {
    let json = r#"{
        "search": {
            "engines": ["bing"],
            "failover_delay": 500,
            "cooldown": 60000,
            "failure_threshold": 5,
            "num_results": 3
        },
        "browser": { "headless": false, "extra_args": ["--lang=de-DE"] },
        "filter": { "irrelevant_domains": ["spam.example"] },
        "fetch": { "default_max_length": 1200 }
    }"#;

    let config = ToolkitConfig::from_json_str(json).expect("valid config");

    assert_eq!(config.search.engines, ["bing"]);
    assert_eq!(config.search.failover_delay, Duration::from_millis(500));
    assert_eq!(config.search.cooldown, Duration::from_secs(60));
    assert_eq!(config.search.failure_threshold, 5);
    assert_eq!(config.search.num_results, 3);
    assert!(!config.browser.headless);
    assert_eq!(config.browser.extra_args, ["--lang=de-DE"]);
    assert_eq!(config.filter.irrelevant_domains, ["spam.example"]);
    // Unset filter lists keep their defaults
    assert!(!config.filter.query_noise_words.is_empty());
    assert_eq!(config.fetch.default_max_length, 1200);
}

#[test]
fn malformed_json_is_an_error() {
    assert!(ToolkitConfig::from_json_str(r#"{ "search": { "cooldown": "soon" } }"#).is_err());
}

#[test]
fn builder_rejects_unusable_settings() {
    assert!(SearchConfigBuilder::new().engines(Vec::<String>::new()).build().is_err());
    assert!(SearchConfigBuilder::new().failure_threshold(0).build().is_err());
    assert!(SearchConfigBuilder::new().max_retries(0).build().is_err());

    let config = SearchConfigBuilder::new()
        .engines(["bing", "google"])
        .engine_timeout("bing", Duration::from_secs(20))
        .build()
        .expect("valid config");
    assert_eq!(config.timeout_for("bing"), Duration::from_secs(20));
}
