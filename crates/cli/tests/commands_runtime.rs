use std::env;
use std::sync::{Mutex, OnceLock};

use chrono::NaiveDate;
use farecast_cli::commands::{backtest, collect, migrate, predict};
use serde_json::Value;

#[test]
fn migrate_returns_success_with_valid_env() {
    with_env(&[("FARECAST_DATABASE_URL", "sqlite::memory:?cache=shared")], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 0, "expected successful migrate run");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "migrate");
        assert_eq!(payload["status"], "ok");
    });
}

#[test]
fn predict_rejects_a_malformed_route_before_touching_config() {
    with_env(&[], || {
        let result = predict::run("L1R", "JFK", date(2026, 7, 10));
        assert_eq!(result.exit_code, 6, "expected invalid input failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "predict");
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "invalid_input");
    });
}

#[test]
fn predict_serves_an_advisory_from_the_fallback_provider() {
    with_env(&[("FARECAST_DATABASE_URL", "sqlite::memory:?cache=shared")], || {
        let result = predict::run("LHR", "JFK", date(2026, 7, 10));
        assert_eq!(result.exit_code, 0, "expected successful predict run");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "predict");
        assert_eq!(payload["status"], "ok");

        let details = &payload["details"];
        assert_eq!(details["route"], "LHR-JFK");
        assert!(details["quote_count"].as_u64().expect("quote count") > 0);

        let recommendation =
            details["prediction"]["recommendation"].as_str().expect("recommendation");
        assert!(["buy_now", "wait"].contains(&recommendation));
        assert!(details["prediction"]["current_price"].as_f64().expect("price") > 0.0);
    });
}

#[test]
fn collect_rejects_an_inverted_date_range() {
    with_env(&[], || {
        let result = collect::run(&["LHR-JFK".to_string()], date(2026, 3, 1), date(2026, 1, 1));
        assert_eq!(result.exit_code, 6, "expected invalid input failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "collect");
        assert_eq!(payload["error_class"], "invalid_input");
    });
}

#[test]
fn collect_stores_one_point_per_booking_offset() {
    with_env(&[("FARECAST_DATABASE_URL", "sqlite::memory:?cache=shared")], || {
        let day = date(2026, 2, 2);
        let result = collect::run(&["LHR-JFK".to_string()], day, day);
        assert_eq!(result.exit_code, 0, "expected successful collect run");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "collect");
        assert_eq!(payload["status"], "ok");
        // One observation date times the seven booking offsets.
        assert_eq!(payload["details"]["points"], 7);
        assert_eq!(payload["details"]["routes"], 1);
    });
}

#[test]
fn backtest_fails_cleanly_on_an_empty_series() {
    with_env(&[("FARECAST_DATABASE_URL", "sqlite::memory:?cache=shared")], || {
        let result = backtest::run(90);
        assert_eq!(result.exit_code, 6, "expected insufficient data failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "backtest");
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "insufficient_data");
    });
}

#[test]
fn backtest_rejects_a_nonpositive_window() {
    with_env(&[], || {
        let result = backtest::run(0);
        assert_eq!(result.exit_code, 6, "expected invalid input failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "backtest");
        assert_eq!(payload["error_class"], "invalid_input");
    });
}

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "FARECAST_DATABASE_URL",
        "FARECAST_LOG_LEVEL",
        "FARECAST_LOG_FORMAT",
        "FARECAST_SERVER_PORT",
        "FARECAST_AMADEUS_API_KEY",
        "FARECAST_SKYLINK_API_KEY",
        "FARECAST_KIWI_API_KEY",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
