// tests/options_format.rs

use proptest::prelude::*;
use relaunch::config::options::{OptionValue, is_reserved_key};
use relaunch::config::{ServerOptions, flag_for_key, format_args};
use relaunch::errors::RelaunchError;

#[test]
fn single_character_keys_become_short_flags() {
    assert_eq!(flag_for_key("p"), "-p");
    assert_eq!(flag_for_key("V"), "-V");
}

#[test]
fn camel_case_keys_become_kebab_long_flags() {
    assert_eq!(flag_for_key("port"), "--port");
    assert_eq!(flag_for_key("maxAge"), "--max-age");
    assert_eq!(flag_for_key("enableHttp2Push"), "--enable-http2-push");
}

#[test]
fn values_follow_their_flag_in_insertion_order() {
    let options = ServerOptions::new()
        .with("port", 5000_i64)
        .with("h", "localhost")
        .with_flag("watch")
        .with("ratio", 0.5_f64)
        .with("logLevel", "debug");

    assert_eq!(
        format_args(&options),
        vec![
            "--port",
            "5000",
            "-h",
            "localhost",
            "--watch",
            "--ratio",
            "0.5",
            "--log-level",
            "debug",
        ]
    );
}

#[test]
fn reserved_keys_are_not_passed_through() {
    let options = ServerOptions::new()
        .with("path", "apps/web")
        .with("port", 80_i64)
        .with("config", "conf/settings.yml");

    assert_eq!(format_args(&options), vec!["--port", "80"]);
    assert!(is_reserved_key("path"));
    assert!(is_reserved_key("config"));
    assert!(!is_reserved_key("configFile"));
}

#[test]
fn reinserting_a_key_keeps_its_position() {
    let mut options = ServerOptions::new().with("a", 1_i64).with("b", 2_i64);
    options.insert("a", 3_i64);

    assert_eq!(format_args(&options), vec!["-a", "3", "-b", "2"]);
}

#[test]
fn numbers_are_stringified_losslessly() {
    assert_eq!(OptionValue::Integer(-42).to_arg().as_deref(), Some("-42"));
    assert_eq!(OptionValue::Integer(i64::MAX).to_arg().as_deref(), Some("9223372036854775807"));
    assert_eq!(OptionValue::Float(1.0).to_arg().as_deref(), Some("1"));
    assert_eq!(OptionValue::Float(0.1).to_arg().as_deref(), Some("0.1"));
    assert_eq!(OptionValue::Absent.to_arg(), None);
}

#[test]
fn toml_true_is_an_absent_value() {
    let table: toml::Table = toml::from_str("verbose = true\nport = 1").unwrap();
    let options = ServerOptions::from_toml_table(&table).unwrap();

    assert_eq!(format_args(&options), vec!["--verbose", "--port", "1"]);
}

#[test]
fn unsupported_toml_values_are_rejected() {
    for (source, received) in [
        ("quiet = false", "boolean"),
        ("hosts = [\"a\", \"b\"]", "array"),
        ("tls = { cert = \"x\" }", "table"),
        ("since = 1979-05-27", "datetime"),
    ] {
        let table: toml::Table = toml::from_str(source).unwrap();
        match ServerOptions::from_toml_table(&table) {
            Err(RelaunchError::InvalidOption { received: got, expected, .. }) => {
                assert_eq!(got, received, "for {source}");
                assert_eq!(expected, "string, number, or true");
            }
            other => panic!("expected InvalidOption for {source}, got {other:?}"),
        }
    }
}

#[test]
fn non_finite_floats_are_rejected() {
    for (source, key, received) in [
        ("limit = inf", "limit", "infinity"),
        ("floor = -inf", "floor", "infinity"),
        ("ratio = nan", "ratio", "nan"),
    ] {
        let table: toml::Table = toml::from_str(source).unwrap();
        match ServerOptions::from_toml_table(&table) {
            Err(RelaunchError::InvalidOption { key: got_key, expected, received: got }) => {
                assert_eq!(got_key, key, "for {source}");
                assert_eq!(expected, "finite number");
                assert_eq!(got, received, "for {source}");
            }
            other => panic!("expected InvalidOption for {source}, got {other:?}"),
        }
    }

    let table: toml::Table = toml::from_str("ratio = 0.5").unwrap();
    let options = ServerOptions::from_toml_table(&table).unwrap();
    assert_eq!(format_args(&options), vec!["--ratio", "0.5"]);
}

#[test]
fn invalid_option_message_names_key_and_types() {
    let table: toml::Table = toml::from_str("quiet = false").unwrap();
    let err = ServerOptions::from_toml_table(&table).unwrap_err();

    assert_eq!(
        err.to_string(),
        "option \"quiet\" must be of type string, number, or true, got boolean"
    );
}

fn key_strategy() -> impl Strategy<Value = String> {
    "[a-z][a-zA-Z0-9]{0,10}".prop_filter("reserved", |k| !is_reserved_key(k))
}

fn value_strategy() -> impl Strategy<Value = OptionValue> {
    prop_oneof![
        "[a-z0-9./]{1,8}".prop_map(OptionValue::String),
        any::<i64>().prop_map(OptionValue::Integer),
        Just(OptionValue::Absent),
    ]
}

proptest! {
    #[test]
    fn argument_list_mirrors_options(
        entries in proptest::collection::vec((key_strategy(), value_strategy()), 0..8)
    ) {
        let mut options = ServerOptions::new();
        for (key, value) in &entries {
            options.insert(key.clone(), value.clone());
        }

        let args = format_args(&options);

        // Rebuild the expectation from the deduplicated, ordered map.
        let mut expected = Vec::new();
        for (key, value) in options.iter() {
            let flag = flag_for_key(key);
            if key.len() == 1 {
                prop_assert_eq!(&flag, &format!("-{key}"));
            } else {
                prop_assert!(flag.starts_with("--"));
                prop_assert!(!flag.chars().any(|c| c.is_ascii_uppercase()));
            }
            expected.push(flag);
            if let Some(arg) = value.to_arg() {
                expected.push(arg);
            }
        }
        prop_assert_eq!(args, expected);
    }

    #[test]
    fn integers_round_trip_through_their_argument(n in any::<i64>()) {
        let arg = OptionValue::Integer(n).to_arg().unwrap();
        prop_assert_eq!(arg.parse::<i64>().unwrap(), n);
    }

    #[test]
    fn floats_round_trip_through_their_argument(x in any::<f64>().prop_filter("finite", |x| x.is_finite())) {
        let arg = OptionValue::Float(x).to_arg().unwrap();
        prop_assert_eq!(arg.parse::<f64>().unwrap(), x);
    }
}
