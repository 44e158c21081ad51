//! Behavior of the public diff entry points

use probekit_diff::{diff, diff_with, DiffOption, Node};
use serde::{Serialize, Serializer};
use serde_json::json;
use std::collections::BTreeMap;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone, Default, Serialize)]
struct Exporter {
    name: String,
    sampling_rate: u32,
    interfaces: Vec<String>,
    timeout: Option<Duration>,
    _resolved: bool,
}

struct Broken;

impl Serialize for Broken {
    fn serialize<S: Serializer>(&self, _serializer: S) -> Result<S::Ok, S::Error> {
        Err(serde::ser::Error::custom("broken on purpose"))
    }
}

fn exporter() -> Exporter {
    Exporter {
        name: "edge1".to_string(),
        sampling_rate: 1000,
        interfaces: vec!["eth0".to_string(), "eth1".to_string()],
        timeout: Some(Duration::from_millis(1500)),
        _resolved: false,
    }
}

#[test]
fn test_equal_values_produce_no_diff() {
    assert_eq!(diff(&exporter(), &exporter()), "");
    assert_eq!(diff(&Exporter::default(), &Exporter::default()), "");
    assert_eq!(diff(&json!({"version": "dev"}), &json!({"version": "dev"})), "");
}

#[test]
fn test_field_difference_is_reported() {
    let mut other = exporter();
    other.sampling_rate = 2000;
    let delta = diff(&exporter(), &other);
    assert!(delta.contains("-  sampling_rate: 1000,"), "{}", delta);
    assert!(delta.contains("+  sampling_rate: 2000,"), "{}", delta);
    assert!(delta.contains("   name: \"edge1\","), "{}", delta);
}

#[test]
fn test_sequence_length_is_a_difference() {
    let mut other = exporter();
    other.interfaces.pop();
    let delta = diff(&exporter(), &other);
    assert!(delta.contains("-    \"eth1\","), "{}", delta);
}

#[test]
fn test_zero_fields_are_skipped_by_default() {
    let explicit = Exporter {
        sampling_rate: 0,
        interfaces: Vec::new(),
        ..exporter()
    };
    let unset = Exporter {
        interfaces: Vec::new(),
        sampling_rate: 0,
        ..exporter()
    };
    assert_eq!(diff(&explicit, &unset), "");

    // None and Some(0) are both zero valued
    let none = Exporter {
        timeout: None,
        ..exporter()
    };
    let zero = Exporter {
        timeout: Some(Duration::ZERO),
        ..exporter()
    };
    assert_eq!(diff(&none, &zero), "");
    assert_ne!(diff_with(&none, &zero, &[DiffOption::Zero]), "");
}

#[test]
fn test_unexported_fields_are_hidden_by_default() {
    let resolved = Exporter {
        _resolved: true,
        ..exporter()
    };
    assert_eq!(diff(&exporter(), &resolved), "");
    let delta = diff_with(&exporter(), &resolved, &[DiffOption::Unexported]);
    assert!(delta.contains("+  _resolved: true,"), "{}", delta);
}

#[test]
fn test_duration_is_rendered_through_formatter() {
    let slower = Exporter {
        timeout: Some(Duration::from_secs(2)),
        ..exporter()
    };
    let delta = diff(&exporter(), &slower);
    assert!(delta.contains("-  timeout: 1.5s,"), "{}", delta);
    assert!(delta.contains("+  timeout: 2s,"), "{}", delta);
}

#[test]
fn test_system_time_is_rendered_through_formatter() {
    let epoch = UNIX_EPOCH;
    let later = UNIX_EPOCH + Duration::from_secs(60);
    assert_eq!(diff(&epoch, &epoch), "");
    assert_eq!(
        diff(&epoch, &later),
        "-1970-01-01T00:00:00Z\n+1970-01-01T00:01:00Z"
    );
    let now = SystemTime::now();
    assert_eq!(diff(&now, &now), "");
}

#[test]
fn test_custom_formatter_overrides_structural_comparison() {
    // Only the name identifies an exporter once this formatter is registered
    let by_name = DiffOption::formatter_for::<Exporter, _>(|node: &Node| {
        node.field("name")
            .and_then(Node::as_str)
            .unwrap_or_default()
            .to_string()
    });
    let other = Exporter {
        sampling_rate: 1,
        ..exporter()
    };
    assert_eq!(diff_with(&exporter(), &other, &[by_name.clone()]), "");

    let renamed = Exporter {
        name: "edge2".to_string(),
        ..exporter()
    };
    assert_eq!(
        diff_with(&exporter(), &renamed, &[by_name]),
        "-edge1\n+edge2"
    );
}

#[derive(Debug, Clone, Serialize)]
enum Level {
    Debug,
    Trace,
    Custom(String),
}

#[derive(Debug, Clone, Serialize)]
struct Logging {
    level: Level,
}

#[test]
fn test_formatter_applies_to_enum_types() {
    let verbose = DiffOption::formatter_for::<Level, _>(|node: &Node| match node {
        Node::Variant { variant, .. } if *variant == "Custom" => "custom".to_string(),
        _ => "verbose".to_string(),
    });
    let debug = Logging { level: Level::Debug };
    let trace = Logging { level: Level::Trace };
    assert_ne!(diff(&debug, &trace), "");
    assert_eq!(diff_with(&debug, &trace, &[verbose.clone()]), "");

    let custom = Logging {
        level: Level::Custom("warn".to_string()),
    };
    let delta = diff_with(&debug, &custom, &[verbose]);
    assert!(delta.contains("-  level: verbose,"), "{}", delta);
    assert!(delta.contains("+  level: custom,"), "{}", delta);
}

#[test]
fn test_options_apply_to_a_single_call() {
    let none = Exporter {
        timeout: None,
        ..exporter()
    };
    let zero = Exporter {
        timeout: Some(Duration::ZERO),
        ..exporter()
    };
    assert_ne!(diff_with(&none, &zero, &[DiffOption::Zero]), "");
    assert_eq!(diff(&none, &zero), "");
}

#[test]
fn test_integer_and_float_compare_equal() {
    assert_eq!(diff(&json!({"port": 8080}), &json!({"port": 8080.0})), "");
    assert_ne!(diff(&json!({"port": 8080}), &json!({"port": 8080.5})), "");
}

#[test]
fn test_large_integer_differs_from_nearest_float() {
    // 2^53 + 1 has no exact f64 representation
    let got = json!({"bytes": 9_007_199_254_740_993_u64});
    let want = json!({"bytes": 9_007_199_254_740_992.0_f64});
    assert_ne!(diff(&got, &want), "");
    let want = json!({"bytes": 9_007_199_254_740_992_u64});
    assert_eq!(diff(&want, &json!({"bytes": 9_007_199_254_740_992.0_f64})), "");
}

#[test]
fn test_map_keys_are_compared_key_by_key() {
    let mut got = BTreeMap::new();
    got.insert("a", 1);
    got.insert("b", 2);
    let mut want = got.clone();
    want.remove("b");
    want.insert("c", 3);
    let delta = diff(&got, &want);
    assert_eq!(
        delta,
        [" {", "   \"a\": 1,", "-  \"b\": 2,", "+  \"c\": 3,", " }"].join("\n")
    );
}

#[test]
fn test_json_null_entry_differs_from_absent_entry() {
    assert_ne!(diff(&json!({"a": null}), &json!({})), "");
}

#[test]
fn test_unserializable_value_is_reported_in_diff() {
    let delta = diff(&Broken, &json!(1));
    assert_eq!(delta, "-!(cannot compare: broken on purpose)");
}

#[test]
fn test_string_sequences() {
    let got = vec!["line 1".to_string(), "line 2".to_string()];
    let want = ["line 1", "line 2"];
    assert_eq!(diff(&got, &want), "");
}
