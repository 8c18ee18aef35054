//! Process Filter
//!
//! Applies each provider's process rules to its raw catalog, renames the
//! surviving processes to `<provider>:<id>` and flattens everything into one
//! listing in registry order.
//!
//! Only processes named in the provider's rules are listed. A process is
//! dropped when any of its option entries sets a truthy `exclude`.

use indexmap::IndexMap;
use serde_json::Value;
use tracing::{debug, error};

use crate::config::{ProviderConfig, ProviderRegistry};
use crate::types::{error_chain, FilterError, ProcessDescriptor, ProcessList, RawCatalogs};

/// What the rules say about one process id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessDecision {
    Include,
    /// Id is not named in the provider's rules
    NotConfigured,
    /// An option entry sets `exclude: true`
    Excluded,
}

/// A provider's parsed process rules: configured id -> excluded
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcessRules {
    rules: IndexMap<String, bool>,
}

impl ProcessRules {
    /// Parse the raw `processes` value of a provider.
    ///
    /// A null value means no rules. An id listed in several entries has its
    /// options merged.
    pub fn parse(provider: &str, value: &Value) -> Result<Self, FilterError> {
        let entries = match value {
            Value::Null => return Ok(Self::default()),
            Value::Array(entries) => entries,
            other => {
                return Err(FilterError::malformed(
                    provider,
                    format!("expected a list of process entries, found {}", kind(other)),
                ))
            }
        };

        let mut rules = IndexMap::new();

        for entry in entries {
            let Value::Object(entry) = entry else {
                return Err(FilterError::malformed(
                    provider,
                    format!("expected a process entry mapping, found {}", kind(entry)),
                ));
            };

            for (id, options) in entry {
                let excluded = excluded_by(provider, id, options)?;
                *rules.entry(id.clone()).or_insert(false) |= excluded;
            }
        }

        Ok(Self { rules })
    }

    pub fn decide(&self, id: &str) -> ProcessDecision {
        match self.rules.get(id) {
            None => ProcessDecision::NotConfigured,
            Some(true) => ProcessDecision::Excluded,
            Some(false) => ProcessDecision::Include,
        }
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

fn excluded_by(provider: &str, id: &str, options: &Value) -> Result<bool, FilterError> {
    let options = match options {
        Value::Null => return Ok(false),
        Value::Array(options) => options,
        other => {
            return Err(FilterError::malformed(
                provider,
                format!("options of process {} must be a list, found {}", id, kind(other)),
            ))
        }
    };

    let mut excluded = false;
    for option in options {
        let Value::Object(option) = option else {
            return Err(FilterError::malformed(
                provider,
                format!("option of process {} must be a mapping, found {}", id, kind(option)),
            ));
        };

        if let Some(flag) = option.get("exclude") {
            excluded |= is_truthy(flag);
        }
    }

    Ok(excluded)
}

/// Truthiness of an `exclude` value.
///
/// Empty and zero values are false. Unquoted YAML 1.1 booleans (`yes`, `no`,
/// `on`, `off`, `y`, `n`) arrive as strings and keep their boolean meaning.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => match s.to_ascii_lowercase().as_str() {
            "" | "no" | "n" | "off" | "false" => false,
            _ => true,
        },
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "a mapping",
    }
}

/// Filter and rename one provider's catalog.
///
/// Rules are only parsed when the catalog is non-empty, so a provider that
/// returned nothing never reports a rules error.
pub fn filter_provider(
    key: &str,
    provider: &ProviderConfig,
    catalog: Vec<ProcessDescriptor>,
) -> Result<Vec<ProcessDescriptor>, FilterError> {
    if catalog.is_empty() {
        return Ok(catalog);
    }

    let rules = ProcessRules::parse(key, &provider.processes)?;
    let name = provider.display_name(key);
    let mut accepted = Vec::with_capacity(catalog.len().min(rules.len()));

    for mut process in catalog {
        debug!("Checking process {} of provider {}", process.id, name);

        match rules.decide(&process.id) {
            ProcessDecision::NotConfigured => {
                debug!("Process ID {} is not configured", process.id);
            }
            ProcessDecision::Excluded => {
                debug!("Excluding process {} based on configuration", process.id);
            }
            ProcessDecision::Include => {
                process.qualify(key);
                accepted.push(process);
            }
        }
    }

    Ok(accepted)
}

/// Build the aggregated listing from the raw catalogs, in registry order
pub fn build_process_list(registry: &ProviderRegistry, mut raw: RawCatalogs) -> ProcessList {
    let mut processes = Vec::new();

    for (key, provider) in registry.iter() {
        match filter_provider(key, provider, raw.take(key)) {
            Ok(accepted) => processes.extend(accepted),
            Err(e) => {
                error!(
                    provider = %key,
                    "Something seems to be wrong with the configuration of provider {}: {}",
                    key,
                    error_chain(&e)
                );
            }
        }
    }

    ProcessList { processes }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::CapturedLogs;
    use crate::types::FetchError;
    use serde_json::json;

    fn registry(yaml: &str) -> ProviderRegistry {
        ProviderRegistry::from_yaml_str(yaml).unwrap()
    }

    fn catalog(ids: &[&str]) -> Vec<ProcessDescriptor> {
        ids.iter().map(|id| ProcessDescriptor::new(*id)).collect()
    }

    #[test]
    fn test_rules_decisions() {
        let rules = ProcessRules::parse(
            "a",
            &json!([
                {"p1": [{"exclude": false}]},
                {"p2": [{"exclude": true}]},
                {"p3": null},
                {"p4": []},
            ]),
        )
        .unwrap();

        assert_eq!(rules.len(), 4);
        assert_eq!(rules.decide("p1"), ProcessDecision::Include);
        assert_eq!(rules.decide("p2"), ProcessDecision::Excluded);
        assert_eq!(rules.decide("p3"), ProcessDecision::Include);
        assert_eq!(rules.decide("p4"), ProcessDecision::Include);
        assert_eq!(rules.decide("p5"), ProcessDecision::NotConfigured);
    }

    #[test]
    fn test_exclude_anywhere_in_options_wins() {
        let rules = ProcessRules::parse(
            "a",
            &json!([{"p1": [{"exclude": false}, {"title": "x"}, {"exclude": true}]}]),
        )
        .unwrap();

        assert_eq!(rules.decide("p1"), ProcessDecision::Excluded);
    }

    #[test]
    fn test_repeated_id_merges_options() {
        let rules = ProcessRules::parse(
            "a",
            &json!([{"p1": [{"exclude": false}]}, {"p1": [{"exclude": true}]}]),
        )
        .unwrap();

        assert_eq!(rules.len(), 1);
        assert_eq!(rules.decide("p1"), ProcessDecision::Excluded);
    }

    #[test]
    fn test_exclude_truthiness() {
        let cases = [
            (json!(null), ProcessDecision::Include),
            (json!(0), ProcessDecision::Include),
            (json!(""), ProcessDecision::Include),
            (json!([]), ProcessDecision::Include),
            (json!({}), ProcessDecision::Include),
            (json!("no"), ProcessDecision::Include),
            (json!("Off"), ProcessDecision::Include),
            (json!(1), ProcessDecision::Excluded),
            (json!(0.5), ProcessDecision::Excluded),
            (json!("yes"), ProcessDecision::Excluded),
            (json!("true"), ProcessDecision::Excluded),
            (json!("anything"), ProcessDecision::Excluded),
            (json!(["x"]), ProcessDecision::Excluded),
            (json!({"k": "v"}), ProcessDecision::Excluded),
        ];

        for (flag, expected) in cases {
            let rules = ProcessRules::parse("a", &json!([{"p1": [{"exclude": flag.clone()}]}])).unwrap();
            assert_eq!(rules.decide("p1"), expected, "exclude: {}", flag);
        }
    }

    #[test]
    fn test_yaml_yes_excludes_only_that_process() {
        let registry = registry(
            "a:\n  url: http://a\n  processes:\n    - p1:\n    - p2:\n        - exclude: yes\n",
        );

        let mut raw = RawCatalogs::new();
        raw.record("a", Ok(catalog(&["p1", "p2"])));

        let list = build_process_list(&registry, raw);

        assert_eq!(list.ids(), vec!["a:p1"]);
    }

    #[test]
    fn test_null_rules_configure_nothing() {
        let rules = ProcessRules::parse("a", &Value::Null).unwrap();
        assert!(rules.is_empty());
        assert_eq!(rules.decide("p1"), ProcessDecision::NotConfigured);
    }

    #[test]
    fn test_malformed_rules_rejected() {
        let cases = [
            json!("oops"),
            json!(["p1"]),
            json!([{"p1": "exclude"}]),
            json!([{"p1": ["exclude"]}]),
        ];

        for case in cases {
            let err = ProcessRules::parse("a", &case).unwrap_err();
            assert!(
                matches!(&err, FilterError::MalformedRules { provider, .. } if provider == "a"),
                "unexpected result for {}",
                case
            );
        }
    }

    #[test]
    fn test_worked_example() {
        let registry = registry(
            "a:\n  url: http://a\n  processes:\n    - p1:\n        - exclude: false\n    - p2:\n        - exclude: true\nb:\n  url: http://b\n  processes:\n    - q1:\n",
        );

        let mut raw = RawCatalogs::new();
        raw.record("a", Ok(catalog(&["p1", "p2", "p3"])));
        raw.record(
            "b",
            Err(FetchError::Status {
                status: 500,
                reason: "Internal Server Error".to_string(),
            }),
        );

        let list = build_process_list(&registry, raw);

        assert_eq!(list.ids(), vec!["a:p1"]);
    }

    #[test]
    fn test_registry_order_then_provider_order() {
        let registry = registry(
            "z:\n  url: http://z\n  processes:\n    - b:\n    - a:\na:\n  url: http://a\n  processes:\n    - y:\n    - x:\n",
        );

        let mut raw = RawCatalogs::new();
        raw.record("a", Ok(catalog(&["x", "y"])));
        raw.record("z", Ok(catalog(&["b", "a"])));

        let list = build_process_list(&registry, raw);

        assert_eq!(list.ids(), vec!["z:b", "z:a", "a:x", "a:y"]);
    }

    #[test]
    fn test_missing_catalog_contributes_nothing() {
        let registry = registry("a:\n  url: http://a\n  processes:\n    - p1:\n");

        let list = build_process_list(&registry, RawCatalogs::new());

        assert!(list.is_empty());
    }

    #[test]
    fn test_unknown_raw_provider_ignored() {
        let registry = registry("a:\n  url: http://a\n  processes:\n    - p1:\n");
        let mut raw = RawCatalogs::new();
        raw.record("ghost", Ok(catalog(&["p1"])));

        let list = build_process_list(&registry, raw);

        assert!(list.is_empty());
    }

    #[test]
    fn test_malformed_provider_isolated() {
        let registry = registry(
            "bad:\n  url: http://bad\n  processes: oops\ngood:\n  url: http://good\n  processes:\n    - p1:\n",
        );

        let mut raw = RawCatalogs::new();
        raw.record("bad", Ok(catalog(&["p1"])));
        raw.record("good", Ok(catalog(&["p1"])));

        let list = build_process_list(&registry, raw);

        assert_eq!(list.ids(), vec!["good:p1"]);
    }

    #[test]
    fn test_malformed_provider_logs_one_error() {
        let registry = registry(
            "bad:\n  url: http://bad\n  processes: oops\ngood:\n  url: http://good\n  processes:\n    - p1:\n",
        );

        let mut raw = RawCatalogs::new();
        raw.record("bad", Ok(catalog(&["p1", "p2"])));
        raw.record("good", Ok(catalog(&["p1"])));

        let logs = CapturedLogs::default();
        let list = tracing::subscriber::with_default(logs.subscriber(), || {
            build_process_list(&registry, raw)
        });

        assert_eq!(list.ids(), vec!["good:p1"]);
        let errors = logs.lines_containing("ERROR");
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("configuration of provider bad"));
    }

    #[test]
    fn test_malformed_rules_with_empty_catalog_is_ok() {
        let registry = registry("bad:\n  url: http://bad\n  processes: oops\n");
        let provider = registry.get("bad").unwrap();

        assert!(filter_provider("bad", provider, Vec::new()).unwrap().is_empty());
    }

    #[test]
    fn test_unconfigured_dropped_regardless_of_fields() {
        let registry = registry("a:\n  url: http://a\n  processes:\n    - p1:\n");
        let mut descriptor = ProcessDescriptor::new("p2");
        descriptor.extra.insert("title".to_string(), json!("p1"));
        descriptor.extra.insert("exclude".to_string(), json!(false));

        let mut raw = RawCatalogs::new();
        raw.record("a", Ok(vec![descriptor]));

        assert!(build_process_list(&registry, raw).is_empty());
    }

    #[test]
    fn test_rename_round_trips_and_keeps_fields() {
        let registry = registry("geo:\n  url: http://geo\n  processes:\n    - 'ns:buffer':\n");
        let mut descriptor = ProcessDescriptor::new("ns:buffer");
        descriptor.extra.insert("title".to_string(), json!("Buffer"));
        descriptor.extra.insert("version".to_string(), json!("2.0"));

        let mut raw = RawCatalogs::new();
        raw.record("geo", Ok(vec![descriptor]));

        let list = build_process_list(&registry, raw);
        let process = &list.processes[0];

        assert_eq!(process.id, "geo:ns:buffer");
        assert_eq!(process.id.strip_prefix("geo:"), Some("ns:buffer"));
        let keys: Vec<&str> = process.extra.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["title", "version"]);
    }
}
