//! Field-by-field merging of configuration tiers.
//!
//! Objects merge recursively; every other value (including queue lists) is
//! replaced wholesale by the higher tier.

use serde_json::Value;

/// Merge `overlay` onto `base`, with `overlay` winning.
///
/// A `null` in the overlay means "not specified" and keeps the base value.
///
/// # Example
/// ```
/// use serde_json::json;
/// use workforce_tracker::config::deep_merge;
///
/// let base = json!({ "server": { "port": 5000, "host": "127.0.0.1" } });
/// let overlay = json!({ "server": { "port": 8080 } });
/// let merged = deep_merge(base, overlay);
/// assert_eq!(merged, json!({ "server": { "port": 8080, "host": "127.0.0.1" } }));
/// ```
pub fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut merged), Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                let next = match merged.remove(&key) {
                    Some(existing) => deep_merge(existing, value),
                    None => value,
                };
                merged.insert(key, next);
            }
            Value::Object(merged)
        }
        (base, Value::Null) => base,
        (_, overlay) => overlay,
    }
}

/// Fold a sequence of tiers, lowest priority first.
pub fn deep_merge_all(tiers: impl IntoIterator<Item = Value>) -> Value {
    tiers.into_iter().fold(Value::Null, deep_merge)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn nested_sections_merge_per_field() {
        let defaults = json!({
            "workday": { "end_of_day_hour": 17, "sweep_hour": 0 },
            "clock": { "time_zone": "America/New_York" }
        });
        let project = json!({ "workday": { "sweep_hour": 1 } });

        let merged = deep_merge(defaults, project);
        assert_eq!(
            merged,
            json!({
                "workday": { "end_of_day_hour": 17, "sweep_hour": 1 },
                "clock": { "time_zone": "America/New_York" }
            })
        );
    }

    #[test]
    fn queue_lists_are_replaced_not_concatenated() {
        let defaults = json!({ "queues": { "default": ["Break", "Lunch", "Meeting"] } });
        let project = json!({ "queues": { "default": ["Training"] } });

        let merged = deep_merge(defaults, project);
        assert_eq!(merged, json!({ "queues": { "default": ["Training"] } }));
    }

    #[test]
    fn team_maps_merge_by_key() {
        let project = json!({ "queues": { "teams": { "claims": ["Break"] } } });
        let user = json!({ "queues": { "teams": { "billing": ["Lunch"] } } });

        let merged = deep_merge(project, user);
        assert_eq!(
            merged,
            json!({ "queues": { "teams": { "claims": ["Break"], "billing": ["Lunch"] } } })
        );
    }

    #[test]
    fn null_overlay_keeps_base() {
        let base = json!({ "server": { "port": 5000 } });
        let overlay = json!({ "server": { "port": null } });
        assert_eq!(deep_merge(base, overlay), json!({ "server": { "port": 5000 } }));
    }

    #[test]
    fn policy_override_keeps_other_workday_defaults() {
        use crate::config::{Config, SweepPolicy};

        let defaults = serde_json::to_value(Config::default()).unwrap();
        let project = json!({
            "workday": { "sweep_policy": "close_at_sweep_time" },
            "queues": { "teams": { "claims": ["Claims Review"] } }
        });

        let merged: Config = serde_json::from_value(deep_merge(defaults, project)).unwrap();
        assert_eq!(merged.workday.sweep_policy, SweepPolicy::CloseAtSweepTime);
        assert_eq!(merged.workday.end_of_day_hour, 17);
        assert_eq!(merged.queues.default, Config::default().queues.default);
        assert_eq!(merged.queues.teams["claims"], vec!["Claims Review".to_string()]);
    }

    #[test]
    fn later_tiers_win() {
        let tiers = vec![
            json!({ "server": { "port": 5000 } }),
            json!({ "server": { "port": 6000, "host": "0.0.0.0" } }),
            json!({ "server": { "port": 7000 } }),
        ];
        assert_eq!(
            deep_merge_all(tiers),
            json!({ "server": { "port": 7000, "host": "0.0.0.0" } })
        );
    }
}
