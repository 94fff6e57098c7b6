/// Wiring wire-format resolver
///
/// Converts persisted adapter bindings into the engine's wiring wire format
/// and back. Persisted filter values are raw strings; on the way out each one
/// is optimistically parsed as JSON, and a value that does not parse is kept
/// verbatim as a string. The reverse direction stringifies non-string values
/// again, so filters round-trip.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::catalog::types::{InputWiring, OutputWiring, Wiring};
use crate::error::{FlowError, Result};

/// Wiring block of the engine request and of async channel messages.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WireWiring {
    #[serde(default)]
    pub input_wirings: Vec<WireInputWiring>,
    #[serde(default)]
    pub output_wirings: Vec<WireOutputWiring>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireInputWiring {
    pub workflow_input_name: String,
    pub adapter_id: String,
    pub source_id: String,
    #[serde(default)]
    pub filters: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireOutputWiring {
    pub workflow_output_name: String,
    pub adapter_id: String,
    pub sink_id: String,
}

/// Resolve a persisted wiring into the engine wire format.
///
/// Filter parsing never fails: raw string is always a valid fallback.
pub fn to_wire_format(wiring: &Wiring) -> WireWiring {
    let input_wirings = wiring
        .input_wirings
        .iter()
        .map(|input| WireInputWiring {
            workflow_input_name: input.workflow_input_name.clone(),
            adapter_id: input.adapter_id.clone(),
            source_id: input.source_id.clone(),
            filters: input
                .filters
                .iter()
                .map(|(key, value)| (key.clone(), parse_filter_value(value)))
                .collect(),
        })
        .collect();

    let output_wirings = wiring
        .output_wirings
        .iter()
        .map(|output| WireOutputWiring {
            workflow_output_name: output.workflow_output_name.clone(),
            adapter_id: output.adapter_id.clone(),
            sink_id: output.sink_id.clone(),
        })
        .collect();

    WireWiring {
        input_wirings,
        output_wirings,
    }
}

fn parse_filter_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

/// Rebuild a persisted wiring from an inbound wire-format wiring (async
/// channel messages carry wirings in wire format). Entries get fresh ids.
pub fn from_wire_format(wire: &WireWiring, name: &str) -> Result<Wiring> {
    let input_wirings = wire
        .input_wirings
        .iter()
        .map(|input| {
            let mut filters = BTreeMap::new();
            for (key, value) in &input.filters {
                filters.insert(key.clone(), stringify_filter_value(key, value)?);
            }
            Ok(InputWiring {
                id: Uuid::new_v4(),
                workflow_input_name: input.workflow_input_name.clone(),
                adapter_id: input.adapter_id.clone(),
                source_id: input.source_id.clone(),
                filters,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let output_wirings = wire
        .output_wirings
        .iter()
        .map(|output| OutputWiring {
            id: Uuid::new_v4(),
            workflow_output_name: output.workflow_output_name.clone(),
            adapter_id: output.adapter_id.clone(),
            sink_id: output.sink_id.clone(),
        })
        .collect();

    Ok(Wiring {
        id: Uuid::new_v4(),
        name: name.to_string(),
        input_wirings,
        output_wirings,
    })
}

fn stringify_filter_value(key: &str, value: &Value) -> Result<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        other => serde_json::to_string(other)
            .map_err(|e| FlowError::WiringFilter(format!("filter '{}' cannot be stored: {}", key, e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wiring_with_filters(filters: BTreeMap<String, String>) -> Wiring {
        Wiring {
            id: Uuid::new_v4(),
            name: "nightly".to_string(),
            input_wirings: vec![InputWiring {
                id: Uuid::new_v4(),
                workflow_input_name: "series_in".to_string(),
                adapter_id: "demo-adapter".to_string(),
                source_id: "plant1.temperature".to_string(),
                filters,
            }],
            output_wirings: vec![OutputWiring {
                id: Uuid::new_v4(),
                workflow_output_name: "scores".to_string(),
                adapter_id: "demo-adapter".to_string(),
                sink_id: "plant1.anomaly_score".to_string(),
            }],
        }
    }

    #[test]
    fn numeric_filter_values_become_json_numbers() {
        let mut filters = BTreeMap::new();
        filters.insert("limit".to_string(), "42".to_string());
        let wire = to_wire_format(&wiring_with_filters(filters));

        assert_eq!(wire.input_wirings[0].filters["limit"], Value::from(42));
    }

    #[test]
    fn unparseable_filter_values_stay_raw_strings() {
        let mut filters = BTreeMap::new();
        filters.insert("note".to_string(), "not json".to_string());
        let wire = to_wire_format(&wiring_with_filters(filters));

        assert_eq!(
            wire.input_wirings[0].filters["note"],
            Value::String("not json".to_string())
        );
    }

    #[test]
    fn filters_round_trip_through_the_wire_format() {
        let mut filters = BTreeMap::new();
        filters.insert("limit".to_string(), "42".to_string());
        filters.insert("note".to_string(), "not json".to_string());
        filters.insert("range".to_string(), "{\"from\":0,\"to\":10}".to_string());

        let wiring = wiring_with_filters(filters.clone());
        let wire = to_wire_format(&wiring);
        let back = from_wire_format(&wire, &wiring.name).unwrap();

        assert_eq!(back.input_wirings[0].filters["limit"], "42");
        assert_eq!(back.input_wirings[0].filters["note"], "not json");
        // structured values re-stringify to equivalent JSON
        let range: Value = serde_json::from_str(&back.input_wirings[0].filters["range"]).unwrap();
        assert_eq!(range, serde_json::json!({"from": 0, "to": 10}));
    }

    #[test]
    fn output_wirings_map_one_to_one() {
        let wire = to_wire_format(&wiring_with_filters(BTreeMap::new()));
        assert_eq!(wire.output_wirings.len(), 1);
        assert_eq!(wire.output_wirings[0].workflow_output_name, "scores");
        assert_eq!(wire.output_wirings[0].sink_id, "plant1.anomaly_score");
    }
}
