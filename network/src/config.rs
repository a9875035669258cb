// Copyright 2023 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Configuration ingest.
//!
//! The file parser lives outside this crate; topology builders consume an
//! already-parsed key → string map. This module wraps that map and turns
//! the raw strings into typed values: scalar integers, integer lists, and
//! nested coordinate-pair lists.
//!
//! The list grammar is permissive. Any of `{`, `}`, `[`, `]` and
//! whitespace act as separators; commas separate scalar fields inside a
//! token; trailing commas are tolerated. Extraction yields a flat integer
//! stream that the builders regroup per schema, e.g.
//!
//! ```text
//! dim_sizes = {4,6,8}
//! elevator_coords = {{0,1},{2,2}}
//! elevator_mapping_coords = {{{0,1},{0,1}},{{2,2},{2,2}}}
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::Error;

/// An already-parsed key → value map, as handed over by the simulator's
/// configuration front end.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(transparent)]
pub struct Configuration {
    values: HashMap<String, String>,
}

impl Configuration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a flat YAML mapping of scalars, e.g.
    ///
    /// ```yaml
    /// topology: cake
    /// dim_sizes: "{3,3,2}"
    /// elevator_coords: "{{1,1}}"
    /// unitorus_debug: 1
    /// ```
    pub fn from_yaml_str(text: &str) -> Result<Self, Error> {
        let raw: HashMap<String, serde_yaml::Value> = serde_yaml::from_str(text)
            .map_err(|e| Error::BadConfig("<yaml>".to_string(), e.to_string()))?;
        let mut config = Self::new();
        for (key, value) in raw {
            let rendered = match value {
                serde_yaml::Value::String(s) => s,
                serde_yaml::Value::Number(n) => n.to_string(),
                serde_yaml::Value::Bool(b) => (b as i64).to_string(),
                other => {
                    return Err(Error::BadConfig(
                        key,
                        format!("expected a scalar, got {:?}", other),
                    ))
                }
            };
            config.set(key, rendered);
        }
        Ok(config)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Scalar integer under `key`; `None` when the key is absent.
    pub fn get_int(&self, key: &str) -> Result<Option<i64>, Error> {
        match self.get_str(key) {
            None => Ok(None),
            Some(raw) => raw.trim().parse::<i64>().map(Some).map_err(|_| {
                Error::BadConfig(key.to_string(), format!("'{}' is not an integer", raw))
            }),
        }
    }

    /// Integer list under `key`.
    ///
    /// `None` when the key is missing, the list is empty, or the value is
    /// the literal string `"0"` (the legacy convention for "unset").
    pub fn int_list(&self, key: &str) -> Result<Option<Vec<i64>>, Error> {
        let raw = match self.get_str(key) {
            Some(raw) if !raw.is_empty() && raw != "0" => raw,
            _ => return Ok(None),
        };
        let values = int_stream(key, raw)?;
        if values.is_empty() {
            Ok(None)
        } else {
            Ok(Some(values))
        }
    }

    /// Coordinate-pair list under `key`: the flat integer stream regrouped
    /// two at a time. `None` when the key is missing or empty.
    pub fn pair_list(&self, key: &str) -> Result<Option<Vec<(i64, i64)>>, Error> {
        let stream = match self.int_list(key)? {
            Some(stream) => stream,
            None => return Ok(None),
        };
        if stream.len() % 2 != 0 {
            return Err(Error::BadConfig(
                key.to_string(),
                format!("expected (x,y) pairs, got {} integers", stream.len()),
            ));
        }
        Ok(Some(stream.chunks(2).map(|c| (c[0], c[1])).collect()))
    }
}

/// Extract the flat integer stream from a brace/comma-delimited list.
fn int_stream(key: &str, raw: &str) -> Result<Vec<i64>, Error> {
    let cleaned: String = raw
        .chars()
        .map(|c| if matches!(c, '{' | '}' | '[' | ']') { ' ' } else { c })
        .collect();
    let mut values = Vec::new();
    for token in cleaned.split_whitespace() {
        for field in token.split(',') {
            // empty fields come from trailing or doubled commas
            if field.is_empty() {
                continue;
            }
            let value = field.parse::<i64>().map_err(|_| {
                Error::BadConfig(key.to_string(), format!("'{}' is not an integer", field))
            })?;
            values.push(value);
        }
    }
    Ok(values)
}
