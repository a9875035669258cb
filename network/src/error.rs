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

use std::fmt;

/// Errors detected while constructing a network.
///
/// Every variant is fatal to construction: builders fail fast and never
/// hand back a partially wired network.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Error {
    /// A configuration key is missing, unparseable, or fails validation.
    /// Carries the key and a description of the offending value.
    BadConfig(String, String),
    /// A declared coordinate or index lies outside its dimension extent.
    OutOfRange(String, String),
    /// A post-wiring invariant does not hold. Indicates a builder bug,
    /// not a user error.
    InternalAssertion(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::BadConfig(key, what) => {
                write!(f, "ERROR: bad configuration value for '{}': {}", key, what)
            }
            Self::OutOfRange(key, what) => {
                write!(f, "ERROR: '{}' out of range: {}", key, what)
            }
            Self::InternalAssertion(what) => {
                write!(f, "ERROR: internal assertion failed: {}", what)
            }
        }
    }
}

impl std::error::Error for Error {}
