// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 itsakeyfut
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Error types for the front-end core
//!
//! Almost every failure in the screen pipeline is handled locally: stray pixel
//! coordinates are dropped and lapping between the emulation and render threads
//! is resolved by the frame scheduler. The errors here are the ones that must be
//! visible to a caller, chiefly a resize that could not be applied.

use std::path::PathBuf;
use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, GuiError>;

/// Front-end error
#[derive(Debug, Error)]
pub enum GuiError {
    /// Requested visible window does not fit the television specification
    #[error("invalid screen geometry: top {top}, bottom {bottom} for {scanlines} scanlines")]
    InvalidGeometry {
        top: usize,
        bottom: usize,
        scanlines: usize,
    },

    /// The render thread is gone and can no longer service requests
    #[error("render thread service channel disconnected")]
    ServiceDisconnected,

    /// The render thread did not answer a marshalled request in time
    #[error("render thread did not respond in time for {op}")]
    ServiceTimeout { op: &'static str },

    /// The core was shut down while the request was in flight
    #[error("gui core has shut down")]
    ShutDown,

    /// Only one emulation thread may write into the screen
    #[error("screen sink has already been handed out")]
    SinkTaken,

    /// A configuration value is out of range
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Reading or writing a configuration file failed
    #[error("config file {path}: {source}")]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration file is not valid TOML for [`GuiConfig`](crate::frontend::GuiConfig)
    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Configuration could not be serialized
    #[error("failed to serialize config: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    /// The emulation thread could not be started
    #[error("failed to spawn emulation thread: {0}")]
    Spawn(#[source] std::io::Error),

    /// GPU context or surface failure
    #[error("render error: {0}")]
    Render(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_geometry_message() {
        let err = GuiError::InvalidGeometry {
            top: 250,
            bottom: 240,
            scanlines: 262,
        };
        assert_eq!(
            err.to_string(),
            "invalid screen geometry: top 250, bottom 240 for 262 scanlines"
        );
    }

    #[test]
    fn test_timeout_message_names_operation() {
        let err = GuiError::ServiceTimeout { op: "resize" };
        assert!(err.to_string().contains("resize"));
    }

    #[test]
    fn test_errors_cross_threads() {
        fn assert_send<T: Send + 'static>() {}
        assert_send::<GuiError>();
    }
}
