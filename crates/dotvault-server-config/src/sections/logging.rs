// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Logging configuration section.

use std::str::FromStr;

use serde::Deserialize;

fn default_level() -> String {
	"info,tower_http::trace=debug,sqlx=warn".to_string()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
	#[default]
	Pretty,
	Json,
}

impl FromStr for LogFormat {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_ascii_lowercase().as_str() {
			"json" => Ok(LogFormat::Json),
			"pretty" | "text" => Ok(LogFormat::Pretty),
			_ => Err(format!("expected 'json' or 'pretty', got '{s}'")),
		}
	}
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct LoggingConfigLayer {
	pub level: Option<String>,
	pub format: Option<LogFormat>,
}

impl LoggingConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.level.is_some() {
			self.level = other.level;
		}
		if other.format.is_some() {
			self.format = other.format;
		}
	}

	pub fn finalize(self) -> LoggingConfig {
		LoggingConfig {
			level: self.level.unwrap_or_else(default_level),
			format: self.format.unwrap_or_default(),
		}
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoggingConfig {
	pub level: String,
	pub format: LogFormat,
}

impl Default for LoggingConfig {
	fn default() -> Self {
		Self {
			level: default_level(),
			format: LogFormat::Pretty,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_layer_finalize_defaults() {
		let config = LoggingConfigLayer::default().finalize();
		assert_eq!(config, LoggingConfig::default());
	}

	#[test]
	fn test_format_from_env_string() {
		assert_eq!("JSON".parse::<LogFormat>(), Ok(LogFormat::Json));
		assert_eq!("text".parse::<LogFormat>(), Ok(LogFormat::Pretty));
		assert!("logfmt".parse::<LogFormat>().is_err());
	}

	#[test]
	fn test_deserialize_json_format() {
		let layer: LoggingConfigLayer = toml::from_str(
			r#"
			level = "debug"
			format = "json"
			"#,
		)
		.unwrap();
		let config = layer.finalize();
		assert_eq!(config.level, "debug");
		assert_eq!(config.format, LogFormat::Json);
	}
}
