use std::{fmt::Display, ops::Deref, path::PathBuf};

/// A configuration value that remembers where it came from
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum ParsedProperty<T> {
    /// Value from command line arguments (parsed_value, original_string)
    Cli(T, String),
    /// Value from an environment variable (parsed_value, env_var_value)
    Env(T, String),
    /// Value from the configuration file (parsed_value, file_path, toml_value_string)
    File(T, PathBuf, String),
    /// Built-in default
    Default(T),
}

impl<T> ParsedProperty<T> {
    pub fn value(&self) -> &T {
        match self {
            ParsedProperty::Cli(value, _)
            | ParsedProperty::Env(value, _)
            | ParsedProperty::File(value, _, _)
            | ParsedProperty::Default(value) => value,
        }
    }

    pub fn into_value(self) -> T {
        match self {
            ParsedProperty::Cli(value, _)
            | ParsedProperty::Env(value, _)
            | ParsedProperty::File(value, _, _)
            | ParsedProperty::Default(value) => value,
        }
    }

    /// Source name as shown in diagnostics
    pub fn source_name(&self) -> &'static str {
        match self {
            ParsedProperty::Cli(_, _) => "cli",
            ParsedProperty::Env(_, _) => "env",
            ParsedProperty::File(_, _, _) => "file",
            ParsedProperty::Default(_) => "default",
        }
    }

    /// The raw text the value was parsed from, if any
    pub fn original(&self) -> Option<&str> {
        match self {
            ParsedProperty::Cli(_, original)
            | ParsedProperty::Env(_, original)
            | ParsedProperty::File(_, _, original) => Some(original),
            ParsedProperty::Default(_) => None,
        }
    }

    pub fn is_default(&self) -> bool {
        matches!(self, ParsedProperty::Default(_))
    }
}

impl<T> Deref for ParsedProperty<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        self.value()
    }
}

impl<T: Display> Display for ParsedProperty<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.value().fmt(f)
    }
}

impl<T> From<T> for ParsedProperty<T> {
    fn from(value: T) -> Self {
        ParsedProperty::Default(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// # ParsedProperty Value Access
    ///
    /// Tests accessing the parsed value from every source variant.
    ///
    /// ## Test Scenario
    /// - Creates ParsedProperty instances from each source
    /// - Reads the value through value(), Deref and into_value()
    ///
    /// ## Expected Outcome
    /// - All accessors return the same parsed value
    #[test]
    fn test_parsed_property_value_access() {
        let props = vec![
            ParsedProperty::Cli("main".to_string(), "--target-branch main".to_string()),
            ParsedProperty::Env("main".to_string(), "main".to_string()),
            ParsedProperty::File(
                "main".to_string(),
                PathBuf::from("/home/u/.config/ttb-merge/config.toml"),
                "target_branch = \"main\"".to_string(),
            ),
            ParsedProperty::Default("main".to_string()),
        ];

        for prop in props {
            assert_eq!(prop.value(), "main");
            assert_eq!(prop.len(), 4);
            assert_eq!(prop.into_value(), "main");
        }
    }

    /// # ParsedProperty Source Tracking
    ///
    /// Tests source names and original text for each variant.
    ///
    /// ## Test Scenario
    /// - Builds one property per source
    ///
    /// ## Expected Outcome
    /// - source_name matches the variant
    /// - Only Default has no original text
    #[test]
    fn test_parsed_property_source_tracking() {
        let cli = ParsedProperty::Cli(true, "--soft".to_string());
        let env = ParsedProperty::Env(false, "false".to_string());
        let file = ParsedProperty::File(true, PathBuf::from("c.toml"), "soft = true".to_string());
        let default: ParsedProperty<bool> = false.into();

        assert_eq!(cli.source_name(), "cli");
        assert_eq!(env.source_name(), "env");
        assert_eq!(file.source_name(), "file");
        assert_eq!(default.source_name(), "default");

        assert_eq!(cli.original(), Some("--soft"));
        assert_eq!(file.original(), Some("soft = true"));
        assert_eq!(default.original(), None);
        assert!(default.is_default());
        assert!(!env.is_default());
    }

    /// # ParsedProperty Display
    ///
    /// Tests that Display forwards to the inner value.
    ///
    /// ## Test Scenario
    /// - Formats a string property
    ///
    /// ## Expected Outcome
    /// - Output is the bare value
    #[test]
    fn test_parsed_property_display() {
        let prop = ParsedProperty::Env("origin".to_string(), "origin".to_string());
        assert_eq!(format!("{}", prop), "origin");
    }
}
