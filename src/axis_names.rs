/// Centralized axis naming utilities
///
/// The resonance test excites one horizontal axis at a time; the capture file
/// still carries all three accelerometer channels.
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Names of the accelerometer channels in capture order.
pub const AXIS_NAMES: [&str; 3] = ["X", "Y", "Z"];

/// Axis excited by a resonance sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TestAxis {
    X,
    Y,
}

impl TestAxis {
    pub const ALL: [TestAxis; 2] = [TestAxis::X, TestAxis::Y];

    /// Index of this axis' channel in [`AXIS_NAMES`].
    pub fn channel_index(self) -> usize {
        match self {
            TestAxis::X => 0,
            TestAxis::Y => 1,
        }
    }

    pub fn name(self) -> &'static str {
        AXIS_NAMES[self.channel_index()]
    }
}

impl fmt::Display for TestAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TestAxis {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "X" => Ok(TestAxis::X),
            "Y" => Ok(TestAxis::Y),
            other => Err(format!("Invalid test axis '{other}'. Expected X or Y")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_axis_name() {
        assert_eq!(TestAxis::X.name(), "X");
        assert_eq!(TestAxis::Y.name(), "Y");
        assert_eq!(TestAxis::Y.to_string(), "Y");
    }

    #[test]
    fn test_axis_parse() {
        assert_eq!("x".parse::<TestAxis>(), Ok(TestAxis::X));
        assert_eq!(" Y ".parse::<TestAxis>(), Ok(TestAxis::Y));
        assert!("z".parse::<TestAxis>().is_err());
    }

    #[test]
    fn test_axis_names_constant() {
        assert_eq!(AXIS_NAMES[TestAxis::X.channel_index()], "X");
        assert_eq!(AXIS_NAMES[TestAxis::Y.channel_index()], "Y");
        assert_eq!(AXIS_NAMES[2], "Z");
    }
}
