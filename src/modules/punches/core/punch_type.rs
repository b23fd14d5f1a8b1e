use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::modules::punches::core::punch_intent::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PunchType {
    #[serde(alias = "in")]
    ClockIn,
    #[serde(alias = "out")]
    ClockOut,
    LunchStart,
    LunchEnd,
}

impl PunchType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PunchType::ClockIn => "clock_in",
            PunchType::ClockOut => "clock_out",
            PunchType::LunchStart => "lunch_start",
            PunchType::LunchEnd => "lunch_end",
        }
    }
}

impl fmt::Display for PunchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PunchType {
    type Err = ValidationError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim() {
            "clock_in" | "in" => Ok(PunchType::ClockIn),
            "clock_out" | "out" => Ok(PunchType::ClockOut),
            "lunch_start" => Ok(PunchType::LunchStart),
            "lunch_end" => Ok(PunchType::LunchEnd),
            other => Err(ValidationError::UnknownPunchType(other.to_string())),
        }
    }
}

#[cfg(test)]
mod punch_type_tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("clock_in", PunchType::ClockIn)]
    #[case("clock_out", PunchType::ClockOut)]
    #[case("lunch_start", PunchType::LunchStart)]
    #[case("lunch_end", PunchType::LunchEnd)]
    #[case("in", PunchType::ClockIn)]
    #[case("out", PunchType::ClockOut)]
    fn it_should_parse_known_punch_types(#[case] raw: &str, #[case] expected: PunchType) {
        assert_eq!(raw.parse::<PunchType>().unwrap(), expected);
    }

    #[rstest]
    fn it_should_reject_an_unknown_punch_type() {
        let result = "coffee_break".parse::<PunchType>();
        assert_eq!(
            result,
            Err(ValidationError::UnknownPunchType("coffee_break".into()))
        );
    }

    #[rstest]
    fn it_should_serialize_as_snake_case() {
        let json = serde_json::to_string(&PunchType::LunchStart).unwrap();
        assert_eq!(json, "\"lunch_start\"");
        let parsed: PunchType = serde_json::from_str("\"out\"").unwrap();
        assert_eq!(parsed, PunchType::ClockOut);
    }
}
