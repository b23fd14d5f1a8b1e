use serde::Deserialize;
use serde_json::{Map, Value as Json};
use thiserror::Error;

use crate::modules::punches::core::punch_event::NewPunch;
use crate::modules::punches::core::punch_type::PunchType;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("employee id must not be empty")]
    EmptyEmployeeId,

    #[error("unknown punch type: {0:?}")]
    UnknownPunchType(String),

    #[error("punch context must be a JSON object")]
    ContextNotObject,
}

/// Raw punch request as handed over by the UI layer.
#[derive(Debug, Clone, Deserialize)]
pub struct PunchIntent {
    pub employee_id: String,
    #[serde(rename = "type")]
    pub punch_type: String,
    #[serde(default)]
    pub context: Option<Json>,
}

impl PunchIntent {
    pub fn new(
        employee_id: impl Into<String>,
        punch_type: impl Into<String>,
        context: Option<Json>,
    ) -> Self {
        Self {
            employee_id: employee_id.into(),
            punch_type: punch_type.into(),
            context,
        }
    }

    /// Checks the intent and stamps it with the business time of the action.
    pub fn validate(self, timestamp: i64) -> Result<NewPunch, ValidationError> {
        let employee_id = self.employee_id.trim();
        if employee_id.is_empty() {
            return Err(ValidationError::EmptyEmployeeId);
        }
        let punch_type: PunchType = self.punch_type.parse()?;
        let context = match self.context {
            None | Some(Json::Null) => Json::Object(Map::new()),
            Some(Json::Object(map)) => Json::Object(map),
            Some(_) => return Err(ValidationError::ContextNotObject),
        };
        Ok(NewPunch {
            employee_id: employee_id.to_string(),
            punch_type,
            timestamp,
            context,
        })
    }
}
