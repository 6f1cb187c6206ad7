// src/types/outreach.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Channel an outreach message is written for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    #[default]
    Linkedin,
    Email,
    General,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::Linkedin => "linkedin",
            MessageType::Email => "email",
            MessageType::General => "general",
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "linkedin" => Ok(MessageType::Linkedin),
            "email" => Ok(MessageType::Email),
            "general" => Ok(MessageType::General),
            other => anyhow::bail!("Unknown message type: {}", other),
        }
    }
}

/// A generated message to the employer behind a scanned posting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutreachMessage {
    pub id: i64,
    pub scan_id: i64,
    pub message: String,
    pub message_type: MessageType,
    /// Estimated provider cost of generating this message, in USD.
    pub ai_cost: f64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewOutreach {
    pub scan_id: i64,
    pub message: String,
    pub message_type: MessageType,
    pub ai_cost: f64,
}

impl NewOutreach {
    pub fn into_message(self, id: i64, created_at: DateTime<Utc>) -> OutreachMessage {
        OutreachMessage {
            id,
            scan_id: self.scan_id,
            message: self.message,
            message_type: self.message_type,
            ai_cost: self.ai_cost,
            created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_type_defaults_to_linkedin() {
        assert_eq!(MessageType::default(), MessageType::Linkedin);
        assert_eq!("email".parse::<MessageType>().unwrap(), MessageType::Email);
        assert!("fax".parse::<MessageType>().is_err());

        let json = serde_json::to_string(&MessageType::General).unwrap();
        assert_eq!(json, "\"general\"");
    }
}
