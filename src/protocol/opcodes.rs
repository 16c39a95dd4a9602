use std::{fmt, str::FromStr};

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::common::types::GuildId;

/// Closed set of inbound ops. Every op is guild-scoped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    VoiceUpdate,
    Destroy,
    Play,
    Stop,
    SetPauseState,
    SetPosition,
    SetFilter,
    Debug,
}

impl Op {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::VoiceUpdate => "voice_update",
            Self::Destroy => "destroy",
            Self::Play => "play",
            Self::Stop => "stop",
            Self::SetPauseState => "set_pause_state",
            Self::SetPosition => "set_position",
            Self::SetFilter => "set_filter",
            Self::Debug => "debug",
        }
    }
}

impl FromStr for Op {
    type Err = FrameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "voice_update" => Ok(Self::VoiceUpdate),
            "destroy" => Ok(Self::Destroy),
            "play" => Ok(Self::Play),
            "stop" => Ok(Self::Stop),
            "set_pause_state" => Ok(Self::SetPauseState),
            "set_position" => Ok(Self::SetPosition),
            "set_filter" => Ok(Self::SetFilter),
            "debug" => Ok(Self::Debug),
            other => Err(FrameError::UnknownOp(other.to_string())),
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reasons an inbound frame is discarded before reaching a player.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("payload is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("payload is not a JSON object")]
    NotAnObject,
    #[error("payload is missing the \"op\" key")]
    MissingOp,
    #[error("payload is missing the \"d\" key")]
    MissingData,
    #[error("payload has unknown \"op\" '{0}'")]
    UnknownOp(String),
    #[error("payload is missing the \"guild_id\" data key")]
    MissingGuildId,
}

/// A validated inbound frame addressed to one guild's player.
#[derive(Debug, Clone)]
pub struct Frame {
    pub op: Op,
    pub guild_id: GuildId,
    pub d: Map<String, Value>,
}

impl Frame {
    pub fn parse(text: &str) -> Result<Self, FrameError> {
        let value: Value = serde_json::from_str(text)?;
        let Value::Object(mut payload) = value else {
            return Err(FrameError::NotAnObject);
        };

        let op = match payload.get("op") {
            Some(Value::String(op)) => op.clone(),
            _ => return Err(FrameError::MissingOp),
        };
        let d = match payload.remove("d") {
            Some(Value::Object(d)) => d,
            _ => return Err(FrameError::MissingData),
        };

        let op = op.parse::<Op>()?;

        let guild_id = match d.get("guild_id") {
            Some(Value::String(id)) if !id.is_empty() => GuildId(id.clone()),
            Some(Value::Number(id)) => GuildId(id.to_string()),
            _ => return Err(FrameError::MissingGuildId),
        };

        Ok(Self { op, guild_id, d })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VoiceUpdateData {
    pub session_id: Option<String>,
    pub token: Option<String>,
    pub endpoint: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlayData {
    pub track_id: Option<String>,
    /// Position in milliseconds to start from.
    pub start_time: Option<u64>,
    /// Whether to replace a track that is already playing. Defaults to true.
    pub replace: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SetPauseStateData {
    pub state: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SetPositionData {
    /// Position in milliseconds.
    pub position: Option<u64>,
}

/// Typed command routed to a player.
#[derive(Debug, Clone)]
pub enum PlayerCommand {
    VoiceUpdate(VoiceUpdateData),
    Destroy,
    Play(PlayData),
    Stop,
    SetPauseState(SetPauseStateData),
    SetPosition(SetPositionData),
    SetFilter(Map<String, Value>),
    Debug,
}

impl PlayerCommand {
    /// Decodes the op-specific data. Absent optional keys are fine; keys of
    /// the wrong type are an error.
    pub fn from_frame(frame: Frame) -> Result<Self, serde_json::Error> {
        let d = Value::Object(frame.d);
        Ok(match frame.op {
            Op::VoiceUpdate => Self::VoiceUpdate(serde_json::from_value(d)?),
            Op::Destroy => Self::Destroy,
            Op::Play => Self::Play(serde_json::from_value(d)?),
            Op::Stop => Self::Stop,
            Op::SetPauseState => Self::SetPauseState(serde_json::from_value(d)?),
            Op::SetPosition => Self::SetPosition(serde_json::from_value(d)?),
            Op::SetFilter => match d {
                Value::Object(map) => Self::SetFilter(map),
                _ => Self::SetFilter(Map::new()),
            },
            Op::Debug => Self::Debug,
        })
    }

    pub fn op(&self) -> Op {
        match self {
            Self::VoiceUpdate(_) => Op::VoiceUpdate,
            Self::Destroy => Op::Destroy,
            Self::Play(_) => Op::Play,
            Self::Stop => Op::Stop,
            Self::SetPauseState(_) => Op::SetPauseState,
            Self::SetPosition(_) => Op::SetPosition,
            Self::SetFilter(_) => Op::SetFilter,
            Self::Debug => Op::Debug,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_voice_update_frame() {
        let frame = Frame::parse(
            r#"{"op":"voice_update","d":{"guild_id":"1","session_id":"s1"}}"#,
        )
        .unwrap();
        assert_eq!(frame.op, Op::VoiceUpdate);
        assert_eq!(frame.guild_id, GuildId::from("1"));

        let PlayerCommand::VoiceUpdate(data) = PlayerCommand::from_frame(frame).unwrap() else {
            panic!("expected voice update");
        };
        assert_eq!(data.session_id.as_deref(), Some("s1"));
        assert_eq!(data.token, None);
    }

    #[test]
    fn test_numeric_guild_id_is_accepted() {
        let frame = Frame::parse(r#"{"op":"stop","d":{"guild_id":490}}"#).unwrap();
        assert_eq!(frame.guild_id, GuildId::from("490"));
    }

    #[test]
    fn test_invalid_frames() {
        assert!(matches!(Frame::parse("{oops"), Err(FrameError::InvalidJson(_))));
        assert!(matches!(Frame::parse("[1, 2]"), Err(FrameError::NotAnObject)));
        assert!(matches!(
            Frame::parse(r#"{"d":{"guild_id":"1"}}"#),
            Err(FrameError::MissingOp)
        ));
        assert!(matches!(
            Frame::parse(r#"{"op":"play"}"#),
            Err(FrameError::MissingData)
        ));
        assert!(matches!(
            Frame::parse(r#"{"op":"play","d":"nope"}"#),
            Err(FrameError::MissingData)
        ));
        assert!(matches!(
            Frame::parse(r#"{"op":"dance","d":{"guild_id":"1"}}"#),
            Err(FrameError::UnknownOp(op)) if op == "dance"
        ));
        assert!(matches!(
            Frame::parse(r#"{"op":"play","d":{"track_id":"x"}}"#),
            Err(FrameError::MissingGuildId)
        ));
        assert!(matches!(
            Frame::parse(r#"{"op":"play","d":{"guild_id":""}}"#),
            Err(FrameError::MissingGuildId)
        ));
    }

    #[test]
    fn test_wrongly_typed_data_is_rejected() {
        let frame =
            Frame::parse(r#"{"op":"set_pause_state","d":{"guild_id":"1","state":"yes"}}"#)
                .unwrap();
        assert!(PlayerCommand::from_frame(frame).is_err());
    }

    #[test]
    fn test_every_op_roundtrips_through_its_name() {
        for op in [
            Op::VoiceUpdate,
            Op::Destroy,
            Op::Play,
            Op::Stop,
            Op::SetPauseState,
            Op::SetPosition,
            Op::SetFilter,
            Op::Debug,
        ] {
            assert_eq!(op.as_str().parse::<Op>().unwrap(), op);
        }
    }
}
