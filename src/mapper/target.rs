use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The target runtime's component vocabulary.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum TargetType {
    StartEvent,
    EndEvent,
    ErrorEndEvent,
    RequestReply,
    Send,
    ContentModifier,
    Script,
    MessageMapping,
    Converter,
    Router,
    Multicast,
    Join,
    Splitter,
    Gather,
    Filter,
    ProcessCall,
    LoopingProcessCall,
    DataStore,
    Encoder,
    Logger,
    GenericPassthrough,
    /// Not yet classified. Never reaches the generator.
    #[default]
    Unresolved,
}

/// Shape family, which decides the drawn size of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeKind {
    Event,
    Gateway,
    Activity,
}

impl ShapeKind {
    /// Width and height in diagram units.
    pub fn size(&self) -> (f64, f64) {
        match self {
            ShapeKind::Event => (36.0, 36.0),
            ShapeKind::Gateway => (50.0, 50.0),
            ShapeKind::Activity => (100.0, 60.0),
        }
    }
}

impl TargetType {
    /// Every resolvable type, in declaration order.
    pub const ALL: [TargetType; 21] = [
        TargetType::StartEvent,
        TargetType::EndEvent,
        TargetType::ErrorEndEvent,
        TargetType::RequestReply,
        TargetType::Send,
        TargetType::ContentModifier,
        TargetType::Script,
        TargetType::MessageMapping,
        TargetType::Converter,
        TargetType::Router,
        TargetType::Multicast,
        TargetType::Join,
        TargetType::Splitter,
        TargetType::Gather,
        TargetType::Filter,
        TargetType::ProcessCall,
        TargetType::LoopingProcessCall,
        TargetType::DataStore,
        TargetType::Encoder,
        TargetType::Logger,
        TargetType::GenericPassthrough,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TargetType::StartEvent => "start_event",
            TargetType::EndEvent => "end_event",
            TargetType::ErrorEndEvent => "error_end_event",
            TargetType::RequestReply => "request_reply",
            TargetType::Send => "send",
            TargetType::ContentModifier => "content_modifier",
            TargetType::Script => "script",
            TargetType::MessageMapping => "message_mapping",
            TargetType::Converter => "converter",
            TargetType::Router => "router",
            TargetType::Multicast => "multicast",
            TargetType::Join => "join",
            TargetType::Splitter => "splitter",
            TargetType::Gather => "gather",
            TargetType::Filter => "filter",
            TargetType::ProcessCall => "process_call",
            TargetType::LoopingProcessCall => "looping_process_call",
            TargetType::DataStore => "data_store",
            TargetType::Encoder => "encoder",
            TargetType::Logger => "logger",
            TargetType::GenericPassthrough => "generic_passthrough",
            TargetType::Unresolved => "unresolved",
        }
    }

    pub fn shape(&self) -> ShapeKind {
        match self {
            TargetType::StartEvent | TargetType::EndEvent | TargetType::ErrorEndEvent => {
                ShapeKind::Event
            }
            TargetType::Router | TargetType::Multicast | TargetType::Join => ShapeKind::Gateway,
            _ => ShapeKind::Activity,
        }
    }

    pub fn is_resolved(&self) -> bool {
        *self != TargetType::Unresolved
    }
}

impl fmt::Display for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TargetType {
    type Err = String;

    /// Parses a resolvable identifier. `unresolved` is rejected.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        TargetType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == value)
            .ok_or_else(|| format!("unknown target type '{}'", value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifiers_round_trip_through_from_str() {
        for target in TargetType::ALL {
            assert_eq!(target.as_str().parse::<TargetType>(), Ok(target));
        }
        assert!("unresolved".parse::<TargetType>().is_err());
    }

    #[test]
    fn test_serde_uses_snake_case_identifiers() {
        let json = serde_json::to_string(&TargetType::LoopingProcessCall).unwrap();
        assert_eq!(json, "\"looping_process_call\"");
    }
}
