use std::fmt;

use thiserror::Error;

use crate::registry::ZoneId;

const ZONE_INFIX: &str = "/zone";
const STATE_FIELD: &str = "state";
const NAME_FIELD: &str = "name";
const SET_FIELD: &str = "set";
const ON: &str = "ON";
const OFF: &str = "OFF";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoneField {
    State,
    Name,
}

impl fmt::Display for ZoneField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ZoneField::State => f.write_str(STATE_FIELD),
            ZoneField::Name => f.write_str(NAME_FIELD),
        }
    }
}

/// Decoded payload of an inbound zone message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ZoneChange {
    State(bool),
    /// `None` when the payload was empty.
    Name(Option<String>),
}

/// Structured form of one inbound zone message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneUpdate {
    pub zone_id: ZoneId,
    pub change: ZoneChange,
}

impl ZoneUpdate {
    pub fn state(zone_id: ZoneId, open: bool) -> Self {
        Self {
            zone_id,
            change: ZoneChange::State(open),
        }
    }

    pub fn name(zone_id: ZoneId, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            zone_id,
            change: ZoneChange::Name((!name.is_empty()).then_some(name)),
        }
    }

    pub fn field(&self) -> ZoneField {
        match self.change {
            ZoneChange::State(_) => ZoneField::State,
            ZoneChange::Name(_) => ZoneField::Name,
        }
    }

    /// Name to pass to the registry upsert, if this is a non-empty name update.
    pub fn name_hint(&self) -> Option<&str> {
        match &self.change {
            ZoneChange::Name(Some(name)) => Some(name),
            _ => None,
        }
    }
}

/// Why an inbound topic was ignored.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TopicRejection {
    #[error("topic is outside `{0}/zone`")]
    ForeignTopic(String),
    #[error("zone number `{0}` is not a positive integer")]
    InvalidZoneNumber(String),
    #[error("missing field segment")]
    MissingField,
    #[error("unknown field `{0}`")]
    UnknownField(String),
}

/// Parses inbound topics and builds outbound ones for a single base topic.
#[derive(Debug, Clone)]
pub struct TopicRouter {
    base_topic: String,
}

impl TopicRouter {
    pub fn new(base_topic: impl Into<String>) -> Self {
        Self {
            base_topic: base_topic.into(),
        }
    }

    pub fn base_topic(&self) -> &str {
        &self.base_topic
    }

    /// Parse a message, discarding the rejection reason.
    pub fn parse(&self, topic: &str, payload: &[u8]) -> Option<ZoneUpdate> {
        self.classify(topic, payload).ok()
    }

    pub fn classify(&self, topic: &str, payload: &[u8]) -> Result<ZoneUpdate, TopicRejection> {
        let rest = topic
            .strip_prefix(self.base_topic.as_str())
            .and_then(|rest| rest.strip_prefix(ZONE_INFIX))
            .ok_or_else(|| TopicRejection::ForeignTopic(self.base_topic.clone()))?;

        let (number, field) = match rest.split_once('/') {
            Some((number, field)) => (number, Some(field)),
            None => (rest, None),
        };
        let zone_id = parse_zone_number(number)?;
        let field = field.ok_or(TopicRejection::MissingField)?;

        let change = match field {
            STATE_FIELD => ZoneChange::State(payload == ON.as_bytes()),
            NAME_FIELD => {
                let name = String::from_utf8_lossy(payload).into_owned();
                ZoneChange::Name((!name.is_empty()).then_some(name))
            }
            "" => return Err(TopicRejection::MissingField),
            other => return Err(TopicRejection::UnknownField(other.to_string())),
        };

        Ok(ZoneUpdate { zone_id, change })
    }

    pub fn state_topic(&self, id: ZoneId) -> String {
        self.zone_topic(id, STATE_FIELD)
    }

    pub fn name_topic(&self, id: ZoneId) -> String {
        self.zone_topic(id, NAME_FIELD)
    }

    pub fn command_topic(&self, id: ZoneId) -> String {
        self.zone_topic(id, SET_FIELD)
    }

    /// State and name topics for zones `1..=zone_count`.
    pub fn subscriptions(&self, zone_count: u32) -> Vec<String> {
        (1..=zone_count)
            .filter_map(ZoneId::new)
            .flat_map(|id| [self.state_topic(id), self.name_topic(id)])
            .collect()
    }

    fn zone_topic(&self, id: ZoneId, field: &str) -> String {
        format!("{}{}{}/{}", self.base_topic, ZONE_INFIX, id, field)
    }
}

pub fn command_payload(open: bool) -> &'static str {
    if open { ON } else { OFF }
}

fn parse_zone_number(number: &str) -> Result<ZoneId, TopicRejection> {
    let invalid = || TopicRejection::InvalidZoneNumber(number.to_string());
    if number.is_empty() || !number.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    // Only the canonical spelling addresses a zone.
    if number.len() > 1 && number.starts_with('0') {
        return Err(invalid());
    }
    number
        .parse::<u32>()
        .ok()
        .and_then(ZoneId::new)
        .ok_or_else(invalid)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(raw: u32) -> ZoneId {
        ZoneId::new(raw).unwrap()
    }

    fn router() -> TopicRouter {
        TopicRouter::new("zone-controller")
    }

    #[test]
    fn parses_state_messages() {
        let router = router();
        assert_eq!(
            router.parse("zone-controller/zone7/state", b"ON"),
            Some(ZoneUpdate::state(id(7), true))
        );
        assert_eq!(
            router.parse("zone-controller/zone7/state", b"OFF"),
            Some(ZoneUpdate::state(id(7), false))
        );
        assert_eq!(
            router.parse("zone-controller/zone7/state", b"on"),
            Some(ZoneUpdate::state(id(7), false))
        );
    }

    #[test]
    fn parses_name_messages_verbatim() {
        let update = router()
            .parse("zone-controller/zone3/name", b" Kitchen ")
            .unwrap();
        assert_eq!(update.field(), ZoneField::Name);
        assert_eq!(update.name_hint(), Some(" Kitchen "));

        let empty = router().parse("zone-controller/zone3/name", b"").unwrap();
        assert_eq!(empty.change, ZoneChange::Name(None));
        assert_eq!(empty.name_hint(), None);
    }

    #[test]
    fn rejects_malformed_topics() {
        let router = router();
        assert_eq!(
            router.classify("zone-controller/zoneX/state", b"ON"),
            Err(TopicRejection::InvalidZoneNumber("X".into()))
        );
        assert_eq!(
            router.classify("zone-controller/zone0/state", b"ON"),
            Err(TopicRejection::InvalidZoneNumber("0".into()))
        );
        assert_eq!(
            router.classify("zone-controller/zone07/state", b"ON"),
            Err(TopicRejection::InvalidZoneNumber("07".into()))
        );
        assert_eq!(
            router.classify("zone-controller/zone-2/state", b"ON"),
            Err(TopicRejection::InvalidZoneNumber("-2".into()))
        );
        assert_eq!(
            router.classify("zone-controller/zone4/colour", b"red"),
            Err(TopicRejection::UnknownField("colour".into()))
        );
        assert_eq!(
            router.classify("zone-controller/zone4/state/extra", b"ON"),
            Err(TopicRejection::UnknownField("state/extra".into()))
        );
        assert_eq!(
            router.classify("zone-controller/zone4", b"ON"),
            Err(TopicRejection::MissingField)
        );
        assert!(matches!(
            router.classify("other/zone4/state", b"ON"),
            Err(TopicRejection::ForeignTopic(_))
        ));
        assert!(router.parse("zone-controller/zone99999999999/state", b"ON").is_none());
        // Outbound commands echoed back are not state updates.
        assert!(router.parse("zone-controller/zone4/set", b"ON").is_none());
    }

    #[test]
    fn builds_outbound_topics() {
        let router = router();
        assert_eq!(router.command_topic(id(12)), "zone-controller/zone12/set");
        assert_eq!(command_payload(true), "ON");
        assert_eq!(command_payload(false), "OFF");
        assert_eq!(
            router.subscriptions(2),
            vec![
                "zone-controller/zone1/state",
                "zone-controller/zone1/name",
                "zone-controller/zone2/state",
                "zone-controller/zone2/name",
            ]
        );
        assert!(router.subscriptions(0).is_empty());
    }
}
