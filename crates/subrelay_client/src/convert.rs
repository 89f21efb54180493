//! Conversion between relay messages and Pub/Sub's wire messages. Payload,
//! attributes and ordering key pass through untouched; message id and
//! publish time are assigned by the broker and only travel inbound.

use chrono::DateTime;
use gcloud_googleapis::pubsub::v1::PubsubMessage;

use subrelay_relay::Message;

pub fn from_pubsub(message: PubsubMessage) -> Message {
    Message {
        data: message.data,
        attributes: message.attributes.into_iter().collect(),
        message_id: Some(message.message_id).filter(|id| !id.is_empty()),
        publish_time: message
            .publish_time
            .and_then(|ts| DateTime::from_timestamp(ts.seconds, ts.nanos.max(0) as u32)),
        ordering_key: Some(message.ordering_key).filter(|key| !key.is_empty()),
    }
}

pub fn to_pubsub(message: &Message) -> PubsubMessage {
    PubsubMessage {
        data: message.data.clone(),
        attributes: message
            .attributes
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect(),
        ordering_key: message.ordering_key.clone().unwrap_or_default(),
        ..Default::default()
    }
}
