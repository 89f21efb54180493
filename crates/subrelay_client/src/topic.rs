use async_trait::async_trait;
use gcloud_pubsub::publisher::Publisher;
use gcloud_pubsub::topic::Topic;

use subrelay_relay::{Message, MessageSink, PublishError};

use crate::client::publish_error;
use crate::convert;

/// A destination topic. `publish` resolves once the broker has assigned the
/// message an id or rejected it.
#[derive(Clone)]
pub struct RemoteTopic {
    name: String,
    publisher: Publisher,
}

impl RemoteTopic {
    pub(crate) fn new(topic: Topic) -> Self {
        Self {
            name: topic.fully_qualified_name().to_string(),
            publisher: topic.new_publisher(None),
        }
    }

    /// Fully qualified name, `projects/<p>/topics/<t>`.
    pub fn name(&self) -> &str {
        &self.name
    }
}

#[async_trait]
impl MessageSink for RemoteTopic {
    async fn publish(&self, message: &Message) -> Result<String, PublishError> {
        let awaiter = self.publisher.publish(convert::to_pubsub(message)).await;
        awaiter.get().await.map_err(publish_error)
    }
}
