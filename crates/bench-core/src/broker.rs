//! Broker backends the harness can measure.

use serde::{Deserialize, Serialize};

/// Cloud provider hosting a broker, as reported in `CollectorRecord::cloud_provider`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CloudProvider {
    Azure,
    #[serde(rename = "AWS")]
    Aws,
    #[serde(rename = "GCP")]
    Gcp,
    Local,
}

impl CloudProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            CloudProvider::Azure => "Azure",
            CloudProvider::Aws => "AWS",
            CloudProvider::Gcp => "GCP",
            CloudProvider::Local => "Local",
        }
    }
}

impl std::fmt::Display for CloudProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a broker puts the correlation fields of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeCarrier {
    /// Message properties / attributes next to an opaque body.
    Properties,
    /// A JSON object in the message body.
    Body,
}

/// Supported broker backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BrokerKind {
    /// Session-ordered queue
    ServiceBus,
    /// Partitioned event stream
    EventHubs,
    /// Partitioned event stream reached over the Kafka protocol
    EventHubsKafka,
    /// Plain point-to-point queue
    StorageQueue,
    /// Push-based pub/sub
    EventGrid,
    /// Queue with FIFO message groups
    Sqs,
    /// Pull-based pub/sub topic
    #[serde(rename = "pubsub")]
    PubSub,
    /// In-process channel used for local runs
    Loopback,
}

impl BrokerKind {
    pub const ALL: [BrokerKind; 8] = [
        BrokerKind::ServiceBus,
        BrokerKind::EventHubs,
        BrokerKind::EventHubsKafka,
        BrokerKind::StorageQueue,
        BrokerKind::EventGrid,
        BrokerKind::Sqs,
        BrokerKind::PubSub,
        BrokerKind::Loopback,
    ];

    pub fn cloud_provider(&self) -> CloudProvider {
        match self {
            BrokerKind::ServiceBus
            | BrokerKind::EventHubs
            | BrokerKind::EventHubsKafka
            | BrokerKind::StorageQueue
            | BrokerKind::EventGrid => CloudProvider::Azure,
            BrokerKind::Sqs => CloudProvider::Aws,
            BrokerKind::PubSub => CloudProvider::Gcp,
            BrokerKind::Loopback => CloudProvider::Local,
        }
    }

    /// Label written to `CollectorRecord::trigger`.
    pub fn trigger_label(&self) -> &'static str {
        match self {
            BrokerKind::ServiceBus => "ServiceBus",
            BrokerKind::EventHubs => "EventHub",
            BrokerKind::EventHubsKafka => "EventHubKafka",
            BrokerKind::StorageQueue => "Queue",
            BrokerKind::EventGrid => "EventGrid",
            BrokerKind::Sqs => "SQS",
            BrokerKind::PubSub => "PubSub",
            BrokerKind::Loopback => "Loopback",
        }
    }

    /// Whether the broker has a native concurrency unit that messages are tagged with.
    ///
    /// Grouped brokers attach a `GroupId` to every message. The others take a
    /// single dispatch group whose messages carry no group.
    pub fn is_grouped(&self) -> bool {
        matches!(
            self,
            BrokerKind::ServiceBus
                | BrokerKind::EventHubs
                | BrokerKind::EventHubsKafka
                | BrokerKind::Sqs
                | BrokerKind::Loopback
        )
    }

    /// What the broker calls one dispatch group, for log output.
    pub fn group_unit(&self) -> &'static str {
        match self {
            BrokerKind::ServiceBus => "session",
            BrokerKind::EventHubs | BrokerKind::EventHubsKafka => "partition",
            _ => "group",
        }
    }

    pub fn default_carrier(&self) -> AttributeCarrier {
        match self {
            BrokerKind::StorageQueue | BrokerKind::EventGrid | BrokerKind::EventHubsKafka => {
                AttributeCarrier::Body
            }
            _ => AttributeCarrier::Properties,
        }
    }
}

impl std::fmt::Display for BrokerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BrokerKind::ServiceBus => write!(f, "service-bus"),
            BrokerKind::EventHubs => write!(f, "event-hubs"),
            BrokerKind::EventHubsKafka => write!(f, "event-hubs-kafka"),
            BrokerKind::StorageQueue => write!(f, "storage-queue"),
            BrokerKind::EventGrid => write!(f, "event-grid"),
            BrokerKind::Sqs => write!(f, "sqs"),
            BrokerKind::PubSub => write!(f, "pubsub"),
            BrokerKind::Loopback => write!(f, "loopback"),
        }
    }
}

impl std::str::FromStr for BrokerKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "service-bus" | "servicebus" => Ok(BrokerKind::ServiceBus),
            "event-hubs" | "eventhubs" | "eventhub" => Ok(BrokerKind::EventHubs),
            "event-hubs-kafka" | "kafka" => Ok(BrokerKind::EventHubsKafka),
            "storage-queue" | "queue" => Ok(BrokerKind::StorageQueue),
            "event-grid" | "eventgrid" => Ok(BrokerKind::EventGrid),
            "sqs" => Ok(BrokerKind::Sqs),
            "pubsub" | "pub-sub" => Ok(BrokerKind::PubSub),
            "loopback" | "local" => Ok(BrokerKind::Loopback),
            _ => Err(format!("Unknown broker kind: {s}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_roundtrips_through_from_str() {
        for kind in BrokerKind::ALL {
            assert_eq!(kind.to_string().parse::<BrokerKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_unknown_broker_is_rejected() {
        assert!("rabbitmq".parse::<BrokerKind>().is_err());
    }

    #[test]
    fn test_grouping_follows_broker_concurrency_unit() {
        assert!(BrokerKind::ServiceBus.is_grouped());
        assert_eq!(BrokerKind::ServiceBus.group_unit(), "session");
        assert_eq!(BrokerKind::EventHubs.group_unit(), "partition");
        assert!(!BrokerKind::StorageQueue.is_grouped());
        assert!(!BrokerKind::PubSub.is_grouped());
    }

    #[test]
    fn test_provider_labels() {
        assert_eq!(BrokerKind::Sqs.cloud_provider().as_str(), "AWS");
        assert_eq!(BrokerKind::PubSub.cloud_provider().as_str(), "GCP");
        assert_eq!(BrokerKind::EventGrid.trigger_label(), "EventGrid");
        assert_eq!(
            serde_json::to_string(&CloudProvider::Aws).unwrap(),
            r#""AWS""#
        );
    }
}
