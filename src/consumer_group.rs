use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use tracing::{debug, warn};

/// A topic name plus partition index, the key of every per-partition map in
/// this crate.
///
/// Ordering is lexicographic by topic, then numeric by partition, so iterating
/// any of the maps yields the order the dashboards display.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TopicPartition {
    pub topic: String,
    pub partition: i32,
}

impl TopicPartition {
    pub fn new(topic: impl Into<String>, partition: i32) -> Self {
        TopicPartition { topic: topic.into(), partition }
    }
}

impl fmt::Display for TopicPartition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.topic, self.partition)
    }
}

/// A broker node, as reported by the admin client.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Node {
    pub id: i32,
    pub host: String,
    pub port: i32,
    pub rack: Option<String>,
}

/// A consumer-group member and its current partition assignment.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Member {
    /// Member identifier assigned by the group coordinator.
    pub consumer_id: String,

    /// Static membership identifier, when the client configured one.
    pub group_instance_id: Option<String>,

    /// Client-supplied `client.id`.
    pub client_id: String,

    /// Host the client connected from.
    pub host: String,

    /// Partitions this member is currently responsible for reading.
    pub partitions: BTreeSet<TopicPartition>,
}

/// Committed position and log watermarks for one partition.
///
/// `lag` is `end - current`, deliberately unclamped: compaction or segment
/// deletion can leave a stale committed offset behind the log start, and a
/// negative number is more honest on a dashboard than a silent zero.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Offset {
    /// Last committed consumer offset.
    pub current: i64,

    /// Begin watermark: the lowest position still present in the log.
    pub begin: i64,

    /// End watermark: the next position to be written.
    pub end: i64,
}

impl Offset {
    pub fn new(current: i64, begin: i64, end: i64) -> Self {
        Offset { current, begin, end }
    }

    /// How many records the consumer has not yet read.
    pub fn lag(&self) -> i64 {
        self.end - self.current
    }
}

/// A consumer-group description as fetched from the admin client, before the
/// offset maps are joined in.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GroupDescription {
    pub id: String,
    pub state: String,
    pub coordinator: Node,
    pub members: Vec<Member>,
}

/// What to record for a partition that is assigned to a member but has no
/// committed offset.
///
/// Kept as a named policy rather than an inline default so the choice is
/// visible at the aggregation call site and swappable without touching the
/// join itself.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub enum MissingOffsetPolicy {
    /// Record `Offset { 0, 0, 0 }`, so the partition shows `lag == 0`.
    #[default]
    ZeroDefault,

    /// Record `current = 0` with the true watermarks when the watermark maps
    /// know the partition, so it shows `lag == end`. Falls back to zeros for
    /// partitions the watermark fetch did not cover.
    WatermarkFallback,
}

impl MissingOffsetPolicy {
    fn synthesise(
        &self,
        partition: &TopicPartition,
        begin_watermarks: &BTreeMap<TopicPartition, i64>,
        end_watermarks: &BTreeMap<TopicPartition, i64>,
    ) -> Offset {
        match self {
            MissingOffsetPolicy::ZeroDefault => Offset::default(),
            MissingOffsetPolicy::WatermarkFallback => Offset {
                current: 0,
                begin: begin_watermarks.get(partition).copied().unwrap_or(0),
                end: end_watermarks.get(partition).copied().unwrap_or(0),
            },
        }
    }
}

/// A consumer group joined with its committed offsets and log watermarks.
///
/// Built once per fetch by [`ConsumerGroup::aggregate`] from three
/// independently-sourced inputs, immutable thereafter. Every partition in
/// `partition_members` also has an entry in `partition_offsets`; the reverse
/// does not hold (a group can retain commits for partitions no longer
/// assigned to any live member).
#[derive(Debug, Clone, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConsumerGroup {
    pub id: String,
    pub state: String,
    pub coordinator: Node,
    pub members: Vec<Member>,

    /// Committed offset plus watermarks per tracked partition.
    pub partition_offsets: BTreeMap<TopicPartition, Offset>,

    /// Owning member per assigned partition.
    pub partition_members: BTreeMap<TopicPartition, Member>,
}

impl ConsumerGroup {
    /// Joins a group description with its committed offsets and watermarks,
    /// using [`MissingOffsetPolicy::ZeroDefault`] for assigned-but-uncommitted
    /// partitions.
    ///
    /// Both watermark maps must contain every key present in
    /// `committed_offsets`; a missing watermark is a broken contract on the
    /// part of the offset fetch and panics rather than being papered over.
    pub fn aggregate(
        description: GroupDescription,
        committed_offsets: &BTreeMap<TopicPartition, i64>,
        begin_watermarks: &BTreeMap<TopicPartition, i64>,
        end_watermarks: &BTreeMap<TopicPartition, i64>,
    ) -> Self {
        Self::aggregate_with(
            description,
            committed_offsets,
            begin_watermarks,
            end_watermarks,
            MissingOffsetPolicy::default(),
        )
    }

    /// Same as [`Self::aggregate`], with an explicit policy for partitions
    /// that are assigned to a member but carry no committed offset.
    pub fn aggregate_with(
        description: GroupDescription,
        committed_offsets: &BTreeMap<TopicPartition, i64>,
        begin_watermarks: &BTreeMap<TopicPartition, i64>,
        end_watermarks: &BTreeMap<TopicPartition, i64>,
        policy: MissingOffsetPolicy,
    ) -> Self {
        let mut partition_offsets = BTreeMap::new();
        for (partition, &current) in committed_offsets {
            let offset =
                Offset::new(current, begin_watermarks[partition], end_watermarks[partition]);
            partition_offsets.insert(partition.clone(), offset);
        }

        let mut partition_members: BTreeMap<TopicPartition, Member> = BTreeMap::new();
        for member in &description.members {
            for partition in &member.partitions {
                if let Some(previous) = partition_members.insert(partition.clone(), member.clone())
                {
                    // The coordinator should never hand one partition to two
                    // members; keep the later claim but make it visible.
                    warn!(
                        group = %description.id,
                        partition = %partition,
                        previous_member = %previous.consumer_id,
                        kept_member = %member.consumer_id,
                        "partition claimed by more than one group member",
                    );
                }
            }
        }

        for partition in partition_members.keys() {
            if !partition_offsets.contains_key(partition) {
                debug!(
                    group = %description.id,
                    partition = %partition,
                    ?policy,
                    "assigned partition has no committed offset, synthesising one",
                );
                let offset = policy.synthesise(partition, begin_watermarks, end_watermarks);
                partition_offsets.insert(partition.clone(), offset);
            }
        }

        ConsumerGroup {
            id: description.id,
            state: description.state,
            coordinator: description.coordinator,
            members: description.members,
            partition_offsets,
            partition_members,
        }
    }

    /// Tracked offsets for one topic, in partition order.
    pub fn offsets_for_topic(&self, topic: &str) -> Vec<(&TopicPartition, &Offset)> {
        self.partition_offsets.iter().filter(|(tp, _)| tp.topic == topic).collect()
    }

    /// Tracked offset for one partition of one topic.
    pub fn offset_for_topic_partition(&self, topic: &str, partition: i32) -> Option<&Offset> {
        self.partition_offsets.get(&TopicPartition::new(topic, partition))
    }

    /// Distinct topic names across all tracked partitions.
    pub fn topics(&self) -> BTreeSet<&str> {
        self.partition_offsets.keys().map(|tp| tp.topic.as_str()).collect()
    }

    /// Sum of lag across one topic's tracked partitions.
    pub fn lag_for_topic(&self, topic: &str) -> i64 {
        self.partition_offsets
            .iter()
            .filter(|(tp, _)| tp.topic == topic)
            .map(|(_, offset)| offset.lag())
            .sum()
    }

    /// Sum of lag across every tracked partition.
    pub fn overall_lag(&self) -> i64 {
        self.partition_offsets.values().map(Offset::lag).sum()
    }

    /// Tracked partitions of one topic.
    pub fn partitions_for_topic(&self, topic: &str) -> Vec<&TopicPartition> {
        self.partition_offsets.keys().filter(|tp| tp.topic == topic).collect()
    }

    /// Distinct topic names across member-assigned partitions.
    pub fn assigned_topics(&self) -> BTreeSet<&str> {
        self.partition_members.keys().map(|tp| tp.topic.as_str()).collect()
    }

    /// Every partition currently assigned to a member.
    pub fn assigned_partitions(&self) -> Vec<&TopicPartition> {
        self.partition_members.keys().collect()
    }

    /// Member-assigned partitions of one topic.
    pub fn assigned_partitions_for_topic(&self, topic: &str) -> Vec<&TopicPartition> {
        self.partition_members.keys().filter(|tp| tp.topic == topic).collect()
    }

    /// The member a partition is assigned to, if any.
    pub fn member_for_partition(&self, partition: &TopicPartition) -> Option<&Member> {
        self.partition_members.get(partition)
    }
}
