//! Data models for the archive rollup pipeline.
//!
//! This module contains the core vocabulary shared by every stage:
//! records, categories, actor keys, time keys and the map kinds that
//! name each result family.

use crate::error::{ArchiveError, RollupError};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Top-level archive category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Posts,
    Comments,
    Messages,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Posts, Category::Comments, Category::Messages];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Posts => "posts",
            Category::Comments => "comments",
            Category::Messages => "messages",
        }
    }

    /// Resolve the actor key for a record list found at `path` inside this
    /// category's actor tree.
    ///
    /// Each category has a fixed nesting schema:
    /// - posts: `actor`
    /// - messages: `NonGroup|Group / thread`
    /// - comments: `NonGroup|Group / Own` or `NonGroup|Group / Other|Replies / actor`
    ///
    /// "Own" comments belong to the archive owner.
    pub fn actor_key(&self, path: &[String], owner: &str) -> Result<ActorKey, ArchiveError> {
        let shape = |reason: &str| ArchiveError::Shape {
            category: self.as_str().to_string(),
            path: path.join("/"),
            reason: reason.to_string(),
        };

        match (self, path) {
            (Category::Posts, [actor]) => Ok(ActorKey::named(actor)),
            (Category::Messages, [group, thread]) => {
                let group = GroupKey::from_str(group).map_err(|_| shape("unknown group key"))?;
                Ok(ActorKey {
                    group: Some(group),
                    ..ActorKey::named(thread)
                })
            }
            (Category::Comments, [group, role, rest @ ..]) => {
                let group = GroupKey::from_str(group).map_err(|_| shape("unknown group key"))?;
                let role = RoleKey::from_str(role).map_err(|_| shape("unknown role key"))?;
                let actor = match (role, rest) {
                    (RoleKey::Own, []) => owner,
                    (RoleKey::Other | RoleKey::Replies, [actor]) => actor.as_str(),
                    _ => return Err(shape("role level has the wrong depth")),
                };
                Ok(ActorKey {
                    group: Some(group),
                    role: Some(role),
                    actor: actor.to_string(),
                })
            }
            _ => Err(shape("record list found at an unexpected depth")),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = ArchiveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "posts" => Ok(Category::Posts),
            "comments" => Ok(Category::Comments),
            "messages" => Ok(Category::Messages),
            other => Err(ArchiveError::UnknownCategory(other.to_string())),
        }
    }
}

/// Kind of post a record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordKind {
    Regular,
    Photo,
}

/// A classified, timestamped text record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    /// Seconds since the Unix epoch.
    pub timestamp: i64,
    /// Record body.
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<RecordKind>,
    /// Group or page the record was written in (group comments only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_name: Option<String>,
}

impl Record {
    pub fn new(timestamp: i64, text: impl Into<String>) -> Self {
        Self {
            timestamp,
            text: text.into(),
            kind: None,
            group_name: None,
        }
    }

    #[allow(dead_code)] // Builder for group comments
    pub fn in_group(mut self, group_name: impl Into<String>) -> Self {
        self.group_name = Some(group_name.into());
        self
    }
}

/// Whether a record was written inside a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum GroupKey {
    NonGroup,
    Group,
}

impl GroupKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            GroupKey::NonGroup => "NonGroup",
            GroupKey::Group => "Group",
        }
    }
}

impl FromStr for GroupKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NonGroup" => Ok(GroupKey::NonGroup),
            "Group" => Ok(GroupKey::Group),
            other => Err(other.to_string()),
        }
    }
}

/// Relationship of a comment to the post it was left on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RoleKey {
    /// Comment on the owner's own post.
    Own,
    /// Comment on someone else's post.
    Other,
    /// Reply to a comment.
    Replies,
}

impl RoleKey {
    /// Label used by the volume counters. Own and Other comments share one
    /// bucket; replies get their own.
    pub fn count_label(&self) -> &'static str {
        match self {
            RoleKey::Own | RoleKey::Other => "Comments",
            RoleKey::Replies => "Replies",
        }
    }
}

impl FromStr for RoleKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Own" => Ok(RoleKey::Own),
            "Other" => Ok(RoleKey::Other),
            "Replies" => Ok(RoleKey::Replies),
            other => Err(other.to_string()),
        }
    }
}

/// Composite attribution of a record list.
///
/// The actor is the person, thread or page the records belong to. Headline
/// text is pooled per month and never gets an actor key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ActorKey {
    pub group: Option<GroupKey>,
    pub role: Option<RoleKey>,
    pub actor: String,
}

impl ActorKey {
    pub fn named(name: &str) -> Self {
        Self {
            group: None,
            role: None,
            actor: name.to_string(),
        }
    }

    pub fn name(&self) -> &str {
        &self.actor
    }
}

/// A calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonthKey {
    pub year: i32,
    pub month: u32,
}

impl MonthKey {
    pub fn new(year: i32, month: u32) -> Self {
        Self { year, month }
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// Time axis key at one of the three resolutions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TimeKey {
    Month(MonthKey),
    Year(i32),
    Global,
}

impl TimeKey {
    pub fn month(year: i32, month: u32) -> Self {
        TimeKey::Month(MonthKey::new(year, month))
    }

    /// Map this key onto `resolution`. Keys are only ever made coarser: a
    /// year key stays a year key when asked for monthly resolution.
    pub fn coarsen(&self, resolution: Resolution) -> TimeKey {
        match (self, resolution) {
            (_, Resolution::Global) | (TimeKey::Global, _) => TimeKey::Global,
            (TimeKey::Month(m), Resolution::Annual) => TimeKey::Year(m.year),
            (TimeKey::Year(y), _) => TimeKey::Year(*y),
            (TimeKey::Month(m), Resolution::Monthly) => TimeKey::Month(*m),
        }
    }
}

impl fmt::Display for TimeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeKey::Month(m) => m.fmt(f),
            TimeKey::Year(y) => write!(f, "{:04}", y),
            TimeKey::Global => f.write_str("global"),
        }
    }
}

impl Serialize for TimeKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Time resolution of a rollup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Resolution {
    Monthly,
    Annual,
    Global,
}

impl Resolution {
    pub const ALL: [Resolution; 3] = [Resolution::Monthly, Resolution::Annual, Resolution::Global];
}

/// Ordering axis of a volume-count index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum SortAxis {
    #[serde(rename = "sorted_by_date")]
    ByDate,
    #[serde(rename = "sorted_by_name")]
    ByName,
}

/// Name of a result family. Controls how its leaves are reduced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(try_from = "String")]
pub enum MapKind {
    UrlCount,
    Wordcloud,
    PrimaryRank,
    SecondaryRank,
    Statistics,
    WordcloudHeadline,
    PrimaryRankHeadline,
    SecondaryRankHeadline,
}

impl MapKind {
    pub const ALL: [MapKind; 8] = [
        MapKind::UrlCount,
        MapKind::Wordcloud,
        MapKind::PrimaryRank,
        MapKind::SecondaryRank,
        MapKind::Statistics,
        MapKind::WordcloudHeadline,
        MapKind::PrimaryRankHeadline,
        MapKind::SecondaryRankHeadline,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MapKind::UrlCount => "url_count",
            MapKind::Wordcloud => "wordcloud",
            MapKind::PrimaryRank => "primary_rank",
            MapKind::SecondaryRank => "secondary_rank",
            MapKind::Statistics => "statistics",
            MapKind::WordcloudHeadline => "wordcloud_hl",
            MapKind::PrimaryRankHeadline => "primary_rank_hl",
            MapKind::SecondaryRankHeadline => "secondary_rank_hl",
        }
    }

    pub fn is_rank(&self) -> bool {
        matches!(
            self,
            MapKind::PrimaryRank
                | MapKind::SecondaryRank
                | MapKind::PrimaryRankHeadline
                | MapKind::SecondaryRankHeadline
        )
    }

    pub fn is_wordcloud(&self) -> bool {
        matches!(self, MapKind::Wordcloud | MapKind::WordcloudHeadline)
    }
}

impl fmt::Display for MapKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MapKind {
    type Err = RollupError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MapKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| RollupError::UnknownMapKind(s.to_string()))
    }
}

impl TryFrom<String> for MapKind {
    type Error = RollupError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl Serialize for MapKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Named text statistic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StatName {
    WordCount,
    SyllableCount,
    CharCount,
    Entropy,
    FleschKincaidGrade,
    FleschReadingEase,
    ColemanLiau,
    Lix,
}

impl StatName {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatName::WordCount => "wordcount",
            StatName::SyllableCount => "sylcount",
            StatName::CharCount => "charcount",
            StatName::Entropy => "entropy",
            StatName::FleschKincaidGrade => "fkgl",
            StatName::FleschReadingEase => "fre",
            StatName::ColemanLiau => "clix",
            StatName::Lix => "lix",
        }
    }
}

impl fmt::Display for StatName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|p| p.to_string()).collect()
    }

    #[test]
    fn test_time_key_display() {
        assert_eq!(TimeKey::month(2021, 3).to_string(), "2021-03");
        assert_eq!(TimeKey::month(2021, 11).to_string(), "2021-11");
        assert_eq!(TimeKey::Year(2021).to_string(), "2021");
        assert_eq!(TimeKey::Global.to_string(), "global");
    }

    #[test]
    fn test_time_key_coarsen() {
        let month = TimeKey::month(2020, 9);
        assert_eq!(month.coarsen(Resolution::Monthly), month);
        assert_eq!(month.coarsen(Resolution::Annual), TimeKey::Year(2020));
        assert_eq!(month.coarsen(Resolution::Global), TimeKey::Global);
        assert_eq!(
            TimeKey::Year(2020).coarsen(Resolution::Monthly),
            TimeKey::Year(2020)
        );
        assert_eq!(
            TimeKey::Global.coarsen(Resolution::Annual),
            TimeKey::Global
        );
    }

    #[test]
    fn test_map_kind_round_trip_and_unknown() {
        for kind in MapKind::ALL {
            assert_eq!(kind.as_str().parse::<MapKind>().unwrap(), kind);
        }
        assert!(matches!(
            "sentiment".parse::<MapKind>(),
            Err(RollupError::UnknownMapKind(name)) if name == "sentiment"
        ));
    }

    #[test]
    fn test_category_schemas() {
        let posts = Category::Posts.actor_key(&path(&["Jane"]), "Me").unwrap();
        assert_eq!(posts, ActorKey::named("Jane"));

        let own = Category::Comments
            .actor_key(&path(&["NonGroup", "Own"]), "Me")
            .unwrap();
        assert_eq!(own.name(), "Me");
        assert_eq!(own.role, Some(RoleKey::Own));

        let reply = Category::Comments
            .actor_key(&path(&["Group", "Replies", "Bob"]), "Me")
            .unwrap();
        assert_eq!(reply.group, Some(GroupKey::Group));
        assert_eq!(reply.name(), "Bob");

        let thread = Category::Messages
            .actor_key(&path(&["Group", "Book club"]), "Me")
            .unwrap();
        assert_eq!(thread.group, Some(GroupKey::Group));
    }

    #[test]
    fn test_category_schema_violations() {
        assert!(Category::Posts.actor_key(&path(&["a", "b"]), "Me").is_err());
        assert!(Category::Comments
            .actor_key(&path(&["NonGroup", "Own", "extra"]), "Me")
            .is_err());
        assert!(Category::Comments
            .actor_key(&path(&["Elsewhere", "Other", "Bob"]), "Me")
            .is_err());
        assert!(Category::Messages.actor_key(&path(&["NonGroup"]), "Me").is_err());
    }

    #[test]
    fn test_role_count_labels() {
        assert_eq!(RoleKey::Own.count_label(), "Comments");
        assert_eq!(RoleKey::Other.count_label(), "Comments");
        assert_eq!(RoleKey::Replies.count_label(), "Replies");
    }
}
