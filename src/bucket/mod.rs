//! Calendar bucketing of records.
//!
//! Timestamps are converted to local calendar fields and every record list
//! in an actor tree is regrouped into a year → month → day → daypart cube.

use crate::archive::ActorTree;
use crate::models::{MonthKey, Record};
use chrono::{DateTime, Datelike, FixedOffset, Local, TimeZone, Timelike, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

/// Half of the day a record was written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Daypart {
    /// Local hour in `[6, 18)`.
    Day,
    Night,
}

impl Daypart {
    pub fn from_hour(hour: u32) -> Self {
        if (6..18).contains(&hour) {
            Daypart::Day
        } else {
            Daypart::Night
        }
    }
}

/// Local calendar fields of a timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Calendar {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
}

impl Calendar {
    fn of<Tz: TimeZone>(datetime: &DateTime<Tz>) -> Self {
        Self {
            year: datetime.year(),
            month: datetime.month(),
            day: datetime.day(),
            hour: datetime.hour(),
        }
    }
}

/// Time zone used to read timestamps.
#[derive(Debug, Clone, Copy)]
pub enum Clock {
    /// The machine's local zone.
    Local,
    Fixed(FixedOffset),
}

impl Clock {
    /// Build a clock from an optional UTC offset in minutes. Returns `None`
    /// for offsets outside ±24h.
    pub fn from_offset_minutes(minutes: Option<i32>) -> Option<Self> {
        match minutes {
            None => Some(Clock::Local),
            Some(m) => FixedOffset::east_opt(m.checked_mul(60)?).map(Clock::Fixed),
        }
    }

    /// Calendar fields for any timestamp. Values beyond the representable
    /// range clamp to its ends.
    pub fn calendar(&self, timestamp: i64) -> Calendar {
        let utc = DateTime::<Utc>::from_timestamp(timestamp, 0).unwrap_or(if timestamp < 0 {
            DateTime::<Utc>::MIN_UTC
        } else {
            DateTime::<Utc>::MAX_UTC
        });

        match self {
            Clock::Local => Calendar::of(&utc.with_timezone(&Local)),
            Clock::Fixed(offset) => Calendar::of(&utc.with_timezone(offset)),
        }
    }
}

/// A record with its calendar fields attached.
#[derive(Debug, Clone, PartialEq)]
pub struct DecoratedRecord {
    pub record: Record,
    pub calendar: Calendar,
}

type DayBuckets = BTreeMap<Daypart, Vec<Record>>;

/// Records of one actor grouped by year, month, day and daypart.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimeCube {
    years: BTreeMap<i32, BTreeMap<u32, BTreeMap<u32, DayBuckets>>>,
}

/// One populated cube cell.
#[derive(Debug, Clone, Copy)]
pub struct CubeLeaf<'a> {
    pub month: MonthKey,
    pub day: u32,
    pub daypart: Daypart,
    pub records: &'a [Record],
}

impl TimeCube {
    /// Group decorated records, keeping their order inside each cell.
    pub fn from_decorated(records: Vec<DecoratedRecord>) -> Self {
        let mut cube = TimeCube::default();
        for decorated in records {
            cube.bucket_mut(&decorated.calendar).push(decorated.record);
        }
        cube
    }

    /// The cell for a calendar position, created on first use.
    pub fn bucket_mut(&mut self, calendar: &Calendar) -> &mut Vec<Record> {
        self.years
            .entry(calendar.year)
            .or_default()
            .entry(calendar.month)
            .or_default()
            .entry(calendar.day)
            .or_default()
            .entry(Daypart::from_hour(calendar.hour))
            .or_default()
    }

    /// Populated cells in calendar order.
    pub fn leaves(&self) -> impl Iterator<Item = CubeLeaf<'_>> {
        self.years.iter().flat_map(|(&year, months)| {
            months.iter().flat_map(move |(&month, days)| {
                days.iter().flat_map(move |(&day, parts)| {
                    parts.iter().map(move |(&daypart, records)| CubeLeaf {
                        month: MonthKey::new(year, month),
                        day,
                        daypart,
                        records: records.as_slice(),
                    })
                })
            })
        })
    }

    pub fn record_count(&self) -> usize {
        self.leaves().map(|leaf| leaf.records.len()).sum()
    }
}

/// Converts timestamps and builds time cubes.
#[derive(Debug, Clone, Copy)]
pub struct TimeBucketer {
    clock: Clock,
}

impl TimeBucketer {
    pub fn new(clock: Clock) -> Self {
        Self { clock }
    }

    /// Attach calendar fields to every record.
    pub fn decorate(&self, records: Vec<Record>) -> Vec<DecoratedRecord> {
        records
            .into_iter()
            .map(|record| DecoratedRecord {
                calendar: self.clock.calendar(record.timestamp),
                record,
            })
            .collect()
    }

    /// Decorate and bucket every record list of an actor tree.
    pub fn bucket_tree(&self, tree: ActorTree<Vec<Record>>) -> ActorTree<TimeCube> {
        bucket(tree.map(|records| self.decorate(records)))
    }
}

/// Replace each decorated record list with its time cube.
pub fn bucket(tree: ActorTree<Vec<DecoratedRecord>>) -> ActorTree<TimeCube> {
    tree.map(|records| {
        let cube = TimeCube::from_decorated(records);
        debug!("Bucketed {} records into a time cube", cube.record_count());
        cube
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc_clock() -> Clock {
        Clock::from_offset_minutes(Some(0)).unwrap()
    }

    #[test]
    fn test_daypart_boundaries() {
        assert_eq!(Daypart::from_hour(5), Daypart::Night);
        assert_eq!(Daypart::from_hour(6), Daypart::Day);
        assert_eq!(Daypart::from_hour(17), Daypart::Day);
        assert_eq!(Daypart::from_hour(18), Daypart::Night);
        assert_eq!(Daypart::from_hour(0), Daypart::Night);
    }

    #[test]
    fn test_calendar_with_offsets() {
        // 2020-09-13 12:26:40 UTC
        let ts = 1_600_000_000;
        let utc = utc_clock().calendar(ts);
        assert_eq!((utc.year, utc.month, utc.day, utc.hour), (2020, 9, 13, 12));

        let tokyo = Clock::from_offset_minutes(Some(540)).unwrap().calendar(ts);
        assert_eq!((tokyo.day, tokyo.hour), (13, 21));

        let behind = Clock::from_offset_minutes(Some(-780)).unwrap().calendar(ts);
        assert_eq!((behind.day, behind.hour), (12, 23));
    }

    #[test]
    fn test_calendar_is_total() {
        let clock = utc_clock();
        let past = clock.calendar(i64::MIN);
        let future = clock.calendar(i64::MAX);
        assert!(past.year < 0);
        assert!(future.year > 10_000);
        assert_eq!(clock.calendar(0).year, 1970);
    }

    #[test]
    fn test_invalid_offset() {
        assert!(Clock::from_offset_minutes(Some(24 * 60)).is_none());
        assert!(Clock::from_offset_minutes(Some(i32::MAX)).is_none());
    }

    #[test]
    fn test_cube_groups_and_preserves_order() {
        let bucketer = TimeBucketer::new(utc_clock());
        let records = vec![
            Record::new(1_600_000_000, "first"),  // 2020-09-13 12h
            Record::new(1_600_040_000, "night"),  // 2020-09-13 23h
            Record::new(1_600_000_100, "second"), // 2020-09-13 12h
            Record::new(1_602_000_000, "october"),
        ];

        let cube = TimeCube::from_decorated(bucketer.decorate(records));
        let leaves: Vec<_> = cube.leaves().collect();

        assert_eq!(leaves.len(), 3);
        assert_eq!(leaves[0].month, MonthKey::new(2020, 9));
        assert_eq!(leaves[0].daypart, Daypart::Day);
        let texts: Vec<&str> = leaves[0].records.iter().map(|r| r.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "second"]);
        assert_eq!(leaves[1].daypart, Daypart::Night);
        assert_eq!(leaves[2].month, MonthKey::new(2020, 10));
        assert_eq!(cube.record_count(), 4);
    }

    #[test]
    fn test_bucket_tree_keeps_actor_nesting() {
        let mut inner = BTreeMap::new();
        inner.insert(
            "Bob".to_string(),
            ActorTree::Leaf(vec![Record::new(1_600_000_000, "hi")]),
        );
        let mut root = BTreeMap::new();
        root.insert("Other".to_string(), ActorTree::Branch(inner));
        let tree = ActorTree::Branch(root);

        let cubes = TimeBucketer::new(utc_clock()).bucket_tree(tree);
        let leaves = cubes.leaves();
        assert_eq!(leaves.len(), 1);
        assert_eq!(leaves[0].0, vec!["Other", "Bob"]);
        assert_eq!(leaves[0].1.record_count(), 1);
    }
}
