use crate::powertracker::category::PowerEventCategory;
use crate::prelude::{CoreError, CoreResult, MoteId};
use crate::telemetry::log::LogManager;
use regex::{Captures, Regex};

pub const MICROS_PER_SECOND: f64 = 1_000_000.0;

/// One PowerTracker line for a single category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldMatch {
    pub mote_id: MoteId,
    /// Raw microsecond count as logged.
    pub raw_time: u64,
    /// Byte offset of the line in the scanned text.
    pub offset: usize,
}

impl FieldMatch {
    pub fn seconds(&self) -> f64 {
        self.raw_time as f64 / MICROS_PER_SECOND
    }
}

/// Scans a PowerTracker log for the lines of one event category.
///
/// Lines look like `Sky_3 TX 120456 us 0.20 %`: a platform tag, the mote
/// id, the category tag and the accumulated time in microseconds. Anything
/// after the time is ignored. Platform tags match case-insensitively, the
/// category tag does not.
pub struct FieldPatternScanner {
    category: PowerEventCategory,
    pattern: Regex,
    logger: LogManager,
}

impl FieldPatternScanner {
    pub fn new<S: AsRef<str>>(platforms: &[S], category: PowerEventCategory) -> CoreResult<Self> {
        let alternatives: Vec<String> = platforms
            .iter()
            .map(|platform| platform.as_ref().trim())
            .filter(|platform| !platform.is_empty())
            .map(regex::escape)
            .collect();
        if alternatives.is_empty() {
            return Err(CoreError::NoPlatforms);
        }

        let pattern = format!(
            r"(?m)^(?i:{})_(\d+)[ \t]+{}[ \t]+(\d+)(?:[ \t][^\r\n]*)?\r?$",
            alternatives.join("|"),
            regex::escape(category.tag())
        );

        Ok(Self {
            category,
            pattern: Regex::new(&pattern)?,
            logger: LogManager::new("powertracker"),
        })
    }

    pub fn category(&self) -> PowerEventCategory {
        self.category
    }

    /// Lazily yields the matches in text order. Calling it again on the same
    /// text yields the same sequence.
    pub fn scan<'a>(&'a self, text: &'a str) -> impl Iterator<Item = FieldMatch> + 'a {
        self.pattern
            .captures_iter(text)
            .filter_map(move |captures| self.parse(&captures))
    }

    fn parse(&self, captures: &Captures<'_>) -> Option<FieldMatch> {
        let line = captures.get(0)?;
        let mote_id = captures.get(1)?.as_str().parse::<MoteId>();
        let raw_time = captures.get(2)?.as_str().parse::<u64>();
        match (mote_id, raw_time) {
            (Ok(mote_id), Ok(raw_time)) => Some(FieldMatch {
                mote_id,
                raw_time,
                offset: line.start(),
            }),
            _ => {
                self.logger.skip(line.as_str(), "numeric field out of range");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOG: &str = "Sky_1 MONITORED 1000000 us\n\
                       Sky_1 ON 500000 us 50.00 %\n\
                       garbage line\n\
                       Z1_2 ON 250000\n\
                       Sky_3 ONX 1\n\
                       sky_4 ON 7\n";

    #[test]
    fn scanner_yields_matches_in_text_order() {
        let scanner = FieldPatternScanner::new(&["Sky", "Z1"], PowerEventCategory::On).unwrap();
        let ids: Vec<MoteId> = scanner.scan(LOG).map(|m| m.mote_id).collect();
        assert_eq!(ids, vec![1, 2, 4]);
    }

    #[test]
    fn scanner_is_restartable() {
        let scanner = FieldPatternScanner::new(&["Sky", "Z1"], PowerEventCategory::On).unwrap();
        let first: Vec<FieldMatch> = scanner.scan(LOG).collect();
        let second: Vec<FieldMatch> = scanner.scan(LOG).collect();
        assert_eq!(first, second);
        assert!(first.windows(2).all(|pair| pair[0].offset < pair[1].offset));
    }

    #[test]
    fn category_tag_is_case_sensitive() {
        let scanner = FieldPatternScanner::new(&["Sky"], PowerEventCategory::Tx).unwrap();
        assert_eq!(scanner.scan("Sky_1 tx 10\nSky_1 TX 20\n").count(), 1);
    }

    #[test]
    fn platform_outside_the_set_is_skipped() {
        let scanner = FieldPatternScanner::new(&["Z1"], PowerEventCategory::Monitored).unwrap();
        assert_eq!(scanner.scan(LOG).count(), 0);
    }

    #[test]
    fn time_converts_to_seconds() {
        let scanner = FieldPatternScanner::new(&["Mote"], PowerEventCategory::Interrupt).unwrap();
        let found: Vec<FieldMatch> = scanner.scan("MOTE_1 INT 50000\r\n").collect();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].seconds(), 0.05);
    }

    #[test]
    fn overflowing_numbers_are_skipped() {
        let scanner = FieldPatternScanner::new(&["Sky"], PowerEventCategory::Rx).unwrap();
        let text = "Sky_99999999999 RX 1\nSky_1 RX 99999999999999999999999\nSky_2 RX 3\n";
        let ids: Vec<MoteId> = scanner.scan(text).map(|m| m.mote_id).collect();
        assert_eq!(ids, vec![2]);
    }

    #[test]
    fn empty_platform_set_is_rejected() {
        let empty: [&str; 0] = [];
        assert!(matches!(
            FieldPatternScanner::new(&empty, PowerEventCategory::On),
            Err(CoreError::NoPlatforms)
        ));
    }
}
