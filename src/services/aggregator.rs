use crate::models::Candle;
use chrono::Datelike;
use std::collections::BTreeMap;
use tracing::debug;

/// Service for rolling fine-grained candles up into coarser ones.
/// Pure and stateless; input is expected pre-sorted ascending by bucket key.
pub struct Aggregator;

impl Aggregator {
    /// Aggregate consecutive fixed-size chunks (e.g. six 5-minute candles
    /// into one 30-minute candle).
    ///
    /// The last chunk may be shorter than `group_size`; it is still emitted.
    /// Each output candle takes its bucket key from the first candle of its
    /// chunk. An empty input yields an empty output.
    pub fn aggregate_by_count(candles: Vec<Candle>, group_size: usize) -> Vec<Candle> {
        if candles.is_empty() || group_size == 0 {
            return candles;
        }

        debug!(
            input = candles.len(),
            group_size, "Aggregating candles by fixed count"
        );

        candles
            .chunks(group_size)
            .map(Self::combine_chunk)
            .collect()
    }

    /// Calendar aggregation: group daily candles by ISO year + ISO week
    /// number and combine each group with the usual OHLCV rule.
    ///
    /// Output is ordered by the earliest date in each group. Weeks with no
    /// trading days produce no group.
    pub fn aggregate_by_iso_week(candles: Vec<Candle>) -> Vec<Candle> {
        if candles.is_empty() {
            return candles;
        }

        debug!(input = candles.len(), "Aggregating candles by ISO week");

        let mut weeks: BTreeMap<(i32, u32), Vec<Candle>> = BTreeMap::new();
        for candle in candles {
            let Some(date) = candle.date() else {
                debug!(bucket_key = %candle.bucket_key, "Skipping candle with unparseable bucket key");
                continue;
            };
            let iso = date.iso_week();
            weeks
                .entry((iso.year(), iso.week()))
                .or_default()
                .push(candle);
        }

        // (iso_year, iso_week) keys order chronologically, and each group
        // keeps the ascending order of its members, so the earliest date of
        // each group leads.
        weeks
            .into_values()
            .map(|group| Self::combine_chunk(&group))
            .collect()
    }

    /// Combine one non-empty group: open of first, close of last, max high,
    /// min low, summed volume, bucket key of first.
    fn combine_chunk(chunk: &[Candle]) -> Candle {
        let first = &chunk[0];
        let last = &chunk[chunk.len() - 1];

        Candle {
            symbol: first.symbol.clone(),
            bucket_key: first.bucket_key.clone(),
            open: first.open,
            high: chunk.iter().map(|c| c.high).fold(f64::NEG_INFINITY, f64::max),
            low: chunk.iter().map(|c| c.low).fold(f64::INFINITY, f64::min),
            close: last.close,
            volume: chunk.iter().map(|c| c.volume).sum(),
        }
    }
}
