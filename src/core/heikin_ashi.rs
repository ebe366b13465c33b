use tracing::debug;

use crate::core::series::{OhlcBar, OhlcSeries, TimeSeries};
use crate::error::ChartResult;

/// Smoothed candles derived from a source series.
///
/// - close = (open + high + low + close) / 4
/// - open = (previous HA open + previous HA close) / 2, or (open + close) / 2
///   for the first bar
/// - high/low extend the source extremes to cover the HA open and close
pub fn heikin_ashi(source: &OhlcSeries) -> ChartResult<OhlcSeries> {
    let mut out = OhlcSeries::with_capacity(format!("{}_ha", source.id()), source.len());
    let mut previous: Option<(f32, f32)> = None;
    for index in 0..source.len() {
        let bar = ha_bar(source, index, previous);
        previous = Some((bar.open, bar.close));
        out.append(bar)?;
    }
    Ok(out)
}

/// Brings `ha` up to date with `source` starting at `from_index`.
///
/// When the source bar at `from_index` has the same timestamp as the last HA
/// bar (a live candle being updated), that HA bar is recomputed in place from
/// its predecessor; later source bars are appended.
pub fn update_heikin_ashi(
    ha: &mut OhlcSeries,
    source: &OhlcSeries,
    from_index: usize,
) -> ChartResult<()> {
    if from_index >= source.len() {
        return Ok(());
    }

    let mut index = from_index;
    let mut previous = ha.last().map(|bar| (bar.open, bar.close));

    if let Some(last) = ha.last() {
        if source.timestamp(index)? == last.time {
            let before_last = ha
                .len()
                .checked_sub(2)
                .map(|i| ha.get(i))
                .transpose()?
                .map(|bar| (bar.open, bar.close));
            let bar = ha_bar(source, index, before_last);
            ha.update_last(bar)?;
            previous = Some((bar.open, bar.close));
            index += 1;
        }
    }

    let appended = source.len() - index;
    for i in index..source.len() {
        let bar = ha_bar(source, i, previous);
        previous = Some((bar.open, bar.close));
        ha.append(bar)?;
    }
    debug!(series = %ha.id(), from_index, appended, "update heikin-ashi");
    Ok(())
}

fn ha_bar(source: &OhlcSeries, i: usize, previous: Option<(f32, f32)>) -> OhlcBar {
    let (o, h, l, c) = (
        source.open()[i],
        source.high()[i],
        source.low()[i],
        source.close()[i],
    );
    let close = (o + h + l + c) / 4.0;
    let open = match previous {
        Some((prev_open, prev_close)) => (prev_open + prev_close) / 2.0,
        None => (o + c) / 2.0,
    };
    OhlcBar {
        time: source.timestamps()[i],
        open,
        high: h.max(open).max(close),
        low: l.min(open).min(close),
        close,
        volume: source.volume()[i],
    }
}
