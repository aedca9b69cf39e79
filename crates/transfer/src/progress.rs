use std::io::Write;
use std::time::Instant;

use tokio::sync::mpsc;

const UNITS: [&str; 7] = ["B", "KiB", "MiB", "GiB", "TiB", "PiB", "EiB"];

/// Formats a byte count with base-1024 units.
///
/// Values under 10 bytes print as integers; otherwise the value is rounded
/// to one decimal and the decimal is only shown below 10 units.
pub fn humanize(value: u64) -> String {
    if value < 10 {
        return format!("{value} {}", UNITS[0]);
    }

    let mut exp = 0u32;
    while exp < 6 && value >= 1024u64.pow(exp + 1) {
        exp += 1;
    }

    let scaled = value as f64 / 1024f64.powi(exp as i32);
    let rounded = (scaled * 10.0 + 0.5).floor() / 10.0;
    if rounded < 10.0 {
        format!("{rounded:.1} {}", UNITS[exp as usize])
    } else {
        format!("{rounded:.0} {}", UNITS[exp as usize])
    }
}

// ---------------------------------------------------------------------------
// ProgressState
// ---------------------------------------------------------------------------

/// Running byte totals fed by signed deltas.
///
/// Positive deltas grow the estimated total, negative deltas count as completed.
#[derive(Debug, Clone)]
pub struct ProgressState {
    total: u64,
    done: u64,
    started: Instant,
}

impl ProgressState {
    pub fn new(started: Instant) -> Self {
        Self {
            total: 0,
            done: 0,
            started,
        }
    }

    pub fn apply(&mut self, delta: i64) {
        if delta > 0 {
            self.total += delta.unsigned_abs();
        } else {
            self.done += delta.unsigned_abs();
        }
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn done(&self) -> u64 {
        self.done
    }

    /// Renders the status line as of `now`. `None` until any work was announced.
    pub fn status(&self, now: Instant) -> Option<String> {
        if self.total == 0 {
            return None;
        }

        let percent = 100.0 * self.done as f64 / self.total as f64;
        let elapsed = now.duration_since(self.started).as_secs_f64();
        let rate = if elapsed > 0.0 {
            (self.done as f64 / elapsed) as u64
        } else {
            0
        };

        Some(format!(
            "{} / {} ({percent:.1}%)   {}/sec",
            humanize(self.done),
            humanize(self.total),
            humanize(rate)
        ))
    }
}

// ---------------------------------------------------------------------------
// ProgressAggregator
// ---------------------------------------------------------------------------

/// Single consumer of progress deltas that repaints one terminal line in place.
pub struct ProgressAggregator<W: Write> {
    out: W,
    state: ProgressState,
    last: String,
}

impl<W: Write> ProgressAggregator<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            state: ProgressState::new(Instant::now()),
            last: String::new(),
        }
    }

    /// Applies one delta and repaints if the rendered line changed.
    pub fn update(&mut self, delta: i64) -> std::io::Result<()> {
        self.state.apply(delta);

        let Some(line) = self.state.status(Instant::now()) else {
            return Ok(());
        };
        if line == self.last {
            return Ok(());
        }

        self.repaint(&line)?;
        self.last = line;
        Ok(())
    }

    fn repaint(&mut self, line: &str) -> std::io::Result<()> {
        let erase = self.last.len();
        let pad = erase.saturating_sub(line.len());

        let mut buf = Vec::with_capacity(erase + line.len() + 2 * pad);
        buf.extend(std::iter::repeat_n(b'\x08', erase));
        buf.extend_from_slice(line.as_bytes());
        buf.extend(std::iter::repeat_n(b' ', pad));
        buf.extend(std::iter::repeat_n(b'\x08', pad));

        self.out.write_all(&buf)?;
        self.out.flush()
    }

    /// Drains `updates` until every sender is dropped, then ends the line.
    ///
    /// Blocks the calling thread on each receive and write, so run it on a
    /// blocking thread (`tokio::task::spawn_blocking`), never on a runtime
    /// worker. Returns the writer so callers can inspect or reuse it.
    pub fn run(mut self, mut updates: mpsc::Receiver<i64>) -> std::io::Result<W> {
        while let Some(delta) = updates.blocking_recv() {
            if let Err(e) = self.update(delta) {
                tracing::debug!(error = %e, "progress repaint failed");
            }
        }
        self.finish()
    }

    /// Writes the trailing newline and hands back the writer.
    pub fn finish(mut self) -> std::io::Result<W> {
        self.out.write_all(b"\n")?;
        self.out.flush()?;
        Ok(self.out)
    }

    pub fn state(&self) -> &ProgressState {
        &self.state
    }

    /// Last line painted (empty if nothing was rendered yet).
    pub fn last_status(&self) -> &str {
        &self.last
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn humanize_small_values_are_integers() {
        assert_eq!(humanize(0), "0 B");
        assert_eq!(humanize(9), "9 B");
        assert_eq!(humanize(10), "10 B");
        assert_eq!(humanize(100), "100 B");
        assert_eq!(humanize(1023), "1023 B");
    }

    #[test]
    fn humanize_scales_by_1024() {
        assert_eq!(humanize(1024), "1.0 KiB");
        assert_eq!(humanize(1536), "1.5 KiB");
        assert_eq!(humanize(10 * 1024), "10 KiB");
        assert_eq!(humanize(1024 * 1024), "1.0 MiB");
        assert_eq!(humanize(5 * 1024 * 1024 * 1024), "5.0 GiB");
        assert_eq!(humanize(u64::MAX), "16 EiB");
    }

    #[test]
    fn state_splits_positive_and_negative_deltas() {
        let mut state = ProgressState::new(Instant::now());
        state.apply(100);
        state.apply(-40);
        assert_eq!(state.total(), 100);
        assert_eq!(state.done(), 40);
    }

    #[test]
    fn state_without_total_renders_nothing() {
        let mut state = ProgressState::new(Instant::now());
        state.apply(-5);
        assert!(state.status(Instant::now()).is_none());
    }

    #[test]
    fn state_reports_rate_from_elapsed_time() {
        let start = Instant::now();
        let mut state = ProgressState::new(start);
        state.apply(4096);
        state.apply(-2048);
        let line = state.status(start + Duration::from_secs(2)).unwrap();
        assert_eq!(line, "2.0 KiB / 4.0 KiB (50.0%)   1.0 KiB/sec");
    }

    #[test]
    fn aggregator_reaches_full_completion() {
        let mut agg = ProgressAggregator::new(Vec::new());
        for delta in [100, -40, -60] {
            agg.update(delta).unwrap();
        }
        assert!(agg.last_status().starts_with("100 B / 100 B (100.0%)"));

        let out = agg.finish().unwrap();
        assert!(out.ends_with(b"\n"));
    }

    #[test]
    fn aggregator_erases_previous_line() {
        let mut agg = ProgressAggregator::new(Vec::new());
        agg.update(100).unwrap();
        let first_len = agg.last_status().len();
        agg.update(-50).unwrap();

        let out = agg.finish().unwrap();
        let backspaces = out.iter().filter(|&&b| b == b'\x08').count();
        assert!(backspaces >= first_len);
    }

    #[test]
    fn aggregator_skips_identical_lines() {
        let mut agg = ProgressAggregator::new(Vec::new());
        agg.update(100).unwrap();
        let painted = agg.out.len();
        // A zero delta counts as completed-with-nothing and renders the same line.
        agg.update(0).unwrap();
        assert_eq!(agg.out.len(), painted);
    }

    #[tokio::test]
    async fn run_drains_until_closed() {
        let (tx, rx) = mpsc::channel(8);
        let handle =
            tokio::task::spawn_blocking(move || ProgressAggregator::new(Vec::new()).run(rx));

        for delta in [100, -40, -60] {
            tx.send(delta).await.unwrap();
        }
        drop(tx);

        let out = handle.await.unwrap().unwrap();
        let text = String::from_utf8_lossy(&out);
        assert!(text.contains("100 B / 100 B (100.0%)"));
        assert!(text.ends_with('\n'));
    }
}
