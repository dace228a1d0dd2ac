//! Terminal rendering of round progress.
//!
//! The view consumes `ProgressUpdate`s from the manager and owns all output
//! formatting. Styling is a `ViewStyle` value handed in by the caller.

use std::io::Write;
use std::time::{Duration, Instant};

use mgc_core::control::CancelToken;
use mgc_core::scheduler::{
    CloneReport, ItemOutcome, ProgressSnapshot, ProgressUpdate, RoundSummary, UpdateReport,
};
use tokio::sync::mpsc;

/// Redraw interval for the elapsed-time display.
pub const REFRESH_INTERVAL: Duration = Duration::from_millis(500);

/// Rendering options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewStyle {
    pub bar_width: usize,
    pub filled: char,
    pub empty: char,
    pub ok_mark: &'static str,
    pub fail_mark: &'static str,
    /// Error messages longer than this are truncated.
    pub max_error_width: usize,
    /// Use `\r` plus clear-line to redraw the status in place.
    pub redraw_in_place: bool,
}

impl Default for ViewStyle {
    fn default() -> Self {
        Self {
            bar_width: 50,
            filled: '█',
            empty: '░',
            ok_mark: "✓",
            fail_mark: "✗",
            max_error_width: 80,
            redraw_in_place: true,
        }
    }
}

impl ViewStyle {
    /// Fancy style on a terminal, plain style when stdout is piped.
    pub fn for_stdout() -> Self {
        use std::io::IsTerminal;
        if std::io::stdout().is_terminal() {
            Self::default()
        } else {
            Self::plain()
        }
    }

    /// ASCII only, one status line per redraw.
    pub fn plain() -> Self {
        Self {
            filled: '#',
            empty: '-',
            ok_mark: "ok",
            fail_mark: "FAIL",
            redraw_in_place: false,
            ..Self::default()
        }
    }
}

pub fn render_bar(fraction: f64, style: &ViewStyle) -> String {
    let filled = ((fraction.clamp(0.0, 1.0) * style.bar_width as f64).round() as usize)
        .min(style.bar_width);
    let mut bar = String::with_capacity(style.bar_width * 3);
    bar.extend(std::iter::repeat(style.filled).take(filled));
    bar.extend(std::iter::repeat(style.empty).take(style.bar_width - filled));
    bar
}

/// `1m05s`, `42s`, `1h02m03s`.
pub fn format_elapsed(d: Duration) -> String {
    let secs = d.as_secs();
    let (h, m, s) = (secs / 3600, (secs / 60) % 60, secs % 60);
    if h > 0 {
        format!("{}h{:02}m{:02}s", h, m, s)
    } else if m > 0 {
        format!("{}m{:02}s", m, s)
    } else {
        format!("{}s", s)
    }
}

/// Cut `text` to at most `width` characters, marking the cut with `...`.
pub fn truncate(text: &str, width: usize) -> String {
    let text = text.trim();
    if text.chars().count() <= width {
        return text.to_string();
    }
    let keep = width.saturating_sub(3);
    let mut out: String = text.chars().take(keep).collect();
    out.push_str("...");
    out
}

pub fn render_status(snap: &ProgressSnapshot, elapsed: Duration, style: &ViewStyle) -> String {
    let state = &snap.state;
    format!(
        "[{}] {:5.1}% ({}/{}) {} {}",
        render_bar(state.fraction(), style),
        state.fraction() * 100.0,
        state.finished(),
        state.total,
        format_elapsed(elapsed),
        state.current
    )
}

pub fn render_item(item: &ItemOutcome, style: &ViewStyle) -> String {
    match &item.error {
        None => format!(
            "  {} {} ({:.1}s)",
            style.ok_mark,
            item.name,
            item.duration.as_secs_f64()
        ),
        Some(err) => format!(
            "  {} {}: {}",
            style.fail_mark,
            item.name,
            truncate(err, style.max_error_width)
        ),
    }
}

/// Recent successes, then recent failures.
pub fn render_recent(snap: &ProgressSnapshot, style: &ViewStyle) -> Vec<String> {
    let mut lines = Vec::new();
    if !snap.recent_successes.is_empty() {
        lines.push("Recent successes:".to_string());
        lines.extend(snap.recent_successes.iter().map(|i| render_item(i, style)));
    }
    if !snap.recent_failures.is_empty() {
        lines.push("Recent failures:".to_string());
        lines.extend(snap.recent_failures.iter().map(|i| render_item(i, style)));
    }
    lines
}

pub fn render_summary(summary: &RoundSummary) -> Vec<String> {
    let verb = summary.kind.verb();
    let headline = if summary.cancelled {
        format!("{} stopped (round {})", verb, summary.round)
    } else {
        format!("{} completed (round {})", verb, summary.round)
    };
    let mut lines = vec![
        headline,
        format!("   Total: {} repositories", summary.total),
        format!("   Successful: {}", summary.successful),
        format!("   Failed: {}", summary.failed),
    ];
    if summary.withdrawn > 0 {
        lines.push(format!("   Not started: {}", summary.withdrawn));
    }
    lines.push(format!("   Duration: {}", format_elapsed(summary.elapsed)));
    if summary.successful + summary.failed > 0 {
        lines.push(format!("   Success rate: {:.1}%", summary.success_rate()));
    }
    lines
}

pub fn render_clone_report(report: &CloneReport) -> Vec<String> {
    let mut lines = vec![format!(
        "{} of {} repositories cloned into {} ({} round{})",
        report.successful(),
        report.selected,
        report.target_dir.display(),
        report.rounds.len(),
        if report.rounds.len() == 1 { "" } else { "s" }
    )];
    if !report.still_failed.is_empty() {
        let names: Vec<&str> = report.still_failed.iter().map(|r| r.name.as_str()).collect();
        lines.push(format!("Still missing: {}", names.join(", ")));
    }
    if report.cancelled {
        lines.push("Stopped early by user request.".to_string());
    }
    lines
}

pub fn render_update_report(report: &UpdateReport) -> Vec<String> {
    let summary = &report.round.summary;
    let mut lines = vec![format!(
        "{} of {} repositories updated in {}",
        summary.successful,
        summary.total,
        report.target_dir.display()
    )];
    if !report.skipped.is_empty() {
        let names: Vec<&str> = report.skipped.iter().map(|r| r.name.as_str()).collect();
        lines.push(format!("Not cloned locally (skipped): {}", names.join(", ")));
    }
    lines
}

/// Consumes progress updates and writes them to `out`.
pub struct ProgressView<W> {
    out: W,
    style: ViewStyle,
    last: Option<(ProgressSnapshot, Instant)>,
    refreshing: bool,
    summaries: Vec<RoundSummary>,
}

impl ProgressView<std::io::Stdout> {
    pub fn stdout(style: ViewStyle) -> Self {
        Self::new(std::io::stdout(), style)
    }
}

impl<W: Write> ProgressView<W> {
    pub fn new(out: W, style: ViewStyle) -> Self {
        Self {
            out,
            style,
            last: None,
            refreshing: true,
            summaries: Vec::new(),
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    pub fn handle(&mut self, update: ProgressUpdate) -> std::io::Result<()> {
        match update {
            ProgressUpdate::RoundStarted {
                round,
                max_rounds,
                kind,
                total,
            } => {
                writeln!(
                    self.out,
                    "{} {} repositories (round {}/{})",
                    kind.verb(),
                    total,
                    round,
                    max_rounds
                )?;
            }
            ProgressUpdate::Changed(snap) => {
                self.last = Some((snap, Instant::now()));
                self.draw_status()?;
            }
            ProgressUpdate::Item(item) => {
                if item.error.is_some() {
                    self.clear_status()?;
                    writeln!(self.out, "{}", render_item(&item, &self.style))?;
                }
            }
            ProgressUpdate::RoundFinished(summary) => {
                self.clear_status()?;
                if let Some((snap, _)) = self.last.take() {
                    for line in render_recent(&snap, &self.style) {
                        writeln!(self.out, "{}", line)?;
                    }
                }
                for line in render_summary(&summary) {
                    writeln!(self.out, "{}", line)?;
                }
                self.summaries.push(summary);
            }
            ProgressUpdate::Retrying {
                next_round,
                remaining,
                delay,
            } => {
                writeln!(
                    self.out,
                    "Retrying {} repositories in round {} after {}",
                    remaining,
                    next_round,
                    format_elapsed(delay)
                )?;
            }
        }
        self.out.flush()
    }

    /// Periodic redraw so the elapsed time keeps moving between updates.
    pub fn tick(&mut self) -> std::io::Result<()> {
        if self.refreshing && self.last.is_some() {
            self.draw_status()?;
            self.out.flush()?;
        }
        Ok(())
    }

    /// Stop periodic redraws (cancellation).
    pub fn stop_refresh(&mut self) -> std::io::Result<()> {
        if self.refreshing {
            self.refreshing = false;
            self.clear_status()?;
            writeln!(
                self.out,
                "Cancelling: no new clones will start; waiting for running ones to finish..."
            )?;
            self.out.flush()?;
        }
        Ok(())
    }

    /// Drive the view until the update stream closes. Returns the round summaries seen.
    pub async fn run(
        mut self,
        mut updates: mpsc::Receiver<ProgressUpdate>,
        cancel: CancelToken,
    ) -> Vec<RoundSummary> {
        let mut ticker = tokio::time::interval(REFRESH_INTERVAL);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            let res = tokio::select! {
                update = updates.recv() => match update {
                    Some(update) => self.handle(update),
                    None => break,
                },
                _ = cancel.cancelled(), if self.refreshing => self.stop_refresh(),
                _ = ticker.tick(), if self.refreshing => self.tick(),
            };
            if let Err(e) = res {
                tracing::debug!("progress output failed: {}", e);
            }
        }
        self.summaries
    }

    fn draw_status(&mut self) -> std::io::Result<()> {
        let Some((snap, at)) = &self.last else {
            return Ok(());
        };
        let elapsed = snap.elapsed + at.elapsed();
        let line = render_status(snap, elapsed, &self.style);
        if self.style.redraw_in_place {
            write!(self.out, "\r\x1b[K{}", line)
        } else {
            writeln!(self.out, "{}", line)
        }
    }

    fn clear_status(&mut self) -> std::io::Result<()> {
        if self.style.redraw_in_place && self.last.is_some() {
            write!(self.out, "\r\x1b[K")?;
        }
        Ok(())
    }
}
