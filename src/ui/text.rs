use crate::core::clock::Clock;
use crate::core::models::{weekday_label, Route};
use crate::core::state::DashboardSnapshot;
use crate::history::WeeklyChart;
use crate::ui::colors::{self, RESET};
use crate::ui::Renderer;
use chrono::{Datelike, NaiveDateTime};
use std::io::{self, IsTerminal, Write};
use std::sync::Arc;

const PROGRESS_WIDTH: usize = 30;
const CLEAR_SCREEN: &str = "\x1b[2J\x1b[H";

/// Renders the dashboard as a plain text frame, redrawn in place when the
/// output is a terminal.
pub struct TextRenderer<W: Write> {
    out: W,
    route: Route,
    clock: Arc<dyn Clock>,
    ansi: bool,
}

impl TextRenderer<io::Stdout> {
    pub fn stdout(route: Route, clock: Arc<dyn Clock>) -> Self {
        let ansi = io::stdout().is_terminal();
        Self::new(io::stdout(), route, clock, ansi)
    }
}

impl<W: Write> TextRenderer<W> {
    pub fn new(out: W, route: Route, clock: Arc<dyn Clock>, ansi: bool) -> Self {
        Self {
            out,
            route,
            clock,
            ansi,
        }
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        self.out
    }

    fn compose(&self, snapshot: &DashboardSnapshot, now: NaiveDateTime) -> Vec<String> {
        let mut lines = Vec::new();

        lines.push(format!(
            "{}  {} {:>3}%",
            now.format("%H:%M"),
            self.progress_bar(snapshot.progress()),
            (snapshot.progress() * 100.0).round() as u32
        ));

        let duration = format!("Duration in traffic: {}", snapshot.duration_text);
        lines.push(self.paint(&duration, colors::tier_rgb(snapshot.color_tier())));
        lines.push(format!("Distance: {}", snapshot.distance_text));
        lines.push(format!("From: {}", self.route.origin));
        lines.push(format!("To: {}", self.route.destination));

        let status = if snapshot.in_flight {
            "Updating travel time...".to_string()
        } else {
            match snapshot.last_update {
                Some(at) => format!("Last update: {}", at.format("%H:%M:%S")),
                None => "Last update: never".to_string(),
            }
        };
        lines.push(status);
        lines.push(format!(
            "Next update in: {}s",
            snapshot.seconds_until_next_fetch
        ));

        lines.push(String::new());
        lines.push("Weekly travel time".to_string());
        lines.extend(chart_lines(&snapshot.chart));
        lines.push(format!(
            "Now: {} {}",
            weekday_label(now.weekday()),
            now.format("%H:%M")
        ));

        lines
    }

    fn progress_bar(&self, progress: f64) -> String {
        let filled = ((progress.clamp(0.0, 1.0) * PROGRESS_WIDTH as f64).round() as usize)
            .min(PROGRESS_WIDTH);
        let empty = PROGRESS_WIDTH - filled;

        if self.ansi {
            format!(
                "{}{}{}{}{}",
                colors::ansi_fg(colors::OK_RGB),
                "█".repeat(filled),
                colors::ansi_fg(colors::muted_rgb(colors::OK_RGB)),
                "░".repeat(empty),
                RESET
            )
        } else {
            format!("[{}{}]", "#".repeat(filled), "-".repeat(empty))
        }
    }

    fn paint(&self, text: &str, color: (u8, u8, u8)) -> String {
        if self.ansi {
            format!("{}{text}{RESET}", colors::ansi_fg(color))
        } else {
            text.to_string()
        }
    }
}

impl<W: Write> Renderer for TextRenderer<W> {
    fn render(&mut self, snapshot: &DashboardSnapshot) -> io::Result<()> {
        let lines = self.compose(snapshot, self.clock.now());

        if self.ansi {
            write!(self.out, "{CLEAR_SCREEN}")?;
        }
        for line in lines {
            writeln!(self.out, "{line}")?;
        }
        self.out.flush()
    }
}

/// One summary line per working day, followed by the busiest moment.
pub fn chart_lines(chart: &WeeklyChart) -> Vec<String> {
    let mut lines: Vec<String> = chart
        .days
        .iter()
        .map(|day| {
            let label = weekday_label(day.weekday);
            match day.peak() {
                Some(peak) => format!(
                    "{label}  {:>3} samples  peak {} min at {}",
                    day.points.len(),
                    peak.minutes,
                    format_hour(peak.hour)
                ),
                None => format!("{label}  no samples"),
            }
        })
        .collect();

    lines.push(match chart.peak {
        Some(peak) => format!(
            "Busiest: {} {} ({} min)",
            weekday_label(peak.weekday),
            format_hour(peak.hour),
            peak.minutes
        ),
        None => "Busiest: n/a".to_string(),
    });

    lines
}

/// Formats a fractional hour (17.75) as clock time ("17:45").
pub fn format_hour(hour: f64) -> String {
    let total_minutes = (hour * 60.0).round().max(0.0) as u64;
    format!("{:02}:{:02}", total_minutes / 60, total_minutes % 60)
}
