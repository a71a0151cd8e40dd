use crate::core::clock::SystemClock;
use crate::core::models::{weekday_label, CHART_DAYS};
use crate::core::settings::Settings;
use crate::history::{self, SampleStore, WeeklyChart};
use crate::ui::{chart_lines, format_hour};
use anyhow::Result;
use chrono::Weekday;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Serialize)]
struct HistoryOutput {
    log: PathBuf,
    samples: usize,
    retention_days: u32,
    chart: WeeklyChart,
}

pub fn run(json: bool) -> Result<()> {
    let settings = Settings::load()?;
    settings.validate()?;

    let store = SampleStore::new(
        settings.log_path()?,
        settings.retention(),
        Arc::new(SystemClock),
    );
    let samples = history::load_or_empty(&store);

    let output = HistoryOutput {
        log: store.path().to_path_buf(),
        samples: samples.len(),
        retention_days: settings.history.retention_days,
        chart: history::rebuild(&samples),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print_text_output(&output);
    }

    Ok(())
}

fn print_text_output(output: &HistoryOutput) {
    println!(
        "Travel history: {} samples from the last {} days ({})",
        output.samples,
        output.retention_days,
        output.log.display()
    );
    for line in chart_lines(&output.chart) {
        println!("  {}", line);
    }

    if output.chart.is_empty() {
        return;
    }

    println!();
    for day in CHART_DAYS {
        if output.chart.series(day).is_empty() {
            continue;
        }
        println!("  {}: {}", weekday_label(day), series_line(&output.chart, day));
    }
}

/// Time slots of one day with every duration seen there, e.g. "17:45 52/48m".
fn series_line(chart: &WeeklyChart, day: Weekday) -> String {
    let mut hours: Vec<f64> = chart.series(day).iter().map(|p| p.hour).collect();
    hours.dedup();

    hours
        .into_iter()
        .map(|hour| {
            let minutes: Vec<String> = chart
                .bucket(day, hour)
                .iter()
                .map(u32::to_string)
                .collect();
            format!("{} {}m", format_hour(hour), minutes.join("/"))
        })
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::clock::testing::datetime;
    use crate::core::models::Sample;

    fn sample(d: u32, h: u32, m: u32, minutes: u32) -> Sample {
        Sample {
            timestamp: datetime(2024, 6, d, h, m, 0),
            duration_minutes: minutes,
        }
    }

    #[test]
    fn test_series_line_groups_time_slots() {
        // 2024-06-05 and 2024-06-12 are Wednesdays
        let chart = history::rebuild(&[
            sample(5, 17, 45, 52),
            sample(5, 9, 0, 25),
            sample(12, 17, 45, 48),
        ]);

        assert_eq!(series_line(&chart, Weekday::Wed), "09:00 25m, 17:45 52/48m");
        assert_eq!(series_line(&chart, Weekday::Mon), "");
    }
}
