use chrono::{Local, NaiveDate};
use clap::Args;
use pomotask_core::{Database, Stats};
use serde::Serialize;

use crate::render::format_duration;

const BAR_WIDTH: u64 = 30;

#[derive(Args)]
pub struct StatsArgs {
    /// Number of days to chart, ending today
    #[arg(long, default_value_t = 7, value_parser = clap::value_parser!(u32).range(1..=366))]
    days: u32,
    /// Print JSON instead of text
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct DayTotal {
    date: NaiveDate,
    seconds: u64,
}

#[derive(Serialize)]
struct Report {
    #[serde(flatten)]
    summary: Stats,
    days: Vec<DayTotal>,
}

fn bar(seconds: u64, max: u64) -> String {
    if max == 0 {
        return String::new();
    }
    let len = (seconds * BAR_WIDTH).div_ceil(max);
    "#".repeat(len as usize)
}

fn print_text(report: &Report) {
    let s = &report.summary;
    println!(
        "Today: {}   Total: {}   Pomodoros: {}   Active days: {}   Streak: {} day(s)",
        format_duration(s.today_secs),
        format_duration(s.total_secs),
        s.total_pomodoros,
        s.days_active,
        s.current_streak_days,
    );
    println!();
    let max = report.days.iter().map(|d| d.seconds).max().unwrap_or(0);
    for day in &report.days {
        println!(
            "{}  {:<width$}  {}",
            day.date.format("%a %Y-%m-%d"),
            bar(day.seconds, max),
            format_duration(day.seconds),
            width = BAR_WIDTH as usize,
        );
    }
}

pub fn run(args: StatsArgs) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;
    let today = Local::now().date_naive();

    let report = Report {
        summary: db.stats(today)?,
        days: db
            .daily_totals(today, args.days)?
            .into_iter()
            .map(|(date, seconds)| DayTotal { date, seconds })
            .collect(),
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_text(&report);
    }
    Ok(())
}
