use std::fs;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use chrono::TimeDelta;
use surge_core::runner::{Mode, ModeConfig, ModeKind, RunOptions, ScheduleWindow, Scheduler};
use surge_core::{Case, CaseList, FnCase};

fn quiet() -> RunOptions {
    RunOptions {
        no_report: true,
        ..RunOptions::default()
    }
}

fn counting(id: &str, hits: &Arc<AtomicUsize>, pause: Duration) -> Box<dyn Case> {
    let hits = hits.clone();
    FnCase::new(id, move |_| {
        hits.fetch_add(1, Ordering::SeqCst);
        std::thread::sleep(pause);
        Ok(())
    })
    .boxed()
}

/// Tracks how many passes are inside the case body at once.
#[derive(Default)]
struct Gauge {
    current: AtomicUsize,
    peak: AtomicUsize,
}

impl Gauge {
    fn case(self: &Arc<Self>, id: &str, pause: Duration) -> Box<dyn Case> {
        let gauge = self.clone();
        FnCase::new(id, move |_| {
            let now = gauge.current.fetch_add(1, Ordering::SeqCst) + 1;
            gauge.peak.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(pause);
            gauge.current.fetch_sub(1, Ordering::SeqCst);
            Ok(())
        })
        .boxed()
    }
}

fn local_now() -> chrono::NaiveDateTime {
    chrono::Local::now().naive_local()
}

#[tokio::test]
async fn continuous_runs_each_round_in_order() -> anyhow::Result<()> {
    let hits = Arc::new(AtomicUsize::new(0));
    let cases: CaseList = vec![
        counting("a", &hits, Duration::ZERO),
        counting("b", &hits, Duration::ZERO),
    ]
    .into();
    let mode = ModeConfig {
        kind: ModeKind::Continuous,
        repeat_times: 3,
        interval: Duration::from_millis(20),
        ..ModeConfig::default()
    }
    .into_mode()?;

    let report = Scheduler::new(cases, mode).with_options(quiet()).run().await?;

    assert_eq!(hits.load(Ordering::SeqCst), 6);
    assert_eq!(report.counters.started, 3);
    assert_eq!(report.counters.completed, 3);
    assert_eq!(report.counters.recorded, 6);
    assert!(report.outcomes.is_empty());
    Ok(())
}

#[tokio::test]
async fn simultaneous_writes_every_case_of_every_pass() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let cases: CaseList = vec![
        FnCase::new("A", |_| Ok(())).boxed(),
        FnCase::new("B", |_| Ok(())).boxed(),
    ]
    .into();
    let mode = Mode::Simultaneous {
        thread_count: 2,
        repeat_times: 2,
        interval: Duration::from_millis(10),
    };
    let options = RunOptions {
        report_folder: dir.path().to_path_buf(),
        ..RunOptions::default()
    };

    let report = Scheduler::new(cases, mode)
        .with_options(options)
        .run()
        .await?;

    assert_eq!(report.counters.started, 4);
    assert_eq!(report.counters.completed, 4);

    let path = match report.report_path {
        Some(p) => p,
        None => panic!("expected a local report file"),
    };
    let content = fs::read_to_string(&path)?;
    let rows: Vec<&str> = content.lines().skip(1).collect();
    assert_eq!(rows.len(), 8);
    assert_eq!(rows.iter().filter(|r| r.starts_with("\"0\",")).count(), 4);
    assert_eq!(rows.iter().filter(|r| r.starts_with("\"1\",")).count(), 4);
    assert!(rows.iter().all(|r| r.contains("\"Pass\"")));
    Ok(())
}

#[tokio::test]
async fn frequent_never_exceeds_max_thread_count() -> anyhow::Result<()> {
    let gauge = Arc::new(Gauge::default());
    let cases: CaseList = vec![gauge.case("slow", Duration::from_millis(1500))].into();
    let mode = ModeConfig {
        kind: ModeKind::Frequent,
        thread_count: 3,
        max_thread_count: 2,
        repeat_times: 3,
        interval: Duration::from_secs(1),
        ..ModeConfig::default()
    }
    .into_mode()?;

    let report = Scheduler::new(cases, mode).with_options(quiet()).run().await?;

    assert!(gauge.peak.load(Ordering::SeqCst) <= 2);
    assert_eq!(gauge.current.load(Ordering::SeqCst), 0);
    assert!(report.counters.started >= 2);
    assert_eq!(report.counters.started, report.counters.completed);
    assert_eq!(report.counters.recorded, report.counters.started);
    Ok(())
}

#[tokio::test]
async fn concurrency_stops_on_cancel_and_drains() -> anyhow::Result<()> {
    let hits = Arc::new(AtomicUsize::new(0));
    let cases: CaseList = vec![counting("loop", &hits, Duration::from_millis(5))].into();
    let scheduler = Scheduler::new(
        cases,
        Mode::Concurrency {
            thread_count: 2,
            interval: Duration::from_millis(10),
        },
    )
    .with_options(quiet());

    let cancel = scheduler.cancel_signal();
    let canceller = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        cancel.cancel();
    });

    let report = tokio::time::timeout(Duration::from_secs(10), scheduler.run()).await??;
    canceller.await?;

    assert!(report.cancelled);
    assert!(report.counters.started >= 2);
    assert_eq!(report.counters.started, report.counters.completed);
    assert_eq!(
        report.counters.recorded as usize,
        hits.load(Ordering::SeqCst)
    );
    Ok(())
}

#[tokio::test]
async fn end_time_stops_concurrency() -> anyhow::Result<()> {
    let hits = Arc::new(AtomicUsize::new(0));
    let cases: CaseList = vec![counting("loop", &hits, Duration::from_millis(5))].into();
    let window = ScheduleWindow::with_duration(None, Duration::from_millis(300));

    let started = Instant::now();
    let report = Scheduler::new(
        cases,
        Mode::Concurrency {
            thread_count: 3,
            interval: Duration::ZERO,
        },
    )
    .with_window(window)
    .with_options(quiet())
    .run()
    .await?;

    assert!(started.elapsed() < Duration::from_secs(10));
    assert!(report.cancelled);
    assert!(hits.load(Ordering::SeqCst) > 0);
    assert_eq!(report.counters.started, report.counters.completed);
    Ok(())
}

#[tokio::test]
async fn end_before_start_runs_nothing() -> anyhow::Result<()> {
    let hits = Arc::new(AtomicUsize::new(0));
    let cases: CaseList = vec![counting("never", &hits, Duration::ZERO)].into();
    let now = local_now();
    let window = ScheduleWindow {
        starts_time: Some(now + TimeDelta::milliseconds(300)),
        ends_time: Some(now + TimeDelta::milliseconds(100)),
    };

    let report = Scheduler::new(cases, Mode::Normal)
        .with_window(window)
        .with_options(quiet())
        .run()
        .await?;

    assert_eq!(hits.load(Ordering::SeqCst), 0);
    assert_eq!(report.counters.started, 0);
    assert_eq!(report.counters.recorded, 0);
    assert!(report.cancelled);
    Ok(())
}

#[tokio::test]
async fn future_start_delays_the_run() -> anyhow::Result<()> {
    let hits = Arc::new(AtomicUsize::new(0));
    let cases: CaseList = vec![counting("later", &hits, Duration::ZERO)].into();
    let window = ScheduleWindow::new(Some(local_now() + TimeDelta::milliseconds(200)), None)?;

    let started = Instant::now();
    Scheduler::new(cases, Mode::Normal)
        .with_window(window)
        .with_options(quiet())
        .run()
        .await?;

    assert!(started.elapsed() >= Duration::from_millis(150));
    assert_eq!(hits.load(Ordering::SeqCst), 1);
    Ok(())
}
