//! Progress bar driven by the run's event stream.

use std::time::Duration;

use foldpack_events::{Event, EventBus};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use tokio::task::JoinHandle;

const TEMPLATE: &str =
    "[{elapsed_precise}] {bar:40.cyan/blue} {pos:>5}/{len:5} {percent:>3}% {wide_msg}";

/// Background task mirroring run events onto a progress bar.
pub(crate) struct ProgressReporter {
    bar: ProgressBar,
    handle: JoinHandle<()>,
}

impl ProgressReporter {
    /// Bar drawn on stderr.
    pub(crate) fn stderr(events: &EventBus) -> Self {
        let bar = ProgressBar::with_draw_target(Some(0), ProgressDrawTarget::stderr());
        bar.set_style(
            ProgressStyle::with_template(TEMPLATE)
                .map_or_else(|_| ProgressStyle::default_bar(), |style| style.progress_chars("=> ")),
        );
        bar.enable_steady_tick(Duration::from_millis(120));
        Self::attach(events, bar)
    }

    /// Follow `events` from now on, updating `bar`.
    pub(crate) fn attach(events: &EventBus, bar: ProgressBar) -> Self {
        let mut stream = events.subscribe();
        let worker = bar.clone();
        let handle = tokio::spawn(async move {
            while let Some(envelope) = stream.next().await {
                if !apply(&worker, &envelope.event) {
                    break;
                }
            }
        });
        Self { bar, handle }
    }

    /// Wait for the run to finish drawing, or stop right away when no run
    /// took place.
    pub(crate) async fn finish(self, ran: bool) -> ProgressBar {
        if ran {
            let _ = self.handle.await;
        } else {
            self.handle.abort();
            self.bar.finish_and_clear();
        }
        self.bar
    }
}

/// Apply one event; returns `false` once the run has completed.
fn apply(bar: &ProgressBar, event: &Event) -> bool {
    match event {
        Event::RunStarted { total, .. } => {
            bar.set_length(as_u64(*total));
            bar.set_position(0);
        }
        Event::FolderStarted { folder } => bar.set_message(folder.clone()),
        Event::FolderFailed { folder, stage, .. } => {
            bar.println(format!("{folder}: {} failed", stage.as_str()));
        }
        Event::Progress { completed, total } => {
            bar.set_length(as_u64(*total));
            bar.set_position(as_u64(*completed));
        }
        Event::RunCompleted { .. } => {
            bar.finish_with_message("done");
            return false;
        }
        Event::FolderArchived { .. } | Event::FolderRemoved { .. } => {}
    }
    true
}

fn as_u64(value: usize) -> u64 {
    u64::try_from(value).unwrap_or(u64::MAX)
}
