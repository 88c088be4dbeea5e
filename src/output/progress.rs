use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use super::styling::{heading, ok, pending};

/// Progress tracking for the two collection phases
pub struct PhaseProgress {
    pb: ProgressBar,
    visible: bool,
}

impl PhaseProgress {
    pub fn start_phase_1(visible: bool) -> Self {
        if visible {
            eprintln!("⚙️  {}", heading("Phases"));
        }
        let pb = create_spinner(
            pending("Phase 1/2: Fetching projects").to_string(),
            visible,
        );
        Self { pb, visible }
    }

    pub fn finish_phase_1_start_phase_2(self, project_count: usize) -> Self {
        self.pb.finish_with_message(
            ok(format!("Phase 1/2: Fetched {project_count} projects ✓")).to_string(),
        );
        let pb = create_bar(
            project_count as u64,
            pending("Phase 2/2: Collecting deployments").to_string(),
            self.visible,
        );
        Self {
            pb,
            visible: self.visible,
        }
    }

    pub fn project_done(&self) {
        self.pb.inc(1);
    }

    pub fn finish_phase_2(self, saved: usize) {
        self.pb.finish_with_message(
            ok(format!("Phase 2/2: Saved {saved} deployments ✓")).to_string(),
        );
        if self.visible {
            eprintln!();
        }
    }

    pub fn abandon(self) {
        self.pb.abandon();
    }
}

fn draw_target(visible: bool) -> ProgressDrawTarget {
    if visible {
        ProgressDrawTarget::stderr()
    } else {
        ProgressDrawTarget::hidden()
    }
}

fn create_spinner(message: String, visible: bool) -> ProgressBar {
    let pb = ProgressBar::with_draw_target(None, draw_target(visible));
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("  {msg} {spinner}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message);
    if visible {
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
    }
    pb
}

fn create_bar(len: u64, message: String, visible: bool) -> ProgressBar {
    let pb = ProgressBar::with_draw_target(Some(len), draw_target(visible));
    pb.set_style(
        ProgressStyle::default_bar()
            .template("  {msg} [{bar:30}] {pos}/{len}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> "),
    );
    pb.set_message(message);
    pb
}
