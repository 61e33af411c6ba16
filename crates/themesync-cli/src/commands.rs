//! Command implementations, kept free of process concerns for testing.

use std::thread;
use std::time::Duration;

use console::style;
use themesync::system::SchemePoller;
use themesync::{Theme, ThemeCoordinator, ThemeSnapshot};

/// The state as initialized.
pub fn show(coordinator: &ThemeCoordinator) -> ThemeSnapshot {
    coordinator.snapshot()
}

/// Applies an explicit choice.
pub fn set(coordinator: &ThemeCoordinator, theme: Theme) -> ThemeSnapshot {
    coordinator.set(theme);
    coordinator.snapshot()
}

/// Switches to the other theme, like the page's theme button.
pub fn toggle(coordinator: &ThemeCoordinator) -> ThemeSnapshot {
    coordinator.set(coordinator.get().opposite());
    coordinator.snapshot()
}

/// Drops any override by choosing the OS value, which reconciliation turns
/// into "follow the OS".
pub fn reset(coordinator: &ThemeCoordinator) -> ThemeSnapshot {
    let os = coordinator
        .snapshot()
        .os_preference
        .unwrap_or(coordinator.config().default_theme);
    coordinator.set(os);
    coordinator.snapshot()
}

/// Polls the OS preference every `interval`, feeding changes to the
/// coordinator and reporting each new effective theme. Runs forever unless
/// `iterations` is given.
pub fn watch(
    coordinator: &ThemeCoordinator,
    interval: Duration,
    iterations: Option<usize>,
    mut report: impl FnMut(Theme),
) {
    let mut poller = SchemePoller::starting_at(
        coordinator
            .snapshot()
            .os_preference
            .unwrap_or(coordinator.config().default_theme),
    );
    let mut last = coordinator.get();
    let mut round = 0usize;
    while iterations.map_or(true, |limit| round < limit) {
        if round > 0 {
            thread::sleep(interval);
        }
        round += 1;
        if let Some(os) = poller.poll() {
            tracing::debug!(%os, "OS preference changed");
            coordinator.on_os_preference_change(os);
        }
        let current = coordinator.get();
        if current != last {
            report(current);
            last = current;
        }
    }
}

/// The `watch` command: prints the state once, then one line per change.
pub fn follow(
    coordinator: &ThemeCoordinator,
    interval: Duration,
    iterations: Option<usize>,
    json: bool,
    mut emit: impl FnMut(String),
) -> anyhow::Result<()> {
    emit(render(&coordinator.snapshot(), json)?);
    watch(coordinator, interval, iterations, |theme| emit(render_change(theme)));
    Ok(())
}

/// Renders a snapshot for the terminal, or as JSON.
pub fn render(snapshot: &ThemeSnapshot, json: bool) -> anyhow::Result<String> {
    if json {
        return Ok(serde_json::to_string_pretty(snapshot)?);
    }

    let theme = match snapshot.effective {
        Theme::Dark => style(snapshot.effective.as_str()).magenta().bold(),
        Theme::Light => style(snapshot.effective.as_str()).yellow().bold(),
    };
    let source = match (snapshot.override_theme, snapshot.os_preference) {
        (Some(_), Some(os)) => format!("manual override (OS prefers {os})"),
        (Some(_), None) => "manual override".to_string(),
        (None, Some(_)) => "following the OS".to_string(),
        (None, None) => "default".to_string(),
    };
    Ok(format!("Current theme: {theme}\n{}", style(source).dim()))
}

/// One-line notice for `watch`.
pub fn render_change(theme: Theme) -> String {
    format!("Theme changed: {}", style(theme.as_str()).bold())
}
