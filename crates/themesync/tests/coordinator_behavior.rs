//! End-to-end behavior of the shared coordinator against mock platforms.

use themesync::env::Platform;
use themesync::{
    CoordinatorConfig, MemoryStore, MockColorScheme, RecordingFlag, SharedOrigin, Theme,
    ThemeCoordinator,
};

fn page(os: &MockColorScheme, store: &MemoryStore, flag: &RecordingFlag) -> ThemeCoordinator {
    ThemeCoordinator::new(
        Platform::headless()
            .with_scheme(os.clone())
            .with_store(store.clone())
            .with_flag(flag.clone()),
        CoordinatorConfig::default(),
    )
}

#[test]
fn initializes_with_the_os_theme_when_nothing_is_stored() {
    for os_theme in [Theme::Light, Theme::Dark] {
        let os = MockColorScheme::new(os_theme);
        let store = MemoryStore::new();
        let flag = RecordingFlag::new();
        let coordinator = page(&os, &store, &flag);

        assert_eq!(coordinator.initialize(), os_theme);
        assert_eq!(coordinator.get(), os_theme);
        assert_eq!(flag.is_dark(), Some(os_theme.is_dark()));
        assert_eq!(store.get("theme"), None);
    }
}

#[test]
fn initializes_with_the_stored_theme_if_present() {
    let os = MockColorScheme::new(Theme::Light);
    let store = MemoryStore::new().with_value("theme", "dark");
    let flag = RecordingFlag::new();

    assert_eq!(page(&os, &store, &flag).initialize(), Theme::Dark);
}

#[test]
fn manual_switch_persists_across_reload() {
    let os = MockColorScheme::new(Theme::Light);
    let store = MemoryStore::new();
    let flag = RecordingFlag::new();

    let first = page(&os, &store, &flag);
    first.initialize();
    first.set(Theme::Dark);
    assert_eq!(first.get(), Theme::Dark);
    drop(first);

    let reloaded = page(&os, &store, &flag);
    assert_eq!(reloaded.initialize(), Theme::Dark);
    assert_eq!(store.get("theme").as_deref(), Some("dark"));
}

#[test]
fn override_snaps_back_when_the_os_catches_up() {
    let os = MockColorScheme::new(Theme::Light);
    let store = MemoryStore::new();
    let flag = RecordingFlag::new();
    let coordinator = page(&os, &store, &flag);
    coordinator.initialize();

    coordinator.set(Theme::Dark);
    os.emulate(Theme::Dark);
    assert_eq!(coordinator.get(), Theme::Dark);
    assert_eq!(store.get("theme"), None);

    // No stale override: the OS is tracked again.
    os.emulate(Theme::Light);
    assert_eq!(coordinator.get(), Theme::Light);
    assert_eq!(flag.is_dark(), Some(false));
}

#[test]
fn switching_back_manually_snaps_to_the_os() {
    let os = MockColorScheme::new(Theme::Light);
    let store = MemoryStore::new();
    let flag = RecordingFlag::new();
    let coordinator = page(&os, &store, &flag);
    coordinator.initialize();

    coordinator.set(Theme::Dark);
    coordinator.set(Theme::Light);
    assert_eq!(coordinator.get(), Theme::Light);

    os.emulate(Theme::Dark);
    assert_eq!(coordinator.get(), Theme::Dark);
    os.emulate(Theme::Light);
    assert_eq!(coordinator.get(), Theme::Light);
}

#[test]
fn tracks_os_changes_without_an_override() {
    let os = MockColorScheme::new(Theme::Light);
    let store = MemoryStore::new();
    let flag = RecordingFlag::new();
    let coordinator = page(&os, &store, &flag);

    let mut observed = vec![coordinator.initialize()];
    for next in [Theme::Dark, Theme::Light] {
        os.emulate(next);
        observed.push(coordinator.get());
    }

    assert_eq!(observed, vec![Theme::Light, Theme::Dark, Theme::Light]);
    assert_eq!(flag.history(), vec![false, true, false]);
    assert_eq!(store.write_count(), 0);
}

#[test]
fn setting_the_os_value_leaves_nothing_stored() {
    let os = MockColorScheme::new(Theme::Light);
    let store = MemoryStore::new();
    let flag = RecordingFlag::new();
    let coordinator = page(&os, &store, &flag);
    coordinator.initialize();

    coordinator.set(Theme::Light);
    assert_eq!(store.get("theme"), None);
    assert_eq!(coordinator.snapshot().override_theme, None);
    assert_eq!(store.write_count(), 0);
}

#[test]
fn does_not_crash_without_a_platform() {
    let coordinator = ThemeCoordinator::headless();
    assert_eq!(coordinator.get(), Theme::Light);
    assert_eq!(coordinator.initialize(), Theme::Light);
    assert_eq!(coordinator.get(), Theme::Light);
    assert!(coordinator.is_initialized());

    coordinator.set(Theme::Dark);
    assert_eq!(coordinator.get(), Theme::Dark);
}

#[test]
fn syncs_themes_across_tabs() {
    let origin = SharedOrigin::new();
    let os = MockColorScheme::new(Theme::Light);
    let tab = || {
        let flag = RecordingFlag::new();
        let coordinator = ThemeCoordinator::new(
            Platform::headless()
                .with_scheme(os.clone())
                .with_origin(origin.context())
                .with_flag(flag.clone()),
            CoordinatorConfig::default(),
        );
        (coordinator, flag)
    };
    let (a, _flag_a) = tab();
    let (b, flag_b) = tab();
    assert_eq!(a.initialize(), Theme::Light);
    assert_eq!(b.initialize(), Theme::Light);

    a.set(Theme::Dark);
    assert_eq!(b.get(), Theme::Light);

    origin.dispatch_pending();
    assert_eq!(b.get(), Theme::Dark);
    assert_eq!(flag_b.is_dark(), Some(true));
    assert_eq!(origin.get("theme").as_deref(), Some("dark"));

    // And back: clearing the override in B clears it in A.
    b.set(Theme::Light);
    origin.dispatch_pending();
    assert_eq!(a.get(), Theme::Light);
    assert_eq!(origin.get("theme"), None);
}

#[test]
fn receiving_a_sync_does_not_echo_a_write() {
    let origin = SharedOrigin::new();
    let os = MockColorScheme::new(Theme::Light);
    let a = ThemeCoordinator::new(
        Platform::headless()
            .with_scheme(os.clone())
            .with_origin(origin.context()),
        CoordinatorConfig::default(),
    );
    let b = ThemeCoordinator::new(
        Platform::headless()
            .with_scheme(os.clone())
            .with_origin(origin.context()),
        CoordinatorConfig::default(),
    );
    a.initialize();
    b.initialize();

    a.set(Theme::Dark);
    assert_eq!(origin.dispatch_pending(), 1);
    assert_eq!(origin.pending(), 0);
}

#[test]
fn consumers_share_one_coordinator() {
    let os = MockColorScheme::new(Theme::Light);
    let store = MemoryStore::new();
    let flag = RecordingFlag::new();
    let coordinator = page(&os, &store, &flag);
    coordinator.initialize();

    let header = coordinator.clone();
    let footer = coordinator.clone();
    header.set(Theme::Dark);

    assert_eq!(footer.get(), Theme::Dark);
    assert_eq!(os.watcher_count(), 1);
}

fn tab(origin: &SharedOrigin, os: &MockColorScheme) -> ThemeCoordinator {
    ThemeCoordinator::new(
        Platform::headless()
            .with_scheme(os.clone())
            .with_origin(origin.context()),
        CoordinatorConfig::default(),
    )
}

#[test]
fn shutdown_stops_cross_tab_sync() {
    let origin = SharedOrigin::new();
    let os = MockColorScheme::new(Theme::Light);
    let a = tab(&origin, &os);
    let b = tab(&origin, &os);
    a.initialize();
    b.initialize();

    b.shutdown();
    a.set(Theme::Dark);
    assert_eq!(origin.dispatch_pending(), 0);
    assert_eq!(b.get(), Theme::Light);
}

#[test]
fn dropping_the_last_handle_stops_cross_tab_sync() {
    let origin = SharedOrigin::new();
    let os = MockColorScheme::new(Theme::Light);
    let a = tab(&origin, &os);
    let b = tab(&origin, &os);
    a.initialize();
    b.initialize();

    let seen = std::rc::Rc::new(std::cell::Cell::new(0));
    let counter = std::rc::Rc::clone(&seen);
    b.subscribe(move |_| counter.set(counter.get() + 1));
    let other_handle = b.clone();
    drop(b);

    // A surviving clone keeps the subscription alive.
    a.set(Theme::Dark);
    assert_eq!(origin.dispatch_pending(), 1);
    assert_eq!(seen.get(), 1);

    drop(other_handle);
    a.set(Theme::Light);
    assert_eq!(origin.dispatch_pending(), 0);
    assert_eq!(seen.get(), 1);
}
