//! Polls the config file and forwards effect changes to the running window.

use std::fs;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use aurora::{ParameterFeed, RenderParameters};
use auroraconfig::{AuroraConfig, EffectConfig, MAX_WATCH_INTERVAL};
use tracing::{debug, info, warn};

use crate::settings::{render_parameters, EffectOverrides};

/// Re-reads the config file at a fixed interval. Only the `[effect]` section
/// is live; other sections need a restart.
pub struct ConfigWatcher {
    path: PathBuf,
    interval: Duration,
    overrides: EffectOverrides,
    next_check: Instant,
    last_contents: Option<String>,
    current: EffectConfig,
}

impl ConfigWatcher {
    pub fn new(
        path: PathBuf,
        interval: Duration,
        overrides: EffectOverrides,
        current: EffectConfig,
    ) -> Self {
        let interval = interval.min(MAX_WATCH_INTERVAL);
        Self {
            path,
            interval,
            overrides,
            next_check: deadline(Instant::now(), interval),
            last_contents: None,
            current,
        }
    }

    fn poll_at(&mut self, now: Instant) -> Option<RenderParameters> {
        if now < self.next_check {
            return None;
        }
        self.next_check = deadline(now, self.interval);

        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) => {
                debug!(path = %self.path.display(), %err, "config file not readable");
                return None;
            }
        };
        if self.last_contents.as_deref() == Some(contents.as_str()) {
            return None;
        }
        let parsed = AuroraConfig::from_toml_str(&contents);
        self.last_contents = Some(contents);

        let config = match parsed {
            Ok(config) => config,
            Err(err) => {
                warn!(path = %self.path.display(), %err, "ignoring config change");
                return None;
            }
        };

        let mut effect = config.effect;
        self.overrides.apply(&mut effect);
        if let Err(err) = effect.validate() {
            warn!(path = %self.path.display(), %err, "ignoring config change");
            return None;
        }
        if effect == self.current {
            debug!(path = %self.path.display(), "config changed outside [effect]; restart to apply");
            return None;
        }

        info!(path = %self.path.display(), "reloaded effect parameters");
        self.current = effect;
        Some(render_parameters(&self.current))
    }
}

fn deadline(now: Instant, interval: Duration) -> Instant {
    now.checked_add(interval).unwrap_or(now)
}

impl ParameterFeed for ConfigWatcher {
    fn poll(&mut self) -> Option<RenderParameters> {
        self.poll_at(Instant::now())
    }

    fn next_poll(&self) -> Option<Instant> {
        Some(self.next_check)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const INTERVAL: Duration = Duration::from_millis(250);

    struct Fixture {
        _root: TempDir,
        path: PathBuf,
        watcher: ConfigWatcher,
        now: Instant,
    }

    impl Fixture {
        fn new(body: &str, overrides: EffectOverrides) -> Self {
            let root = TempDir::new().unwrap();
            let path = root.path().join("config.toml");
            fs::write(&path, body).unwrap();
            let mut current = AuroraConfig::from_toml_str(body).unwrap().effect;
            overrides.apply(&mut current);
            let watcher = ConfigWatcher::new(path.clone(), INTERVAL, overrides, current);
            let now = watcher.next_check;
            Self {
                _root: root,
                path,
                watcher,
                now,
            }
        }

        fn write(&self, body: &str) {
            fs::write(&self.path, body).unwrap();
        }

        fn tick(&mut self) -> Option<RenderParameters> {
            let update = self.watcher.poll_at(self.now);
            self.now += INTERVAL;
            update
        }
    }

    #[test]
    fn unchanged_file_produces_no_update() {
        let mut fixture = Fixture::new("[effect]\namplitude = 1.0\n", EffectOverrides::default());
        assert!(fixture.tick().is_none());
        assert!(fixture.tick().is_none());
    }

    #[test]
    fn effect_changes_are_forwarded() {
        let mut fixture = Fixture::new("[effect]\namplitude = 1.0\n", EffectOverrides::default());
        fixture.tick();

        fixture.write("[effect]\namplitude = 2.0\nblend = 0.5\n");
        let update = fixture.tick().expect("changed effect");

        assert_eq!(update.amplitude, Some(2.0));
        assert_eq!(update.blend, Some(0.5));
        assert!(fixture.tick().is_none());
    }

    #[test]
    fn polls_are_rate_limited() {
        let mut fixture = Fixture::new("[effect]\nspeed = 1.0\n", EffectOverrides::default());
        fixture.write("[effect]\nspeed = 2.0\n");

        let early = fixture.now - Duration::from_millis(1);
        assert!(fixture.watcher.poll_at(early).is_none());
        assert!(fixture.tick().is_some());
        assert_eq!(fixture.watcher.next_poll(), Some(fixture.now));
    }

    #[test]
    fn invalid_edits_keep_the_previous_parameters() {
        let mut fixture = Fixture::new("[effect]\nopacity = 0.5\n", EffectOverrides::default());
        fixture.write("[effect]\nopacity = 3.0\n");
        assert!(fixture.tick().is_none());

        fixture.write("[effect\nbroken");
        assert!(fixture.tick().is_none());

        fixture.write("[effect]\nopacity = 0.75\n");
        assert_eq!(fixture.tick().expect("valid again").opacity, 0.75);
    }

    #[test]
    fn flags_keep_winning_over_reloads() {
        let overrides = EffectOverrides {
            speed: Some(0.5),
            ..EffectOverrides::default()
        };
        let mut fixture = Fixture::new("[effect]\nspeed = 1.0\n", overrides);

        fixture.write("[effect]\nspeed = 4.0\n");
        assert!(fixture.tick().is_none());

        fixture.write("[effect]\nspeed = 4.0\namplitude = 0.25\n");
        let update = fixture.tick().expect("amplitude changed");
        assert_eq!(update.speed, Some(0.5));
        assert_eq!(update.amplitude, Some(0.25));
    }

    #[test]
    fn non_effect_edits_are_not_forwarded() {
        let mut fixture = Fixture::new("[window]\nwidth = 640\n", EffectOverrides::default());
        fixture.write("[window]\nwidth = 800\n");
        assert!(fixture.tick().is_none());
    }

    #[test]
    fn deleted_file_is_tolerated() {
        let mut fixture = Fixture::new("[effect]\nspeed = 1.0\n", EffectOverrides::default());
        fs::remove_file(&fixture.path).unwrap();
        assert!(fixture.tick().is_none());

        fixture.write("[effect]\nspeed = 3.0\n");
        assert_eq!(fixture.tick().expect("file restored").speed, Some(3.0));
    }

    #[test]
    fn oversized_intervals_are_clamped() {
        let watcher = ConfigWatcher::new(
            PathBuf::from("config.toml"),
            Duration::MAX,
            EffectOverrides::default(),
            EffectConfig::default(),
        );
        assert_eq!(watcher.interval, MAX_WATCH_INTERVAL);
        assert!(watcher.next_poll().is_some());
    }

    #[test]
    fn huge_interval_edits_are_ignored_while_running() {
        let mut fixture = Fixture::new("[effect]
speed = 1.0
", EffectOverrides::default());
        fixture.write("[effect]
speed = 2.0

[watch]
interval = 1e300
");
        assert!(fixture.tick().is_none());

        fixture.write("[effect]
speed = 2.0
");
        assert_eq!(fixture.tick().expect("valid again").speed, Some(2.0));
    }
}
