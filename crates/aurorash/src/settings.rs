//! Resolution of the effective configuration: file values first, then flags.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use aurora::{
    Antialiasing, CrossfadeCurve, GpuPowerPreference, ProgramSource, RenderParameters,
    SurfaceOptions, WindowConfig,
};
use auroraconfig::{
    AntialiasSetting, AuroraConfig, EffectConfig, FadeCurveSetting, PowerSetting, RenderSection,
};

use crate::cli::RunArgs;
use crate::paths::AppPaths;

/// Effect flags, re-applied on every hot reload so they keep winning over
/// the file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EffectOverrides {
    pub colors: Option<Vec<String>>,
    pub amplitude: Option<f64>,
    pub blend: Option<f64>,
    pub speed: Option<f64>,
    pub opacity: Option<f64>,
    pub time: Option<f64>,
}

impl EffectOverrides {
    pub fn from_args(args: &RunArgs) -> Self {
        Self {
            colors: args.colors.clone(),
            amplitude: args.amplitude,
            blend: args.blend,
            speed: args.speed,
            opacity: args.opacity,
            time: args.time,
        }
    }

    pub fn apply(&self, effect: &mut EffectConfig) {
        if let Some(colors) = &self.colors {
            effect.color_stops = colors.iter().map(|c| c.trim().to_string()).collect();
        }
        if let Some(amplitude) = self.amplitude {
            effect.amplitude = amplitude;
        }
        if let Some(blend) = self.blend {
            effect.blend = blend;
        }
        if let Some(speed) = self.speed {
            effect.speed = speed;
        }
        if let Some(opacity) = self.opacity {
            effect.opacity = opacity;
        }
        if self.time.is_some() {
            effect.time = self.time;
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: AuroraConfig,
    /// File consulted for values, whether or not it existed.
    pub path: PathBuf,
    pub from_file: bool,
}

/// Reads the config file (an explicit `--config` must exist, the default one
/// may not), then layers the command-line flags on top and validates.
pub fn load_config(paths: &AppPaths, args: &RunArgs) -> Result<LoadedConfig> {
    let (path, required) = match &args.config {
        Some(path) => (path.clone(), true),
        None => (paths.config_file(), false),
    };

    let (mut config, from_file) = if path.is_file() {
        (read_config_file(&path)?, true)
    } else if required {
        return Err(anyhow!("config file {} does not exist", path.display()));
    } else {
        tracing::debug!(path = %path.display(), "no config file; using defaults");
        (AuroraConfig::default(), false)
    };

    apply_overrides(&mut config, args);
    config
        .validate()
        .context("invalid configuration after applying command-line flags")?;

    Ok(LoadedConfig {
        config,
        path,
        from_file,
    })
}

pub fn read_config_file(path: &Path) -> Result<AuroraConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    let mut config = AuroraConfig::from_toml_str(&raw)
        .with_context(|| format!("failed to load config file {}", path.display()))?;
    if let Some(fragment) = config.render.fragment.take() {
        config.render.fragment = Some(relative_to(path, fragment));
    }
    Ok(config)
}

pub fn apply_overrides(config: &mut AuroraConfig, args: &RunArgs) {
    EffectOverrides::from_args(args).apply(&mut config.effect);

    if let Some((width, height)) = args.size {
        config.window.width = width;
        config.window.height = height;
    }
    if args.inactive {
        config.window.start_active = false;
    }
    if let Some(antialias) = args.antialias {
        config.render.antialias = antialias;
    }
    if let Some(power) = args.power {
        config.render.power = power;
    }
    if let Some(curve) = args.fade_curve {
        config.render.fade_curve = curve;
    }
    if let Some(fragment) = &args.fragment {
        config.render.fragment = Some(fragment.clone());
    }
}

pub fn render_parameters(effect: &EffectConfig) -> RenderParameters {
    RenderParameters {
        color_stops: effect.color_stops.clone(),
        amplitude: Some(effect.amplitude as f32),
        blend: Some(effect.blend as f32),
        speed: Some(effect.speed as f32),
        time: effect.time.map(|time| time as f32),
        opacity: effect.opacity as f32,
    }
}

pub fn window_config(config: &AuroraConfig) -> WindowConfig {
    WindowConfig {
        title: config.window.title.clone(),
        width: config.window.width,
        height: config.window.height,
        start_active: config.window.start_active,
        surface: surface_options(&config.render),
        curve: match config.render.fade_curve {
            FadeCurveSetting::Linear => CrossfadeCurve::Linear,
            FadeCurveSetting::Smoothstep => CrossfadeCurve::Smoothstep,
            FadeCurveSetting::EaseInOut => CrossfadeCurve::EaseInOut,
        },
    }
}

fn surface_options(render: &RenderSection) -> SurfaceOptions {
    let antialiasing = match render.antialias {
        AntialiasSetting::Auto => Antialiasing::Auto,
        AntialiasSetting::Off => Antialiasing::Off,
        other => other
            .samples()
            .map(Antialiasing::Samples)
            .unwrap_or(Antialiasing::Auto),
    };
    let power = match render.power {
        PowerSetting::Low => GpuPowerPreference::Low,
        PowerSetting::High => GpuPowerPreference::High,
    };
    SurfaceOptions {
        antialiasing,
        power,
    }
}

pub fn load_program(render: &RenderSection) -> Result<ProgramSource> {
    match &render.fragment {
        Some(path) => {
            tracing::info!(path = %path.display(), "using custom fragment shader");
            ProgramSource::from_fragment_file(path)
        }
        None => Ok(ProgramSource::aurora()),
    }
}

fn relative_to(config_file: &Path, path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        return path;
    }
    match config_file.parent() {
        Some(dir) => dir.join(path),
        None => path,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_config(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("config.toml");
        fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn missing_default_file_yields_defaults() {
        let root = TempDir::new().unwrap();
        let paths = AppPaths::from_raw(root.path().to_path_buf());

        let loaded = load_config(&paths, &RunArgs::default()).unwrap();

        assert!(!loaded.from_file);
        assert_eq!(loaded.path, root.path().join("config.toml"));
        assert_eq!(loaded.config, AuroraConfig::default());
    }

    #[test]
    fn explicit_config_must_exist() {
        let root = TempDir::new().unwrap();
        let paths = AppPaths::from_raw(root.path().to_path_buf());
        let args = RunArgs {
            config: Some(root.path().join("missing.toml")),
            ..RunArgs::default()
        };

        assert!(load_config(&paths, &args).is_err());
    }

    #[test]
    fn flags_override_file_values() {
        let root = TempDir::new().unwrap();
        write_config(
            root.path(),
            "[effect]\namplitude = 2.5\nspeed = 0.25\n\n[window]\nwidth = 640\nheight = 480\n",
        );
        let paths = AppPaths::from_raw(root.path().to_path_buf());
        let args = RunArgs {
            speed: Some(0.5),
            size: Some((1920, 1080)),
            inactive: true,
            fade_curve: Some(FadeCurveSetting::Linear),
            ..RunArgs::default()
        };

        let loaded = load_config(&paths, &args).unwrap();

        assert!(loaded.from_file);
        assert_eq!(loaded.config.effect.amplitude, 2.5);
        assert_eq!(loaded.config.effect.speed, 0.5);
        assert_eq!((loaded.config.window.width, loaded.config.window.height), (1920, 1080));
        assert!(!loaded.config.window.start_active);

        let window = window_config(&loaded.config);
        assert_eq!(window.curve, CrossfadeCurve::Linear);
        assert!(!window.start_active);
    }

    #[test]
    fn invalid_flags_are_rejected() {
        let root = TempDir::new().unwrap();
        let paths = AppPaths::from_raw(root.path().to_path_buf());
        let args = RunArgs {
            opacity: Some(1.5),
            ..RunArgs::default()
        };

        assert!(load_config(&paths, &args).is_err());
    }

    #[test]
    fn relative_fragment_paths_follow_the_config_file() {
        let root = TempDir::new().unwrap();
        let path = write_config(root.path(), "[render]\nfragment = \"shaders/custom.frag\"\n");

        let config = read_config_file(&path).unwrap();

        assert_eq!(
            config.render.fragment,
            Some(root.path().join("shaders/custom.frag"))
        );
    }

    #[test]
    fn effect_maps_onto_render_parameters() {
        let effect = EffectConfig {
            color_stops: vec!["#ff0000".into(), "#00ff00".into()],
            amplitude: 1.5,
            blend: 0.75,
            speed: 2.0,
            opacity: 0.5,
            time: Some(4.0),
        };

        let params = render_parameters(&effect);

        assert_eq!(params.color_stops.len(), 2);
        assert_eq!(params.amplitude, Some(1.5));
        assert_eq!(params.blend, Some(0.75));
        assert_eq!(params.speed, Some(2.0));
        assert_eq!(params.time, Some(4.0));
        assert_eq!(params.opacity, 0.5);
    }

    #[test]
    fn antialias_samples_reach_the_surface_options() {
        let render = RenderSection {
            antialias: AntialiasSetting::Samples4,
            power: PowerSetting::High,
            ..RenderSection::default()
        };

        let options = surface_options(&render);

        assert_eq!(options.antialiasing, Antialiasing::Samples(4));
        assert_eq!(options.power, GpuPowerPreference::High);
    }

    #[test]
    fn colour_override_trims_entries() {
        let mut effect = EffectConfig::default();
        EffectOverrides {
            colors: Some(vec![" #fff".into(), "#000 ".into()]),
            ..EffectOverrides::default()
        }
        .apply(&mut effect);

        assert_eq!(effect.color_stops, vec!["#fff".to_string(), "#000".to_string()]);
    }
}
