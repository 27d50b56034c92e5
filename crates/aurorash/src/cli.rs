use std::path::PathBuf;

use auroraconfig::{AntialiasSetting, FadeCurveSetting, PowerSetting};
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "aurorash",
    author,
    version,
    about = "Animated aurora background window",
    arg_required_else_help = false
)]
pub struct Cli {
    #[command(flatten)]
    pub run: RunArgs,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Parser, Debug, Default, Clone)]
pub struct RunArgs {
    /// Read configuration from FILE instead of the config directory.
    #[arg(long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Comma separated hex colour stops (e.g. `#5227FF,#7cff67,#5227FF`).
    #[arg(long, value_name = "A,B,C", value_delimiter = ',', global = true)]
    pub colors: Option<Vec<String>>,

    /// Vertical extent of the aurora band.
    #[arg(long, value_name = "F", global = true)]
    pub amplitude: Option<f64>,

    /// Softness of the band edge.
    #[arg(long, value_name = "F", global = true)]
    pub blend: Option<f64>,

    /// Animation speed multiplier.
    #[arg(long, value_name = "F", global = true)]
    pub speed: Option<f64>,

    /// Opacity reached once fully faded in (0-1).
    #[arg(long, value_name = "F", global = true)]
    pub opacity: Option<f64>,

    /// Freeze the animation at a fixed time value.
    #[arg(long, value_name = "F", global = true)]
    pub time: Option<f64>,

    /// Initial window size (e.g. `1280x720`).
    #[arg(long, value_name = "WIDTHxHEIGHT", value_parser = parse_size, global = true)]
    pub size: Option<(u32, u32)>,

    /// Anti-aliasing policy: `auto`, `off`, or an explicit MSAA sample count (e.g. `4`).
    #[arg(long, value_name = "MODE", value_parser = parse_antialias, global = true)]
    pub antialias: Option<AntialiasSetting>,

    /// Adapter preference: `low` or `high`.
    #[arg(long, value_name = "low|high", value_parser = parse_power, global = true)]
    pub power: Option<PowerSetting>,

    /// Crossfade easing: `linear`, `smoothstep` or `ease-in-out`.
    #[arg(long, value_name = "CURVE", value_parser = parse_fade_curve, global = true)]
    pub fade_curve: Option<FadeCurveSetting>,

    /// Replace the built-in fragment stage with a GLSL file.
    #[arg(long, value_name = "FILE", global = true)]
    pub fragment: Option<PathBuf>,

    /// Open the window without activating the effect (Space toggles).
    #[arg(long, global = true)]
    pub inactive: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Inspect the resolved configuration.
    Config(ConfigCommand),
}

#[derive(Parser, Debug)]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the configuration after applying file values and flags.
    Print,
    /// Print the config directory and file in use.
    Where,
}

pub fn parse() -> Cli {
    Cli::parse()
}

pub fn parse_antialias(value: &str) -> Result<AntialiasSetting, String> {
    if value.trim().is_empty() {
        return Err("anti-alias mode must not be empty".to_string());
    }
    value.parse()
}

pub fn parse_power(value: &str) -> Result<PowerSetting, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "low" | "low-power" => Ok(PowerSetting::Low),
        "high" | "high-performance" => Ok(PowerSetting::High),
        other => Err(format!("unknown power preference '{other}'; expected low or high")),
    }
}

pub fn parse_fade_curve(value: &str) -> Result<FadeCurveSetting, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "linear" => Ok(FadeCurveSetting::Linear),
        "smoothstep" | "smooth" => Ok(FadeCurveSetting::Smoothstep),
        "ease-in-out" | "ease" | "easeinout" => Ok(FadeCurveSetting::EaseInOut),
        other => Err(format!(
            "unknown fade curve '{other}'; expected linear, smoothstep, or ease-in-out"
        )),
    }
}

pub fn parse_size(value: &str) -> Result<(u32, u32), String> {
    let (w, h) = value
        .trim()
        .split_once(['x', 'X'])
        .ok_or_else(|| "expected WIDTHxHEIGHT".to_string())?;
    let width = w
        .trim()
        .parse::<u32>()
        .map_err(|_| format!("invalid width '{}'", w.trim()))?;
    let height = h
        .trim()
        .parse::<u32>()
        .map_err(|_| format!("invalid height '{}'", h.trim()))?;
    if width == 0 || height == 0 {
        return Err("window size must be greater than zero".into());
    }
    Ok((width, height))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_window_sizes() {
        assert_eq!(parse_size("1280x720").unwrap(), (1280, 720));
        assert_eq!(parse_size(" 800 X 600 ").unwrap(), (800, 600));
        assert!(parse_size("0x600").is_err());
        assert!(parse_size("800").is_err());
        assert!(parse_size("axb").is_err());
    }

    #[test]
    fn parses_antialias_modes() {
        assert_eq!(parse_antialias("auto").unwrap(), AntialiasSetting::Auto);
        assert_eq!(parse_antialias("off").unwrap(), AntialiasSetting::Off);
        assert_eq!(parse_antialias("4").unwrap(), AntialiasSetting::Samples4);
        assert!(parse_antialias("").is_err());
        assert!(parse_antialias("3").is_err());
    }

    #[test]
    fn parses_curves_and_power() {
        assert_eq!(parse_fade_curve("Smoothstep").unwrap(), FadeCurveSetting::Smoothstep);
        assert_eq!(parse_fade_curve("ease-in-out").unwrap(), FadeCurveSetting::EaseInOut);
        assert!(parse_fade_curve("bounce").is_err());
        assert_eq!(parse_power("HIGH").unwrap(), PowerSetting::High);
        assert!(parse_power("medium").is_err());
    }

    #[test]
    fn colors_split_on_commas() {
        let cli = Cli::try_parse_from(["aurorash", "--colors", "#fff,#000,#f00", "--inactive"])
            .unwrap();
        assert_eq!(
            cli.run.colors.as_deref(),
            Some(&["#fff".to_string(), "#000".to_string(), "#f00".to_string()][..])
        );
        assert!(cli.run.inactive);
        assert!(cli.command.is_none());
    }

    #[test]
    fn flags_are_accepted_around_the_config_subcommand() {
        let cli = Cli::try_parse_from(["aurorash", "config", "print", "--speed", "0.5"]).unwrap();
        assert_eq!(cli.run.speed, Some(0.5));
        assert!(matches!(
            cli.command,
            Some(Command::Config(ConfigCommand {
                action: ConfigAction::Print
            }))
        ));
    }
}
