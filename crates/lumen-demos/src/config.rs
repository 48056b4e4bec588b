//! Command line configuration.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use lumen_engine::core::ExampleSettings;

pub const USAGE: &str = "\
usage: lumen-demos <example> [options]
       lumen-demos list

options:
  --msaa <1|4>        MSAA sample count (default 4)
  --cubemap <DIR>     directory with px/nx/py/ny/pz/nz.png for pbr_ibl
  --no-vsync          present without waiting for vblank
  --log <FILTER>      env_logger filter, e.g. debug or lumen_demos=trace
  --width <PX>        initial window width (default 1280)
  --height <PX>       initial window height (default 720)
  -h, --help          print this help";

#[derive(Debug, Clone)]
pub struct DemoConfig {
    pub example: String,
    pub settings: ExampleSettings,
    pub vsync: bool,
    pub log_filter: Option<String>,
    pub width: f64,
    pub height: f64,
}

impl DemoConfig {
    pub fn new(example: impl Into<String>) -> Self {
        Self {
            example: example.into(),
            settings: ExampleSettings::default(),
            vsync: true,
            log_filter: None,
            width: 1280.0,
            height: 720.0,
        }
    }
}

#[derive(Debug, Clone)]
pub enum Command {
    Run(DemoConfig),
    List,
    Help,
}

/// Parses arguments, excluding the program name.
pub fn parse_args<I, S>(args: I) -> Result<Command>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut args = args.into_iter().map(Into::into);
    let mut example: Option<String> = None;
    let mut cfg = DemoConfig::new(String::new());

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => return Ok(Command::Help),
            "--list" => return Ok(Command::List),
            "--no-vsync" => cfg.vsync = false,
            "--msaa" => {
                let v = value(&mut args, &arg)?;
                let count: u32 = v
                    .parse()
                    .with_context(|| format!("--msaa expects a number, got {v:?}"))?;
                if count != 1 && count != 4 {
                    bail!("--msaa must be 1 or 4, got {count}");
                }
                cfg.settings.sample_count = count;
            }
            "--cubemap" => {
                cfg.settings.cubemap_dir = Some(PathBuf::from(value(&mut args, &arg)?));
            }
            "--log" => cfg.log_filter = Some(value(&mut args, &arg)?),
            "--width" => cfg.width = dimension(&value(&mut args, &arg)?, "--width")?,
            "--height" => cfg.height = dimension(&value(&mut args, &arg)?, "--height")?,
            opt if opt.starts_with('-') => bail!("unknown option {opt}"),
            name => {
                if let Some(prev) = &example {
                    bail!("unexpected argument {name:?} (example already set to {prev:?})");
                }
                example = Some(name.to_string());
            }
        }
    }

    match example.as_deref() {
        None => Ok(Command::Help),
        Some("list") => Ok(Command::List),
        Some(name) => {
            cfg.example = name.to_string();
            Ok(Command::Run(cfg))
        }
    }
}

fn value(args: &mut impl Iterator<Item = String>, opt: &str) -> Result<String> {
    args.next().with_context(|| format!("{opt} requires a value"))
}

fn dimension(v: &str, opt: &str) -> Result<f64> {
    let px: u32 = v
        .parse()
        .with_context(|| format!("{opt} expects a pixel count, got {v:?}"))?;
    if px == 0 {
        bail!("{opt} must be greater than zero");
    }
    Ok(f64::from(px))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(args: &[&str]) -> DemoConfig {
        match parse_args(args.iter().copied()) {
            Ok(Command::Run(cfg)) => cfg,
            other => panic!("expected run command, got {other:?}"),
        }
    }

    #[test]
    fn defaults() {
        let cfg = run(&["compute_boids"]);
        assert_eq!(cfg.example, "compute_boids");
        assert_eq!(cfg.settings.sample_count, 4);
        assert!(cfg.vsync);
        assert!(cfg.settings.cubemap_dir.is_none());
        assert_eq!((cfg.width, cfg.height), (1280.0, 720.0));
    }

    #[test]
    fn all_options() {
        let cfg = run(&[
            "--msaa", "1", "pbr_ibl", "--cubemap", "assets/sky", "--no-vsync", "--log", "debug",
            "--width", "800", "--height", "600",
        ]);
        assert_eq!(cfg.example, "pbr_ibl");
        assert_eq!(cfg.settings.sample_count, 1);
        assert_eq!(cfg.settings.cubemap_dir, Some(PathBuf::from("assets/sky")));
        assert!(!cfg.vsync);
        assert_eq!(cfg.log_filter.as_deref(), Some("debug"));
        assert_eq!((cfg.width, cfg.height), (800.0, 600.0));
    }

    #[test]
    fn help_and_list() {
        assert!(matches!(parse_args(Vec::<String>::new()), Ok(Command::Help)));
        assert!(matches!(parse_args(["--help"]), Ok(Command::Help)));
        assert!(matches!(parse_args(["list"]), Ok(Command::List)));
        assert!(matches!(parse_args(["--list"]), Ok(Command::List)));
    }

    #[test]
    fn rejects_bad_input() {
        assert!(parse_args(["blinn_phong", "--msaa", "2"]).is_err());
        assert!(parse_args(["blinn_phong", "--msaa", "four"]).is_err());
        assert!(parse_args(["blinn_phong", "--msaa"]).is_err());
        assert!(parse_args(["blinn_phong", "--fullscreen"]).is_err());
        assert!(parse_args(["blinn_phong", "--width", "0"]).is_err());
        assert!(parse_args(["blinn_phong", "pbr_ibl"]).is_err());
    }
}
