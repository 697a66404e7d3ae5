//! # fbctl
//!
//! Main entry point for the framebuffer host tool.

use fbctl::{FbctlConfig, HostMode, OutputFormat};
use log::LevelFilter;
use std::env;
use std::process;

fn main() {
    let args: Vec<String> = env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("fbctl");

    let config = parse_args(&args).unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        print_usage(program);
        process::exit(1);
    });

    if let Err(e) = fbctl::logger::init(config.log_level) {
        eprintln!("Failed to install logger: {}", e);
    }

    let report = fbctl::run(&config).unwrap_or_else(|e| {
        eprintln!("{}", e);
        process::exit(1);
    });

    match report.render(config.output) {
        Ok(text) => print!("{}", text),
        Err(e) => {
            eprintln!("{}", e);
            process::exit(1);
        }
    }
}

fn parse_args(args: &[String]) -> Result<FbctlConfig, String> {
    let mut config = FbctlConfig::default();
    let mut i = 1;

    while i < args.len() {
        match args[i].as_str() {
            "--device" | "-d" => {
                i += 1;
                if i >= args.len() {
                    return Err("Missing value for --device".to_string());
                }
                config.fb = config.fb.with_device(&args[i]);
            }
            "--bpp" => {
                i += 1;
                if i >= args.len() {
                    return Err("Missing value for --bpp".to_string());
                }
                let bits = args[i]
                    .parse()
                    .map_err(|_| format!("Invalid bpp value: {}", args[i]))?;
                config.fb = config.fb.with_bits_per_pixel(bits);
            }
            "--sim" => {
                config.mode = HostMode::Sim;
            }
            "--pattern" => {
                config.pattern = true;
            }
            "--json" => {
                config.output = OutputFormat::Json;
            }
            "--verbose" | "-v" => {
                config.log_level = match config.log_level {
                    LevelFilter::Warn => LevelFilter::Info,
                    LevelFilter::Info => LevelFilter::Debug,
                    _ => LevelFilter::Trace,
                };
            }
            "--help" | "-h" => {
                print_usage(&args[0]);
                process::exit(0);
            }
            other => {
                return Err(format!("Unknown option: {}", other));
            }
        }
        i += 1;
    }

    Ok(config)
}

fn print_usage(program: &str) {
    eprintln!("Usage: {} [OPTIONS]", program);
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -d, --device <PATH>      Framebuffer device (default: $FRAMEBUFFER or /dev/fb0)");
    eprintln!("  --bpp <N>                Bits per pixel to request (default: 32)");
    eprintln!("  --sim                    Use a simulated 640x480 display");
    eprintln!("  --pattern                Paint red/green/blue bars before reporting");
    eprintln!("  --json                   Print the report as JSON");
    eprintln!("  -v, --verbose            More logging (repeat for more)");
    eprintln!("  -h, --help               Show this help message");
    eprintln!();
    eprintln!("Examples:");
    eprintln!("  {} --device /dev/fb1 --pattern", program);
    eprintln!("  {} --sim --json", program);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn args(list: &[&str]) -> Vec<String> {
        std::iter::once("fbctl")
            .chain(list.iter().copied())
            .map(String::from)
            .collect()
    }

    #[test]
    fn test_parse_all_options() {
        let config = parse_args(&args(&[
            "-d", "/dev/fb1", "--bpp", "16", "--sim", "--pattern", "--json", "-v", "-v",
        ]))
        .unwrap();
        assert_eq!(config.fb.device_path, PathBuf::from("/dev/fb1"));
        assert_eq!(config.fb.bits_per_pixel, 16);
        assert_eq!(config.mode, HostMode::Sim);
        assert!(config.pattern);
        assert_eq!(config.output, OutputFormat::Json);
        assert_eq!(config.log_level, LevelFilter::Debug);
    }

    #[test]
    fn test_parse_defaults() {
        let config = parse_args(&args(&[])).unwrap();
        assert_eq!(config.mode, HostMode::Device);
        assert_eq!(config.fb.bits_per_pixel, 32);
        assert!(!config.pattern);
        assert_eq!(config.log_level, LevelFilter::Warn);
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_args(&args(&["--device"])).is_err());
        assert!(parse_args(&args(&["--bpp", "deep"])).is_err());
        assert!(parse_args(&args(&["--frobnicate"])).is_err());
    }
}
