//! Build script for cryopos-firmware
//!
//! - Sets up linker search paths for memory.x
//! - Validates machine.toml at compile time
//! - Generates the axis table the firmware is built with

use std::collections::HashSet;
use std::env;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use cryopos_core::config::{MachineConfig, ACCELERATION_MAX, ACCELERATION_MIN};

/// Number of board I/O channels (bank A and bank B)
const IO_CHANNELS: u8 = 44;

/// Usable step timer reload range
const RELOAD_RANGE: std::ops::RangeInclusive<u32> = 5..=0xFFFF;

fn main() {
    setup_linker();
    let config = load_config();
    validate_axes(&config);
    generate_config(&config);
}

/// Set up linker search paths for memory.x
fn setup_linker() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());

    // Copy memory.x to the output directory
    let memory_x = include_bytes!("memory.x");
    let mut f = File::create(out_dir.join("memory.x")).unwrap();
    f.write_all(memory_x).unwrap();

    // Tell rustc where to find memory.x
    println!("cargo:rustc-link-search={}", out_dir.display());

    println!("cargo:rerun-if-changed=memory.x");
    println!("cargo:rerun-if-changed=build.rs");
}

/// Read and deserialize machine.toml
fn load_config() -> MachineConfig {
    println!("cargo:rerun-if-changed=machine.toml");

    let config_path = Path::new("machine.toml");

    if !config_path.exists() {
        panic!(
            "\n\
            ╔══════════════════════════════════════════════════════════════════╗\n\
            ║  ERROR: machine.toml not found!                                  ║\n\
            ║                                                                  ║\n\
            ║  The firmware requires a machine.toml configuration file.        ║\n\
            ║  Please create one in the cryopos-firmware directory.            ║\n\
            ╚══════════════════════════════════════════════════════════════════╝\n"
        );
    }

    let config_content = match fs::read_to_string(config_path) {
        Ok(content) => content,
        Err(e) => {
            panic!(
                "\n\
                ╔══════════════════════════════════════════════════════════════════╗\n\
                ║  ERROR: Failed to read machine.toml                              ║\n\
                ║                                                                  ║\n\
                ║  Error: {:<56} ║\n\
                ╚══════════════════════════════════════════════════════════════════╝\n",
                e
            );
        }
    };

    match toml::from_str(&config_content) {
        Ok(config) => config,
        Err(e) => {
            let error_msg = e.to_string();
            panic!(
                "\n\
                ╔══════════════════════════════════════════════════════════════════╗\n\
                ║  ERROR: Invalid machine.toml                                     ║\n\
                ╠══════════════════════════════════════════════════════════════════╣\n\
                ║                                                                  ║\n\
                {}\n\
                ║                                                                  ║\n\
                ╚══════════════════════════════════════════════════════════════════╝\n",
                format_error_lines(&error_msg)
            );
        }
    }
}

/// Format error message lines with box drawing
fn format_error_lines(msg: &str) -> String {
    msg.lines()
        .map(|line| {
            let truncated = if line.len() > 64 {
                format!("{}...", &line[..61])
            } else {
                line.to_string()
            };
            format!("║  {:<64} ║", truncated)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Check signal channels and motion parameters of every axis
fn validate_axes(config: &MachineConfig) {
    let mut errors = Vec::new();
    let mut used = HashSet::new();

    for (i, axis) in config.axes.iter().enumerate() {
        for (field, pin) in [("dir_pin", axis.dir_pin), ("on_pin", axis.on_pin)] {
            if pin >= IO_CHANNELS {
                errors.push(format!(
                    "[[axis]] m{} {} must be below {}",
                    i, field, IO_CHANNELS
                ));
            }
            if !used.insert(pin) {
                errors.push(format!("[[axis]] m{} {} {} is already used", i, field, pin));
            }
        }

        if !(ACCELERATION_MIN..=ACCELERATION_MAX).contains(&axis.acceleration) {
            errors.push(format!(
                "[[axis]] m{} acceleration must be {}-{}",
                i, ACCELERATION_MIN, ACCELERATION_MAX
            ));
        }

        if axis.min_speed == 0 {
            errors.push(format!("[[axis]] m{} min_speed must be positive", i));
        } else if !RELOAD_RANGE.contains(&(axis.clock.hz() / axis.min_speed)) {
            errors.push(format!(
                "[[axis]] m{} min_speed {} is out of range for clock {}",
                i,
                axis.min_speed,
                axis.clock.selector()
            ));
        }
    }

    if !errors.is_empty() {
        panic!(
            "\n\
            ╔══════════════════════════════════════════════════════════════════╗\n\
            ║  ERROR: Invalid axis configuration                               ║\n\
            ╠══════════════════════════════════════════════════════════════════╣\n\
            {}\n\
            ╚══════════════════════════════════════════════════════════════════╝\n",
            errors
                .iter()
                .map(|e| format!("║  • {:<62} ║", e))
                .collect::<Vec<_>>()
                .join("\n")
        );
    }

    println!("cargo:warning=machine.toml validated successfully");
}

/// Write `machine_config.rs` with the label and axis table as constants
fn generate_config(config: &MachineConfig) {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    let mut f = File::create(out_dir.join("machine_config.rs")).unwrap();

    writeln!(f, "/// Product label reported by `ver`").unwrap();
    writeln!(f, "pub const LABEL: &str = {:?};", config.label.as_str()).unwrap();
    writeln!(f).unwrap();
    writeln!(f, "/// Motor axes, `m0` first").unwrap();
    writeln!(f, "pub const AXES: [AxisConfig; NUM_AXES] = [").unwrap();
    for axis in &config.axes {
        writeln!(
            f,
            "    AxisConfig {{ dir_pin: {}, on_pin: {}, dir_inverted: {}, on_inverted: {}, \
             can_step: {}, min_speed: {}, acceleration: {}, clock: ClockSource::{:?} }},",
            axis.dir_pin,
            axis.on_pin,
            axis.dir_inverted,
            axis.on_inverted,
            axis.can_step,
            axis.min_speed,
            axis.acceleration,
            axis.clock,
        )
        .unwrap();
    }
    writeln!(f, "];").unwrap();
}
