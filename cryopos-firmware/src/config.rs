//! Machine configuration compiled in from `machine.toml`
//!
//! `build.rs` validates the file and generates the constants below.

use cryopos_core::config::{AxisConfig, NUM_AXES};
use cryopos_core::motion::ClockSource;

include!(concat!(env!("OUT_DIR"), "/machine_config.rs"));
