//! Operator-facing progress reporting.
//!
//! All progress lines go to stderr; stdout is reserved for command output
//! (tables, JSON, terraform passthrough) so machine-readable results
//! (e.g. `token create --format json`) stay clean.

const GREEN: &str = "\x1b[0;32m";
const YELLOW: &str = "\x1b[1;33m";
const RED: &str = "\x1b[0;31m";
const BLUE: &str = "\x1b[0;34m";
const RESET: &str = "\x1b[0m";

pub fn info(msg: &str) {
    eprintln!("{}[INFO]{} {}", GREEN, RESET, msg);
}

pub fn warn(msg: &str) {
    eprintln!("{}[WARN]{} {}", YELLOW, RESET, msg);
}

pub fn error(msg: &str) {
    eprintln!("{}[ERROR]{} {}", RED, RESET, msg);
}

pub fn step(msg: &str) {
    eprintln!("{}[STEP]{} {}", BLUE, RESET, msg);
}
