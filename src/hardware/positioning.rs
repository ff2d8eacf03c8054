//! Acoustic positioning source interface

use crate::core::RelativeFix;
use crate::hardware::CommResult;

/// Source of relative (east, north) fixes, typically a USBL system
pub trait PositioningSource {
    /// Read one fix. Each call either yields a fix or fails on its own;
    /// callers decide how many reads to attempt.
    fn read_fix(&mut self) -> CommResult<RelativeFix>;

    /// Check if the source is connected and responsive
    fn is_connected(&self) -> bool;

    /// Identification for log messages, e.g. "usbl@192.168.1.189:9200"
    fn describe(&self) -> String;
}
