pub const MAX_LEVEL: u8 = 100;

/// Levels at or below this are followed by an explicit switch-off.
pub const OFF_THRESHOLD: u8 = 1;

const MIN_VISIBLE_LEVEL: i16 = 10;

/// Applies `delta` to the level reported by the device.
///
/// A reported level of 1 counts as 0, since it is what this bridge leaves behind before switching
/// a light off. Results above 100 are capped, results below 10 become 1. The result is never 0;
/// reaching the off state is done with a separate switch command.
pub fn next_level(current: u8, delta: i16) -> u8 {
    let base = if current == OFF_THRESHOLD { 0 } else { i16::from(current) };
    let level = base + delta;

    if level > i16::from(MAX_LEVEL) {
        MAX_LEVEL
    } else if level < MIN_VISIBLE_LEVEL {
        OFF_THRESHOLD
    } else {
        level as u8
    }
}
