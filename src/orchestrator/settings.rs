//! 语速、音调、音量的百分比与引擎原生区间换算。

use crate::orchestrator::types::VoiceParam;

/// Clamps to 0..=100 and snaps to the nearest multiple of `step`, ties to even.
pub fn quantize_percent(value: i32, step: u8) -> u8 {
    let step = f64::from(step.max(1));
    let clamped = f64::from(value.clamp(0, 100));
    let snapped = (clamped / step).round_ties_even() * step;
    snapped.clamp(0.0, 100.0) as u8
}

pub fn percent_to_param(percent: u8, min: i32, max: i32) -> i32 {
    let span = f64::from(max - min);
    (f64::from(percent) / 100.0 * span + f64::from(min)).round_ties_even() as i32
}

pub fn param_to_percent(value: i32, min: i32, max: i32) -> u8 {
    if max <= min {
        return 0;
    }
    let span = f64::from(max - min);
    let percent = (f64::from(value - min) / span * 100.0).round_ties_even();
    percent.clamp(0.0, 100.0) as u8
}

/// Host percent → native engine value for `param`.
pub fn native_value(param: VoiceParam, percent: i32) -> i32 {
    let (min, max) = param.native_range();
    percent_to_param(quantize_percent(percent, param.percent_step()), min, max)
}

/// Native engine value → host percent for `param`.
pub fn host_percent(param: VoiceParam, native: i32) -> u8 {
    let (min, max) = param.native_range();
    let percent = param_to_percent(native, min, max);
    match param {
        VoiceParam::Tempo => percent,
        VoiceParam::Pitch | VoiceParam::Volume => {
            quantize_percent(i32::from(percent), param.percent_step())
        }
    }
}
