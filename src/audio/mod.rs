//! 音频输出：软件节拍输出与（可选）rodio 设备输出，按序触发回调。

#[cfg(feature = "device-sink")]
mod device;
mod paced;

#[cfg(feature = "device-sink")]
pub use device::DeviceSink;
pub use paced::PacedSink;
