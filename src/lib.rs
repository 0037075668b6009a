//! gphoto-capture: safe bindings to libgphoto2 for tethered camera control
//!
//! This library wraps one libgphoto2 camera/context pair behind an owning
//! handle. Native calls go through the [`Driver`] trait, which keeps all raw
//! pointer handling in one place and lets tests run against a mock camera.

pub mod camera;
pub mod config;
pub mod event;
pub mod reader;
pub mod traits;

#[cfg(feature = "gphoto2")]
pub mod device;
#[cfg(feature = "gphoto2")]
mod ffi;

#[cfg(test)]
pub mod mock;

pub use camera::Camera;
pub use config::BindingConfig;
pub use event::EventReceiver;
pub use reader::{Chunk, FileReader, CHUNK_SIZE};
pub use traits::{
    Abilities, CameraError, CameraEvent, CaptureKind, CapturedFilePath, ConfigTree, Driver,
    EventKind, Listing, NativeFile, Operations, Result, Setting, Status, WidgetKind,
};

#[cfg(feature = "gphoto2")]
pub use device::GPhotoDriver;
