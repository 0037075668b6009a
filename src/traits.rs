//! Core traits and types for the libgphoto2 camera abstraction.

use std::fmt;
use std::time::Duration;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A native libgphoto2 result code.
///
/// Zero or positive means success, negative values carry library-defined
/// meaning that can be turned into text with [`Driver::describe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Status(pub i32);

impl Status {
    /// `GP_OK`.
    pub const OK: Self = Self(0);
    /// `GP_ERROR`, the generic error.
    pub const ERROR: Self = Self(-1);
    /// `GP_ERROR_BAD_PARAMETERS`.
    pub const BAD_PARAMETERS: Self = Self(-2);
    /// `GP_ERROR_NO_MEMORY`.
    pub const NO_MEMORY: Self = Self(-3);
    /// `GP_ERROR_UNKNOWN_PORT`.
    pub const UNKNOWN_PORT: Self = Self(-5);
    /// `GP_ERROR_NOT_SUPPORTED`.
    pub const NOT_SUPPORTED: Self = Self(-6);
    /// `GP_ERROR_IO`.
    pub const IO: Self = Self(-7);
    /// `GP_ERROR_TIMEOUT`.
    pub const TIMEOUT: Self = Self(-10);
    /// `GP_ERROR_FILE_NOT_FOUND`.
    pub const FILE_NOT_FOUND: Self = Self(-108);
    /// `GP_ERROR_CANCEL`.
    pub const CANCEL: Self = Self(-112);

    /// Raw integer value as returned by the library.
    #[must_use]
    pub const fn code(self) -> i32 {
        self.0
    }

    /// Whether the code denotes success.
    #[must_use]
    pub const fn is_ok(self) -> bool {
        self.0 >= 0
    }

    /// Convert a negative code into [`CameraError::Native`].
    pub fn check(self) -> Result<()> {
        if self.is_ok() {
            Ok(())
        } else {
            Err(CameraError::Native(self))
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gphoto2 status {}", self.0)
    }
}

/// What a capture request should record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureKind {
    /// Still image (`GP_CAPTURE_IMAGE`).
    Image,
    /// Movie clip (`GP_CAPTURE_MOVIE`).
    Movie,
    /// Sound recording (`GP_CAPTURE_SOUND`).
    Sound,
}

impl CaptureKind {
    /// Native `CameraCaptureType` value.
    #[must_use]
    pub const fn as_raw(self) -> i32 {
        match self {
            Self::Image => 0,
            Self::Movie => 1,
            Self::Sound => 2,
        }
    }
}

/// Kind of a node in the camera configuration tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WidgetKind {
    /// Top level window.
    Window,
    /// Section grouping other widgets.
    Section,
    /// Free text entry.
    Text,
    /// Numeric slider.
    Range,
    /// On/off toggle.
    Toggle,
    /// Radio button group.
    Radio,
    /// Drop-down menu.
    Menu,
    /// Action button.
    Button,
    /// Date and time.
    Date,
}

impl WidgetKind {
    /// Map a native `CameraWidgetType` value.
    #[must_use]
    pub const fn from_raw(raw: i32) -> Option<Self> {
        Some(match raw {
            0 => Self::Window,
            1 => Self::Section,
            2 => Self::Text,
            3 => Self::Range,
            4 => Self::Toggle,
            5 => Self::Radio,
            6 => Self::Menu,
            7 => Self::Button,
            8 => Self::Date,
            _ => return None,
        })
    }

    /// Native `CameraWidgetType` value.
    #[must_use]
    pub const fn as_raw(self) -> i32 {
        match self {
            Self::Window => 0,
            Self::Section => 1,
            Self::Text => 2,
            Self::Range => 3,
            Self::Toggle => 4,
            Self::Radio => 5,
            Self::Menu => 6,
            Self::Button => 7,
            Self::Date => 8,
        }
    }

    /// Whether the widget takes its value as a plain string.
    #[must_use]
    pub const fn accepts_text(self) -> bool {
        matches!(self, Self::Menu | Self::Text | Self::Radio)
    }
}

/// Kind of an event reported by the camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// Anything the library could not classify.
    Unknown,
    /// The wait ran out without an event.
    Timeout,
    /// A new file appeared on the device.
    FileAdded,
    /// A new folder appeared on the device.
    FolderAdded,
    /// A capture finished.
    CaptureComplete,
    /// An existing file changed.
    FileChanged,
}

impl EventKind {
    /// Map a native `CameraEventType` value. Unrecognised values are `Unknown`.
    #[must_use]
    pub const fn from_raw(raw: i32) -> Self {
        match raw {
            1 => Self::Timeout,
            2 => Self::FileAdded,
            3 => Self::FolderAdded,
            4 => Self::CaptureComplete,
            5 => Self::FileChanged,
            _ => Self::Unknown,
        }
    }

    /// Native `CameraEventType` value.
    #[must_use]
    pub const fn as_raw(self) -> i32 {
        match self {
            Self::Unknown => 0,
            Self::Timeout => 1,
            Self::FileAdded => 2,
            Self::FolderAdded => 3,
            Self::CaptureComplete => 4,
            Self::FileChanged => 5,
        }
    }
}

/// Location of a file on the camera's filesystem.
///
/// Only meaningful as a lookup key until the device state changes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapturedFilePath {
    /// File name without folder.
    pub name: String,
    /// Containing folder.
    pub folder: String,
}

impl CapturedFilePath {
    /// Create a new path from its parts.
    #[must_use]
    pub fn new(folder: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            folder: folder.into(),
        }
    }
}

impl fmt::Display for CapturedFilePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.folder.ends_with('/') {
            write!(f, "{}{}", self.folder, self.name)
        } else {
            write!(f, "{}/{}", self.folder, self.name)
        }
    }
}

/// An event delivered by [`crate::Camera::async_wait_for_event`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CameraEvent {
    /// Unclassified event.
    Unknown,
    /// No event arrived before the timeout.
    Timeout,
    /// A file was added.
    FileAdded(CapturedFilePath),
    /// A file was changed.
    FileChanged(CapturedFilePath),
    /// A folder was added.
    FolderAdded,
    /// A capture completed.
    CaptureComplete,
}

impl CameraEvent {
    /// Classify a native event. Only file events keep their payload.
    #[must_use]
    pub fn classify(kind: EventKind, payload: Option<CapturedFilePath>) -> Self {
        match (kind, payload) {
            (EventKind::FileAdded, Some(path)) => Self::FileAdded(path),
            (EventKind::FileChanged, Some(path)) => Self::FileChanged(path),
            (EventKind::FileAdded, None) => Self::FileAdded(CapturedFilePath::default()),
            (EventKind::FileChanged, None) => Self::FileChanged(CapturedFilePath::default()),
            (EventKind::Timeout, _) => Self::Timeout,
            (EventKind::FolderAdded, _) => Self::FolderAdded,
            (EventKind::CaptureComplete, _) => Self::CaptureComplete,
            (EventKind::Unknown, _) => Self::Unknown,
        }
    }

    /// The event's kind.
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::Unknown => EventKind::Unknown,
            Self::Timeout => EventKind::Timeout,
            Self::FileAdded(_) => EventKind::FileAdded,
            Self::FileChanged(_) => EventKind::FileChanged,
            Self::FolderAdded => EventKind::FolderAdded,
            Self::CaptureComplete => EventKind::CaptureComplete,
        }
    }

    /// Folder of the affected file, empty for events without a file.
    #[must_use]
    pub fn folder(&self) -> &str {
        self.path().map_or("", |path| path.folder.as_str())
    }

    /// Name of the affected file, empty for events without a file.
    #[must_use]
    pub fn file(&self) -> &str {
        self.path().map_or("", |path| path.name.as_str())
    }

    /// Path of the affected file, if any.
    #[must_use]
    pub const fn path(&self) -> Option<&CapturedFilePath> {
        match self {
            Self::FileAdded(path) | Self::FileChanged(path) => Some(path),
            _ => None,
        }
    }
}

bitflags! {
    /// Operations a camera driver supports (`CameraOperation`).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Operations: u32 {
        /// Still image capture.
        const CAPTURE_IMAGE = 1 << 0;
        /// Video capture.
        const CAPTURE_VIDEO = 1 << 1;
        /// Audio capture.
        const CAPTURE_AUDIO = 1 << 2;
        /// Live preview.
        const CAPTURE_PREVIEW = 1 << 3;
        /// Configuration tree access.
        const CONFIG = 1 << 4;
        /// Asynchronous trigger capture.
        const TRIGGER_CAPTURE = 1 << 5;
    }
}

/// Managed copy of the native `CameraAbilities` descriptor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Abilities {
    /// Camera model name.
    pub model: String,
    /// Driver maturity (`CameraDriverStatus`).
    pub status: i32,
    /// Supported port types (`GPPortType` bits).
    pub port: i32,
    /// Supported operations.
    pub operations: Operations,
    /// USB vendor id.
    pub usb_vendor: i32,
    /// USB product id.
    pub usb_product: i32,
    /// USB class.
    pub usb_class: i32,
    /// USB subclass.
    pub usb_subclass: i32,
    /// USB protocol.
    pub usb_protocol: i32,
    /// Camera library (driver) name.
    pub library: String,
    /// Driver id.
    pub id: String,
}

/// One `(namespace, key, value)` triple for the native settings store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Setting {
    /// Settings namespace, usually the camlib or port driver name.
    pub namespace: String,
    /// Setting key.
    pub key: String,
    /// Setting value.
    pub value: String,
}

impl Setting {
    /// Create a new setting triple.
    #[must_use]
    pub fn new(
        namespace: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Directory listing as `(name, value)` pairs in the order the device reported them.
pub type Listing = Vec<(String, String)>;

/// Error type for camera operations.
#[derive(Debug, Error)]
pub enum CameraError {
    /// A native call returned a negative result code.
    #[error("native call failed: {0}")]
    Native(Status),
    /// A folder listing failed; the names gathered so far are kept.
    #[error("listing {folder} failed with {status} after {} entries", .names.len())]
    PartialListing {
        /// Folder the failing listing started from.
        folder: String,
        /// Names produced before or alongside the failure.
        names: Vec<String>,
        /// First failing native code.
        status: Status,
    },
    /// The file stream was read after being closed.
    #[error("file stream is closed")]
    StreamClosed,
    /// The background event waiter stopped without delivering an event.
    #[error("event wait was abandoned")]
    EventWaitAbandoned,
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Configuration file could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(#[from] toml::de::Error),
}

impl CameraError {
    /// The native result code this error corresponds to, if any.
    #[must_use]
    pub const fn status(&self) -> Option<Status> {
        match self {
            Self::Native(status) | Self::PartialListing { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Result type for camera operations.
pub type Result<T> = std::result::Result<T, CameraError>;

/// The native camera library as seen from one camera/context pair.
///
/// Every method maps to one native call (or a short fixed sequence of them)
/// and reports the native result code unchanged. Implementations own the
/// native handles; all marshaling of strings and buffers stays behind this
/// trait.
///
/// Methods take `&self` so a blocking event wait can run on a background
/// thread while the caller keeps the handle. The native library does not
/// serialize calls on one camera: callers must not issue a second operation
/// while a wait is outstanding, except [`Driver::cancel`].
pub trait Driver: Send + Sync + 'static {
    /// A fetched file whose contents live in a native buffer.
    type File: NativeFile;

    /// A configuration tree fetched from the camera.
    type Config: ConfigTree;

    /// Store one setting in the native settings store.
    fn apply_setting(&self, setting: &Setting) -> Status;

    /// Bind the camera to the port with the given path, e.g. `usb:001,004`.
    fn bind_port(&self, path: &str) -> Status;

    /// Initialize the device.
    fn init(&self) -> Status;

    /// Tear the device down.
    fn exit(&self) -> Status;

    /// Request cancellation of the in-flight operation. Best effort.
    fn cancel(&self);

    /// Query the device's capability descriptor.
    fn abilities(&self) -> std::result::Result<Abilities, Status>;

    /// Fire an asynchronous capture.
    fn trigger_capture(&self) -> Status;

    /// Capture synchronously and report where the result was stored.
    fn capture(&self, kind: CaptureKind) -> std::result::Result<CapturedFilePath, Status>;

    /// Block for at most `timeout` waiting for the next device event.
    ///
    /// The payload is decoded for events that carry a file path.
    fn wait_for_event(
        &self,
        timeout: Duration,
    ) -> std::result::Result<(EventKind, Option<CapturedFilePath>), Status>;

    /// List the folders inside `folder`. Partial output is returned on failure.
    fn list_folders(&self, folder: &str) -> (Listing, Status);

    /// List the files inside `folder`. Partial output is returned on failure.
    fn list_files(&self, folder: &str) -> (Listing, Status);

    /// Fetch the whole content of a file into a native buffer.
    fn get_file(&self, folder: &str, name: &str) -> std::result::Result<Self::File, Status>;

    /// Delete a file on the device.
    fn delete_file(&self, folder: &str, name: &str) -> Status;

    /// Fetch the configuration tree.
    fn config(&self) -> std::result::Result<Self::Config, Status>;

    /// Write back one node of `tree`.
    fn set_single_config<'t>(
        &self,
        key: &str,
        tree: &'t Self::Config,
        node: <Self::Config as ConfigTree>::Node<'t>,
    ) -> Status;

    /// Write back the whole tree.
    fn set_config(&self, tree: &Self::Config) -> Status;

    /// Human readable description of a result code. Needs no device.
    fn describe(status: Status) -> String;
}

/// File content held in a native buffer. Dropping releases the buffer.
pub trait NativeFile: Send {
    /// The full content.
    fn bytes(&self) -> &[u8];
}

/// A configuration tree. Dropping releases the whole tree.
pub trait ConfigTree {
    /// A node borrowed from the tree.
    type Node<'a>: Copy
    where
        Self: 'a;

    /// Find a node by its internal name.
    fn child_by_name(&self, name: &str) -> std::result::Result<Self::Node<'_>, Status>;

    /// Find a node by its display label.
    fn child_by_label(&self, label: &str) -> std::result::Result<Self::Node<'_>, Status>;

    /// Kind of a node. Unknown native kinds are reported as `None`.
    fn kind<'a>(&'a self, node: Self::Node<'a>) -> std::result::Result<Option<WidgetKind>, Status>;

    /// Set a node's value from a string.
    fn set_value<'a>(&'a self, node: Self::Node<'a>, value: &str) -> Status;
}
