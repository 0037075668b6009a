//! Owning camera handle built on top of a [`Driver`].

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::BindingConfig;
use crate::event::EventReceiver;
use crate::reader::FileReader;
use crate::traits::{
    Abilities, CameraError, CameraEvent, CaptureKind, CapturedFilePath, ConfigTree, Driver,
    Result, Setting, Status,
};

/// A camera/context pair and the operations the binding offers on it.
///
/// The handle is not internally locked. Apart from [`Camera::cancel`], do not
/// issue another operation while an [`Camera::async_wait_for_event`] is
/// outstanding, and do not share one handle between threads that call it
/// at the same time. Native drivers rely on this for soundness.
#[derive(Debug)]
pub struct Camera<D: Driver> {
    driver: Arc<D>,
}

impl<D: Driver> Camera<D> {
    /// Wrap a driver. The device is not usable until [`Camera::init`].
    pub fn new(driver: D) -> Self {
        Self {
            driver: Arc::new(driver),
        }
    }

    /// Access the underlying driver.
    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Apply `settings` in order, bind to `port` if it is non-empty, then
    /// initialize the device.
    pub fn init(&self, settings: &[Setting], port: &str) -> Result<()> {
        for setting in settings {
            debug!(namespace = %setting.namespace, key = %setting.key, "applying setting");
            self.driver.apply_setting(setting).check()?;
        }

        if !port.is_empty() {
            debug!(port, "binding camera to port");
            self.driver.bind_port(port).check()?;
        }

        self.driver.init().check()?;
        info!(port, "camera initialized");
        Ok(())
    }

    /// [`Camera::init`] with the settings and port from a configuration file.
    pub fn init_with(&self, config: &BindingConfig) -> Result<()> {
        self.init(&config.settings, config.port.as_deref().unwrap_or_default())
    }

    /// Tear the device down.
    pub fn exit(&self) -> Result<()> {
        self.driver.exit().check()?;
        info!("camera exited");
        Ok(())
    }

    /// Request cancellation of the in-flight native operation.
    ///
    /// Only a request: the running call may still complete normally.
    pub fn cancel(&self) {
        debug!("cancellation requested");
        self.driver.cancel();
    }

    /// The device's capability descriptor.
    pub fn abilities(&self) -> Result<Abilities> {
        self.driver.abilities().map_err(CameraError::Native)
    }

    /// The camera model name.
    pub fn model(&self) -> Result<String> {
        self.abilities().map(|abilities| abilities.model)
    }

    /// Human readable description of a native result code.
    pub fn result_to_string(status: Status) -> String {
        D::describe(status)
    }

    /// Fire a capture without waiting for the resulting file.
    pub fn trigger_capture(&self) -> Result<()> {
        self.driver.trigger_capture().check()
    }

    /// Capture a still image and return where the camera stored it.
    pub fn trigger_capture_to_file(&self) -> Result<CapturedFilePath> {
        let path = self
            .driver
            .capture(CaptureKind::Image)
            .map_err(CameraError::Native)?;
        debug!(folder = %path.folder, name = %path.name, "captured image");
        Ok(path)
    }

    /// Wait for the next device event on a background thread.
    ///
    /// The returned receiver yields exactly one event after at most
    /// `timeout` of native waiting.
    pub fn async_wait_for_event(&self, timeout: Duration) -> Result<EventReceiver> {
        let (tx, rx) = EventReceiver::channel();
        let driver = Arc::clone(&self.driver);

        thread::Builder::new()
            .name("gphoto-event-wait".to_owned())
            .spawn(move || {
                let event = driver
                    .wait_for_event(timeout)
                    .map(|(kind, payload)| CameraEvent::classify(kind, payload))
                    .map_err(|status| {
                        warn!(%status, "waiting for camera event failed");
                        CameraError::Native(status)
                    });
                // The caller may have stopped listening.
                let _ = tx.send(event);
            })?;

        Ok(rx)
    }

    /// Names of the folders directly inside `path` (`/` when empty).
    ///
    /// On failure the names produced so far are returned inside
    /// [`CameraError::PartialListing`].
    pub fn list_folders(&self, path: &str) -> Result<Vec<String>> {
        let folder = if path.is_empty() { "/" } else { path };
        let (names, status) = self.folder_names(folder);
        partial(folder, names, status)
    }

    /// Names of the files directly inside `path` (`/` when empty).
    pub fn list_files(&self, path: &str) -> Result<Vec<String>> {
        let folder = with_trailing_slash(path);
        debug!(folder = %folder, "listing files");
        let (listing, status) = self.driver.list_files(&folder);
        let names = listing.into_iter().map(|(name, _)| name).collect();
        partial(&folder, names, status)
    }

    /// Every folder below `path`, depth first, parents before children.
    ///
    /// Each entry is the full path with a trailing `/`. A failing listing
    /// does not stop the walk; the first failure is reported at the end
    /// together with everything collected.
    pub fn recursive_list_folders(&self, path: &str) -> Result<Vec<String>> {
        let root = with_trailing_slash(path);
        let mut folders = Vec::new();
        let mut failure = None;
        self.walk_folders(&root, &mut folders, &mut failure);

        match failure {
            None => Ok(folders),
            Some(status) => Err(CameraError::PartialListing {
                folder: root,
                names: folders,
                status,
            }),
        }
    }

    fn walk_folders(&self, path: &str, folders: &mut Vec<String>, failure: &mut Option<Status>) {
        let (children, status) = self.folder_names(path);
        if !status.is_ok() {
            failure.get_or_insert(status);
        }

        for child in children {
            let child_path = format!("{path}{child}/");
            folders.push(child_path.clone());
            self.walk_folders(&child_path, folders, failure);
        }
    }

    fn folder_names(&self, folder: &str) -> (Vec<String>, Status) {
        debug!(folder, "listing folders");
        let (listing, status) = self.driver.list_folders(folder);
        (listing.into_iter().map(|(name, _)| name).collect(), status)
    }

    /// Fetch a file and return a reader over its content.
    ///
    /// The whole file is transferred before this returns.
    pub fn file_reader(&self, folder: &str, name: &str) -> Result<FileReader<D::File>> {
        debug!(folder, name, "fetching file");
        let file = self
            .driver
            .get_file(folder, name)
            .map_err(CameraError::Native)?;
        Ok(FileReader::new(file, folder, name))
    }

    /// Delete a file on the device. Empty names are rejected.
    pub fn delete_file(&self, folder: &str, name: &str) -> Result<()> {
        if folder.is_empty() || name.is_empty() {
            return Err(CameraError::Native(Status::BAD_PARAMETERS));
        }
        debug!(folder, name, "deleting file");
        self.driver.delete_file(folder, name).check()
    }

    /// Set a menu, text or radio setting by name or label and store it on
    /// the camera.
    pub fn set_config(&self, key: &str, value: &str) -> Result<()> {
        let tree = self.driver.config().map_err(|status| {
            warn!(%status, "fetching camera configuration failed");
            CameraError::Native(status)
        })?;

        self.write_config(&tree, key, value).check()
    }

    fn write_config(&self, tree: &D::Config, key: &str, value: &str) -> Status {
        let node = match tree
            .child_by_name(key)
            .or_else(|_| tree.child_by_label(key))
        {
            Ok(node) => node,
            Err(status) => {
                warn!(key, %status, "configuration widget not found");
                return status;
            }
        };

        match tree.kind(node) {
            Ok(Some(kind)) if kind.accepts_text() => {}
            Ok(kind) => {
                warn!(key, ?kind, "configuration widget has unsupported type");
                return Status::BAD_PARAMETERS;
            }
            Err(status) => {
                warn!(key, %status, "querying widget type failed");
                return status;
            }
        }

        let status = tree.set_value(node, value);
        debug!(key, value, %status, "config value set");
        if !status.is_ok() {
            return status;
        }

        let status = self.driver.set_single_config(key, tree, node);
        if status == Status::OK {
            return status;
        }

        warn!(key, %status, "single widget write failed, writing whole configuration");
        self.driver.set_config(tree)
    }
}

fn partial(folder: &str, names: Vec<String>, status: Status) -> Result<Vec<String>> {
    if status.is_ok() {
        Ok(names)
    } else {
        Err(CameraError::PartialListing {
            folder: folder.to_owned(),
            names,
            status,
        })
    }
}

fn with_trailing_slash(path: &str) -> String {
    if path.ends_with('/') {
        path.to_owned()
    } else {
        format!("{path}/")
    }
}
