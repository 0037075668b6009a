//! Mock driver implementation for testing without a camera.

use std::cell::RefCell;
use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::traits::{
    Abilities, CaptureKind, CapturedFilePath, ConfigTree, Driver, EventKind, Listing, NativeFile,
    Operations, Setting, Status, WidgetKind,
};

/// What the mock hands back for one event wait.
pub type EventResult = Result<(EventKind, Option<CapturedFilePath>), Status>;

/// A configuration node held by the mock camera.
#[derive(Debug, Clone)]
pub struct MockWidget {
    /// Key matched by name lookups.
    pub name: String,
    /// Key matched by label lookups.
    pub label: String,
    /// Widget type reported to the binding.
    pub kind: WidgetKind,
    /// Current value.
    pub value: String,
}

impl MockWidget {
    /// Build a widget with the given lookup keys, type and value.
    pub fn new(name: &str, label: &str, kind: WidgetKind, value: &str) -> Self {
        Self {
            name: name.to_owned(),
            label: label.to_owned(),
            kind,
            value: value.to_owned(),
        }
    }
}

/// Everything the mock records or serves. Tests inspect it via [`MockDriver::state`].
#[derive(Debug, Default)]
pub struct MockState {
    /// Settings accepted so far, in order.
    pub settings: Vec<Setting>,
    /// Settings rejected by key, with the status to return.
    pub setting_failures: BTreeMap<String, Status>,
    /// Port passed to the last successful bind.
    pub bound_port: Option<String>,
    /// Forced result of port binding.
    pub port_status: Option<Status>,
    /// Forced result of device initialization.
    pub init_status: Option<Status>,
    /// Number of device initializations attempted.
    pub init_calls: usize,
    /// Number of exits.
    pub exit_calls: usize,
    /// Number of cancellation requests.
    pub cancel_calls: usize,
    /// Number of fire-and-forget captures.
    pub trigger_calls: usize,
    /// Kind of every capture, in order.
    pub captures: Vec<CaptureKind>,
    /// Model name reported in the abilities.
    pub model: String,
    /// Subfolder names by folder path (no trailing slash).
    pub folders: BTreeMap<String, Vec<String>>,
    /// File names and contents by folder path.
    pub files: BTreeMap<String, Vec<(String, Vec<u8>)>>,
    /// Folders whose listing returns the given status after the names.
    pub listing_failures: BTreeMap<String, Status>,
    /// Every folder path listed, as received.
    pub listed: Vec<String>,
    /// Every `(folder, name)` deleted.
    pub deleted: Vec<(String, String)>,
    /// Queued event wait results; empty means timeout.
    pub events: VecDeque<EventResult>,
    /// Configuration nodes.
    pub widgets: Vec<MockWidget>,
    /// Forced result of fetching the configuration tree.
    pub config_status: Option<Status>,
    /// Forced result of the single-node write.
    pub single_config_status: Option<Status>,
    /// Forced result of the full-tree write.
    pub full_config_status: Option<Status>,
    /// Number of single-node writes.
    pub single_config_calls: usize,
    /// Number of full-tree writes.
    pub full_config_calls: usize,
}

/// Deterministic in-memory stand-in for libgphoto2.
#[derive(Debug, Default)]
pub struct MockDriver {
    state: Arc<Mutex<MockState>>,
    files_released: Arc<AtomicUsize>,
    trees_released: Arc<AtomicUsize>,
    values_set: Arc<AtomicUsize>,
}

impl MockDriver {
    /// Create an empty mock camera.
    pub fn new() -> Self {
        let driver = Self::default();
        driver.state().model = "Mock EOS 5D".to_owned();
        driver
    }

    /// Lock the mock's state.
    pub fn state(&self) -> MutexGuard<'_, MockState> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Add a folder with the given children (absolute path, no trailing slash).
    #[must_use]
    pub fn with_folder(self, path: &str, children: &[&str]) -> Self {
        self.state().folders.insert(
            path.to_owned(),
            children.iter().map(|child| (*child).to_owned()).collect(),
        );
        self
    }

    /// Add a file to a folder.
    #[must_use]
    pub fn with_file(self, folder: &str, name: &str, data: Vec<u8>) -> Self {
        self.state()
            .files
            .entry(folder.to_owned())
            .or_default()
            .push((name.to_owned(), data));
        self
    }

    /// Add a configuration node.
    #[must_use]
    pub fn with_widget(self, widget: MockWidget) -> Self {
        self.state().widgets.push(widget);
        self
    }

    /// Queue the result of the next event wait.
    #[must_use]
    pub fn with_event(self, event: EventResult) -> Self {
        self.state().events.push_back(event);
        self
    }

    /// Number of native files released so far.
    pub fn files_released(&self) -> usize {
        self.files_released.load(Ordering::SeqCst)
    }

    /// Number of configuration trees released so far.
    pub fn trees_released(&self) -> usize {
        self.trees_released.load(Ordering::SeqCst)
    }

    /// Number of `set_value` calls on any tree.
    pub fn values_set(&self) -> usize {
        self.values_set.load(Ordering::SeqCst)
    }
}

fn strip_slash(folder: &str) -> &str {
    match folder.strip_suffix('/') {
        Some("") | None => folder,
        Some(stripped) => stripped,
    }
}

impl Driver for MockDriver {
    type File = MockFile;
    type Config = MockConfig;

    fn apply_setting(&self, setting: &Setting) -> Status {
        let mut state = self.state();
        if let Some(&status) = state.setting_failures.get(&setting.key) {
            return status;
        }
        state.settings.push(setting.clone());
        Status::OK
    }

    fn bind_port(&self, path: &str) -> Status {
        let mut state = self.state();
        if let Some(status) = state.port_status {
            return status;
        }
        state.bound_port = Some(path.to_owned());
        Status::OK
    }

    fn init(&self) -> Status {
        let mut state = self.state();
        state.init_calls += 1;
        state.init_status.unwrap_or(Status::OK)
    }

    fn exit(&self) -> Status {
        self.state().exit_calls += 1;
        Status::OK
    }

    fn cancel(&self) {
        self.state().cancel_calls += 1;
    }

    fn abilities(&self) -> Result<Abilities, Status> {
        Ok(Abilities {
            model: self.state().model.clone(),
            operations: Operations::CAPTURE_IMAGE | Operations::CONFIG,
            usb_vendor: 0x04a9,
            usb_product: 0x3294,
            library: "mock".to_owned(),
            id: "mock".to_owned(),
            ..Abilities::default()
        })
    }

    fn trigger_capture(&self) -> Status {
        self.state().trigger_calls += 1;
        Status::OK
    }

    fn capture(&self, kind: CaptureKind) -> Result<CapturedFilePath, Status> {
        let mut state = self.state();
        state.captures.push(kind);
        let name = format!("IMG_{:04}.JPG", state.captures.len());
        state
            .files
            .entry("/DCIM/100MOCK".to_owned())
            .or_default()
            .push((name.clone(), vec![0xff, 0xd8, 0xff, 0xd9]));
        Ok(CapturedFilePath::new("/DCIM/100MOCK", name))
    }

    fn wait_for_event(&self, _timeout: Duration) -> EventResult {
        self.state()
            .events
            .pop_front()
            .unwrap_or(Ok((EventKind::Timeout, None)))
    }

    fn list_folders(&self, folder: &str) -> (Listing, Status) {
        let mut state = self.state();
        let key = strip_slash(folder);
        state.listed.push(folder.to_owned());
        let listing = state
            .folders
            .get(key)
            .map(|children| {
                children
                    .iter()
                    .map(|child| (child.clone(), String::new()))
                    .collect()
            })
            .unwrap_or_default();
        let status = state.listing_failures.get(key).copied().unwrap_or(Status::OK);
        (listing, status)
    }

    fn list_files(&self, folder: &str) -> (Listing, Status) {
        let mut state = self.state();
        let key = strip_slash(folder);
        state.listed.push(folder.to_owned());
        let listing = state
            .files
            .get(key)
            .map(|files| {
                files
                    .iter()
                    .map(|(name, _)| (name.clone(), String::new()))
                    .collect()
            })
            .unwrap_or_default();
        let status = state.listing_failures.get(key).copied().unwrap_or(Status::OK);
        (listing, status)
    }

    fn get_file(&self, folder: &str, name: &str) -> Result<MockFile, Status> {
        let state = self.state();
        state
            .files
            .get(strip_slash(folder))
            .and_then(|files| files.iter().find(|(file, _)| file == name))
            .map(|(_, data)| MockFile::new(data.clone(), Arc::clone(&self.files_released)))
            .ok_or(Status::FILE_NOT_FOUND)
    }

    fn delete_file(&self, folder: &str, name: &str) -> Status {
        let mut state = self.state();
        let Some(files) = state.files.get_mut(strip_slash(folder)) else {
            return Status::FILE_NOT_FOUND;
        };
        let before = files.len();
        files.retain(|(file, _)| file != name);
        if files.len() == before {
            return Status::FILE_NOT_FOUND;
        }
        state.deleted.push((folder.to_owned(), name.to_owned()));
        Status::OK
    }

    fn config(&self) -> Result<MockConfig, Status> {
        let state = self.state();
        if let Some(status) = state.config_status {
            return Err(status);
        }
        Ok(MockConfig {
            widgets: RefCell::new(state.widgets.clone()),
            released: Arc::clone(&self.trees_released),
            values_set: Arc::clone(&self.values_set),
        })
    }

    fn set_single_config<'t>(&self, _key: &str, tree: &'t MockConfig, node: usize) -> Status {
        let mut state = self.state();
        state.single_config_calls += 1;
        let status = state.single_config_status.unwrap_or(Status::OK);
        if status == Status::OK {
            if let (Some(stored), Some(changed)) =
                (state.widgets.get_mut(node), tree.widgets.borrow().get(node))
            {
                stored.value.clone_from(&changed.value);
            }
        }
        status
    }

    fn set_config(&self, tree: &MockConfig) -> Status {
        let mut state = self.state();
        state.full_config_calls += 1;
        let status = state.full_config_status.unwrap_or(Status::OK);
        if status.is_ok() {
            state.widgets = tree.widgets.borrow().clone();
        }
        status
    }

    fn describe(status: Status) -> String {
        match status {
            Status::OK => "No error".to_owned(),
            Status::BAD_PARAMETERS => "Bad parameters".to_owned(),
            Status::FILE_NOT_FOUND => "File not found".to_owned(),
            other => format!("Unknown error {}", other.code()),
        }
    }
}

/// Mock native file; counts its release.
#[derive(Debug)]
pub struct MockFile {
    data: Vec<u8>,
    released: Arc<AtomicUsize>,
}

impl MockFile {
    /// Wrap `data`; dropping the file bumps `released`.
    pub fn new(data: Vec<u8>, released: Arc<AtomicUsize>) -> Self {
        Self { data, released }
    }
}

impl NativeFile for MockFile {
    fn bytes(&self) -> &[u8] {
        &self.data
    }
}

impl Drop for MockFile {
    fn drop(&mut self) {
        self.released.fetch_add(1, Ordering::SeqCst);
    }
}

/// Mock configuration tree; a snapshot of the driver's widgets.
#[derive(Debug)]
pub struct MockConfig {
    widgets: RefCell<Vec<MockWidget>>,
    released: Arc<AtomicUsize>,
    values_set: Arc<AtomicUsize>,
}

impl ConfigTree for MockConfig {
    type Node<'a> = usize;

    fn child_by_name(&self, name: &str) -> Result<usize, Status> {
        self.widgets
            .borrow()
            .iter()
            .position(|widget| widget.name == name)
            .ok_or(Status::BAD_PARAMETERS)
    }

    fn child_by_label(&self, label: &str) -> Result<usize, Status> {
        self.widgets
            .borrow()
            .iter()
            .position(|widget| widget.label == label)
            .ok_or(Status::BAD_PARAMETERS)
    }

    fn kind<'a>(&'a self, node: usize) -> Result<Option<WidgetKind>, Status> {
        self.widgets
            .borrow()
            .get(node)
            .map(|widget| Some(widget.kind))
            .ok_or(Status::BAD_PARAMETERS)
    }

    fn set_value<'a>(&'a self, node: usize, value: &str) -> Status {
        self.values_set.fetch_add(1, Ordering::SeqCst);
        match self.widgets.borrow_mut().get_mut(node) {
            Some(widget) => {
                value.clone_into(&mut widget.value);
                Status::OK
            }
            None => Status::BAD_PARAMETERS,
        }
    }
}

impl Drop for MockConfig {
    fn drop(&mut self) {
        self.released.fetch_add(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_listing_ignores_trailing_slash() {
        let driver = MockDriver::new().with_folder("/DCIM", &["100CANON"]);
        let (listing, status) = driver.list_folders("/DCIM/");
        assert_eq!(status, Status::OK);
        assert_eq!(listing, [("100CANON".to_owned(), String::new())]);
    }

    #[test]
    fn test_mock_capture_creates_file() {
        let driver = MockDriver::new();
        let path = driver
            .capture(CaptureKind::Image)
            .expect("capture should succeed");
        let file = driver
            .get_file(&path.folder, &path.name)
            .expect("captured file should exist");
        assert_eq!(file.bytes().to_vec(), vec![0xff_u8, 0xd8, 0xff, 0xd9]);
    }

    #[test]
    fn test_mock_events_default_to_timeout() {
        let driver = MockDriver::new();
        let event = driver
            .wait_for_event(Duration::from_millis(1))
            .expect("wait should succeed");
        assert_eq!(event, (EventKind::Timeout, None));
    }
}
