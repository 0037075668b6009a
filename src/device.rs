//! libgphoto2 driver implementation.

#![allow(unsafe_code)]

use std::ffi::{c_char, c_int, c_ulong, c_void, CStr, CString};
use std::marker::PhantomData;
use std::ptr::{self, NonNull};
use std::sync::OnceLock;
use std::time::Duration;

use tracing::debug;

use crate::ffi;
use crate::traits::{
    Abilities, CameraError, CaptureKind, CapturedFilePath, ConfigTree, Driver, EventKind,
    Listing, NativeFile, Operations, Result, Setting, Status, WidgetKind,
};

/// Port list shared by every camera in the process.
///
/// Built on the first explicit port bind and never refreshed, so ports that
/// appear later are not found.
static PORT_INFO_LIST: OnceLock<PortInfoList> = OnceLock::new();

fn check(code: c_int) -> std::result::Result<c_int, Status> {
    if code < 0 {
        Err(Status(code))
    } else {
        Ok(code)
    }
}

fn collapse(result: std::result::Result<c_int, Status>) -> Status {
    result.map_or_else(|status| status, Status)
}

fn c_string(value: &str) -> std::result::Result<CString, Status> {
    CString::new(value).map_err(|_| Status::BAD_PARAMETERS)
}

/// Read a NUL-terminated string out of a fixed-size C array.
fn fixed_str(buf: &[c_char]) -> String {
    #[allow(clippy::cast_sign_loss)]
    let bytes: Vec<u8> = buf
        .iter()
        .take_while(|&&c| c != 0)
        .map(|&c| c as u8)
        .collect();
    String::from_utf8_lossy(&bytes).into_owned()
}

/// Copy a borrowed C string.
///
/// # Safety
/// `ptr` must be null or point to a valid NUL-terminated string.
unsafe fn borrowed_str(ptr: *const c_char) -> String {
    if ptr.is_null() {
        return String::new();
    }
    CStr::from_ptr(ptr).to_string_lossy().into_owned()
}

fn file_path(raw: &ffi::CameraFilePath) -> CapturedFilePath {
    CapturedFilePath {
        name: fixed_str(&raw.name),
        folder: fixed_str(&raw.folder),
    }
}

/// Human readable description of a libgphoto2 result code.
pub fn result_as_string(status: Status) -> String {
    // SAFETY: gp_result_as_string returns a static string for any input.
    unsafe { borrowed_str(ffi::gp_result_as_string(status.code())) }
}

/// One camera/context pair owned through libgphoto2.
///
/// Both handles are created by [`GPhotoDriver::new`] and released together
/// on drop.
///
/// # Concurrency
///
/// The driver is shared between threads (the event waiter holds it through
/// an `Arc`) but does no locking. libgphoto2 does not serialize calls on a
/// camera, so callers must not run two driver calls on the same value at
/// once. The one exception is [`Driver::cancel`], which only flags the
/// context and may be called while another call is in flight. Breaking this
/// rule corrupts the camera's protocol state inside libgphoto2.
#[derive(Debug)]
pub struct GPhotoDriver {
    context: NonNull<ffi::GPContext>,
    camera: NonNull<ffi::Camera>,
}

// SAFETY: the handles are heap objects owned by this value and libgphoto2
// does not bind them to a thread.
unsafe impl Send for GPhotoDriver {}
// SAFETY: relies on the contract in the type docs: at most one driver call
// at a time, apart from gp_context_cancel which only sets a flag.
unsafe impl Sync for GPhotoDriver {}

impl GPhotoDriver {
    /// Allocate a fresh context and camera object.
    pub fn new() -> Result<Self> {
        // SAFETY: plain constructors; ownership of the results passes to us.
        let context = NonNull::new(unsafe { ffi::gp_context_new() })
            .ok_or(CameraError::Native(Status::NO_MEMORY))?;

        let mut camera = ptr::null_mut();
        let code = unsafe { ffi::gp_camera_new(&mut camera) };
        match (check(code), NonNull::new(camera)) {
            (Ok(_), Some(camera)) => Ok(Self { context, camera }),
            (result, _) => {
                // SAFETY: context was created above and is not shared.
                unsafe { ffi::gp_context_unref(context.as_ptr()) };
                Err(CameraError::Native(result.err().unwrap_or(Status::NO_MEMORY)))
            }
        }
    }

    fn camera(&self) -> *mut ffi::Camera {
        self.camera.as_ptr()
    }

    fn context(&self) -> *mut ffi::GPContext {
        self.context.as_ptr()
    }

    fn bind(&self, path: &str) -> std::result::Result<c_int, Status> {
        let path = c_string(path)?;
        let list = port_info_list()?;
        let info = list.lookup(&path)?;
        // SAFETY: info belongs to the process-wide list which is never freed.
        check(unsafe { ffi::gp_camera_set_port_info(self.camera(), info) })
    }

    fn list(&self, folder: &str, call: ffi::FolderListFn) -> (Listing, Status) {
        let folder = match c_string(folder) {
            Ok(folder) => folder,
            Err(status) => return (Vec::new(), status),
        };
        let list = match List::new() {
            Ok(list) => list,
            Err(status) => return (Vec::new(), status),
        };

        // SAFETY: all pointers are live for the duration of the call.
        let code =
            unsafe { call(self.camera(), folder.as_ptr(), list.as_ptr(), self.context()) };
        (list.entries(), Status(code))
    }

    fn fetch(&self, folder: &str, name: &str) -> std::result::Result<GPhotoFile, Status> {
        let folder = c_string(folder)?;
        let name = c_string(name)?;
        let mut file = GPhotoFile::new()?;

        // SAFETY: file is a live CameraFile owned by `file`, released on drop
        // if any step fails.
        check(unsafe {
            ffi::gp_camera_file_get(
                self.camera(),
                folder.as_ptr(),
                name.as_ptr(),
                ffi::GP_FILE_TYPE_NORMAL,
                file.as_ptr(),
                self.context(),
            )
        })?;
        file.load()?;
        Ok(file)
    }
}

impl Drop for GPhotoDriver {
    fn drop(&mut self) {
        // SAFETY: both handles were created in `new` and are released once.
        unsafe {
            ffi::gp_camera_unref(self.camera());
            ffi::gp_context_unref(self.context());
        }
    }
}

impl Driver for GPhotoDriver {
    type File = GPhotoFile;
    type Config = GPhotoConfig;

    fn apply_setting(&self, setting: &Setting) -> Status {
        let triple = (
            c_string(&setting.namespace),
            c_string(&setting.key),
            c_string(&setting.value),
        );
        let (Ok(namespace), Ok(key), Ok(value)) = triple else {
            return Status::BAD_PARAMETERS;
        };
        // SAFETY: the settings store copies the strings.
        Status(unsafe { ffi::gp_setting_set(namespace.as_ptr(), key.as_ptr(), value.as_ptr()) })
    }

    fn bind_port(&self, path: &str) -> Status {
        collapse(self.bind(path))
    }

    fn init(&self) -> Status {
        // SAFETY: live camera and context.
        Status(unsafe { ffi::gp_camera_init(self.camera(), self.context()) })
    }

    fn exit(&self) -> Status {
        // SAFETY: live camera and context.
        Status(unsafe { ffi::gp_camera_exit(self.camera(), self.context()) })
    }

    fn cancel(&self) {
        // SAFETY: live context; cancellation only flags it.
        unsafe { ffi::gp_context_cancel(self.context()) };
    }

    fn abilities(&self) -> std::result::Result<Abilities, Status> {
        // SAFETY: CameraAbilities is plain integers and char arrays, so all
        // zeroes is a valid value.
        let mut raw: ffi::CameraAbilities = unsafe { std::mem::zeroed() };
        check(unsafe { ffi::gp_camera_get_abilities(self.camera(), &mut raw) })?;

        #[allow(clippy::cast_sign_loss)]
        let operations = Operations::from_bits_truncate(raw.operations as u32);
        Ok(Abilities {
            model: fixed_str(&raw.model),
            status: raw.status,
            port: raw.port,
            operations,
            usb_vendor: raw.usb_vendor,
            usb_product: raw.usb_product,
            usb_class: raw.usb_class,
            usb_subclass: raw.usb_subclass,
            usb_protocol: raw.usb_protocol,
            library: fixed_str(&raw.library),
            id: fixed_str(&raw.id),
        })
    }

    fn trigger_capture(&self) -> Status {
        // SAFETY: live camera and context.
        Status(unsafe { ffi::gp_camera_trigger_capture(self.camera(), self.context()) })
    }

    fn capture(&self, kind: CaptureKind) -> std::result::Result<CapturedFilePath, Status> {
        // SAFETY: CameraFilePath is two char arrays; zeroed is valid.
        let mut raw: ffi::CameraFilePath = unsafe { std::mem::zeroed() };
        check(unsafe {
            ffi::gp_camera_capture(self.camera(), kind.as_raw(), &mut raw, self.context())
        })?;
        Ok(file_path(&raw))
    }

    fn wait_for_event(
        &self,
        timeout: Duration,
    ) -> std::result::Result<(EventKind, Option<CapturedFilePath>), Status> {
        let millis = c_int::try_from(timeout.as_millis()).unwrap_or(c_int::MAX);
        let mut raw_kind: ffi::CameraEventType = 0;
        let mut data: *mut c_void = ptr::null_mut();

        // SAFETY: live camera and context; out-pointers are valid locals.
        let code = unsafe {
            ffi::gp_camera_wait_for_event(
                self.camera(),
                millis,
                &mut raw_kind,
                &mut data,
                self.context(),
            )
        };

        let kind = EventKind::from_raw(raw_kind);
        let carries_path = matches!(
            kind,
            EventKind::FileAdded | EventKind::FolderAdded | EventKind::FileChanged
        );
        let payload = if carries_path && !data.is_null() {
            // SAFETY: for these event kinds the payload is a CameraFilePath.
            Some(file_path(unsafe { &*data.cast::<ffi::CameraFilePath>() }))
        } else {
            None
        };
        if !data.is_null() {
            // SAFETY: the payload is malloc'd by libgphoto2 and handed to us.
            unsafe { libc::free(data) };
        }

        check(code)?;
        debug!(?kind, "camera event");
        Ok((kind, payload))
    }

    fn list_folders(&self, folder: &str) -> (Listing, Status) {
        self.list(folder, ffi::gp_camera_folder_list_folders)
    }

    fn list_files(&self, folder: &str) -> (Listing, Status) {
        self.list(folder, ffi::gp_camera_folder_list_files)
    }

    fn get_file(&self, folder: &str, name: &str) -> std::result::Result<GPhotoFile, Status> {
        self.fetch(folder, name)
    }

    fn delete_file(&self, folder: &str, name: &str) -> Status {
        let (Ok(folder), Ok(name)) = (c_string(folder), c_string(name)) else {
            return Status::BAD_PARAMETERS;
        };
        // SAFETY: live camera and context; strings outlive the call.
        Status(unsafe {
            ffi::gp_camera_file_delete(self.camera(), folder.as_ptr(), name.as_ptr(), self.context())
        })
    }

    fn config(&self) -> std::result::Result<GPhotoConfig, Status> {
        let mut root = ptr::null_mut();
        // SAFETY: live camera and context; ownership of the tree passes to us.
        check(unsafe { ffi::gp_camera_get_config(self.camera(), &mut root, self.context()) })?;
        NonNull::new(root)
            .map(|root| GPhotoConfig { root })
            .ok_or(Status::NO_MEMORY)
    }

    fn set_single_config<'t>(
        &self,
        key: &str,
        _tree: &'t GPhotoConfig,
        node: WidgetRef<'t>,
    ) -> Status {
        let Ok(key) = c_string(key) else {
            return Status::BAD_PARAMETERS;
        };
        // SAFETY: node is borrowed from a live tree.
        Status(unsafe {
            ffi::gp_camera_set_single_config(
                self.camera(),
                key.as_ptr(),
                node.ptr.as_ptr(),
                self.context(),
            )
        })
    }

    fn set_config(&self, tree: &GPhotoConfig) -> Status {
        // SAFETY: live camera, context and tree.
        Status(unsafe { ffi::gp_camera_set_config(self.camera(), tree.root.as_ptr(), self.context()) })
    }

    fn describe(status: Status) -> String {
        result_as_string(status)
    }
}

/// A `CameraList` released on drop.
struct List(NonNull<ffi::CameraList>);

impl List {
    fn new() -> std::result::Result<Self, Status> {
        let mut raw = ptr::null_mut();
        // SAFETY: out-pointer is a valid local.
        check(unsafe { ffi::gp_list_new(&mut raw) })?;
        NonNull::new(raw).map(Self).ok_or(Status::NO_MEMORY)
    }

    fn as_ptr(&self) -> *mut ffi::CameraList {
        self.0.as_ptr()
    }

    /// Copy out every entry. Names and values stay owned by the list.
    fn entries(&self) -> Listing {
        // SAFETY: live list.
        let count = unsafe { ffi::gp_list_count(self.as_ptr()) };
        (0..count.max(0))
            .map(|index| {
                let mut name = ptr::null();
                let mut value = ptr::null();
                // SAFETY: index is in range; the returned strings are valid
                // until the list is modified or freed.
                unsafe {
                    ffi::gp_list_get_name(self.as_ptr(), index, &mut name);
                    ffi::gp_list_get_value(self.as_ptr(), index, &mut value);
                    (borrowed_str(name), borrowed_str(value))
                }
            })
            .collect()
    }
}

impl Drop for List {
    fn drop(&mut self) {
        // SAFETY: created in `new`, released once.
        unsafe { ffi::gp_list_free(self.as_ptr()) };
    }
}

/// A camera file whose content has been downloaded into a native buffer.
#[derive(Debug)]
pub struct GPhotoFile {
    file: NonNull<ffi::CameraFile>,
    data: *const u8,
    size: usize,
}

// SAFETY: the CameraFile and its buffer are owned exclusively by this value
// and never touched by libgphoto2 again until we free them.
unsafe impl Send for GPhotoFile {}

impl GPhotoFile {
    fn new() -> std::result::Result<Self, Status> {
        let mut raw = ptr::null_mut();
        // SAFETY: out-pointer is a valid local.
        check(unsafe { ffi::gp_file_new(&mut raw) })?;
        let file = NonNull::new(raw).ok_or(Status::NO_MEMORY)?;
        Ok(Self {
            file,
            data: ptr::null(),
            size: 0,
        })
    }

    fn as_ptr(&self) -> *mut ffi::CameraFile {
        self.file.as_ptr()
    }

    fn load(&mut self) -> std::result::Result<(), Status> {
        let mut data: *const c_char = ptr::null();
        let mut size: c_ulong = 0;
        // SAFETY: live file; the buffer stays owned by it.
        check(unsafe { ffi::gp_file_get_data_and_size(self.as_ptr(), &mut data, &mut size) })?;
        self.data = data.cast();
        self.size = usize::try_from(size).map_err(|_| Status::NO_MEMORY)?;
        Ok(())
    }
}

impl NativeFile for GPhotoFile {
    fn bytes(&self) -> &[u8] {
        if self.data.is_null() || self.size == 0 {
            return &[];
        }
        // SAFETY: data/size come from gp_file_get_data_and_size and the
        // buffer lives as long as the CameraFile we own.
        unsafe { std::slice::from_raw_parts(self.data, self.size) }
    }
}

impl Drop for GPhotoFile {
    fn drop(&mut self) {
        // SAFETY: freeing the file also frees its data buffer.
        unsafe { ffi::gp_file_free(self.as_ptr()) };
    }
}

/// Root of a configuration tree, released on drop.
#[derive(Debug)]
pub struct GPhotoConfig {
    root: NonNull<ffi::CameraWidget>,
}

/// A widget inside a [`GPhotoConfig`].
#[derive(Debug, Clone, Copy)]
pub struct WidgetRef<'a> {
    ptr: NonNull<ffi::CameraWidget>,
    _tree: PhantomData<&'a GPhotoConfig>,
}

impl GPhotoConfig {
    fn child(
        &self,
        key: &str,
        lookup: unsafe extern "C" fn(
            *mut ffi::CameraWidget,
            *const c_char,
            *mut *mut ffi::CameraWidget,
        ) -> c_int,
    ) -> std::result::Result<WidgetRef<'_>, Status> {
        let key = c_string(key)?;
        let mut child = ptr::null_mut();
        // SAFETY: live tree; the child pointer is owned by the tree.
        check(unsafe { lookup(self.root.as_ptr(), key.as_ptr(), &mut child) })?;
        NonNull::new(child)
            .map(|ptr| WidgetRef {
                ptr,
                _tree: PhantomData,
            })
            .ok_or(Status::BAD_PARAMETERS)
    }
}

impl ConfigTree for GPhotoConfig {
    type Node<'a> = WidgetRef<'a>;

    fn child_by_name(&self, name: &str) -> std::result::Result<WidgetRef<'_>, Status> {
        self.child(name, ffi::gp_widget_get_child_by_name)
    }

    fn child_by_label(&self, label: &str) -> std::result::Result<WidgetRef<'_>, Status> {
        self.child(label, ffi::gp_widget_get_child_by_label)
    }

    fn kind<'a>(&'a self, node: WidgetRef<'a>) -> std::result::Result<Option<WidgetKind>, Status> {
        let mut raw: ffi::CameraWidgetType = 0;
        // SAFETY: node is borrowed from this live tree.
        check(unsafe { ffi::gp_widget_get_type(node.ptr.as_ptr(), &mut raw) })?;
        Ok(WidgetKind::from_raw(raw))
    }

    fn set_value<'a>(&'a self, node: WidgetRef<'a>, value: &str) -> Status {
        let Ok(value) = c_string(value) else {
            return Status::BAD_PARAMETERS;
        };
        // SAFETY: text, menu and radio widgets copy the string.
        Status(unsafe { ffi::gp_widget_set_value(node.ptr.as_ptr(), value.as_ptr().cast()) })
    }
}

impl Drop for GPhotoConfig {
    fn drop(&mut self) {
        // SAFETY: the root owns every child; released once.
        unsafe { ffi::gp_widget_free(self.root.as_ptr()) };
    }
}

/// The process-wide `GPPortInfoList`.
struct PortInfoList(NonNull<ffi::GPPortInfoList>);

// SAFETY: after loading, the list is only read.
unsafe impl Send for PortInfoList {}
unsafe impl Sync for PortInfoList {}

impl PortInfoList {
    fn load() -> std::result::Result<Self, Status> {
        let mut raw = ptr::null_mut();
        // SAFETY: out-pointer is a valid local.
        check(unsafe { ffi::gp_port_info_list_new(&mut raw) })?;
        let list = Self(NonNull::new(raw).ok_or(Status::NO_MEMORY)?);

        // SAFETY: live list; on error `list` is dropped and freed.
        check(unsafe { ffi::gp_port_info_list_load(list.0.as_ptr()) })?;
        let count = check(unsafe { ffi::gp_port_info_list_count(list.0.as_ptr()) })?;
        debug!(count, "loaded port info list");
        Ok(list)
    }

    fn lookup(&self, path: &CStr) -> std::result::Result<ffi::GPPortInfo, Status> {
        // SAFETY: live list, valid C string.
        let index = check(unsafe { ffi::gp_port_info_list_lookup_path(self.0.as_ptr(), path.as_ptr()) })?;
        let mut info = ptr::null_mut();
        check(unsafe { ffi::gp_port_info_list_get_info(self.0.as_ptr(), index, &mut info) })?;
        Ok(info)
    }
}

impl Drop for PortInfoList {
    fn drop(&mut self) {
        // SAFETY: only reached for a list that lost the initialization race
        // or failed to load; the shared list lives for the whole process.
        unsafe { ffi::gp_port_info_list_free(self.0.as_ptr()) };
    }
}

fn port_info_list() -> std::result::Result<&'static PortInfoList, Status> {
    if let Some(list) = PORT_INFO_LIST.get() {
        return Ok(list);
    }
    let list = PortInfoList::load()?;
    Ok(PORT_INFO_LIST.get_or_init(|| list))
}
