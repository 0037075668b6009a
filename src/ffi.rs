//! Raw declarations for the subset of libgphoto2 2.5 used by the driver.
//!
//! Linking is set up by `build.rs`.

#![allow(non_camel_case_types, missing_docs)]

use std::ffi::{c_char, c_int, c_ulong, c_void};

#[repr(C)]
pub struct Camera {
    _private: [u8; 0],
}

#[repr(C)]
pub struct GPContext {
    _private: [u8; 0],
}

#[repr(C)]
pub struct CameraList {
    _private: [u8; 0],
}

#[repr(C)]
pub struct CameraFile {
    _private: [u8; 0],
}

#[repr(C)]
pub struct CameraWidget {
    _private: [u8; 0],
}

#[repr(C)]
pub struct GPPortInfoList {
    _private: [u8; 0],
}

#[repr(C)]
pub struct _GPPortInfo {
    _private: [u8; 0],
}

pub type GPPortInfo = *mut _GPPortInfo;

/// `CameraCaptureType`, `CameraEventType`, `CameraWidgetType` and
/// `CameraFileType` are C enums with `int` representation.
pub type CameraCaptureType = c_int;
pub type CameraEventType = c_int;
pub type CameraWidgetType = c_int;
pub type CameraFileType = c_int;

pub const GP_FILE_TYPE_NORMAL: CameraFileType = 1;

#[repr(C)]
pub struct CameraFilePath {
    pub name: [c_char; 128],
    pub folder: [c_char; 1024],
}

#[repr(C)]
pub struct CameraAbilities {
    pub model: [c_char; 128],
    pub status: c_int,
    pub port: c_int,
    pub speed: [c_int; 64],
    pub operations: c_int,
    pub file_operations: c_int,
    pub folder_operations: c_int,
    pub usb_vendor: c_int,
    pub usb_product: c_int,
    pub usb_class: c_int,
    pub usb_subclass: c_int,
    pub usb_protocol: c_int,
    pub library: [c_char; 1024],
    pub id: [c_char; 1024],
    pub device_type: c_int,
    pub reserved2: c_int,
    pub reserved3: c_int,
    pub reserved4: c_int,
    pub reserved5: c_int,
    pub reserved6: c_int,
    pub reserved7: c_int,
    pub reserved8: c_int,
}

pub type FolderListFn = unsafe extern "C" fn(
    camera: *mut Camera,
    folder: *const c_char,
    list: *mut CameraList,
    context: *mut GPContext,
) -> c_int;

extern "C" {
    // gphoto2-context.h
    pub fn gp_context_new() -> *mut GPContext;
    pub fn gp_context_unref(context: *mut GPContext);
    pub fn gp_context_cancel(context: *mut GPContext);

    // gphoto2-setting.h
    pub fn gp_setting_set(id: *const c_char, key: *const c_char, value: *const c_char) -> c_int;

    // gphoto2-result.h
    pub fn gp_result_as_string(result: c_int) -> *const c_char;

    // gphoto2-camera.h
    pub fn gp_camera_new(camera: *mut *mut Camera) -> c_int;
    pub fn gp_camera_unref(camera: *mut Camera) -> c_int;
    pub fn gp_camera_init(camera: *mut Camera, context: *mut GPContext) -> c_int;
    pub fn gp_camera_exit(camera: *mut Camera, context: *mut GPContext) -> c_int;
    pub fn gp_camera_set_port_info(camera: *mut Camera, info: GPPortInfo) -> c_int;
    pub fn gp_camera_get_abilities(camera: *mut Camera, abilities: *mut CameraAbilities) -> c_int;
    pub fn gp_camera_trigger_capture(camera: *mut Camera, context: *mut GPContext) -> c_int;
    pub fn gp_camera_capture(
        camera: *mut Camera,
        kind: CameraCaptureType,
        path: *mut CameraFilePath,
        context: *mut GPContext,
    ) -> c_int;
    pub fn gp_camera_wait_for_event(
        camera: *mut Camera,
        timeout: c_int,
        event_type: *mut CameraEventType,
        event_data: *mut *mut c_void,
        context: *mut GPContext,
    ) -> c_int;
    pub fn gp_camera_folder_list_folders(
        camera: *mut Camera,
        folder: *const c_char,
        list: *mut CameraList,
        context: *mut GPContext,
    ) -> c_int;
    pub fn gp_camera_folder_list_files(
        camera: *mut Camera,
        folder: *const c_char,
        list: *mut CameraList,
        context: *mut GPContext,
    ) -> c_int;
    pub fn gp_camera_file_get(
        camera: *mut Camera,
        folder: *const c_char,
        file: *const c_char,
        kind: CameraFileType,
        camera_file: *mut CameraFile,
        context: *mut GPContext,
    ) -> c_int;
    pub fn gp_camera_file_delete(
        camera: *mut Camera,
        folder: *const c_char,
        file: *const c_char,
        context: *mut GPContext,
    ) -> c_int;
    pub fn gp_camera_get_config(
        camera: *mut Camera,
        window: *mut *mut CameraWidget,
        context: *mut GPContext,
    ) -> c_int;
    pub fn gp_camera_set_config(
        camera: *mut Camera,
        window: *mut CameraWidget,
        context: *mut GPContext,
    ) -> c_int;
    pub fn gp_camera_set_single_config(
        camera: *mut Camera,
        name: *const c_char,
        widget: *mut CameraWidget,
        context: *mut GPContext,
    ) -> c_int;

    // gphoto2-list.h
    pub fn gp_list_new(list: *mut *mut CameraList) -> c_int;
    pub fn gp_list_free(list: *mut CameraList) -> c_int;
    pub fn gp_list_count(list: *mut CameraList) -> c_int;
    pub fn gp_list_get_name(list: *mut CameraList, index: c_int, name: *mut *const c_char) -> c_int;
    pub fn gp_list_get_value(
        list: *mut CameraList,
        index: c_int,
        value: *mut *const c_char,
    ) -> c_int;

    // gphoto2-file.h
    pub fn gp_file_new(file: *mut *mut CameraFile) -> c_int;
    pub fn gp_file_free(file: *mut CameraFile) -> c_int;
    pub fn gp_file_get_data_and_size(
        file: *mut CameraFile,
        data: *mut *const c_char,
        size: *mut c_ulong,
    ) -> c_int;

    // gphoto2-widget.h
    pub fn gp_widget_free(widget: *mut CameraWidget) -> c_int;
    pub fn gp_widget_get_child_by_name(
        widget: *mut CameraWidget,
        name: *const c_char,
        child: *mut *mut CameraWidget,
    ) -> c_int;
    pub fn gp_widget_get_child_by_label(
        widget: *mut CameraWidget,
        label: *const c_char,
        child: *mut *mut CameraWidget,
    ) -> c_int;
    pub fn gp_widget_get_type(widget: *mut CameraWidget, kind: *mut CameraWidgetType) -> c_int;
    pub fn gp_widget_set_value(widget: *mut CameraWidget, value: *const c_void) -> c_int;

    // gphoto2-port-info-list.h (libgphoto2_port)
    pub fn gp_port_info_list_new(list: *mut *mut GPPortInfoList) -> c_int;
    pub fn gp_port_info_list_free(list: *mut GPPortInfoList) -> c_int;
    pub fn gp_port_info_list_load(list: *mut GPPortInfoList) -> c_int;
    pub fn gp_port_info_list_count(list: *mut GPPortInfoList) -> c_int;
    pub fn gp_port_info_list_lookup_path(list: *mut GPPortInfoList, path: *const c_char) -> c_int;
    pub fn gp_port_info_list_get_info(
        list: *mut GPPortInfoList,
        n: c_int,
        info: *mut GPPortInfo,
    ) -> c_int;
}
