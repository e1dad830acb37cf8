//! Native windows through the Win32 API.
//!
//! Every window created here uses one window procedure. It finds the
//! [`MessageTarget`] for a window in a per-thread table; the target for a
//! window that is still being created is bound by the first message the
//! window receives.

use super::*;
use crate::msg::MessageId;
use core::mem::{size_of, zeroed};
use core::ptr::{null, null_mut};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Instant;
use tracing::{debug, error, trace};
use widestring::{U16CString, U16String};
use windows_sys::Win32::Foundation::{
    GetLastError, HINSTANCE, HWND, LPARAM, LRESULT, POINT, RECT, WPARAM,
};
use windows_sys::Win32::Graphics::Gdi::{
    CombineRgn, CreateFontW, CreateRectRgn, DeleteObject, ScreenToClient, SetWindowRgn,
    CLIP_DEFAULT_PRECIS, COLOR_WINDOW, DEFAULT_CHARSET, DEFAULT_PITCH, FW_NORMAL, HFONT,
    OUT_DEFAULT_PRECIS, RGN_OR,
};
use windows_sys::Win32::System::LibraryLoader::GetModuleHandleW;
use windows_sys::Win32::UI::Input::KeyboardAndMouse::{EnableWindow, GetFocus, SetFocus};
use windows_sys::Win32::UI::WindowsAndMessaging::{
    CreateWindowExW, DefWindowProcW, DestroyWindow, DispatchMessageW, GetClientRect, GetParent,
    GetWindowLongW, GetWindowRect, GetWindowTextLengthW, GetWindowTextW, IsChild, IsWindow,
    LoadCursorW, MsgWaitForMultipleObjects, PeekMessageW, PostMessageW, PostQuitMessage,
    RegisterClassExW, RegisterWindowMessageW, SendMessageW, SetParent, SetWindowLongW,
    SetWindowPos, SetWindowTextW, ShowWindow, TranslateMessage, CS_HREDRAW, CS_VREDRAW,
    GWL_EXSTYLE, GWL_STYLE, IDC_ARROW, MSG, PM_REMOVE, QS_ALLINPUT, SWP_NOACTIVATE,
    SWP_NOZORDER, SW_HIDE, SW_SHOW, WM_QUIT, WM_SETFONT, WNDCLASSEXW,
};

const ERROR_CLASS_ALREADY_EXISTS: u32 = 1410;
const INFINITE: u32 = u32::MAX;
const MAX_CREATION_CAPTION: usize = 32_767;

thread_local! {
    static TARGETS: RefCell<HashMap<usize, Rc<dyn MessageTarget>>> = RefCell::new(HashMap::new());
    static PENDING_TARGET: RefCell<Option<Rc<dyn MessageTarget>>> = const { RefCell::new(None) };
    static REGISTERED_CLASSES: RefCell<HashSet<String>> = RefCell::new(HashSet::new());
}

fn hwnd(handle: NativeHandle) -> HWND {
    handle.as_raw() as HWND
}

fn from_hwnd(hwnd: HWND) -> Option<NativeHandle> {
    NativeHandle::from_raw(hwnd as usize)
}

fn last_error(what: &str) -> NativeError {
    let code = unsafe { GetLastError() };
    NativeError::new(code, format!("{} failed", what))
}

fn wide(s: &str) -> Result<U16CString, NativeError> {
    U16CString::from_str(s)
        .map_err(|_| NativeError::new(87, format!("string contains a NUL character: {:?}", s)))
}

unsafe extern "system" fn control_wndproc(
    hwnd: HWND,
    message: u32,
    wparam: WPARAM,
    lparam: LPARAM,
) -> LRESULT {
    let key = hwnd as usize;
    let target = TARGETS.with(|t| t.borrow().get(&key).cloned()).or_else(|| {
        let pending = PENDING_TARGET.with(|p| p.borrow_mut().take())?;
        TARGETS.with(|t| t.borrow_mut().insert(key, Rc::clone(&pending)));
        Some(pending)
    });

    let result = match (target, from_hwnd(hwnd)) {
        (Some(target), Some(handle)) => {
            let raw = RawMessage::new(MessageId(message), wparam, lparam);
            match catch_unwind(AssertUnwindSafe(|| target.wnd_proc(handle, &raw))) {
                Ok(Some(result)) => result,
                Ok(None) => DefWindowProcW(hwnd, message, wparam, lparam),
                Err(_) => {
                    error!("window procedure panicked on message {:#06x}", message);
                    DefWindowProcW(hwnd, message, wparam, lparam)
                }
            }
        }
        _ => DefWindowProcW(hwnd, message, wparam, lparam),
    };

    if message == MessageId::NC_DESTROY.0 {
        TARGETS.with(|t| t.borrow_mut().remove(&key));
    }
    result
}

struct Win32Poster;

impl MessagePoster for Win32Poster {
    fn post(&self, handle: NativeHandle, msg: RawMessage) -> Result<(), NativeError> {
        if unsafe { PostMessageW(hwnd(handle), msg.id.0, msg.wparam, msg.lparam) } == 0 {
            return Err(last_error("PostMessageW"));
        }
        Ok(())
    }
}

pub struct Win32Platform {
    instance: HINSTANCE,
    fonts: RefCell<HashMap<Font, HFONT>>,
}

static_assertions::assert_not_impl_any!(Win32Platform: Send, Sync);

impl Win32Platform {
    pub fn new() -> Result<Self, NativeError> {
        let instance = unsafe { GetModuleHandleW(null()) };
        if instance.is_null() {
            return Err(last_error("GetModuleHandleW"));
        }
        Ok(Self {
            instance,
            fonts: RefCell::new(HashMap::new()),
        })
    }

    fn register_class(&self, class_name: &str) -> Result<(), NativeError> {
        if REGISTERED_CLASSES.with(|r| r.borrow().contains(class_name)) {
            return Ok(());
        }
        let name = wide(class_name)?;
        unsafe {
            let mut class_ex: WNDCLASSEXW = zeroed();
            class_ex.cbSize = size_of::<WNDCLASSEXW>() as u32;
            class_ex.hInstance = self.instance;
            class_ex.lpszClassName = name.as_ptr();
            class_ex.style = CS_HREDRAW | CS_VREDRAW;
            class_ex.hbrBackground = (COLOR_WINDOW + 1) as usize as _;
            class_ex.lpfnWndProc = Some(control_wndproc);
            class_ex.hCursor = LoadCursorW(null_mut(), IDC_ARROW);

            if RegisterClassExW(&class_ex) == 0 {
                let e = last_error("RegisterClassExW");
                if e.code != ERROR_CLASS_ALREADY_EXISTS {
                    return Err(e);
                }
            }
        }
        debug!("registered window class {:?}", class_name);
        REGISTERED_CLASSES.with(|r| r.borrow_mut().insert(class_name.to_string()));
        Ok(())
    }

    fn font_handle(&self, font: &Font) -> Result<HFONT, NativeError> {
        if let Some(hfont) = self.fonts.borrow().get(font) {
            return Ok(*hfont);
        }
        let face = wide(font.face_name())?;
        let hfont = unsafe {
            CreateFontW(
                font.height(),
                font.width(),
                0,
                0,
                FW_NORMAL as _,
                font.is_italic() as _,
                font.is_underline() as _,
                font.is_strikeout() as _,
                DEFAULT_CHARSET as _,
                OUT_DEFAULT_PRECIS as _,
                CLIP_DEFAULT_PRECIS as _,
                font.quality().to_native() as _,
                DEFAULT_PITCH as _,
                face.as_ptr(),
            )
        };
        if hfont.is_null() {
            return Err(last_error("CreateFontW"));
        }
        self.fonts.borrow_mut().insert(font.clone(), hfont);
        Ok(hfont)
    }
}

impl Drop for Win32Platform {
    fn drop(&mut self) {
        for (_, hfont) in self.fonts.borrow_mut().drain() {
            unsafe {
                DeleteObject(hfont);
            }
        }
    }
}

impl Platform for Win32Platform {
    fn create_window(
        &self,
        params: &CreateParams,
        target: Rc<dyn MessageTarget>,
    ) -> Result<NativeHandle, NativeError> {
        self.register_class(&params.class_name)?;
        let class_name = wide(&params.class_name)?;
        let caption = wide(&params.caption)?;

        PENDING_TARGET.with(|p| *p.borrow_mut() = Some(target));
        let created = unsafe {
            CreateWindowExW(
                params.ex_style.bits(),
                class_name.as_ptr(),
                caption.as_ptr(),
                params.style.bits(),
                params.x,
                params.y,
                params.width,
                params.height,
                params.parent.map_or(null_mut(), hwnd),
                null_mut(),
                self.instance,
                null(),
            )
        };
        // Unbound if the window never received a message.
        PENDING_TARGET.with(|p| p.borrow_mut().take());

        from_hwnd(created).ok_or_else(|| last_error("CreateWindowExW"))
    }

    fn destroy_window(&self, handle: NativeHandle) -> Result<(), NativeError> {
        if unsafe { DestroyWindow(hwnd(handle)) } == 0 {
            return Err(last_error("DestroyWindow"));
        }
        Ok(())
    }

    fn is_window(&self, handle: NativeHandle) -> bool {
        unsafe { IsWindow(hwnd(handle)) != 0 }
    }

    fn set_parent(
        &self,
        child: NativeHandle,
        parent: Option<NativeHandle>,
    ) -> Result<(), NativeError> {
        let previous = unsafe { SetParent(hwnd(child), parent.map_or(null_mut(), hwnd)) };
        if previous.is_null() {
            let e = last_error("SetParent");
            if e.code != 0 {
                return Err(e);
            }
        }
        Ok(())
    }

    fn parent(&self, handle: NativeHandle) -> Option<NativeHandle> {
        from_hwnd(unsafe { GetParent(hwnd(handle)) })
    }

    fn is_child(&self, parent: NativeHandle, child: NativeHandle) -> bool {
        unsafe { IsChild(hwnd(parent), hwnd(child)) != 0 }
    }

    fn send_message(&self, handle: NativeHandle, msg: RawMessage) -> isize {
        unsafe { SendMessageW(hwnd(handle), msg.id.0, msg.wparam, msg.lparam) }
    }

    fn default_window_proc(&self, handle: NativeHandle, msg: &RawMessage) -> isize {
        unsafe { DefWindowProcW(hwnd(handle), msg.id.0, msg.wparam, msg.lparam) }
    }

    fn register_message(&self, name: &str) -> Result<MessageId, NativeError> {
        let name = wide(name)?;
        match unsafe { RegisterWindowMessageW(name.as_ptr()) } {
            0 => Err(last_error("RegisterWindowMessageW")),
            id => Ok(MessageId(id)),
        }
    }

    fn poster(&self) -> Arc<dyn MessagePoster> {
        Arc::new(Win32Poster)
    }

    fn window_text(&self, handle: NativeHandle) -> String {
        unsafe {
            let len = GetWindowTextLengthW(hwnd(handle));
            if len <= 0 {
                return String::new();
            }
            let mut buffer = vec![0u16; len as usize + 1];
            let copied = GetWindowTextW(hwnd(handle), buffer.as_mut_ptr(), buffer.len() as i32);
            buffer.truncate(copied.max(0) as usize);
            U16String::from_vec(buffer).to_string_lossy()
        }
    }

    fn set_window_text(&self, handle: NativeHandle, text: &str) -> Result<(), NativeError> {
        let text = wide(text)?;
        if unsafe { SetWindowTextW(hwnd(handle), text.as_ptr()) } == 0 {
            return Err(last_error("SetWindowTextW"));
        }
        Ok(())
    }

    fn max_creation_caption(&self) -> usize {
        MAX_CREATION_CAPTION
    }

    fn window_rect(&self, handle: NativeHandle) -> Option<Rect> {
        unsafe {
            let mut rect: RECT = zeroed();
            if GetWindowRect(hwnd(handle), &mut rect) == 0 {
                return None;
            }
            let mut top_left = POINT {
                x: rect.left,
                y: rect.top,
            };
            if let Some(parent) = self.parent(handle) {
                ScreenToClient(hwnd(parent), &mut top_left);
            }
            Some(Rect::new(
                top_left.x,
                top_left.y,
                rect.right - rect.left,
                rect.bottom - rect.top,
            ))
        }
    }

    fn client_size(&self, handle: NativeHandle) -> Option<Size> {
        unsafe {
            let mut rect: RECT = zeroed();
            if GetClientRect(hwnd(handle), &mut rect) == 0 {
                return None;
            }
            Some(Size::new(rect.right - rect.left, rect.bottom - rect.top))
        }
    }

    fn set_window_pos(&self, handle: NativeHandle, bounds: Rect) -> Result<(), NativeError> {
        let ok = unsafe {
            SetWindowPos(
                hwnd(handle),
                null_mut(),
                bounds.x,
                bounds.y,
                bounds.width,
                bounds.height,
                SWP_NOZORDER | SWP_NOACTIVATE,
            )
        };
        if ok == 0 {
            return Err(last_error("SetWindowPos"));
        }
        Ok(())
    }

    fn style(&self, handle: NativeHandle) -> WindowStyle {
        let bits = unsafe { GetWindowLongW(hwnd(handle), GWL_STYLE) } as u32;
        WindowStyle::from_bits_retain(bits)
    }

    fn set_style(&self, handle: NativeHandle, style: WindowStyle) -> Result<(), NativeError> {
        unsafe {
            SetWindowLongW(hwnd(handle), GWL_STYLE, style.bits() as i32);
        }
        Ok(())
    }

    fn extended_style(&self, handle: NativeHandle) -> ExStyle {
        let bits = unsafe { GetWindowLongW(hwnd(handle), GWL_EXSTYLE) } as u32;
        ExStyle::from_bits_retain(bits)
    }

    fn set_extended_style(&self, handle: NativeHandle, style: ExStyle) -> Result<(), NativeError> {
        unsafe {
            SetWindowLongW(hwnd(handle), GWL_EXSTYLE, style.bits() as i32);
        }
        Ok(())
    }

    fn set_window_region(
        &self,
        handle: NativeHandle,
        region: Option<&Region>,
    ) -> Result<(), NativeError> {
        let hrgn = match region {
            None => null_mut(),
            Some(region) => unsafe {
                let combined = CreateRectRgn(0, 0, 0, 0);
                for r in region.rects() {
                    let part = CreateRectRgn(r.x, r.y, r.right(), r.bottom());
                    CombineRgn(combined, combined, part, RGN_OR);
                    DeleteObject(part);
                }
                combined
            },
        };
        // The system owns the region after a successful call.
        if unsafe { SetWindowRgn(hwnd(handle), hrgn, 1) } == 0 {
            if !hrgn.is_null() {
                unsafe {
                    DeleteObject(hrgn);
                }
            }
            return Err(last_error("SetWindowRgn"));
        }
        Ok(())
    }

    fn set_window_font(&self, handle: NativeHandle, font: &Font) -> Result<(), NativeError> {
        let hfont = self.font_handle(font)?;
        unsafe {
            SendMessageW(hwnd(handle), WM_SETFONT, hfont as usize, 1);
        }
        Ok(())
    }

    fn show_window(&self, handle: NativeHandle, visible: bool) {
        unsafe {
            ShowWindow(hwnd(handle), if visible { SW_SHOW } else { SW_HIDE });
        }
    }

    fn enable_window(&self, handle: NativeHandle, enabled: bool) {
        unsafe {
            EnableWindow(hwnd(handle), enabled as i32);
        }
    }

    fn focused(&self) -> Option<NativeHandle> {
        from_hwnd(unsafe { GetFocus() })
    }

    fn set_focus(&self, handle: NativeHandle) -> Result<(), NativeError> {
        if unsafe { SetFocus(hwnd(handle)) }.is_null() {
            let e = last_error("SetFocus");
            if e.code != 0 {
                return Err(e);
            }
        }
        Ok(())
    }

    fn next_message(&self, timeout: Option<Duration>) -> Retrieved {
        let deadline = timeout.map(|t| Instant::now() + t);
        loop {
            unsafe {
                let mut msg: MSG = zeroed();
                if PeekMessageW(&mut msg, null_mut(), 0, 0, PM_REMOVE) != 0 {
                    if msg.message == WM_QUIT {
                        return Retrieved::Quit(msg.wParam as i32);
                    }
                    return Retrieved::Message {
                        handle: from_hwnd(msg.hwnd),
                        msg: RawMessage::new(MessageId(msg.message), msg.wParam, msg.lParam),
                    };
                }

                let wait_ms = match deadline {
                    None => INFINITE,
                    Some(deadline) => {
                        let now = Instant::now();
                        if now >= deadline {
                            return Retrieved::Empty;
                        }
                        (deadline - now).as_millis().min(INFINITE as u128 - 1) as u32
                    }
                };
                MsgWaitForMultipleObjects(0, null(), 0, wait_ms, QS_ALLINPUT);
            }
        }
    }

    fn dispatch(&self, handle: Option<NativeHandle>, msg: RawMessage) {
        trace!("dispatch {:?} to {:?}", msg.id, handle);
        unsafe {
            let mut native: MSG = zeroed();
            native.hwnd = handle.map_or(null_mut(), hwnd);
            native.message = msg.id.0;
            native.wParam = msg.wparam;
            native.lParam = msg.lparam;
            TranslateMessage(&native);
            DispatchMessageW(&native);
        }
    }

    fn post_quit(&self, exit_code: i32) {
        unsafe { PostQuitMessage(exit_code) }
    }
}
