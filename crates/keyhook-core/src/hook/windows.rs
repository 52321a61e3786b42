// Keyhook Windows Hook
// WH_KEYBOARD_LL hook on a dedicated message-loop thread

use std::cell::RefCell;
use std::sync::mpsc;
use std::thread::{self, JoinHandle};

use ::windows::Win32::Foundation::{LPARAM, LRESULT, WPARAM};
use ::windows::Win32::System::LibraryLoader::GetModuleHandleW;
use ::windows::Win32::System::Threading::GetCurrentThreadId;
use ::windows::Win32::UI::WindowsAndMessaging::{
    CallNextHookEx, GetMessageW, PeekMessageW, PostThreadMessageW, SetWindowsHookExW,
    UnhookWindowsHookEx, KBDLLHOOKSTRUCT, MSG, PM_NOREMOVE, WH_KEYBOARD_LL, WM_KEYDOWN, WM_KEYUP,
    WM_QUIT, WM_SYSKEYDOWN, WM_SYSKEYUP, WM_USER,
};

use super::{HookAdapter, HookCallback, HookError, HookHandle, KeyEvent, Transition};
use crate::Key;

thread_local! {
    // Low-level hook procs get no user data pointer; the callback lives with
    // the thread that installed the hook, which is also the thread Windows
    // calls the proc on.
    static THREAD_CALLBACK: RefCell<Option<HookCallback>> = const { RefCell::new(None) };
}

/// Windows hook adapter.
///
/// `install` spawns a thread that calls `SetWindowsHookExW(WH_KEYBOARD_LL)`
/// and pumps messages; Windows delivers every keystroke to that thread
/// before dispatching it. Returning `true` from the callback swallows the
/// event. The callback must return well within the system's
/// LowLevelHooksTimeout or Windows silently removes the hook.
pub struct LowLevelHook {
    active: Option<ActiveHook>,
    next_id: u64,
}

struct ActiveHook {
    id: u64,
    thread_id: u32,
    thread: JoinHandle<()>,
}

impl LowLevelHook {
    pub fn new() -> Self {
        Self {
            active: None,
            next_id: 0,
        }
    }

    pub fn is_installed(&self) -> bool {
        self.active.is_some()
    }

    fn stop_active(&mut self) {
        if let Some(active) = self.active.take() {
            let posted = unsafe {
                PostThreadMessageW(active.thread_id, WM_QUIT, WPARAM(0), LPARAM(0))
            };
            if let Err(e) = posted {
                // Keep the handle so a later uninstall or drop can retry
                log::error!("Failed to stop hook thread: {}", e);
                self.active = Some(active);
                return;
            }
            if active.thread.join().is_err() {
                log::error!("Keyboard hook thread panicked");
            }
            log::debug!("Low-level hook {} uninstalled", active.id);
        }
    }
}

impl Default for LowLevelHook {
    fn default() -> Self {
        Self::new()
    }
}

impl HookAdapter for LowLevelHook {
    fn install(&mut self, callback: HookCallback) -> Result<HookHandle, HookError> {
        if self.active.is_some() {
            return Err(HookError::AlreadyInstalled);
        }

        let (ready_tx, ready_rx) = mpsc::channel::<Result<u32, String>>();
        let thread = thread::Builder::new()
            .name("keyhook-ll-hook".to_string())
            .spawn(move || run_hook_thread(callback, ready_tx))?;

        let thread_id = match ready_rx.recv() {
            Ok(Ok(thread_id)) => thread_id,
            Ok(Err(reason)) => {
                let _ = thread.join();
                return Err(HookError::Install(reason));
            }
            Err(_) => {
                let _ = thread.join();
                return Err(HookError::Install("hook thread exited early".to_string()));
            }
        };

        self.next_id += 1;
        let id = self.next_id;
        self.active = Some(ActiveHook {
            id,
            thread_id,
            thread,
        });
        log::debug!("Low-level hook {} installed on thread {}", id, thread_id);
        Ok(HookHandle::new(id))
    }

    fn uninstall(&mut self, handle: HookHandle) {
        if matches!(&self.active, Some(active) if active.id == handle.id()) {
            self.stop_active();
        }
    }
}

impl Drop for LowLevelHook {
    fn drop(&mut self) {
        self.stop_active();
    }
}

fn run_hook_thread(callback: HookCallback, ready: mpsc::Sender<Result<u32, String>>) {
    THREAD_CALLBACK.with(|slot| *slot.borrow_mut() = Some(callback));

    let hook = unsafe {
        // Force creation of this thread's message queue so WM_QUIT can be posted
        let mut msg = MSG::default();
        let _ = PeekMessageW(&mut msg, None, WM_USER, WM_USER, PM_NOREMOVE);

        GetModuleHandleW(None).and_then(|module| {
            SetWindowsHookExW(WH_KEYBOARD_LL, Some(keyboard_proc), Some(module.into()), 0)
        })
    };

    let hook = match hook {
        Ok(hook) => hook,
        Err(e) => {
            let _ = ready.send(Err(e.to_string()));
            return;
        }
    };

    let _ = ready.send(Ok(unsafe { GetCurrentThreadId() }));

    let mut msg = MSG::default();
    // 0 means WM_QUIT, -1 an error; both end the loop
    while unsafe { GetMessageW(&mut msg, None, 0, 0) }.0 > 0 {}

    if let Err(e) = unsafe { UnhookWindowsHookEx(hook) } {
        log::warn!("UnhookWindowsHookEx failed: {}", e);
    }
    THREAD_CALLBACK.with(|slot| slot.borrow_mut().take());
}

unsafe extern "system" fn keyboard_proc(code: i32, wparam: WPARAM, lparam: LPARAM) -> LRESULT {
    if code >= 0 {
        let message = wparam.0 as u32;
        let transition = match message {
            WM_KEYDOWN | WM_SYSKEYDOWN => Some(Transition::Down),
            WM_KEYUP | WM_SYSKEYUP => Some(Transition::Up),
            _ => None,
        };

        if let Some(transition) = transition {
            let info = &*(lparam.0 as *const KBDLLHOOKSTRUCT);
            let event = KeyEvent::new(Key::from(info.vkCode as u16), transition)
                .with_system(matches!(message, WM_SYSKEYDOWN | WM_SYSKEYUP));

            let suppress = THREAD_CALLBACK.with(|slot| match slot.try_borrow_mut() {
                Ok(mut callback) => callback.as_mut().is_some_and(|cb| cb(event)),
                Err(_) => false,
            });
            if suppress {
                return LRESULT(1);
            }
        }
    }
    CallNextHookEx(None, code, wparam, lparam)
}
