//! Real backend built on the macOS Accessibility API.
//!
//! Window attributes come from `AXUIElement` queries and change
//! notifications from per-application `AXObserver`s. Observer run loop
//! sources live on a dedicated thread; the extern "C" callbacks forward
//! into the coordinator's event channel through a process-wide sender.
//!
//! Accessibility gives no stable window identifier, so windows are keyed by
//! `CFHash` of their `AXUIElementRef`. Hashes are stable for the lifetime
//! of the element, which is exactly the lifetime the monitor needs.

use std::collections::HashMap;
use std::ffi::{CStr, c_void};
use std::os::raw::c_char;
use std::ptr;
use std::sync::{Mutex, Once};

use accessibility_sys::{
    AXError, AXUIElementCopyAttributeValue, AXUIElementCreateApplication, AXUIElementRef,
    AXUIElementSetMessagingTimeout, kAXErrorSuccess, kAXMinimizedAttribute, kAXTitleAttribute,
    kAXWindowsAttribute,
};
use cocoa::base::{id, nil};
use core_foundation::array::CFArray;
use core_foundation::base::{CFType, TCFType};
use core_foundation::boolean::CFBoolean;
use core_foundation::dictionary::CFDictionary;
use core_foundation::runloop::CFRunLoop;
use core_foundation::string::CFString;
use core_foundation_sys::base::{CFHash, CFRelease, CFRetain, CFTypeRef};
use core_foundation_sys::runloop::{
    CFRunLoopAddSource, CFRunLoopRef, CFRunLoopRemoveSource, CFRunLoopRunInMode,
    CFRunLoopSourceRef, CFRunLoopWakeUp, kCFRunLoopDefaultMode,
};
use core_foundation_sys::string::CFStringRef;
use objc::{class, msg_send, sel, sel_impl};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, warn};

use crate::process;
use crate::system::errors::SystemError;
use crate::system::traits::WindowSystem;
use crate::system::types::{ActivationPolicy, AppInfo, Pid, Subscription, SystemEvent};
use crate::window::types::{WindowId, WindowSnapshot};

/// Timeout for AX messaging (seconds). An application that is busy or hung
/// must not stall the monitor.
const AX_MESSAGING_TIMEOUT: f32 = 1.0;

/// How long each run loop pass waits for observer sources (seconds).
const RUN_LOOP_PASS_SECS: f64 = 0.25;

// Observer API not exposed through the accessibility_sys re-exports we use.
// The framework is already linked by accessibility_sys.
type AXObserverRef = *mut c_void;

unsafe extern "C" {
    fn AXObserverCreate(
        application: i32,
        callback: extern "C" fn(AXObserverRef, AXUIElementRef, CFStringRef, *mut c_void),
        out_observer: *mut AXObserverRef,
    ) -> AXError;
    fn AXObserverAddNotification(
        observer: AXObserverRef,
        element: AXUIElementRef,
        notification: CFStringRef,
        refcon: *mut c_void,
    ) -> AXError;
    fn AXObserverRemoveNotification(
        observer: AXObserverRef,
        element: AXUIElementRef,
        notification: CFStringRef,
    ) -> AXError;
    fn AXObserverGetRunLoopSource(observer: AXObserverRef) -> CFRunLoopSourceRef;
    fn AXIsProcessTrusted() -> bool;
    fn AXIsProcessTrustedWithOptions(options: CFTypeRef) -> bool;
    fn AXValueGetValue(value: CFTypeRef, value_type: u32, value_ptr: *mut c_void) -> bool;
}

/// `kAXValueCGSizeType` from AXValue.h.
const AX_VALUE_CGSIZE_TYPE: u32 = 2;

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
struct CgSize {
    width: f64,
    height: f64,
}

const WINDOW_CREATED_NOTIFICATION: &str = "AXWindowCreated";
const ELEMENT_DESTROYED_NOTIFICATION: &str = "AXUIElementDestroyed";

/// Live observer registration for one application.
///
/// Raw CF pointers stored as `usize` so the entry can live in a global map
/// and be released from whichever thread drops the subscription handle. The
/// pointers are valid until the entry is removed and released.
struct ObserverEntry {
    observer: usize,
    app_element: usize,
    /// Retained window elements with a destroyed-notification registration,
    /// keyed by window hash. Pruned against the live listing so the set
    /// stays bounded by the number of open windows.
    window_elements: HashMap<u64, usize>,
}

static EVENT_SENDER: Mutex<Option<UnboundedSender<SystemEvent>>> = Mutex::new(None);
static OBSERVERS: Mutex<Option<HashMap<i32, ObserverEntry>>> = Mutex::new(None);
static OBSERVER_RUN_LOOP: Mutex<Option<usize>> = Mutex::new(None);
static OBSERVER_THREAD: Once = Once::new();

/// [`WindowSystem`] backed by the Accessibility API and NSWorkspace.
#[derive(Debug, Clone, Copy, Default)]
pub struct MacosSystem;

impl MacosSystem {
    pub fn new() -> Self {
        Self
    }
}

impl WindowSystem for MacosSystem {
    fn own_pid(&self) -> Pid {
        Pid(std::process::id() as i32)
    }

    fn is_trusted(&self) -> bool {
        // SAFETY: No arguments, returns a plain bool.
        unsafe { AXIsProcessTrusted() }
    }

    fn request_trust_prompt(&self) {
        let options = CFDictionary::from_CFType_pairs(&[(
            CFString::new("AXTrustedCheckOptionPrompt").as_CFType(),
            CFBoolean::true_value().as_CFType(),
        )]);
        // SAFETY: options is a valid CFDictionaryRef for the duration of
        // the call.
        unsafe {
            AXIsProcessTrustedWithOptions(options.as_concrete_TypeRef() as CFTypeRef);
        }
    }

    fn running_apps(&self) -> Vec<AppInfo> {
        let mut apps = Vec::new();

        // SAFETY: Standard NSWorkspace enumeration. All returned objects
        // are autoreleased borrows valid for the duration of this call.
        unsafe {
            let workspace: id = msg_send![class!(NSWorkspace), sharedWorkspace];
            let running: id = msg_send![workspace, runningApplications];
            let count: usize = msg_send![running, count];

            for index in 0..count {
                let app: id = msg_send![running, objectAtIndex: index];
                let pid: i32 = msg_send![app, processIdentifier];
                if pid <= 0 {
                    continue;
                }
                let policy: isize = msg_send![app, activationPolicy];
                let name: id = msg_send![app, localizedName];
                let bundle: id = msg_send![app, bundleIdentifier];

                apps.push(AppInfo {
                    pid: Pid(pid),
                    name: nsstring_to_string(name).unwrap_or_default(),
                    bundle_id: nsstring_to_string(bundle),
                    policy: activation_policy_from_raw(policy),
                });
            }
        }

        apps
    }

    fn windows(&self, pid: Pid) -> Vec<WindowId> {
        let ids: Vec<WindowId> = with_window_elements(pid.0, |elements| {
            elements
                .iter()
                // SAFETY: CFHash on a valid element reference.
                .map(|&element| WindowId(unsafe { CFHash(element as CFTypeRef) } as u64))
                .collect()
        })
        .unwrap_or_default();

        // Every check lists windows, so this keeps retained elements for
        // destroyed windows from accumulating while the app stays watched.
        prune_destroyed_elements(pid.0, &ids);
        ids
    }

    fn snapshot(&self, pid: Pid, window: WindowId) -> Option<WindowSnapshot> {
        with_window_elements(pid.0, |elements| {
            elements
                .iter()
                // SAFETY: CFHash on a valid element reference.
                .find(|&&element| unsafe { CFHash(element as CFTypeRef) } as u64 == window.0)
                .map(|&element| read_snapshot(element, window))
        })
        .flatten()
    }

    fn attach(&self, events: UnboundedSender<SystemEvent>) {
        *lock(&EVENT_SENDER) = Some(events);
        ensure_observer_thread();
    }

    fn subscribe(&self, pid: Pid) -> Result<Subscription, SystemError> {
        let run_loop = lock(&OBSERVER_RUN_LOOP)
            .ok_or_else(|| SystemError::SubscriptionRejected {
                pid,
                message: "observer thread not running; attach first".to_string(),
            })?;

        let mut observer: AXObserverRef = ptr::null_mut();
        // SAFETY: AXObserverCreate writes a +1 retained observer on success.
        let err = unsafe { AXObserverCreate(pid.0, observer_callback, &mut observer) };
        if err != kAXErrorSuccess || observer.is_null() {
            return Err(SystemError::SubscriptionRejected {
                pid,
                message: format!("AXObserverCreate failed (AXError: {})", err),
            });
        }

        // SAFETY: Creates a +1 retained AXUIElementRef for the application.
        let app_element = unsafe { AXUIElementCreateApplication(pid.0) };
        if app_element.is_null() {
            // SAFETY: Release the observer we own (Create Rule).
            unsafe { CFRelease(observer as CFTypeRef) };
            return Err(SystemError::AppUnreachable { pid });
        }
        // SAFETY: app_element is a valid AXUIElementRef we just created.
        unsafe { AXUIElementSetMessagingTimeout(app_element, AX_MESSAGING_TIMEOUT) };

        let created = CFString::new(WINDOW_CREATED_NOTIFICATION);
        // refcon carries the pid; the callback has no other context.
        // SAFETY: observer and app_element are valid, the notification
        // string outlives the call.
        let err = unsafe {
            AXObserverAddNotification(
                observer,
                app_element,
                created.as_concrete_TypeRef(),
                pid.0 as isize as *mut c_void,
            )
        };
        if err != kAXErrorSuccess {
            // SAFETY: Release both refs we own (Create Rule).
            unsafe {
                CFRelease(observer as CFTypeRef);
                CFRelease(app_element as CFTypeRef);
            }
            return Err(SystemError::SubscriptionRejected {
                pid,
                message: format!(
                    "AXObserverAddNotification({}) failed (AXError: {})",
                    WINDOW_CREATED_NOTIFICATION, err
                ),
            });
        }

        // SAFETY: The source belongs to the observer; adding it to the
        // observer thread's run loop and waking that loop is the documented
        // cross-thread registration pattern.
        unsafe {
            let source = AXObserverGetRunLoopSource(observer);
            CFRunLoopAddSource(run_loop as CFRunLoopRef, source, kCFRunLoopDefaultMode);
            CFRunLoopWakeUp(run_loop as CFRunLoopRef);
        }

        observers_map(|map| {
            map.insert(
                pid.0,
                ObserverEntry {
                    observer: observer as usize,
                    app_element: app_element as usize,
                    window_elements: HashMap::new(),
                },
            );
        });

        debug!(event = "core.system.macos.subscribed", pid = %pid);

        let raw_pid = pid.0;
        Ok(Subscription::new(move || release_subscription(raw_pid)))
    }

    fn observe_window(&self, pid: Pid, window: WindowId) {
        let Some(element) = find_window_element(pid.0, window) else {
            debug!(
                event = "core.system.macos.observe_window_missing",
                pid = %pid,
                window_id = %window
            );
            return;
        };

        observers_map(|map| {
            let Some(entry) = map.get_mut(&pid.0) else {
                // SAFETY: Balance the retain taken by find_window_element.
                unsafe { CFRelease(element as CFTypeRef) };
                return;
            };
            if entry.window_elements.contains_key(&window.0) {
                // SAFETY: Already registered; drop the duplicate retain.
                unsafe { CFRelease(element as CFTypeRef) };
                return;
            }

            let destroyed = CFString::new(ELEMENT_DESTROYED_NOTIFICATION);
            // SAFETY: observer and element are valid retained references.
            let err = unsafe {
                AXObserverAddNotification(
                    entry.observer as AXObserverRef,
                    element,
                    destroyed.as_concrete_TypeRef(),
                    pid.0 as isize as *mut c_void,
                )
            };
            if err == kAXErrorSuccess {
                entry.window_elements.insert(window.0, element as usize);
            } else {
                debug!(
                    event = "core.system.macos.observe_window_failed",
                    pid = %pid,
                    window_id = %window,
                    ax_error = err
                );
                // SAFETY: Registration failed; drop our retain.
                unsafe { CFRelease(element as CFTypeRef) };
            }
        });
    }

    fn request_terminate(&self, pid: Pid) -> Result<(), SystemError> {
        // Prefer the Cocoa terminate request, which runs the target's
        // ordinary quit path (save prompts included). Fall back to SIGTERM
        // when the application is not known to the workspace.
        // SAFETY: Standard NSRunningApplication lookup; nil means the
        // process already exited.
        let asked = unsafe {
            let app: id = msg_send![
                class!(NSRunningApplication),
                runningApplicationWithProcessIdentifier: pid.0
            ];
            if app == nil {
                debug!(event = "core.system.macos.terminate_target_gone", pid = %pid);
                return Ok(());
            }
            let ok: bool = msg_send![app, terminate];
            ok
        };

        if asked {
            debug!(event = "core.system.macos.terminate_requested", pid = %pid);
            return Ok(());
        }

        warn!(
            event = "core.system.macos.terminate_fallback_sigterm",
            pid = %pid
        );
        process::terminate_gracefully(pid.0).map_err(|e| SystemError::TerminateFailed {
            pid,
            message: e.to_string(),
        })
    }
}

/// Forwarder from observer notifications to the event channel.
extern "C" fn observer_callback(
    _observer: AXObserverRef,
    element: AXUIElementRef,
    notification: CFStringRef,
    refcon: *mut c_void,
) {
    let pid = Pid(refcon as isize as i32);
    // SAFETY: notification is a borrowed CFStringRef owned by the caller.
    let name = unsafe { CFString::wrap_under_get_rule(notification) }.to_string();

    let event = match name.as_str() {
        WINDOW_CREATED_NOTIFICATION => {
            // SAFETY: element is valid for the duration of the callback.
            let window = WindowId(unsafe { CFHash(element as CFTypeRef) } as u64);
            SystemEvent::WindowCreated { pid, window }
        }
        ELEMENT_DESTROYED_NOTIFICATION => SystemEvent::WindowDestroyed { pid },
        _ => return,
    };

    if let Some(sender) = lock(&EVENT_SENDER).as_ref() {
        // A closed receiver means the coordinator is shutting down.
        let _ = sender.send(event);
    }
}

/// Run observer sources on a dedicated thread. Subscriptions come and go,
/// so the loop polls instead of exiting when no sources remain.
fn ensure_observer_thread() {
    OBSERVER_THREAD.call_once(|| {
        std::thread::Builder::new()
            .name("ax-observer".to_string())
            .spawn(|| {
                let run_loop = CFRunLoop::get_current();
                *lock(&OBSERVER_RUN_LOOP) = Some(run_loop.as_concrete_TypeRef() as usize);
                loop {
                    // SAFETY: Runs the current thread's run loop for one
                    // pass; sources are added from other threads followed
                    // by a wake-up.
                    unsafe {
                        CFRunLoopRunInMode(kCFRunLoopDefaultMode, RUN_LOOP_PASS_SECS, 0);
                    }
                }
            })
            .expect("failed to spawn ax-observer thread");

        // Wait for the thread to publish its run loop so the first
        // subscribe cannot race it.
        while lock(&OBSERVER_RUN_LOOP).is_none() {
            std::thread::yield_now();
        }
    });
}

fn release_subscription(pid: i32) {
    let Some(entry) = observers_map(|map| map.remove(&pid)) else {
        return;
    };

    let observer = entry.observer as AXObserverRef;
    let app_element = entry.app_element as AXUIElementRef;
    let created = CFString::new(WINDOW_CREATED_NOTIFICATION);
    let destroyed = CFString::new(ELEMENT_DESTROYED_NOTIFICATION);

    // Best effort: the application may already be gone, in which case the
    // remove calls fail harmlessly.
    // SAFETY: All references were retained when the entry was created and
    // are released exactly once here.
    unsafe {
        AXObserverRemoveNotification(observer, app_element, created.as_concrete_TypeRef());
        for &element in entry.window_elements.values() {
            AXObserverRemoveNotification(
                observer,
                element as AXUIElementRef,
                destroyed.as_concrete_TypeRef(),
            );
            CFRelease(element as CFTypeRef);
        }

        if let Some(run_loop) = *lock(&OBSERVER_RUN_LOOP) {
            let source = AXObserverGetRunLoopSource(observer);
            CFRunLoopRemoveSource(run_loop as CFRunLoopRef, source, kCFRunLoopDefaultMode);
        }

        CFRelease(observer as CFTypeRef);
        CFRelease(app_element as CFTypeRef);
    }

    debug!(event = "core.system.macos.subscription_released", pid = pid);
}

/// Hashes of retained window elements that no longer appear in the live
/// listing.
fn stale_window_hashes(observed: &HashMap<u64, usize>, live: &[WindowId]) -> Vec<u64> {
    observed
        .keys()
        .filter(|hash| !live.iter().any(|id| id.0 == **hash))
        .copied()
        .collect()
}

/// Release retained elements for windows gone from the listing.
fn prune_destroyed_elements(pid: i32, live: &[WindowId]) {
    observers_map(|map| {
        let Some(entry) = map.get_mut(&pid) else {
            return;
        };

        let destroyed = CFString::new(ELEMENT_DESTROYED_NOTIFICATION);
        for hash in stale_window_hashes(&entry.window_elements, live) {
            let Some(element) = entry.window_elements.remove(&hash) else {
                continue;
            };
            // Best effort: the element is already invalid, so the remove
            // call may fail harmlessly.
            // SAFETY: element was retained when it was registered and is
            // released exactly once here.
            unsafe {
                AXObserverRemoveNotification(
                    entry.observer as AXObserverRef,
                    element as AXUIElementRef,
                    destroyed.as_concrete_TypeRef(),
                );
                CFRelease(element as CFTypeRef);
            }
            debug!(
                event = "core.system.macos.window_element_pruned",
                pid = pid,
                window_id = hash
            );
        }
    });
}

/// Copy the application's window array and hand the raw elements to `f`.
/// Returns `None` when the application is gone or does not answer.
fn with_window_elements<R>(pid: i32, f: impl FnOnce(&[AXUIElementRef]) -> R) -> Option<R> {
    // SAFETY: Creates a +1 retained AXUIElementRef, released below.
    let app_element = unsafe { AXUIElementCreateApplication(pid) };
    if app_element.is_null() {
        return None;
    }
    // SAFETY: app_element is valid.
    unsafe { AXUIElementSetMessagingTimeout(app_element, AX_MESSAGING_TIMEOUT) };

    let cf_windows_attr = CFString::new(kAXWindowsAttribute);
    let mut windows_value: CFTypeRef = ptr::null();
    // SAFETY: Standard AXUIElementCopyAttributeValue call (Copy Rule: +1
    // retained ref on success).
    let result = unsafe {
        AXUIElementCopyAttributeValue(
            app_element,
            cf_windows_attr.as_concrete_TypeRef(),
            &mut windows_value,
        )
    };
    if result != kAXErrorSuccess || windows_value.is_null() {
        // SAFETY: Release the app element (Create Rule).
        unsafe { CFRelease(app_element as CFTypeRef) };
        return None;
    }

    // SAFETY: windows_value is a +1 retained CFArrayRef from
    // CopyAttributeValue. wrap_under_create_rule takes ownership and will
    // CFRelease when dropped; the element borrows handed to `f` are valid
    // while the array is alive.
    let array: CFArray<CFType> = unsafe {
        CFArray::wrap_under_create_rule(windows_value as core_foundation::array::CFArrayRef)
    };
    let elements: Vec<AXUIElementRef> = array
        .iter()
        .map(|item| item.as_CFTypeRef() as AXUIElementRef)
        .collect();
    let output = f(&elements);
    drop(array);

    // SAFETY: Release the app element (Create Rule).
    unsafe { CFRelease(app_element as CFTypeRef) };
    Some(output)
}

/// Find a window element by id and return it retained (+1). The caller owns
/// the returned reference.
fn find_window_element(pid: i32, window: WindowId) -> Option<AXUIElementRef> {
    with_window_elements(pid, |elements| {
        elements
            .iter()
            // SAFETY: CFHash on a valid element reference.
            .find(|&&element| unsafe { CFHash(element as CFTypeRef) } as u64 == window.0)
            .map(|&element| {
                // SAFETY: Retain the borrow so it outlives the array.
                unsafe { CFRetain(element as CFTypeRef) };
                element
            })
    })
    .flatten()
}

fn read_snapshot(element: AXUIElementRef, id: WindowId) -> WindowSnapshot {
    let size = size_attribute(element);
    WindowSnapshot {
        id,
        subrole: string_attribute(element, "AXSubrole"),
        minimized: bool_attribute(element, kAXMinimizedAttribute),
        hidden: bool_attribute(element, "AXHidden"),
        width: size.map(|size| size.width),
        height: size.map(|size| size.height),
        title: string_attribute(element, kAXTitleAttribute),
    }
}

/// Copy an attribute value (Copy Rule: +1 retained on success).
fn copy_attribute(element: AXUIElementRef, attribute: &str) -> Option<CFType> {
    let cf_attr = CFString::new(attribute);
    let mut value: CFTypeRef = ptr::null();

    // SAFETY: Standard AXUIElementCopyAttributeValue call (Copy Rule).
    let result = unsafe {
        AXUIElementCopyAttributeValue(element, cf_attr.as_concrete_TypeRef(), &mut value)
    };
    if result != kAXErrorSuccess || value.is_null() {
        return None;
    }

    // SAFETY: value is a +1 retained CFTypeRef; wrap takes ownership.
    Some(unsafe { TCFType::wrap_under_create_rule(value) })
}

fn string_attribute(element: AXUIElementRef, attribute: &str) -> Option<String> {
    let value = copy_attribute(element, attribute)?;
    if value.instance_of::<CFString>() {
        let ptr = value.as_CFTypeRef() as CFStringRef;
        // SAFETY: ptr is a CFString borrowed from `value`.
        Some(unsafe { CFString::wrap_under_get_rule(ptr) }.to_string())
    } else {
        None
    }
}

fn bool_attribute(element: AXUIElementRef, attribute: &str) -> Option<bool> {
    let value = copy_attribute(element, attribute)?;
    if value.instance_of::<CFBoolean>() {
        let ptr = value.as_CFTypeRef() as core_foundation::boolean::CFBooleanRef;
        // SAFETY: ptr is a CFBoolean borrowed from `value`.
        Some(unsafe { CFBoolean::wrap_under_get_rule(ptr) }.into())
    } else {
        None
    }
}

fn size_attribute(element: AXUIElementRef) -> Option<CgSize> {
    let value = copy_attribute(element, "AXSize")?;
    let mut size = CgSize::default();
    // SAFETY: AXValueGetValue copies the CGSize payload into `size` and
    // reports whether the value had that type.
    let ok = unsafe {
        AXValueGetValue(
            value.as_CFTypeRef(),
            AX_VALUE_CGSIZE_TYPE,
            &mut size as *mut CgSize as *mut c_void,
        )
    };
    ok.then_some(size)
}

fn activation_policy_from_raw(raw: isize) -> ActivationPolicy {
    // NSApplicationActivationPolicy: 0 regular, 1 accessory, 2 prohibited.
    match raw {
        0 => ActivationPolicy::Regular,
        1 => ActivationPolicy::Accessory,
        _ => ActivationPolicy::Prohibited,
    }
}

fn nsstring_to_string(ns: id) -> Option<String> {
    if ns == nil {
        return None;
    }
    // SAFETY: UTF8String returns a pointer valid for the autorelease scope.
    unsafe {
        let utf8: *const c_char = msg_send![ns, UTF8String];
        if utf8.is_null() {
            return None;
        }
        Some(CStr::from_ptr(utf8).to_string_lossy().into_owned())
    }
}

fn observers_map<R>(f: impl FnOnce(&mut HashMap<i32, ObserverEntry>) -> R) -> R {
    let mut guard = OBSERVERS.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    f(guard.get_or_insert_with(HashMap::new))
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
