//! Fake engine library for integration tests.
//!
//! Implements the create/destroy entry points and the interface functions
//! behind `get_proc_address` as plain `extern "C"` functions. Behavior is
//! steered through `--mock-*` arguments in the create argument vector, and
//! everything observable is recorded per `--mock-tag=<tag>`.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::ffi::{c_void, CStr};
use std::os::raw::{c_char, c_int};
use std::sync::{Arc, Mutex, OnceLock};

use godot_host::engine::BOOL_NO_ARGS_HASH;
use godot_host::ffi::{
    self, ConstObjectPtr, ConstStringNamePtr, ConstTypePtr, GDExtensionBool, GDExtensionInt,
    GetProcAddressFn, Initialization, InitializationFunction, InterfaceFunctionPtr, MethodBindPtr,
    ObjectPtr, TypePtr, UninitializedStringNamePtr,
};
use godot_host::{EngineLibrary, EngineRegistry, EntryPoints};

#[derive(Debug, Default, Clone)]
pub struct Record {
    pub args: Vec<String>,
    pub env_seen: Option<String>,
    pub init_result: Option<GDExtensionBool>,
    pub minimum_level: Option<c_int>,
    pub destroyed: u32,
    pub frames: u64,
    /// Successful `classdb_get_method_bind` lookups made while creating
    pub binds_resolved: u32,
}

fn records() -> &'static Mutex<HashMap<String, Record>> {
    static RECORDS: OnceLock<Mutex<HashMap<String, Record>>> = OnceLock::new();
    RECORDS.get_or_init(|| Mutex::new(HashMap::new()))
}

pub fn record(tag: &str) -> Record {
    records().lock().unwrap().get(tag).cloned().unwrap_or_default()
}

fn update(tag: &str, f: impl FnOnce(&mut Record)) {
    let mut map = records().lock().unwrap();
    f(map.entry(tag.to_string()).or_default());
}

struct MockInstance {
    id: u64,
    tag: String,
    start_result: bool,
    quit_after: Option<u64>,
    frames: Cell<u64>,
}

thread_local! {
    static NO_BINDS: Cell<bool> = const { Cell::new(false) };
    static CREATING: RefCell<String> = const { RefCell::new(String::new()) };
}

fn count_bind() {
    let tag = CREATING.with(|t| t.borrow().clone());
    update(&tag, |r| r.binds_resolved += 1);
}

static START_BIND: u8 = 1;
static ITERATION_BIND: u8 = 2;

fn flag<'a>(args: &'a [String], name: &str) -> Option<&'a str> {
    args.iter().find_map(|arg| {
        if arg == name {
            Some("")
        } else {
            arg.strip_prefix(name).and_then(|rest| rest.strip_prefix('='))
        }
    })
}

unsafe extern "C" fn string_name_new(
    dest: UninitializedStringNamePtr,
    contents: *const c_char,
    _is_static: GDExtensionBool,
) {
    (dest as *mut *const c_char).write(contents);
}

unsafe fn read_name(name: ConstStringNamePtr) -> &'static [u8] {
    CStr::from_ptr(*(name as *const *const c_char)).to_bytes()
}

unsafe extern "C" fn get_method_bind(
    class: ConstStringNamePtr,
    method: ConstStringNamePtr,
    hash: GDExtensionInt,
) -> MethodBindPtr {
    if NO_BINDS.with(Cell::get)
        || hash != BOOL_NO_ARGS_HASH
        || read_name(class) != b"GodotInstance"
    {
        return std::ptr::null();
    }
    let bind: MethodBindPtr = match read_name(method) {
        b"start" => std::ptr::addr_of!(START_BIND).cast(),
        b"iteration" => std::ptr::addr_of!(ITERATION_BIND).cast(),
        _ => return std::ptr::null(),
    };
    count_bind();
    bind
}

unsafe extern "C" fn ptrcall(
    bind: MethodBindPtr,
    instance: ObjectPtr,
    _args: *const ConstTypePtr,
    ret: TypePtr,
) {
    let instance = &*(instance as *const MockInstance);
    let answer = if bind == std::ptr::addr_of!(START_BIND).cast() {
        instance.start_result
    } else if bind == std::ptr::addr_of!(ITERATION_BIND).cast() {
        let frames = instance.frames.get() + 1;
        instance.frames.set(frames);
        update(&instance.tag, |r| r.frames = frames);
        instance.quit_after.is_some_and(|n| frames >= n)
    } else {
        false
    };
    *(ret as *mut u8) = answer as u8;
}

unsafe extern "C" fn instance_id(object: ConstObjectPtr) -> u64 {
    (*(object as *const MockInstance)).id
}

unsafe fn erase<F: Copy>(f: F) -> unsafe extern "C" fn() {
    std::mem::transmute_copy(&f)
}

unsafe extern "C" fn get_proc_address(name: *const c_char) -> InterfaceFunctionPtr {
    let name = CStr::from_ptr(name).to_bytes();
    let f = if name == ffi::OBJECT_GET_INSTANCE_ID {
        erase(instance_id as ffi::ObjectGetInstanceIdFn)
    } else if name == ffi::CLASSDB_GET_METHOD_BIND {
        erase(get_method_bind as ffi::ClassdbGetMethodBindFn)
    } else if name == ffi::OBJECT_METHOD_BIND_PTRCALL {
        erase(ptrcall as ffi::ObjectMethodBindPtrcallFn)
    } else if name == ffi::STRING_NAME_NEW_WITH_LATIN1_CHARS {
        erase(string_name_new as ffi::StringNameNewWithLatin1CharsFn)
    } else {
        return None;
    };
    Some(f)
}

unsafe extern "C" fn get_proc_address_without_ptrcall(name: *const c_char) -> InterfaceFunctionPtr {
    if CStr::from_ptr(name).to_bytes() == ffi::OBJECT_METHOD_BIND_PTRCALL {
        None
    } else {
        get_proc_address(name)
    }
}

unsafe fn read_env(name: &str) -> Option<String> {
    let key = std::ffi::CString::new(name).ok()?;
    let raw = libc::getenv(key.as_ptr());
    if raw.is_null() {
        None
    } else {
        Some(CStr::from_ptr(raw).to_string_lossy().into_owned())
    }
}

unsafe extern "C" fn create(
    argc: c_int,
    argv: *mut *mut c_char,
    init: InitializationFunction,
) -> ObjectPtr {
    let args: Vec<String> = (0..argc as usize)
        .map(|i| CStr::from_ptr(*argv.add(i)).to_string_lossy().into_owned())
        .collect();
    let tag = flag(&args, "--mock-tag").unwrap_or("untagged").to_string();

    let env_seen = flag(&args, "--mock-env").and_then(|var| read_env(var));
    update(&tag, |r| {
        r.args = args.clone();
        r.env_seen = env_seen;
    });

    if flag(&args, "--mock-skip-init").is_none() {
        CREATING.with(|t| *t.borrow_mut() = tag.clone());
        NO_BINDS.with(|c| c.set(flag(&args, "--mock-no-binds").is_some()));
        let get_proc: GetProcAddressFn = if flag(&args, "--mock-missing-symbol").is_some() {
            get_proc_address_without_ptrcall
        } else {
            get_proc_address
        };

        let mut initialization = Initialization {
            minimum_initialization_level: -1,
            userdata: std::ptr::null_mut(),
            initialize: None,
            deinitialize: None,
        };
        let result = init(Some(get_proc), std::ptr::null_mut(), &mut initialization);
        NO_BINDS.with(|c| c.set(false));

        if let Some(hook) = initialization.initialize {
            hook(initialization.userdata, ffi::INITIALIZATION_CORE);
        }
        update(&tag, |r| {
            r.init_result = Some(result);
            r.minimum_level = Some(initialization.minimum_initialization_level);
        });
    }

    if flag(&args, "--mock-null").is_some() {
        return std::ptr::null_mut();
    }

    let instance = Box::new(MockInstance {
        id: flag(&args, "--mock-id").and_then(|id| id.parse().ok()).unwrap_or(1),
        tag,
        start_result: flag(&args, "--mock-fail-start").is_none(),
        quit_after: flag(&args, "--mock-quit-after").and_then(|n| n.parse().ok()),
        frames: Cell::new(0),
    });
    // Leaked on purpose: destroy only counts, so a double destroy is observable.
    Box::into_raw(instance).cast::<c_void>()
}

unsafe extern "C" fn destroy(instance: ObjectPtr) {
    let instance = &*(instance as *const MockInstance);
    update(&instance.tag, |r| r.destroyed += 1);
}

pub fn library() -> Arc<EngineLibrary> {
    Arc::new(unsafe { EngineLibrary::from_entry_points(EntryPoints { create, destroy }) })
}

pub fn registry() -> Arc<EngineRegistry> {
    Arc::new(EngineRegistry::new())
}

/// Argument vector with a unique tag so records never collide across tests.
pub fn args(tag: &str, extra: &[&str]) -> Vec<String> {
    let mut args = vec!["app".to_string(), format!("--mock-tag={}", tag)];
    args.extend(extra.iter().map(|s| s.to_string()));
    args
}
