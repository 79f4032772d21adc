//! Proxy-based decorators for native callables.
//!
//! A wrapped callable is a `Proxy` over the original with a single trap that
//! runs a pre-hook and then forwards to the original through `Reflect`. Every
//! other operation (`length`, `name`, `prototype`, `toString`, static members,
//! `instanceof`) falls through to the target untouched, and the trap closures
//! are wasm functions, so `toString()` reports `[native code]`.

use js_sys::{Array, Function, Object, Reflect};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

/// Traps are `Fn` so a nested call (a hook that ends up constructing another
/// peer connection) can re-enter them.
type Trap = Closure<dyn Fn(JsValue, JsValue, JsValue) -> Result<JsValue, JsValue>>;

/// Get a property from the global scope.
pub fn get_global(prop: &str) -> Result<JsValue, JsValue> {
    Reflect::get(&js_sys::global(), &JsValue::from_str(prop))
}

/// Replace a global binding.
pub fn set_global(prop: &str, value: &JsValue) -> Result<(), JsValue> {
    Reflect::set(&js_sys::global(), &JsValue::from_str(prop), value)?;
    Ok(())
}

/// `value.prototype`, or `undefined`.
pub fn prototype_of(ctor: &JsValue) -> Result<JsValue, JsValue> {
    Reflect::get(ctor, &JsValue::from_str("prototype"))
}

/// Replace a method on an object. Returns the original method.
pub fn patch_method(obj: &JsValue, method_name: &str, replacement: &JsValue) -> Result<JsValue, JsValue> {
    let original = Reflect::get(obj, &JsValue::from_str(method_name))?;
    Reflect::set(obj, &JsValue::from_str(method_name), replacement)?;
    Ok(original)
}

/// Serialize an arguments list the way `JSON.stringify(args)` does. Cyclic or
/// otherwise unserializable arguments yield a placeholder instead of throwing.
pub fn stringify_arguments(args: &Array) -> String {
    js_sys::JSON::stringify(args)
        .ok()
        .and_then(|s| s.as_string())
        .unwrap_or_else(|| "[unserializable arguments]".to_string())
}

fn new_proxy(target: &JsValue, handler: &Object) -> Result<JsValue, JsValue> {
    let proxy_ctor: Function = get_global("Proxy")?
        .dyn_into()
        .map_err(|_| JsValue::from_str("Proxy not found"))?;
    Reflect::construct(&proxy_ctor, &Array::of2(target, handler))
}

/// Wrap a method. `pre` sees `(this, arguments)` and runs before the original,
/// which is then applied with the same receiver and arguments. The original's
/// return value (promise included) or thrown exception is passed back as-is.
pub fn wrap_method<F>(original: &JsValue, pre: F) -> Result<JsValue, JsValue>
where
    F: Fn(&JsValue, &Array) + 'static,
{
    let apply_trap: Trap = Closure::wrap(Box::new(
        move |target: JsValue, this_arg: JsValue, args: JsValue| -> Result<JsValue, JsValue> {
            let args: Array = args.unchecked_into();
            pre(&this_arg, &args);
            Reflect::apply::<fn() -> JsValue>(target.unchecked_ref(), &this_arg, &args)
        },
    ) as Box<dyn Fn(JsValue, JsValue, JsValue) -> Result<JsValue, JsValue>>);

    let handler = Object::new();
    Reflect::set(&handler, &JsValue::from_str("apply"), apply_trap.as_ref())?;
    apply_trap.forget();

    new_proxy(original, &handler)
}

/// Wrap a constructor. `pre` sees the arguments of every `new` call and runs
/// before the original is constructed with the same arguments and `new.target`,
/// so instances get the original prototype and subclassing keeps working.
/// Calls without `new` reach the original unchanged (and throw as it does).
pub fn wrap_constructor<F>(original: &JsValue, pre: F) -> Result<JsValue, JsValue>
where
    F: Fn(&Array) + 'static,
{
    let construct_trap: Trap = Closure::wrap(Box::new(
        move |target: JsValue, args: JsValue, new_target: JsValue| -> Result<JsValue, JsValue> {
            let args: Array = args.unchecked_into();
            pre(&args);
            Reflect::construct_with_new_target(target.unchecked_ref(), &args, new_target.unchecked_ref())
        },
    ) as Box<dyn Fn(JsValue, JsValue, JsValue) -> Result<JsValue, JsValue>>);

    let handler = Object::new();
    Reflect::set(&handler, &JsValue::from_str("construct"), construct_trap.as_ref())?;
    construct_trap.forget();

    new_proxy(original, &handler)
}

/// Read a string field from the first argument (`arg0.candidate`,
/// `arg0.sdp`). Missing, non-string and empty values all give `None`.
pub fn first_arg_field(args: &Array, field: &str) -> Option<String> {
    let first = args.get(0);
    if !first.is_object() {
        return None;
    }
    Reflect::get(&first, &JsValue::from_str(field))
        .ok()
        .and_then(|v| v.as_string())
        .filter(|s| !s.is_empty())
}
