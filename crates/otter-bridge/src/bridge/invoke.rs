//! Invocation and the callback bridge
//!
//! `construct_new`, `func_call` and `obj_call` share one failure boundary:
//! a host fault is normalized and its error handle returned in place of the
//! result. Arguments always arrive as the handle of an array whose elements
//! are themselves handles.

use std::rc::Rc;

use otter_bridge_host::{HostError, HostResult, NativeFn, PropertyKey, Realm, Value, ops};
use tracing::{debug, trace};

use super::Bridge;
use crate::error::{BridgeError, BridgeResult};
use crate::handle::Handle;
use crate::marshal::{self, ArgList};

impl Bridge {
    fn arguments(&self, argv: Handle) -> HostResult<ArgList> {
        let list = self.value(argv);
        marshal::unpack_arguments(&self.inner.table.borrow(), &list)
    }

    /// `construct_new(ctor, argv)`: `new ctor(...argv)`
    pub fn construct_new(&self, ctor: Handle, argv: Handle) -> Handle {
        let target = self.value(ctor);
        let result = self
            .arguments(argv)
            .and_then(|args| ops::construct(self.realm(), &target, &args));
        self.settle(result)
    }

    /// `func_call(func, argv)`: `func(...argv)` with an undefined receiver
    pub fn func_call(&self, func: Handle, argv: Handle) -> Handle {
        let target = self.value(func);
        let result = self
            .arguments(argv)
            .and_then(|args| ops::call(self.realm(), &target, &Value::Undefined, &args));
        self.settle(result)
    }

    /// `obj_call(obj, name, len, argv)`: `obj[name](...argv)` with `obj` as receiver
    pub fn obj_call(&self, obj: Handle, name: &[u8], argv: Handle) -> Handle {
        let target = self.value(obj);
        let key = PropertyKey::from(marshal::decode_utf8(name).as_str());
        let realm = self.realm();
        let result = self.arguments(argv).and_then(|args| {
            let method = ops::get(realm, &target, &key)?;
            ops::call(realm, &method, &target, &args)
        });
        self.settle(result)
    }

    /// `make_callback(fidx, data)`: a host function that re-enters the guest
    ///
    /// When the host calls it, the arguments are packed into a fresh array,
    /// and guest function `index` runs with `(array handle, data)`. Its
    /// handle result is returned to the host as a plain number. Guest faults
    /// are normalized and returned the same way call results are.
    pub fn make_callback(&self, index: u32, data: Handle) -> Handle {
        let weak = self.downgrade();
        let call: NativeFn = Rc::new(move |_realm: &Realm, _this: &Value, args: &[Value]| -> HostResult<Value> {
            let Some(inner) = weak.upgrade() else {
                return Err(HostError::type_error("callback invoked after its bridge was dropped"));
            };
            let bridge = Bridge::from_inner(inner);
            Ok(bridge.dispatch_callback(index, data, args))
        });
        let func = self.realm().new_function("", call);
        debug!(index, data = data.0, "callback created");
        self.intern(Value::Object(func))
    }

    fn dispatch_callback(&self, index: u32, data: Handle, args: &[Value]) -> Value {
        let depth = self.depth_cell();
        if depth.get() >= self.config().max_callback_depth {
            return self.error_value(BridgeError::Host(HostError::StackOverflow));
        }

        let packed = self.realm().new_array(args.to_vec());
        let args_handle = self.intern(Value::Object(packed));
        trace!(index, args = args_handle.0, depth = depth.get(), "entering guest");

        depth.set(depth.get() + 1);
        let result = self.enter_guest(index, args_handle, data);
        depth.set(depth.get() - 1);

        match result {
            Ok(handle) => marshal::handle_to_value(handle),
            Err(err) => self.error_value(err),
        }
    }

    fn enter_guest(&self, index: u32, args: Handle, data: Handle) -> BridgeResult<Handle> {
        let functions = self.functions();
        let len = functions.len();
        if index >= len {
            return Err(BridgeError::InvalidFunctionIndex { index, len });
        }
        functions.invoke(self, index, args, data)
    }
}
