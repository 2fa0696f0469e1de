use serde_json::Value;

use crate::crud::error::{CrudError, CrudResult};

/// Transport-supplied reply capability.
///
/// Both methods consume the reply, so a handler can answer a request exactly once.
pub trait Reply {
    type Output;

    fn ok(self, value: Value) -> Self::Output;

    fn error(self, err: CrudError) -> Self::Output;
}

/// Route a handler result into its single reply
pub fn send<R: Reply>(reply: R, result: CrudResult<Value>) -> R::Output {
    match result {
        Ok(value) => reply.ok(value),
        Err(err) => reply.error(err),
    }
}
