//! Domain types of the runtime: payloads, the execution context, the handler
//! contract, invocation outcomes and the cycle state machine.

mod context;
mod cycle;
mod handler;
mod outcome;
mod payload;

pub use context::ExecutionContext;
pub use cycle::{CycleState, StateMachine, TransitionError};
pub use handler::{
    invoke_guarded, Handler, HandlerError, HandlerFn, HandlerResult, HANDLER_ABI_SYMBOL,
    HANDLER_ABI_VERSION,
};
pub use outcome::{InvocationOutcome, ResultTypeError, RESULT_TYPE_MESSAGE};
pub use payload::{ChangeDetection, DecodeError, InputPayload, InputSnapshot, TIMESTAMP_FIELD};
