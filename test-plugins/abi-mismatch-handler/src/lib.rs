//! Exports a handler symbol under an ABI marker no runtime version uses.

#[no_mangle]
pub static KV_RUNTIME_HANDLER_ABI: u32 = 0;

#[no_mangle]
pub extern "C" fn handler() {}
