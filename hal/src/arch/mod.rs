//! # Architecture Support
//!
//! Only RISC-V is supported. The generic parts of the port build on every
//! target so they can be unit tested on the host; the hardware glue inside
//! is gated on `riscv32`/`riscv64`.

pub mod riscv;
