// Allow the derive macros to refer to `::rusty_ecs` from inside this crate.
extern crate self as rusty_ecs;

pub mod ecs;
pub mod log;
