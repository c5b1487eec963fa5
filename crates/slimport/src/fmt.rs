//! Logging shim.
//!
//! Forwards to `defmt` on hardware builds and to `tracing` on host builds.
//! With neither feature enabled the arguments are still type-checked but
//! nothing is emitted. Format strings must stay within the subset both
//! backends accept: `{}` for integers and bools, `{:?}` for crate types,
//! `{:#x}` for register values.

#![allow(unused_macros)]

macro_rules! log_at {
    ($defmt:ident, $tracing:ident, $s:literal $(, $x:expr)* $(,)?) => {
        {
            #[cfg(feature = "defmt")]
            ::defmt::$defmt!($s $(, $x)*);
            #[cfg(feature = "tracing")]
            ::tracing::$tracing!($s $(, $x)*);
            #[cfg(not(any(feature = "defmt", feature = "tracing")))]
            let _ = ($( &$x, )*);
        }
    };
}

macro_rules! trace {
    ($s:literal $(, $x:expr)* $(,)?) => { log_at!(trace, trace, $s $(, $x)*) };
}

macro_rules! debug {
    ($s:literal $(, $x:expr)* $(,)?) => { log_at!(debug, debug, $s $(, $x)*) };
}

macro_rules! info {
    ($s:literal $(, $x:expr)* $(,)?) => { log_at!(info, info, $s $(, $x)*) };
}

macro_rules! warn {
    ($s:literal $(, $x:expr)* $(,)?) => { log_at!(warn, warn, $s $(, $x)*) };
}

macro_rules! error {
    ($s:literal $(, $x:expr)* $(,)?) => { log_at!(error, error, $s $(, $x)*) };
}
