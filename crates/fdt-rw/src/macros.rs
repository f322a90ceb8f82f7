// Every fallible operation in this crate reports a plain `FdtError`, so
// these early returns take the error value itself, with no conversion.

/// Returns `Err($error)` from the enclosing function.
macro_rules! bail {
    ($error:expr $(,)?) => {
        return Err($error)
    };
}

/// Bails out with `$error` unless `$cond` holds.
macro_rules! ensure {
    ($cond:expr, $error:expr $(,)?) => {
        if !$cond {
            bail!($error);
        }
    };
}
