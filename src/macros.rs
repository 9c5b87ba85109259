#[macro_export]
macro_rules! require {
    ($to_check:expr) => {
        require!($to_check, ())
    };
    ($to_check:expr, $ret:expr) => {
        if let Some(to_check) = $to_check {
            to_check
        } else {
            return $ret;
        }
    };
}

/// Resolves an optional configured channel, warning and returning `Ok(())` if unset.
#[macro_export]
macro_rules! require_channel {
    ($channel:expr, $job:expr) => {
        $crate::require!($channel, {
            ::tracing::warn!("No channel configured for {}, skipping.", $job);
            Ok(())
        })
    };
}
