/// Declares a process-wide accessor returning `&'static T`.
///
/// Each accessor owns a private `static` [`LazySingleton`](crate::LazySingleton);
/// the initializer runs on the first call, from whichever thread gets there
/// first.
///
/// # Example
///
/// ```rust
/// use lone::singleton;
///
/// pub struct Settings {
///     pub retries: u32,
/// }
///
/// singleton! {
///     /// Shared settings.
///     pub fn settings() -> Settings = Settings { retries: 3 };
///     fn banner() -> String = format!("v{}", 1);
/// }
///
/// assert!(std::ptr::eq(settings(), settings()));
/// assert_eq!(settings().retries, 3);
/// assert_eq!(banner(), "v1");
/// ```
#[cfg(not(loom))]
#[macro_export]
macro_rules! singleton {
    () => {};
    (
        $(#[$attr:meta])*
        $vis:vis fn $name:ident() -> $ty:ty = $init:expr;
        $($rest:tt)*
    ) => {
        $(#[$attr])*
        $vis fn $name() -> &'static $ty {
            static INSTANCE: $crate::LazySingleton<$ty> = $crate::LazySingleton::new(|| $init);
            INSTANCE.get()
        }

        $crate::singleton! { $($rest)* }
    };
}

/// Emits a `tracing` event when the `tracing` feature is enabled; expands to
/// nothing otherwise.
macro_rules! event {
    ($level:ident, $($arg:tt)+) => {
        #[cfg(feature = "tracing")]
        ::tracing::$level!($($arg)+);
    };
}

pub(crate) use event;
