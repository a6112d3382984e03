use std::{path::PathBuf, sync::LazyLock};

pub static DEFAULT_W3LF_PATH: LazyLock<PathBuf> = LazyLock::new(|| {
    if let Some(dir) = std::env::var_os("W3LF_CONFIG_DIR") {
        return PathBuf::from(dir);
    }

    let mut path = dirs::config_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_default();
    path.push("w3lf");
    path
});

/// Computes a path inside the launcher's config directory.
///
/// Returns a `&Path` referencing the config directory itself if no arguments are passed in, or a
/// `PathBuf` created by joining all of the arguments to the base config directory if at least
/// one argument is passed in.
///
/// # Examples
///
/// ```
/// // Assuming `W3LF_CONFIG_DIR` is not set, the config directory is ~/.config/w3lf
/// let logs = w3lf::w3lf_path!("logs");
/// assert!(logs.ends_with("logs"));
/// ```
#[macro_export]
macro_rules! w3lf_path {
    () => {
        $crate::paths::DEFAULT_W3LF_PATH.as_path()
    };

    ( $( $path:expr ),+ $(,)? ) => {
        [
            $crate::paths::DEFAULT_W3LF_PATH.as_path(),
            $( std::path::Path::new(&$path) ),+
        ].into_iter().collect::<std::path::PathBuf>()
    };
}
