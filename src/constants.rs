// src/constants.rs

/// Words read as `true` when a boolean flag is given text (compared lowercase).
pub const TRUTHY_WORDS: &[&str] = &["1", "y", "yes", "true", "on", "t"];

/// Prefix of the engine's own environment overrides.
pub const ENV_PREFIX: &str = "ARGOT_";

/// The name of the engine config file (inside `<config_dir>/<app>/`).
pub const CONFIG_FILENAME: &str = "argot.toml";

/// `external_editor` value that reads the flag through a hidden prompt.
pub const PASSWORD_HELPER: &str = "@password";

/// Editor used when the configured env var is unset.
pub const DEFAULT_EDITOR: &str = "vi";

/// Group title for the injected built-in flags.
pub const BUILTIN_GROUP: &str = "Misc";

/// Long titles of the injected built-in flags and commands.
pub const HELP_TITLE: &str = "help";
pub const VERSION_TITLE: &str = "version";
pub const BUILD_INFO_TITLE: &str = "build-info";
pub const TREE_TITLE: &str = "tree";
pub const DEBUG_TITLE: &str = "debug";
pub const NO_COLOR_TITLE: &str = "no-color";
