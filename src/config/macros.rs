/// Configuration macros for zero-repetition config definitions

/// Define a configuration struct with embedded defaults
///
/// Generates the struct with public fields, a `Default` implementation using
/// the given values, and serde support with `#[serde(default)]` so partial
/// TOML files only need the keys they override.
///
/// # Example
/// ```
/// fixture_server::config_struct! {
///     pub struct RetryConfig {
///         attempts: u32 = 3,
///         backoff_ms: u64 = 250,
///     }
/// }
///
/// assert_eq!(RetryConfig::default().attempts, 3);
/// ```
#[macro_export]
macro_rules! config_struct {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[$field_meta:meta])*
                $field_name:ident: $field_type:ty = $default_value:expr
            ),*
            $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
        #[serde(default)]
        $vis struct $name {
            $(
                $(#[$field_meta])*
                pub $field_name: $field_type,
            )*
        }

        impl Default for $name {
            fn default() -> Self {
                Self {
                    $(
                        $field_name: $default_value,
                    )*
                }
            }
        }
    };
}
