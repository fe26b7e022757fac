pub mod chat;
pub mod format;
pub mod modules;

pub mod settings {
    use serde::{Deserialize, Serialize};

    fn default_base_url() -> String {
        "http://localhost:8000".into()
    }

    fn default_timeout_secs() -> u64 {
        120 // chat completions on CPU can be slow
    }

    fn default_poll_interval_ms() -> u64 {
        2000
    }

    fn default_toast_ttl_ms() -> u64 {
        5000
    }

    fn default_storage_key() -> String {
        "freddie_chats".into()
    }

    fn default_max_saved_chats() -> usize {
        50
    }

    /// Remote service connection
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct ApiSettings {
        #[serde(default = "default_base_url")]
        pub base_url: String,
        #[serde(default = "default_timeout_secs")]
        pub request_timeout_secs: u64,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct PollingSettings {
        /// Period of the download-progress poll while any module downloads
        #[serde(default = "default_poll_interval_ms")]
        pub interval_ms: u64,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct ToastSettings {
        #[serde(default = "default_toast_ttl_ms")]
        pub default_ttl_ms: u64,
    }

    /// Where the available-disk-space figure comes from.
    ///
    /// A fixed `available_bytes` wins; otherwise the disk holding
    /// `models_dir` (or the current directory) is queried.
    #[derive(Debug, Clone, Default, Serialize, Deserialize)]
    pub struct DiskSettings {
        #[serde(default)]
        pub available_bytes: Option<u64>,
        #[serde(default)]
        pub total_bytes: Option<u64>,
        #[serde(default)]
        pub models_dir: Option<String>,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct HistorySettings {
        #[serde(default = "default_storage_key")]
        pub storage_key: String,
        #[serde(default = "default_max_saved_chats")]
        pub max_saved_chats: usize,
        /// Storage directory; defaults to the platform data dir
        #[serde(default)]
        pub dir: Option<String>,
    }

    #[derive(Debug, Clone, Default, Serialize, Deserialize)]
    pub struct AppSettings {
        #[serde(default)]
        pub api: ApiSettings,
        #[serde(default)]
        pub polling: PollingSettings,
        #[serde(default)]
        pub toasts: ToastSettings,
        #[serde(default)]
        pub disk: DiskSettings,
        #[serde(default)]
        pub history: HistorySettings,
    }

    impl Default for ApiSettings {
        fn default() -> Self {
            Self {
                base_url: default_base_url(),
                request_timeout_secs: default_timeout_secs(),
            }
        }
    }

    impl Default for PollingSettings {
        fn default() -> Self {
            Self {
                interval_ms: default_poll_interval_ms(),
            }
        }
    }

    impl Default for ToastSettings {
        fn default() -> Self {
            Self {
                default_ttl_ms: default_toast_ttl_ms(),
            }
        }
    }

    impl Default for HistorySettings {
        fn default() -> Self {
            Self {
                storage_key: default_storage_key(),
                max_saved_chats: default_max_saved_chats(),
                dir: None,
            }
        }
    }

}
