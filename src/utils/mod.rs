pub mod config;
pub mod fd_limit;
pub mod logger;
pub mod settings;

pub use config::*;
pub use fd_limit::{FDS_PER_WORKER, cap_workers, max_open_fds, max_workers_by_fd_limit};
pub use logger::setup_logging;
pub use settings::{
    CrawldexToml, apply_env_to_opts, apply_file_to_opts, load_config_file, load_dotenv,
};
