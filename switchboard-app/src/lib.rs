pub mod bootstrap;
pub mod config;
pub mod repl;

pub use bootstrap::App;
pub use config::Config;
