pub mod annotate;
pub mod app;
pub mod commands;
pub mod dispatch;
pub mod env;
pub mod io;
pub mod render;
pub mod runtime;
pub mod schema;
pub mod validate;

pub use app::run;
pub use env::CliArgs;
