pub mod live;
pub mod run;
pub mod sessions;

pub use live::cmd_live;
pub use run::{cmd_analyze, cmd_run};
pub use sessions::{cmd_attach, cmd_kill, cmd_list};
