mod info;
mod list;
mod sync;

pub use info::cmd_show_info;
pub use list::cmd_list_shows;
pub use sync::cmd_sync;
