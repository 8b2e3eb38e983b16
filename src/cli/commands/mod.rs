mod init;
mod users;

pub use init::cmd_init;
pub use users::cmd_list_users;
