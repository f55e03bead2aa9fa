//! 帧分发：上行口的主分发器和各下行口的从分发器。

pub mod master;
pub mod slave;

pub use master::{reply_cnt, RelayCommand};
pub use slave::append_uid_chain;
