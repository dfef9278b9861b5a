mod win;

pub use win::{WinningLine, check_win};
